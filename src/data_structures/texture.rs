//! Encoded texture images as they are embedded into the model.

/// MIME type every embedded texture is re-encoded to.
pub const PNG_MIME_TYPE: &str = "image/png";

/// A resized image, already encoded and ready to be embedded.
///
/// `width` and `height` describe the decoded pixel size of `bytes`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextureImage {
    pub name: String,
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
}

impl TextureImage {
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// The three images a cube is textured with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CubeTextures {
    pub top: TextureImage,
    pub front: TextureImage,
    pub side: TextureImage,
}
