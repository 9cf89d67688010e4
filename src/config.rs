//! Input and output locations of a cube export.

use std::path::{Path, PathBuf};

/// Side length, in pixels, every texture is resized to.
pub const DEFAULT_TEXTURE_SIZE: u32 = 512;

/// How a source image is fitted into the square texture.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ResizeFit {
    /// Scale each axis independently, ignoring the aspect ratio.
    #[default]
    Stretch,
    /// Keep the aspect ratio, fill the square and crop the overflow around the centre.
    Cover,
}

/// Everything a run needs to know.
///
/// `Default` points at `./images/{top,front,side}.png` and writes `./model.glb`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CubeConfig {
    pub top: PathBuf,
    pub front: PathBuf,
    pub side: PathBuf,
    pub output: PathBuf,
    pub texture_size: u32,
    pub fit: ResizeFit,
}

impl Default for CubeConfig {
    fn default() -> Self {
        Self::in_dir(Path::new("./"))
    }
}

impl CubeConfig {
    /// Default layout relative to `root` instead of the working directory.
    pub fn in_dir(root: &Path) -> Self {
        let images = root.join("images");
        Self {
            top: images.join("top.png"),
            front: images.join("front.png"),
            side: images.join("side.png"),
            output: root.join("model.glb"),
            texture_size: DEFAULT_TEXTURE_SIZE,
            fit: ResizeFit::default(),
        }
    }

    pub fn with_inputs(
        mut self,
        top: impl Into<PathBuf>,
        front: impl Into<PathBuf>,
        side: impl Into<PathBuf>,
    ) -> Self {
        self.top = top.into();
        self.front = front.into();
        self.side = side.into();
        self
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = output.into();
        self
    }

    pub fn with_texture_size(mut self, texture_size: u32) -> Self {
        self.texture_size = texture_size;
        self
    }

    pub fn with_fit(mut self, fit: ResizeFit) -> Self {
        self.fit = fit;
        self
    }
}
