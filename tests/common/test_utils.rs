#![allow(dead_code)]

use std::{io::Cursor, path::Path};

use cube_glb::{
    CubeConfig, ResizeFit,
    data_structures::texture::CubeTextures,
    resources::texture::resize_encoded,
};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use tempfile::TempDir;

pub const TOP_COLOUR: [u8; 4] = [255, 0, 0, 255];
pub const FRONT_COLOUR: [u8; 4] = [0, 255, 0, 255];
pub const SIDE_COLOUR: [u8; 4] = [0, 0, 255, 255];

/// A temporary directory laid out like the default working directory.
pub struct Workspace {
    pub dir: TempDir,
    pub config: CubeConfig,
}

impl Workspace {
    pub fn empty() -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let config = CubeConfig::in_dir(dir.path());
        std::fs::create_dir_all(dir.path().join("images")).expect("failed to create images dir");
        Self { dir, config }
    }

    /// All three source images as solid `width`×`height` PNGs.
    pub fn with_images(width: u32, height: u32) -> Self {
        let workspace = Self::empty();
        write_png(&workspace.config.top, width, height, TOP_COLOUR);
        write_png(&workspace.config.front, width, height, FRONT_COLOUR);
        write_png(&workspace.config.side, width, height, SIDE_COLOUR);
        workspace
    }
}

pub fn write_png(path: &Path, width: u32, height: u32, colour: [u8; 4]) {
    RgbaImage::from_pixel(width, height, Rgba(colour))
        .save_with_format(path, ImageFormat::Png)
        .expect("failed to write fixture");
}

pub fn png_bytes(width: u32, height: u32, colour: [u8; 4]) -> Vec<u8> {
    let mut bytes = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba(colour)))
        .write_to(&mut bytes, ImageFormat::Png)
        .expect("failed to encode fixture");
    bytes.into_inner()
}

/// Resized textures built in memory, without touching the filesystem.
pub fn cube_textures(source_size: u32) -> CubeTextures {
    let load = |name: &str, colour| {
        resize_encoded(
            &png_bytes(source_size, source_size, colour),
            name,
            512,
            ResizeFit::Stretch,
        )
        .expect("failed to resize fixture")
    };
    CubeTextures {
        top: load("top", TOP_COLOUR),
        front: load("front", FRONT_COLOUR),
        side: load("side", SIDE_COLOUR),
    }
}
