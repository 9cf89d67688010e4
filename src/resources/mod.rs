use std::path::Path;

use anyhow::Context;

use crate::{
    config::{CubeConfig, ResizeFit},
    data_structures::texture::{CubeTextures, TextureImage},
};

/**
 * This module contains all logic for loading source images from disk.
 */
pub mod texture;

pub async fn load_binary(path: &Path) -> anyhow::Result<Vec<u8>> {
    let data = tokio::fs::read(path).await?;
    Ok(data)
}

/// Read an image file and turn it into a square PNG texture named after the file stem.
pub async fn load_texture(path: &Path, size: u32, fit: ResizeFit) -> anyhow::Result<TextureImage> {
    let name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let data = load_binary(path)
        .await
        .with_context(|| format!("failed to load texture {}", path.display()))?;
    texture::resize_encoded(&data, &name, size, fit)
        .with_context(|| format!("failed to load texture {}", path.display()))
}

/// Load top, front and side in that order. The first failure aborts the rest.
pub async fn load_cube_textures(config: &CubeConfig) -> anyhow::Result<CubeTextures> {
    let top = load_texture(&config.top, config.texture_size, config.fit).await?;
    let front = load_texture(&config.front, config.texture_size, config.fit).await?;
    let side = load_texture(&config.side, config.texture_size, config.fit).await?;
    log::info!(
        "loaded textures {}, {} and {} at {}x{}",
        top.name,
        front.name,
        side.name,
        config.texture_size,
        config.texture_size
    );
    Ok(CubeTextures { top, front, side })
}
