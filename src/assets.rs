use crate::mesh::ModelData;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Decoded RGBA8 pixels ready for upload by the render collaborator.
#[derive(Clone, Debug, PartialEq)]
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl TextureData {
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels = rgba.iter().copied().cycle().take((width * height * 4) as usize).collect();
        Self { width, height, pixels }
    }

    pub fn from_memory(bytes: &[u8]) -> Result<Self> {
        let img = image::load_from_memory(bytes)?.to_rgba8();
        let (width, height) = img.dimensions();
        Ok(Self { width, height, pixels: img.into_raw() })
    }
}

/// Boundary to everything that turns a path from a world file into asset data.
pub trait AssetLoader {
    fn load_texture(&mut self, path: &Path) -> Result<TextureData>;
    fn load_model(&mut self, path: &Path) -> Result<ModelData>;
    /// Resolves a path written in a world file to the location the backend should open.
    fn resolve(&self, raw: &str) -> PathBuf {
        PathBuf::from(raw)
    }
}

/// Reads textures with `image` and models with `gltf`, relative to an optional asset root.
#[derive(Debug, Clone, Default)]
pub struct DiskAssets {
    root: Option<PathBuf>,
}

impl DiskAssets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: Some(root.into()) }
    }
}

impl AssetLoader for DiskAssets {
    fn load_texture(&mut self, path: &Path) -> Result<TextureData> {
        let bytes = fs::read(path).with_context(|| format!("Failed to read texture {}", path.display()))?;
        TextureData::from_memory(&bytes).with_context(|| format!("Failed to decode texture {}", path.display()))
    }

    fn load_model(&mut self, path: &Path) -> Result<ModelData> {
        ModelData::load_gltf(path)
    }

    fn resolve(&self, raw: &str) -> PathBuf {
        let path = PathBuf::from(raw);
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path,
        }
    }
}
