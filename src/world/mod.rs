//! World description files: `sigil[params]` blocks merged into a [`Scene`].

pub mod block;
pub mod loader;
pub mod tokenizer;

pub use block::Block;
pub use loader::{load_world_str, LoadReport};
pub use tokenizer::{BlockKind, TokenStats};

use crate::assets::AssetLoader;
use crate::audio::AudioBackend;
use crate::scene::Scene;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Reads a world file and merges it into `scene`.
///
/// Only an unreadable file is an error, and the scene is left untouched in that case. Problems inside
/// the file are logged and the offending blocks skipped.
pub fn load_world_file(
    scene: &mut Scene,
    path: impl AsRef<Path>,
    assets: &mut dyn AssetLoader,
    audio: &mut dyn AudioBackend,
) -> Result<LoadReport> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).with_context(|| format!("Failed to read world file {}", path.display()))?;
    let report = load_world_str(scene, &text, assets, audio);
    log::info!(
        "[world] loaded {} ({} blocks, {} dropped): {}",
        path.display(),
        report.tokens.blocks,
        report.dropped,
        report.counts
    );
    Ok(report)
}

/// A classified block detached from the tokenizer's reusable buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedBlock {
    pub kind: BlockKind,
    pub numbers: Vec<f32>,
    pub strings: Vec<String>,
}

/// Tokenizes and classifies without touching a scene.
pub fn parse_world_str(text: &str) -> Vec<ParsedBlock> {
    let mut blocks = Vec::new();
    tokenizer::tokenize(text, |kind, block| {
        blocks.push(ParsedBlock { kind, numbers: block.numbers.clone(), strings: block.strings.clone() })
    });
    blocks
}

pub fn parse_world_file(path: impl AsRef<Path>) -> Result<Vec<ParsedBlock>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).with_context(|| format!("Failed to read world file {}", path.display()))?;
    Ok(parse_world_str(&text))
}
