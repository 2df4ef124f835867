//! Locating and decoding frame image files

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::warn;

const FRAME_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "tif", "tiff", "bmp"];

/// Expand every input (file, directory or glob pattern) into a sorted list of frame files
pub(crate) fn collect_frames(
    inputs: &[String],
    recursive: bool,
    pattern: Option<&str>,
) -> Result<Vec<PathBuf>> {
    let mut frames = Vec::new();

    for input in inputs {
        let path = PathBuf::from(input);
        if path.is_file() {
            if is_frame_file(&path) {
                frames.push(path);
            } else {
                warn!("Skipping unsupported file: {}", path.display());
            }
        } else if path.is_dir() {
            frames.extend(find_frame_files(&path, recursive, pattern)?);
        } else if looks_like_glob(input) {
            let matches =
                glob::glob(input).with_context(|| format!("Invalid glob pattern: {}", input))?;
            for entry in matches {
                let entry = entry.context("Failed to read glob match")?;
                if entry.is_file() && is_frame_file(&entry) {
                    frames.push(entry);
                }
            }
        } else {
            anyhow::bail!(
                "Input path does not exist or is not accessible: {}",
                path.display()
            );
        }
    }

    frames.sort();
    frames.dedup();
    Ok(frames)
}

fn find_frame_files(dir: &Path, recursive: bool, pattern: Option<&str>) -> Result<Vec<PathBuf>> {
    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut files = Vec::new();

    for entry in walkdir::WalkDir::new(dir).max_depth(max_depth) {
        let entry = entry.with_context(|| format!("Failed to walk {}", dir.display()))?;
        if entry.file_type().is_file() {
            let path = entry.path();
            if is_frame_file(path) && matches_pattern(path, pattern) {
                files.push(path.to_path_buf());
            }
        }
    }
    Ok(files)
}

/// Check if file is a decodable frame based on extension
fn is_frame_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| FRAME_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

/// Check if file name matches the given pattern
fn matches_pattern(path: &Path, pattern: Option<&str>) -> bool {
    match pattern {
        Some(pat) => path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| glob::Pattern::new(pat).is_ok_and(|p| p.matches(name))),
        None => true,
    }
}

fn looks_like_glob(input: &str) -> bool {
    input.contains(['*', '?', '['])
}

/// A decoded frame: packed 3-byte pixels plus its size
#[derive(Debug)]
pub(crate) struct DecodedFrame {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) pixels: Vec<u8>,
}

/// Decode an image file to packed 8-bit RGB
pub(crate) fn load_frame(path: &Path) -> Result<DecodedFrame> {
    let image = image::open(path)
        .with_context(|| format!("Failed to decode frame {}", path.display()))?
        .to_rgb8();
    Ok(DecodedFrame {
        width: image.width(),
        height: image.height(),
        pixels: image.into_raw(),
    })
}

/// Output file for frame `index` with the given prefix, e.g. `mask_000042.png`
pub(crate) fn output_path(dir: &Path, prefix: &str, index: usize) -> PathBuf {
    dir.join(format!("{}_{:06}.png", prefix, index))
}
