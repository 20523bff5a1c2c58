use std::path::{Path, PathBuf};

use crate::assets::characters::has_image_extension;
use crate::foundation::error::{ReelError, ReelResult};

/// Flat pool of location images, matched against scene locations by
/// normalized substring comparison.
#[derive(Debug, Default)]
pub struct LocationPool {
    images: Vec<PathBuf>,
}

impl LocationPool {
    pub fn load(dir: &Path) -> ReelResult<Self> {
        if !dir.is_dir() {
            return Err(ReelError::input(format!(
                "locations directory not found: '{}'",
                dir.display()
            )));
        }

        let mut images = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(|e| {
            ReelError::input(format!(
                "failed to read locations directory '{}': {e}",
                dir.display()
            ))
        })? {
            let Ok(entry) = entry else { continue };
            let path = entry.path();
            if path.is_file() && has_image_extension(&path) {
                images.push(path);
            }
        }

        if images.is_empty() {
            return Err(ReelError::input(format!(
                "no location images found in '{}'",
                dir.display()
            )));
        }
        tracing::info!(images = images.len(), "loaded location pool");
        Ok(Self { images })
    }

    /// Build a pool from explicit paths. Empty pools are allowed here; the
    /// frame composer answers them with a placeholder frame.
    pub fn from_paths(images: Vec<PathBuf>) -> Self {
        Self { images }
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// The pool image best matching a scene location.
    ///
    /// Both sides are normalized (lowercased, `_`/`-` mapped to spaces,
    /// whitespace collapsed, extension stripped); the first entry where one
    /// normalized string contains the other wins. An unmatched location falls
    /// back to the first entry in pool order.
    pub fn best_match(&self, location: &str) -> Option<&Path> {
        if self.images.is_empty() {
            return None;
        }

        let wanted = normalize(location);
        for path in &self.images {
            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default();
            let candidate = normalize(stem);
            if candidate.contains(&wanted) || wanted.contains(&candidate) {
                return Some(path);
            }
        }
        Some(&self.images[0])
    }
}

fn normalize(s: &str) -> String {
    let mapped: String = s
        .chars()
        .map(|c| match c {
            '_' | '-' => ' ',
            other => other.to_ascii_lowercase(),
        })
        .collect();
    mapped.split_whitespace().collect::<Vec<_>>().join(" ")
}
