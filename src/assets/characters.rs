use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::foundation::error::{ReelError, ReelResult};

/// File extensions accepted as reference images.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

pub(crate) fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.iter().any(|x| ext.eq_ignore_ascii_case(x)))
}

/// A named entity with one or more reference images, immutable once loaded.
#[derive(Debug, Clone)]
pub struct Character {
    name: String,
    images: Vec<PathBuf>,
}

impl Character {
    // Only constructed by the library loader, which guarantees `images` is
    // non-empty.
    fn new(name: String, images: Vec<PathBuf>) -> Self {
        debug_assert!(!images.is_empty());
        Self { name, images }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The character's primary (first) reference image.
    pub fn primary(&self) -> &Path {
        &self.images[0]
    }

    /// The image at `index`, or the primary image when out of bounds.
    pub fn image_at(&self, index: usize) -> &Path {
        self.images
            .get(index)
            .map(PathBuf::as_path)
            .unwrap_or_else(|| self.primary())
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }
}

/// Name-keyed character mapping loaded from a directory tree.
///
/// Each subdirectory of the root is a character holding every supported image
/// inside it (directory enumeration order is the canonical image order). A
/// loose top-level image becomes a single-image character named by its file
/// stem, unless a subdirectory already claimed that name.
#[derive(Debug, Default)]
pub struct CharacterLibrary {
    characters: BTreeMap<String, Character>,
}

impl CharacterLibrary {
    pub fn load(dir: &Path) -> ReelResult<Self> {
        if !dir.is_dir() {
            return Err(ReelError::input(format!(
                "characters directory not found: '{}'",
                dir.display()
            )));
        }

        let entries: Vec<PathBuf> = std::fs::read_dir(dir)
            .map_err(|e| {
                ReelError::input(format!(
                    "failed to read characters directory '{}': {e}",
                    dir.display()
                ))
            })?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .collect();

        let mut characters = BTreeMap::new();

        // Subdirectories claim their names first; loose files only fill gaps.
        for path in entries.iter().filter(|p| p.is_dir()) {
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let images = Self::images_in(path)?;
            if images.is_empty() {
                continue;
            }
            tracing::info!(character = name, images = images.len(), "loaded character");
            characters.insert(name.to_owned(), Character::new(name.to_owned(), images));
        }

        for path in entries.iter().filter(|p| p.is_file()) {
            if !has_image_extension(path) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|n| n.to_str()) else {
                continue;
            };
            if characters.contains_key(stem) {
                continue;
            }
            tracing::info!(character = stem, "loaded character from single image");
            characters.insert(
                stem.to_owned(),
                Character::new(stem.to_owned(), vec![path.clone()]),
            );
        }

        if characters.is_empty() {
            return Err(ReelError::input(format!(
                "no character images found in '{}'",
                dir.display()
            )));
        }
        Ok(Self { characters })
    }

    fn images_in(dir: &Path) -> ReelResult<Vec<PathBuf>> {
        let mut images = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(|e| {
            ReelError::input(format!(
                "failed to read character directory '{}': {e}",
                dir.display()
            ))
        })? {
            let Ok(entry) = entry else { continue };
            let path = entry.path();
            if path.is_file() && has_image_extension(&path) {
                images.push(path);
            }
        }
        Ok(images)
    }

    /// Look up a character: exact name match first, case-insensitive second.
    pub fn get(&self, name: &str) -> Option<&Character> {
        if let Some(character) = self.characters.get(name) {
            return Some(character);
        }
        self.characters
            .values()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// The indexed reference image for `name`, if the character exists.
    pub fn image_for(&self, name: &str, index: usize) -> Option<&Path> {
        self.get(name).map(|c| c.image_at(index))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.characters.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.characters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        std::fs::write(path, b"x").unwrap();
    }

    #[test]
    fn subdirectories_become_characters() {
        let dir = tempfile::tempdir().unwrap();
        let sarah = dir.path().join("Sarah");
        std::fs::create_dir(&sarah).unwrap();
        touch(&sarah.join("a.jpg"));
        touch(&sarah.join("b.png"));
        touch(&sarah.join("notes.txt"));

        let library = CharacterLibrary::load(dir.path()).unwrap();
        let character = library.get("Sarah").unwrap();
        assert_eq!(character.image_count(), 2);
    }

    #[test]
    fn loose_file_yields_character_unless_claimed() {
        let dir = tempfile::tempdir().unwrap();
        let jones = dir.path().join("Jones");
        std::fs::create_dir(&jones).unwrap();
        touch(&jones.join("ref.jpg"));
        // Loose file with the claimed name is ignored; a fresh name is not.
        touch(&dir.path().join("Jones.png"));
        touch(&dir.path().join("Miguel.png"));

        let library = CharacterLibrary::load(dir.path()).unwrap();
        assert_eq!(library.len(), 2);
        assert!(library.get("Jones").unwrap().primary().ends_with("ref.jpg"));
        assert_eq!(library.get("Miguel").unwrap().image_count(), 1);
    }

    #[test]
    fn lookup_falls_back_to_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("Sarah.jpg"));

        let library = CharacterLibrary::load(dir.path()).unwrap();
        assert!(library.get("SARAH").is_some());
        assert!(library.get("sarah").is_some());
        assert!(library.get("NOBODY").is_none());
    }

    #[test]
    fn out_of_range_index_returns_primary() {
        let dir = tempfile::tempdir().unwrap();
        let sarah = dir.path().join("sarah");
        std::fs::create_dir(&sarah).unwrap();
        touch(&sarah.join("a.jpg"));
        touch(&sarah.join("b.png"));

        let library = CharacterLibrary::load(dir.path()).unwrap();
        let character = library.get("sarah").unwrap();
        assert_eq!(character.image_at(0), character.primary());
        assert_eq!(character.image_at(99), character.primary());
    }

    #[test]
    fn missing_or_empty_directory_is_an_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            CharacterLibrary::load(&missing),
            Err(ReelError::Input(_))
        ));
        assert!(matches!(
            CharacterLibrary::load(dir.path()),
            Err(ReelError::Input(_))
        ));
    }
}
