use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Finds resource files by name.
///
/// A name that already points at an existing file is used as is. Otherwise the file's base name
/// is looked up anywhere below the resources directory.
#[derive(Debug, Clone)]
pub struct ResourceLocator {
    root: PathBuf,
}

impl ResourceLocator {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn resolve(&self, name: impl AsRef<Path>) -> Option<PathBuf> {
        let name = name.as_ref();
        if name.is_file() {
            return Some(name.to_path_buf());
        }

        let file_name = name.file_name()?;
        WalkDir::new(&self.root)
            .follow_links(true)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .find(|entry| entry.file_type().is_file() && entry.file_name() == file_name)
            .map(|entry| entry.into_path())
    }

    /// Like [`resolve`](Self::resolve) but first tries `dir/name`.
    pub fn resolve_in(&self, dir: &Path, name: &str) -> Option<PathBuf> {
        let direct = dir.join(name);
        if direct.is_file() {
            return Some(direct);
        }
        self.resolve(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn finds_nested_file_by_base_name() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("img").join("sprites");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("walk.png"), b"x").unwrap();

        let locator = ResourceLocator::new(dir.path());
        let found = locator.resolve("somewhere/else/walk.png").unwrap();
        assert_eq!(found, nested.join("walk.png"));

        assert!(locator.resolve("missing.png").is_none());
    }

    #[test]
    fn existing_path_wins() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.png");
        fs::write(&file, b"x").unwrap();

        let locator = ResourceLocator::new("/definitely/not/here");
        assert_eq!(locator.resolve(&file).unwrap(), file);
    }

    #[test]
    fn resolve_in_prefers_directory() {
        let dir = tempfile::tempdir().unwrap();
        let fonts = dir.path().join("fonts");
        fs::create_dir_all(&fonts).unwrap();
        fs::write(fonts.join("plex.ttf"), b"x").unwrap();

        let locator = ResourceLocator::new(dir.path());
        assert_eq!(locator.resolve_in(&fonts, "plex.ttf").unwrap(), fonts.join("plex.ttf"));
    }
}
