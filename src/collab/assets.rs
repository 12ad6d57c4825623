use std::path::PathBuf;

use super::{AssetCategory, AssetStore, Image};

pub const IMAGE_EXTENSION: &str = "bmp";

/// Images laid out as `<root>/<category>/<key>.bmp`.
pub struct FileAssets {
    root: PathBuf,
}

impl FileAssets {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl AssetStore for FileAssets {
    fn image(&self, category: AssetCategory, key: &str) -> Option<Image> {
        if key.is_empty() || key.contains(['/', '\\']) || key.starts_with('.') {
            return None;
        }
        let path = self
            .root
            .join(category.as_str())
            .join(format!("{key}.{IMAGE_EXTENSION}"));
        path.is_file().then(|| Image {
            category,
            key: key.to_string(),
            path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn finds_image_by_category_and_key() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("error")).unwrap();
        fs::write(dir.path().join("error").join("102.bmp"), b"BM").unwrap();
        let assets = FileAssets::new(dir.path());

        let image = assets.image(AssetCategory::Error, "102").unwrap();
        assert_eq!(image.key, "102");
        assert!(image.path.ends_with("error/102.bmp"));
        assert!(assets.image(AssetCategory::Error, "001").is_none());
        assert!(assets.image(AssetCategory::Symbol, "102").is_none());
    }

    #[test]
    fn rejects_path_like_keys() {
        let dir = tempfile::tempdir().unwrap();
        let assets = FileAssets::new(dir.path());
        assert!(assets.image(AssetCategory::Weather, "../config").is_none());
        assert!(assets.image(AssetCategory::Weather, "").is_none());
    }
}
