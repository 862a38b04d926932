//! File references derived from manifest entries.

use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Resource class of a bundle file, used for hint and push policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetType {
    Script,
    Style,
    Font,
    Image,
    Other,
}

static IMAGE_EXT: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"^(?:jpe?g|png|svg|gif|webp|ico)$").unwrap());
static FONT_EXT: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"^(?:woff2?|ttf|otf|eot)$").unwrap());

impl AssetType {
    /// Classify a file extension (without the dot).
    pub fn from_extension(ext: &str) -> Self {
        match ext {
            "js" | "mjs" => Self::Script,
            "css" => Self::Style,
            e if IMAGE_EXT.is_match(e) => Self::Image,
            e if FONT_EXT.is_match(e) => Self::Font,
            _ => Self::Other,
        }
    }

    /// Value of the `as` attribute in `<link rel="preload">`; empty for unknown types.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Script => "script",
            Self::Style => "style",
            Self::Font => "font",
            Self::Image => "image",
            Self::Other => "",
        }
    }
}

/// A bundle file with the properties hints and tags are computed from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileRef {
    pub file: String,
    pub file_without_query: String,
    pub extension: String,
    pub asset_type: AssetType,
}

impl FileRef {
    pub fn new(file: impl Into<String>) -> Self {
        let file = file.into();
        let file_without_query = match file.find('?') {
            Some(i) => file[..i].to_string(),
            None => file.clone(),
        };
        let extension = file_without_query
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_string())
            .filter(|ext| !ext.contains('/'))
            .unwrap_or_default();
        let asset_type = AssetType::from_extension(&extension);

        Self {
            file,
            file_without_query,
            extension,
            asset_type,
        }
    }

    #[inline]
    pub fn is_script(&self) -> bool {
        self.asset_type == AssetType::Script
    }

    #[inline]
    pub fn is_style(&self) -> bool {
        self.asset_type == AssetType::Style
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_type_detection() {
        assert_eq!(FileRef::new("app.js").asset_type, AssetType::Script);
        assert_eq!(FileRef::new("vendor.mjs").asset_type, AssetType::Script);
        assert_eq!(FileRef::new("app.css").asset_type, AssetType::Style);
        assert_eq!(FileRef::new("img/logo.jpeg").asset_type, AssetType::Image);
        assert_eq!(FileRef::new("favicon.ico").asset_type, AssetType::Image);
        assert_eq!(FileRef::new("fonts/inter.woff2").asset_type, AssetType::Font);
        assert_eq!(FileRef::new("fonts/inter.eot").asset_type, AssetType::Font);
        assert_eq!(FileRef::new("data.json").asset_type, AssetType::Other);
        assert_eq!(AssetType::Other.as_str(), "");
    }

    #[test]
    fn test_file_ref_strips_query() {
        let file = FileRef::new("app.js?v=3f2a");
        assert_eq!(file.file, "app.js?v=3f2a");
        assert_eq!(file.file_without_query, "app.js");
        assert_eq!(file.extension, "js");
        assert!(file.is_script());
    }

    #[test]
    fn test_file_ref_without_extension() {
        let file = FileRef::new("v1.2/runtime");
        assert_eq!(file.extension, "");
        assert_eq!(file.asset_type, AssetType::Other);
    }
}
