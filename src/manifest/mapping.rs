//! Legacy <-> modern asset correspondence.
//!
//! Both builds index their emitted files by the same per-component hash.
//! Within one hash, files correspond by position:
//!
//! ```text
//! legacy  a1b2: [pages/index.js,        pages/index.css]
//! modern  a1b2: [pages/index.modern.js]
//!               ^ paired                 ^ no counterpart, skipped
//! ```

use super::Manifest;
use rustc_hash::FxHashMap;

/// Bidirectional legacy/modern file index, rebuilt whenever either manifest changes.
#[derive(Debug, Clone, Default)]
pub struct AssetMapping {
    forward: FxHashMap<String, String>,
    inverse: FxHashMap<String, String>,
}

impl AssetMapping {
    pub fn build(legacy: &Manifest, modern: &Manifest) -> Self {
        let mut mapping = Self::default();

        for (hash, legacy_files) in &legacy.assets_mapping {
            let Some(modern_files) = modern.assets_mapping.get(hash) else {
                continue;
            };
            for (legacy_file, modern_file) in legacy_files.iter().zip(modern_files) {
                mapping
                    .forward
                    .insert(legacy_file.clone(), modern_file.clone());
                mapping
                    .inverse
                    .insert(modern_file.clone(), legacy_file.clone());
            }
        }

        mapping
    }

    pub fn modern_for(&self, legacy: &str) -> Option<&str> {
        self.forward.get(legacy).map(String::as_str)
    }

    pub fn legacy_for(&self, modern: &str) -> Option<&str> {
        self.inverse.get(modern).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }
}
