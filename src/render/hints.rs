//! Resource hints.
//!
//! Files a page needs up front (`initial` plus the lazy chunks the app
//! reported as used) are preloaded, the remaining `async` files prefetched.
//! In modern renders scripts are looked up in the [`AssetMapping`]: a mapped
//! script becomes a `modulepreload` of its modern counterpart, an unmapped
//! one gets no hint (its `nomodule` tag still loads it).

use crate::config::RenderConfig;
use crate::manifest::{AssetMapping, AssetType, FileRef, Manifest};
use crate::utils::url::url_join;
use rustc_hash::FxHashSet;

/// Inputs shared by hint, style and script rendering.
#[derive(Clone, Copy)]
pub struct AssetContext<'a> {
    pub public_path: &'a str,
    pub render: &'a RenderConfig,
    /// Present in modern renders.
    pub mapping: Option<&'a AssetMapping>,
}

impl AssetContext<'_> {
    pub fn url(&self, file: &str) -> String {
        url_join(self.public_path, file)
    }

    pub fn crossorigin(&self) -> String {
        crossorigin_attr(self.render.crossorigin.as_deref())
    }
}

/// ` crossorigin` / ` crossorigin="value"` / nothing.
pub fn crossorigin_attr(value: Option<&str>) -> String {
    match value {
        None => String::new(),
        Some("") => " crossorigin".to_string(),
        Some(value) => format!(" crossorigin=\"{value}\""),
    }
}

/// Initial files followed by the used files not already listed.
pub fn preload_files(manifest: &Manifest, used: &[String]) -> Vec<FileRef> {
    let mut seen: FxHashSet<&str> = FxHashSet::default();
    let mut files = Vec::with_capacity(manifest.initial.len() + used.len());

    for file in &manifest.initial {
        if seen.insert(file.file.as_str()) {
            files.push(file.clone());
        }
    }
    for file in used {
        if seen.insert(file.as_str()) {
            files.push(
                manifest
                    .file_ref(file)
                    .cloned()
                    .unwrap_or_else(|| FileRef::new(file.clone())),
            );
        }
    }
    files
}

/// Async files not part of the preload set.
pub fn prefetch_files<'a>(manifest: &'a Manifest, preload: &[FileRef]) -> Vec<&'a FileRef> {
    let preloaded: FxHashSet<&str> = preload.iter().map(|f| f.file.as_str()).collect();
    manifest
        .async_files
        .iter()
        .filter(|f| !preloaded.contains(f.file.as_str()))
        .collect()
}

/// Preload links followed by prefetch links.
pub fn render_resource_hints(
    manifest: &Manifest,
    preload: &[FileRef],
    ctx: &AssetContext,
) -> String {
    let mut out = String::new();

    for file in preload {
        if !ctx.render.should_preload(file.asset_type) {
            continue;
        }
        out.push_str(&preload_link(file, ctx));
    }

    for file in prefetch_files(manifest, preload) {
        if !ctx.render.should_prefetch(file.asset_type) {
            continue;
        }
        match (ctx.mapping, file.is_script()) {
            (Some(mapping), true) => {
                if let Some(modern) = mapping.modern_for(&file.file) {
                    out.push_str(&format!("<link rel=\"prefetch\" href=\"{}\">", ctx.url(modern)));
                }
            }
            _ => out.push_str(&format!("<link rel=\"prefetch\" href=\"{}\">", ctx.url(&file.file))),
        }
    }

    out
}

fn preload_link(file: &FileRef, ctx: &AssetContext) -> String {
    if let (Some(mapping), true) = (ctx.mapping, file.is_script()) {
        return match mapping.modern_for(&file.file) {
            Some(modern) => format!(
                "<link rel=\"modulepreload\" href=\"{}\"{}>",
                ctx.url(modern),
                ctx.crossorigin()
            ),
            None => String::new(),
        };
    }

    let as_attr = match file.asset_type.as_str() {
        "" => String::new(),
        ty => format!(" as=\"{ty}\""),
    };
    let extra = if file.asset_type == AssetType::Font {
        format!(" type=\"font/{}\" crossorigin", file.extension)
    } else {
        String::new()
    };

    format!(
        "<link rel=\"preload\" href=\"{}\"{}{}>",
        ctx.url(&file.file),
        as_attr,
        extra
    )
}
