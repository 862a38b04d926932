//! Content-Security-Policy hashes for inline scripts.
//!
//! Every inline script the pipeline emits (serialized state, the Safari
//! `nomodule` fix) is digested so a strict `script-src` can allow it:
//!
//! ```ignore
//! let hashes = csp::hashes_for(&[state_script], HashAlgorithm::Sha256);
//! // ["'sha256-47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU='"]
//! let value = csp::build_policy(&config.render.csp, &hashes, config.build.dev);
//! ```

use crate::config::CspConfig;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha384, Sha512};

/// Digest used for `script-src` hash sources.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgorithm {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Sha384 => "sha384",
            Self::Sha512 => "sha512",
        }
    }

    fn digest(self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::Sha256 => Sha256::digest(data).to_vec(),
            Self::Sha384 => Sha384::digest(data).to_vec(),
            Self::Sha512 => Sha512::digest(data).to_vec(),
        }
    }
}

/// Hash source token for one inline script body: `'sha256-<base64>'`.
pub fn hash_script(script: &str, algorithm: HashAlgorithm) -> String {
    let digest = STANDARD.encode(algorithm.digest(script.as_bytes()));
    format!("'{}-{}'", algorithm.as_str(), digest)
}

/// Hash source tokens for several scripts, in input order.
pub fn hashes_for<S: AsRef<str>>(scripts: &[S], algorithm: HashAlgorithm) -> Vec<String> {
    scripts
        .iter()
        .map(|s| hash_script(s.as_ref(), algorithm))
        .collect()
}

/// Build the policy header value.
///
/// Without a policy table the value is a single `script-src` directive:
/// `'self'`, `'unsafe-eval'` in development, the hashes, then the allowed
/// sources. With a table, `'self'` and the hashes are merged into its
/// `script-src` (created if absent) and directives are joined with `; `.
pub fn build_policy(config: &CspConfig, hashes: &[String], dev: bool) -> String {
    let mut script_src: Vec<String> = vec!["'self'".into()];
    if dev {
        script_src.push("'unsafe-eval'".into());
    }
    script_src.extend(hashes.iter().cloned());
    script_src.extend(config.allowed_sources.iter().cloned());

    if config.policies.is_empty() {
        return format!("script-src {}", dedup(script_src).join(" "));
    }

    let mut directives = Vec::with_capacity(config.policies.len() + 1);
    if !config.policies.contains_key("script-src") {
        directives.push(format!("script-src {}", dedup(script_src.clone()).join(" ")));
    }
    for (name, sources) in &config.policies {
        let sources = if name == "script-src" {
            let mut merged = script_src.clone();
            merged.extend(sources.iter().cloned());
            dedup(merged)
        } else {
            sources.clone()
        };
        directives.push(format!("{} {}", name, sources.join(" ")).trim_end().to_string());
    }
    directives.join("; ")
}

/// `<meta http-equiv>` fallback for hosts that cannot set headers.
pub fn meta_tag(hashes: &[String]) -> String {
    format!(
        "<meta http-equiv=\"Content-Security-Policy\" content=\"script-src {}\">",
        hashes.join(" ")
    )
}

fn dedup(sources: Vec<String>) -> Vec<String> {
    let mut seen = rustc_hash::FxHashSet::default();
    sources
        .into_iter()
        .filter(|s| seen.insert(s.clone()))
        .collect()
}
