//! Content hashing with blake3.
//!
//! Used for resource change detection in the manifest store and for
//! `ETag` values on rendered responses.
//!
//! ```ignore
//! use crate::utils::hash;
//!
//! let digest = hash::digest(raw.as_bytes());
//! let tag = hash::etag(html.as_bytes(), false); // -> "\"2c-1a2b3c4d5e6f7a8b\""
//! ```

/// Compute the blake3 digest of some bytes.
#[inline]
pub fn digest<T: AsRef<[u8]> + ?Sized>(data: &T) -> blake3::Hash {
    blake3::hash(data.as_ref())
}

/// Short hex fingerprint (16 chars) of some bytes.
#[inline]
pub fn fingerprint<T: AsRef<[u8]> + ?Sized>(data: &T) -> String {
    hex::encode(&digest(data).as_bytes()[..8])
}

/// Build an entity tag for a response body.
///
/// Format follows the `etag` npm convention: `"<len hex>-<fingerprint>"`,
/// prefixed with `W/` for weak validators.
pub fn etag(body: &[u8], weak: bool) -> String {
    let tag = format!("\"{:x}-{}\"", body.len(), fingerprint(body));
    if weak { format!("W/{tag}") } else { tag }
}

/// Check an `If-None-Match` header value against an entity tag.
///
/// Handles `*`, comma separated lists and weak comparison.
pub fn etag_matches(if_none_match: &str, etag: &str) -> bool {
    let strip = |t: &str| t.trim().trim_start_matches("W/").to_string();
    let target = strip(etag);
    if_none_match
        .split(',')
        .any(|candidate| candidate.trim() == "*" || strip(candidate) == target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_deterministic() {
        assert_eq!(fingerprint("<html></html>"), fingerprint("<html></html>"));
        assert_ne!(fingerprint("<html></html>"), fingerprint("<html> </html>"));
        assert_eq!(fingerprint("x").len(), 16);
    }

    #[test]
    fn test_etag_format() {
        let strong = etag(b"hello", false);
        assert!(strong.starts_with("\"5-"));
        assert!(strong.ends_with('"'));

        let weak = etag(b"hello", true);
        assert_eq!(weak, format!("W/{strong}"));
    }

    #[test]
    fn test_etag_matches() {
        let tag = etag(b"body", false);
        assert!(etag_matches(&tag, &tag));
        assert!(etag_matches(&format!("W/{tag}"), &tag));
        assert!(etag_matches(&format!("\"other\", {tag}"), &tag));
        assert!(etag_matches("*", &tag));
        assert!(!etag_matches("\"other\"", &tag));
    }
}
