//! Shared helpers.
//!
//! | Module   | Purpose                                           |
//! |----------|---------------------------------------------------|
//! | `fs`     | Output directory preparation and file writes      |
//! | `hash`   | Content fingerprints and ETags (blake3)           |
//! | `html`   | Entity escaping                                   |
//! | `mime`   | Content-Type lookup for served files              |
//! | `plural` | Count formatting for log lines                    |
//! | `url`    | URL joining, slash normalization, decoding        |

pub mod fs;
pub mod hash;
pub mod html;
pub mod mime;
pub mod plural;
pub mod url;
