//! GoPro Metadata Format (GPMF) payload parsing.
//!
//! See: <https://github.com/gopro/gpmf-parser>

mod cursor;
mod klv;

pub use cursor::GpmfCursor;
pub use klv::{is_valid_key, Klv, KLV_HEADER_SIZE};
