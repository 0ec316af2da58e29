//! Shared utilities.

mod hash;
mod version;

pub use hash::sha256_hex;
pub use version::{compare_versions, max_version};
