//! Content digesting
//!
//! Whole-file identity is size plus an MD5 digest of the file contents.
//! Digesting is the only place file data is read; it runs on classifier
//! threads and needs no locking.

pub mod checksum;

pub use checksum::{checksum_file, compute_md5};
