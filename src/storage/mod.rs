//! Local storage helpers
//!
//! JSON documents written atomically under the data directory.

pub mod file_io;

pub use file_io::{read_json, read_json_required, write_json_atomic};
