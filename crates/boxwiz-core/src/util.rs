//! Common utility functions.

pub mod data;
pub mod process;
pub mod fs;

// Re-export commonly used items
pub use data::{compact_json, deep_merge, get_path, indent_json, set_path, strip_utf8_bom};
pub use process::{run_async, ProcessOutput};
pub use fs::{expand_path, slurp_limited, write_atomic};
