pub mod constants;
pub mod fs_utils;

pub use constants::*;
pub use fs_utils::{guide_dir, guide_paths, sanitize_filename};
