//! Settings resolved against the mirrored root.

pub mod storage_paths;
