//! Filesystem locations for configuration and the default root.

pub mod xdg_root;
