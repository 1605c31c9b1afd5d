//! Shared infrastructure utilities for Nexus.
//!
//! - **`atomic_write`**: Crash-safe file persistence (temp + rename), used for
//!   the reminder store and config edits
//! - **`paths`**: `~` expansion for user-supplied paths

pub mod atomic_write;
pub mod paths;

pub use atomic_write::{WriteMode, atomic_write, atomic_write_with_mode, recover_bak_file};
pub use paths::{expand_home, home_dir};
