//! Command implementations for CLI tools.
//!
//! Each module contains the full implementation for a command,
//! which is invoked by a thin wrapper binary.

pub mod revalue;
