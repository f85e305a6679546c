//! Support code for the `adopt` binary
//!
//! Run-file parsing and text reports live here so they can be tested
//! without spawning the binary.

pub mod report;
pub mod run_file;

pub use run_file::RunFile;
