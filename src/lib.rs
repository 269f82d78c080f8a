//! sha256report library crate
//!
//! Hashes every file under a directory, stores the result as a timestamped
//! snapshot, and diffs it against the previous snapshot. The CLI binary is a
//! thin layer over `audit::Audit`.

pub mod audit;
pub mod build_events;
pub mod builder;
pub mod checksum;
pub mod cli;
pub mod config;
pub mod diff;
pub mod output;
pub mod progress;
pub mod recovery;
pub mod repository;
pub mod scanner;
pub mod size;
pub mod snapshot;
pub mod theme;
