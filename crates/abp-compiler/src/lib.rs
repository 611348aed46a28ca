//! Offline filter-list compiler.
//!
//! Turns one or more filter-list text files into the binary snapshot format
//! `abp_core::snapshot` reads at runtime, so a deployment loads a
//! pre-parsed, pre-indexed index instead of re-lexing a multi-megabyte list
//! on every startup.

pub mod builder;
pub mod optimizer;
pub mod parser;

pub use builder::{compile, compile_with_index};
pub use optimizer::dedup_lines;
pub use parser::read_sources;
