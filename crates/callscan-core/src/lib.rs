//! callscan core library: static call-graph and code-issue analysis of Python
//! projects.
//!
//! A run scans a source tree ([`indexer`]), builds a name-keyed call graph,
//! applies heuristic issue passes ([`analysis`]), optionally asks a
//! chat-completions service to describe each function ([`describe`]), and
//! assembles a visualization dataset that can be saved as JSON or rendered to
//! HTML ([`report`]). [`runner`] drives the pipeline, either inline or as
//! background runs with pollable progress.

pub mod analysis;
pub mod config;
pub mod describe;
pub mod errors;
pub mod indexer;
pub mod models;
pub mod report;
pub mod runner;

pub use errors::{CallscanError, CallscanResult};
