//! treetext: hierarchical documents as outline trees of content nodes
//!
//! Layers, innermost first:
//! - [`domain`]: the node tree, its edits and projections (no I/O)
//! - [`application`]: document registry, state migration and services
//! - [`infrastructure`]: filesystem, editor and generation backend adapters
//! - [`cli`]: argument parsing and command dispatch

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
