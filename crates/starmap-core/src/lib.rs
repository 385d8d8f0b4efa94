//! # starmap-core
//!
//! Core types, traits, and abstractions for the starmap knowledge graph
//! engine.
//!
//! This crate provides the graph data model (nodes, relations, conflict and
//! contribution records), the validating [`Graph`] container, the error
//! taxonomy, and the [`RelationScorer`] seam that other starmap crates
//! depend on. It performs no I/O.

pub mod defaults;
pub mod error;
pub mod graph;
pub mod logging;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use graph::{Graph, GraphData};
pub use models::*;
pub use traits::*;
