//! Core traits for starmap abstractions.
//!
//! These define the seams where callers plug in their own behavior.

use crate::error::Result;
use crate::models::Node;

/// Computes the strength of a candidate relation between two nodes.
///
/// The engine ships a cheap structural heuristic; callers that want semantic
/// similarity (an embedding model, a remote classifier) implement this trait
/// and hand it to the relation synthesizer. A scorer may fail, in which case
/// the caller decides whether to abort or fall back.
pub trait RelationScorer: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Strength in [0, 1] for the pair.
    fn score(&self, a: &Node, b: &Node) -> Result<f64>;
}

impl<T: RelationScorer + ?Sized> RelationScorer for &T {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn score(&self, a: &Node, b: &Node) -> Result<f64> {
        (**self).score(a, b)
    }
}

impl<T: RelationScorer + ?Sized> RelationScorer for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn score(&self, a: &Node, b: &Node) -> Result<f64> {
        (**self).score(a, b)
    }
}
