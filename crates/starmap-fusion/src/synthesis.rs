//! Relation synthesis over a merged node set.
//!
//! Every unordered pair of nodes is scored and kept when the score reaches
//! the threshold. The default [`StructuralScorer`] looks only at node
//! attributes:
//!
//! ```text
//! strength = 0.1
//!          + 0.3                             if categories match
//!          + 0.2                             if levels match
//!          + 0.4 * (100 - |Δimportance|) / 100
//! ```
//!
//! clipped to 1.0. Callers wanting semantic relations supply their own
//! [`RelationScorer`], optionally wrapped in a [`FallbackScorer`].

use tracing::{debug, trace, warn};

use starmap_core::{defaults, logging, Error, Node, Relation, RelationScorer, Result};

use crate::check_min_relation;

/// Attribute-based strength heuristic. Never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralScorer;

impl StructuralScorer {
    pub fn strength(a: &Node, b: &Node) -> f64 {
        let mut strength = defaults::SCORE_BASE;
        if a.category == b.category {
            strength += defaults::SCORE_CATEGORY_BONUS;
        }
        if a.level == b.level {
            strength += defaults::SCORE_LEVEL_BONUS;
        }
        let diff = f64::from(a.importance.abs_diff(b.importance));
        strength += (100.0 - diff) / 100.0 * defaults::SCORE_IMPORTANCE_WEIGHT;
        strength.min(1.0)
    }
}

impl RelationScorer for StructuralScorer {
    fn name(&self) -> &str {
        "structural"
    }

    fn score(&self, a: &Node, b: &Node) -> Result<f64> {
        Ok(Self::strength(a, b))
    }
}

/// Wraps a scorer that may fail (a remote classifier, say) and falls back to
/// the structural heuristic whenever it errors or returns a value outside
/// [0, 1]. The wrapped scorer is never authoritative.
#[derive(Debug, Clone)]
pub struct FallbackScorer<S> {
    primary: S,
}

impl<S: RelationScorer> FallbackScorer<S> {
    pub fn new(primary: S) -> Self {
        Self { primary }
    }
}

impl<S: RelationScorer> RelationScorer for FallbackScorer<S> {
    fn name(&self) -> &str {
        self.primary.name()
    }

    fn score(&self, a: &Node, b: &Node) -> Result<f64> {
        match self.primary.score(a, b) {
            Ok(strength) if strength.is_finite() && (0.0..=1.0).contains(&strength) => {
                Ok(strength)
            }
            Ok(strength) => {
                warn!(
                    scorer = self.primary.name(),
                    strength,
                    node_a = %a.name,
                    node_b = %b.name,
                    "Scorer returned out-of-range strength, using structural score"
                );
                Ok(StructuralScorer::strength(a, b))
            }
            Err(e) => {
                let message = e.to_string();
                warn!(
                    scorer = self.primary.name(),
                    { logging::ERROR_MSG } = message.as_str(),
                    node_a = %a.name,
                    node_b = %b.name,
                    "Scorer failed, using structural score"
                );
                Ok(StructuralScorer::strength(a, b))
            }
        }
    }
}

/// Generates pairwise relations for a node list.
#[derive(Debug, Clone)]
pub struct RelationSynthesizer<S = StructuralScorer> {
    scorer: S,
    min_relation: f64,
}

impl RelationSynthesizer<StructuralScorer> {
    pub fn new(min_relation: f64) -> Result<Self> {
        Self::with_scorer(StructuralScorer, min_relation)
    }
}

impl<S: RelationScorer> RelationSynthesizer<S> {
    pub fn with_scorer(scorer: S, min_relation: f64) -> Result<Self> {
        Ok(Self {
            scorer,
            min_relation: check_min_relation(min_relation)?,
        })
    }

    pub fn min_relation(&self) -> f64 {
        self.min_relation
    }

    /// Score every pair `(i, j)` with `i < j` in node order and keep those at
    /// or above the threshold.
    ///
    /// A scorer error or an out-of-range score aborts synthesis; wrap the
    /// scorer in [`FallbackScorer`] to recover instead.
    pub fn synthesize(&self, nodes: &[Node]) -> Result<Vec<Relation>> {
        let mut relations = Vec::new();
        for (i, a) in nodes.iter().enumerate() {
            for b in &nodes[i + 1..] {
                if a.name == b.name {
                    continue;
                }
                let strength = self.scorer.score(a, b)?;
                if !strength.is_finite() || strength < 0.0 {
                    return Err(Error::Scoring(format!(
                        "{} scored {} <-> {} as {}",
                        self.scorer.name(),
                        a.name,
                        b.name,
                        strength
                    )));
                }
                let strength = strength.min(1.0);
                trace!(node_a = %a.name, node_b = %b.name, strength, "Pair scored");
                if strength >= self.min_relation {
                    relations.push(Relation::new(a.name.as_str(), b.name.as_str(), strength)?);
                }
            }
        }

        debug!(
            { logging::COMPONENT } = "synthesizer",
            scorer = self.scorer.name(),
            { logging::NODE_COUNT } = nodes.len(),
            { logging::RELATION_COUNT } = relations.len(),
            { logging::MIN_RELATION } = self.min_relation,
            "Relation synthesis complete"
        );

        Ok(relations)
    }
}
