//! # starmap-fusion
//!
//! Knowledge-graph construction and fusion for starmap.
//!
//! - [`cooccurrence`]: tag co-occurrence ratios over tagged documents
//! - [`leveler`]: hierarchy levels and importance for tag nodes
//! - [`synthesis`]: pairwise relation scoring
//! - [`fusion`]: merging two node sets under a [`FusionStrategy`]
//! - [`ledger`]: append-only contribution history
//! - [`analysis`]: documents to knowledge map in one call
//! - [`query`]: node and relation filters
//!
//! Everything here is synchronous and performs no I/O.

pub mod analysis;
pub mod cooccurrence;
pub mod fusion;
pub mod layout;
pub mod ledger;
pub mod leveler;
pub mod query;
pub mod synthesis;

pub use analysis::{analyze_documents, AnalysisOptions, AnalysisSummary, KnowledgeMap};
pub use cooccurrence::{CoOccurrenceAnalyzer, TagAnalysis, TagPair};
pub use fusion::{fuse, FusionEngine, FusionOutcome, FusionRequest, FusionResult, FusionStrategy};
pub use layout::LayoutGenerator;
pub use ledger::ContributionLedger;
pub use leveler::NodeLeveler;
pub use query::{category_subgraph, NodeFilter, RelationFilter};
pub use synthesis::{FallbackScorer, RelationSynthesizer, StructuralScorer};

use starmap_core::{Error, Result};

/// Accept a relation threshold in [0, 1].
pub(crate) fn check_min_relation(value: f64) -> Result<f64> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(Error::InvalidInput(format!(
            "min_relation must be within [0, 1], got {}",
            value
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_relation_bounds() {
        assert_eq!(check_min_relation(0.0).unwrap(), 0.0);
        assert_eq!(check_min_relation(1.0).unwrap(), 1.0);
        assert!(check_min_relation(-0.01).is_err());
        assert!(check_min_relation(f64::INFINITY).is_err());
    }

    #[test]
    fn test_engine_types_are_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<FusionEngine>();
        assert_sync::<FusionEngine>();
        assert_send::<FusionEngine<FallbackScorer<StructuralScorer>>>();
        assert_sync::<FusionEngine<FallbackScorer<StructuralScorer>>>();
        assert_send::<RelationSynthesizer>();
        assert_sync::<RelationSynthesizer>();
        assert_send::<CoOccurrenceAnalyzer>();
        assert_sync::<CoOccurrenceAnalyzer>();
        assert_send::<NodeLeveler>();
        assert_sync::<NodeLeveler>();
        assert_send::<LayoutGenerator>();
        assert_sync::<LayoutGenerator>();
        assert_send::<ContributionLedger>();
        assert_sync::<ContributionLedger>();
        assert_send::<FusionRequest>();
        assert_sync::<FusionRequest>();
        assert_send::<FusionOutcome>();
        assert_sync::<FusionOutcome>();
        assert_send::<KnowledgeMap>();
        assert_sync::<KnowledgeMap>();
        assert_send::<starmap_core::Graph>();
        assert_sync::<starmap_core::Graph>();
    }
}
