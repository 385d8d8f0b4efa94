//! Tagged documents in, knowledge map out.
//!
//! Runs co-occurrence analysis, levels the resulting tags, and connects every
//! pair of tags whose co-occurrence ratio reaches the threshold. The ratio
//! becomes the relation strength.

use std::time::Instant;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, instrument};

use starmap_core::{defaults, logging, Document, Error, Graph, Relation, Result};

use crate::cooccurrence::{CoOccurrenceAnalyzer, TagAnalysis};
use crate::layout::LayoutGenerator;
use crate::ledger::ContributionLedger;
use crate::leveler::NodeLeveler;

/// Tunables for [`analyze_documents`].
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOptions {
    pub min_relation: f64,
    pub max_level: u32,
    /// Credited with every node the analysis creates.
    pub contributor: String,
    pub layout_seed: u64,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            min_relation: defaults::MIN_RELATION,
            max_level: defaults::MAX_LEVEL,
            contributor: defaults::CONTRIBUTOR.to_string(),
            layout_seed: defaults::LAYOUT_SEED,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisSummary {
    pub total_notes: usize,
    pub unique_tags: usize,
    pub total_relations: usize,
    pub min_relation: f64,
    pub max_level: u32,
}

/// A graph built from documents, with the numbers behind it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KnowledgeMap {
    #[serde(flatten)]
    pub graph: Graph,
    pub analysis: AnalysisSummary,
    pub contributions: ContributionLedger,
    #[serde(skip)]
    pub tags: TagAnalysis,
}

/// Build a knowledge map from `documents`. An empty list is rejected.
#[instrument(
    skip_all,
    fields(subsystem = "fusion", component = "analysis", op = "analyze_documents")
)]
pub fn analyze_documents(documents: &[Document], options: &AnalysisOptions) -> Result<KnowledgeMap> {
    let start = Instant::now();
    if documents.is_empty() {
        return Err(Error::InvalidInput(
            "at least one document is required".to_string(),
        ));
    }

    let analyzer = CoOccurrenceAnalyzer::new(options.min_relation)?;
    let leveler = NodeLeveler::new(options.max_level)?;
    let tags = analyzer.analyze(documents)?;

    let mut layout = LayoutGenerator::new(options.layout_seed);
    let nodes = leveler.level(&tags, &mut layout)?;

    let mut ledger = ContributionLedger::at(Utc::now());
    for node in &nodes {
        ledger.record_create(&options.contributor, node);
    }

    let mut graph = Graph::from_parts(nodes, Vec::new())?;
    for pair in &tags.pairs {
        graph.add_relation(Relation::new(
            pair.tag_a.as_str(),
            pair.tag_b.as_str(),
            pair.ratio.min(1.0),
        )?)?;
    }

    let analysis = AnalysisSummary {
        total_notes: documents.len(),
        unique_tags: graph.node_count(),
        total_relations: graph.relation_count(),
        min_relation: analyzer.min_relation(),
        max_level: leveler.max_level(),
    };

    info!(
        { logging::DOCUMENT_COUNT } = analysis.total_notes,
        { logging::NODE_COUNT } = analysis.unique_tags,
        { logging::RELATION_COUNT } = analysis.total_relations,
        { logging::CONTRIBUTOR } = options.contributor.as_str(),
        { logging::DURATION_MS } = start.elapsed().as_millis() as u64,
        "Knowledge map analysis completed"
    );

    Ok(KnowledgeMap {
        graph,
        analysis,
        contributions: ledger,
        tags,
    })
}
