//! Command implementations. Each reads its input file, runs the engine, and
//! returns a serialisable result; printing is left to the binary.

use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use tracing::info;

use starmap_core::{Document, Graph, Node, Relation};
use starmap_fusion::{
    analyze_documents, category_subgraph, FusionEngine, FusionOutcome, FusionRequest,
    FusionStrategy, KnowledgeMap, NodeFilter, RelationFilter,
};

use crate::config::StarmapConfig;

/// Documents file: a bare array, or an object holding one under `documents`
/// (alias `notes`).
#[derive(Deserialize)]
#[serde(untagged)]
enum DocumentsFile {
    List(Vec<Document>),
    Wrapped {
        #[serde(alias = "notes")]
        documents: Vec<Document>,
    },
}

impl DocumentsFile {
    fn into_documents(self) -> Vec<Document> {
        match self {
            Self::List(documents) | Self::Wrapped { documents } => documents,
        }
    }
}

/// Flag values that override the loaded configuration.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub min_relation: Option<f64>,
    pub max_level: Option<u32>,
    pub contributor: Option<String>,
}

impl Overrides {
    pub fn apply(&self, config: &StarmapConfig) -> anyhow::Result<StarmapConfig> {
        let mut config = config.clone();
        if let Some(min_relation) = self.min_relation {
            config.min_relation = min_relation;
        }
        if let Some(max_level) = self.max_level {
            config.max_level = max_level;
        }
        if let Some(contributor) = &self.contributor {
            config.contributor = contributor.clone();
        }
        config.validate()?;
        Ok(config)
    }
}

pub fn read_documents(path: &Path) -> anyhow::Result<Vec<Document>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read documents from {}", path.display()))?;
    let file: DocumentsFile = serde_json::from_str(&content)
        .with_context(|| format!("Invalid documents file {}", path.display()))?;
    Ok(file.into_documents())
}

pub fn read_graph(path: &Path) -> anyhow::Result<Graph> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read graph from {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid graph file {}", path.display()))
}

pub fn analyze(input: &Path, config: &StarmapConfig) -> anyhow::Result<KnowledgeMap> {
    let documents = read_documents(input)?;
    let map = analyze_documents(&documents, &config.analysis_options())?;
    info!(
        input = %input.display(),
        node_count = map.graph.node_count(),
        relation_count = map.graph.relation_count(),
        "Analyze command finished"
    );
    Ok(map)
}

/// Run a fusion request file. `strategy` and `min_relation` override the
/// request's own values; contributors missing from the request default to
/// the configured one.
pub fn fuse(
    request_path: &Path,
    strategy: Option<FusionStrategy>,
    min_relation: Option<f64>,
    config: &StarmapConfig,
) -> anyhow::Result<FusionOutcome> {
    let content = fs::read_to_string(request_path).with_context(|| {
        format!("Failed to read fusion request from {}", request_path.display())
    })?;
    let mut request: FusionRequest = serde_json::from_str(&content)
        .with_context(|| format!("Invalid fusion request {}", request_path.display()))?;

    if let Some(strategy) = strategy {
        request.fusion_type = strategy;
    }
    if let Some(min_relation) = min_relation {
        request.min_relation = min_relation;
    }
    request
        .source_contributor
        .get_or_insert_with(|| config.contributor.clone());
    request
        .target_contributor
        .get_or_insert_with(|| config.contributor.clone());

    let outcome = FusionEngine::new()
        .with_layout_seed(config.layout_seed)
        .fuse(request)?;
    info!(
        request = %request_path.display(),
        node_count = outcome.result.nodes.len(),
        conflict_count = outcome.result.conflicts.len(),
        "Fuse command finished"
    );
    Ok(outcome)
}

pub fn list_nodes(graph: &Graph, filter: &NodeFilter) -> Vec<Node> {
    filter.apply(graph).into_iter().cloned().collect()
}

pub fn list_relations(graph: &Graph, filter: &RelationFilter) -> Vec<Relation> {
    filter.apply(graph).into_iter().cloned().collect()
}

pub fn subgraph(graph: &Graph, category: &str) -> anyhow::Result<Graph> {
    let sub = category_subgraph(graph, category)?;
    if sub.is_empty() {
        bail!("No nodes in category '{}'", category);
    }
    Ok(sub)
}

/// Pretty-print `value` as JSON to `output`, or stdout when absent.
pub fn write_output<T: Serialize>(value: &T, output: Option<&Path>) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => fs::write(path, json + "\n")
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{}", json)?;
        }
    }
    Ok(())
}
