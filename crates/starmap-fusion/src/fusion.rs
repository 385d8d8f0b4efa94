//! Fusion of two knowledge graphs into one.
//!
//! Nodes are matched by exact (case-sensitive) name. Every collision is
//! recorded as a [`ConflictRecord`] and resolved by the chosen
//! [`FusionStrategy`]:
//!
//! | Strategy | On collision                               | Relations      |
//! |----------|--------------------------------------------|----------------|
//! | `smart`  | merge attributes into the existing node    | synthesized    |
//! | `merge`  | merge attributes into the existing node    | none           |
//! | `add`    | keep the existing node, drop the incoming  | none           |
//!
//! A merge keeps the existing description unless it is empty, takes the
//! higher declared importance (a payload without one counts as 0), unions
//! provenance, and counts one more contributor.
//! The rest of the existing node's attributes are kept.

use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace, warn};

use starmap_core::{
    defaults, logging, ConflictRecord, Error, Graph, Node, NodeInput, Provenance, Relation,
    RelationScorer, Resolution, Result,
};

use crate::check_min_relation;
use crate::layout::LayoutGenerator;
use crate::ledger::ContributionLedger;
use crate::synthesis::{RelationSynthesizer, StructuralScorer};

// =============================================================================
// STRATEGY
// =============================================================================

/// Policy applied when both inputs define a node with the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "Option<String>")]
pub enum FusionStrategy {
    /// Merge colliding nodes and synthesize relations.
    #[default]
    Smart,
    /// Merge colliding nodes, no relations.
    Merge,
    /// Keep the first node on collision, no relations.
    Add,
}

impl FusionStrategy {
    /// Parse a strategy name. `ai_smart` and unrecognised names fall back to
    /// [`FusionStrategy::Smart`].
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "smart" => Self::Smart,
            "merge" => Self::Merge,
            "add" => Self::Add,
            "ai_smart" => {
                debug!({ logging::STRATEGY } = name, "ai_smart runs as smart");
                Self::Smart
            }
            _ => {
                warn!({ logging::STRATEGY } = name, "Unknown fusion strategy, using smart");
                Self::Smart
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Smart => "smart",
            Self::Merge => "merge",
            Self::Add => "add",
        }
    }

    /// Whether this strategy produces relations.
    pub fn synthesizes_relations(&self) -> bool {
        matches!(self, Self::Smart)
    }

    /// Resolve a collision in place and report how it was resolved.
    fn resolve(&self, existing: &mut Candidate, incoming: &Candidate) -> Resolution {
        match self {
            Self::Smart | Self::Merge => {
                existing.absorb(incoming);
                Resolution::Merge
            }
            Self::Add => Resolution::Skip,
        }
    }
}

/// A node during the merge pass, together with the importance its payloads
/// actually declared. The default importance is only applied when no merged
/// payload declared one.
#[derive(Debug, Clone)]
struct Candidate {
    node: Node,
    importance: Option<u8>,
}

impl Candidate {
    fn absorb(&mut self, incoming: &Candidate) {
        let node = &mut self.node;
        if node.description.is_empty() {
            node.description = incoming.node.description.clone();
        }
        node.sources.extend(incoming.node.sources.iter().copied());
        node.contributor_count = node.contributor_count.saturating_add(1);

        // an undeclared importance counts as 0 against a declared one
        self.importance = match (self.importance, incoming.importance) {
            (None, None) => None,
            (a, b) => Some(a.unwrap_or(0).max(b.unwrap_or(0))),
        };
        node.importance = self.importance.unwrap_or(defaults::IMPORTANCE);
    }
}

impl fmt::Display for FusionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FusionStrategy {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::from_name(s))
    }
}

impl From<String> for FusionStrategy {
    fn from(name: String) -> Self {
        Self::from_name(&name)
    }
}

/// A missing or null strategy is [`FusionStrategy::Smart`].
impl From<Option<String>> for FusionStrategy {
    fn from(name: Option<String>) -> Self {
        name.map(Self::from).unwrap_or_default()
    }
}

// =============================================================================
// REQUEST / RESULT
// =============================================================================

/// A fusion request as sent by callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionRequest {
    #[serde(default)]
    pub fusion_type: FusionStrategy,
    #[serde(default)]
    pub source_nodes: Vec<NodeInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_nodes: Option<Vec<NodeInput>>,
    #[serde(default = "default_min_relation")]
    pub min_relation: f64,
    /// Credited with nodes created from the source graph.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_contributor: Option<String>,
    /// Credited with nodes created or merged from the target graph.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_contributor: Option<String>,
}

fn default_min_relation() -> f64 {
    defaults::MIN_RELATION
}

impl Default for FusionRequest {
    fn default() -> Self {
        Self {
            fusion_type: FusionStrategy::default(),
            source_nodes: Vec::new(),
            target_nodes: None,
            min_relation: defaults::MIN_RELATION,
            source_contributor: None,
            target_contributor: None,
        }
    }
}

impl FusionRequest {
    pub fn new(fusion_type: FusionStrategy, source_nodes: Vec<NodeInput>) -> Self {
        Self {
            fusion_type,
            source_nodes,
            ..Self::default()
        }
    }

    pub fn with_target(mut self, target_nodes: Vec<NodeInput>) -> Self {
        self.target_nodes = Some(target_nodes);
        self
    }

    pub fn with_min_relation(mut self, min_relation: f64) -> Self {
        self.min_relation = min_relation;
        self
    }

    pub fn with_contributors(
        mut self,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        self.source_contributor = Some(source.into());
        self.target_contributor = Some(target.into());
        self
    }
}

/// The fused graph and the conflicts met on the way.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FusionResult {
    pub nodes: Vec<Node>,
    pub relations: Vec<Relation>,
    pub conflicts: Vec<ConflictRecord>,
}

impl FusionResult {
    pub fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.name == name)
    }
}

/// A [`FusionResult`] together with the contributions it recorded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FusionOutcome {
    #[serde(flatten)]
    pub result: FusionResult,
    #[serde(rename = "contributions")]
    pub ledger: ContributionLedger,
}

// =============================================================================
// ENGINE
// =============================================================================

/// Fuses node sets. Holds no state between calls.
#[derive(Debug, Clone)]
pub struct FusionEngine<S = StructuralScorer> {
    scorer: S,
    layout_seed: u64,
}

impl FusionEngine<StructuralScorer> {
    pub fn new() -> Self {
        Self::with_scorer(StructuralScorer)
    }
}

impl Default for FusionEngine<StructuralScorer> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: RelationScorer> FusionEngine<S> {
    /// Use `scorer` for relation strength under the `smart` strategy.
    pub fn with_scorer(scorer: S) -> Self {
        Self {
            scorer,
            layout_seed: defaults::LAYOUT_SEED,
        }
    }

    /// Seed for positions assigned to nodes that arrive without one.
    pub fn with_layout_seed(mut self, seed: u64) -> Self {
        self.layout_seed = seed;
        self
    }

    /// Fuse `request.source_nodes` with `request.target_nodes`.
    ///
    /// Every input is validated before any merging starts, so an error means
    /// nothing was produced. Output order is source nodes in input order,
    /// then newly added target nodes in input order.
    #[instrument(
        skip_all,
        fields(
            subsystem = "fusion",
            component = "fusion_engine",
            op = "fuse",
            strategy = %request.fusion_type
        )
    )]
    pub fn fuse(&self, request: FusionRequest) -> Result<FusionOutcome> {
        let start = Instant::now();
        let strategy = request.fusion_type;
        let min_relation = check_min_relation(request.min_relation)?;

        if request.source_nodes.is_empty() {
            return Err(Error::InvalidInput(
                "source_nodes must not be empty".to_string(),
            ));
        }

        let mut layout = LayoutGenerator::new(self.layout_seed);
        let source = convert_side(request.source_nodes, Provenance::Source, &mut layout)?;
        let target = convert_side(
            request.target_nodes.unwrap_or_default(),
            Provenance::Target,
            &mut layout,
        )?;
        let source_contributor = request
            .source_contributor
            .as_deref()
            .unwrap_or(defaults::CONTRIBUTOR);
        let target_contributor = request
            .target_contributor
            .as_deref()
            .unwrap_or(defaults::CONTRIBUTOR);

        let mut ledger = ContributionLedger::at(Utc::now());
        let mut merged: Vec<Candidate> = Vec::with_capacity(source.len() + target.len());
        let mut by_name: HashMap<String, usize> = HashMap::new();
        let mut conflicts = Vec::new();

        for (candidates, contributor) in [(source, source_contributor), (target, target_contributor)] {
            for incoming in candidates {
                match by_name.get(&incoming.node.name) {
                    Some(&i) => {
                        let existing = &mut merged[i];
                        let before = existing.node.clone();
                        let resolution = strategy.resolve(existing, &incoming);
                        trace!(
                            { logging::NODE_NAME } = incoming.node.name.as_str(),
                            resolution = %resolution,
                            "Name conflict resolved"
                        );
                        if resolution == Resolution::Merge {
                            ledger.record_merge(contributor, &before, &existing.node);
                        }
                        conflicts.push(ConflictRecord::node_name(
                            &before,
                            &incoming.node,
                            resolution,
                        ));
                    }
                    None => {
                        ledger.record_create(contributor, &incoming.node);
                        by_name.insert(incoming.node.name.clone(), merged.len());
                        merged.push(incoming);
                    }
                }
            }
        }

        let merged: Vec<Node> = merged.into_iter().map(|c| c.node).collect();
        let mut graph = Graph::from_parts(merged, Vec::new())?;
        if strategy.synthesizes_relations() {
            let relations = RelationSynthesizer::with_scorer(&self.scorer, min_relation)?
                .synthesize(graph.nodes())?;
            for relation in relations {
                graph.add_relation(relation)?;
            }
        }

        let (nodes, relations) = graph.into_parts();
        info!(
            { logging::STRATEGY } = strategy.as_str(),
            { logging::NODE_COUNT } = nodes.len(),
            { logging::RELATION_COUNT } = relations.len(),
            { logging::CONFLICT_COUNT } = conflicts.len(),
            { logging::EVENT_COUNT } = ledger.len(),
            { logging::DURATION_MS } = start.elapsed().as_millis() as u64,
            "Fusion completed"
        );

        Ok(FusionOutcome {
            result: FusionResult {
                nodes,
                relations,
                conflicts,
            },
            ledger,
        })
    }
}

/// Convert one side's payloads, tagging each node with its provenance.
/// Validation errors name the side as well as the index.
fn convert_side(
    inputs: Vec<NodeInput>,
    side: Provenance,
    layout: &mut LayoutGenerator,
) -> Result<Vec<Candidate>> {
    inputs
        .into_iter()
        .enumerate()
        .map(|(index, input)| {
            let declared = input.importance.is_some();
            input
                .into_node(index, || layout.next_position())
                .map(|node| Candidate {
                    importance: declared.then_some(node.importance),
                    node: node.with_source(side),
                })
                .map_err(|e| match e {
                    Error::InvalidNode { index, reason } => Error::InvalidNode {
                        index,
                        reason: format!("{}_nodes: {}", side, reason),
                    },
                    other => other,
                })
        })
        .collect()
}

/// Fuse with the structural scorer and default layout seed.
pub fn fuse(request: FusionRequest) -> Result<FusionOutcome> {
    FusionEngine::new().fuse(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use starmap_core::{ConflictKind, ContributionKind};

    fn input(name: &str, level: i64, importance: f64) -> NodeInput {
        NodeInput {
            category: Some("knowledge".to_string()),
            level: Some(level),
            importance: Some(importance),
            ..NodeInput::named(name)
        }
    }

    fn example(strategy: FusionStrategy) -> FusionRequest {
        FusionRequest::new(strategy, vec![input("AI", 1, 80.0)])
            .with_target(vec![input("AI", 1, 60.0), input("ML", 2, 70.0)])
    }

    #[test]
    fn test_strategy_from_name() {
        assert_eq!(FusionStrategy::from_name("smart"), FusionStrategy::Smart);
        assert_eq!(FusionStrategy::from_name("MERGE"), FusionStrategy::Merge);
        assert_eq!(FusionStrategy::from_name(" add "), FusionStrategy::Add);
        assert_eq!(FusionStrategy::from_name("ai_smart"), FusionStrategy::Smart);
        assert_eq!(FusionStrategy::from_name("bogus"), FusionStrategy::Smart);
        assert_eq!("merge".parse::<FusionStrategy>().unwrap(), FusionStrategy::Merge);
    }

    #[test]
    fn test_strategy_serde() {
        let strategy: FusionStrategy = serde_json::from_str(r#""ai_smart""#).unwrap();
        assert_eq!(strategy, FusionStrategy::Smart);
        assert_eq!(
            serde_json::to_string(&FusionStrategy::Add).unwrap(),
            r#""add""#
        );
    }

    #[test]
    fn test_smart_merges_and_synthesizes() {
        let outcome = fuse(example(FusionStrategy::Smart)).unwrap();
        let result = &outcome.result;

        let ai = result.node("AI").unwrap();
        assert_eq!(ai.importance, 80);
        assert_eq!(ai.contributor_count, 2);
        assert_eq!(
            ai.sources.iter().copied().collect::<Vec<_>>(),
            vec![Provenance::Source, Provenance::Target]
        );
        let ml = result.node("ML").unwrap();
        assert_eq!(ml.importance, 70);
        assert_eq!(ml.contributor_count, 1);

        assert_eq!(result.conflicts.len(), 1);
        assert_eq!(result.conflicts[0].kind, ConflictKind::NodeNameConflict);
        assert_eq!(result.conflicts[0].resolution, Resolution::Merge);
        assert_eq!(result.conflicts[0].source_data.importance, 80);
        assert_eq!(result.conflicts[0].target_data.importance, 60);

        assert_eq!(result.relations.len(), 1);
        let relation = &result.relations[0];
        assert_eq!(
            (relation.source_name.as_str(), relation.target_name.as_str()),
            ("AI", "ML")
        );
        assert!((relation.strength - 0.76).abs() < 1e-9);
        assert_eq!(ai.connection_count, 1);
        assert_eq!(ml.connection_count, 1);
    }

    #[test]
    fn test_add_skips_collisions() {
        let outcome = fuse(example(FusionStrategy::Add)).unwrap();
        let result = &outcome.result;

        let names: Vec<&str> = result.nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["AI", "ML"]);
        let ai = result.node("AI").unwrap();
        assert_eq!(ai.importance, 80);
        assert_eq!(ai.contributor_count, 1);
        assert_eq!(result.conflicts.len(), 1);
        assert_eq!(result.conflicts[0].resolution, Resolution::Skip);
        assert!(result.relations.is_empty());
    }

    #[test]
    fn test_merge_has_no_relations() {
        let outcome = fuse(example(FusionStrategy::Merge)).unwrap();
        assert_eq!(outcome.result.nodes.len(), 2);
        assert!(outcome.result.relations.is_empty());
        assert_eq!(outcome.result.node("AI").unwrap().contributor_count, 2);
        assert!(outcome.result.nodes.iter().all(|n| n.connection_count == 0));
    }

    #[test]
    fn test_null_fusion_type_is_smart() {
        let json = r#"{"fusion_type": null, "source_nodes": [{"name": "AI"}]}"#;
        let request: FusionRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.fusion_type, FusionStrategy::Smart);
    }

    #[test]
    fn test_undeclared_importance_loses_to_declared() {
        let request = FusionRequest::new(FusionStrategy::Smart, vec![NodeInput::named("AI")])
            .with_target(vec![NodeInput {
                importance: Some(30.0),
                ..NodeInput::named("AI")
            }]);
        let outcome = fuse(request).unwrap();
        assert_eq!(outcome.result.node("AI").unwrap().importance, 30);

        let merge = &outcome.ledger.events()[1];
        assert_eq!(merge.before.as_ref().unwrap().importance, 50);
        assert_eq!(merge.after.importance, 30);
    }

    #[test]
    fn test_undeclared_importance_on_both_sides_defaults() {
        let request = FusionRequest::new(FusionStrategy::Merge, vec![NodeInput::named("AI")])
            .with_target(vec![NodeInput::named("AI")]);
        let outcome = fuse(request).unwrap();
        assert_eq!(outcome.result.nodes[0].importance, 50);
    }

    #[test]
    fn test_declared_zero_importance_is_kept_in_merge() {
        let request = FusionRequest::new(
            FusionStrategy::Merge,
            vec![NodeInput {
                importance: Some(0.0),
                ..NodeInput::named("AI")
            }],
        )
        .with_target(vec![NodeInput::named("AI")]);
        let outcome = fuse(request).unwrap();
        assert_eq!(outcome.result.nodes[0].importance, 0);
    }

    #[test]
    fn test_description_filled_from_incoming_when_empty() {
        let request = FusionRequest::new(FusionStrategy::Merge, vec![NodeInput::named("AI")])
            .with_target(vec![NodeInput {
                description: Some("Artificial intelligence".to_string()),
                ..NodeInput::named("AI")
            }]);
        let outcome = fuse(request).unwrap();
        assert_eq!(
            outcome.result.nodes[0].description,
            "Artificial intelligence"
        );
    }

    #[test]
    fn test_existing_description_wins() {
        let request = FusionRequest::new(
            FusionStrategy::Merge,
            vec![NodeInput {
                description: Some("first".to_string()),
                ..NodeInput::named("AI")
            }],
        )
        .with_target(vec![NodeInput {
            description: Some("second".to_string()),
            ..NodeInput::named("AI")
        }]);
        let outcome = fuse(request).unwrap();
        assert_eq!(outcome.result.nodes[0].description, "first");
    }

    #[test]
    fn test_empty_source_rejected() {
        let request = FusionRequest::new(FusionStrategy::Smart, Vec::new())
            .with_target(vec![NodeInput::named("AI")]);
        let err = fuse(request).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_invalid_target_names_side_and_index() {
        let request = FusionRequest::new(FusionStrategy::Smart, vec![NodeInput::named("AI")])
            .with_target(vec![NodeInput::named("ML"), NodeInput::named("   ")]);
        match fuse(request).unwrap_err() {
            Error::InvalidNode { index, reason } => {
                assert_eq!(index, 1);
                assert!(reason.starts_with("target_nodes"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_invalid_min_relation_rejected() {
        let request = FusionRequest::new(FusionStrategy::Smart, vec![NodeInput::named("AI")])
            .with_min_relation(1.5);
        assert!(fuse(request).is_err());
    }

    #[test]
    fn test_absent_target_passes_source_through() {
        let request = FusionRequest::new(
            FusionStrategy::Smart,
            vec![input("AI", 1, 80.0), input("ML", 2, 70.0)],
        );
        let outcome = fuse(request).unwrap();
        assert_eq!(outcome.result.nodes.len(), 2);
        assert!(outcome.result.conflicts.is_empty());
        assert_eq!(outcome.result.relations.len(), 1);
        assert!(outcome
            .result
            .nodes
            .iter()
            .all(|n| n.sources.len() == 1 && n.sources.contains(&Provenance::Source)));
    }

    #[test]
    fn test_duplicates_within_source_are_merged() {
        let request = FusionRequest::new(
            FusionStrategy::Merge,
            vec![input("AI", 1, 40.0), input("AI", 1, 90.0)],
        );
        let outcome = fuse(request).unwrap();
        assert_eq!(outcome.result.nodes.len(), 1);
        assert_eq!(outcome.result.nodes[0].importance, 90);
        assert_eq!(outcome.result.conflicts.len(), 1);
    }

    #[test]
    fn test_missing_attributes_defaulted() {
        let outcome = fuse(FusionRequest::new(
            FusionStrategy::Add,
            vec![NodeInput::named("bare")],
        ))
        .unwrap();
        let node = &outcome.result.nodes[0];
        assert_eq!(node.description, "");
        assert_eq!(node.category, "knowledge");
        assert_eq!(node.level, 1);
        assert_eq!(node.importance, 50);
        assert!(node.position.x >= 0.0 && node.position.x <= defaults::CANVAS_WIDTH);
    }

    #[test]
    fn test_ledger_records_creates_and_merges() {
        let request = example(FusionStrategy::Smart).with_contributors("alice", "bob");
        let outcome = fuse(request).unwrap();
        let ledger = &outcome.ledger;

        assert_eq!(ledger.count_of(ContributionKind::Create), 2);
        assert_eq!(ledger.count_of(ContributionKind::Merge), 1);
        assert_eq!(ledger.contributors_of("AI"), vec!["alice", "bob"]);
        assert_eq!(ledger.contributors_of("ML"), vec!["bob"]);

        let merge = ledger
            .events()
            .iter()
            .find(|e| e.kind == ContributionKind::Merge)
            .unwrap();
        assert_eq!(merge.before.as_ref().unwrap().contributor_count, 1);
        assert_eq!(merge.after.contributor_count, 2);
    }

    #[test]
    fn test_skip_records_no_event() {
        let outcome = fuse(example(FusionStrategy::Add)).unwrap();
        assert_eq!(outcome.ledger.len(), 2);
        assert!(outcome
            .ledger
            .events()
            .iter()
            .all(|e| e.kind == ContributionKind::Create && e.contributor_id == "anonymous"));
    }

    #[test]
    fn test_request_deserializes_wire_shape() {
        let json = r#"{
            "fusion_type": "ai_smart",
            "source_nodes": [{"name": "AI", "importance": 80}],
            "target_nodes": [{"name": "ML"}]
        }"#;
        let request: FusionRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.fusion_type, FusionStrategy::Smart);
        assert_eq!(request.min_relation, 0.3);
        assert_eq!(request.target_nodes.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn test_outcome_serializes_flat() {
        let outcome = fuse(example(FusionStrategy::Smart)).unwrap();
        let value = serde_json::to_value(&outcome).unwrap();
        assert!(value["nodes"].is_array());
        assert!(value["relations"].is_array());
        assert_eq!(value["conflicts"][0]["type"], "node_name_conflict");
        assert!(value["contributions"].is_array());
    }
}
