//! Core data models for the starmap knowledge graph.
//!
//! Nodes and relations are explicit records validated when they are built.
//! The loosely shaped payloads callers send over the wire ([`NodeInput`],
//! [`RelationInput`], [`Document`]) are converted at the boundary, and every
//! rejection names the index of the offending element.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::defaults;
use crate::error::{Error, Result};

// =============================================================================
// NODES
// =============================================================================

/// Which input graph contributed to a node during fusion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Source,
    Target,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source => write!(f, "source"),
            Self::Target => write!(f, "target"),
        }
    }
}

/// Layout hint for rendering a node. Carries no meaning for the engine.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    #[serde(rename = "position_x", default)]
    pub x: f64,
    #[serde(rename = "position_y", default)]
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A concept (knowledge point) in the graph. `name` is the identity key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_category")]
    pub category: String,
    /// Hierarchical depth; 1 is the most general.
    #[serde(default = "default_level")]
    pub level: u32,
    /// Relative salience on a 0-100 scale.
    #[serde(default = "default_importance")]
    pub importance: u8,
    #[serde(flatten)]
    pub position: Position,
    #[serde(default)]
    pub connection_count: u32,
    #[serde(default = "default_contributor_count")]
    pub contributor_count: u32,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub sources: BTreeSet<Provenance>,
}

fn default_category() -> String {
    defaults::CATEGORY.to_string()
}

fn default_level() -> u32 {
    defaults::LEVEL
}

fn default_importance() -> u8 {
    defaults::IMPORTANCE
}

fn default_contributor_count() -> u32 {
    1
}

impl Node {
    /// Create a node with default attributes. The name is trimmed and must
    /// not be empty.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidInput("node name must not be empty".to_string()));
        }
        Ok(Self {
            name: trimmed.to_string(),
            description: String::new(),
            category: default_category(),
            level: defaults::LEVEL,
            importance: defaults::IMPORTANCE,
            position: Position::default(),
            connection_count: 0,
            contributor_count: 1,
            sources: BTreeSet::new(),
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.position = position;
        self
    }

    pub fn with_level(mut self, level: u32) -> Result<Self> {
        if level == 0 {
            return Err(Error::InvalidInput("level must be >= 1".to_string()));
        }
        self.level = level;
        Ok(self)
    }

    pub fn with_importance(mut self, importance: u8) -> Result<Self> {
        if importance > defaults::MAX_IMPORTANCE {
            return Err(Error::InvalidInput(format!(
                "importance must be within 0-{}, got {}",
                defaults::MAX_IMPORTANCE,
                importance
            )));
        }
        self.importance = importance;
        Ok(self)
    }

    pub fn with_source(mut self, source: Provenance) -> Self {
        self.sources.insert(source);
        self
    }

    /// Describe the first broken invariant, if any. Used for nodes whose
    /// public fields were set directly rather than through the builders.
    pub fn violation(&self) -> Option<String> {
        if self.name.trim().is_empty() {
            return Some("name is required".to_string());
        }
        if self.name.trim() != self.name {
            return Some(format!("name '{}' has surrounding whitespace", self.name));
        }
        if self.level == 0 {
            return Some("level must be >= 1".to_string());
        }
        if self.importance > defaults::MAX_IMPORTANCE {
            return Some(format!(
                "importance must be within 0-{}, got {}",
                defaults::MAX_IMPORTANCE,
                self.importance
            ));
        }
        if self.contributor_count == 0 {
            return Some("contributor_count must be >= 1".to_string());
        }
        None
    }
}

/// Loosely shaped node payload as sent by callers (HTTP body, CLI file).
///
/// Every attribute is optional; [`NodeInput::into_node`] applies defaults and
/// validates. Importance is accepted as any JSON number and rounded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub level: Option<i64>,
    #[serde(default)]
    pub importance: Option<f64>,
    #[serde(default)]
    pub position_x: Option<f64>,
    #[serde(default)]
    pub position_y: Option<f64>,
}

impl NodeInput {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Name after trimming, or `None` when missing or blank.
    pub fn trimmed_name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    /// Validate and convert into a [`Node`]. `index` is reported in errors;
    /// `layout` supplies a position when the payload carries none.
    pub fn into_node(self, index: usize, layout: impl FnOnce() -> Position) -> Result<Node> {
        let name = self
            .trimmed_name()
            .ok_or_else(|| Error::node(index, "name is required"))?
            .to_string();

        let level = match self.level {
            None => defaults::LEVEL,
            Some(level) if level >= 1 && level <= i64::from(u32::MAX) => level as u32,
            Some(level) => {
                return Err(Error::node(index, format!("level must be >= 1, got {}", level)))
            }
        };

        let importance = match self.importance {
            None => defaults::IMPORTANCE,
            Some(value)
                if value.is_finite()
                    && (0.0..=f64::from(defaults::MAX_IMPORTANCE)).contains(&value) =>
            {
                value.round() as u8
            }
            Some(value) => {
                return Err(Error::node(
                    index,
                    format!(
                        "importance must be within 0-{}, got {}",
                        defaults::MAX_IMPORTANCE,
                        value
                    ),
                ))
            }
        };

        let position = match (self.position_x, self.position_y) {
            (Some(x), Some(y)) => Position::new(x, y),
            (None, None) => layout(),
            (x, y) => {
                let fallback = layout();
                Position::new(x.unwrap_or(fallback.x), y.unwrap_or(fallback.y))
            }
        };
        if !position.x.is_finite() || !position.y.is_finite() {
            return Err(Error::node(index, "position must be finite"));
        }

        Ok(Node {
            name,
            description: self.description.unwrap_or_default(),
            category: self
                .category
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(default_category),
            level,
            importance,
            position,
            connection_count: 0,
            contributor_count: 1,
            sources: BTreeSet::new(),
        })
    }
}

impl From<&Node> for NodeInput {
    fn from(node: &Node) -> Self {
        Self {
            name: Some(node.name.clone()),
            description: Some(node.description.clone()),
            category: Some(node.category.clone()),
            level: Some(i64::from(node.level)),
            importance: Some(f64::from(node.importance)),
            position_x: Some(node.position.x),
            position_y: Some(node.position.y),
        }
    }
}

/// Partial update applied by [`crate::Graph::update_node`]. Only fields that
/// are `Some` change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub level: Option<u32>,
    #[serde(default)]
    pub importance: Option<u8>,
    #[serde(default)]
    pub position: Option<Position>,
}

impl NodeUpdate {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

// =============================================================================
// RELATIONS
// =============================================================================

/// A weighted, typed edge between two distinct nodes. The unordered pair of
/// endpoint names is unique within a graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub source_name: String,
    pub target_name: String,
    #[serde(default = "default_relation_type")]
    pub relation_type: String,
    #[serde(default = "default_strength")]
    pub strength: f64,
    #[serde(default = "default_contributor_count")]
    pub contributor_count: u32,
}

fn default_relation_type() -> String {
    defaults::RELATION_TYPE.to_string()
}

fn default_strength() -> f64 {
    defaults::RELATION_STRENGTH
}

impl Relation {
    /// Create a `related` relation. Rejects self edges and strengths outside
    /// [0, 1].
    pub fn new(
        source_name: impl Into<String>,
        target_name: impl Into<String>,
        strength: f64,
    ) -> Result<Self> {
        let relation = Self {
            source_name: source_name.into().trim().to_string(),
            target_name: target_name.into().trim().to_string(),
            relation_type: default_relation_type(),
            strength,
            contributor_count: 1,
        };
        match relation.violation() {
            Some(reason) => Err(Error::InvalidInput(reason)),
            None => Ok(relation),
        }
    }

    pub fn with_type(mut self, relation_type: impl Into<String>) -> Self {
        self.relation_type = relation_type.into();
        self
    }

    /// Endpoint names ordered so that both directions map to the same key.
    pub fn pair_key(&self) -> (String, String) {
        pair_key(&self.source_name, &self.target_name)
    }

    /// Whether this relation touches the named node.
    pub fn touches(&self, name: &str) -> bool {
        self.source_name == name || self.target_name == name
    }

    /// Describe the first broken invariant, if any.
    pub fn violation(&self) -> Option<String> {
        if self.source_name.is_empty() || self.target_name.is_empty() {
            return Some("source_name and target_name are required".to_string());
        }
        if self.source_name == self.target_name {
            return Some(format!(
                "self-referencing relation on '{}'",
                self.source_name
            ));
        }
        if !self.strength.is_finite() || !(0.0..=1.0).contains(&self.strength) {
            return Some(format!(
                "strength must be within [0, 1], got {}",
                self.strength
            ));
        }
        if self.contributor_count == 0 {
            return Some("contributor_count must be >= 1".to_string());
        }
        None
    }
}

/// Order two endpoint names into an unordered-pair key.
pub fn pair_key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

/// Loosely shaped relation payload as sent by callers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationInput {
    #[serde(default)]
    pub source_name: Option<String>,
    #[serde(default)]
    pub target_name: Option<String>,
    #[serde(default)]
    pub relation_type: Option<String>,
    #[serde(default)]
    pub strength: Option<f64>,
    #[serde(default)]
    pub contributor_count: Option<u32>,
}

impl RelationInput {
    /// Validate and convert into a [`Relation`]. `index` is reported in errors.
    pub fn into_relation(self, index: usize) -> Result<Relation> {
        let source = self.source_name.unwrap_or_default();
        let target = self.target_name.unwrap_or_default();
        let relation = Relation {
            source_name: source.trim().to_string(),
            target_name: target.trim().to_string(),
            relation_type: self
                .relation_type
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(default_relation_type),
            strength: self.strength.unwrap_or(defaults::RELATION_STRENGTH),
            contributor_count: self.contributor_count.unwrap_or(1),
        };
        match relation.violation() {
            Some(reason) => Err(Error::relation(index, reason)),
            None => Ok(relation),
        }
    }
}

impl From<&Relation> for RelationInput {
    fn from(relation: &Relation) -> Self {
        Self {
            source_name: Some(relation.source_name.clone()),
            target_name: Some(relation.target_name.clone()),
            relation_type: Some(relation.relation_type.clone()),
            strength: Some(relation.strength),
            contributor_count: Some(relation.contributor_count),
        }
    }
}

// =============================================================================
// CONFLICTS
// =============================================================================

/// Kind of conflict detected during fusion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    /// Both inputs define a node with the same name.
    NodeNameConflict,
}

/// How a conflict was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    /// Attributes of both nodes were combined.
    Merge,
    /// The incoming node was discarded.
    Skip,
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Merge => write!(f, "merge"),
            Self::Skip => write!(f, "skip"),
        }
    }
}

/// A same-named node appearing in both inputs. Expected output, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictRecord {
    #[serde(rename = "type")]
    pub kind: ConflictKind,
    pub node_name: String,
    pub resolution: Resolution,
    /// The node already in the merged set when the conflict was detected.
    pub source_data: Node,
    /// The incoming node.
    pub target_data: Node,
}

impl ConflictRecord {
    pub fn node_name(existing: &Node, incoming: &Node, resolution: Resolution) -> Self {
        Self {
            kind: ConflictKind::NodeNameConflict,
            node_name: existing.name.clone(),
            resolution,
            source_data: existing.clone(),
            target_data: incoming.clone(),
        }
    }
}

// =============================================================================
// CONTRIBUTIONS
// =============================================================================

/// What a contributor did to a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContributionKind {
    Create,
    Update,
    Merge,
}

impl fmt::Display for ContributionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Merge => write!(f, "merge"),
        }
    }
}

/// Audit record of a single node change. Never mutated once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributionEvent {
    /// UUIDv7, so ids sort in recording order.
    pub id: Uuid,
    pub node_name: String,
    pub contributor_id: String,
    pub kind: ContributionKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<Node>,
    pub after: Node,
    pub timestamp: DateTime<Utc>,
}

// =============================================================================
// DOCUMENTS
// =============================================================================

/// A tagged document (note) fed to co-occurrence analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Document identifier. Numeric ids are accepted and kept as text.
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Document {
    pub fn new<I, S>(id: impl Into<String>, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            title: None,
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Int(n) => n.to_string(),
        Raw::Float(n) => n.to_string(),
    })
}
