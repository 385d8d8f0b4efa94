//! In-memory knowledge graph with name-keyed nodes.
//!
//! The graph enforces the structural invariants: node names are unique,
//! relations never loop back to their own endpoint, each unordered pair is
//! connected at most once, and every relation references nodes in the graph.
//! `connection_count` on each node is kept in step with relation changes.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{Error, Result};
use crate::models::{pair_key, Node, NodeUpdate, Relation, RelationInput};

/// A named collection of nodes and the relations between them.
///
/// Node order is insertion order and is preserved by every operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "GraphData")]
pub struct Graph {
    nodes: Vec<Node>,
    relations: Vec<Relation>,
    #[serde(skip)]
    index: HashMap<String, usize>,
    #[serde(skip)]
    pairs: HashSet<(String, String)>,
}

/// Serialized form of a graph; validated on the way in. Relations arrive as
/// loose payloads so missing fields get defaults and errors carry the index.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GraphData {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub relations: Vec<RelationInput>,
}

impl TryFrom<GraphData> for Graph {
    type Error = Error;

    fn try_from(data: GraphData) -> Result<Self> {
        let relations = data
            .relations
            .into_iter()
            .enumerate()
            .map(|(index, input)| input.into_relation(index))
            .collect::<Result<Vec<_>>>()?;
        Graph::from_parts(data.nodes, relations)
    }
}

impl PartialEq for Graph {
    fn eq(&self, other: &Self) -> bool {
        self.nodes == other.nodes && self.relations == other.relations
    }
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from nodes and relations, validating every element.
    ///
    /// Connection counts are recomputed from `relations`; whatever counts the
    /// nodes carried are discarded.
    pub fn from_parts(nodes: Vec<Node>, relations: Vec<Relation>) -> Result<Self> {
        let mut graph = Self::new();
        for (index, mut node) in nodes.into_iter().enumerate() {
            if let Some(reason) = node.violation() {
                return Err(Error::InvalidNode { index, reason });
            }
            if graph.contains(&node.name) {
                return Err(Error::InvalidNode {
                    index,
                    reason: format!("duplicate node name '{}'", node.name),
                });
            }
            node.connection_count = 0;
            graph.push_node(node);
        }
        for (index, relation) in relations.into_iter().enumerate() {
            graph
                .add_relation(relation)
                .map_err(|e| Error::InvalidRelation {
                    index,
                    reason: e.to_string(),
                })?;
        }
        Ok(graph)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    pub fn node(&self, name: &str) -> Option<&Node> {
        self.index.get(name).map(|&i| &self.nodes[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn relation_count(&self) -> usize {
        self.relations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether the unordered pair `a`/`b` is connected.
    pub fn has_relation(&self, a: &str, b: &str) -> bool {
        self.pairs.contains(&pair_key(a, b))
    }

    pub fn into_parts(self) -> (Vec<Node>, Vec<Relation>) {
        (self.nodes, self.relations)
    }

    /// Insert a node. Fails if its name is taken or an invariant is broken.
    pub fn insert_node(&mut self, node: Node) -> Result<&Node> {
        if let Some(reason) = node.violation() {
            return Err(Error::InvalidInput(reason));
        }
        if self.contains(&node.name) {
            return Err(Error::DuplicateNode(node.name));
        }
        let i = self.push_node(node);
        Ok(&self.nodes[i])
    }

    fn push_node(&mut self, node: Node) -> usize {
        let i = self.nodes.len();
        self.index.insert(node.name.clone(), i);
        self.nodes.push(node);
        i
    }

    /// Apply a coalescing update: only the fields present in `update` change.
    ///
    /// Renames are rejected when the new name is taken; relations follow the
    /// rename. Returns the node before and after the update.
    pub fn update_node(&mut self, name: &str, update: NodeUpdate) -> Result<(Node, Node)> {
        let i = *self
            .index
            .get(name)
            .ok_or_else(|| Error::NodeNotFound(name.to_string()))?;
        let before = self.nodes[i].clone();

        let mut after = before.clone();
        if let Some(new_name) = update.name.as_deref().map(str::trim) {
            if new_name.is_empty() {
                return Err(Error::InvalidInput("node name must not be empty".to_string()));
            }
            if new_name != before.name && self.contains(new_name) {
                return Err(Error::DuplicateNode(new_name.to_string()));
            }
            after.name = new_name.to_string();
        }
        if let Some(description) = update.description {
            after.description = description;
        }
        if let Some(category) = update.category {
            after.category = category;
        }
        if let Some(level) = update.level {
            after.level = level;
        }
        if let Some(importance) = update.importance {
            after.importance = importance;
        }
        if let Some(position) = update.position {
            after.position = position;
        }
        if let Some(reason) = after.violation() {
            return Err(Error::InvalidInput(reason));
        }

        if after.name != before.name {
            self.rename_endpoints(&before.name, &after.name);
            self.index.remove(&before.name);
            self.index.insert(after.name.clone(), i);
        }
        self.nodes[i] = after.clone();
        Ok((before, after))
    }

    fn rename_endpoints(&mut self, old: &str, new: &str) {
        for relation in self.relations.iter_mut().filter(|r| r.touches(old)) {
            self.pairs.remove(&relation.pair_key());
            if relation.source_name == old {
                relation.source_name = new.to_string();
            }
            if relation.target_name == old {
                relation.target_name = new.to_string();
            }
            self.pairs.insert(relation.pair_key());
        }
    }

    /// Remove a node together with every relation touching it.
    pub fn remove_node(&mut self, name: &str) -> Result<Node> {
        let i = *self
            .index
            .get(name)
            .ok_or_else(|| Error::NodeNotFound(name.to_string()))?;

        let touching: Vec<(String, String)> = self
            .relations
            .iter()
            .filter(|r| r.touches(name))
            .map(|r| (r.source_name.clone(), r.target_name.clone()))
            .collect();
        for (a, b) in touching {
            self.remove_relation(&a, &b)?;
        }

        let node = self.nodes.remove(i);
        self.index = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.name.clone(), i))
            .collect();
        Ok(node)
    }

    /// Add a relation and bump the connection count of both endpoints.
    pub fn add_relation(&mut self, relation: Relation) -> Result<&Relation> {
        if let Some(reason) = relation.violation() {
            return Err(Error::InvalidInput(reason));
        }
        let a = *self
            .index
            .get(&relation.source_name)
            .ok_or_else(|| Error::NodeNotFound(relation.source_name.clone()))?;
        let b = *self
            .index
            .get(&relation.target_name)
            .ok_or_else(|| Error::NodeNotFound(relation.target_name.clone()))?;
        let key = relation.pair_key();
        if self.pairs.contains(&key) {
            return Err(Error::DuplicateRelation(
                relation.source_name,
                relation.target_name,
            ));
        }

        trace!(
            source = %relation.source_name,
            target = %relation.target_name,
            strength = relation.strength,
            "Relation added"
        );
        self.nodes[a].connection_count += 1;
        self.nodes[b].connection_count += 1;
        self.pairs.insert(key);
        self.relations.push(relation);
        Ok(&self.relations[self.relations.len() - 1])
    }

    /// Remove the relation between `a` and `b` (either direction) and
    /// decrement both endpoint counts, never below zero.
    pub fn remove_relation(&mut self, a: &str, b: &str) -> Result<Relation> {
        let key = pair_key(a, b);
        let pos = self
            .relations
            .iter()
            .position(|r| r.pair_key() == key)
            .ok_or_else(|| Error::RelationNotFound(a.to_string(), b.to_string()))?;
        let relation = self.relations.remove(pos);
        self.pairs.remove(&key);
        for name in [&relation.source_name, &relation.target_name] {
            if let Some(&i) = self.index.get(name.as_str()) {
                let count = &mut self.nodes[i].connection_count;
                *count = count.saturating_sub(1);
            }
        }
        Ok(relation)
    }
}
