//! In-memory filters over a [`Graph`].

use serde::{Deserialize, Serialize};
use tracing::debug;

use starmap_core::{defaults, Graph, Node, Relation, Result};

/// Matches every category.
pub const ANY_CATEGORY: &str = "all";

/// Node listing filter. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeFilter {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub level: Option<u32>,
    /// Case-insensitive substring of the name or description.
    #[serde(default)]
    pub keyword: Option<String>,
    #[serde(default)]
    pub min_importance: Option<u8>,
    #[serde(default)]
    pub max_importance: Option<u8>,
}

impl NodeFilter {
    pub fn matches(&self, node: &Node) -> bool {
        if let Some(category) = self.category.as_deref() {
            if category != ANY_CATEGORY && node.category != category {
                return false;
            }
        }
        if self.level.is_some_and(|level| node.level != level) {
            return false;
        }
        if let Some(keyword) = self.keyword.as_deref().map(str::trim) {
            if !keyword.is_empty() {
                let keyword = keyword.to_lowercase();
                if !node.name.to_lowercase().contains(&keyword)
                    && !node.description.to_lowercase().contains(&keyword)
                {
                    return false;
                }
            }
        }
        if self.min_importance.is_some_and(|min| node.importance < min) {
            return false;
        }
        if self.max_importance.is_some_and(|max| node.importance > max) {
            return false;
        }
        true
    }

    /// Matching nodes, most important first. Equal importance keeps graph
    /// order.
    pub fn apply<'a>(&self, graph: &'a Graph) -> Vec<&'a Node> {
        let mut nodes: Vec<&Node> = graph.nodes().iter().filter(|n| self.matches(n)).collect();
        nodes.sort_by(|a, b| b.importance.cmp(&a.importance));
        debug!(
            matched = nodes.len(),
            total = graph.node_count(),
            "Node filter applied"
        );
        nodes
    }
}

/// Relation listing filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationFilter {
    #[serde(default = "default_min_strength")]
    pub min_strength: f64,
    #[serde(default)]
    pub relation_type: Option<String>,
}

fn default_min_strength() -> f64 {
    defaults::LIST_MIN_STRENGTH
}

impl Default for RelationFilter {
    fn default() -> Self {
        Self {
            min_strength: defaults::LIST_MIN_STRENGTH,
            relation_type: None,
        }
    }
}

impl RelationFilter {
    pub fn matches(&self, relation: &Relation) -> bool {
        relation.strength >= self.min_strength
            && self
                .relation_type
                .as_deref()
                .map_or(true, |t| relation.relation_type == t)
    }

    /// Matching relations, strongest first.
    pub fn apply<'a>(&self, graph: &'a Graph) -> Vec<&'a Relation> {
        let mut relations: Vec<&Relation> = graph
            .relations()
            .iter()
            .filter(|r| self.matches(r))
            .collect();
        relations.sort_by(|a, b| b.strength.total_cmp(&a.strength));
        relations
    }
}

/// The nodes of one category and the relations among them.
pub fn category_subgraph(graph: &Graph, category: &str) -> Result<Graph> {
    let nodes: Vec<Node> = graph
        .nodes()
        .iter()
        .filter(|n| n.category == category)
        .cloned()
        .collect();
    let kept = |name: &str| graph.node(name).is_some_and(|n| n.category == category);
    let relations: Vec<Relation> = graph
        .relations()
        .iter()
        .filter(|r| kept(&r.source_name) && kept(&r.target_name))
        .cloned()
        .collect();
    Graph::from_parts(nodes, relations)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Graph {
        let node = |name: &str, category: &str, level: u32, importance: u8| {
            Node::new(name)
                .unwrap()
                .with_category(category)
                .with_level(level)
                .unwrap()
                .with_importance(importance)
                .unwrap()
        };
        let nodes = vec![
            node("Rust", "language", 1, 60),
            node("Tokio", "library", 2, 90)
                .with_description("Async runtime for Rust"),
            node("Serde", "library", 2, 60),
            node("Go", "language", 1, 30),
        ];
        let relations = vec![
            Relation::new("Rust", "Tokio", 0.9).unwrap(),
            Relation::new("Tokio", "Serde", 0.4).unwrap(),
            Relation::new("Rust", "Go", 0.05).unwrap().with_type("contrasts"),
        ];
        Graph::from_parts(nodes, relations).unwrap()
    }

    fn names<'a>(nodes: &[&'a Node]) -> Vec<&'a str> {
        nodes.iter().map(|n| n.name.as_str()).collect()
    }

    #[test]
    fn test_empty_filter_sorts_by_importance() {
        let graph = sample();
        let nodes = NodeFilter::default().apply(&graph);
        assert_eq!(names(&nodes), vec!["Tokio", "Rust", "Serde", "Go"]);
    }

    #[test]
    fn test_category_all_matches_everything() {
        let graph = sample();
        let filter = NodeFilter {
            category: Some("all".to_string()),
            ..NodeFilter::default()
        };
        assert_eq!(filter.apply(&graph).len(), 4);

        let filter = NodeFilter {
            category: Some("language".to_string()),
            ..NodeFilter::default()
        };
        assert_eq!(names(&filter.apply(&graph)), vec!["Rust", "Go"]);
    }

    #[test]
    fn test_keyword_matches_name_or_description() {
        let graph = sample();
        let filter = NodeFilter {
            keyword: Some(" rust ".to_string()),
            ..NodeFilter::default()
        };
        assert_eq!(names(&filter.apply(&graph)), vec!["Tokio", "Rust"]);
    }

    #[test]
    fn test_importance_range() {
        let graph = sample();
        let filter = NodeFilter {
            min_importance: Some(50),
            max_importance: Some(80),
            level: Some(2),
            ..NodeFilter::default()
        };
        assert_eq!(names(&filter.apply(&graph)), vec!["Serde"]);
    }

    #[test]
    fn test_relation_filter_defaults_drop_weak_edges() {
        let graph = sample();
        let relations = RelationFilter::default().apply(&graph);
        let strengths: Vec<f64> = relations.iter().map(|r| r.strength).collect();
        assert_eq!(strengths, vec![0.9, 0.4]);
    }

    #[test]
    fn test_relation_filter_by_type() {
        let graph = sample();
        let filter = RelationFilter {
            min_strength: 0.0,
            relation_type: Some("contrasts".to_string()),
        };
        let relations = filter.apply(&graph);
        assert_eq!(relations.len(), 1);
        assert_eq!(relations[0].target_name, "Go");
    }

    #[test]
    fn test_category_subgraph() {
        let graph = sample();
        let sub = category_subgraph(&graph, "library").unwrap();
        assert_eq!(sub.node_count(), 2);
        assert_eq!(sub.relation_count(), 1);
        assert!(sub.has_relation("Tokio", "Serde"));
        assert_eq!(sub.node("Tokio").unwrap().connection_count, 1);

        let empty = category_subgraph(&graph, "nothing").unwrap();
        assert!(empty.is_empty());
    }
}
