//! Append-only record of node contributions.
//!
//! Every node creation, update, and merge performed by the engine is recorded
//! with before/after snapshots so callers can answer "who contributed what"
//! without re-deriving it from the final graph. The ledger offers no way to
//! edit or drop an event; persisting it is the caller's job.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use tracing::trace;
use uuid::Uuid;

use starmap_core::{logging, ContributionEvent, ContributionKind, Graph, Node, NodeUpdate};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContributionLedger {
    events: Vec<ContributionEvent>,
    /// When set, every event is stamped with this instant instead of the
    /// current time. One engine call records a single instant.
    recorded_at: Option<DateTime<Utc>>,
}

impl ContributionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// A ledger whose events all carry `recorded_at` as their timestamp.
    pub fn at(recorded_at: DateTime<Utc>) -> Self {
        Self {
            events: Vec::new(),
            recorded_at: Some(recorded_at),
        }
    }

    pub fn record_create(&mut self, contributor: &str, node: &Node) -> &ContributionEvent {
        self.append(contributor, ContributionKind::Create, None, node)
    }

    pub fn record_update(
        &mut self,
        contributor: &str,
        before: &Node,
        after: &Node,
    ) -> &ContributionEvent {
        self.append(contributor, ContributionKind::Update, Some(before), after)
    }

    /// Apply `update` to the node called `name` in `graph` and record the
    /// change. A rejected update leaves both the graph and the ledger as they
    /// were.
    pub fn apply_update(
        &mut self,
        graph: &mut Graph,
        name: &str,
        update: NodeUpdate,
        contributor: &str,
    ) -> starmap_core::Result<&ContributionEvent> {
        let (before, after) = graph.update_node(name, update)?;
        Ok(self.record_update(contributor, &before, &after))
    }

    pub fn record_merge(
        &mut self,
        contributor: &str,
        before: &Node,
        after: &Node,
    ) -> &ContributionEvent {
        self.append(contributor, ContributionKind::Merge, Some(before), after)
    }

    fn append(
        &mut self,
        contributor: &str,
        kind: ContributionKind,
        before: Option<&Node>,
        after: &Node,
    ) -> &ContributionEvent {
        let event = ContributionEvent {
            id: Uuid::now_v7(),
            node_name: after.name.clone(),
            contributor_id: contributor.to_string(),
            kind,
            before: before.cloned(),
            after: after.clone(),
            timestamp: self.recorded_at.unwrap_or_else(Utc::now),
        };
        trace!(
            { logging::NODE_NAME } = event.node_name.as_str(),
            { logging::CONTRIBUTOR } = event.contributor_id.as_str(),
            kind = %event.kind,
            "Contribution recorded"
        );
        self.events.push(event);
        &self.events[self.events.len() - 1]
    }

    /// Append every event of `other`, keeping its order.
    pub fn append_ledger(&mut self, other: ContributionLedger) {
        self.events.extend(other.events);
    }

    pub fn events(&self) -> &[ContributionEvent] {
        &self.events
    }

    /// Events whose snapshot after the change carries `name`.
    pub fn for_node<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a ContributionEvent> {
        self.events.iter().filter(move |e| e.node_name == name)
    }

    /// Distinct contributors to `name`, in order of first contribution.
    pub fn contributors_of(&self, name: &str) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for event in self.events.iter().filter(|e| e.node_name == name) {
            if !seen.contains(&event.contributor_id.as_str()) {
                seen.push(&event.contributor_id);
            }
        }
        seen
    }

    pub fn count_of(&self, kind: ContributionKind) -> usize {
        self.events.iter().filter(|e| e.kind == kind).count()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn into_events(self) -> Vec<ContributionEvent> {
        self.events
    }
}

impl Serialize for ContributionLedger {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(&self.events)
    }
}
