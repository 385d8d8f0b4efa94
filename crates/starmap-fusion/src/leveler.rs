//! Hierarchy levels and importance for tag-derived nodes.
//!
//! Tags are ranked by how many documents carry them. The ranking is split
//! into `max_level` contiguous buckets of `ceil(T / max_level)` tags each;
//! the most frequent bucket is level 1. Importance is frequency relative to
//! the most frequent tag, on a 0-100 scale.

use tracing::debug;

use starmap_core::{defaults, logging, Error, Node, Result};

use crate::cooccurrence::TagAnalysis;
use crate::layout::LayoutGenerator;

/// Assigns `level` and `importance` to the tags of a [`TagAnalysis`].
#[derive(Debug, Clone)]
pub struct NodeLeveler {
    max_level: u32,
}

impl Default for NodeLeveler {
    fn default() -> Self {
        Self {
            max_level: defaults::MAX_LEVEL,
        }
    }
}

impl NodeLeveler {
    pub fn new(max_level: u32) -> Result<Self> {
        if max_level == 0 {
            return Err(Error::InvalidInput("max_level must be >= 1".to_string()));
        }
        Ok(Self { max_level })
    }

    pub fn max_level(&self) -> u32 {
        self.max_level
    }

    /// Produce one node per tag, most frequent first. Ties keep first-seen
    /// order.
    pub fn level(&self, analysis: &TagAnalysis, layout: &mut LayoutGenerator) -> Result<Vec<Node>> {
        if analysis.is_empty() {
            return Ok(Vec::new());
        }

        let mut ranked: Vec<(&str, usize)> = analysis
            .tags
            .iter()
            .map(|tag| (tag.as_str(), analysis.frequency_of(tag)))
            .collect();
        // sort_by is stable, so equal frequencies stay in discovery order
        ranked.sort_by(|a, b| b.1.cmp(&a.1));

        let bucket = ranked.len().div_ceil(self.max_level as usize);
        let max_frequency = analysis.max_frequency().max(1);

        let nodes = ranked
            .into_iter()
            .enumerate()
            .map(|(rank, (tag, frequency))| {
                let level = ((rank / bucket) as u32 + 1).min(self.max_level);
                let importance = importance(frequency, max_frequency);
                Ok(Node::new(tag)?
                    .with_description(format!("{}{}", defaults::TAG_DESCRIPTION_PREFIX, tag))
                    .with_position(layout.next_position())
                    .with_level(level)?
                    .with_importance(importance)?)
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(
            { logging::COMPONENT } = "leveler",
            { logging::NODE_COUNT } = nodes.len(),
            { logging::MAX_LEVEL } = self.max_level,
            bucket_size = bucket,
            "Nodes leveled"
        );

        Ok(nodes)
    }
}

fn importance(frequency: usize, max_frequency: usize) -> u8 {
    let scaled = (100.0 * frequency as f64 / max_frequency as f64).round();
    scaled.min(f64::from(defaults::MAX_IMPORTANCE)) as u8
}
