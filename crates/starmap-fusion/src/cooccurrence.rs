//! Tag co-occurrence analysis over a collection of tagged documents.
//!
//! Two tags are related in proportion to how often they appear on the same
//! document, measured against the rarer of the two:
//!
//! ```text
//! ratio(a, b) = |docs(a) ∩ docs(b)| / min(|docs(a)|, |docs(b)|)
//! ```
//!
//! Pairs are produced in discovery order: the outer loop walks tags in the
//! order they were first seen, the inner loop walks the tags seen after it.
//! The cost is quadratic in the number of distinct tags, which stays small
//! for a single user's vocabulary.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;
use tracing::{debug, trace};

use starmap_core::{defaults, logging, Document, Error, Result};

use crate::check_min_relation;

/// Two tags that co-occur often enough to be related.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagPair {
    pub tag_a: String,
    pub tag_b: String,
    /// Shared documents over the smaller document count, in (0, 1].
    pub ratio: f64,
    /// Number of documents carrying both tags.
    pub common: usize,
    pub count_a: usize,
    pub count_b: usize,
}

/// Result of analysing a document collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TagAnalysis {
    /// Distinct tags in first-seen order.
    pub tags: Vec<String>,
    /// Number of documents carrying each tag.
    pub frequency: BTreeMap<String, usize>,
    /// Document ids per tag, in input order.
    pub documents_by_tag: BTreeMap<String, Vec<String>>,
    /// Related pairs at or above the threshold.
    pub pairs: Vec<TagPair>,
    /// Number of documents analysed, including untagged ones.
    pub document_count: usize,
}

impl TagAnalysis {
    pub fn frequency_of(&self, tag: &str) -> usize {
        self.frequency.get(tag).copied().unwrap_or(0)
    }

    pub fn max_frequency(&self) -> usize {
        self.frequency.values().copied().max().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

/// Builds [`TagAnalysis`] from documents.
#[derive(Debug, Clone)]
pub struct CoOccurrenceAnalyzer {
    min_relation: f64,
}

impl Default for CoOccurrenceAnalyzer {
    fn default() -> Self {
        Self {
            min_relation: defaults::MIN_RELATION,
        }
    }
}

impl CoOccurrenceAnalyzer {
    /// Create an analyzer that drops pairs below `min_relation`.
    pub fn new(min_relation: f64) -> Result<Self> {
        Ok(Self {
            min_relation: check_min_relation(min_relation)?,
        })
    }

    pub fn min_relation(&self) -> f64 {
        self.min_relation
    }

    /// Count tags and compute pairwise co-occurrence ratios.
    ///
    /// Tags are trimmed, blank tags are ignored, and a tag repeated on one
    /// document counts once. Duplicate document ids are rejected.
    pub fn analyze(&self, documents: &[Document]) -> Result<TagAnalysis> {
        let mut seen_ids: HashSet<&str> = HashSet::with_capacity(documents.len());
        let mut tags: Vec<String> = Vec::new();
        let mut tag_index: HashMap<String, usize> = HashMap::new();
        // Per tag, the ascending list of document positions carrying it.
        let mut postings: Vec<Vec<usize>> = Vec::new();

        for (doc_pos, document) in documents.iter().enumerate() {
            if !seen_ids.insert(document.id.as_str()) {
                return Err(Error::InvalidDocument {
                    index: doc_pos,
                    reason: format!("duplicate document id '{}'", document.id),
                });
            }

            let mut on_this_doc: HashSet<&str> = HashSet::new();
            for tag in document.tags.iter().map(|t| t.trim()) {
                if tag.is_empty() || !on_this_doc.insert(tag) {
                    continue;
                }
                let i = match tag_index.get(tag) {
                    Some(&i) => i,
                    None => {
                        let i = tags.len();
                        tags.push(tag.to_string());
                        tag_index.insert(tag.to_string(), i);
                        postings.push(Vec::new());
                        i
                    }
                };
                postings[i].push(doc_pos);
            }
        }

        let mut pairs = Vec::new();
        for i in 0..tags.len() {
            for j in (i + 1)..tags.len() {
                let common = intersection_len(&postings[i], &postings[j]);
                if common == 0 {
                    continue;
                }
                let (count_a, count_b) = (postings[i].len(), postings[j].len());
                let ratio = common as f64 / count_a.min(count_b) as f64;
                trace!(tag_a = %tags[i], tag_b = %tags[j], ratio, "Tag pair scored");
                if ratio >= self.min_relation {
                    pairs.push(TagPair {
                        tag_a: tags[i].clone(),
                        tag_b: tags[j].clone(),
                        ratio,
                        common,
                        count_a,
                        count_b,
                    });
                }
            }
        }

        let frequency = tags
            .iter()
            .zip(&postings)
            .map(|(tag, docs)| (tag.clone(), docs.len()))
            .collect();
        let documents_by_tag = tags
            .iter()
            .zip(&postings)
            .map(|(tag, docs)| {
                let ids = docs.iter().map(|&d| documents[d].id.clone()).collect();
                (tag.clone(), ids)
            })
            .collect();

        debug!(
            { logging::COMPONENT } = "cooccurrence",
            { logging::DOCUMENT_COUNT } = documents.len(),
            { logging::TAG_COUNT } = tags.len(),
            pair_count = pairs.len(),
            { logging::MIN_RELATION } = self.min_relation,
            "Tag co-occurrence analysis complete"
        );

        Ok(TagAnalysis {
            tags,
            frequency,
            documents_by_tag,
            pairs,
            document_count: documents.len(),
        })
    }
}

/// Size of the intersection of two ascending lists.
fn intersection_len(a: &[usize], b: &[usize]) -> usize {
    let (mut i, mut j, mut n) = (0, 0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                n += 1;
                i += 1;
                j += 1;
            }
        }
    }
    n
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, tags: &[&str]) -> Document {
        Document::new(id, tags.iter().copied())
    }

    #[test]
    fn test_frequency_and_discovery_order() {
        let docs = vec![
            doc("1", &["rust", "async"]),
            doc("2", &["rust", "tokio"]),
            doc("3", &["async"]),
        ];
        let analysis = CoOccurrenceAnalyzer::default().analyze(&docs).unwrap();

        assert_eq!(analysis.tags, vec!["rust", "async", "tokio"]);
        assert_eq!(analysis.frequency_of("rust"), 2);
        assert_eq!(analysis.frequency_of("async"), 2);
        assert_eq!(analysis.frequency_of("tokio"), 1);
        assert_eq!(analysis.max_frequency(), 2);
        assert_eq!(analysis.documents_by_tag["rust"], vec!["1", "2"]);
    }

    #[test]
    fn test_ratio_uses_smaller_document_count() {
        // rust: {1,2,3,4}, tokio: {1,2}; both tokio docs carry rust
        let docs = vec![
            doc("1", &["rust", "tokio"]),
            doc("2", &["rust", "tokio"]),
            doc("3", &["rust"]),
            doc("4", &["rust"]),
        ];
        let analysis = CoOccurrenceAnalyzer::default().analyze(&docs).unwrap();

        assert_eq!(analysis.pairs.len(), 1);
        let pair = &analysis.pairs[0];
        assert_eq!((pair.tag_a.as_str(), pair.tag_b.as_str()), ("rust", "tokio"));
        assert_eq!(pair.common, 2);
        assert!((pair.ratio - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_pairs_below_threshold_dropped() {
        // a: {1,2,3,4}, b: {1,5,6,7}; ratio 1/4 = 0.25
        let docs = vec![
            doc("1", &["a", "b"]),
            doc("2", &["a"]),
            doc("3", &["a"]),
            doc("4", &["a"]),
            doc("5", &["b"]),
            doc("6", &["b"]),
            doc("7", &["b"]),
        ];
        let strict = CoOccurrenceAnalyzer::new(0.3).unwrap().analyze(&docs).unwrap();
        assert!(strict.pairs.is_empty());

        let loose = CoOccurrenceAnalyzer::new(0.25).unwrap().analyze(&docs).unwrap();
        assert_eq!(loose.pairs.len(), 1);
    }

    #[test]
    fn test_duplicate_tags_on_document_count_once() {
        let docs = vec![doc("1", &["a", "a", " a ", "b"]), doc("2", &["a"])];
        let analysis = CoOccurrenceAnalyzer::default().analyze(&docs).unwrap();

        assert_eq!(analysis.frequency_of("a"), 2);
        assert_eq!(analysis.pairs.len(), 1);
        assert_eq!(analysis.pairs[0].common, 1);
        assert!((analysis.pairs[0].ratio - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_tag_documents_produce_no_pairs() {
        let docs = vec![doc("1", &["a"]), doc("2", &["b"]), doc("3", &[])];
        let analysis = CoOccurrenceAnalyzer::default().analyze(&docs).unwrap();

        assert_eq!(analysis.tags.len(), 2);
        assert!(analysis.pairs.is_empty());
        assert_eq!(analysis.document_count, 3);
    }

    #[test]
    fn test_blank_tags_ignored() {
        let docs = vec![doc("1", &["", "   ", "x"])];
        let analysis = CoOccurrenceAnalyzer::default().analyze(&docs).unwrap();
        assert_eq!(analysis.tags, vec!["x"]);
    }

    #[test]
    fn test_duplicate_document_id_rejected() {
        let docs = vec![doc("1", &["a"]), doc("1", &["b"])];
        let err = CoOccurrenceAnalyzer::default().analyze(&docs).unwrap_err();
        assert!(matches!(err, Error::InvalidDocument { index: 1, .. }));
    }

    #[test]
    fn test_pair_order_follows_discovery() {
        let docs = vec![doc("1", &["c", "a", "b"])];
        let analysis = CoOccurrenceAnalyzer::default().analyze(&docs).unwrap();
        let order: Vec<(&str, &str)> = analysis
            .pairs
            .iter()
            .map(|p| (p.tag_a.as_str(), p.tag_b.as_str()))
            .collect();
        assert_eq!(order, vec![("c", "a"), ("c", "b"), ("a", "b")]);
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        assert!(CoOccurrenceAnalyzer::new(-0.1).is_err());
        assert!(CoOccurrenceAnalyzer::new(1.1).is_err());
        assert!(CoOccurrenceAnalyzer::new(f64::NAN).is_err());
    }

    #[test]
    fn test_intersection_len() {
        assert_eq!(intersection_len(&[1, 3, 5, 7], &[2, 3, 4, 7]), 2);
        assert_eq!(intersection_len(&[], &[1]), 0);
    }
}
