//! Structured logging schema and field name constants for starmap.
//!
//! All crates use these constants for consistent structured logging fields,
//! so log aggregation can query fusion runs by the same names everywhere.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Operation aborted, caller input cannot be processed |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Operation completions (analysis, fusion) |
//! | DEBUG | Decision points, conflicts, intermediate counts |
//! | TRACE | Per-item iteration (pairs, scores, ledger appends) |
//!
//! Operation spans carry `subsystem`, `component`, and `op` through
//! `#[instrument(fields(...))]`, which takes literal field names. Events use
//! the constants below.

// ─── Identity fields ───────────────────────────────────────────────────────

/// Component within a subsystem.
/// Examples: "cooccurrence", "leveler", "synthesizer", "ledger"
pub const COMPONENT: &str = "component";

/// Contributor the event is attributed to.
pub const CONTRIBUTOR: &str = "contributor";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Node name being operated on.
pub const NODE_NAME: &str = "node_name";

/// Fusion strategy in effect.
pub const STRATEGY: &str = "strategy";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of input documents.
pub const DOCUMENT_COUNT: &str = "document_count";

/// Number of distinct tags.
pub const TAG_COUNT: &str = "tag_count";

/// Number of nodes produced.
pub const NODE_COUNT: &str = "node_count";

/// Number of relations produced.
pub const RELATION_COUNT: &str = "relation_count";

/// Number of conflicts recorded.
pub const CONFLICT_COUNT: &str = "conflict_count";

/// Number of ledger events appended.
pub const EVENT_COUNT: &str = "event_count";

/// Minimum relation strength threshold.
pub const MIN_RELATION: &str = "min_relation";

/// Maximum hierarchy level.
pub const MAX_LEVEL: &str = "max_level";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_field_names_are_distinct() {
        let fields = [
            COMPONENT,
            CONTRIBUTOR,
            NODE_NAME,
            STRATEGY,
            DURATION_MS,
            DOCUMENT_COUNT,
            TAG_COUNT,
            NODE_COUNT,
            RELATION_COUNT,
            CONFLICT_COUNT,
            EVENT_COUNT,
            MIN_RELATION,
            MAX_LEVEL,
            ERROR_MSG,
        ];
        let unique: HashSet<&str> = fields.iter().copied().collect();
        assert_eq!(unique.len(), fields.len());
    }
}
