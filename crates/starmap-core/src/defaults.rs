//! Centralized default constants for the starmap engine.
//!
//! **This module is the single source of truth** for shared default values.
//! The fusion crate and the CLI reference these constants instead of
//! defining their own magic numbers.

// =============================================================================
// NODES
// =============================================================================

/// Category assigned to nodes that do not carry one.
pub const CATEGORY: &str = "knowledge";

/// Level assigned to nodes that do not carry one.
pub const LEVEL: u32 = 1;

/// Importance assigned to nodes that do not carry one.
pub const IMPORTANCE: u8 = 50;

/// Upper bound of the importance scale.
pub const MAX_IMPORTANCE: u8 = 100;

/// Prefix for descriptions of nodes derived from tags.
pub const TAG_DESCRIPTION_PREFIX: &str = "Tag: ";

// =============================================================================
// RELATIONS
// =============================================================================

/// Relation type used for every derived relation.
pub const RELATION_TYPE: &str = "related";

/// Strength used when a caller adds a relation without one.
pub const RELATION_STRENGTH: f64 = 0.5;

/// Minimum strength for a derived relation to be kept.
pub const MIN_RELATION: f64 = 0.3;

/// Minimum strength applied by relation listing when no filter is given.
pub const LIST_MIN_STRENGTH: f64 = 0.1;

// =============================================================================
// LEVELING
// =============================================================================

/// Number of hierarchy levels the leveler partitions tags into.
pub const MAX_LEVEL: u32 = 3;

// =============================================================================
// STRUCTURAL SCORING
// =============================================================================

/// Base strength every node pair starts with.
pub const SCORE_BASE: f64 = 0.1;

/// Bonus for matching categories.
pub const SCORE_CATEGORY_BONUS: f64 = 0.3;

/// Bonus for matching levels.
pub const SCORE_LEVEL_BONUS: f64 = 0.2;

/// Weight of importance similarity.
pub const SCORE_IMPORTANCE_WEIGHT: f64 = 0.4;

// =============================================================================
// LAYOUT
// =============================================================================

/// Canvas width positions are drawn from.
pub const CANVAS_WIDTH: f64 = 800.0;

/// Canvas height positions are drawn from.
pub const CANVAS_HEIGHT: f64 = 600.0;

/// Seed for the layout generator.
pub const LAYOUT_SEED: u64 = 0x5eed_57a2;

// =============================================================================
// CONTRIBUTORS
// =============================================================================

/// Contributor recorded when the caller does not name one.
pub const CONTRIBUTOR: &str = "anonymous";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_weights_sum_to_one() {
        let max = SCORE_BASE + SCORE_CATEGORY_BONUS + SCORE_LEVEL_BONUS + SCORE_IMPORTANCE_WEIGHT;
        assert!((max - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_default_importance_in_range() {
        assert!(IMPORTANCE <= MAX_IMPORTANCE);
    }

    #[test]
    fn test_min_relation_is_a_strength() {
        assert!((0.0..=1.0).contains(&MIN_RELATION));
        assert!((0.0..=1.0).contains(&RELATION_STRENGTH));
    }
}
