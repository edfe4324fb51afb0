//! Cardinality algebra
//!
//! Pure functions over integer ranges. A cardinality is one of four discrete
//! buckets plus a numeric fallback that retains out-of-domain ranges verbatim
//! so no information is silently dropped. Cardinality is advisory metadata,
//! never a hard constraint, so there are no error paths here.

use serde::{Deserialize, Serialize};

/// Permitted count range of one side of a relation.
///
/// Constructed from a `(min, max)` pair where `None` means unbounded.
/// Any range that does not match one of the four discrete buckets, including
/// a degenerate `min > max` pair, is kept as [`Cardinality::Unsupported`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Cardinality {
    /// 0..unbounded
    Any,
    /// 1..unbounded
    OneOrMore,
    /// 0..1
    OneOrNone,
    /// 1..1
    ExactlyOne,
    /// Any other numeric range, retained verbatim.
    Unsupported {
        min: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        max: Option<u64>,
    },
}

impl Cardinality {
    /// Bucket a numeric occurrence range. `max = None` means unbounded.
    pub fn from_range(min: u64, max: Option<u64>) -> Self {
        match (min, max) {
            (0, None) => Cardinality::Any,
            (1, None) => Cardinality::OneOrMore,
            (0, Some(1)) => Cardinality::OneOrNone,
            (1, Some(1)) => Cardinality::ExactlyOne,
            (min, max) => Cardinality::Unsupported { min, max },
        }
    }

    /// The numeric bounds this cardinality stands for.
    pub fn bounds(&self) -> (u64, Option<u64>) {
        match self {
            Cardinality::Any => (0, None),
            Cardinality::OneOrMore => (1, None),
            Cardinality::OneOrNone => (0, Some(1)),
            Cardinality::ExactlyOne => (1, Some(1)),
            Cardinality::Unsupported { min, max } => (*min, *max),
        }
    }

    /// Intersection of two ranges: `(max(min_a, min_b), min(max_a, max_b))`.
    ///
    /// Commutative and associative; [`Cardinality::Any`] is the identity, so
    /// merging a sequence of independent constraints can start from the
    /// unconstrained range. An empty intersection (`min > max`) stays an
    /// `Unsupported` range rather than failing.
    pub fn merge(&self, other: &Cardinality) -> Cardinality {
        let (min_a, max_a) = self.bounds();
        let (min_b, max_b) = other.bounds();
        let min = min_a.max(min_b);
        let max = match (max_a, max_b) {
            (None, None) => None,
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(b),
            (Some(a), Some(b)) => Some(a.min(b)),
        };
        Cardinality::from_range(min, max)
    }

    /// Human-readable `(min, max)` rendering: `"0"`, `"1"`, `"n"` or the
    /// literal bound.
    pub fn to_display_pair(&self) -> (String, String) {
        let (min, max) = self.bounds();
        let max_display = match max {
            None => "n".to_string(),
            Some(m) => m.to_string(),
        };
        (min.to_string(), max_display)
    }
}

impl Default for Cardinality {
    fn default() -> Self {
        Cardinality::Any
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_construction() {
        assert_eq!(Cardinality::from_range(0, None), Cardinality::Any);
        assert_eq!(Cardinality::from_range(1, None), Cardinality::OneOrMore);
        assert_eq!(Cardinality::from_range(0, Some(1)), Cardinality::OneOrNone);
        assert_eq!(Cardinality::from_range(1, Some(1)), Cardinality::ExactlyOne);
        assert_eq!(
            Cardinality::from_range(2, Some(5)),
            Cardinality::Unsupported {
                min: 2,
                max: Some(5)
            }
        );
    }

    #[test]
    fn test_degenerate_range_is_retained() {
        // min > max cannot be established by the caller; it degrades instead
        // of failing.
        assert_eq!(
            Cardinality::from_range(3, Some(1)),
            Cardinality::Unsupported {
                min: 3,
                max: Some(1)
            }
        );
    }

    #[test]
    fn test_merge_identity() {
        for c in [
            Cardinality::Any,
            Cardinality::OneOrMore,
            Cardinality::OneOrNone,
            Cardinality::ExactlyOne,
            Cardinality::from_range(2, Some(7)),
        ] {
            assert_eq!(Cardinality::Any.merge(&c), c);
            assert_eq!(c.merge(&Cardinality::Any), c);
        }
    }

    #[test]
    fn test_merge_commutative() {
        let samples = [
            Cardinality::Any,
            Cardinality::OneOrMore,
            Cardinality::OneOrNone,
            Cardinality::ExactlyOne,
            Cardinality::from_range(2, Some(4)),
        ];
        for a in &samples {
            for b in &samples {
                assert_eq!(a.merge(b), b.merge(a));
            }
        }
    }

    #[test]
    fn test_merge_associative() {
        let samples = [
            Cardinality::Any,
            Cardinality::OneOrMore,
            Cardinality::OneOrNone,
            Cardinality::ExactlyOne,
            Cardinality::from_range(0, Some(3)),
        ];
        for a in &samples {
            for b in &samples {
                for c in &samples {
                    assert_eq!(a.merge(b).merge(c), a.merge(&b.merge(c)));
                }
            }
        }
    }

    #[test]
    fn test_merge_tightest_bound() {
        assert_eq!(
            Cardinality::ExactlyOne.merge(&Cardinality::Any),
            Cardinality::ExactlyOne
        );
        assert_eq!(
            Cardinality::OneOrMore.merge(&Cardinality::OneOrNone),
            Cardinality::ExactlyOne
        );
    }

    #[test]
    fn test_display_pair() {
        assert_eq!(
            Cardinality::Any.to_display_pair(),
            ("0".to_string(), "n".to_string())
        );
        assert_eq!(
            Cardinality::ExactlyOne.to_display_pair(),
            ("1".to_string(), "1".to_string())
        );
        assert_eq!(
            Cardinality::from_range(2, Some(5)).to_display_pair(),
            ("2".to_string(), "5".to_string())
        );
    }
}
