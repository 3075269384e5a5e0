//! Composable predicates over a file pair: one-file metadata tests, relative
//! tests, and a selector that tries both orderings with a random tie-break.

use rand::Rng;

/// Which side of an ordered `(better, worse)` pair a `PairComparatorOneFile`
/// should inspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    LookingAtBetter,
    LookingAtWorse,
}

/// Host-defined capability: a predicate over a single file's metadata. The
/// core only consumes this interface, it doesn't specify what conditions a
/// host actually supports.
pub trait MetadataConditional<M>: MetadataConditionalClone<M> {
    fn test(&self, media: &M) -> bool;
}

/// Lets a boxed `MetadataConditional` be cloned without making the trait
/// itself non-object-safe. Blanket-implemented for any `Clone` impl.
pub trait MetadataConditionalClone<M> {
    fn clone_box(&self) -> Box<dyn MetadataConditional<M> + Send + Sync>;
}

impl<M, T> MetadataConditionalClone<M> for T
where
    T: MetadataConditional<M> + Clone + Send + Sync + 'static,
{
    fn clone_box(&self) -> Box<dyn MetadataConditional<M> + Send + Sync> {
        Box::new(self.clone())
    }
}

impl<M> Clone for Box<dyn MetadataConditional<M> + Send + Sync> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// A property a `Relative` comparator can inspect; the host's media type
/// supplies the concrete accessor via `RelativeProperty::extract`.
pub trait RelativeProperty<M>: RelativePropertyClone<M> {
    fn extract(&self, media: &M) -> f64;
}

/// Lets a boxed `RelativeProperty` be cloned without making the trait
/// itself non-object-safe. Blanket-implemented for any `Clone` impl.
pub trait RelativePropertyClone<M> {
    fn clone_box(&self) -> Box<dyn RelativeProperty<M> + Send + Sync>;
}

impl<M, T> RelativePropertyClone<M> for T
where
    T: RelativeProperty<M> + Clone + Send + Sync + 'static,
{
    fn clone_box(&self) -> Box<dyn RelativeProperty<M> + Send + Sync> {
        Box::new(self.clone())
    }
}

impl<M> Clone for Box<dyn RelativeProperty<M> + Send + Sync> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelativeOperator {
    RatioGreaterThan,
    AbsoluteGreaterThan,
}

/// A predicate over an ordered pair `(better_candidate, worse_candidate)`.
pub enum PairComparator<M> {
    OneFile {
        side: Side,
        conditional: Box<dyn MetadataConditional<M> + Send + Sync>,
    },
    Relative {
        property: Box<dyn RelativeProperty<M> + Send + Sync>,
        operator: RelativeOperator,
        quantity: f64,
    },
}

impl<M> Clone for PairComparator<M> {
    fn clone(&self) -> Self {
        match self {
            PairComparator::OneFile { side, conditional } => PairComparator::OneFile {
                side: *side,
                conditional: conditional.clone(),
            },
            PairComparator::Relative {
                property,
                operator,
                quantity,
            } => PairComparator::Relative {
                property: property.clone(),
                operator: *operator,
                quantity: *quantity,
            },
        }
    }
}

impl<M> PairComparator<M> {
    pub fn test(&self, better: &M, worse: &M) -> bool {
        match self {
            PairComparator::OneFile { side, conditional } => match side {
                Side::LookingAtBetter => conditional.test(better),
                Side::LookingAtWorse => conditional.test(worse),
            },
            PairComparator::Relative {
                property,
                operator,
                quantity,
            } => {
                let b = property.extract(better);
                let w = property.extract(worse);
                match operator {
                    RelativeOperator::RatioGreaterThan => w != 0.0 && b / w > *quantity,
                    RelativeOperator::AbsoluteGreaterThan => (b - w) > *quantity,
                }
            }
        }
    }
}

/// A stack of comparators. Given two media without a known ordering, tries
/// both orientations, picking the one where every comparator passes; the
/// pair is randomly shuffled first so that when both orientations would
/// pass, selection is fair rather than biased toward input order.
pub struct PairSelectorAndComparator<M> {
    comparators: Vec<PairComparator<M>>,
}

impl<M> Clone for PairSelectorAndComparator<M> {
    fn clone(&self) -> Self {
        PairSelectorAndComparator {
            comparators: self.comparators.clone(),
        }
    }
}

impl<M> PairSelectorAndComparator<M> {
    pub fn new(comparators: Vec<PairComparator<M>>) -> Self {
        PairSelectorAndComparator { comparators }
    }

    fn all_pass(&self, better: &M, worse: &M) -> bool {
        self.comparators.iter().all(|c| c.test(better, worse))
    }

    pub fn len(&self) -> usize {
        self.comparators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.comparators.is_empty()
    }

    /// Returns the winning candidate, or `None` if neither orientation
    /// passes every comparator.
    pub fn matching_media<'a>(&self, m1: &'a M, m2: &'a M) -> Option<&'a M> {
        let swap = rand::thread_rng().gen_bool(0.5);
        let (x, y) = if swap { (m2, m1) } else { (m1, m2) };

        if self.all_pass(x, y) {
            Some(x)
        } else if self.all_pass(y, x) {
            Some(y)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Media {
        size: f64,
    }

    #[derive(Clone)]
    struct SizeAtLeast(f64);
    impl MetadataConditional<Media> for SizeAtLeast {
        fn test(&self, media: &Media) -> bool {
            media.size >= self.0
        }
    }

    #[test]
    fn one_file_comparator_tests_selected_side() {
        let comparator = PairComparator::OneFile {
            side: Side::LookingAtBetter,
            conditional: Box::new(SizeAtLeast(100.0)),
        };
        let better = Media { size: 200.0 };
        let worse = Media { size: 10.0 };
        assert!(comparator.test(&better, &worse));
        assert!(!comparator.test(&worse, &better));
    }

    #[test]
    fn selector_picks_orientation_that_passes() {
        let selector = PairSelectorAndComparator::new(vec![PairComparator::OneFile {
            side: Side::LookingAtBetter,
            conditional: Box::new(SizeAtLeast(100.0)),
        }]);
        let big = Media { size: 500.0 };
        let small = Media { size: 1.0 };
        let winner = selector.matching_media(&big, &small);
        assert!(winner.is_some());
        assert_eq!(winner.unwrap().size as u32, 500);
    }

    #[test]
    fn selector_both_ways_invariant() {
        let selector = PairSelectorAndComparator::new(vec![PairComparator::OneFile {
            side: Side::LookingAtBetter,
            conditional: Box::new(SizeAtLeast(100.0)),
        }]);
        let a = Media { size: 500.0 };
        let b = Media { size: 1.0 };
        for _ in 0..20 {
            let forward = selector.matching_media(&a, &b);
            let backward = selector.matching_media(&b, &a);
            assert_eq!(forward.map(|m| m.size as u32), Some(500));
            assert_eq!(backward.map(|m| m.size as u32), Some(500));
        }
    }

    #[test]
    fn selector_clone_is_independent_and_equivalent() {
        let selector = PairSelectorAndComparator::new(vec![PairComparator::OneFile {
            side: Side::LookingAtBetter,
            conditional: Box::new(SizeAtLeast(100.0)),
        }]);
        let cloned = selector.clone();
        let big = Media { size: 500.0 };
        let small = Media { size: 1.0 };
        assert_eq!(
            cloned.matching_media(&big, &small).map(|m| m.size as u32),
            Some(500)
        );
        assert_eq!(cloned.len(), selector.len());
    }

    #[test]
    fn selector_returns_none_when_neither_orientation_passes() {
        let selector = PairSelectorAndComparator::new(vec![PairComparator::OneFile {
            side: Side::LookingAtBetter,
            conditional: Box::new(SizeAtLeast(1000.0)),
        }]);
        let a = Media { size: 5.0 };
        let b = Media { size: 1.0 };
        assert!(selector.matching_media(&a, &b).is_none());
    }
}
