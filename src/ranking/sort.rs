//! Stable ordering of candidates by tag rank.

use super::TagRankModel;
use crate::model::TaggedItem;

/// Anything that exposes a tag set for ranking.
pub trait Ranked {
    fn rank_tags(&self) -> &[String];
}

impl Ranked for TaggedItem {
    fn rank_tags(&self) -> &[String] {
        &self.tags
    }
}

pub struct StableItemSorter<'a> {
    model: &'a TagRankModel,
}

impl<'a> StableItemSorter<'a> {
    pub fn new(model: &'a TagRankModel) -> Self {
        Self { model }
    }

    /// Ascending rank; items of equal rank keep their input order.
    pub fn sort<T: Ranked>(&self, items: Vec<T>) -> Vec<T> {
        let mut keyed: Vec<(usize, T)> = items
            .into_iter()
            .map(|item| (self.model.rank_of_set(item.rank_tags()), item))
            .collect();
        // slice::sort_by_key is stable
        keyed.sort_by_key(|(rank, _)| *rank);
        keyed.into_iter().map(|(_, item)| item).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranking::RelevanceOrder;
    use proptest::prelude::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Doc {
        id: usize,
        tags: Vec<String>,
    }

    impl Ranked for Doc {
        fn rank_tags(&self) -> &[String] {
            &self.tags
        }
    }

    fn doc(id: usize, tags: &[&str]) -> Doc {
        Doc {
            id,
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    fn ids(docs: &[Doc]) -> Vec<usize> {
        docs.iter().map(|d| d.id).collect()
    }

    #[test]
    fn sorts_by_worst_tag_rank() {
        let model = TagRankModel::new(&RelevanceOrder::new(["math", "physics", "art"]));
        let sorted = StableItemSorter::new(&model).sort(vec![
            doc(0, &["art"]),
            doc(1, &["Math"]),
            doc(2, &["math", "obscure"]),
            doc(3, &["physics", "math"]),
        ]);
        assert_eq!(ids(&sorted), vec![1, 3, 0, 2]);
    }

    #[test]
    fn untagged_items_sink_and_keep_order() {
        let model = TagRankModel::new(&RelevanceOrder::new(["math"]));
        let sorted = StableItemSorter::new(&model).sort(vec![
            doc(0, &[]),
            doc(1, &["nope"]),
            doc(2, &["math"]),
            doc(3, &[]),
        ]);
        assert_eq!(ids(&sorted), vec![2, 0, 1, 3]);
    }

    #[test]
    fn empty_input_is_fine() {
        let model = TagRankModel::new(&RelevanceOrder::default());
        assert!(StableItemSorter::new(&model).sort(Vec::<Doc>::new()).is_empty());
    }

    proptest! {
        #[test]
        fn prop_sort_is_stable_and_ascending(
            order in prop::collection::vec("[a-e]", 0..5),
            tag_sets in prop::collection::vec(prop::collection::vec("[a-g]", 0..3), 0..20),
        ) {
            let model = TagRankModel::new(&RelevanceOrder::new(&order));
            let docs: Vec<Doc> = tag_sets
                .into_iter()
                .enumerate()
                .map(|(id, tags)| Doc { id, tags })
                .collect();

            let sorted = StableItemSorter::new(&model).sort(docs.clone());
            prop_assert_eq!(sorted.len(), docs.len());

            for pair in sorted.windows(2) {
                let (a, b) = (&pair[0], &pair[1]);
                let (ra, rb) = (model.rank_of_set(&a.tags), model.rank_of_set(&b.tags));
                prop_assert!(ra <= rb);
                if ra == rb {
                    prop_assert!(a.id < b.id, "equal-rank items reordered");
                }
            }
        }
    }
}
