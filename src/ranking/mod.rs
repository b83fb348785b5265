//! Tag relevance ranks and the item order derived from them.

pub mod sort;

pub use sort::{Ranked, StableItemSorter};

use crate::text::fold;
use std::collections::{HashMap, HashSet};

/// Tags ordered most to least relevant, case-folded.
///
/// Produced by the oracle for a single request; never reused across requests
/// because it depends on that request's candidate tag universe.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelevanceOrder {
    tags: Vec<String>,
}

impl RelevanceOrder {
    pub fn new<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            tags: tags.into_iter().map(|t| fold(t.as_ref())).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }
}

/// Rank lookups over a [`RelevanceOrder`].
///
/// Rank 0 is most relevant. Tags missing from the order, and empty tag sets,
/// get the worst rank, `order.len()`.
#[derive(Debug, Clone)]
pub struct TagRankModel {
    ranks: HashMap<String, usize>,
    worst: usize,
}

impl TagRankModel {
    pub fn new(order: &RelevanceOrder) -> Self {
        let mut ranks = HashMap::with_capacity(order.len());
        for (idx, tag) in order.tags().iter().enumerate() {
            // first occurrence wins when the oracle repeats a tag
            ranks.entry(tag.clone()).or_insert(idx);
        }
        Self {
            ranks,
            worst: order.len(),
        }
    }

    pub fn worst_rank(&self) -> usize {
        self.worst
    }

    pub fn rank_of(&self, tag: &str) -> usize {
        self.ranks.get(&fold(tag)).copied().unwrap_or(self.worst)
    }

    /// An item is only as relevant as its least relevant tag.
    pub fn rank_of_set<I, S>(&self, tags: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        tags.into_iter()
            .map(|t| self.rank_of(t.as_ref()))
            .max()
            .unwrap_or(self.worst)
    }
}

/// Deduplicated, case-folded union of every candidate's tags, in first-seen order.
pub fn candidate_universe<'a, I, T>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a T>,
    T: Ranked + 'a,
{
    let mut seen = HashSet::new();
    let mut universe = Vec::new();
    for item in items {
        for tag in item.rank_tags() {
            let folded = fold(tag);
            if seen.insert(folded.clone()) {
                universe.push(folded);
            }
        }
    }
    universe
}
