use futures::future::BoxFuture;
use itertools::Itertools;

use crate::context::StringRange;

/// Future type returned by every suggestion source. Futures are `'static`:
/// providers clone whatever they need up front, so the engine can fan them
/// out and the caller can drop the joined future at any time (abandonment
/// is advisory cancellation; the eventual result is simply discarded).
pub type SuggestionsFuture = BoxFuture<'static, Suggestions>;

/// One candidate completion: replacement text for a range of the original
/// input, with an optional tooltip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    range: StringRange,
    text: String,
    tooltip: Option<String>,
}

impl Suggestion {
    pub fn new(range: StringRange, text: impl Into<String>) -> Self {
        Suggestion {
            range,
            text: text.into(),
            tooltip: None,
        }
    }

    pub fn with_tooltip(
        range: StringRange,
        text: impl Into<String>,
        tooltip: impl Into<String>,
    ) -> Self {
        Suggestion {
            range,
            text: text.into(),
            tooltip: Some(tooltip.into()),
        }
    }

    pub fn range(&self) -> StringRange {
        self.range
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tooltip(&self) -> Option<&str> {
        self.tooltip.as_deref()
    }

    /// The input with this suggestion applied.
    pub fn apply(&self, input: &str) -> String {
        let mut result = String::with_capacity(input.len() + self.text.len());
        result.push_str(&input[..self.range.start]);
        result.push_str(&self.text);
        result.push_str(&input[self.range.end..]);
        result
    }

    /// Widens this suggestion to cover `range`, pulling the surrounding
    /// input into the replacement text. Used when merging candidates whose
    /// ranges differ.
    fn expand(&self, command: &str, range: StringRange) -> Suggestion {
        if range == self.range {
            return self.clone();
        }
        let mut text = String::new();
        if range.start < self.range.start {
            text.push_str(&command[range.start..self.range.start]);
        }
        text.push_str(&self.text);
        if self.range.end < range.end {
            text.push_str(&command[self.range.end..range.end]);
        }
        Suggestion {
            range,
            text,
            tooltip: self.tooltip.clone(),
        }
    }
}

/// The deduplicated, range-normalized, lexicographically sorted result of a
/// completion query.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Suggestions {
    range: StringRange,
    entries: Vec<Suggestion>,
}

impl Suggestions {
    pub fn empty() -> Self {
        Suggestions::default()
    }

    pub fn range(&self) -> StringRange {
        self.range
    }

    pub fn entries(&self) -> &[Suggestion] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Normalizes a batch of candidates: every entry is expanded to the
    /// widest covered range, then the set is sorted and deduplicated.
    pub fn create(command: &str, suggestions: Vec<Suggestion>) -> Self {
        if suggestions.is_empty() {
            return Suggestions::empty();
        }
        let start = suggestions.iter().map(|s| s.range.start).min().unwrap();
        let end = suggestions.iter().map(|s| s.range.end).max().unwrap();
        let range = StringRange::between(start, end);
        let entries = suggestions
            .into_iter()
            .map(|s| s.expand(command, range))
            .sorted_by(|a, b| a.text.cmp(&b.text))
            .dedup()
            .collect();
        Suggestions { range, entries }
    }

    /// Merges the results of every branch visited, deterministically
    /// regardless of the order the futures completed in.
    pub fn merge(command: &str, groups: Vec<Suggestions>) -> Self {
        let mut all = Vec::new();
        for group in groups {
            all.extend(group.entries);
        }
        Suggestions::create(command, all)
    }
}

/// Accumulates candidates for one suggestion source. The replacement range
/// of every candidate runs from `start` to the end of the input (the
/// unconsumed tail the user is still typing).
#[derive(Debug, Clone)]
pub struct SuggestionsBuilder {
    input: String,
    start: usize,
    result: Vec<Suggestion>,
}

impl SuggestionsBuilder {
    pub fn new(input: impl Into<String>, start: usize) -> Self {
        SuggestionsBuilder {
            input: input.into(),
            start,
            result: Vec::new(),
        }
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn start(&self) -> usize {
        self.start
    }

    /// The partial token being completed.
    pub fn remaining(&self) -> &str {
        &self.input[self.start..]
    }

    pub fn remaining_lowercase(&self) -> String {
        self.remaining().to_ascii_lowercase()
    }

    pub fn suggest(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        if text == self.remaining() {
            return self;
        }
        self.result.push(Suggestion::new(
            StringRange::between(self.start, self.input.len()),
            text,
        ));
        self
    }

    pub fn suggest_with_tooltip(
        mut self,
        text: impl Into<String>,
        tooltip: impl Into<String>,
    ) -> Self {
        let text = text.into();
        if text == self.remaining() {
            return self;
        }
        self.result.push(Suggestion::with_tooltip(
            StringRange::between(self.start, self.input.len()),
            text,
            tooltip,
        ));
        self
    }

    pub fn build(self) -> Suggestions {
        let SuggestionsBuilder { input, result, .. } = self;
        Suggestions::create(&input, result)
    }

    /// An immediately-ready future of the current candidates.
    pub fn build_future(self) -> SuggestionsFuture {
        Box::pin(futures::future::ready(self.build()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_ranges_cover_the_unconsumed_tail() {
        let suggestions = SuggestionsBuilder::new("ban St", 4)
            .suggest("Steve")
            .suggest("Stone")
            .build();
        assert_eq!(suggestions.range(), StringRange::between(4, 6));
        let texts: Vec<_> = suggestions.entries().iter().map(|s| s.text()).collect();
        assert_eq!(texts, ["Steve", "Stone"]);
    }

    #[test]
    fn suggesting_exactly_the_remaining_text_is_dropped() {
        let suggestions = SuggestionsBuilder::new("ban Steve", 4)
            .suggest("Steve")
            .build();
        assert!(suggestions.is_empty());
    }

    #[test]
    fn apply_replaces_only_the_range() {
        let suggestion = Suggestion::new(StringRange::between(4, 6), "Steve");
        assert_eq!(suggestion.apply("ban St"), "ban Steve");
    }

    #[test]
    fn merge_normalizes_ranges_and_sorts() {
        let input = "ban St";
        let wide = SuggestionsBuilder::new(input, 0).suggest("banana").build();
        let narrow = SuggestionsBuilder::new(input, 4).suggest("Steve").build();
        let merged = Suggestions::merge(input, vec![narrow, wide]);
        assert_eq!(merged.range(), StringRange::between(0, 6));
        // the narrow candidate was expanded with the text around its range
        let texts: Vec<_> = merged.entries().iter().map(|s| s.text()).collect();
        assert_eq!(texts, ["ban Steve", "banana"]);
    }

    #[test]
    fn merge_deduplicates_identical_candidates() {
        let input = "b";
        let a = SuggestionsBuilder::new(input, 0).suggest("ban").build();
        let b = SuggestionsBuilder::new(input, 0).suggest("ban").build();
        let merged = Suggestions::merge(input, vec![a, b]);
        assert_eq!(merged.entries().len(), 1);
    }

    #[test]
    fn merge_of_nothing_is_empty() {
        assert!(Suggestions::merge("x", vec![]).is_empty());
        assert!(Suggestions::merge("x", vec![Suggestions::empty()]).is_empty());
    }
}
