use tracing::warn;

use crate::application::policy::patterns::{FilterPattern, MATCH_ALL};

/// Collection tags of a crawl profile, in the order they were written.
///
/// Parsed from `tag` or `tag:regex` tokens separated by commas. A tag without an
/// expression accepts every document; a malformed expression accepts none.
#[derive(Debug, Clone, Default)]
pub struct CollectionTags {
    tags: Vec<(String, FilterPattern)>,
}

impl CollectionTags {
    pub fn parse(collections: &str) -> Self {
        let mut tags = CollectionTags::default();
        if collections.is_empty() {
            return tags;
        }

        for token in collections.split(',') {
            let (tag, pattern) = match token.split_once(':') {
                Some((tag, source)) => (tag, FilterPattern::compile_with(source, false)),
                None => (token, FilterPattern::compile_with(MATCH_ALL, false)),
            };
            if tag.is_empty() {
                continue;
            }
            if let FilterPattern::FellBack { source, error } = &pattern {
                warn!(tag, source = %source, error = %error, "Malformed collection expression, tag will match nothing");
            }
            tags.insert(tag, pattern);
        }
        tags
    }

    // A repeated tag keeps its first position and takes the later expression.
    fn insert(&mut self, tag: &str, pattern: FilterPattern) {
        match self.tags.iter_mut().find(|(existing, _)| existing == tag) {
            Some((_, slot)) => *slot = pattern,
            None => self.tags.push((tag.to_string(), pattern)),
        }
    }

    pub fn get(&self, tag: &str) -> Option<&FilterPattern> {
        self.tags
            .iter()
            .find(|(existing, _)| existing == tag)
            .map(|(_, pattern)| pattern)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FilterPattern)> {
        self.tags.iter().map(|(tag, pattern)| (tag.as_str(), pattern))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(|(tag, _)| tag.as_str())
    }

    /// Tags whose expression accepts `input`, in tag order.
    pub fn matching<'a>(&'a self, input: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.tags
            .iter()
            .filter(move |(_, pattern)| pattern.is_match(input))
            .map(|(tag, _)| tag.as_str())
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}
