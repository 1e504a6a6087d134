// src/ingest/source.rs
use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    QueryFeed,
    ListFeed,
}

/// One unit of content to poll: a search query or a list id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Source {
    pub kind: SourceKind,
    pub identifier: String,
}

impl Source {
    pub fn query(text: impl Into<String>) -> Self {
        Self {
            kind: SourceKind::QueryFeed,
            identifier: text.into(),
        }
    }

    pub fn list(id: impl Into<String>) -> Self {
        Self {
            kind: SourceKind::ListFeed,
            identifier: id.into(),
        }
    }

    /// `query:<text>` or `list:<id>`; also the label stored with each record.
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            SourceKind::QueryFeed => write!(f, "query:{}", self.identifier),
            SourceKind::ListFeed => write!(f, "list:{}", self.identifier),
        }
    }
}

/// Static polling configuration: one query, then lists in configured order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceSet {
    query: Option<String>,
    lists: Vec<String>,
}

impl SourceSet {
    /// Blank query is dropped; list ids are trimmed, blanks skipped and
    /// repeats collapsed onto their first occurrence.
    pub fn new<I, S>(query: &str, lists: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let query = Some(query.trim())
            .filter(|q| !q.is_empty())
            .map(str::to_string);

        let mut seen = HashSet::new();
        let lists = lists
            .into_iter()
            .map(|id| id.as_ref().trim().to_string())
            .filter(|id| !id.is_empty() && seen.insert(id.clone()))
            .collect();

        Self { query, lists }
    }

    /// Lazy and restartable: every call walks the same sequence from the start.
    pub fn iter(&self) -> impl Iterator<Item = Source> + '_ {
        self.query
            .iter()
            .map(|q| Source::query(q.clone()))
            .chain(self.lists.iter().map(|id| Source::list(id.clone())))
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn len(&self) -> usize {
        usize::from(self.query.is_some()) + self.lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_comes_first_then_lists_in_order() {
        let set = SourceSet::new("rustlang", ["111", "222", "333"]);
        let got: Vec<String> = set.iter().map(|s| s.label()).collect();
        assert_eq!(got, vec!["query:rustlang", "list:111", "list:222", "list:333"]);
        assert_eq!(set.len(), 4);
    }

    #[test]
    fn iteration_is_restartable() {
        let set = SourceSet::new("q", ["a"]);
        let first: Vec<Source> = set.iter().collect();
        let second: Vec<Source> = set.iter().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn blank_query_and_list_ids_are_skipped() {
        let set = SourceSet::new("   ", [" 1 ", "", "2", "1"]);
        let got: Vec<Source> = set.iter().collect();
        assert_eq!(got, vec![Source::list("1"), Source::list("2")]);
        assert!(set.query().is_none());
    }

    #[test]
    fn empty_configuration_yields_nothing() {
        let set = SourceSet::new("", Vec::<String>::new());
        assert!(set.is_empty());
        assert_eq!(set.iter().count(), 0);
    }
}
