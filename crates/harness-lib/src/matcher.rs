//! Tag matching for expectations

use crate::models::TagSet;
use serde::{Deserialize, Serialize};

/// Predicate over an observation's tag set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagPattern {
    /// Any tag set matches
    #[default]
    Unspecified,
    /// Every listed tag must be present; extra tags are allowed
    RequiredSet(TagSet),
}

impl TagPattern {
    /// `None` means no tag constraint at all
    pub fn from_tags<I, S>(tags: Option<I>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        match tags {
            Some(tags) => TagPattern::RequiredSet(tags.into_iter().collect()),
            None => TagPattern::Unspecified,
        }
    }

    pub fn required<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TagPattern::RequiredSet(tags.into_iter().collect())
    }
}

/// True when `tags` satisfies `pattern`
///
/// An empty required set matches every observation, tagged or not.
pub fn matches(tags: &TagSet, pattern: &TagPattern) -> bool {
    match pattern {
        TagPattern::Unspecified => true,
        TagPattern::RequiredSet(required) => required.is_subset(tags),
    }
}
