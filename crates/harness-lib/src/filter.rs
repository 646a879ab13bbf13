//! Include/exclude tag filtering
//!
//! Decides whether an entity (a container, typically) is observed at all,
//! based on its tags. Include patterns win over exclude patterns when both
//! match the same entity, so `exclude: [".*"]` plus a narrow include list
//! acts as an allow list.

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FilterError {
    #[error("invalid filter pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Raw include/exclude patterns as they appear in instance configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone)]
struct TagRule {
    source: String,
    regex: Regex,
}

impl TagRule {
    /// Patterns are anchored at the start of the tag but may stop short of
    /// its end, so `docker_image:nginx` also matches `docker_image:nginx:1.9`.
    fn compile(pattern: &str) -> Result<Self, FilterError> {
        let regex = Regex::new(&format!("^(?:{})", pattern)).map_err(|source| {
            FilterError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            }
        })?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }
}

/// Compiled include/exclude pattern lists
#[derive(Debug, Clone, Default)]
pub struct FilterSet {
    include: Vec<TagRule>,
    exclude: Vec<TagRule>,
}

impl FilterSet {
    pub fn new<I, E, S, T>(include: I, exclude: E) -> Result<Self, FilterError>
    where
        I: IntoIterator<Item = S>,
        E: IntoIterator<Item = T>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        let include = include
            .into_iter()
            .map(|p| TagRule::compile(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        let exclude = exclude
            .into_iter()
            .map(|p| TagRule::compile(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { include, exclude })
    }

    pub fn from_spec(spec: &FilterSpec) -> Result<Self, FilterError> {
        Self::new(&spec.include, &spec.exclude)
    }

    /// No patterns configured: everything is included
    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    pub fn include_patterns(&self) -> impl Iterator<Item = &str> {
        self.include.iter().map(|r| r.source.as_str())
    }

    pub fn exclude_patterns(&self) -> impl Iterator<Item = &str> {
        self.exclude.iter().map(|r| r.source.as_str())
    }

    /// Whether an entity carrying `tags` should be observed
    pub fn is_included<I, S>(&self, tags: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tags: Vec<S> = tags.into_iter().collect();
        let included = any_match(&self.include, &tags);

        let passes_include = self.include.is_empty() || included;
        let passes_exclude = !any_match(&self.exclude, &tags) || included;

        passes_include && passes_exclude
    }
}

fn any_match<S: AsRef<str>>(rules: &[TagRule], tags: &[S]) -> bool {
    rules
        .iter()
        .any(|rule| tags.iter().any(|tag| rule.regex.is_match(tag.as_ref())))
}

/// Free-function form of [`FilterSet::is_included`]
pub fn is_included<I, S>(candidate_tags: I, filters: &FilterSet) -> bool
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    filters.is_included(candidate_tags)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NGINX: [&str; 2] = ["docker_image:nginx", "image_name:nginx"];
    const REDIS: [&str; 3] = ["docker_image:redis:latest", "image_name:redis", "image_tag:latest"];

    fn filters(include: &[&str], exclude: &[&str]) -> FilterSet {
        FilterSet::new(include, exclude).unwrap()
    }

    #[test]
    fn test_empty_filter_includes_everything() {
        let f = FilterSet::default();
        assert!(f.is_empty());
        assert!(f.is_included(NGINX));
        assert!(f.is_included(Vec::<String>::new()));
    }

    #[test]
    fn test_exclude_single_image() {
        let f = filters(&[], &["docker_image:nginx"]);
        assert!(!f.is_included(NGINX));
        assert!(f.is_included(REDIS));
    }

    #[test]
    fn test_include_overrides_catch_all_exclude() {
        let f = filters(&["image_name:redis"], &[".*"]);
        assert!(f.is_included(REDIS));
        assert!(!f.is_included(NGINX));
        assert!(!f.is_included(["image_name:nginx"]));
    }

    #[test]
    fn test_include_without_exclude_is_an_allow_list() {
        let f = filters(&["image_name:redis"], &[]);
        assert!(f.is_included(REDIS));
        assert!(!f.is_included(NGINX));
    }

    #[test]
    fn test_patterns_are_prefix_anchored() {
        let f = filters(&[], &["image_name:red"]);
        assert!(!f.is_included(["image_name:redis"]));

        let f = filters(&[], &["redis"]);
        assert!(f.is_included(["image_name:redis"]));
    }

    #[test]
    fn test_evaluation_is_deterministic() {
        let f = filters(&["image_name:redis"], &[".*"]);
        for tags in [&NGINX[..], &REDIS[..]] {
            assert_eq!(f.is_included(tags), f.is_included(tags));
            assert_eq!(is_included(tags, &f), f.is_included(tags));
        }
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let err = FilterSet::new(["image_name:(redis"], Vec::<String>::new()).unwrap_err();
        assert!(err.to_string().contains("image_name:(redis"));
    }

    #[test]
    fn test_from_spec_keeps_pattern_order() {
        let spec = FilterSpec {
            include: vec!["a".into(), "b".into()],
            exclude: vec![".*".into()],
        };
        let f = FilterSet::from_spec(&spec).unwrap();
        assert_eq!(f.include_patterns().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(f.exclude_patterns().collect::<Vec<_>>(), vec![".*"]);
    }
}
