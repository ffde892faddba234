//! # Topic configuration.
//!
//! [`Topics`] is the non-empty, ordered list of topic names a Producer subscribes to.
//! Anything that can describe topics implements [`IntoTopics`]:
//!
//! | Input                         | Result                                  |
//! |-------------------------------|-----------------------------------------|
//! | `"sensors"`                   | `["sensors"]`                           |
//! | `""`, `None`, `[]`            | `Err(InvalidTopics)`                    |
//! | `vec!["1", "2"]`              | `["1", "2"]`                            |
//! | `json!(["1", 2])`             | `["1"]` (non-strings dropped silently)  |
//! | `json!([2])`, `json!(null)`   | `Err(InvalidTopics)`                    |

use std::slice;

use serde_json::Value;

use crate::error::PipelineError;

/// Non-empty ordered list of topic names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics(Vec<String>);

impl Topics {
    /// Builds topics from any supported input.
    pub fn parse(input: impl IntoTopics) -> Result<Self, PipelineError> {
        input.into_topics()
    }

    fn from_vec(topics: Vec<String>) -> Result<Self, PipelineError> {
        if topics.is_empty() {
            return Err(PipelineError::invalid_topics("topics can't be empty"));
        }
        Ok(Self(topics))
    }

    /// Topic names in configuration order.
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn iter(&self) -> slice::Iter<'_, String> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a Topics {
    type Item = &'a String;
    type IntoIter = slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Conversion into a validated [`Topics`] list.
pub trait IntoTopics {
    fn into_topics(self) -> Result<Topics, PipelineError>;
}

impl IntoTopics for Topics {
    fn into_topics(self) -> Result<Topics, PipelineError> {
        Ok(self)
    }
}

impl IntoTopics for &str {
    fn into_topics(self) -> Result<Topics, PipelineError> {
        if self.is_empty() {
            return Err(PipelineError::invalid_topics("topic can't be an empty string"));
        }
        Topics::from_vec(vec![self.to_string()])
    }
}

impl IntoTopics for String {
    fn into_topics(self) -> Result<Topics, PipelineError> {
        self.as_str().into_topics()
    }
}

impl<S: AsRef<str>> IntoTopics for Vec<S> {
    fn into_topics(self) -> Result<Topics, PipelineError> {
        self.as_slice().into_topics()
    }
}

impl<S: AsRef<str>> IntoTopics for &[S] {
    fn into_topics(self) -> Result<Topics, PipelineError> {
        Topics::from_vec(self.iter().map(|s| s.as_ref().to_string()).collect())
    }
}

impl<S: AsRef<str>, const N: usize> IntoTopics for [S; N] {
    fn into_topics(self) -> Result<Topics, PipelineError> {
        self.as_slice().into_topics()
    }
}

impl<T: IntoTopics> IntoTopics for Option<T> {
    fn into_topics(self) -> Result<Topics, PipelineError> {
        match self {
            Some(inner) => inner.into_topics(),
            None => Err(PipelineError::invalid_topics("topics can't be absent")),
        }
    }
}

/// Mixed collections: only string entries are kept.
impl IntoTopics for &Value {
    fn into_topics(self) -> Result<Topics, PipelineError> {
        match self {
            Value::String(s) => s.as_str().into_topics(),
            Value::Array(items) => Topics::from_vec(
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect(),
            ),
            Value::Null => Err(PipelineError::invalid_topics("topics can't be absent")),
            other => Err(PipelineError::invalid_topics(format!(
                "expected a topic or a list of topics, got {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn single_topic_is_wrapped() {
        assert_eq!(Topics::parse("test_topic").unwrap().as_slice(), ["test_topic"]);
    }

    #[test]
    fn list_keeps_order() {
        assert_eq!(Topics::parse(vec!["1", "2"]).unwrap().as_slice(), ["1", "2"]);
    }

    #[test]
    fn non_strings_are_ignored() {
        assert_eq!(Topics::parse(&json!(["1", 2])).unwrap().as_slice(), ["1"]);
    }

    #[test]
    fn empty_inputs_are_rejected() {
        let cases: Vec<Result<Topics, PipelineError>> = vec![
            Topics::parse(None::<&str>),
            Topics::parse(""),
            Topics::parse(Vec::<String>::new()),
            Topics::parse(&json!(null)),
            Topics::parse(&json!([])),
            Topics::parse(&json!([1, 2])),
            Topics::parse(&json!(42)),
        ];
        for case in cases {
            assert!(
                matches!(case, Err(PipelineError::InvalidTopics { .. })),
                "expected InvalidTopics, got {case:?}"
            );
        }
    }
}
