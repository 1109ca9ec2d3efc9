//! Highlighting options.

use quarry_core::{Error, Result};
use serde_json::{Map, Value, json};

/// Per-field highlight options.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HighlightField {
    /// Tags inserted before each highlighted fragment.
    pub pre_tags: Vec<String>,
    /// Tags inserted after each highlighted fragment.
    pub post_tags: Vec<String>,
    /// Fragment length in characters.
    pub fragment_size: Option<u32>,
    /// Maximum number of fragments to return.
    pub number_of_fragments: Option<u32>,
}

impl HighlightField {
    /// Options with every value left to the engine default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the fragment size.
    pub fn with_fragment_size(mut self, size: u32) -> Self {
        self.fragment_size = Some(size);
        self
    }

    /// Set the number of fragments.
    pub fn with_number_of_fragments(mut self, count: u32) -> Self {
        self.number_of_fragments = Some(count);
        self
    }

    /// Set field-specific pre/post tags.
    pub fn with_tags(mut self, pre: impl Into<String>, post: impl Into<String>) -> Self {
        self.pre_tags = vec![pre.into()];
        self.post_tags = vec![post.into()];
        self
    }

    fn to_json(&self) -> Value {
        let mut options = Map::new();
        if !self.pre_tags.is_empty() {
            options.insert("pre_tags".to_string(), json!(self.pre_tags));
        }
        if !self.post_tags.is_empty() {
            options.insert("post_tags".to_string(), json!(self.post_tags));
        }
        if let Some(size) = self.fragment_size {
            options.insert("fragment_size".to_string(), json!(size));
        }
        if let Some(count) = self.number_of_fragments {
            options.insert("number_of_fragments".to_string(), json!(count));
        }
        Value::Object(options)
    }
}

/// Highlight request: global tags plus ordered per-field options.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HighlightSpec {
    pre_tags: Vec<String>,
    post_tags: Vec<String>,
    fields: Vec<(String, HighlightField)>,
}

impl HighlightSpec {
    /// An empty spec. At least one field must be added before use.
    pub fn new() -> Self {
        Self::default()
    }

    /// Highlight a field with default options.
    pub fn field(self, name: impl Into<String>) -> Self {
        self.field_with(name, HighlightField::default())
    }

    /// Highlight a field with explicit options. Re-adding a field replaces it.
    pub fn field_with(mut self, name: impl Into<String>, options: HighlightField) -> Self {
        let name = name.into();
        match self.fields.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = options,
            None => self.fields.push((name, options)),
        }
        self
    }

    /// Set the global pre/post tags.
    pub fn with_tags(mut self, pre: impl Into<String>, post: impl Into<String>) -> Self {
        self.pre_tags = vec![pre.into()];
        self.post_tags = vec![post.into()];
        self
    }

    /// Fail with `InvalidQuery` when no field is set or a field name is blank.
    pub fn validate(&self) -> Result<()> {
        if self.fields.is_empty() {
            return Err(Error::invalid_query("highlight needs at least one field"));
        }
        if self.fields.iter().any(|(name, _)| name.trim().is_empty()) {
            return Err(Error::invalid_query("highlight field name must not be empty"));
        }
        Ok(())
    }

    /// The engine JSON for `highlight`.
    pub fn to_json(&self) -> Value {
        let mut highlight = Map::new();
        if !self.pre_tags.is_empty() {
            highlight.insert("pre_tags".to_string(), json!(self.pre_tags));
        }
        if !self.post_tags.is_empty() {
            highlight.insert("post_tags".to_string(), json!(self.post_tags));
        }
        let mut fields = Map::new();
        for (name, options) in &self.fields {
            fields.insert(name.clone(), options.to_json());
        }
        highlight.insert("fields".to_string(), Value::Object(fields));
        Value::Object(highlight)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_field_options_are_empty_object() {
        let spec = HighlightSpec::new().field("content");
        assert_eq!(spec.to_json(), json!({"fields": {"content": {}}}));
    }

    #[test]
    fn test_global_and_field_options() {
        let spec = HighlightSpec::new()
            .with_tags("<em>", "</em>")
            .field_with(
                "content",
                HighlightField::new()
                    .with_fragment_size(150)
                    .with_number_of_fragments(3),
            )
            .field("title");

        assert_eq!(
            spec.to_json(),
            json!({
                "pre_tags": ["<em>"],
                "post_tags": ["</em>"],
                "fields": {
                    "content": {"fragment_size": 150, "number_of_fragments": 3},
                    "title": {}
                }
            })
        );
    }

    #[test]
    fn test_validation() {
        assert!(HighlightSpec::new().validate().is_err());
        assert!(HighlightSpec::new().field(" ").validate().is_err());
        assert!(HighlightSpec::new().field("title").validate().is_ok());
    }
}
