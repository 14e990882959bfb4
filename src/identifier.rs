//! # Resource Identifiers
//!
//! Every schema, model and instance is addressed by a dot-delimited
//! identifier: `configset.category.name` for the current copy of a resource,
//! or `configset.category.name.version` for a numbered snapshot.
//!
//! ```
//! use layercfg::identifier::{Category, ResourceId};
//!
//! let id = ResourceId::parse("demo.models.base-model").unwrap();
//! assert_eq!(id.category(), Category::Models);
//! assert_eq!(id.with_version(3).to_string(), "demo.models.base-model.3");
//! assert_eq!(id.to_instance().unwrap().to_string(), "demo.instances.base-model");
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The three kinds of documents a config set holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Schemas,
    Models,
    Instances,
}

impl Category {
    /// All categories, in the order they are scanned.
    pub const ALL: [Category; 3] = [Category::Schemas, Category::Models, Category::Instances];

    /// Segment and directory name of this category.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Schemas => "schemas",
            Category::Models => "models",
            Category::Instances => "instances",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "schemas" => Ok(Category::Schemas),
            "models" => Ok(Category::Models),
            "instances" => Ok(Category::Instances),
            other => Err(Error::InvalidIdentifier {
                id: other.to_string(),
                message: "category must be one of schemas, models, instances".to_string(),
            }),
        }
    }
}

/// A parsed resource identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId {
    config_set: String,
    category: Category,
    name: String,
    version: Option<u32>,
}

impl ResourceId {
    /// Build an unversioned identifier from its parts.
    pub fn new(config_set: impl Into<String>, category: Category, name: impl Into<String>) -> Self {
        Self {
            config_set: config_set.into(),
            category,
            name: name.into(),
            version: None,
        }
    }

    /// Parse `configset.category.name[.version]`.
    pub fn parse(id: &str) -> Result<Self> {
        let invalid = |message: &str| Error::InvalidIdentifier {
            id: id.to_string(),
            message: message.to_string(),
        };

        let parts: Vec<&str> = id.split('.').collect();
        if !(parts.len() == 3 || parts.len() == 4) {
            return Err(invalid("expected 3 or 4 dot-separated segments"));
        }
        if parts.iter().any(|p| p.is_empty()) {
            return Err(invalid("segments must not be empty"));
        }

        let category = parts[1]
            .parse::<Category>()
            .map_err(|_| invalid("category must be one of schemas, models, instances"))?;

        let version = match parts.get(3) {
            Some(raw) => Some(
                raw.parse::<u32>()
                    .map_err(|_| invalid("version segment must be a number"))?,
            ),
            None => None,
        };

        Ok(Self {
            config_set: parts[0].to_string(),
            category,
            name: parts[2].to_string(),
            version,
        })
    }

    pub fn config_set(&self) -> &str {
        &self.config_set
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> Option<u32> {
        self.version
    }

    /// The same resource without its version segment.
    pub fn unversioned(&self) -> Self {
        Self {
            version: None,
            ..self.clone()
        }
    }

    /// The same resource pinned to `version`.
    pub fn with_version(&self, version: u32) -> Self {
        Self {
            version: Some(version),
            ..self.clone()
        }
    }

    /// The instance derived from this model, or `None` for other categories.
    pub fn to_instance(&self) -> Option<Self> {
        (self.category == Category::Models).then(|| Self {
            category: Category::Instances,
            ..self.clone()
        })
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.config_set, self.category, self.name)?;
        if let Some(version) = self.version {
            write!(f, ".{}", version)?;
        }
        Ok(())
    }
}

impl FromStr for ResourceId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Whether `id` has the 3 or 4 segments every merge participant needs.
pub fn has_mergeable_shape(id: &str) -> bool {
    let segments = id.split('.').count();
    segments == 3 || segments == 4
}

/// Whether a free-form string value should be treated as a reference during
/// ingestion.
///
/// Any string with exactly 3 segments qualifies, so `"1.2.3"` or a host
/// name is reported as unresolved when nothing backs it. A 4-segment string
/// qualifies only with a known category in second position.
pub fn looks_like_reference(value: &str) -> bool {
    let parts: Vec<&str> = value.split('.').collect();
    match parts.len() {
        3 => true,
        4 => parts[1].parse::<Category>().is_ok(),
        _ => false,
    }
}

/// Category named by the second segment of `id`, if any.
pub fn category_of(id: &str) -> Option<Category> {
    id.split('.').nth(1).and_then(|c| c.parse().ok())
}

/// Whether `id` points at a schema.
pub fn is_schema_id(id: &str) -> bool {
    category_of(id) == Some(Category::Schemas)
}

/// Whether `id` points at a model.
pub fn is_model_id(id: &str) -> bool {
    category_of(id) == Some(Category::Models)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_unversioned() {
        let id = ResourceId::parse("demo.schemas.base-schema").unwrap();
        assert_eq!(id.config_set(), "demo");
        assert_eq!(id.category(), Category::Schemas);
        assert_eq!(id.name(), "base-schema");
        assert_eq!(id.version(), None);
    }

    #[test]
    fn test_parse_versioned() {
        let id = ResourceId::parse("demo.models.base-model.12").unwrap();
        assert_eq!(id.version(), Some(12));
        assert_eq!(id.unversioned().to_string(), "demo.models.base-model");
    }

    #[test]
    fn test_parse_rejects_bad_shapes() {
        assert!(ResourceId::parse("demo.models").is_err());
        assert!(ResourceId::parse("a.b.c.d.e").is_err());
        assert!(ResourceId::parse("demo.widgets.x").is_err());
        assert!(ResourceId::parse("demo.models.x.latest").is_err());
        assert!(ResourceId::parse("demo..x").is_err());
    }

    #[test]
    fn test_to_instance_only_for_models() {
        let model = ResourceId::parse("demo.models.m").unwrap();
        assert_eq!(model.to_instance().unwrap().to_string(), "demo.instances.m");

        let schema = ResourceId::parse("demo.schemas.s").unwrap();
        assert!(schema.to_instance().is_none());
    }

    #[test]
    fn test_looks_like_reference() {
        assert!(looks_like_reference("demo.schemas.base"));
        assert!(looks_like_reference("demo.models.base.2"));
        assert!(looks_like_reference("1.2.3"));
        assert!(looks_like_reference("api.example.com"));
        assert!(looks_like_reference("demo.widgets.x"));
        assert!(!looks_like_reference("demo.widgets.x.2"));
        assert!(!looks_like_reference("1.2.3.4"));
        assert!(!looks_like_reference("demo.models"));
        assert!(!looks_like_reference("a.b.c.d.e"));
    }

    #[test]
    fn test_mergeable_shape_counts_segments_only() {
        assert!(has_mergeable_shape("a.b.c"));
        assert!(has_mergeable_shape("a.b.c.d"));
        assert!(!has_mergeable_shape("a.b"));
        assert!(!has_mergeable_shape("a.b.c.d.e"));
    }

    #[test]
    fn test_category_helpers() {
        assert!(is_schema_id("demo.schemas.s"));
        assert!(!is_schema_id("demo.models.m"));
        assert!(is_model_id("demo.models.m"));
        assert_eq!(category_of("x"), None);
    }

    proptest! {
        #[test]
        fn prop_display_round_trips(
            set in "[a-z][a-z0-9-]{0,10}",
            name in "[a-z][a-z0-9_-]{0,10}",
            cat in 0usize..3,
            version in proptest::option::of(1u32..1000),
        ) {
            let mut id = ResourceId::new(set, Category::ALL[cat], name);
            if let Some(v) = version {
                id = id.with_version(v);
            }
            let text = id.to_string();
            prop_assert!(looks_like_reference(&text));
            prop_assert_eq!(ResourceId::parse(&text).unwrap(), id);
        }
    }
}
