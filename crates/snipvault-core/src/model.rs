//! Backend-neutral domain records
//!
//! Snippets and namespaces as the rest of the application sees them,
//! independent of which backend is active. Timestamps are canonical
//! epoch milliseconds in memory; the mapper converts to each backend's
//! native representation at the boundary.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Well-known id of the default namespace, identical on both backends.
pub const DEFAULT_NAMESPACE_ID: &str = "default";

/// Display name of the default namespace.
pub const DEFAULT_NAMESPACE_NAME: &str = "Default";

/// Current instant as epoch milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// A stored unit of source code plus metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snippet {
    pub id: String,
    pub title: String,
    pub description: String,
    pub code: String,
    pub language: String,
    pub category: String,
    pub tags: Vec<String>,
    /// Eligible for live rendering
    pub has_preview: bool,
    /// Symbol to render when `has_preview` is set
    pub function_name: Option<String>,
    pub input_parameters: Vec<InputParameter>,
    /// Every snippet belongs to exactly one namespace
    pub namespace_id: String,
    /// Read-mostly starter snippet, as opposed to a user snippet
    pub is_template: bool,
    /// Epoch milliseconds
    pub created_at: i64,
    /// Epoch milliseconds
    pub updated_at: i64,
}

impl Snippet {
    /// Create a new snippet with a fresh id and current timestamps
    pub fn new(
        title: impl Into<String>,
        code: impl Into<String>,
        language: impl Into<String>,
        namespace_id: impl Into<String>,
    ) -> Self {
        let now = now_millis();
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            description: String::new(),
            code: code.into(),
            language: language.into(),
            category: "general".to_string(),
            tags: Vec::new(),
            has_preview: false,
            function_name: None,
            input_parameters: Vec::new(),
            namespace_id: namespace_id.into(),
            is_template: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Bump the modification timestamp
    pub fn touch(&mut self) {
        self.updated_at = now_millis();
    }
}

/// A declared input of a previewable snippet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputParameter {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ParameterKind,
    /// Literal text, interpreted according to `kind`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Type tag of an input parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterKind {
    String,
    Number,
    Boolean,
    Array,
    Object,
}

/// A named grouping that partitions snippets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Namespace {
    pub id: String,
    pub name: String,
    /// Epoch milliseconds
    pub created_at: i64,
    /// Exactly one namespace has this set after initialization
    pub is_default: bool,
}

impl Namespace {
    /// Create a new non-default namespace with a fresh id
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            created_at: now_millis(),
            is_default: false,
        }
    }

    /// The default namespace record with its fixed well-known id
    pub fn default_namespace() -> Self {
        Self {
            id: DEFAULT_NAMESPACE_ID.to_string(),
            name: DEFAULT_NAMESPACE_NAME.to_string(),
            created_at: now_millis(),
            is_default: true,
        }
    }
}
