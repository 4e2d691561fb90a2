//! Record mapping at the backend boundaries
//!
//! Pure, stateless translation between the backend-neutral records in
//! [`crate::model`] and each backend's native shape: SQLite rows with
//! epoch-millisecond integer columns on the local side, camelCase JSON
//! with ISO-8601 timestamps on the wire. Timestamps are normalized to
//! epoch milliseconds in memory regardless of source representation.

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{DEFAULT_NAMESPACE_ID, InputParameter, Namespace, Snippet};

// ============================================================================
// Local rows
// ============================================================================

/// A snippet as stored in the local SQLite schema
///
/// `tags` and `input_parameters` are JSON text columns; booleans are
/// integer columns; timestamps are epoch-millisecond integers.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SnippetRow {
    pub id: String,
    pub title: String,
    pub description: String,
    pub code: String,
    pub language: String,
    pub category: String,
    pub namespace_id: String,
    pub tags: String,
    pub has_preview: i64,
    pub function_name: Option<String>,
    pub input_parameters: Option<String>,
    pub is_template: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A namespace as stored in the local SQLite schema
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct NamespaceRow {
    pub id: String,
    pub name: String,
    pub created_at: i64,
    pub is_default: i64,
}

/// Decode a local row into a neutral snippet record
pub fn snippet_from_row(row: SnippetRow) -> Result<Snippet> {
    let tags: Vec<String> = serde_json::from_str(&row.tags)
        .map_err(|e| Error::InvalidRecord(format!("snippet '{}': bad tags column: {e}", row.id)))?;
    let input_parameters: Vec<InputParameter> = match row.input_parameters.as_deref() {
        Some(text) => serde_json::from_str(text).map_err(|e| {
            Error::InvalidRecord(format!("snippet '{}': bad input_parameters column: {e}", row.id))
        })?,
        None => Vec::new(),
    };

    Ok(Snippet {
        id: row.id,
        title: row.title,
        description: row.description,
        code: row.code,
        language: row.language,
        category: row.category,
        tags,
        has_preview: row.has_preview != 0,
        function_name: row.function_name,
        input_parameters,
        namespace_id: row.namespace_id,
        is_template: row.is_template != 0,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

/// Encode a neutral snippet record as a local row
pub fn snippet_to_row(snippet: &Snippet) -> Result<SnippetRow> {
    let input_parameters = if snippet.input_parameters.is_empty() {
        None
    } else {
        Some(serde_json::to_string(&snippet.input_parameters)?)
    };

    Ok(SnippetRow {
        id: snippet.id.clone(),
        title: snippet.title.clone(),
        description: snippet.description.clone(),
        code: snippet.code.clone(),
        language: snippet.language.clone(),
        category: snippet.category.clone(),
        namespace_id: snippet.namespace_id.clone(),
        tags: serde_json::to_string(&snippet.tags)?,
        has_preview: i64::from(snippet.has_preview),
        function_name: snippet.function_name.clone(),
        input_parameters,
        is_template: i64::from(snippet.is_template),
        created_at: snippet.created_at,
        updated_at: snippet.updated_at,
    })
}

/// Decode a local row into a neutral namespace record
pub fn namespace_from_row(row: NamespaceRow) -> Namespace {
    Namespace {
        id: row.id,
        name: row.name,
        created_at: row.created_at,
        is_default: row.is_default != 0,
    }
}

// ============================================================================
// Wire shapes
// ============================================================================

/// A timestamp as it appears on the wire
///
/// Serialized as ISO-8601 text; deserialization also accepts a bare
/// epoch-millisecond integer, which the storage service stores and
/// echoes back on reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireInstant {
    Millis(i64),
    Iso(String),
}

impl WireInstant {
    /// Normalize to epoch milliseconds
    pub fn to_millis(&self) -> Result<i64> {
        match self {
            Self::Millis(ms) => Ok(*ms),
            Self::Iso(text) => DateTime::parse_from_rfc3339(text)
                .map(|dt| dt.timestamp_millis())
                .map_err(|e| Error::InvalidRecord(format!("bad timestamp '{text}': {e}"))),
        }
    }

    /// ISO-8601 text at millisecond precision, UTC
    pub fn from_millis(ms: i64) -> Result<Self> {
        let dt = Utc
            .timestamp_millis_opt(ms)
            .single()
            .ok_or_else(|| Error::InvalidRecord(format!("timestamp {ms} out of range")))?;
        Ok(Self::Iso(dt.to_rfc3339_opts(SecondsFormat::Millis, true)))
    }
}

fn default_category() -> String {
    "general".to_string()
}

/// A snippet as it crosses the REST boundary
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnippetJson {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub code: String,
    pub language: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub has_preview: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,
    #[serde(default)]
    pub input_parameters: Option<Vec<InputParameter>>,
    #[serde(default)]
    pub namespace_id: Option<String>,
    #[serde(default)]
    pub is_template: bool,
    pub created_at: WireInstant,
    pub updated_at: WireInstant,
}

/// A namespace as it crosses the REST boundary
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceJson {
    pub id: String,
    pub name: String,
    pub created_at: WireInstant,
    #[serde(default)]
    pub is_default: bool,
}

/// Decode a wire record into a neutral snippet record
///
/// A record with no namespace falls back to the default namespace.
pub fn snippet_from_json(json: SnippetJson) -> Result<Snippet> {
    Ok(Snippet {
        created_at: json.created_at.to_millis()?,
        updated_at: json.updated_at.to_millis()?,
        id: json.id,
        title: json.title,
        description: json.description,
        code: json.code,
        language: json.language,
        category: json.category,
        tags: json.tags,
        has_preview: json.has_preview,
        function_name: json.function_name,
        input_parameters: json.input_parameters.unwrap_or_default(),
        namespace_id: json.namespace_id.unwrap_or_else(|| DEFAULT_NAMESPACE_ID.to_string()),
        is_template: json.is_template,
    })
}

/// Encode a neutral snippet record for the wire (ISO-8601 timestamps out)
pub fn snippet_to_json(snippet: &Snippet) -> Result<SnippetJson> {
    Ok(SnippetJson {
        id: snippet.id.clone(),
        title: snippet.title.clone(),
        description: snippet.description.clone(),
        code: snippet.code.clone(),
        language: snippet.language.clone(),
        category: snippet.category.clone(),
        tags: snippet.tags.clone(),
        has_preview: snippet.has_preview,
        function_name: snippet.function_name.clone(),
        input_parameters: if snippet.input_parameters.is_empty() {
            None
        } else {
            Some(snippet.input_parameters.clone())
        },
        namespace_id: Some(snippet.namespace_id.clone()),
        is_template: snippet.is_template,
        created_at: WireInstant::from_millis(snippet.created_at)?,
        updated_at: WireInstant::from_millis(snippet.updated_at)?,
    })
}

/// Decode a wire record into a neutral namespace record
pub fn namespace_from_json(json: NamespaceJson) -> Result<Namespace> {
    Ok(Namespace {
        created_at: json.created_at.to_millis()?,
        id: json.id,
        name: json.name,
        is_default: json.is_default,
    })
}

/// Encode a neutral namespace record for the wire
pub fn namespace_to_json(namespace: &Namespace) -> Result<NamespaceJson> {
    Ok(NamespaceJson {
        id: namespace.id.clone(),
        name: namespace.name.clone(),
        created_at: WireInstant::from_millis(namespace.created_at)?,
        is_default: namespace.is_default,
    })
}
