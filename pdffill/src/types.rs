use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::collections::BTreeMap;

use crate::error::{FillError, Result};

/// Template used when nothing else is configured.
pub const DEFAULT_TEMPLATE_ID: &str = "7VCXZAolDIPToVLh3O3O";

/// Identifier of a PDF template hosted by the fill service.
///
/// Never empty. Whether the service actually knows the template can only be
/// found out by calling it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TemplateId(String);

impl TemplateId {
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(FillError::InvalidRequest("template id must not be empty".to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TemplateId {
    type Error = FillError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<TemplateId> for String {
    fn from(id: TemplateId) -> Self {
        id.0
    }
}

impl std::fmt::Display for TemplateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Body of a fill call: document options plus the values for each template field.
///
/// Serialized in the service's camelCase shape. Snake-case aliases let the
/// same struct be read from YAML config and `PDFFILL_PAYLOAD__*` variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FillPayload {
    /// Document title embedded in the PDF metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Font size used for filled-in text. Integers are sent as integers,
    /// fractional sizes such as 10.5 as given.
    #[serde(default, alias = "font_size", skip_serializing_if = "Option::is_none")]
    pub font_size: Option<Number>,
    /// Text colour as a hex string, e.g. "#CC0000"
    #[serde(default, alias = "text_color", skip_serializing_if = "Option::is_none")]
    pub text_color: Option<String>,
    /// Field id to value. Strings are the common case; nested objects
    /// (names, addresses), booleans, numbers and nulls are sent as-is.
    #[serde(default)]
    pub data: BTreeMap<String, Value>,
}

impl FillPayload {
    /// Set a single field to a string value, replacing any previous value.
    pub fn set_field(&mut self, field_id: impl Into<String>, value: impl Into<String>) {
        self.data.insert(field_id.into(), Value::String(value.into()));
    }
}

impl Default for FillPayload {
    fn default() -> Self {
        let mut data = BTreeMap::new();
        data.insert("someFieldId".to_string(), Value::String("Hello World!".to_string()));
        Self {
            title: Some("My PDF Title".to_string()),
            font_size: Some(10.into()),
            text_color: Some("#CC0000".to_string()),
            data,
        }
    }
}

/// A complete fill request: which template, filled with what.
#[derive(Debug, Clone, PartialEq)]
pub struct FillRequest {
    pub template_id: TemplateId,
    pub payload: FillPayload,
}

impl FillRequest {
    pub fn new(template_id: TemplateId, payload: FillPayload) -> Self {
        Self { template_id, payload }
    }
}

/// What the service sent back.
///
/// `data` holds the rendered PDF only when `status` is a success; otherwise
/// it is whatever error body the service chose to return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FillResult {
    pub status: u16,
    pub data: Bytes,
}

impl FillResult {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
