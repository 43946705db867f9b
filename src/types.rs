use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{errors::Result, files::FileSet};

/// Caller payload: field key to JSON value. In JSON mode values carry any
/// JSON shape; in form-data mode they are the text field values.
///
/// `serde_json`'s `preserve_order` feature keeps iteration in insertion
/// order, which the validator relies on for stable error reports.
pub type Params = serde_json::Map<String, Value>;

/// Declared kind of a workflow input slot.
///
/// Closed set: five JSON-family kinds validated against JSON value shapes,
/// and two form-family kinds validated by presence (text) or readability
/// (file). Adding a variant forces every dispatch site to be revisited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParamType {
    #[serde(rename = "form_data_text")]
    FormDataText,
    #[serde(rename = "form_data_file")]
    FormDataFile,
    #[serde(rename = "json_string")]
    JsonString,
    #[serde(rename = "json_number")]
    JsonNumber,
    #[serde(rename = "json_object")]
    JsonObject,
    #[serde(rename = "json_array")]
    JsonArray,
    #[serde(rename = "json_boolean")]
    JsonBoolean,
}

impl ParamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::FormDataText => "form_data_text",
            ParamType::FormDataFile => "form_data_file",
            ParamType::JsonString => "json_string",
            ParamType::JsonNumber => "json_number",
            ParamType::JsonObject => "json_object",
            ParamType::JsonArray => "json_array",
            ParamType::JsonBoolean => "json_boolean",
        }
    }

    /// Human-readable display name.
    pub fn label(&self) -> &'static str {
        match self {
            ParamType::FormDataText => "Form-Data Text",
            ParamType::FormDataFile => "Form-Data File",
            ParamType::JsonString => "JSON String",
            ParamType::JsonNumber => "JSON Number",
            ParamType::JsonObject => "JSON Object",
            ParamType::JsonArray => "JSON Array",
            ParamType::JsonBoolean => "JSON Boolean",
        }
    }

    /// Whether this type is validated against a JSON value shape.
    pub fn is_json_family(&self) -> bool {
        matches!(
            self,
            ParamType::JsonString
                | ParamType::JsonNumber
                | ParamType::JsonObject
                | ParamType::JsonArray
                | ParamType::JsonBoolean
        )
    }

    /// Whether this type is carried as a multipart form field.
    pub fn is_form_family(&self) -> bool {
        matches!(self, ParamType::FormDataText | ParamType::FormDataFile)
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Workflow-level encoding selector: one structured JSON body, or multipart
/// form fields with optional file attachments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InputMode {
    #[serde(rename = "application/json")]
    Json,
    #[serde(rename = "multipart/form-data")]
    FormData,
}

impl InputMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputMode::Json => "application/json",
            InputMode::FormData => "multipart/form-data",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            InputMode::Json => "JSON",
            InputMode::FormData => "Form-Data",
        }
    }

    pub fn is_json(&self) -> bool {
        matches!(self, InputMode::Json)
    }

    pub fn is_form_data(&self) -> bool {
        matches!(self, InputMode::FormData)
    }
}

impl fmt::Display for InputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One declared input slot of a workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkflowParam {
    pub key: String,
    /// Display name; falls back to `key` when the descriptor omits it.
    pub label: String,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    pub required: bool,
    /// Informational only; the validator never substitutes it into a payload.
    pub default_value: Option<String>,
}

impl WorkflowParam {
    /// Parse one param descriptor, unwrapping a JSON:API envelope if present.
    pub fn from_descriptor(value: &Value) -> Result<Self> {
        let attrs = value.get("attributes").unwrap_or(value);
        let raw: ParamAttrs = serde_json::from_value(attrs.clone())?;
        Ok(Self {
            label: raw.label.unwrap_or_else(|| raw.key.clone()),
            key: raw.key,
            param_type: raw.param_type,
            required: raw.required,
            default_value: raw.default_value,
        })
    }

    pub fn to_descriptor(&self) -> Value {
        json!({
            "key": self.key,
            "label": self.label,
            "type": self.param_type,
            "required": self.required,
            "default_value": self.default_value,
        })
    }
}

impl<'de> Deserialize<'de> for WorkflowParam {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        WorkflowParam::from_descriptor(&value).map_err(serde::de::Error::custom)
    }
}

#[derive(Deserialize)]
struct ParamAttrs {
    key: String,
    #[serde(default)]
    label: Option<String>,
    #[serde(rename = "type")]
    param_type: ParamType,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    default_value: Option<String>,
}

/// The full schema for one workflow, as described by the remote API.
///
/// Immutable once constructed; a validate/submit cycle only reads it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowDefinition {
    /// Unique identifier, used as the cache key and URL path segment.
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub input_mode: InputMode,
    pub output_schema: Option<Value>,
    pub is_active: bool,
    pub endpoint: String,
    /// Opaque remote timestamps; never parsed client-side.
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    /// Declared params in declaration order. Keys are expected to be unique;
    /// a duplicate key makes the later declaration win, which is a caller
    /// error on the workflow author's side.
    pub params: Vec<WorkflowParam>,
}

impl WorkflowDefinition {
    /// Parse a workflow descriptor, unwrapping the JSON:API envelope
    /// (`{"type","id","attributes":{...}}`) when present. Params may sit
    /// under `attributes` or at the top level, with or without a `"data"`
    /// wrapper of their own.
    pub fn from_descriptor(value: &Value) -> Result<Self> {
        let attrs_value = value.get("attributes").unwrap_or(value);
        let attrs: DefinitionAttrs = serde_json::from_value(attrs_value.clone())?;

        let params_raw = attrs_value.get("params").or_else(|| value.get("params"));
        let params_data = params_raw.and_then(|v| v.get("data")).or(params_raw);
        let mut params = Vec::new();
        if let Some(Value::Array(items)) = params_data {
            for item in items {
                params.push(WorkflowParam::from_descriptor(item)?);
            }
        }

        let endpoint = attrs
            .endpoint
            .unwrap_or_else(|| format!("/api/v1/custom/{}", attrs.slug));
        Ok(Self {
            slug: attrs.slug,
            name: attrs.name,
            description: attrs.description,
            input_mode: attrs.input_mode,
            output_schema: attrs.output_schema,
            is_active: attrs.is_active.unwrap_or(true),
            endpoint,
            created_at: attrs.created_at,
            updated_at: attrs.updated_at,
            params,
        })
    }

    /// Flat descriptor form; `from_descriptor` reconstructs an equal
    /// definition from it.
    pub fn to_descriptor(&self) -> Value {
        json!({
            "slug": self.slug,
            "name": self.name,
            "description": self.description,
            "input_mode": self.input_mode,
            "output_schema": self.output_schema,
            "is_active": self.is_active,
            "endpoint": self.endpoint,
            "created_at": self.created_at,
            "updated_at": self.updated_at,
            "params": self.params.iter().map(WorkflowParam::to_descriptor).collect::<Vec<_>>(),
        })
    }

    pub fn required_params(&self) -> Vec<&WorkflowParam> {
        self.params.iter().filter(|p| p.required).collect()
    }

    pub fn optional_params(&self) -> Vec<&WorkflowParam> {
        self.params.iter().filter(|p| !p.required).collect()
    }

    /// Validate a payload against this workflow's declared params.
    /// See [`crate::validate::validate`].
    pub fn validate(&self, params: &Params, files: &FileSet) -> Result<()> {
        crate::validate::validate(self, params, files)
    }
}

impl<'de> Deserialize<'de> for WorkflowDefinition {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        WorkflowDefinition::from_descriptor(&value).map_err(serde::de::Error::custom)
    }
}

#[derive(Deserialize)]
struct DefinitionAttrs {
    slug: String,
    name: String,
    #[serde(default)]
    description: Option<String>,
    input_mode: InputMode,
    #[serde(default)]
    output_schema: Option<Value>,
    #[serde(default)]
    is_active: Option<bool>,
    #[serde(default)]
    endpoint: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    updated_at: Option<String>,
}

/// One page of the authenticated user's workflows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkflowListResult {
    pub workflows: Vec<WorkflowDefinition>,
    pub total: Option<u64>,
    pub per_page: Option<u64>,
    pub current_page: Option<u64>,
    pub total_pages: Option<u64>,
}

impl WorkflowListResult {
    /// Parse the paginated list envelope:
    /// `{"data":[...], "meta":{"pagination":{...}}}`.
    pub fn from_response(value: &Value) -> Result<Self> {
        let mut workflows = Vec::new();
        if let Some(Value::Array(items)) = value.get("data") {
            for item in items {
                workflows.push(WorkflowDefinition::from_descriptor(item)?);
            }
        }

        let pagination = value.get("meta").and_then(|m| m.get("pagination"));
        let page_field = |name: &str| -> Option<u64> {
            pagination.and_then(|p| p.get(name)).and_then(Value::as_u64)
        };

        Ok(Self {
            workflows,
            total: page_field("total"),
            per_page: page_field("per_page"),
            current_page: page_field("current_page"),
            total_pages: page_field("total_pages"),
        })
    }

    pub fn count(&self) -> usize {
        self.workflows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workflows.is_empty()
    }
}
