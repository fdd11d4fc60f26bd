use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

pub const DEFAULT_NAMESPACE: &str = "default";

/// Field key to user-entered value for one template form.
pub type TemplateFormData = BTreeMap<String, String>;

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Cluster {
    pub name: String,
    pub label: String,
}

impl Cluster {
    pub fn new(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
        }
    }
}

/// A namespace option. `input_value` is set only for a free-text entry that
/// does not exist on the cluster yet.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Namespace {
    pub name: String,
    pub input_value: Option<String>,
}

impl Namespace {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            input_value: None,
        }
    }

    pub fn free_text(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            name: text.clone(),
            input_value: Some(text),
        }
    }

    pub fn is_free_text(&self) -> bool {
        self.input_value.is_some()
    }
}

impl Display for Namespace {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_free_text() {
            write!(f, "{} (new)", self.name)
        } else {
            f.write_str(&self.name)
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Deserialize)]
pub struct TemplateInput {
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub required: bool,
}

impl TemplateInput {
    pub fn display_label(&self) -> &str {
        self.label
            .as_deref()
            .filter(|label| !label.trim().is_empty())
            .unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Deserialize)]
pub struct Template {
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub inputs: Vec<TemplateInput>,
}

impl Template {
    /// Form seeded with every declared default; inputs without one start empty.
    pub fn initial_form_data(&self) -> TemplateFormData {
        self.inputs
            .iter()
            .map(|input| {
                (
                    input.name.clone(),
                    input.default.clone().unwrap_or_default(),
                )
            })
            .collect()
    }
}

/// Deployed application record as returned by the Service Hub API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub context_name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, deserialize_with = "optional_id_from_string_or_number")]
    pub template_id: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct InstallRequest {
    pub template_id: String,
    pub inputs: TemplateFormData,
    pub context_name: String,
    pub namespace: String,
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InstallResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub application: Option<Application>,
}

impl InstallResponse {
    pub const ERROR_STATUS: &'static str = "error";

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: Self::ERROR_STATUS.to_string(),
            message: Some(message.into()),
            application: None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.status == Self::ERROR_STATUS
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub enum SubmissionStatus {
    #[default]
    Idle,
    Submitting,
    Succeeded,
    Failed,
}

impl SubmissionStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Submitting => "submitting",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct SubmissionState {
    pub status: SubmissionStatus,
    pub error_message: Option<String>,
    pub success_message: Option<String>,
}

impl SubmissionState {
    pub fn clear_messages(&mut self) {
        self.error_message = None;
        self.success_message = None;
    }
}

/// Wire payload shape for list endpoints.
#[derive(Debug, Deserialize)]
pub struct DataEnvelope<T> {
    pub data: Vec<T>,
}

fn id_from_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(value) => Ok(value),
        Value::Number(value) => Ok(value.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number identifier, got {other}"
        ))),
    }
}

fn optional_id_from_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Ok(Some(value)),
        Some(Value::Number(value)) => Ok(Some(value.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected string or number identifier, got {other}"
        ))),
    }
}
