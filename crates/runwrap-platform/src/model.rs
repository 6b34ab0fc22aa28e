//! Platform wire and domain types.

use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Address and credential used for one conversation with the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformTarget {
    /// Base address, without a trailing slash.
    pub addr: String,
    /// Value sent in the `Authorization` header.
    pub auth: String,
}

impl PlatformTarget {
    /// Build a target, trimming any trailing slash from the address.
    #[must_use]
    pub fn new(addr: impl Into<String>, auth: impl Into<String>) -> Self {
        let addr = addr.into();
        Self {
            addr: addr.trim_end_matches('/').to_string(),
            auth: auth.into(),
        }
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.addr, path.trim_start_matches('/'))
    }
}

/// Lifecycle state of an asynchronous ingest job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    /// Accepted, not yet started.
    Submitted,
    /// In progress.
    Running,
    /// Waiting on platform resources.
    Pending,
    /// Completed; a content identifier is available.
    Success,
    /// Terminal failure reported by the platform.
    Error,
    /// Terminal failure reported by the platform.
    Fail,
    /// Any other status string.
    Other(String),
}

impl JobState {
    /// Map the wire status string to a state. Matching is exact.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "Submitted" => Self::Submitted,
            "Running" => Self::Running,
            "Pending" => Self::Pending,
            "Success" => Self::Success,
            "Error" => Self::Error,
            "Fail" => Self::Fail,
            other => Self::Other(other.to_string()),
        }
    }

    /// Whether the platform is still working on the job.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Submitted | Self::Running | Self::Pending)
    }

    /// Wire form of the state.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Submitted => "Submitted",
            Self::Running => "Running",
            Self::Pending => "Pending",
            Self::Success => "Success",
            Self::Error => "Error",
            Self::Fail => "Fail",
            Self::Other(other) => other,
        }
    }
}

impl Display for JobState {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// One observation of an ingest job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobStatusReport {
    /// Reported state.
    pub status: JobState,
    /// Free-form message accompanying the status.
    pub message: String,
    /// Content identifier, present once the job succeeded.
    pub data_id: Option<String>,
}

impl JobStatusReport {
    /// Convenience constructor used by tests and doubles.
    #[must_use]
    pub fn new(status: &str, message: &str, data_id: Option<&str>) -> Self {
        Self {
            status: JobState::parse(status),
            message: message.to_string(),
            data_id: data_id.map(str::to_string),
        }
    }
}

/// Category of a published output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IngestKind {
    /// GeoTIFF and other rasters.
    Raster,
    /// Plain text, embedded in the ingest request.
    Text,
    /// GeoJSON vector data.
    GeoJson,
}

impl IngestKind {
    /// Platform data type name.
    #[must_use]
    pub const fn data_type(self) -> &'static str {
        match self {
            Self::Raster => "raster",
            Self::Text => "text",
            Self::GeoJson => "geojson",
        }
    }

    /// MIME type sent with the content.
    #[must_use]
    pub const fn mime_type(self) -> &'static str {
        match self {
            Self::Raster => "image/tiff",
            Self::Text => "application/text",
            Self::GeoJson => "application/vnd.geo+json",
        }
    }

    /// Whether content travels as a multipart file part rather than inline.
    #[must_use]
    pub const fn uploads_file(self) -> bool {
        !matches!(self, Self::Text)
    }
}

/// Descriptive metadata attached to an ingested item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestMetadata {
    /// Logical name, normally the output filename.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Classification marking.
    pub class_type: ClassType,
    /// Version of the producing tool.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub version: String,
    /// Free-form attributes.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

/// Classification marking wrapper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassType {
    /// Classification level.
    pub classification: String,
}

impl Default for ClassType {
    fn default() -> Self {
        Self {
            classification: "UNCLASSIFIED".to_string(),
        }
    }
}

/// Everything needed to submit one ingest job.
#[derive(Debug, Clone)]
pub struct IngestSubmission {
    /// Category of the content.
    pub kind: IngestKind,
    /// Metadata describing the item.
    pub metadata: IngestMetadata,
    /// File uploaded as the `file` part.
    pub file: Option<PathBuf>,
    /// Content embedded in the request body.
    pub content: Option<String>,
}

impl IngestSubmission {
    /// JSON document sent as the `body` field.
    #[must_use]
    pub fn body(&self) -> serde_json::Value {
        let mut data_type = serde_json::json!({
            "type": self.kind.data_type(),
            "mimeType": self.kind.mime_type(),
        });
        if let Some(content) = &self.content {
            data_type["content"] = serde_json::Value::String(content.clone());
        }
        serde_json::json!({
            "type": "ingest",
            "host": true,
            "data": {
                "dataType": data_type,
                "metadata": self.metadata,
            }
        })
    }
}

/// Resource metadata carried by a service registration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResourceMetadata {
    /// Service name used for lookups.
    pub name: String,
    /// Service description.
    pub description: String,
    /// Classification marking.
    pub class_type: ClassType,
    /// Tool version.
    pub version: String,
    /// Searchable attributes.
    pub metadata: BTreeMap<String, String>,
}

/// Service registration document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceDescriptor {
    /// Identifier assigned by the catalog.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub service_id: String,
    /// Execution endpoint.
    pub url: String,
    /// Documentation endpoint.
    pub contract_url: String,
    /// HTTP method used to invoke the service.
    pub method: String,
    /// Descriptive metadata.
    pub resource_metadata: ResourceMetadata,
    /// Timeout in seconds applied by the catalog; zero means none.
    pub timeout: i64,
    /// Whether work arrives through the task queue instead of direct calls.
    pub is_task_managed: bool,
}

/// A unit of work claimed from the task queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskAssignment {
    /// Job identifier to report against.
    pub job_id: String,
    /// Raw execution request document.
    pub content: String,
}

/// Final state reported for a claimed task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    /// The request ran and its result was ingested.
    Success,
    /// The request could not be run or its result could not be stored.
    Fail,
}

impl TaskOutcome {
    /// Wire form of the outcome.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::Fail => "Fail",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_state_parse_is_exact_and_preserves_unknowns() {
        assert_eq!(JobState::parse("Running"), JobState::Running);
        assert_eq!(JobState::parse("Fail"), JobState::Fail);
        assert_eq!(
            JobState::parse("running"),
            JobState::Other("running".to_string())
        );
        assert!(JobState::parse("Pending").is_transient());
        assert!(!JobState::parse("Success").is_transient());
        assert_eq!(JobState::parse("Weird").to_string(), "Weird");
    }

    #[test]
    fn ingest_kinds_map_to_platform_types() {
        assert_eq!(IngestKind::Raster.mime_type(), "image/tiff");
        assert_eq!(IngestKind::GeoJson.data_type(), "geojson");
        assert!(!IngestKind::Text.uploads_file());
        assert!(IngestKind::Raster.uploads_file());
    }

    #[test]
    fn text_submission_embeds_content() {
        let submission = IngestSubmission {
            kind: IngestKind::Text,
            metadata: IngestMetadata {
                name: "out.txt".to_string(),
                ..IngestMetadata::default()
            },
            file: None,
            content: Some("hello".to_string()),
        };
        let body = submission.body();
        assert_eq!(body["type"], "ingest");
        assert_eq!(body["data"]["dataType"]["type"], "text");
        assert_eq!(body["data"]["dataType"]["content"], "hello");
        assert_eq!(body["data"]["metadata"]["name"], "out.txt");
        assert_eq!(
            body["data"]["metadata"]["classType"]["classification"],
            "UNCLASSIFIED"
        );
    }

    #[test]
    fn target_endpoint_joins_without_double_slash() {
        let target = PlatformTarget::new("https://pz.example/", "Basic x");
        assert_eq!(target.endpoint("/job/1"), "https://pz.example/job/1");
        assert_eq!(target.endpoint("file/2"), "https://pz.example/file/2");
    }

    #[test]
    fn service_descriptor_uses_camel_case() -> Result<(), serde_json::Error> {
        let descriptor = ServiceDescriptor {
            url: "https://svc/execute".to_string(),
            method: "POST".to_string(),
            is_task_managed: true,
            ..ServiceDescriptor::default()
        };
        let value = serde_json::to_value(&descriptor)?;
        assert_eq!(value["isTaskManaged"], true);
        assert_eq!(value["resourceMetadata"]["classType"]["classification"], "UNCLASSIFIED");
        assert!(value.get("serviceId").is_none());
        Ok(())
    }
}
