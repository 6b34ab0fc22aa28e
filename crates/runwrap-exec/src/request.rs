//! Execution request document.

use serde::{Deserialize, Serialize};

const MASK: &str = "*****";

/// What a caller asks the service to run, and which files move around it.
///
/// The `*_names` lists run parallel to their id lists and may be shorter;
/// a missing or blank entry means "no preference".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionRequest {
    /// Arguments appended to the configured command prefix.
    #[serde(rename = "cmd", skip_serializing_if = "String::is_empty")]
    pub cmd: String,
    /// Initiating user.
    #[serde(rename = "userID", skip_serializing_if = "String::is_empty")]
    pub user_id: String,
    /// Platform data ids to download.
    #[serde(rename = "inPzFiles", skip_serializing_if = "Vec::is_empty")]
    pub in_pz_files: Vec<String>,
    /// Local names for `in_pz_files`.
    #[serde(rename = "inPzNames", skip_serializing_if = "Vec::is_empty")]
    pub in_pz_names: Vec<String>,
    /// External URLs to download.
    #[serde(rename = "inExtFiles", skip_serializing_if = "Vec::is_empty")]
    pub in_ext_files: Vec<String>,
    /// Local names for `in_ext_files`.
    #[serde(rename = "inExtNames", skip_serializing_if = "Vec::is_empty")]
    pub in_ext_names: Vec<String>,
    /// Raster outputs to publish.
    #[serde(rename = "outTiffs", skip_serializing_if = "Vec::is_empty")]
    pub out_tiffs: Vec<String>,
    /// Text outputs to publish.
    #[serde(rename = "outTxts", skip_serializing_if = "Vec::is_empty")]
    pub out_txts: Vec<String>,
    /// GeoJSON outputs to publish.
    #[serde(rename = "outGeoJson", skip_serializing_if = "Vec::is_empty")]
    pub out_geojson: Vec<String>,
    /// Credential presented to external URLs.
    #[serde(rename = "inExtAuthKey", skip_serializing_if = "String::is_empty")]
    pub ext_auth: String,
    /// Platform credential overriding the service default.
    #[serde(rename = "pzAuthKey", skip_serializing_if = "String::is_empty")]
    pub pz_auth: String,
    /// Platform address overriding the service default.
    #[serde(rename = "pzAddr", skip_serializing_if = "String::is_empty")]
    pub pz_addr: String,
}

impl ExecutionRequest {
    /// Copy with credentials masked, suitable for logs and audit records.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mask = |value: &str| {
            if value.is_empty() {
                String::new()
            } else {
                MASK.to_string()
            }
        };
        Self {
            ext_auth: mask(&self.ext_auth),
            pz_auth: mask(&self.pz_auth),
            ..self.clone()
        }
    }

    /// Whether any output is declared.
    #[must_use]
    pub fn has_outputs(&self) -> bool {
        !(self.out_tiffs.is_empty() && self.out_txts.is_empty() && self.out_geojson.is_empty())
    }

    /// Whether the request touches platform storage.
    #[must_use]
    pub fn needs_platform(&self) -> bool {
        !self.in_pz_files.is_empty() || self.has_outputs()
    }

    /// Preferred local name for the platform input at `index`.
    #[must_use]
    pub fn pz_name(&self, index: usize) -> Option<&str> {
        preferred(&self.in_pz_names, index)
    }

    /// Preferred local name for the external input at `index`.
    #[must_use]
    pub fn ext_name(&self, index: usize) -> Option<&str> {
        preferred(&self.in_ext_names, index)
    }
}

fn preferred(names: &[String], index: usize) -> Option<&str> {
    names
        .get(index)
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
}
