//! The certificate-line collaborator.
//!
//! `cert:` lines carry an already-structured JSON payload; no ASN.1 is
//! parsed here. The record's stable serialization doubles as the v1
//! artifact value, and its blake3 digest is the content-addressed dedup
//! key.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CertParseError {
    #[error("certificate payload is empty")]
    Empty,
    #[error("certificate payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// One observed certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertRecord {
    #[serde(default)]
    pub common_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dns_names: Vec<String>,
    #[serde(default)]
    pub issuer: String,
    #[serde(default)]
    pub not_before: String,
    #[serde(default)]
    pub not_after: String,
    #[serde(default)]
    pub serial_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Parse the payload of a `cert:` line.
pub fn parse_certificate_line(payload: &str) -> Result<CertRecord, CertParseError> {
    let payload = payload.trim();
    if payload.is_empty() {
        return Err(CertParseError::Empty);
    }
    Ok(serde_json::from_str(payload)?)
}

impl CertRecord {
    /// Every name on the certificate: common name first, then SANs, with
    /// duplicates removed but order preserved.
    #[must_use]
    pub fn all_names(&self) -> Vec<String> {
        let mut names = Vec::with_capacity(1 + self.dns_names.len());
        if !self.common_name.is_empty() {
            names.push(self.common_name.clone());
        }
        for name in &self.dns_names {
            if !name.is_empty() && !names.contains(name) {
                names.push(name.clone());
            }
        }
        names
    }

    /// Stable serialization, used as the v1 artifact value.
    pub fn marshal(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Content-addressed key: blake3 of the stable serialization. Falls
    /// back to the lowercased serialization itself if marshalling fails.
    #[must_use]
    pub fn key(&self) -> String {
        match self.marshal() {
            Ok(serialized) => blake3::hash(serialized.as_bytes()).to_hex().to_string(),
            Err(_) => format!("{self:?}").to_lowercase(),
        }
    }
}
