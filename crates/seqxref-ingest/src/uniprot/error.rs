//! UniProt provider errors

use seqxref_common::XrefError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, UniProtError>;

#[derive(Debug, Error)]
pub enum UniProtError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("XML attribute error: {0}")]
    XmlAttribute(#[from] quick_xml::events::attributes::AttrError),

    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    #[error("Malformed response from {service} service: {message}")]
    MalformedResponse { service: String, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid pattern: {0}")]
    Regex(#[from] regex::Error),

    #[error("Mapping job {job_id} ended with status {status}")]
    JobFailed { job_id: String, status: String },

    #[error("Mapping job {job_id} did not finish within {timeout_secs}s")]
    JobTimeout { job_id: String, timeout_secs: u64 },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] XrefError),
}

impl UniProtError {
    pub fn malformed_document(msg: impl Into<String>) -> Self {
        Self::MalformedDocument(msg.into())
    }

    pub fn malformed_response(service: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::MalformedResponse {
            service: service.into(),
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
