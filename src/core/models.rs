// src/core/models.rs

use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum::{Display, EnumString};

use crate::error::TargetError;

// --- Target Models ---

/// Scheme used to reach the scanned service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Protocol {
    Http,
    Https,
}

/// Identifies one scan subject. Built once from an inbound request and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTarget")]
pub struct TargetDescriptor {
    protocol: Protocol,
    domain: String,
    port: String,
}

impl TargetDescriptor {
    pub fn new(protocol: Protocol, domain: &str, port: &str) -> Result<Self, TargetError> {
        let domain = domain.trim();
        let port = port.trim();
        if domain.is_empty() {
            return Err(TargetError::EmptyDomain);
        }
        if port.is_empty() {
            return Err(TargetError::EmptyPort);
        }
        Ok(Self {
            protocol,
            domain: domain.to_string(),
            port: port.to_string(),
        })
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    /// Base URL of the service, e.g. `https://a.example:443`.
    pub fn to_url(&self) -> String {
        format!("{}://{}:{}", self.protocol, self.domain, self.port)
    }
}

// Wire shape of an inbound scan request. Ports show up both as JSON strings and numbers.
#[derive(Deserialize)]
struct RawTarget {
    protocol: String,
    domain: String,
    #[serde(deserialize_with = "port_as_string")]
    port: String,
}

impl TryFrom<RawTarget> for TargetDescriptor {
    type Error = TargetError;

    fn try_from(raw: RawTarget) -> Result<Self, Self::Error> {
        let protocol = raw
            .protocol
            .trim()
            .parse::<Protocol>()
            .map_err(|_| TargetError::UnsupportedProtocol(raw.protocol.clone()))?;
        TargetDescriptor::new(protocol, &raw.domain, &raw.port)
    }
}

fn port_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Text(String),
        Number(u64),
    }

    Ok(match Port::deserialize(deserializer)? {
        Port::Text(s) => s,
        Port::Number(n) => n.to_string(),
    })
}

// --- Document Models ---

/// Ordered field-name to field-value mapping parsed from a security.txt body.
///
/// Names are case-sensitive. Re-inserting an existing name replaces its value
/// in place, so the entry keeps the position of its first occurrence. The
/// source URL is carried next to the fields and is never one of them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedDocument {
    fields: Vec<(String, String)>,
    location: Option<String>,
}

impl ParsedDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_location(mut self, location: &str) -> Self {
        self.location = Some(location.to_string());
        self
    }

    pub fn insert(&mut self, name: &str, value: &str) {
        match self.fields.iter_mut().find(|(existing, _)| existing == name) {
            Some((_, current)) => *current = value.to_string(),
            None => self.fields.push((name.to_string(), value.to_string())),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn contains_field(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

// Serialized as a plain JSON object in file order; `location` is reported separately.
impl Serialize for ParsedDocument {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

// --- Probe Outcomes ---

/// Result of a single GET against one candidate URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The server answered 200 and the body was read.
    Success { url: String, body: String },
    /// The server answered with anything other than 200.
    Status { url: String, status: u16 },
    /// The request never produced a usable response (bad URL, reset, timeout, body read).
    Failed { url: String, reason: String },
}

/// What the probe resolver hands back to the workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Found { source: String, body: String },
    NotFound,
}

// --- Verdicts ---

/// Final classification of one scan attempt. The display form is the status token persisted in storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum Verdict {
    Valid,
    Invalid,
    NotFound,
}

impl Verdict {
    /// Finding raised for this verdict, if any.
    pub fn finding_code(&self) -> Option<&'static str> {
        match self {
            Verdict::Valid => None,
            Verdict::Invalid => Some(crate::core::knowledge_base::INVALID_FILE),
            Verdict::NotFound => Some(crate::core::knowledge_base::NOT_FOUND),
        }
    }
}

// Severity of a finding. Every security.txt finding is informational.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
}

impl Severity {
    /// Integer rank carried by alerts; higher is more severe.
    pub fn rank(&self) -> u8 {
        match self {
            Severity::Info => 1,
        }
    }
}

/// A policy mismatch found while validating a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Violation {
    MissingField { field: String },
    UnexpectedValue { field: String, expected: String },
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Violation::MissingField { field } => write!(f, "field '{}' is missing", field),
            Violation::UnexpectedValue { field, expected } => {
                write!(f, "field '{}' does not contain '{}'", field, expected)
            }
        }
    }
}

/// Everything known about a body fetched with a 200 response.
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    pub source: String,
    pub body: String,
    pub document: ParsedDocument,
    pub violations: Vec<Violation>,
}

/// Which side effects of a settlement succeeded. `alerted` is `None` when no alert was due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settlement {
    pub persisted: bool,
    pub alerted: Option<bool>,
}

// --- Main Report ---

/// Outcome of one scan request, returned to the caller for logging and tests.
#[derive(Debug, Clone)]
pub struct ScanReport {
    pub target: TargetDescriptor,
    pub verdict: Verdict,
    pub source: Option<String>,
    pub settlement: Settlement,
}
