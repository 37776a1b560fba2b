// src/alert.rs

//! Alert records and the publishers that carry them to the messaging side.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{Mutex, broadcast};

use crate::core::knowledge_base::get_finding_detail;
use crate::core::models::{FetchedDocument, ParsedDocument, Severity, TargetDescriptor, Verdict};
use crate::error::PublishError;

/// One finding about one scanned service.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    /// Stable hash of (scanner name, domain, finding name).
    pub identifier: String,
    pub severity: u8,
    pub title: String,
    pub description: String,
    /// Steps that resolve the finding.
    pub remediation: String,
    pub finding: String,
    /// URL the evidence was taken from.
    pub location: String,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence: Option<ParsedDocument>,
    pub created_at: DateTime<Utc>,
}

/// Lowercase hex SHA-256 of `scanner|domain|finding`.
pub fn alert_identifier(scanner: &str, domain: &str, finding: &str) -> String {
    let digest = Sha256::digest(format!("{}|{}|{}", scanner, domain, finding).as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Builds alerts for a given scanner name and source tag.
#[derive(Debug, Clone)]
pub struct AlertFactory {
    scanner: String,
    source: String,
}

impl AlertFactory {
    pub fn new(scanner: &str, source: &str) -> Self {
        Self { scanner: scanner.to_string(), source: source.to_string() }
    }

    /// The alert due for a verdict, or `None` for `Valid`.
    pub fn build(&self, target: &TargetDescriptor, verdict: Verdict, fetched: Option<&FetchedDocument>) -> Option<Alert> {
        let code = verdict.finding_code()?;
        let (title, severity, base_description, remediation) = match get_finding_detail(code) {
            Some(detail) => (detail.title, detail.severity, detail.description, detail.remediation),
            None => (code, Severity::Info, "", ""),
        };

        let (location, evidence, description) = match (verdict, fetched) {
            (Verdict::Invalid, Some(fetched)) => {
                let mismatches = fetched
                    .violations
                    .iter()
                    .map(|v| v.to_string())
                    .collect::<Vec<_>>()
                    .join("; ");
                let description = if mismatches.is_empty() {
                    base_description.to_string()
                } else {
                    format!("{} Mismatches: {}.", base_description, mismatches)
                };
                (fetched.source.clone(), Some(fetched.document.clone()), description)
            }
            _ => (target.to_url(), None, base_description.to_string()),
        };

        Some(Alert {
            identifier: alert_identifier(&self.scanner, target.domain(), code),
            severity: severity.rank(),
            title: format!("{} on {}", title, target.to_url()),
            description,
            remediation: remediation.to_string(),
            finding: code.to_string(),
            location,
            source: self.source.clone(),
            evidence,
            created_at: Utc::now(),
        })
    }
}

/// Fire-and-forget outbound alert channel.
#[async_trait]
pub trait AlertPublisher: Send + Sync {
    async fn publish(&self, alert: &Alert) -> Result<(), PublishError>;
}

/// Publishes onto an in-process broadcast channel.
pub struct BroadcastPublisher {
    tx: broadcast::Sender<Alert>,
}

impl BroadcastPublisher {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Alert> {
        self.tx.subscribe()
    }
}

#[async_trait]
impl AlertPublisher for BroadcastPublisher {
    async fn publish(&self, alert: &Alert) -> Result<(), PublishError> {
        self.tx
            .send(alert.clone())
            .map(|_| ())
            .map_err(|_| PublishError::NoSubscribers)
    }
}

/// Writes each alert as one JSON line. Used by the binary with stdout.
pub struct JsonLinesPublisher<W> {
    writer: Mutex<W>,
}

impl<W> JsonLinesPublisher<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(writer: W) -> Self {
        Self { writer: Mutex::new(writer) }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

#[async_trait]
impl<W> AlertPublisher for JsonLinesPublisher<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn publish(&self, alert: &Alert) -> Result<(), PublishError> {
        let mut line = serde_json::to_vec(alert)?;
        line.push(b'\n');
        // One lock per line keeps concurrent scans from interleaving output.
        let mut writer = self.writer.lock().await;
        writer.write_all(&line).await?;
        writer.flush().await?;
        Ok(())
    }
}
