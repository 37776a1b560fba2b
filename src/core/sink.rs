// src/core/sink.rs

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::alert::{AlertFactory, AlertPublisher};
use crate::core::models::{FetchedDocument, Settlement, TargetDescriptor, Verdict};
use crate::store::ResultStore;

/// What gets written to storage for a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistMode {
    /// `valid`, `invalid` or `notFound`.
    #[default]
    StatusToken,
    /// The raw body for valid files, `invalid` otherwise, and `not found` when absent.
    RawText,
}

impl PersistMode {
    /// Value written to storage for `verdict`; `body` is the fetched file, if any.
    pub fn stored_value(&self, verdict: Verdict, body: Option<&str>) -> String {
        match (self, verdict) {
            (PersistMode::RawText, Verdict::Valid) => match body {
                Some(body) => body.to_string(),
                None => verdict.to_string(),
            },
            (PersistMode::RawText, Verdict::NotFound) => "not found".to_string(),
            _ => verdict.to_string(),
        }
    }
}

/// Persists verdicts and raises alerts. The two effects are independent:
/// a failure of one is logged and never keeps the other from running.
pub struct ResultSink {
    store: Arc<dyn ResultStore>,
    publisher: Arc<dyn AlertPublisher>,
    alerts: AlertFactory,
    mode: PersistMode,
    field: String,
}

impl ResultSink {
    pub fn new(
        store: Arc<dyn ResultStore>,
        publisher: Arc<dyn AlertPublisher>,
        alerts: AlertFactory,
        mode: PersistMode,
        field: &str,
    ) -> Self {
        Self { store, publisher, alerts, mode, field: field.to_string() }
    }

    /// Records the outcome of one scan.
    ///
    /// The stored value is written first, then the alert (if the verdict calls
    /// for one) is published. Either effect may fail; the failure is logged
    /// and the other effect still runs.
    ///
    /// # Arguments
    /// * `target` - The scanned service; `(domain, port)` is the storage key.
    /// * `verdict` - The classification to persist.
    /// * `fetched` - The fetched file, present whenever a candidate answered 200.
    ///
    /// # Returns
    /// A `Settlement` telling which side effects succeeded.
    pub async fn settle(
        &self,
        target: &TargetDescriptor,
        verdict: Verdict,
        fetched: Option<&FetchedDocument>,
    ) -> Settlement {
        let value = self.mode.stored_value(verdict, fetched.map(|f| f.body.as_str()));

        let persisted = match self
            .store
            .upsert_http_service_field(target.domain(), target.port(), &self.field, &value)
            .await
        {
            Ok(()) => {
                debug!(domain = target.domain(), port = target.port(), %verdict, "Verdict stored.");
                true
            }
            Err(e) => {
                error!(domain = target.domain(), port = target.port(), error = %e, "Failed to store verdict.");
                false
            }
        };

        let alerted = match self.alerts.build(target, verdict, fetched) {
            None => None,
            Some(alert) => match self.publisher.publish(&alert).await {
                Ok(()) => {
                    info!(finding = %alert.finding, location = %alert.location, "Alert published.");
                    Some(true)
                }
                Err(e) => {
                    error!(finding = %alert.finding, error = %e, "Failed to publish alert.");
                    Some(false)
                }
            },
        };

        Settlement { persisted, alerted }
    }
}
