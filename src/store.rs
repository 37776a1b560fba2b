// src/store.rs

//! Persistence of per-service scan results.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;
use url::Url;

use crate::error::StoreError;

/// Key-value storage of HTTP service records, keyed by (domain, port).
///
/// Upserts overwrite: writing the same field twice leaves a single value.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Sets one field on the record of an HTTP service, creating the record if needed.
    ///
    /// # Arguments
    /// * `domain` - Domain of the scanned service.
    /// * `port` - Port of the scanned service.
    /// * `field` - Name of the field to set.
    /// * `value` - Status token or raw file text.
    ///
    /// # Returns
    /// `Ok(())` once the value is stored, or the `StoreError` reported by the backend.
    async fn upsert_http_service_field(
        &self,
        domain: &str,
        port: &str,
        field: &str,
        value: &str,
    ) -> Result<(), StoreError>;
}

/// In-process store, used when no storage endpoint is configured and in tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<(String, String), HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, domain: &str, port: &str, field: &str) -> Option<String> {
        let records = self.records.read().await;
        records
            .get(&(domain.to_string(), port.to_string()))
            .and_then(|fields| fields.get(field).cloned())
    }

    /// Number of distinct (domain, port) records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl ResultStore for MemoryStore {
    async fn upsert_http_service_field(
        &self,
        domain: &str,
        port: &str,
        field: &str,
        value: &str,
    ) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        records
            .entry((domain.to_string(), port.to_string()))
            .or_default()
            .insert(field.to_string(), value.to_string());
        Ok(())
    }
}

/// HTTP datalake client: `PUT {endpoint}/httpservices/{domain}/{port}` with `{"<field>": "<value>"}`.
pub struct DatalakeStore {
    client: reqwest::Client,
    endpoint: Url,
}

impl DatalakeStore {
    /// Creates a client for the datalake API rooted at `endpoint`.
    ///
    /// # Arguments
    /// * `endpoint` - Base URL; record paths are appended to it.
    /// * `timeout` - Upper bound for each upsert request.
    ///
    /// # Returns
    /// The store, or `StoreError::InvalidEndpoint` when `endpoint` cannot carry a path.
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, StoreError> {
        let endpoint = Url::parse(endpoint).map_err(|e| StoreError::InvalidEndpoint(format!("{}: {}", endpoint, e)))?;
        if endpoint.cannot_be_a_base() {
            return Err(StoreError::InvalidEndpoint(endpoint.to_string()));
        }
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint })
    }

    fn record_url(&self, domain: &str, port: &str) -> Result<Url, StoreError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::InvalidEndpoint(self.endpoint.to_string()))?
            .pop_if_empty()
            .extend(["httpservices", domain, port]);
        Ok(url)
    }
}

#[async_trait]
impl ResultStore for DatalakeStore {
    async fn upsert_http_service_field(
        &self,
        domain: &str,
        port: &str,
        field: &str,
        value: &str,
    ) -> Result<(), StoreError> {
        let url = self.record_url(domain, port)?;
        let body = serde_json::json!({ field: value });
        debug!(url = %url, field, "Upserting HTTP service field.");

        let response = self.client.put(url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Rejected {
                domain: domain.to_string(),
                port: port.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}
