// src/worker.rs

//! Entry point for inbound scan requests.

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::alert::AlertPublisher;
use crate::config::ScannerContext;
use crate::core::models::{ScanReport, TargetDescriptor};
use crate::core::scanner::SecurityTxtScanner;
use crate::store::ResultStore;

/// Decodes inbound messages and runs one scan per message.
///
/// Nothing escapes `handle_message`: undecodable messages are logged and
/// dropped, redelivery is left to the queue transport.
pub struct Worker {
    scanner: SecurityTxtScanner,
}

impl Worker {
    pub fn new(
        context: &ScannerContext,
        store: Arc<dyn ResultStore>,
        publisher: Arc<dyn AlertPublisher>,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self { scanner: SecurityTxtScanner::new(context, store, publisher)? })
    }

    /// Handles one serialized `TargetDescriptor`. Returns `None` when the message was dropped.
    pub async fn handle_message(&self, message: &str) -> Option<ScanReport> {
        let target: TargetDescriptor = match serde_json::from_str(message) {
            Ok(target) => target,
            Err(e) => {
                error!(error = %e, message, "Dropping undecodable scan request.");
                return None;
            }
        };
        Some(self.handle(&target).await)
    }

    /// Handles one raw message. Bytes that are not UTF-8 are logged and dropped
    /// like any other undecodable message.
    pub async fn handle_bytes(&self, message: &[u8]) -> Option<ScanReport> {
        match std::str::from_utf8(message) {
            Ok(text) => self.handle_message(text).await,
            Err(e) => {
                error!(error = %e, bytes = message.len(), "Dropping scan request that is not UTF-8.");
                None
            }
        }
    }

    /// Runs one scan task per newline-delimited message read from `reader`.
    ///
    /// # Arguments
    /// * `reader` - Source of messages, one serialized `TargetDescriptor` per line.
    ///
    /// # Returns
    /// The number of messages dispatched. Returns once the input ends or fails
    /// to read, and always after every dispatched scan has finished.
    pub async fn serve<R>(self: Arc<Self>, mut reader: R) -> usize
    where
        R: AsyncBufRead + Unpin,
    {
        let mut tasks = JoinSet::new();
        let mut dispatched = 0;
        let mut buf = Vec::new();

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) => {
                    error!(error = %e, "Failed to read scan requests, no more will be accepted.");
                    break;
                }
            }
            let message = trim_line_end(&buf);
            if message.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            let worker = Arc::clone(&self);
            let message = message.to_vec();
            tasks.spawn(async move {
                worker.handle_bytes(&message).await;
            });
            dispatched += 1;
            // Reap finished scans so the set does not grow with the input.
            while let Some(done) = tasks.try_join_next() {
                log_task_result(done);
            }
        }

        while let Some(done) = tasks.join_next().await {
            log_task_result(done);
        }
        dispatched
    }

    pub async fn handle(&self, target: &TargetDescriptor) -> ScanReport {
        let report = self.scanner.scan(target).await;
        info!(
            url = %target.to_url(),
            verdict = %report.verdict,
            persisted = report.settlement.persisted,
            alerted = ?report.settlement.alerted,
            "Scan request handled."
        );
        report
    }
}

fn trim_line_end(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

fn log_task_result(result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        error!(error = %e, "Scan task aborted.");
    }
}
