// src/core/scanner/mod.rs

pub mod parser;
pub mod probe;
pub mod validator;

use std::sync::Arc;

use tracing::{Instrument, Span, info, info_span};

use crate::alert::{AlertFactory, AlertPublisher};
use crate::config::ScannerContext;
use crate::core::models::{FetchedDocument, ProbeOutcome, ScanReport, TargetDescriptor, Verdict};
use crate::core::sink::ResultSink;
use crate::store::ResultStore;
use self::probe::ProbeResolver;
use self::validator::Validator;

/// The probe, parse, validate, settle workflow for one target at a time.
///
/// Holds no per-request state, so one instance can serve any number of
/// concurrent scans.
pub struct SecurityTxtScanner {
    resolver: ProbeResolver,
    validator: Arc<dyn Validator>,
    sink: ResultSink,
    span: Span,
}

impl SecurityTxtScanner {
    pub fn new(
        context: &ScannerContext,
        store: Arc<dyn ResultStore>,
        publisher: Arc<dyn AlertPublisher>,
    ) -> Result<Self, reqwest::Error> {
        let resolver = ProbeResolver::new(context.request_timeout, &context.user_agent)?;
        Ok(Self::with_resolver(context, resolver, store, publisher))
    }

    pub fn with_resolver(
        context: &ScannerContext,
        resolver: ProbeResolver,
        store: Arc<dyn ResultStore>,
        publisher: Arc<dyn AlertPublisher>,
    ) -> Self {
        let alerts = AlertFactory::new(&context.scanner_name, &context.alert_source);
        let sink = ResultSink::new(store, publisher, alerts, context.persist_mode, &context.field);
        Self {
            resolver,
            validator: context.validator.clone(),
            sink,
            span: context.span.clone(),
        }
    }

    /// Runs every step in order and always yields exactly one verdict.
    pub async fn scan(&self, target: &TargetDescriptor) -> ScanReport {
        let span = info_span!(parent: &self.span, "scan", domain = target.domain(), port = target.port());
        self.run(target).instrument(span).await
    }

    async fn run(&self, target: &TargetDescriptor) -> ScanReport {
        info!(url = %target.to_url(), "Checking security.txt.");

        let fetched = match self.resolver.resolve(target).await {
            ProbeOutcome::Found { source, body } => {
                let document = parser::parse(&body).with_location(&source);
                let violations = self.validator.violations(&document);
                Some(FetchedDocument { source, body, document, violations })
            }
            ProbeOutcome::NotFound => None,
        };

        let verdict = match &fetched {
            None => Verdict::NotFound,
            Some(f) if f.violations.is_empty() => Verdict::Valid,
            Some(_) => Verdict::Invalid,
        };
        info!(%verdict, validator = self.validator.name(), "Scan verdict.");

        let settlement = self.sink.settle(target, verdict, fetched.as_ref()).await;

        ScanReport {
            target: target.clone(),
            verdict,
            source: fetched.map(|f| f.source),
            settlement,
        }
    }
}
