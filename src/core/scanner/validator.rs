// src/core/scanner/validator.rs

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::models::{ParsedDocument, Violation};

/// A pluggable acceptance policy for parsed security.txt documents.
///
/// The workflow only ever talks to this trait; which strategy runs is decided
/// once, from configuration.
pub trait Validator: Send + Sync {
    fn name(&self) -> &'static str;

    /// Every mismatch between the document and the policy, in policy order.
    fn violations(&self, document: &ParsedDocument) -> Vec<Violation>;

    fn validate(&self, document: &ParsedDocument) -> bool {
        self.violations(document).is_empty()
    }
}

/// Accepts any document that carries a `Contact` field.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContactPresence;

impl Validator for ContactPresence {
    fn name(&self) -> &'static str {
        "contact_presence"
    }

    fn violations(&self, document: &ParsedDocument) -> Vec<Violation> {
        if document.contains_field("Contact") {
            Vec::new()
        } else {
            vec![Violation::MissingField { field: "Contact".to_string() }]
        }
    }
}

/// Accepts documents that have every listed field, whatever their values.
#[derive(Debug, Clone)]
pub struct RequiredFields {
    fields: Vec<String>,
}

impl RequiredFields {
    pub fn new(fields: Vec<String>) -> Self {
        Self { fields }
    }
}

impl Validator for RequiredFields {
    fn name(&self) -> &'static str {
        "required_fields"
    }

    fn violations(&self, document: &ParsedDocument) -> Vec<Violation> {
        self.fields
            .iter()
            .filter(|field| !document.contains_field(field))
            .map(|field| Violation::MissingField { field: field.clone() })
            .collect()
    }
}

/// One entry of an organization policy: `field` must exist and its value must contain `contains`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRule {
    pub field: String,
    pub contains: String,
}

impl PolicyRule {
    pub fn new(field: &str, contains: &str) -> Self {
        Self { field: field.to_string(), contains: contains.to_string() }
    }
}

/// Organization-specific policy: all rules must hold.
#[derive(Debug, Clone)]
pub struct OrganizationPolicy {
    rules: Vec<PolicyRule>,
}

impl OrganizationPolicy {
    pub fn new(rules: Vec<PolicyRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[PolicyRule] {
        &self.rules
    }
}

impl Validator for OrganizationPolicy {
    fn name(&self) -> &'static str {
        "organization_policy"
    }

    fn violations(&self, document: &ParsedDocument) -> Vec<Violation> {
        let mut violations = Vec::new();
        for rule in &self.rules {
            match document.get(&rule.field) {
                None => {
                    debug!(field = %rule.field, "Required field missing.");
                    violations.push(Violation::MissingField { field: rule.field.clone() });
                }
                Some(value) if !value.contains(rule.contains.as_str()) => {
                    debug!(field = %rule.field, expected = %rule.contains, "Field value does not match policy.");
                    violations.push(Violation::UnexpectedValue {
                        field: rule.field.clone(),
                        expected: rule.contains.clone(),
                    });
                }
                Some(_) => {}
            }
        }
        violations
    }
}
