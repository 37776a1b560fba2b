//! Static, read-only catalogue of the findings this scanner can raise.
//! Alerts take their title, description and severity from here so the
//! wording lives in one place.

use crate::core::models::Severity;

/// Finding raised when a security.txt file was served but failed validation.
pub const INVALID_FILE: &str = "invalidFile";

/// Finding raised when neither candidate location served a security.txt file.
pub const NOT_FOUND: &str = "notFound";

/// Human-readable details for one finding.
pub struct FindingDetail {
    /// Machine-readable finding name, also part of the alert identifier.
    pub code: &'static str,
    pub title: &'static str,
    pub severity: Severity,
    /// What the finding means and why it matters.
    pub description: &'static str,
    pub remediation: &'static str,
}

static FINDINGS: &[FindingDetail] = &[
    FindingDetail {
        code: INVALID_FILE,
        title: "Invalid security.txt file",
        severity: Severity::Info,
        description: "A security.txt file is published but it does not match the organization's disclosure policy: a required field is missing or does not carry the expected value.",
        remediation: "Update the security.txt file so that every required field is present and points to the organization's official contact, encryption key, hiring and disclosure policy resources.",
    },
    FindingDetail {
        code: NOT_FOUND,
        title: "security.txt file not found",
        severity: Severity::Info,
        description: "The service publishes no security.txt file at /.well-known/security.txt nor at the legacy /security.txt location. Researchers have no documented channel to report vulnerabilities.",
        remediation: "Publish a security.txt file (RFC 9116) under /.well-known/security.txt with at least the Contact and Expires fields.",
    },
];

/// Looks up the detail for a finding code.
pub fn get_finding_detail(code: &str) -> Option<&'static FindingDetail> {
    FINDINGS.iter().find(|f| f.code == code)
}
