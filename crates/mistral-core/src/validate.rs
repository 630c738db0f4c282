//! Client-side request validation
//!
//! Catches malformed requests before a network round trip. Validation is
//! pure: it collects every violation rather than stopping at the first,
//! and absent optional fields are never violations.

use std::ops::RangeInclusive;

use crate::types::{ChatCompletionRequest, EmbeddingRequest, Role, TranscriptionRequest};

const TEMPERATURE_RANGE: RangeInclusive<f64> = 0.0..=2.0;
const TOP_P_RANGE: RangeInclusive<f64> = 0.0..=1.0;
const PENALTY_RANGE: RangeInclusive<f64> = 0.0..=2.0;

/// Result of validating a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    /// No violations
    Valid,
    /// One message per violation, in check order
    Invalid(Vec<String>),
}

impl ValidationResult {
    /// Build a result from collected violations
    pub fn from_violations(violations: Vec<String>) -> Self {
        if violations.is_empty() {
            Self::Valid
        } else {
            Self::Invalid(violations)
        }
    }

    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    /// Violations, empty when valid
    pub fn violations(&self) -> &[String] {
        match self {
            Self::Valid => &[],
            Self::Invalid(violations) => violations,
        }
    }
}

/// Requests that can check their own invariants
pub trait Validate {
    /// Every invariant violation, in check order
    fn violations(&self) -> Vec<String>;
}

/// Validate a request
pub fn validate<R: Validate + ?Sized>(request: &R) -> ValidationResult {
    ValidationResult::from_violations(request.violations())
}

impl Validate for ChatCompletionRequest {
    fn violations(&self) -> Vec<String> {
        let mut violations = Vec::new();

        check_model(&mut violations, &self.model);

        if self.messages.is_empty() {
            violations.push("messages must contain at least one message".to_owned());
        }

        for (i, message) in self.messages.iter().enumerate() {
            match message.role {
                Role::Unknown => violations.push(format!("messages[{i}].role is not a recognized role")),
                Role::Tool if message.tool_call_id.as_deref().is_none_or(|id| id.trim().is_empty()) => {
                    violations.push(format!("messages[{i}].tool_call_id is required for tool messages"));
                }
                Role::System | Role::User | Role::Assistant | Role::Tool => {}
            }
        }

        check_range(&mut violations, "temperature", self.temperature, &TEMPERATURE_RANGE);
        check_range(&mut violations, "top_p", self.top_p, &TOP_P_RANGE);
        check_positive(&mut violations, "max_tokens", self.max_tokens);
        check_range(&mut violations, "presence_penalty", self.presence_penalty, &PENALTY_RANGE);
        check_range(&mut violations, "frequency_penalty", self.frequency_penalty, &PENALTY_RANGE);
        check_positive(&mut violations, "n", self.n);

        violations
    }
}

impl Validate for EmbeddingRequest {
    fn violations(&self) -> Vec<String> {
        let mut violations = Vec::new();

        check_model(&mut violations, &self.model);

        let texts = self.input.texts();
        if texts.is_empty() {
            violations.push("input must contain at least one text".to_owned());
        }
        for (i, text) in texts.iter().enumerate() {
            if text.is_empty() {
                violations.push(format!("input[{i}] must not be empty"));
            }
        }

        check_positive(&mut violations, "output_dimension", self.output_dimension);

        violations
    }
}

impl Validate for TranscriptionRequest {
    fn violations(&self) -> Vec<String> {
        let mut violations = Vec::new();

        check_model(&mut violations, &self.model);

        let sources = [self.file.is_some(), self.file_url.is_some(), self.file_id.is_some()]
            .into_iter()
            .filter(|set| *set)
            .count();
        match sources {
            0 => violations.push("one of file, file_url or file_id is required".to_owned()),
            1 => {}
            _ => violations.push("only one of file, file_url or file_id may be set".to_owned()),
        }

        if self.language.as_deref().is_some_and(|lang| lang.trim().is_empty()) {
            violations.push("language must not be empty when set".to_owned());
        }

        check_range(&mut violations, "temperature", self.temperature, &TEMPERATURE_RANGE);

        violations
    }
}

fn check_model(violations: &mut Vec<String>, model: &str) {
    if model.trim().is_empty() {
        violations.push("model must not be empty".to_owned());
    }
}

fn check_range(violations: &mut Vec<String>, field: &str, value: Option<f64>, range: &RangeInclusive<f64>) {
    if let Some(value) = value
        && !range.contains(&value)
    {
        violations.push(format!(
            "{field} must be between {} and {}, got {value}",
            range.start(),
            range.end()
        ));
    }
}

fn check_positive(violations: &mut Vec<String>, field: &str, value: Option<u32>) {
    if value == Some(0) {
        violations.push(format!("{field} must be at least 1"));
    }
}
