//! Input validation for certificate requests.
//!
//! These checks run in the certificate builder before anything reaches
//! [`DocumentGenerator`](crate::DocumentGenerator), which never validates
//! field contents itself. Messages are in Spanish since they are shown to
//! registry staff as-is.

use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref ACADEMIC_PERIOD: Regex =
        Regex::new(r"^\d{4}-(I|II|III|1|2|3)$").expect("academic period pattern is valid");
}

/// Validation error with a field path and an actionable message.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// The field that failed validation
    pub field: String,
    pub message: String,
    /// Suggestion for how to fix the error
    pub suggestion: Option<String>,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            suggestion: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Create error for empty required field
    pub fn empty_field(field: &str, label: &str) -> Self {
        Self::new(field, format!("{} no puede estar vacío", label)).with_suggestion(format!(
            "Ingrese {} con un valor válido",
            label.to_lowercase()
        ))
    }

    pub fn invalid_document_number(field: &str) -> Self {
        Self::new(field, "El DNI debe tener 8 dígitos")
            .with_suggestion("Verifique el documento de identidad, ejemplo: 45879632")
    }

    pub fn invalid_enrollment_code(field: &str) -> Self {
        Self::new(field, "El código de matrícula no es válido")
            .with_suggestion("Use entre 6 y 12 letras o dígitos, ejemplo: 2019100234")
    }

    pub fn invalid_academic_period(field: &str, value: &str) -> Self {
        Self::new(field, format!("El periodo académico '{}' no es válido", value))
            .with_suggestion("Use el formato AAAA-I o AAAA-II, ejemplo: 2024-I")
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.field, self.message)?;
        if let Some(ref suggestion) = self.suggestion {
            write!(f, ". {}", suggestion)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Collection of validation errors with formatted output.
#[derive(Debug, Default)]
pub struct ValidationErrors {
    errors: Vec<ValidationError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    pub fn add(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Numbered list of every problem found.
    pub fn to_message(&self) -> String {
        if self.errors.is_empty() {
            return String::new();
        }

        let mut parts = vec![format!(
            "Validación fallida: {} error(es) encontrado(s)\n",
            self.errors.len()
        )];

        for (i, error) in self.errors.iter().enumerate() {
            parts.push(format!("{}. {}", i + 1, error));
        }

        parts.push(String::new());
        parts.push("Corrija los datos indicados e intente nuevamente.".to_string());

        parts.join("\n")
    }

    /// Convert to Result - Ok if no errors, Err with formatted message if errors exist
    pub fn into_result(self) -> Result<(), String> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self.to_message())
        }
    }
}

// ============================================================================
// Validation functions
// ============================================================================

/// Validate that a string is not empty after trimming
pub fn validate_required(value: &str, field: &str, label: &str, errors: &mut ValidationErrors) {
    if value.trim().is_empty() {
        errors.add(ValidationError::empty_field(field, label));
    }
}

/// Peruvian DNI: exactly 8 digits.
pub fn validate_document_number(value: &str, field: &str, errors: &mut ValidationErrors) {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.add(ValidationError::empty_field(field, "DNI"));
        return;
    }

    if trimmed.len() != 8 || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        errors.add(ValidationError::invalid_document_number(field));
    }
}

pub fn validate_enrollment_code(value: &str, field: &str, errors: &mut ValidationErrors) {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.add(ValidationError::empty_field(field, "Código de matrícula"));
        return;
    }

    let valid_len = (6..=12).contains(&trimmed.len());
    if !valid_len || !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
        errors.add(ValidationError::invalid_enrollment_code(field));
    }
}

pub fn validate_academic_period(value: &str, field: &str, errors: &mut ValidationErrors) {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.add(ValidationError::empty_field(field, "Periodo académico"));
        return;
    }

    if !ACADEMIC_PERIOD.is_match(trimmed) {
        errors.add(ValidationError::invalid_academic_period(field, trimmed));
    }
}
