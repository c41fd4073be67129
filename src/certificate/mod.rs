//! Enrollment certificate ("constancia de matrícula") builder.
//!
//! Turns a student's enrollment data into a [`RenderContext`] and renders the
//! bundled `certificates/enrollment` template through the
//! [`DocumentGenerator`]. This is a caller of the document core, not part of
//! it: the field checks in [`validation`] only apply to this request type.

pub mod validation;

use std::str::FromStr;
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::documents::common::{format_spanish_date, slugify};
use crate::documents::context::ContextError;
use crate::documents::{DocumentFormat, DocumentGenerator, GenerateError, RenderContext, Validator};

pub const CERTIFICATE_CATEGORY: &str = "certificates";
pub const ENROLLMENT_TEMPLATE: &str = "enrollment";
const FILENAME_PREFIX: &str = "constancia-matricula";

#[derive(Debug, Error)]
pub enum CertificateError {
    #[error("{0}")]
    Validation(String),
    #[error("failed to build certificate context: {0}")]
    Context(#[from] ContextError),
    #[error(transparent)]
    Generate(#[from] GenerateError),
}

/// Datos del estudiante.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StudentData {
    pub first_name: String,
    pub last_name: String,
    /// DNI, 8 digits
    pub document_number: String,
    pub enrollment_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Photo path relative to the media root, used by ODT templates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
}

impl StudentData {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FacultyData {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dean: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpecialtyData {
    pub name: String,
    pub code: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CertificateMeta {
    /// e.g. `2024-I`
    pub academic_period: String,
    /// Issue date; today when omitted.
    #[serde(default)]
    pub issued_on: Option<NaiveDate>,
}

/// Request for a constancia de matrícula.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnrollmentCertificateRequest {
    pub student: StudentData,
    pub faculty: FacultyData,
    pub specialty: SpecialtyData,
    pub meta: CertificateMeta,
}

impl Validator for EnrollmentCertificateRequest {
    fn validate(&self) -> Result<(), String> {
        use validation::*;

        let mut errors = ValidationErrors::new();

        validate_required(
            &self.student.first_name,
            "student.first_name",
            "Nombres",
            &mut errors,
        );
        validate_required(
            &self.student.last_name,
            "student.last_name",
            "Apellidos",
            &mut errors,
        );
        validate_document_number(
            &self.student.document_number,
            "student.document_number",
            &mut errors,
        );
        validate_enrollment_code(
            &self.student.enrollment_code,
            "student.enrollment_code",
            &mut errors,
        );

        validate_required(&self.faculty.name, "faculty.name", "Facultad", &mut errors);
        validate_required(
            &self.specialty.name,
            "specialty.name",
            "Especialidad",
            &mut errors,
        );
        validate_required(
            &self.specialty.code,
            "specialty.code",
            "Código de especialidad",
            &mut errors,
        );

        validate_academic_period(
            &self.meta.academic_period,
            "meta.academic_period",
            &mut errors,
        );

        errors.into_result()
    }
}

impl EnrollmentCertificateRequest {
    /// Issue date in Spanish long form, falling back to `today`.
    pub fn issue_date(&self, today: NaiveDate) -> String {
        format_spanish_date(self.meta.issued_on.unwrap_or(today))
    }

    /// Template variables for the enrollment certificate.
    pub fn to_context(&self, today: NaiveDate) -> Result<RenderContext, ContextError> {
        let mut context = RenderContext::new()
            .with("student_name", self.student.full_name())
            .with("specialty_code", self.specialty.code.trim())
            .with("academic_period", self.meta.academic_period.trim())
            .with("date", self.issue_date(today));
        context.insert_serialized("student", &self.student)?;
        context.insert_serialized("faculty", &self.faculty)?;
        context.insert_serialized("specialty", &self.specialty)?;
        Ok(context)
    }

    /// e.g. `constancia-matricula-juan-perez.pdf`
    pub fn filename(&self, format: &str) -> String {
        let stem = slugify(&self.student.full_name(), "estudiante");
        let extension = format.trim().to_ascii_lowercase();
        sanitize_filename::sanitize(format!("{}-{}.{}", FILENAME_PREFIX, stem, extension))
    }
}

/// Result of a successful certificate generation.
#[derive(Debug)]
pub struct GeneratedDocument {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub content_type: String,
    /// Issue date as printed on the document.
    pub date: String,
}

pub struct EnrollmentCertificateGenerator {
    documents: Arc<DocumentGenerator>,
}

impl EnrollmentCertificateGenerator {
    pub fn new(documents: Arc<DocumentGenerator>) -> Self {
        Self { documents }
    }

    pub fn generate(
        &self,
        request: &EnrollmentCertificateRequest,
        format: &str,
    ) -> Result<GeneratedDocument, CertificateError> {
        request.validate().map_err(CertificateError::Validation)?;

        let today = Local::now().date_naive();
        let context = request.to_context(today)?;
        let bytes =
            self.documents
                .generate(CERTIFICATE_CATEGORY, ENROLLMENT_TEMPLATE, &context, format)?;

        let filename = request.filename(format);
        info!(
            "enrollment certificate generated: {} ({} bytes)",
            filename,
            bytes.len()
        );

        Ok(GeneratedDocument {
            filename,
            bytes,
            content_type: content_type_for(format),
            date: request.issue_date(today),
        })
    }
}

fn content_type_for(format: &str) -> String {
    match DocumentFormat::from_str(format) {
        Ok(known) => known.content_type().to_string(),
        Err(_) => mime_guess::from_ext(&format.trim().to_ascii_lowercase())
            .first_or_octet_stream()
            .to_string(),
    }
}
