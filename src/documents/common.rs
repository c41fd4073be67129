//! Common utilities for document generation.
//!
//! Date formatting for certificate text and filename helpers.

use chrono::{Datelike, Local, NaiveDate};

const MONTHS: [&str; 12] = [
    "enero",
    "febrero",
    "marzo",
    "abril",
    "mayo",
    "junio",
    "julio",
    "agosto",
    "septiembre",
    "octubre",
    "noviembre",
    "diciembre",
];

/// Format a date in Spanish long form (e.g., "04 de junio de 2024").
pub fn format_spanish_date(date: NaiveDate) -> String {
    let month = MONTHS[(date.month0() as usize).min(MONTHS.len() - 1)];
    format!("{:02} de {} de {}", date.day(), month, date.year())
}

/// Today's date in Spanish long form.
pub fn today_spanish_date() -> String {
    format_spanish_date(Local::now().date_naive())
}

/// Parse an ISO `YYYY-MM-DD` string and format it in Spanish.
pub fn format_iso_as_spanish(value: &str) -> Option<String> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .ok()
        .map(format_spanish_date)
}

/// Turn a display name into a lowercase, dash separated filename stem.
///
/// Accented Latin letters are folded to ASCII so "Juan Pérez" becomes
/// "juan-perez".
pub fn slugify(name: &str, fallback: &str) -> String {
    let mut result = String::new();
    let mut last_dash = false;

    for ch in name.trim().chars().map(fold_accent) {
        if ch.is_ascii_alphanumeric() {
            result.push(ch.to_ascii_lowercase());
            last_dash = false;
        } else if (ch.is_whitespace() || ch == '-' || ch == '_') && !last_dash && !result.is_empty()
        {
            result.push('-');
            last_dash = true;
        }
    }

    if result.is_empty() {
        return fallback.to_string();
    }

    result.trim_matches('-').to_string()
}

fn fold_accent(ch: char) -> char {
    match ch {
        'á' | 'à' | 'ä' | 'â' | 'Á' | 'À' | 'Ä' | 'Â' => 'a',
        'é' | 'è' | 'ë' | 'ê' | 'É' | 'È' | 'Ë' | 'Ê' => 'e',
        'í' | 'ì' | 'ï' | 'î' | 'Í' | 'Ì' | 'Ï' | 'Î' => 'i',
        'ó' | 'ò' | 'ö' | 'ô' | 'Ó' | 'Ò' | 'Ö' | 'Ô' => 'o',
        'ú' | 'ù' | 'ü' | 'û' | 'Ú' | 'Ù' | 'Ü' | 'Û' => 'u',
        'ñ' | 'Ñ' => 'n',
        'ç' | 'Ç' => 'c',
        other => other,
    }
}
