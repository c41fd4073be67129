//! Jinja-style substitution shared by every renderer.
//!
//! Undefined variables are errors, and substituted values are HTML escaped,
//! which is also valid escaping for the XML parts of ODT and DOCX packages.

use lazy_static::lazy_static;
use minijinja::{AutoEscape, Environment, Error, ErrorKind, UndefinedBehavior};
use regex::Regex;

use super::common::format_iso_as_spanish;
use super::{GenerateError, RenderContext};

lazy_static! {
    // Delimiters may have run markup between their two characters.
    static ref TAG_OPEN: Regex =
        Regex::new(r"\{(?:<[^>]*>)*([{%])").expect("tag open pattern is valid");
    static ref VARIABLE_CLOSE: Regex =
        Regex::new(r"\}(?:<[^>]*>)*\}").expect("variable close pattern is valid");
    static ref BLOCK_CLOSE: Regex =
        Regex::new(r"%(?:<[^>]*>)*\}").expect("block close pattern is valid");
    static ref PARAGRAPH_END: Regex =
        Regex::new(r"</(?:w|text):p>").expect("paragraph end pattern is valid");
    static ref XML_MARKUP: Regex = Regex::new(r"<[^>]*>").expect("xml markup pattern is valid");
}

/// Environment with the crate's filters and strict undefined handling.
pub fn base_environment() -> Environment<'static> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.set_auto_escape_callback(|_| AutoEscape::Html);
    env.add_filter("spanish_date", spanish_date);
    env
}

/// Render `source` with `context`, mapping engine errors to `RenderFailure`.
pub fn render_source(
    env: &Environment<'_>,
    format: &str,
    source: &str,
    context: &RenderContext,
) -> Result<String, GenerateError> {
    env.render_str(source, context.as_map())
        .map_err(|err| GenerateError::render_failure(format, describe(&err)))
}

/// `{{ "2024-06-04" | spanish_date }}` renders "04 de junio de 2024".
fn spanish_date(value: &str) -> Result<String, Error> {
    format_iso_as_spanish(value).ok_or_else(|| {
        Error::new(
            ErrorKind::InvalidOperation,
            format!("'{value}' is not a YYYY-MM-DD date"),
        )
    })
}

/// Word processors split typed placeholders across runs and escape quotes
/// inside them. Strip the markup inside every `{{ }}` / `{% %}` span so the
/// template engine sees the expression the author typed.
///
/// A span that would swallow a paragraph boundary is a `RenderFailure`. An
/// opening delimiter with no close is left for the template engine to report.
pub fn repair_xml_placeholders(format: &str, xml: &str) -> Result<String, GenerateError> {
    let mut repaired = String::with_capacity(xml.len());
    let mut rest = xml;

    while let Some(open) = TAG_OPEN.captures(rest) {
        let (Some(whole), Some(kind)) = (open.get(0), open.get(1)) else {
            break;
        };
        let after = &rest[whole.end()..];
        let close = match kind.as_str() {
            "{" => VARIABLE_CLOSE.find(after),
            _ => BLOCK_CLOSE.find(after),
        };
        let Some(close) = close else {
            break;
        };

        let span = &rest[whole.start()..whole.end() + close.end()];
        if PARAGRAPH_END.is_match(span) {
            let typed = XML_MARKUP.replace_all(span, "");
            return Err(GenerateError::render_failure(
                format,
                format!("placeholder '{}' spans more than one paragraph", typed.trim()),
            ));
        }

        repaired.push_str(&rest[..whole.start()]);
        repaired.push_str(&decode_expression(&XML_MARKUP.replace_all(span, "")));
        rest = &after[close.end()..];
    }

    repaired.push_str(rest);
    Ok(repaired)
}

fn decode_expression(expr: &str) -> String {
    expr.replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
        .replace(['\u{201c}', '\u{201d}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'")
}

/// Error text including the underlying cause chain when there is one.
pub(crate) fn describe(err: &Error) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
