//! Built-in HTML to PDF layout.
//!
//! Good enough for certificate-style documents: headings, paragraphs, list
//! items, table rows and line breaks flow top to bottom on A4 pages in
//! Helvetica. Stylesheets and images are not fetched.

use std::borrow::Cow;

use lazy_static::lazy_static;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;

use super::{LayoutEngine, LayoutError};

const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const MARGIN_X: f32 = 56.0;
const MARGIN_TOP: f32 = 64.0;
const MARGIN_BOTTOM: f32 = 64.0;
const LINE_SPACING: f32 = 1.4;
const PRODUCER: &str = "enrollment-docgen";

lazy_static! {
    static ref CHARACTER_REFERENCE: Regex =
        Regex::new(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|[A-Za-z][A-Za-z0-9]*);")
            .expect("character reference pattern is valid");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    Heading(u8),
    Paragraph,
    ListItem,
}

impl BlockKind {
    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "h1" => Some(Self::Heading(1)),
            "h2" => Some(Self::Heading(2)),
            "h3" | "h4" | "h5" | "h6" => Some(Self::Heading(3)),
            "li" => Some(Self::ListItem),
            "p" | "div" | "tr" | "table" | "section" | "article" | "header" | "footer"
            | "main" | "ul" | "ol" | "blockquote" | "address" | "dt" | "dd" | "caption" => {
                Some(Self::Paragraph)
            }
            _ => None,
        }
    }

    fn font(self) -> Font {
        match self {
            Self::Heading(_) => Font::Bold,
            Self::Paragraph | Self::ListItem => Font::Regular,
        }
    }

    fn size(self) -> f32 {
        match self {
            Self::Heading(1) => 18.0,
            Self::Heading(2) => 15.0,
            Self::Heading(_) => 13.0,
            Self::Paragraph | Self::ListItem => 11.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Font {
    Regular,
    Bold,
}

impl Font {
    fn resource(self) -> &'static str {
        match self {
            Self::Regular => "F1",
            Self::Bold => "F2",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Block {
    kind: BlockKind,
    text: String,
}

#[derive(Debug, Default)]
struct ParsedHtml {
    title: Option<String>,
    blocks: Vec<Block>,
}

#[derive(Debug)]
struct Line {
    font: Font,
    size: f32,
    x: f32,
    y: f32,
    text: String,
}

/// In-process layout engine writing standard-font PDFs with `lopdf`.
#[derive(Debug, Default, Clone)]
pub struct BuiltinLayoutEngine;

impl BuiltinLayoutEngine {
    pub fn new() -> Self {
        Self
    }
}

impl LayoutEngine for BuiltinLayoutEngine {
    fn name(&self) -> &str {
        "builtin"
    }

    fn html_to_pdf(&self, html: &str, _base_url: &str) -> Result<Vec<u8>, LayoutError> {
        let parsed = parse_html(html)?;
        let pages = paginate(&parsed.blocks);
        write_pdf(&pages, parsed.title.as_deref())
    }
}

fn parse_html(html: &str) -> Result<ParsedHtml, LayoutError> {
    let mut reader = Reader::from_str(html);
    // HTML void elements (<br>, <meta>) never close.
    reader.config_mut().check_end_names = false;

    let mut parsed = ParsedHtml::default();
    let mut current = String::new();
    let mut kind = BlockKind::Paragraph;
    let mut in_head = false;
    let mut in_title = false;
    let mut skipping = false;
    let mut title = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let tag = tag_name(e.local_name().as_ref());
                match tag.as_str() {
                    "head" => in_head = true,
                    "title" => in_title = true,
                    "style" | "script" => skipping = true,
                    "br" => flush(&mut parsed.blocks, &mut current, kind),
                    "td" | "th" => current.push_str("   "),
                    other => {
                        if let Some(next) = BlockKind::from_tag(other) {
                            flush(&mut parsed.blocks, &mut current, kind);
                            kind = next;
                        }
                    }
                }
            }
            Ok(Event::Empty(e)) => {
                let tag = tag_name(e.local_name().as_ref());
                if matches!(tag.as_str(), "br" | "hr") {
                    flush(&mut parsed.blocks, &mut current, kind);
                }
            }
            Ok(Event::End(e)) => {
                let tag = tag_name(e.local_name().as_ref());
                match tag.as_str() {
                    "head" => in_head = false,
                    "title" => in_title = false,
                    "style" | "script" => skipping = false,
                    other => {
                        if BlockKind::from_tag(other).is_some() {
                            flush(&mut parsed.blocks, &mut current, kind);
                            kind = BlockKind::Paragraph;
                        }
                    }
                }
            }
            Ok(Event::Text(e)) => {
                if skipping || (in_head && !in_title) {
                    continue;
                }
                let raw = std::str::from_utf8(&e[..])
                    .map_err(|err| LayoutError::Markup(err.to_string()))?;
                let text = decode_text(raw)?;
                if in_title {
                    title.push_str(&text);
                } else {
                    current.push_str(&text);
                }
            }
            Ok(Event::CData(e)) => {
                if !skipping && !in_head {
                    current.push_str(&String::from_utf8_lossy(&e[..]));
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => {
                return Err(LayoutError::Markup(format!(
                    "{} at byte {}",
                    err,
                    reader.buffer_position()
                )))
            }
        }
    }

    flush(&mut parsed.blocks, &mut current, kind);
    let title = collapse_whitespace(&title);
    if !title.is_empty() {
        parsed.title = Some(title);
    }
    Ok(parsed)
}

fn tag_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).to_ascii_lowercase()
}

fn flush(blocks: &mut Vec<Block>, current: &mut String, kind: BlockKind) {
    let text = collapse_whitespace(current);
    current.clear();
    if !text.is_empty() {
        blocks.push(Block { kind, text });
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Resolve character references in a text run. An `&` that does not start
/// a reference is kept as written, the way HTML treats it.
fn decode_text(raw: &str) -> Result<Cow<'_, str>, LayoutError> {
    if !raw.contains('&') {
        return Ok(Cow::Borrowed(raw));
    }

    let mut decoded = String::with_capacity(raw.len());
    let mut last = 0;
    for caps in CHARACTER_REFERENCE.captures_iter(raw) {
        let (Some(whole), Some(reference)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        decoded.push_str(&raw[last..whole.start()]);
        match resolve_reference(reference.as_str()) {
            Some(ch) => decoded.push(ch),
            None => match resolve_entity(reference.as_str()) {
                Some(value) => decoded.push_str(value),
                None => {
                    return Err(LayoutError::Markup(format!(
                        "unknown entity '{}'",
                        whole.as_str()
                    )))
                }
            },
        }
        last = whole.end();
    }
    decoded.push_str(&raw[last..]);
    Ok(Cow::Owned(decoded))
}

/// `#225` and `#xE1` style numeric references.
fn resolve_reference(reference: &str) -> Option<char> {
    let number = reference.strip_prefix('#')?;
    let code = match number.strip_prefix(['x', 'X']) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => number.parse().ok()?,
    };
    char::from_u32(code)
}

fn resolve_entity(entity: &str) -> Option<&'static str> {
    let value = match entity {
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "apos" => "'",
        "nbsp" => "\u{a0}",
        "copy" => "©",
        "reg" => "®",
        "deg" => "°",
        "ordm" => "º",
        "ordf" => "ª",
        "laquo" => "«",
        "raquo" => "»",
        "iexcl" => "¡",
        "iquest" => "¿",
        "ndash" => "–",
        "mdash" => "—",
        "hellip" => "…",
        "bull" => "•",
        "middot" => "·",
        "euro" => "€",
        "aacute" => "á",
        "eacute" => "é",
        "iacute" => "í",
        "oacute" => "ó",
        "uacute" => "ú",
        "Aacute" => "Á",
        "Eacute" => "É",
        "Iacute" => "Í",
        "Oacute" => "Ó",
        "Uacute" => "Ú",
        "ntilde" => "ñ",
        "Ntilde" => "Ñ",
        "uuml" => "ü",
        "Uuml" => "Ü",
        _ => return None,
    };
    Some(value)
}

/// Approximate Helvetica advance width in thousandths of an em.
fn glyph_width(ch: char, font: Font) -> f32 {
    let base = match ch {
        ' ' | 'i' | 'j' | 'l' | '.' | ',' | ':' | ';' | '!' | '\'' | '|' => 278.0,
        'f' | 't' | 'I' | 'r' | '(' | ')' | '[' | ']' | '-' | '/' => 333.0,
        'm' | 'M' => 833.0,
        'w' | 'W' => 778.0,
        '0'..='9' => 556.0,
        c if c.is_uppercase() => 667.0,
        _ => 556.0,
    };
    match font {
        Font::Regular => base,
        Font::Bold => base * 1.06,
    }
}

fn text_width(text: &str, font: Font, size: f32) -> f32 {
    text.chars().map(|ch| glyph_width(ch, font)).sum::<f32>() * size / 1000.0
}

/// Greedy word wrap. A word wider than the line is kept whole.
fn wrap(text: &str, font: Font, size: f32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();

    for word in text.split(' ') {
        let candidate = if line.is_empty() {
            Cow::Borrowed(word)
        } else {
            Cow::Owned(format!("{line} {word}"))
        };
        if !line.is_empty() && text_width(&candidate, font, size) > max_width {
            lines.push(std::mem::take(&mut line));
            line.push_str(word);
        } else {
            line = candidate.into_owned();
        }
    }

    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

fn paginate(blocks: &[Block]) -> Vec<Vec<Line>> {
    let content_width = PAGE_WIDTH - 2.0 * MARGIN_X;
    let mut pages = vec![Vec::new()];
    let mut y = PAGE_HEIGHT - MARGIN_TOP;

    for block in blocks {
        let font = block.kind.font();
        let size = block.kind.size();
        let leading = size * LINE_SPACING;
        let (indent, text) = match block.kind {
            BlockKind::ListItem => (14.0, format!("\u{2022} {}", block.text)),
            _ => (0.0, block.text.clone()),
        };

        for line_text in wrap(&text, font, size, content_width - indent) {
            if y - leading < MARGIN_BOTTOM {
                pages.push(Vec::new());
                y = PAGE_HEIGHT - MARGIN_TOP;
            }
            y -= leading;
            let x = match block.kind {
                BlockKind::Heading(1) => {
                    ((PAGE_WIDTH - text_width(&line_text, font, size)) / 2.0).max(MARGIN_X)
                }
                _ => MARGIN_X + indent,
            };
            if let Some(page) = pages.last_mut() {
                page.push(Line {
                    font,
                    size,
                    x,
                    y,
                    text: line_text,
                });
            }
        }
        y -= size * 0.6;
    }

    pages
}

/// Map text onto WinAnsiEncoding bytes; unmappable characters become `?`.
fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|ch| match ch as u32 {
            0x00..=0x1f => b' ',
            code @ 0x20..=0x7e => code as u8,
            code @ 0xa0..=0xff => code as u8,
            _ => match ch {
                '€' => 0x80,
                '‚' => 0x82,
                'ƒ' => 0x83,
                '„' => 0x84,
                '…' => 0x85,
                '†' => 0x86,
                '‡' => 0x87,
                'ˆ' => 0x88,
                '‰' => 0x89,
                'Š' => 0x8a,
                '‹' => 0x8b,
                'Œ' => 0x8c,
                'Ž' => 0x8e,
                '‘' => 0x91,
                '’' => 0x92,
                '“' => 0x93,
                '”' => 0x94,
                '•' => 0x95,
                '–' => 0x96,
                '—' => 0x97,
                '˜' => 0x98,
                '™' => 0x99,
                'š' => 0x9a,
                '›' => 0x9b,
                'œ' => 0x9c,
                'ž' => 0x9e,
                'Ÿ' => 0x9f,
                _ => b'?',
            },
        })
        .collect()
}

/// Document information strings are UTF-16BE with a byte order mark.
fn encode_text_string(text: &str) -> Vec<u8> {
    let mut bytes = vec![0xfe, 0xff];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    bytes
}

fn font_object(doc: &mut Document, base_font: &str) -> ObjectId {
    doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => Object::Name(base_font.as_bytes().to_vec()),
        "Encoding" => "WinAnsiEncoding",
    })
}

fn write_pdf(pages: &[Vec<Line>], title: Option<&str>) -> Result<Vec<u8>, LayoutError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let regular = font_object(&mut doc, "Helvetica");
    let bold = font_object(&mut doc, "Helvetica-Bold");
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            Font::Regular.resource() => regular,
            Font::Bold.resource() => bold,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for lines in pages {
        let mut operations = Vec::with_capacity(lines.len() * 5);
        for line in lines {
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new(
                "Tf",
                vec![
                    Object::Name(line.font.resource().as_bytes().to_vec()),
                    Object::Integer(line.size.round() as i64),
                ],
            ));
            operations.push(Operation::new(
                "Td",
                vec![
                    Object::Integer(line.x.round() as i64),
                    Object::Integer(line.y.round() as i64),
                ],
            ));
            operations.push(Operation::new(
                "Tj",
                vec![Object::String(
                    encode_win_ansi(&line.text),
                    StringFormat::Literal,
                )],
            ));
            operations.push(Operation::new("ET", vec![]));
        }

        let content = Content { operations };
        let encoded = content
            .encode()
            .map_err(|err| LayoutError::Pdf(err.to_string()))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(PAGE_WIDTH as i64),
                Object::Integer(PAGE_HEIGHT as i64),
            ],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut info = dictionary! {
        "Producer" => Object::string_literal(PRODUCER),
    };
    if let Some(title) = title {
        info.set(
            "Title",
            Object::String(encode_text_string(title), StringFormat::Hexadecimal),
        );
    }
    let info_id = doc.add_object(info);
    doc.trailer.set("Info", info_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|err| LayoutError::Pdf(err.to_string()))?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_blocks_and_title() {
        let html = r#"<!DOCTYPE html>
<html>
  <head>
    <meta charset="utf-8">
    <title>Constancia de matrícula</title>
    <style>body { font-family: serif; } p > b { color: red; }</style>
  </head>
  <body>
    <h1>Constancia</h1>
    <p>Se deja constancia que <b>Juan P&eacute;rez</b>
       est&#225; matriculado.</p>
    <ul><li>Primero</li><li>Segundo</li></ul>
    <p>Linea uno<br>Linea dos</p>
  </body>
</html>"#;

        let parsed = parse_html(html).unwrap();
        assert_eq!(parsed.title.as_deref(), Some("Constancia de matrícula"));
        let texts: Vec<&str> = parsed.blocks.iter().map(|b| b.text.as_str()).collect();
        assert_eq!(
            texts,
            vec![
                "Constancia",
                "Se deja constancia que Juan Pérez está matriculado.",
                "Primero",
                "Segundo",
                "Linea uno",
                "Linea dos",
            ]
        );
        assert_eq!(parsed.blocks[0].kind, BlockKind::Heading(1));
        assert_eq!(parsed.blocks[2].kind, BlockKind::ListItem);
    }

    #[test]
    fn test_unknown_entity_is_malformed_markup() {
        let err = parse_html("<p>&bogus;</p>").unwrap_err();
        assert!(matches!(err, LayoutError::Markup(_)));
    }

    #[test]
    fn test_bare_ampersand_is_literal_text() {
        let parsed = parse_html("<p>Ciencias & Sistemas &amp; Datos &#x41;&#66; AT&T</p>").unwrap();
        assert_eq!(parsed.blocks[0].text, "Ciencias & Sistemas & Datos AB AT&T");
    }

    #[test]
    fn test_title_is_utf16_with_bom() {
        assert_eq!(encode_text_string("Pé"), vec![0xfe, 0xff, 0x00, b'P', 0x00, 0xe9]);
        assert_eq!(encode_text_string("“"), vec![0xfe, 0xff, 0x20, 0x1c]);
    }

    #[test]
    fn test_wrap_respects_width() {
        let text = "palabra ".repeat(60);
        let lines = wrap(text.trim(), Font::Regular, 11.0, 200.0);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(text_width(line, Font::Regular, 11.0) <= 200.0);
        }
    }

    #[test]
    fn test_long_documents_span_pages() {
        let blocks: Vec<Block> = (0..120)
            .map(|i| Block {
                kind: BlockKind::Paragraph,
                text: format!("Parrafo {i}"),
            })
            .collect();
        let pages = paginate(&blocks);
        assert!(pages.len() > 1);
        for page in &pages {
            for line in page {
                assert!(line.y >= MARGIN_BOTTOM);
            }
        }
    }

    #[test]
    fn test_win_ansi_encoding() {
        assert_eq!(encode_win_ansi("Pérez"), vec![b'P', 0xe9, b'r', b'e', b'z']);
        assert_eq!(encode_win_ansi("“ok” – €"), vec![0x93, b'o', b'k', 0x94, b' ', 0x96, b' ', 0x80]);
        assert_eq!(encode_win_ansi("日"), vec![b'?']);
    }

    #[test]
    fn test_output_is_a_pdf() {
        let engine = BuiltinLayoutEngine::new();
        let bytes = engine
            .html_to_pdf("<html><body><p>Hola</p></body></html>", "file:///")
            .unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));

        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn test_empty_body_still_yields_one_page() {
        let bytes = BuiltinLayoutEngine::new()
            .html_to_pdf("<html><body></body></html>", "file:///")
            .unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }
}
