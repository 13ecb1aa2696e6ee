use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use regex::Regex;
use scraper::{Html, Selector};

/// Maximum number of characters kept from an article body.
pub const MAX_CONTENT_CHARS: usize = 10_000;

const TRUNCATION_MARKER: &str = "...";

/// Convert raw page bytes into cleaned plain text.
///
/// The source encoding is sniffed from the bytes themselves (BOM, then a
/// `<meta charset>` declaration, then a UTF-8 validity check with a
/// Windows-1252 fallback) and transcoded to UTF-8. The document body's
/// text is extracted wholesale and whitespace-cleaned. An undecodable or
/// empty page yields an empty string, never an error.
pub fn normalize(raw: &[u8]) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let html = transcode_to_utf8(raw);
    if html.is_empty() {
        return String::new();
    }

    let text = extract_body_text(&html);
    clean_whitespace(&text)
}

/// Truncate to `max_chars` characters, appending a marker when cut.
pub fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}{}", &text[..byte_idx], TRUNCATION_MARKER),
        None => text.to_string(),
    }
}

fn transcode_to_utf8(raw: &[u8]) -> String {
    let encoding = detect_encoding(raw);
    let (text, used, had_errors) = encoding.decode(raw);
    if had_errors {
        // Malformed sequences come out as U+FFFD; the article keeps
        // whatever text survived rather than being dropped.
        tracing::debug!("lossy {} decode", used.name());
    }
    text.into_owned()
}

fn detect_encoding(raw: &[u8]) -> &'static Encoding {
    if let Some((encoding, _)) = Encoding::for_bom(raw) {
        return encoding;
    }
    if let Some(encoding) = declared_encoding(raw) {
        return encoding;
    }
    if std::str::from_utf8(raw).is_ok() {
        UTF_8
    } else {
        WINDOWS_1252
    }
}

/// Look for a charset declaration in the document head.
/// Matches both `<meta charset="...">` and the http-equiv content form.
fn declared_encoding(raw: &[u8]) -> Option<&'static Encoding> {
    let head = String::from_utf8_lossy(&raw[..raw.len().min(1024)]);
    let re = Regex::new(r#"(?i)charset\s*=\s*["']?([a-zA-Z0-9._\-]+)"#).ok()?;
    let label = re.captures(&head)?.get(1)?.as_str();
    Encoding::for_label(label.as_bytes())
}

/// Whole-body text, navigation and boilerplate included.
fn extract_body_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let body_selector = Selector::parse("body").unwrap();
    document
        .select(&body_selector)
        .next()
        .map(|body| body.text().collect::<String>())
        .unwrap_or_default()
}

fn clean_whitespace(text: &str) -> String {
    text.lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
