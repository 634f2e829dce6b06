//! HTML-structural extraction for the article assembly stage.
//!
//! The model is asked for a full HTML document, but callers only want the
//! body fragment. No DOM parse: a case-insensitive regex pulls the `<body>`
//! interior, and when the model skipped the scaffold entirely we strip any
//! stray document-level tags and return the rest.

use std::sync::LazyLock;

use regex::Regex;

static BODY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<body[^>]*>(.*?)</body>").unwrap());

static SCAFFOLD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<!DOCTYPE[^>]*>|</?html[^>]*>|<head[^>]*>.*?</head>|</?body[^>]*>").unwrap()
});

/// Reduce raw model output to body-level HTML.
pub fn extract_body(raw: &str) -> String {
    let text = strip_fences(raw.trim());

    if let Some(captures) = BODY_RE.captures(text) {
        return captures[1].trim().to_string();
    }
    SCAFFOLD_RE.replace_all(text, "").trim().to_string()
}

/// Drop a Markdown code fence (```html ... ```) when the model added one
/// despite being told not to.
fn strip_fences(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("html").unwrap_or(rest);
    let rest = rest.trim_start_matches(['\r', '\n']);
    rest.strip_suffix("```").map(str::trim_end).unwrap_or(rest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_document_reduces_to_body_interior() {
        let raw = "<!DOCTYPE html>\n<html lang=\"ro\"><head><title>T</title>\
                   <style>body { color: red; }</style></head>\
                   <body>\n<h1>Titlu</h1><p>Conținut.</p>\n</body></html>";
        let body = extract_body(raw);
        assert_eq!(body, "<h1>Titlu</h1><p>Conținut.</p>");
        assert!(!body.contains("<head"));
    }

    #[test]
    fn body_attributes_are_tolerated() {
        let raw = "<html><body class=\"article\"><p>text</p></body></html>";
        assert_eq!(extract_body(raw), "<p>text</p>");
    }

    #[test]
    fn fenced_document_is_unwrapped_first() {
        let raw = "```html\n<html><body><h2>Secțiune</h2></body></html>\n```";
        assert_eq!(extract_body(raw), "<h2>Secțiune</h2>");
    }

    #[test]
    fn bare_fragment_passes_through() {
        let raw = "<h1>Titlu</h1><p>Fără schelet de document.</p>";
        assert_eq!(extract_body(raw), raw);
    }

    #[test]
    fn scaffold_without_body_is_stripped() {
        let raw = "<!DOCTYPE html><html><head><title>T</title></head><h1>Titlu</h1></html>";
        assert_eq!(extract_body(raw), "<h1>Titlu</h1>");
    }

    #[test]
    fn result_has_no_document_wrapper_tags() {
        let raw = "<html><body><p>a</p></body></html>";
        let body = extract_body(raw);
        assert!(!body.contains("<html"));
        assert!(!body.contains("<body"));
    }
}
