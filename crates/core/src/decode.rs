//! Encoding-resilient decoding of fetched documents.
//!
//! Feeds and pages routinely declare the wrong charset or none at all.
//! [`decode_document`] always returns text: it tries strict UTF-8 first,
//! then a strictly-valid declared multi-byte charset, then Latin-1. Latin-1
//! maps every byte, so Windows-1252 is only reached when it is declared by
//! name.
//! When a single-byte fallback is taken, any `encoding="ISO-8859-1"` style
//! declaration in the text is rewritten to `UTF-8` so XML parsers downstream
//! do not reinterpret the already-decoded text.

use std::borrow::Cow;
use std::sync::LazyLock;

use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use regex::Regex;

static SINGLE_BYTE_DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(encoding\s*=\s*)(["'])(?:iso-8859-1|iso8859-1|latin-?1|windows-1252|cp1252)(["'])"#)
        .expect("valid declaration regex")
});

/// Which step of the fallback chain produced the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodedAs {
    Utf8,
    Declared(&'static Encoding),
    Latin1,
    Windows1252,
}

/// Decodes `bytes` into text, never failing.
///
/// `declared` is the charset label from a `Content-Type` header or XML
/// prolog, if any. It is only consulted after strict UTF-8 fails. A charset
/// other than UTF-8 or the single-byte Western ones is used when it decodes
/// the bytes without replacement; `windows-1252` (or `cp1252`) selects
/// Windows-1252. Everything else, `ISO-8859-1` included, is decoded as
/// Latin-1 byte for byte.
pub fn decode_document(bytes: &[u8], declared: Option<&str>) -> String {
    decode_with_report(bytes, declared).0
}

/// Same as [`decode_document`], also reporting which decoder was used.
pub fn decode_with_report(bytes: &[u8], declared: Option<&str>) -> (String, DecodedAs) {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);

    if let Ok(text) = std::str::from_utf8(bytes) {
        return (text.to_string(), DecodedAs::Utf8);
    }

    if let Some(encoding) = declared.and_then(|label| Encoding::for_label(label.trim().as_bytes()))
        && encoding != UTF_8
        && encoding != WINDOWS_1252
        && let Some(text) = encoding.decode_without_bom_handling_and_without_replacement(bytes)
    {
        tracing::debug!(charset = encoding.name(), "decoded with declared charset");
        return (text.into_owned(), DecodedAs::Declared(encoding));
    }

    if declared.is_some_and(names_windows_1252) {
        let (text, _) = WINDOWS_1252.decode_without_bom_handling(bytes);
        return (rewrite_declaration(text.into_owned()), DecodedAs::Windows1252);
    }

    let text: String = bytes.iter().map(|&b| b as char).collect();
    (rewrite_declaration(text), DecodedAs::Latin1)
}

// encoding_rs folds the Latin-1 labels into windows-1252, so match the raw label.
fn names_windows_1252(label: &str) -> bool {
    matches!(label.trim().to_ascii_lowercase().as_str(), "windows-1252" | "cp1252" | "x-cp1252")
}

/// Extracts the `charset=` parameter from a `Content-Type` header value.
pub fn charset_from_content_type(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        if key.trim().eq_ignore_ascii_case("charset") {
            Some(value.trim().trim_matches(|c| c == '"' || c == '\''))
        } else {
            None
        }
    })
}

fn rewrite_declaration(text: String) -> String {
    match SINGLE_BYTE_DECLARATION.replace_all(&text, "${1}${2}UTF-8${3}") {
        Cow::Borrowed(_) => text,
        Cow::Owned(rewritten) => rewritten,
    }
}
