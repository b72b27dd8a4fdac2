use regex::Regex;
use std::sync::LazyLock;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern compiles")
});

/// Cédula (001-1234567-8, dashes optional) or RNC (9 digits).
static DOCUMENT_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{3}-?\d{7}-?\d|\d{9})$").expect("document id pattern compiles")
});

static DOCUMENT_TYPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9][a-z0-9_-]{0,63}$").expect("document type pattern compiles")
});

pub fn is_valid_email(value: &str) -> bool {
    EMAIL.is_match(value)
}

pub fn is_valid_document_id(value: &str) -> bool {
    DOCUMENT_ID.is_match(value)
}

pub fn is_valid_document_type(value: &str) -> bool {
    DOCUMENT_TYPE.is_match(value)
}

pub fn normalize_email(value: &str) -> String {
    value.trim().to_lowercase()
}

/// A media type that can be echoed back in a `Content-Type` header.
pub fn parse_content_type(value: &str) -> Option<mime::Mime> {
    if value.chars().any(char::is_control) {
        return None;
    }
    value.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type() {
        assert_eq!(
            parse_content_type("application/pdf").unwrap(),
            mime::APPLICATION_PDF
        );
        assert!(parse_content_type("image/png; name=\"scan\"").is_some());
        assert!(parse_content_type("pdf").is_none());
        assert!(parse_content_type("text/plain\r\nX-Injected: 1").is_none());
        assert!(parse_content_type("text/\u{7f}plain").is_none());
    }

    #[test]
    fn test_email() {
        assert!(is_valid_email("ana@salud.gob.do"));
        assert!(!is_valid_email("ana@"));
        assert!(!is_valid_email("ana perez@salud.gob.do"));
    }

    #[test]
    fn test_document_id() {
        assert!(is_valid_document_id("001-1234567-8"));
        assert!(is_valid_document_id("00112345678"));
        assert!(is_valid_document_id("130123456"));
        assert!(!is_valid_document_id("1234"));
        assert!(!is_valid_document_id("001-1234567-89"));
    }

    #[test]
    fn test_document_type() {
        assert!(is_valid_document_type("licencia_sanitaria"));
        assert!(!is_valid_document_type("Licencia"));
        assert!(!is_valid_document_type("../etc"));
        assert!(!is_valid_document_type(""));
    }
}
