//! Static catalog data: supported locales and per-field character limits.
//!
//! Both tables are closed sets provided as configuration data. Every field
//! translated through the pipeline must resolve to exactly one [`FieldSpec`]
//! before a provider is invoked.

/// Supported catalog locales with their language names.
pub const LOCALES: &[(&str, &str)] = &[
    ("ar", "Arabic"),
    ("ca", "Catalan"),
    ("zh-Hans", "Chinese (Simplified)"),
    ("zh-Hant", "Chinese (Traditional)"),
    ("hr", "Croatian"),
    ("cs", "Czech"),
    ("da", "Danish"),
    ("nl-NL", "Dutch"),
    ("en-AU", "English (Australia)"),
    ("en-CA", "English (Canada)"),
    ("en-GB", "English (U.K.)"),
    ("en-US", "English (U.S.)"),
    ("fi", "Finnish"),
    ("fr-FR", "French"),
    ("fr-CA", "French (Canada)"),
    ("de-DE", "German"),
    ("el", "Greek"),
    ("he", "Hebrew"),
    ("hi", "Hindi"),
    ("hu", "Hungarian"),
    ("id", "Indonesian"),
    ("it", "Italian"),
    ("ja", "Japanese"),
    ("ko", "Korean"),
    ("ms", "Malay"),
    ("no", "Norwegian"),
    ("pl", "Polish"),
    ("pt-BR", "Portuguese (Brazil)"),
    ("pt-PT", "Portuguese (Portugal)"),
    ("ro", "Romanian"),
    ("ru", "Russian"),
    ("sk", "Slovak"),
    ("es-MX", "Spanish (Mexico)"),
    ("es-ES", "Spanish (Spain)"),
    ("sv", "Swedish"),
    ("th", "Thai"),
    ("tr", "Turkish"),
    ("uk", "Ukrainian"),
    ("vi", "Vietnamese"),
];

/// Character limit and formatting rules for one metadata field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub max_chars: usize,
    /// Comma-separated keyword fields get whitespace normalization before
    /// length validation and keyword-preserving truncation on salvage.
    pub is_keywords: bool,
}

/// Character limits for catalog metadata fields.
pub const FIELD_SPECS: &[FieldSpec] = &[
    FieldSpec { name: "name", max_chars: 30, is_keywords: false },
    FieldSpec { name: "subtitle", max_chars: 30, is_keywords: false },
    FieldSpec { name: "description", max_chars: 4000, is_keywords: false },
    FieldSpec { name: "keywords", max_chars: 100, is_keywords: true },
    FieldSpec { name: "promotional_text", max_chars: 170, is_keywords: false },
    FieldSpec { name: "whats_new", max_chars: 4000, is_keywords: false },
    FieldSpec { name: "privacy_policy_url", max_chars: 255, is_keywords: false },
    FieldSpec { name: "marketing_url", max_chars: 255, is_keywords: false },
    FieldSpec { name: "support_url", max_chars: 255, is_keywords: false },
];

/// Look up the field spec for a metadata field name.
pub fn field_spec(name: &str) -> Option<&'static FieldSpec> {
    FIELD_SPECS.iter().find(|spec| spec.name == name)
}

/// Resolve a locale tag to its language name for prompt construction.
pub fn language_name(tag: &str) -> Option<&'static str> {
    LOCALES
        .iter()
        .find(|(locale, _)| *locale == tag)
        .map(|(_, name)| *name)
}

pub fn is_supported(tag: &str) -> bool {
    language_name(tag).is_some()
}

/// Detect the base locale from existing localizations.
///
/// Prefers English variants, then falls back to the first available locale.
pub fn detect_base_locale(available: &[String]) -> Option<String> {
    const PREFERRED: &[&str] = &["en-US", "en-GB", "en-CA", "en-AU"];

    for preferred in PREFERRED {
        if available.iter().any(|locale| locale == preferred) {
            return Some((*preferred).to_string());
        }
    }
    available.first().cloned()
}

/// Normalize a comma-separated keyword list: trim each keyword and join with
/// bare commas so no characters are wasted on separator whitespace.
pub fn normalize_keywords(text: &str) -> String {
    text.split(',')
        .map(str::trim)
        .filter(|keyword| !keyword.is_empty())
        .collect::<Vec<_>>()
        .join(",")
}

/// Truncate a normalized keyword list to fit within `max_chars`, keeping only
/// whole keywords.
pub fn truncate_keywords(keywords: &str, max_chars: usize) -> String {
    if keywords.chars().count() <= max_chars {
        return keywords.to_string();
    }

    let mut kept: Vec<&str> = Vec::new();
    let mut current_len = 0;

    for keyword in keywords.split(',').map(str::trim).filter(|k| !k.is_empty()) {
        let added = keyword.chars().count() + if kept.is_empty() { 0 } else { 1 };
        if current_len + added > max_chars {
            break;
        }
        kept.push(keyword);
        current_len += added;
    }

    kept.join(",")
}

/// Truncate arbitrary text at a character boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locale_catalog_is_closed_and_complete() {
        assert!(LOCALES.len() >= 38);
        assert_eq!(language_name("ja"), Some("Japanese"));
        assert_eq!(language_name("pt-BR"), Some("Portuguese (Brazil)"));
        assert!(language_name("xx-XX").is_none());
        assert!(is_supported("de-DE"));
    }

    #[test]
    fn field_specs_resolve_by_name() {
        let keywords = field_spec("keywords").unwrap();
        assert_eq!(keywords.max_chars, 100);
        assert!(keywords.is_keywords);

        let name = field_spec("name").unwrap();
        assert_eq!(name.max_chars, 30);
        assert!(!name.is_keywords);

        assert!(field_spec("nonexistent").is_none());
    }

    #[test]
    fn base_locale_prefers_english_variants() {
        let available = vec!["ja".to_string(), "en-GB".to_string(), "de-DE".to_string()];
        assert_eq!(detect_base_locale(&available), Some("en-GB".to_string()));

        let no_english = vec!["ja".to_string(), "ko".to_string()];
        assert_eq!(detect_base_locale(&no_english), Some("ja".to_string()));

        assert_eq!(detect_base_locale(&[]), None);
    }

    #[test]
    fn keywords_normalize_to_bare_commas() {
        assert_eq!(normalize_keywords("travel, fun, beach"), "travel,fun,beach");
        assert_eq!(normalize_keywords("a ,b,  c ,"), "a,b,c");
        assert_eq!(normalize_keywords("solo"), "solo");
    }

    #[test]
    fn keyword_truncation_keeps_whole_keywords() {
        assert_eq!(truncate_keywords("travel,fun,beach", 100), "travel,fun,beach");
        // "travel,fun" is 10 chars; adding ",beach" would exceed 12.
        assert_eq!(truncate_keywords("travel,fun,beach", 12), "travel,fun");
        assert_eq!(truncate_keywords("toolongkeyword", 5), "");
    }

    #[test]
    fn char_truncation_counts_characters_not_bytes() {
        assert_eq!(truncate_chars("こんにちは世界", 5), "こんにちは");
        assert_eq!(truncate_chars("short", 100), "short");
    }
}
