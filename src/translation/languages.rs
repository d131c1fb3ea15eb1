//! # Supported Languages
//!
//! Static table of the languages the service translates between, together with the
//! speech-synthesis voice used for each of them.

use crate::error::{AppError, AppResult};
use serde::Serialize;

/// One supported language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Language {
    /// Upper-case two-letter code (`EN`, `DE`, ...)
    pub code: &'static str,
    pub name: &'static str,
    #[serde(rename = "nativeName")]
    pub native_name: &'static str,
    pub flag: &'static str,
    /// Synthesis voice for this language
    #[serde(skip)]
    pub voice: &'static str,
}

/// Fallback when a classifier gives no usable answer.
pub const DEFAULT_LANGUAGE: &str = "EN";

/// Voice used when a language has no explicit mapping.
pub const DEFAULT_VOICE: &str = "alloy";

pub const SUPPORTED_LANGUAGES: &[Language] = &[
    Language { code: "EN", name: "English", native_name: "English", flag: "🇺🇸", voice: "alloy" },
    Language { code: "RU", name: "Russian", native_name: "Русский", flag: "🇷🇺", voice: "shimmer" },
    Language { code: "DE", name: "German", native_name: "Deutsch", flag: "🇩🇪", voice: "onyx" },
    Language { code: "FR", name: "French", native_name: "Français", flag: "🇫🇷", voice: "nova" },
    Language { code: "ES", name: "Spanish", native_name: "Español", flag: "🇪🇸", voice: "nova" },
    Language { code: "CS", name: "Czech", native_name: "Čeština", flag: "🇨🇿", voice: "fable" },
    Language { code: "PL", name: "Polish", native_name: "Polski", flag: "🇵🇱", voice: "echo" },
    Language { code: "LT", name: "Lithuanian", native_name: "Lietuvių", flag: "🇱🇹", voice: "alloy" },
    Language { code: "LV", name: "Latvian", native_name: "Latviešu", flag: "🇱🇻", voice: "alloy" },
    Language { code: "NO", name: "Norwegian", native_name: "Norsk", flag: "🇳🇴", voice: "onyx" },
];

/// Normalize a caller-supplied code: trim, drop any region suffix, upper-case.
///
/// `"de"`, `" DE "` and `"de-AT"` all become `"DE"`.
pub fn normalize_code(code: &str) -> String {
    code.trim()
        .split(|c| c == '-' || c == '_')
        .next()
        .unwrap_or_default()
        .to_uppercase()
}

/// Look up a language by (un-normalized) code.
pub fn find(code: &str) -> Option<&'static Language> {
    let normalized = normalize_code(code);
    SUPPORTED_LANGUAGES.iter().find(|lang| lang.code == normalized)
}

/// Like [`find`], failing with `UnsupportedLanguage` for unknown codes.
pub fn resolve(code: &str) -> AppResult<&'static Language> {
    find(code).ok_or_else(|| AppError::UnsupportedLanguage(normalize_code(code)))
}

pub fn supported_codes() -> Vec<&'static str> {
    SUPPORTED_LANGUAGES.iter().map(|lang| lang.code).collect()
}

/// Guess a language from the characters it uses.
///
/// Used only when the classification adapter is unavailable. The checks run in a fixed
/// order and the first alphabet with a hit wins, so characters shared by several
/// languages (`é`, `ó`, `ü`) go to the earliest of them.
pub fn detect_by_charset(text: &str) -> &'static str {
    let has_any = |chars: &str| text.chars().any(|c| chars.contains(c));

    if text.chars().any(|c| matches!(c, 'а'..='я' | 'А'..='Я' | 'ё' | 'Ё')) {
        "RU"
    } else if has_any("äöüßÄÖÜ") {
        "DE"
    } else if has_any("ąćęłńóśźżĄĆĘŁŃÓŚŹŻ") {
        "PL"
    } else if has_any("áéíóúñ¿¡") {
        "ES"
    } else if has_any("àâçéèêëîïôùûü") {
        "FR"
    } else {
        DEFAULT_LANGUAGE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("de"), "DE");
        assert_eq!(normalize_code("  en "), "EN");
        assert_eq!(normalize_code("de-AT"), "DE");
        assert_eq!(normalize_code("pt_BR"), "PT");
    }

    #[test]
    fn test_resolve_known_and_unknown() {
        assert_eq!(resolve("ru").unwrap().voice, "shimmer");
        assert!(matches!(resolve("xx"), Err(AppError::UnsupportedLanguage(code)) if code == "XX"));
    }

    #[test]
    fn test_detect_by_charset() {
        assert_eq!(detect_by_charset("Привет, как дела?"), "RU");
        assert_eq!(detect_by_charset("Schöne Grüße"), "DE");
        assert_eq!(detect_by_charset("Dzień dobry, łąka"), "PL");
        assert_eq!(detect_by_charset("¿Qué tal, señor?"), "ES");
        assert_eq!(detect_by_charset("Ça va très bien"), "FR");
        assert_eq!(detect_by_charset("hello there"), "EN");
    }

    #[test]
    fn test_detect_by_charset_single_accents() {
        assert_eq!(detect_by_charset("Ósemka"), "PL");
        assert_eq!(detect_by_charset("kto wie, dokąd"), "PL");
        assert_eq!(detect_by_charset("który"), "PL");
        assert_eq!(detect_by_charset("Está bien"), "ES");
        assert_eq!(detect_by_charset("así es"), "ES");
        assert_eq!(detect_by_charset("número uno"), "ES");
        assert_eq!(detect_by_charset("à bientôt"), "FR");
        assert_eq!(detect_by_charset("crème brûlée"), "ES");
        assert_eq!(detect_by_charset("le maître"), "FR");
    }
}
