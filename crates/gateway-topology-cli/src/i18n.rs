// crates/gateway-topology-cli/src/i18n.rs
// ============================================================================
// Module: CLI Internationalization Helpers
// Description: Provides message catalog and translation utilities for the CLI.
// Purpose: Centralize user-facing strings for localized output.
// Dependencies: Standard library collections.
// ============================================================================

//! ## Overview
//! The gateway topology CLI stores user-facing strings in a small translation
//! catalog. All runtime output is routed through the [`t!`](crate::t) macro.
//!
//! ## Invariants
//! - The locale is selected once and read-only thereafter.
//! - Missing keys fall back to English and then to the key itself.
//! - Placeholder substitutions preserve argument order.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::OnceLock;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Supported CLI locales.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Locale {
    /// English (default).
    En,
    /// Catalan.
    Ca,
}

impl Locale {
    /// Returns the canonical locale label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Ca => "ca",
        }
    }

    /// Attempts to parse a locale value (case-insensitive, tolerant of region tags).
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.split(['-', '_']).next() {
            Some("en") => Some(Self::En),
            Some("ca") => Some(Self::Ca),
            _ => None,
        }
    }
}

/// A formatted message argument captured by the [`macro@crate::t`] macro.
#[derive(Clone)]
pub struct MessageArg {
    /// Placeholder name without braces (e.g., `"path"`).
    pub key: &'static str,
    /// Preformatted value substituted for the placeholder.
    pub value: String,
}

impl MessageArg {
    /// Constructs a new [`MessageArg`] from a key and value.
    pub fn new(key: &'static str, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }
}

// ============================================================================
// SECTION: Locale Selection
// ============================================================================

/// Global locale selection for CLI output.
static CURRENT_LOCALE: OnceLock<Locale> = OnceLock::new();

/// Sets the CLI locale. Only the first call wins.
pub fn set_locale(locale: Locale) {
    let _ = CURRENT_LOCALE.set(locale);
}

/// Returns the current CLI locale (defaults to English).
#[must_use]
pub fn current_locale() -> Locale {
    CURRENT_LOCALE.get().copied().unwrap_or(Locale::En)
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// English catalog entries.
const CATALOG_EN: &[(&str, &str)] = &[
    ("main.version", "gateway-topology {version}"),
    ("output.stream.stdout", "stdout"),
    ("output.stream.stderr", "stderr"),
    ("output.stream.unknown", "output"),
    ("output.write_failed", "Failed to write to {stream}: {error}"),
    ("output.json_failed", "Failed to render JSON: {error}"),
    ("config.load_failed", "Failed to load config: {error}"),
    ("config.validate.ok", "Config is valid."),
    ("config.environment_failed", "Failed to resolve deployment environment: {error}"),
    ("assets.root_failed", "Failed to determine the asset root: {error}"),
    ("assets.open_failed", "Failed to open asset root {path}: {error}"),
    ("audit.open_failed", "Failed to open audit log {path}: {error}"),
    ("compose.failed", "Composition failed ({kind}): {error}"),
    ("synth.write_failed", "Failed to write manifest to {path}: {error}"),
    ("synth.written", "Wrote manifest {fingerprint} to {path}"),
    ("order.failed", "Failed to compute build order: {error}"),
    ("gateway.missing", "The topology declares no gateway."),
    ("url.missing", "The topology exposes no URL output."),
    ("stage.not_found", "Stage {stage} is not declared on gateway {gateway}."),
    ("stage.unbound", "Stage {stage} is not bound to a deployment."),
    ("resolve.no_match", "No route matches {method} {path} on stage {stage}."),
    ("request.invalid", "Invalid request: {error}"),
    ("invoke.key_not_found", "API key {name} is not declared."),
    ("i18n.lang.invalid_env", "Invalid value for {env}: {value}. Expected 'en' or 'ca'."),
    (
        "i18n.disclaimer.machine_translated",
        "Note: non-English output is machine-translated and may be inaccurate.",
    ),
];

/// Catalan catalog entries.
const CATALOG_CA: &[(&str, &str)] = &[
    ("main.version", "gateway-topology {version}"),
    ("output.stream.stdout", "stdout"),
    ("output.stream.stderr", "stderr"),
    ("output.stream.unknown", "sortida"),
    ("output.write_failed", "No s'ha pogut escriure a {stream}: {error}"),
    ("output.json_failed", "No s'ha pogut generar el JSON: {error}"),
    ("config.load_failed", "No s'ha pogut carregar la configuració: {error}"),
    ("config.validate.ok", "La configuració és vàlida."),
    ("config.environment_failed", "No s'ha pogut resoldre l'entorn de desplegament: {error}"),
    ("assets.root_failed", "No s'ha pogut determinar l'arrel d'actius: {error}"),
    ("assets.open_failed", "No s'ha pogut obrir l'arrel d'actius {path}: {error}"),
    ("audit.open_failed", "No s'ha pogut obrir el registre d'auditoria {path}: {error}"),
    ("compose.failed", "La composició ha fallat ({kind}): {error}"),
    ("synth.write_failed", "No s'ha pogut escriure el manifest a {path}: {error}"),
    ("synth.written", "S'ha escrit el manifest {fingerprint} a {path}"),
    ("order.failed", "No s'ha pogut calcular l'ordre de construcció: {error}"),
    ("gateway.missing", "La topologia no declara cap passarel·la."),
    ("url.missing", "La topologia no exposa cap sortida URL."),
    ("stage.not_found", "L'etapa {stage} no està declarada a la passarel·la {gateway}."),
    ("stage.unbound", "L'etapa {stage} no està vinculada a cap desplegament."),
    ("resolve.no_match", "Cap ruta coincideix amb {method} {path} a l'etapa {stage}."),
    ("request.invalid", "Sol·licitud no vàlida: {error}"),
    ("invoke.key_not_found", "La clau d'API {name} no està declarada."),
    ("i18n.lang.invalid_env", "Valor no vàlid per a {env}: {value}. S'esperava 'en' o 'ca'."),
    (
        "i18n.disclaimer.machine_translated",
        "Nota: la sortida que no és en anglès està traduïda automàticament i pot ser inexacta.",
    ),
];

/// Returns the message catalog for the requested locale.
pub(crate) fn catalog_for(locale: Locale) -> &'static HashMap<&'static str, &'static str> {
    static CATALOG_EN_MAP: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    static CATALOG_CA_MAP: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    match locale {
        Locale::En => CATALOG_EN_MAP.get_or_init(|| CATALOG_EN.iter().copied().collect()),
        Locale::Ca => CATALOG_CA_MAP.get_or_init(|| CATALOG_CA.iter().copied().collect()),
    }
}

// ============================================================================
// SECTION: Translation
// ============================================================================

/// Translates `key` using the selected locale while substituting `args`.
#[must_use]
pub fn translate(key: &str, args: Vec<MessageArg>) -> String {
    translate_for(current_locale(), key, args)
}

/// Translates `key` for an explicit `locale`.
#[must_use]
pub fn translate_for(locale: Locale, key: &str, args: Vec<MessageArg>) -> String {
    let template = catalog_for(locale)
        .get(key)
        .copied()
        .or_else(|| catalog_for(Locale::En).get(key).copied())
        .unwrap_or(key);
    let mut result = template.to_string();
    for arg in args {
        let placeholder = format!("{{{}}}", arg.key);
        result = result.replace(&placeholder, &arg.value);
    }
    result
}

// ============================================================================
// SECTION: Macro
// ============================================================================

/// Formats a localized message from a key and named arguments.
///
/// # Arguments
///
/// - `$key` must match a catalog entry.
/// - Named arguments are substituted into `{placeholder}` positions.
#[macro_export]
macro_rules! t {
    ($key:literal $(, $name:ident = $value:expr )* $(,)?) => {{
        let args = ::std::vec![
            $(
                $crate::i18n::MessageArg::new(stringify!($name), $value.to_string()),
            )*
        ];
        $crate::i18n::translate($key, args)
    }};
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic_in_result_fn,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test assertions may panic inside Result-returning tests."
    )]

    use super::*;

    #[test]
    fn catalogs_share_keys() {
        let en = catalog_for(Locale::En);
        let ca = catalog_for(Locale::Ca);
        for key in en.keys() {
            assert!(ca.contains_key(key), "catalan catalog is missing {key}");
        }
        assert_eq!(en.len(), ca.len());
    }

    #[test]
    fn placeholders_are_substituted() {
        let message = translate_for(Locale::En, "stage.unbound", vec![MessageArg::new(
            "stage", "prod",
        )]);
        assert_eq!(message, "Stage prod is not bound to a deployment.");
    }

    #[test]
    fn unknown_key_falls_back_to_key() {
        assert_eq!(translate_for(Locale::Ca, "no.such.key", Vec::new()), "no.such.key");
    }

    #[test]
    fn locale_parse_accepts_region_tags() {
        assert_eq!(Locale::parse("ca_ES"), Some(Locale::Ca));
        assert_eq!(Locale::parse("EN-us"), Some(Locale::En));
        assert_eq!(Locale::parse("fr"), None);
    }
}
