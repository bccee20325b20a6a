//! Localization of titles and details.

use std::collections::BTreeMap;

use crate::context::Context;

/// Looks up the localized value of a translation key.
///
/// An empty string means no localized value exists; the builder then falls
/// back to the next candidate for the field. Implementations must not fail.
pub trait Translator: Send + Sync {
    fn translate(&self, ctx: &Context, key: &str) -> String;
}

impl<F> Translator for F
where
    F: Fn(&Context, &str) -> String + Send + Sync,
{
    fn translate(&self, ctx: &Context, key: &str) -> String {
        self(ctx, key)
    }
}

/// In-memory translations with optional per-locale overrides.
///
/// The context locale is tried first (`"fr-CA"`, then its primary language
/// `"fr"`), followed by the default entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticTranslator {
    default: BTreeMap<String, String>,
    locales: BTreeMap<String, BTreeMap<String, String>>,
}

impl StaticTranslator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_maps(
        default: BTreeMap<String, String>,
        locales: BTreeMap<String, BTreeMap<String, String>>,
    ) -> Self {
        Self { default, locales }
    }

    #[must_use]
    pub fn with_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.default.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_locale_entry(
        mut self,
        locale: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.locales
            .entry(locale.into())
            .or_default()
            .insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.default.is_empty() && self.locales.values().all(BTreeMap::is_empty)
    }

    fn lookup_locale(&self, locale: &str, key: &str) -> Option<&String> {
        self.locales
            .get(locale)
            .and_then(|entries| entries.get(key))
            .or_else(|| {
                let (language, _) = locale.split_once(['-', '_'])?;
                self.locales.get(language)?.get(key)
            })
    }
}

impl Translator for StaticTranslator {
    fn translate(&self, ctx: &Context, key: &str) -> String {
        ctx.locale()
            .and_then(|locale| self.lookup_locale(locale, key))
            .or_else(|| self.default.get(key))
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn translator() -> StaticTranslator {
        StaticTranslator::new()
            .with_entry("user.not_found", "User not found")
            .with_locale_entry("fr", "user.not_found", "Utilisateur introuvable")
            .with_locale_entry("fr-CA", "user.gone", "Usager parti")
    }

    #[test]
    fn prefers_exact_locale_then_language_then_default() {
        let t = translator();
        let ca = Context::new().with_locale("fr-CA");
        assert_eq!(t.translate(&ca, "user.gone"), "Usager parti");
        assert_eq!(t.translate(&ca, "user.not_found"), "Utilisateur introuvable");
        let de = Context::new().with_locale("de");
        assert_eq!(t.translate(&de, "user.not_found"), "User not found");
    }

    #[test]
    fn misses_translate_to_empty() {
        assert_eq!(translator().translate(&Context::new(), "missing"), "");
        assert!(StaticTranslator::new().is_empty());
    }
}
