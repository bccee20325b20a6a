//! Generator configuration loaded from YAML files and the environment.
//!
//! Everything lives under the `problem` section:
//!
//! ```yaml
//! problem:
//!   code:
//!     separator: "-"
//!     value_len: 3
//!     namespace:
//!       min_len: 2
//!       max_len: 8
//!       pattern: "^[A-Z]+$"
//!       charset: uppercase
//!   content_type: application/problem+json
//!   log_arg_key: problem
//!   stack: log
//!   uuid: [field, log]
//!   unwrap: propagated
//!   translations:
//!     default:
//!       user.not_found: User not found
//!     locales:
//!       fr:
//!         user.not_found: Utilisateur introuvable
//! ```
//!
//! Environment variables prefixed with `PROBLEM_` override file values, with
//! `__` separating nested keys (`PROBLEM_CODE__SEPARATOR=:`).

use std::collections::BTreeMap;
use std::path::Path;

use figment::Figment;
use figment::providers::{Env, Format, Yaml};
use figment::value::Uncased;
use serde::{Deserialize, Serialize};

use crate::code::{AllOf, CharValidator, CodeError, CodeSettings, LenBounds, PatternValidator};
use crate::flags::Flags;
use crate::generator::{Generator, is_valid_content_type};
use crate::i18n::StaticTranslator;
use crate::problem::ExtensionKeyError;
use crate::unwrap::Unwrapper;

/// Section holding the generator configuration.
pub const CONFIG_SECTION: &str = "problem";

/// Prefix of environment variables overriding the configuration.
pub const ENV_PREFIX: &str = "PROBLEM_";

/// Configuration error for generator and catalog loading
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("invalid problem configuration: {0}")]
    Figment(#[from] Box<figment::Error>),
    #[error("invalid namespace pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("invalid code settings: {0}")]
    InvalidCode(#[from] CodeError),
    #[error("invalid namespace length bounds (min {min}, max {max})")]
    InvalidNamespaceBounds { min: usize, max: usize },
    #[error("invalid extension in definition {definition:?}: {source}")]
    ExtensionKey {
        definition: String,
        #[source]
        source: ExtensionKeyError,
    },
    #[error("unsupported content type {0:?}")]
    InvalidContentType(String),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

/// Builds the layered configuration source: the YAML file at `path`, then
/// `PROBLEM_*` environment variables mapped into the [`CONFIG_SECTION`].
#[must_use]
pub fn figment(path: impl AsRef<Path>) -> Figment {
    Figment::new().merge(Yaml::file(path.as_ref())).merge(
        Env::prefixed(ENV_PREFIX)
            .split("__")
            .map(|key| Uncased::from_owned(format!("{CONFIG_SECTION}.{key}"))),
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Charset {
    Uppercase,
    Lowercase,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NamespaceConfig {
    pub min_len: Option<usize>,
    pub max_len: Option<usize>,
    pub pattern: Option<String>,
    pub charset: Option<Charset>,
}

impl NamespaceConfig {
    fn validator(&self) -> Result<Option<AllOf>, ConfigError> {
        let mut validators = AllOf::default();
        if self.min_len.is_some() || self.max_len.is_some() {
            let bounds = LenBounds::new(self.min_len.unwrap_or(1), self.max_len);
            let max = bounds.max.unwrap_or(usize::MAX);
            if bounds.min < 1 || max < bounds.min {
                return Err(ConfigError::InvalidNamespaceBounds {
                    min: bounds.min,
                    max,
                });
            }
            validators = validators.with(bounds);
        }
        if let Some(pattern) = &self.pattern {
            let validator =
                PatternValidator::new(pattern).map_err(|source| ConfigError::InvalidPattern {
                    pattern: pattern.clone(),
                    source,
                })?;
            validators = validators.with(validator);
        }
        validators = match self.charset {
            Some(Charset::Uppercase) => validators.with(CharValidator::uppercase()),
            Some(Charset::Lowercase) => validators.with(CharValidator::lowercase()),
            None => validators,
        };
        Ok((!validators.is_empty()).then_some(validators))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CodeConfig {
    pub separator: Option<char>,
    pub value_len: Option<usize>,
    pub namespace: NamespaceConfig,
}

impl CodeConfig {
    /// # Errors
    /// Returns [`ConfigError`] if the separator is not printable or the
    /// namespace rules are invalid.
    pub fn settings(&self) -> Result<CodeSettings, ConfigError> {
        let mut settings = CodeSettings {
            separator: self.separator,
            value_len: self.value_len,
            namespace_validator: None,
        };
        settings.resolve_separator()?;
        if let Some(validator) = self.namespace.validator()? {
            settings = settings.with_namespace_validator(validator);
        }
        Ok(settings)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnwrapMode {
    None,
    #[default]
    Propagated,
    All,
}

impl From<UnwrapMode> for Unwrapper {
    fn from(mode: UnwrapMode) -> Self {
        match mode {
            UnwrapMode::None => Unwrapper::None,
            UnwrapMode::Propagated => Unwrapper::Propagated,
            UnwrapMode::All => Unwrapper::All,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TranslationsConfig {
    pub default: BTreeMap<String, String>,
    pub locales: BTreeMap<String, BTreeMap<String, String>>,
}

impl TranslationsConfig {
    fn translator(&self) -> Option<StaticTranslator> {
        let translator = StaticTranslator::from_maps(self.default.clone(), self.locales.clone());
        (!translator.is_empty()).then_some(translator)
    }
}

/// Serializable form of a [`Generator`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    pub code: CodeConfig,
    pub content_type: Option<String>,
    pub log_arg_key: Option<String>,
    pub stack: Flags,
    pub uuid: Flags,
    pub unwrap: UnwrapMode,
    pub translations: TranslationsConfig,
}

impl GeneratorConfig {
    /// Extracts the [`CONFIG_SECTION`] of `figment`, falling back to the
    /// defaults when the section is absent.
    ///
    /// # Errors
    /// Returns [`ConfigError::Figment`] if the section cannot be deserialized.
    pub fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        if !figment.contains(CONFIG_SECTION) {
            tracing::debug!(section = CONFIG_SECTION, "problem config section absent, using defaults");
            return Ok(Self::default());
        }
        Ok(figment.extract_inner(CONFIG_SECTION)?)
    }

    /// Loads the configuration from the YAML file at `path` with environment
    /// overrides. A missing file only leaves the environment.
    ///
    /// # Errors
    /// Returns [`ConfigError::Figment`] if the file or the environment holds
    /// invalid values.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "loading problem config");
        Self::from_figment(&figment(path))
    }

    /// Validates the configuration and builds the [`Generator`] it describes.
    ///
    /// # Errors
    /// Returns [`ConfigError`] if the code settings are invalid or the content
    /// type is not a supported problem content type.
    pub fn build(&self) -> Result<Generator, ConfigError> {
        let generator = Generator::new()
            .with_code_settings(self.code.settings()?)
            .with_stack_flags(self.stack)
            .with_uuid_flags(self.uuid)
            .with_unwrapper(self.unwrap.into());

        let generator = if let Some(content_type) = &self.content_type {
            if !is_valid_content_type(content_type) {
                return Err(ConfigError::InvalidContentType(content_type.clone()));
            }
            generator.with_content_type(content_type.clone())
        } else {
            generator
        };
        let generator = if let Some(key) = self.log_arg_key.as_ref().filter(|k| !k.is_empty()) {
            generator.with_log_arg_key(key.clone())
        } else {
            generator
        };
        let generator = if let Some(translator) = self.translations.translator() {
            generator.with_translator(translator)
        } else {
            generator
        };

        tracing::debug!(
            stack = ?self.stack,
            uuid = ?self.uuid,
            unwrap = ?self.unwrap,
            "built problem generator from config"
        );
        Ok(generator)
    }
}
