//! Namespaced problem codes (`<namespace><separator><value>`).
//!
//! A [`Code`] identifies a specific kind of occurrence so that clients can
//! react to it without relying on status, title or type alone. Codes are
//! usually built and parsed through a [`Coder`] so that every code issued by a
//! [`Generator`](crate::Generator) follows the same separator, value length and
//! namespace rules.

use std::fmt;
use std::num::ParseIntError;
use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::generator::Generator;

/// Separator used between namespace and value when none is configured.
pub const DEFAULT_CODE_SEPARATOR: char = '-';

/// Opaque problem code, e.g. `"USER-404"`. May be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Code(String);

impl Code {
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Code {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Code {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for Code {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Everything recovered from a code by [`Coder::parse`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedCode {
    /// The code that was parsed.
    pub code: Code,
    /// Namespace found before the first separator.
    pub namespace: String,
    /// Numeric value found after the first separator.
    pub value: u64,
}

/// Why a namespace validator rejected a namespace.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NamespaceRejection {
    #[error("namespace length bounds are invalid (min {min}, max {max})")]
    InvalidBounds { min: usize, max: usize },
    #[error("namespace contains too few characters (want {min}, got {len}): {namespace:?}")]
    TooShort {
        namespace: String,
        min: usize,
        len: usize,
    },
    #[error("namespace contains too many characters (want {max}, got {len}): {namespace:?}")]
    TooLong {
        namespace: String,
        max: usize,
        len: usize,
    },
    #[error("namespace does not match pattern {pattern:?}: {namespace:?}")]
    PatternMismatch { namespace: String, pattern: String },
    #[error(
        "namespace contains invalid character at index {index} (want {expected:?}, got {found:?}): {namespace:?}"
    )]
    InvalidChar {
        namespace: String,
        index: usize,
        expected: char,
        found: char,
    },
    #[error("{0}")]
    Custom(String),
}

/// Every way building or parsing a [`Code`] can fail.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodeError {
    #[error("invalid problem code: separator {0:?} is not printable")]
    NonPrintableSeparator(char),
    #[error("invalid problem code: separator {separator:?} not found: {code:?}")]
    SeparatorNotFound { separator: char, code: String },
    #[error("invalid problem code: namespace is empty")]
    EmptyNamespace,
    #[error("invalid problem code: namespace contains separator {separator:?}: {namespace:?}")]
    NamespaceContainsSeparator { namespace: String, separator: char },
    #[error("invalid problem code: {0}")]
    NamespaceRejected(#[from] NamespaceRejection),
    #[error("invalid problem code: unexpected namespace (want {expected:?}, got {actual:?}): {code:?}")]
    UnexpectedNamespace {
        code: String,
        expected: String,
        actual: String,
    },
    #[error("invalid problem code: value is empty")]
    EmptyValue,
    #[error("invalid problem code: value contains too many digits (want {max}, got {len}): {value:?}")]
    ValueTooLong { value: String, max: usize, len: usize },
    #[error("invalid problem code: value cannot be parsed: {code:?}: {source}")]
    UnparsableValue {
        code: String,
        #[source]
        source: ParseIntError,
    },
}

/// Parse failure carrying whatever was recovered before the failure.
///
/// The partial [`ParsedCode`] is only trustworthy for the fields that were
/// reached before `kind` was raised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}")]
pub struct ParseCodeError {
    pub kind: CodeError,
    pub partial: ParsedCode,
}

impl ParseCodeError {
    #[must_use]
    pub fn kind(&self) -> &CodeError {
        &self.kind
    }

    #[must_use]
    pub fn partial(&self) -> &ParsedCode {
        &self.partial
    }
}

/// Additional validation applied to a code namespace.
///
/// Validators never see the separator: a namespace containing it is rejected
/// before any validator runs.
pub trait NamespaceValidator: Send + Sync {
    /// # Errors
    /// Returns a [`NamespaceRejection`] describing why `namespace` is invalid.
    fn validate(&self, namespace: &str) -> Result<(), NamespaceRejection>;
}

impl<F> NamespaceValidator for F
where
    F: Fn(&str) -> Result<(), NamespaceRejection> + Send + Sync,
{
    fn validate(&self, namespace: &str) -> Result<(), NamespaceRejection> {
        self(namespace)
    }
}

/// Character-count bounds for a namespace. `max` is unbounded when `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LenBounds {
    pub min: usize,
    pub max: Option<usize>,
}

impl LenBounds {
    #[must_use]
    pub const fn new(min: usize, max: Option<usize>) -> Self {
        Self { min, max }
    }
}

impl NamespaceValidator for LenBounds {
    fn validate(&self, namespace: &str) -> Result<(), NamespaceRejection> {
        let max = self.max.unwrap_or(usize::MAX);
        if self.min < 1 || max < self.min {
            return Err(NamespaceRejection::InvalidBounds { min: self.min, max });
        }
        let len = namespace.chars().count();
        if len < self.min {
            return Err(NamespaceRejection::TooShort {
                namespace: namespace.to_owned(),
                min: self.min,
                len,
            });
        }
        if len > max {
            return Err(NamespaceRejection::TooLong {
                namespace: namespace.to_owned(),
                max,
                len,
            });
        }
        Ok(())
    }
}

/// Requires the namespace to match a regular expression.
#[derive(Debug, Clone)]
pub struct PatternValidator {
    regex: Regex,
}

impl PatternValidator {
    /// # Errors
    /// Returns the regex compilation error if `pattern` is not a valid expression.
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
        })
    }
}

impl NamespaceValidator for PatternValidator {
    fn validate(&self, namespace: &str) -> Result<(), NamespaceRejection> {
        if self.regex.is_match(namespace) {
            Ok(())
        } else {
            Err(NamespaceRejection::PatternMismatch {
                namespace: namespace.to_owned(),
                pattern: self.regex.as_str().to_owned(),
            })
        }
    }
}

/// Requires every character to satisfy `predicate`; `expected` maps an
/// offending character to the one that would have been accepted.
#[derive(Debug, Clone, Copy)]
pub struct CharValidator {
    pub predicate: fn(char) -> bool,
    pub expected: fn(char) -> char,
}

impl CharValidator {
    /// Accepts uppercase characters only.
    #[must_use]
    pub const fn uppercase() -> Self {
        Self {
            predicate: char::is_uppercase,
            expected: to_upper,
        }
    }

    /// Accepts lowercase characters only.
    #[must_use]
    pub const fn lowercase() -> Self {
        Self {
            predicate: char::is_lowercase,
            expected: to_lower,
        }
    }
}

fn to_upper(c: char) -> char {
    c.to_uppercase().next().unwrap_or(c)
}

fn to_lower(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

impl NamespaceValidator for CharValidator {
    fn validate(&self, namespace: &str) -> Result<(), NamespaceRejection> {
        match namespace
            .chars()
            .enumerate()
            .find(|(_, c)| !(self.predicate)(*c))
        {
            Some((index, found)) => Err(NamespaceRejection::InvalidChar {
                namespace: namespace.to_owned(),
                index,
                expected: (self.expected)(found),
                found,
            }),
            None => Ok(()),
        }
    }
}

/// Runs each validator in order and stops at the first rejection.
#[derive(Clone, Default)]
pub struct AllOf(Vec<Arc<dyn NamespaceValidator>>);

impl AllOf {
    #[must_use]
    pub fn new(validators: Vec<Arc<dyn NamespaceValidator>>) -> Self {
        Self(validators)
    }

    #[must_use]
    pub fn with(mut self, validator: impl NamespaceValidator + 'static) -> Self {
        self.0.push(Arc::new(validator));
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl NamespaceValidator for AllOf {
    fn validate(&self, namespace: &str) -> Result<(), NamespaceRejection> {
        self.0.iter().try_for_each(|v| v.validate(namespace))
    }
}

/// Code-related settings of a [`Generator`].
#[derive(Clone, Default)]
pub struct CodeSettings {
    /// Separator between namespace and value; [`DEFAULT_CODE_SEPARATOR`] when `None`.
    pub separator: Option<char>,
    /// Maximum digits in a value; shorter values are right-padded with `'0'`.
    pub value_len: Option<usize>,
    pub namespace_validator: Option<Arc<dyn NamespaceValidator>>,
}

impl fmt::Debug for CodeSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodeSettings")
            .field("separator", &self.separator)
            .field("value_len", &self.value_len)
            .field("namespace_validator", &self.namespace_validator.is_some())
            .finish()
    }
}

impl CodeSettings {
    #[must_use]
    pub fn with_separator(mut self, separator: char) -> Self {
        self.separator = Some(separator);
        self
    }

    #[must_use]
    pub fn with_value_len(mut self, value_len: usize) -> Self {
        self.value_len = Some(value_len);
        self
    }

    #[must_use]
    pub fn with_namespace_validator(mut self, validator: impl NamespaceValidator + 'static) -> Self {
        self.namespace_validator = Some(Arc::new(validator));
        self
    }

    /// Returns a [`Coder`] bound to these settings, optionally expecting `namespace`.
    #[must_use]
    pub fn coder(&self, namespace: Option<&str>) -> Coder<'_> {
        Coder {
            settings: self,
            namespace: namespace.map(ToOwned::to_owned),
        }
    }

    /// # Errors
    /// Returns [`CodeError::NonPrintableSeparator`] if the configured separator is not printable.
    pub fn resolve_separator(&self) -> Result<char, CodeError> {
        match self.separator {
            None => Ok(DEFAULT_CODE_SEPARATOR),
            Some(sep) if is_printable(sep) => Ok(sep),
            Some(sep) => Err(CodeError::NonPrintableSeparator(sep)),
        }
    }

    fn check_namespace(&self, namespace: &str, separator: char) -> Result<(), CodeError> {
        if namespace.is_empty() {
            return Err(CodeError::EmptyNamespace);
        }
        if namespace.contains(separator) {
            return Err(CodeError::NamespaceContainsSeparator {
                namespace: namespace.to_owned(),
                separator,
            });
        }
        if let Some(validator) = &self.namespace_validator {
            validator.validate(namespace)?;
        }
        Ok(())
    }

    fn check_value(&self, value: &str) -> Result<(), CodeError> {
        if value.is_empty() {
            return Err(CodeError::EmptyValue);
        }
        if let Some(max) = self.value_len.filter(|max| *max > 0)
            && value.len() > max
        {
            return Err(CodeError::ValueTooLong {
                value: value.to_owned(),
                max,
                len: value.len(),
            });
        }
        Ok(())
    }
}

/// Printable in the sense of letters, marks, numbers, punctuation, symbols and
/// the ASCII space.
fn is_printable(c: char) -> bool {
    c == ' ' || !(c.is_control() || c.is_whitespace() || c == char::REPLACEMENT_CHARACTER)
}

/// Builds and parses codes using a [`CodeSettings`].
#[derive(Debug, Clone)]
pub struct Coder<'a> {
    settings: &'a CodeSettings,
    namespace: Option<String>,
}

impl Coder<'_> {
    /// Builds `<namespace><separator><value>`.
    ///
    /// # Errors
    /// Returns [`CodeError`] when the separator is not printable, no namespace
    /// was given to the coder, the namespace is rejected, or the value has more
    /// digits than allowed.
    pub fn build(&self, value: u64) -> Result<Code, CodeError> {
        let separator = self.settings.resolve_separator()?;

        let mut digits = value.to_string();
        self.settings.check_value(&digits)?;
        if let Some(len) = self.settings.value_len {
            while digits.len() < len {
                digits.push('0');
            }
        }

        let namespace = self.namespace.as_deref().unwrap_or_default();
        self.settings.check_namespace(namespace, separator)?;

        let mut code = String::with_capacity(namespace.len() + separator.len_utf8() + digits.len());
        code.push_str(namespace);
        code.push(separator);
        code.push_str(&digits);
        Ok(Code(code))
    }

    /// Parses `code`, splitting on the first separator.
    ///
    /// # Errors
    /// Returns [`ParseCodeError`] carrying the partially parsed code when the
    /// separator is missing or invalid, the namespace is rejected or
    /// unexpected, or the value is empty, too long or not a number.
    pub fn parse(&self, code: &str) -> Result<ParsedCode, ParseCodeError> {
        let mut parsed = ParsedCode {
            code: Code::from(code),
            ..ParsedCode::default()
        };
        let fail = |kind: CodeError, partial: ParsedCode| ParseCodeError { kind, partial };

        let separator = match self.settings.resolve_separator() {
            Ok(sep) => sep,
            Err(kind) => return Err(fail(kind, parsed)),
        };
        let Some((namespace, value)) = code.split_once(separator) else {
            return Err(fail(
                CodeError::SeparatorNotFound {
                    separator,
                    code: code.to_owned(),
                },
                parsed,
            ));
        };

        parsed.namespace = namespace.to_owned();
        if let Err(kind) = self.settings.check_namespace(namespace, separator) {
            return Err(fail(kind, parsed));
        }
        if let Some(expected) = self.namespace.as_deref()
            && !expected.is_empty()
            && expected != namespace
        {
            return Err(fail(
                CodeError::UnexpectedNamespace {
                    code: code.to_owned(),
                    expected: expected.to_owned(),
                    actual: namespace.to_owned(),
                },
                parsed,
            ));
        }

        if let Err(kind) = self.settings.check_value(value) {
            return Err(fail(kind, parsed));
        }
        match value.parse::<u64>() {
            Ok(v) => {
                parsed.value = v;
                Ok(parsed)
            }
            Err(source) => Err(fail(
                CodeError::UnparsableValue {
                    code: code.to_owned(),
                    source,
                },
                parsed,
            )),
        }
    }

    /// # Errors
    /// Returns the [`CodeError`] that [`Coder::parse`] would report.
    pub fn validate(&self, code: &str) -> Result<(), CodeError> {
        self.parse(code).map(drop).map_err(|e| e.kind)
    }

    /// # Errors
    /// Returns [`CodeError`] if the separator is invalid or `namespace` is rejected.
    pub fn validate_namespace(&self, namespace: &str) -> Result<(), CodeError> {
        let separator = self.settings.resolve_separator()?;
        self.settings.check_namespace(namespace, separator)
    }

    /// # Errors
    /// Returns [`CodeError::ValueTooLong`] if `value` has more digits than allowed.
    pub fn validate_value(&self, value: u64) -> Result<(), CodeError> {
        self.settings.check_value(&value.to_string())
    }
}

/// Builds a code in `namespace` using the global generator.
///
/// # Errors
/// See [`Coder::build`].
pub fn build_code(namespace: &str, value: u64) -> Result<Code, CodeError> {
    Generator::global().coder(Some(namespace)).build(value)
}

/// Parses a code using the global generator, optionally expecting `namespace`.
///
/// # Errors
/// See [`Coder::parse`].
pub fn parse_code(code: &str, namespace: Option<&str>) -> Result<ParsedCode, ParseCodeError> {
    Generator::global().coder(namespace).parse(code)
}

/// Validates a code using the global generator, optionally expecting `namespace`.
///
/// # Errors
/// See [`Coder::validate`].
pub fn validate_code(code: &str, namespace: Option<&str>) -> Result<(), CodeError> {
    Generator::global().coder(namespace).validate(code)
}
