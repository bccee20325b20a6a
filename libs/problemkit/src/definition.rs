//! Reusable templates a [`Builder`] falls back to for fields that are neither
//! set explicitly nor inherited.

use serde::{Deserialize, Serialize};

use crate::builder::Builder;
use crate::code::Code;
use crate::context::Context;
use crate::generator::Generator;
use crate::log::LogLevel;
use crate::option::ProblemOption;
use crate::problem::{ExtensionKeyError, Extensions, Problem, validate_extension_key};

/// Defaults describing a kind of problem.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[must_use]
pub struct ProblemType {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<LogLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Translation key of the title; a translation, when found, beats `title`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

impl ProblemType {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = Some(level);
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_title_key(mut self, key: impl Into<String>) -> Self {
        self.title_key = Some(key.into());
        self
    }

    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    /// Returns a builder using this type as its defaults.
    pub fn builder<'g>(&self, generator: &'g Generator) -> Builder<'g> {
        generator.builder().problem_type(self.clone())
    }

    /// Resolves a problem from this type and `options`, applied in order.
    pub fn new_problem(
        &self,
        generator: &Generator,
        options: impl IntoIterator<Item = ProblemOption>,
    ) -> Problem {
        generator.new_problem_with_context(
            Context::new(),
            std::iter::once(ProblemOption::from_type(self.clone())).chain(options),
        )
    }
}

/// Defaults describing a specific problem, including its [`ProblemType`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[must_use]
pub struct Definition {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<Code>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Translation key of the detail; a translation, when found, beats `detail`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Extensions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    #[serde(rename = "type")]
    pub problem_type: ProblemType,
}

impl Definition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_code(mut self, code: impl Into<Code>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_detail_key(mut self, key: impl Into<String>) -> Self {
        self.detail_key = Some(key.into());
        self
    }

    /// # Panics
    /// Panics if any key is empty or reserved; see
    /// [`Definition::try_with_extensions`].
    pub fn with_extensions(self, extensions: Extensions) -> Self {
        match self.try_with_extensions(extensions) {
            Ok(definition) => definition,
            Err(e) => panic!("{e}"),
        }
    }

    /// # Errors
    /// Returns [`ExtensionKeyError`] for the first empty or reserved key.
    pub fn try_with_extensions(mut self, extensions: Extensions) -> Result<Self, ExtensionKeyError> {
        extensions.keys().try_for_each(|key| validate_extension_key(key))?;
        self.extensions = Some(extensions);
        Ok(self)
    }

    /// Checks the extension keys of a definition built field by field or
    /// deserialized.
    ///
    /// # Errors
    /// Returns [`ExtensionKeyError`] for the first empty or reserved key.
    pub fn validate_extensions(&self) -> Result<(), ExtensionKeyError> {
        self.extensions
            .iter()
            .flat_map(|extensions| extensions.keys())
            .try_for_each(|key| validate_extension_key(key))
    }

    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }

    pub fn with_type(mut self, problem_type: ProblemType) -> Self {
        self.problem_type = problem_type;
        self
    }

    /// Returns a builder using this definition as its defaults.
    ///
    /// Panics like [`Builder::definition`] on a reserved extension key.
    pub fn builder<'g>(&self, generator: &'g Generator) -> Builder<'g> {
        generator.builder().definition(self.clone())
    }

    /// Resolves a problem from this definition and `options`, applied in order.
    pub fn new_problem(
        &self,
        generator: &Generator,
        options: impl IntoIterator<Item = ProblemOption>,
    ) -> Problem {
        generator.new_problem_with_context(
            Context::new(),
            std::iter::once(ProblemOption::from_definition(self.clone())).chain(options),
        )
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn definitions_use_camel_case_keys() {
        let def: Definition = serde_json::from_value(json!({
            "code": "USER-404",
            "detailKey": "user.not_found",
            "type": {
                "status": 404,
                "title": "Not Found",
                "titleKey": "http.404",
                "logLevel": "warn"
            }
        }))
        .unwrap();
        assert_eq!(def.code, Some(Code::from("USER-404")));
        assert_eq!(def.detail_key.as_deref(), Some("user.not_found"));
        assert_eq!(def.problem_type.status, Some(404));
        assert_eq!(def.problem_type.title_key.as_deref(), Some("http.404"));
        assert_eq!(def.problem_type.log_level, Some(LogLevel::Warn));

        let value = serde_json::to_value(ProblemType::new().with_status(409)).unwrap();
        assert_eq!(value, json!({ "status": 409 }));
    }

    #[test]
    fn definition_new_problem_applies_options_last() {
        let def = Definition::new()
            .with_detail("from definition")
            .with_type(ProblemType::new().with_status(404));
        let p = def.new_problem(
            &Generator::new(),
            [ProblemOption::with_detail("from option")],
        );
        assert_eq!(p.status(), 404);
        assert_eq!(p.detail(), "from option");
    }

    #[test]
    fn type_builder_uses_type_defaults() {
        let p = ProblemType::new()
            .with_status(503)
            .with_uri("https://errors.example.com/unavailable")
            .builder(&Generator::new())
            .into_problem();
        assert_eq!(p.status(), 503);
        assert_eq!(p.type_uri(), "https://errors.example.com/unavailable");
        assert_eq!(p.title(), "Unknown Error");
    }

    #[test]
    fn reserved_extension_keys_fail_at_construction() {
        let mut extensions = Extensions::new();
        extensions.insert("status".to_owned(), json!("shadow"));
        let err = Definition::new()
            .try_with_extensions(extensions.clone())
            .unwrap_err();
        assert_eq!(err, ExtensionKeyError::Reserved("status".to_owned()));

        let deserialized: Definition =
            serde_json::from_value(json!({ "extensions": { "status": "shadow" } })).unwrap();
        assert!(deserialized.validate_extensions().is_err());
        assert!(
            Generator::new()
                .builder()
                .try_definition(deserialized)
                .is_err()
        );
    }

    #[test]
    #[should_panic(expected = "extension key is reserved")]
    fn builder_panics_on_reserved_definition_extension() {
        let definition = Definition {
            extensions: Some([("type".to_owned(), json!("x"))].into_iter().collect()),
            ..Definition::default()
        };
        drop(definition.builder(&Generator::new()));
    }
}
