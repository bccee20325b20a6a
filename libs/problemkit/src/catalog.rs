//! Named [`Definition`]s declared in configuration.

use std::collections::BTreeMap;
use std::path::Path;

use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::builder::Builder;
use crate::config::{ConfigError, figment};
use crate::definition::Definition;
use crate::generator::Generator;
use crate::option::ProblemOption;
use crate::problem::Problem;

/// Section holding the catalog.
pub const CATALOG_SECTION: &str = "definitions";

/// Definitions looked up by name.
///
/// ```yaml
/// definitions:
///   user_not_found:
///     code: USER-404
///     detailKey: user.not_found
///     type:
///       status: 404
///       title: Not Found
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    definitions: BTreeMap<String, Definition>,
}

impl Catalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Extracts the [`CATALOG_SECTION`] of `figment`; an absent section gives
    /// an empty catalog.
    ///
    /// # Errors
    /// Returns [`ConfigError::Figment`] if the section cannot be deserialized
    /// and [`ConfigError::ExtensionKey`] if a definition carries an empty or
    /// reserved extension key.
    pub fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        if !figment.contains(CATALOG_SECTION) {
            return Ok(Self::default());
        }
        let catalog: Self = figment.extract_inner(CATALOG_SECTION)?;
        catalog.validate()?;
        tracing::debug!(definitions = catalog.len(), "loaded problem catalog");
        Ok(catalog)
    }

    /// Loads the catalog from the YAML file at `path` with environment
    /// overrides.
    ///
    /// # Errors
    /// See [`Catalog::from_figment`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_figment(&figment(path))
    }

    /// # Errors
    /// Returns [`ConfigError::ExtensionKey`] for the first definition carrying
    /// an empty or reserved extension key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.definitions
            .iter()
            .try_for_each(|(name, definition)| check_extensions(name, definition))
    }

    /// Adds or replaces the definition named `name`.
    ///
    /// # Errors
    /// Returns [`ConfigError::ExtensionKey`] if the definition carries an
    /// empty or reserved extension key; the catalog is left unchanged.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        definition: Definition,
    ) -> Result<Option<Definition>, ConfigError> {
        let name = name.into();
        check_extensions(&name, &definition)?;
        Ok(self.definitions.insert(name, definition))
    }

    /// Merges `other` into this catalog; definitions in `other` win.
    pub fn extend(&mut self, other: Catalog) {
        self.definitions.extend(other.definitions);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Definition> {
        self.definitions.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Builder defaulting to the definition named `name`, if any.
    #[must_use]
    pub fn builder<'g>(&self, name: &str, generator: &'g Generator) -> Option<Builder<'g>> {
        self.get(name).map(|definition| definition.builder(generator))
    }

    /// Resolves a problem from the definition named `name` and `options`.
    #[must_use]
    pub fn new_problem(
        &self,
        name: &str,
        generator: &Generator,
        options: impl IntoIterator<Item = ProblemOption>,
    ) -> Option<Problem> {
        self.get(name)
            .map(|definition| definition.new_problem(generator, options))
    }
}

fn check_extensions(name: &str, definition: &Definition) -> Result<(), ConfigError> {
    definition
        .validate_extensions()
        .map_err(|source| ConfigError::ExtensionKey {
            definition: name.to_owned(),
            source,
        })
}
