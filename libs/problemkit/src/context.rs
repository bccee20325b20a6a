//! Per-resolution context handed to collaborators (translator, id generator, logger).

use http::Extensions;

/// Request-scoped values a [`Builder`](crate::Builder) passes to its
/// collaborators. Carries an optional locale and arbitrary typed values.
#[derive(Debug, Clone, Default)]
pub struct Context {
    locale: Option<String>,
    extensions: Extensions,
}

impl Context {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    /// Attaches a typed value, replacing any previous value of the same type.
    #[must_use]
    pub fn with_value<T>(mut self, value: T) -> Self
    where
        T: Clone + Send + Sync + 'static,
    {
        self.extensions.insert(value);
        self
    }

    #[must_use]
    pub fn locale(&self) -> Option<&str> {
        self.locale.as_deref()
    }

    #[must_use]
    pub fn value<T>(&self) -> Option<&T>
    where
        T: Send + Sync + 'static,
    {
        self.extensions.get::<T>()
    }
}
