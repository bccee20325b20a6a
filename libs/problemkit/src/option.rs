//! Deferred builder configuration.
//!
//! A [`ProblemOption`] is one [`Builder`] setter captured as a value, so that
//! callers can assemble a list of options and hand it to
//! [`Generator::new_problem`](crate::Generator::new_problem) or
//! [`Definition::new_problem`]. Options apply in order; a later option
//! overrides an earlier one for the same field.

use std::error::Error;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::builder::Builder;
use crate::code::Code;
use crate::context::Context;
use crate::definition::{Definition, ProblemType};
use crate::flags::Flags;
use crate::log::LogLevel;
use crate::problem::Extensions;
use crate::unwrap::Unwrapper;

type ApplyFn = dyn for<'g> FnOnce(Builder<'g>) -> Builder<'g> + Send;

#[must_use]
pub struct ProblemOption(Box<ApplyFn>);

impl fmt::Debug for ProblemOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ProblemOption(..)")
    }
}

impl ProblemOption {
    pub fn new<F>(f: F) -> Self
    where
        F: for<'g> FnOnce(Builder<'g>) -> Builder<'g> + Send + 'static,
    {
        Self(Box::new(f))
    }

    pub fn apply<'g>(self, builder: Builder<'g>) -> Builder<'g> {
        (self.0)(builder)
    }

    pub fn from_definition(definition: Definition) -> Self {
        Self::new(move |b| b.definition(definition))
    }

    pub fn from_type(problem_type: ProblemType) -> Self {
        Self::new(move |b| b.problem_type(problem_type))
    }

    pub fn with_context(ctx: Context) -> Self {
        Self::new(move |b| b.context(ctx))
    }

    pub fn with_code(code: impl Into<Code>) -> Self {
        let code = code.into();
        Self::new(move |b| b.code(code))
    }

    pub fn with_detail(detail: impl Into<String>) -> Self {
        let detail = detail.into();
        Self::new(move |b| b.detail(detail))
    }

    pub fn with_detail_key(key: impl Into<String>) -> Self {
        let key = key.into();
        Self::new(move |b| b.detail_key(key))
    }

    /// Sets both the detail key and the literal detail used when the key has
    /// no translation.
    pub fn with_detail_key_or_else(key: impl Into<String>, detail: impl Into<String>) -> Self {
        let (key, detail) = (key.into(), detail.into());
        Self::new(move |b| b.detail_key(key).detail(detail))
    }

    /// Adds one extension when applied.
    ///
    /// Applying the option panics if `key` is empty or reserved, as
    /// [`Builder::extension`] does.
    pub fn with_extension(key: impl Into<String>, value: impl Into<Value>) -> Self {
        let (key, value) = (key.into(), value.into());
        Self::new(move |b| b.extension(key, value))
    }

    /// Merges extensions when applied; an empty map clears them.
    ///
    /// Applying the option panics if any key is empty or reserved.
    pub fn with_extensions(extensions: Extensions) -> Self {
        Self::new(move |b| b.extensions(extensions))
    }

    pub fn with_instance(instance: impl Into<String>) -> Self {
        let instance = instance.into();
        Self::new(move |b| b.instance(instance))
    }

    pub fn with_log_level(level: LogLevel) -> Self {
        Self::new(move |b| b.log_level(level))
    }

    /// Stack trace visibility; an empty list means both field and log.
    pub fn with_stack(flags: &[Flags]) -> Self {
        let flags = Flags::resolve(flags);
        Self::new(move |b| b.stack_flags(&[flags]))
    }

    pub fn with_stack_frames_skipped(skipped: usize) -> Self {
        Self::new(move |b| b.stack_frames_skipped(skipped))
    }

    pub fn with_status(status: u16) -> Self {
        Self::new(move |b| b.status(status))
    }

    pub fn with_title(title: impl Into<String>) -> Self {
        let title = title.into();
        Self::new(move |b| b.title(title))
    }

    pub fn with_title_key(key: impl Into<String>) -> Self {
        let key = key.into();
        Self::new(move |b| b.title_key(key))
    }

    /// Sets both the title key and the literal title used when the key has
    /// no translation.
    pub fn with_title_key_or_else(key: impl Into<String>, title: impl Into<String>) -> Self {
        let (key, title) = (key.into(), title.into());
        Self::new(move |b| b.title_key(key).title(title))
    }

    pub fn with_type(type_uri: impl Into<String>) -> Self {
        let type_uri = type_uri.into();
        Self::new(move |b| b.type_uri(type_uri))
    }

    /// Identifier visibility; an empty list means both field and log.
    pub fn with_uuid(flags: &[Flags]) -> Self {
        let flags = Flags::resolve(flags);
        Self::new(move |b| b.uuid_flags(&[flags]))
    }

    /// Wraps `err` using the generator's [`Unwrapper`].
    pub fn wrap<E>(err: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        let err: Arc<dyn Error + Send + Sync> = Arc::new(err);
        Self::new(move |b| b.wrap_shared(err))
    }

    pub fn wrap_with<E>(err: E, unwrapper: Unwrapper) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        let err: Arc<dyn Error + Send + Sync> = Arc::new(err);
        Self::new(move |b| b.wrap_shared_with(err, &unwrapper))
    }
}
