//! Precedence resolution of problem fields.
//!
//! A [`Builder`] collects explicit values, a [`Definition`] and whatever was
//! inherited from a wrapped problem, then resolves every field of a
//! [`Problem`] from the first candidate that is present:
//!
//! | Field      | Candidates, highest first                                                        |
//! |------------|----------------------------------------------------------------------------------|
//! | code       | explicit, inherited, definition                                                  |
//! | detail     | translated explicit key, explicit, inherited, translated definition key, definition |
//! | title      | translated explicit key, explicit, inherited, translated type key, type, default |
//! | type       | explicit, inherited, generator typer, type, default                             |
//! | status     | explicit, inherited, type, 500                                                   |
//! | instance   | explicit, inherited, definition                                                  |
//! | extensions | explicit, inherited, definition (always copied)                                  |
//! | log level  | explicit, inherited, generator leveler, type                                     |
//!
//! Empty strings, empty extension maps and a zero status never count as
//! present.

use std::collections::HashMap;
use std::error::Error;
use std::mem;
use std::sync::Arc;

use serde_json::Value;

use crate::code::Code;
use crate::context::Context;
use crate::definition::{Definition, ProblemType};
use crate::flags::Flags;
use crate::generator::Generator;
use crate::log::LogLevel;
use crate::problem::{
    DEFAULT_TITLE, DEFAULT_TYPE_URI, ExtensionKeyError, Extensions, Problem,
    validate_extension_key,
};
use crate::unwrap::{Inherited, Unwrapper};

const DEFAULT_STATUS: u16 = 500;

/// Values computed at most once per builder.
#[derive(Debug, Clone, Default)]
struct Cache {
    stack: Option<String>,
    uuid: Option<String>,
    translations: HashMap<String, String>,
}

fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}

fn present(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_owned)
}

fn populated(extensions: Option<&Extensions>) -> Option<&Extensions> {
    extensions.filter(|e| !e.is_empty())
}

/// Single-use accumulator resolving a [`Problem`].
///
/// Not meant to be shared while being configured; cloning gives a fully
/// independent copy, caches and extensions included.
#[derive(Debug, Clone)]
#[must_use]
pub struct Builder<'g> {
    generator: &'g Generator,
    ctx: Context,
    definition: Definition,
    code: Option<Code>,
    detail: Option<String>,
    detail_key: Option<String>,
    extensions: Option<Extensions>,
    instance: Option<String>,
    log_level: Option<LogLevel>,
    status: Option<u16>,
    title: Option<String>,
    title_key: Option<String>,
    type_uri: Option<String>,
    stack_flags: Option<Flags>,
    stack_frames_skipped: usize,
    uuid_flags: Option<Flags>,
    inherited: Inherited,
    source: Option<Arc<dyn Error + Send + Sync>>,
    cache: Cache,
}

impl<'g> Builder<'g> {
    pub fn new(generator: &'g Generator) -> Self {
        Self {
            generator,
            ctx: Context::default(),
            definition: Definition::default(),
            code: None,
            detail: None,
            detail_key: None,
            extensions: None,
            instance: None,
            log_level: None,
            status: None,
            title: None,
            title_key: None,
            type_uri: None,
            stack_flags: None,
            stack_frames_skipped: 0,
            uuid_flags: None,
            inherited: Inherited::default(),
            source: None,
            cache: Cache::default(),
        }
    }

    #[must_use]
    pub fn generator(&self) -> &'g Generator {
        self.generator
    }

    /// Context handed to the translator, id generator and logger.
    pub fn context(mut self, ctx: Context) -> Self {
        self.ctx = ctx;
        self
    }

    /// Clears everything except the generator and the context.
    pub fn reset(&mut self) {
        let ctx = mem::take(&mut self.ctx);
        *self = Self::new(self.generator).context(ctx);
    }

    pub fn code(mut self, code: impl Into<Code>) -> Self {
        let code = code.into();
        self.code = (!code.is_empty()).then_some(code);
        self
    }

    /// Defaults used for fields that are neither explicit nor inherited.
    ///
    /// # Panics
    /// Panics if the definition carries an empty or reserved extension key;
    /// see [`Builder::try_definition`].
    pub fn definition(self, definition: Definition) -> Self {
        match self.try_definition(definition) {
            Ok(builder) => builder,
            Err(e) => panic!("{e}"),
        }
    }

    /// # Errors
    /// Returns [`ExtensionKeyError`] if the definition carries an empty or
    /// reserved extension key.
    pub fn try_definition(mut self, definition: Definition) -> Result<Self, ExtensionKeyError> {
        definition.validate_extensions()?;
        self.definition = definition;
        Ok(self)
    }

    /// Replaces only the [`ProblemType`] of the current definition.
    pub fn problem_type(mut self, problem_type: ProblemType) -> Self {
        self.definition.problem_type = problem_type;
        self
    }

    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = non_empty(detail.into());
        self
    }

    /// Translation key of the detail. A non-empty translation beats every
    /// other detail candidate.
    pub fn detail_key(mut self, key: impl Into<String>) -> Self {
        self.detail_key = non_empty(key.into());
        self
    }

    /// Adds one extension, keeping the others.
    ///
    /// # Panics
    /// Panics if `key` is empty or reserved; see [`Builder::try_extension`].
    pub fn extension(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        match self.try_extension(key, value) {
            Ok(builder) => builder,
            Err(e) => panic!("{e}"),
        }
    }

    /// # Errors
    /// Returns [`ExtensionKeyError`] if `key` is empty or reserved.
    pub fn try_extension(
        mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<Self, ExtensionKeyError> {
        let key = key.into();
        validate_extension_key(&key)?;
        self.extensions
            .get_or_insert_with(Extensions::new)
            .insert(key, value.into());
        Ok(self)
    }

    /// Merges `extensions` into the explicit ones. An empty map clears them.
    ///
    /// # Panics
    /// Panics if any key is empty or reserved.
    pub fn extensions(mut self, extensions: Extensions) -> Self {
        if extensions.is_empty() {
            self.extensions = None;
            return self;
        }
        if let Some(e) = extensions
            .keys()
            .find_map(|key| validate_extension_key(key).err())
        {
            panic!("{e}");
        }
        self.extensions
            .get_or_insert_with(Extensions::new)
            .extend(extensions);
        self
    }

    pub fn instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = non_empty(instance.into());
        self
    }

    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.log_level = Some(level);
        self
    }

    /// Requests a stack trace on both the public field and the log view.
    pub fn stack(self) -> Self {
        self.stack_flags(&[])
    }

    /// Stack trace visibility, combined as in [`Flags::resolve`]. Overrides
    /// the generator's flags.
    pub fn stack_flags(mut self, flags: &[Flags]) -> Self {
        self.stack_flags = Some(Flags::resolve(flags));
        self
    }

    /// Extra caller frames to leave out when a stack trace is captured.
    pub fn stack_frames_skipped(mut self, skipped: usize) -> Self {
        self.stack_frames_skipped = skipped;
        self
    }

    /// Zero leaves the status to the other candidates.
    pub fn status(mut self, status: u16) -> Self {
        self.status = (status != 0).then_some(status);
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = non_empty(title.into());
        self
    }

    /// Translation key of the title. A non-empty translation beats every
    /// other title candidate.
    pub fn title_key(mut self, key: impl Into<String>) -> Self {
        self.title_key = non_empty(key.into());
        self
    }

    pub fn type_uri(mut self, type_uri: impl Into<String>) -> Self {
        self.type_uri = non_empty(type_uri.into());
        self
    }

    /// Requests an identifier on both the public field and the log view.
    pub fn uuid(self) -> Self {
        self.uuid_flags(&[])
    }

    /// Identifier visibility, combined as in [`Flags::resolve`]. Overrides
    /// the generator's flags.
    pub fn uuid_flags(mut self, flags: &[Flags]) -> Self {
        self.uuid_flags = Some(Flags::resolve(flags));
        self
    }

    /// Wraps `err`, inheriting from a problem in its chain according to the
    /// generator's [`Unwrapper`].
    pub fn wrap<E>(self, err: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        let unwrapper = self.generator.unwrapper().clone();
        let err: Arc<dyn Error + Send + Sync> = Arc::new(err);
        self.wrap_shared_with(err, &unwrapper)
    }

    /// Like [`Builder::wrap`] with an explicit [`Unwrapper`].
    pub fn wrap_with<E>(self, err: E, unwrapper: &Unwrapper) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        let err: Arc<dyn Error + Send + Sync> = Arc::new(err);
        self.wrap_shared_with(err, unwrapper)
    }

    /// Like [`Builder::wrap`] for errors that are already boxed or shared.
    pub fn wrap_shared(self, err: impl Into<Arc<dyn Error + Send + Sync>>) -> Self {
        let unwrapper = self.generator.unwrapper().clone();
        self.wrap_shared_with(err, &unwrapper)
    }

    pub fn wrap_shared_with(
        mut self,
        err: impl Into<Arc<dyn Error + Send + Sync>>,
        unwrapper: &Unwrapper,
    ) -> Self {
        let err = err.into();
        let chain: &(dyn Error + 'static) = &*err;
        self.inherited = unwrapper.unwrap_error(chain);
        self.source = Some(err);
        self
    }

    /// Resolves the problem. Stack traces, identifiers and translations
    /// computed here are kept, so resolving again yields the same problem.
    pub fn resolve(&mut self) -> Problem {
        let mut cache = mem::take(&mut self.cache);
        let problem = self.resolve_with(&mut cache);
        self.cache = cache;
        problem
    }

    pub fn into_problem(mut self) -> Problem {
        self.resolve()
    }

    fn resolve_with(&self, cache: &mut Cache) -> Problem {
        let (stack, log_stack) = self.resolve_stack(cache);
        let (uuid, log_uuid) = self.resolve_uuid(cache);
        let problem = Problem {
            code: self.resolve_code(),
            detail: self.resolve_detail(cache),
            extensions: self.resolve_extensions(),
            instance: self.resolve_instance(),
            stack,
            status: self.resolve_status(),
            title: self.resolve_title(cache),
            type_uri: self.resolve_type_uri(),
            uuid,
            source: self.source.clone(),
            log_level: self.resolve_log_level(),
            log_stack,
            log_uuid,
        };
        tracing::trace!(status = problem.status, code = %problem.code, "resolved problem");
        problem
    }

    fn translate(&self, cache: &mut Cache, key: Option<&str>) -> Option<String> {
        let key = key.filter(|k| !k.is_empty())?;
        let value = cache
            .translations
            .entry(key.to_owned())
            .or_insert_with(|| self.generator.translate(&self.ctx, key))
            .clone();
        non_empty(value)
    }

    fn resolve_code(&self) -> Code {
        [
            self.code.as_ref(),
            self.inherited.code.as_ref(),
            self.definition.code.as_ref(),
        ]
        .into_iter()
        .flatten()
        .find(|code| !code.is_empty())
        .cloned()
        .unwrap_or_default()
    }

    fn resolve_detail(&self, cache: &mut Cache) -> String {
        self.translate(cache, self.detail_key.as_deref())
            .or_else(|| present(self.detail.as_deref()))
            .or_else(|| present(self.inherited.detail.as_deref()))
            .or_else(|| self.translate(cache, self.definition.detail_key.as_deref()))
            .or_else(|| present(self.definition.detail.as_deref()))
            .unwrap_or_default()
    }

    fn resolve_title(&self, cache: &mut Cache) -> String {
        let problem_type = &self.definition.problem_type;
        self.translate(cache, self.title_key.as_deref())
            .or_else(|| present(self.title.as_deref()))
            .or_else(|| present(self.inherited.title.as_deref()))
            .or_else(|| self.translate(cache, problem_type.title_key.as_deref()))
            .or_else(|| present(problem_type.title.as_deref()))
            .unwrap_or_else(|| DEFAULT_TITLE.to_owned())
    }

    fn resolve_type_uri(&self) -> String {
        let problem_type = &self.definition.problem_type;
        present(self.type_uri.as_deref())
            .or_else(|| present(self.inherited.type_uri.as_deref()))
            .or_else(|| self.generator.type_uri_for(problem_type))
            .or_else(|| present(problem_type.uri.as_deref()))
            .unwrap_or_else(|| DEFAULT_TYPE_URI.to_owned())
    }

    fn resolve_status(&self) -> u16 {
        let non_zero = |status: Option<u16>| status.filter(|s| *s != 0);
        non_zero(self.status)
            .or_else(|| non_zero(self.inherited.status))
            .or_else(|| non_zero(self.definition.problem_type.status))
            .unwrap_or(DEFAULT_STATUS)
    }

    fn resolve_instance(&self) -> String {
        present(self.instance.as_deref())
            .or_else(|| present(self.inherited.instance.as_deref()))
            .or_else(|| present(self.definition.instance.as_deref()))
            .unwrap_or_default()
    }

    fn resolve_extensions(&self) -> Extensions {
        populated(self.extensions.as_ref())
            .or_else(|| populated(self.inherited.extensions.as_ref()))
            .or(self.definition.extensions.as_ref())
            .cloned()
            .unwrap_or_default()
    }

    fn resolve_log_level(&self) -> Option<LogLevel> {
        let problem_type = &self.definition.problem_type;
        self.log_level
            .or(self.inherited.log_level)
            .or_else(|| self.generator.log_level_for(problem_type))
            .or(problem_type.log_level)
    }

    /// Returns the (field, log) stack traces requested by the stack flags.
    fn resolve_stack(&self, cache: &mut Cache) -> (String, String) {
        let flags = self.stack_flags.unwrap_or(self.generator.stack_flags());
        if flags.is_disabled() {
            return (String::new(), String::new());
        }
        let stack = cache
            .stack
            .get_or_insert_with(|| {
                present(self.inherited.stack.as_deref())
                    .or_else(|| present(self.inherited.log_stack.as_deref()))
                    .unwrap_or_else(|| self.generator.capture_stack(self.stack_frames_skipped))
            })
            .clone();
        split_visibility(flags, stack)
    }

    /// Returns the (field, log) identifiers requested by the uuid flags.
    fn resolve_uuid(&self, cache: &mut Cache) -> (String, String) {
        let flags = self.uuid_flags.unwrap_or(self.generator.uuid_flags());
        if flags.is_disabled() {
            return (String::new(), String::new());
        }
        let uuid = cache
            .uuid
            .get_or_insert_with(|| {
                present(self.inherited.uuid.as_deref())
                    .or_else(|| present(self.inherited.log_uuid.as_deref()))
                    .unwrap_or_else(|| self.generator.generate_id(&self.ctx))
            })
            .clone();
        split_visibility(flags, uuid)
    }
}

fn split_visibility(flags: Flags, value: String) -> (String, String) {
    match (flags.field(), flags.log()) {
        (true, true) => (value.clone(), value),
        (true, false) => (value, String::new()),
        (false, true) => (String::new(), value),
        (false, false) => (String::new(), String::new()),
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::i18n::StaticTranslator;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn not_found() -> Definition {
        Definition::new()
            .with_code("USER-404")
            .with_detail("definition detail")
            .with_instance("/users/0")
            .with_type(
                ProblemType::new()
                    .with_status(404)
                    .with_title("Not Found")
                    .with_uri("https://errors.example.com/not-found")
                    .with_log_level(LogLevel::Info),
            )
    }

    #[test]
    fn defaults_apply_without_any_input() {
        let p = Generator::new().builder().into_problem();
        assert_eq!(p.status(), 500);
        assert_eq!(p.title(), DEFAULT_TITLE);
        assert_eq!(p.type_uri(), DEFAULT_TYPE_URI);
        assert!(p.code().is_empty());
        assert!(p.stack().is_empty());
        assert!(p.uuid().is_empty());
        assert_eq!(p.log_info().level, LogLevel::Error);
        assert_eq!(p.to_string(), "500 Unknown Error");
    }

    #[test]
    fn definition_fills_unset_fields() {
        let p = not_found().builder(&Generator::new()).into_problem();
        assert_eq!(p.code().as_str(), "USER-404");
        assert_eq!(p.detail(), "definition detail");
        assert_eq!(p.instance(), "/users/0");
        assert_eq!(p.status(), 404);
        assert_eq!(p.title(), "Not Found");
        assert_eq!(p.type_uri(), "https://errors.example.com/not-found");
        assert_eq!(p.log_level(), LogLevel::Info);
    }

    #[test]
    fn empty_explicit_values_count_as_unset() {
        let p = not_found()
            .builder(&Generator::new())
            .title("")
            .detail("")
            .status(0)
            .code("")
            .into_problem();
        assert_eq!(p.title(), "Not Found");
        assert_eq!(p.detail(), "definition detail");
        assert_eq!(p.status(), 404);
        assert_eq!(p.code().as_str(), "USER-404");
    }

    #[test]
    fn translations_beat_literals_and_misses_fall_through() {
        let g = Generator::new().with_translator(
            StaticTranslator::new()
                .with_entry("title.explicit", "Translated Title")
                .with_entry("detail.definition", "Translated Detail"),
        );
        let def = not_found().with_detail_key("detail.definition");

        let p = def
            .builder(&g)
            .title("Literal")
            .title_key("title.explicit")
            .into_problem();
        assert_eq!(p.title(), "Translated Title");
        assert_eq!(p.detail(), "Translated Detail");

        let p = def.builder(&g).title_key("title.missing").into_problem();
        assert_eq!(p.title(), "Not Found");
    }

    #[test]
    fn translations_are_looked_up_once_per_key() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let g = Generator::new().with_translator(move |_: &Context, key: &str| {
            counter.fetch_add(1, Ordering::SeqCst);
            format!("t:{key}")
        });
        let mut builder = g.builder().title_key("shared").detail_key("shared");
        let first = builder.resolve();
        let second = builder.resolve();
        assert_eq!(first.title(), "t:shared");
        assert_eq!(first.detail(), "t:shared");
        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn typer_and_leveler_sit_between_inherited_and_type() {
        let g = Generator::new()
            .with_typer(|t| t.status.map(|s| format!("https://httpstatuses.example/{s}")))
            .with_leveler(|_| Some(LogLevel::Debug));
        let p = not_found().builder(&g).into_problem();
        assert_eq!(p.type_uri(), "https://httpstatuses.example/404");
        assert_eq!(p.log_level(), LogLevel::Debug);

        let p = not_found()
            .builder(&g)
            .type_uri("urn:explicit")
            .log_level(LogLevel::Warn)
            .into_problem();
        assert_eq!(p.type_uri(), "urn:explicit");
        assert_eq!(p.log_level(), LogLevel::Warn);
    }

    #[test]
    fn stack_is_captured_once_and_split_by_flags() {
        let captures = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&captures);
        let g = Generator::new().with_stack_capturer(move |skip: usize| {
            counter.fetch_add(1, Ordering::SeqCst);
            format!("frames skipped {skip}")
        });

        let mut builder = g.builder().stack().stack_frames_skipped(2);
        let p = builder.resolve();
        assert_eq!(p.stack(), "frames skipped 2");
        assert_eq!(p.log_info().stack, "frames skipped 2");
        let again = builder.resolve();
        assert_eq!(again.stack(), p.stack());
        assert_eq!(captures.load(Ordering::SeqCst), 1);

        let p = g.builder().stack_flags(&[Flags::LOG]).into_problem();
        assert!(p.stack().is_empty());
        assert_eq!(p.log_info().stack, "frames skipped 0");

        let p = g
            .builder()
            .stack_flags(&[Flags::FIELD, Flags::DISABLED])
            .into_problem();
        assert!(p.stack().is_empty());
        assert!(p.log_info().stack.is_empty());
    }

    #[test]
    fn generator_flags_apply_when_builder_has_none() {
        let g = Generator::new()
            .with_uuid_flags(Flags::FIELD)
            .with_id_generator(|_: &Context| "generated".to_owned());
        let p = g.builder().into_problem();
        assert_eq!(p.uuid(), "generated");
        assert!(p.log_info().uuid.is_empty());

        let p = g.builder().uuid_flags(&[Flags::DISABLED]).into_problem();
        assert!(p.uuid().is_empty());
    }

    #[test]
    fn extensions_merge_and_clear() {
        let g = Generator::new();
        let mut more = Extensions::new();
        more.insert("b".to_owned(), Value::from(2));
        let p = g
            .builder()
            .extension("a", 1)
            .extensions(more)
            .into_problem();
        assert_eq!(p.extensions().len(), 2);

        let p = g
            .builder()
            .extension("a", 1)
            .extensions(Extensions::new())
            .into_problem();
        assert!(p.extensions().is_empty());
    }

    #[test]
    fn reserved_extension_keys_are_rejected() {
        let err = Generator::new()
            .builder()
            .try_extension("status", 1)
            .unwrap_err();
        assert_eq!(err, ExtensionKeyError::Reserved("status".to_owned()));
    }

    #[test]
    #[should_panic(expected = "extension key cannot be empty")]
    fn empty_extension_key_panics() {
        drop(Generator::new().builder().extension("", 1));
    }

    #[test]
    fn reset_keeps_generator_and_context() {
        let g = Generator::new().with_translator(|ctx: &Context, _: &str| {
            ctx.locale().unwrap_or_default().to_owned()
        });
        let mut builder = g
            .builder()
            .context(Context::new().with_locale("fr"))
            .status(404)
            .title("Not Found");
        builder.reset();
        let p = builder.title_key("anything").into_problem();
        assert_eq!(p.status(), 500);
        assert_eq!(p.title(), "fr");
    }

    #[test]
    fn clones_are_independent() {
        let g = Generator::new();
        let base = g.builder().extension("a", 1);
        let extended = base.clone().extension("b", 2);
        assert_eq!(base.into_problem().extensions().len(), 1);
        assert_eq!(extended.into_problem().extensions().len(), 2);
    }
}
