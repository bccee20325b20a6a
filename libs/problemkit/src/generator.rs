//! Shared, read-only configuration driving problem resolution.

use std::fmt;
use std::sync::{Arc, LazyLock};

use serde_json::{Map, Value};

use crate::builder::Builder;
use crate::code::{CodeSettings, Coder, NamespaceValidator};
use crate::context::Context;
use crate::definition::ProblemType;
use crate::flags::Flags;
use crate::i18n::Translator;
use crate::id::{IdGenerator, V4IdGenerator};
use crate::log::{DEFAULT_LOG_ARG_KEY, LogLevel, ProblemLogger, TracingLogger};
use crate::option::ProblemOption;
use crate::problem::Problem;
use crate::stack::{BacktraceCapturer, StackCapturer};
use crate::unwrap::Unwrapper;

/// Content type for Problem Details as per RFC 9457.
pub const APPLICATION_PROBLEM_JSON: &str = "application/problem+json";
pub const APPLICATION_PROBLEM_JSON_UTF8: &str = "application/problem+json; charset=utf-8";
pub const APPLICATION_PROBLEM_XML: &str = "application/problem+xml";
pub const APPLICATION_PROBLEM_XML_UTF8: &str = "application/problem+xml; charset=utf-8";

const CONTENT_TYPES: [&str; 4] = [
    APPLICATION_PROBLEM_JSON,
    APPLICATION_PROBLEM_JSON_UTF8,
    APPLICATION_PROBLEM_XML,
    APPLICATION_PROBLEM_XML_UTF8,
];

pub(crate) fn is_valid_content_type(content_type: &str) -> bool {
    CONTENT_TYPES.contains(&content_type)
}

type TypeFn = dyn Fn(&ProblemType) -> Option<String> + Send + Sync;
type LevelFn = dyn Fn(&ProblemType) -> Option<LogLevel> + Send + Sync;

static GLOBAL: LazyLock<Generator> = LazyLock::new(Generator::default);

/// Configuration shared by every resolution: code rules, visibility of
/// generated data and the collaborators used to translate, identify, capture
/// and log.
///
/// A generator is built once, then only read. Pass it explicitly to
/// [`Generator::builder`], or use [`Generator::global`] for the defaults:
/// no stack traces, no identifiers, no translations, v4 UUIDs when
/// identifiers are requested and `tracing` for logging.
#[derive(Clone)]
#[must_use]
pub struct Generator {
    code: CodeSettings,
    content_type: Option<String>,
    log_arg_key: Option<String>,
    leveler: Option<Arc<LevelFn>>,
    logger: Arc<dyn ProblemLogger>,
    stack_flags: Flags,
    uuid_flags: Flags,
    translator: Option<Arc<dyn Translator>>,
    typer: Option<Arc<TypeFn>>,
    unwrapper: Unwrapper,
    id_generator: Arc<dyn IdGenerator>,
    stack_capturer: Arc<dyn StackCapturer>,
}

impl Default for Generator {
    fn default() -> Self {
        Self {
            code: CodeSettings::default(),
            content_type: None,
            log_arg_key: None,
            leveler: None,
            logger: Arc::new(TracingLogger),
            stack_flags: Flags::DISABLED,
            uuid_flags: Flags::DISABLED,
            translator: None,
            typer: None,
            unwrapper: Unwrapper::default(),
            id_generator: Arc::new(V4IdGenerator),
            stack_capturer: Arc::new(BacktraceCapturer),
        }
    }
}

impl fmt::Debug for Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Generator")
            .field("code", &self.code)
            .field("content_type", &self.content_type)
            .field("log_arg_key", &self.log_arg_key)
            .field("leveler", &self.leveler.is_some())
            .field("stack_flags", &self.stack_flags)
            .field("uuid_flags", &self.uuid_flags)
            .field("translator", &self.translator.is_some())
            .field("typer", &self.typer.is_some())
            .field("unwrapper", &self.unwrapper)
            .finish_non_exhaustive()
    }
}

impl Generator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide generator with default settings.
    #[must_use]
    pub fn global() -> &'static Generator {
        &GLOBAL
    }

    pub fn with_code_settings(mut self, settings: CodeSettings) -> Self {
        self.code = settings;
        self
    }

    pub fn with_code_separator(mut self, separator: char) -> Self {
        self.code.separator = Some(separator);
        self
    }

    pub fn with_code_value_len(mut self, value_len: usize) -> Self {
        self.code.value_len = Some(value_len);
        self
    }

    pub fn with_namespace_validator(mut self, validator: impl NamespaceValidator + 'static) -> Self {
        self.code.namespace_validator = Some(Arc::new(validator));
        self
    }

    /// Preferred content type. Unknown values are ignored by [`Generator::content_type`].
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_log_arg_key(mut self, key: impl Into<String>) -> Self {
        self.log_arg_key = Some(key.into());
        self
    }

    /// Overrides the log level derived from a [`ProblemType`]. Returning
    /// `None` falls back to the type's own level.
    pub fn with_leveler<F>(mut self, leveler: F) -> Self
    where
        F: Fn(&ProblemType) -> Option<LogLevel> + Send + Sync + 'static,
    {
        self.leveler = Some(Arc::new(leveler));
        self
    }

    pub fn with_logger(mut self, logger: impl ProblemLogger + 'static) -> Self {
        self.logger = Arc::new(logger);
        self
    }

    pub fn with_stack_flags(mut self, flags: Flags) -> Self {
        self.stack_flags = flags;
        self
    }

    pub fn with_uuid_flags(mut self, flags: Flags) -> Self {
        self.uuid_flags = flags;
        self
    }

    pub fn with_translator(mut self, translator: impl Translator + 'static) -> Self {
        self.translator = Some(Arc::new(translator));
        self
    }

    /// Overrides the type URI derived from a [`ProblemType`]. Returning
    /// `None` or an empty string falls back to the type's own URI.
    pub fn with_typer<F>(mut self, typer: F) -> Self
    where
        F: Fn(&ProblemType) -> Option<String> + Send + Sync + 'static,
    {
        self.typer = Some(Arc::new(typer));
        self
    }

    pub fn with_unwrapper(mut self, unwrapper: Unwrapper) -> Self {
        self.unwrapper = unwrapper;
        self
    }

    pub fn with_id_generator(mut self, id_generator: impl IdGenerator + 'static) -> Self {
        self.id_generator = Arc::new(id_generator);
        self
    }

    pub fn with_stack_capturer(mut self, capturer: impl StackCapturer + 'static) -> Self {
        self.stack_capturer = Arc::new(capturer);
        self
    }

    #[must_use]
    pub fn code_settings(&self) -> &CodeSettings {
        &self.code
    }

    /// Code builder and parser following this generator's code settings,
    /// optionally bound to `namespace`.
    #[must_use]
    pub fn coder(&self, namespace: Option<&str>) -> Coder<'_> {
        self.code.coder(namespace)
    }

    /// Configured content type when it is one of the supported problem
    /// content types, otherwise [`APPLICATION_PROBLEM_JSON_UTF8`].
    #[must_use]
    pub fn content_type(&self) -> &str {
        self.content_type
            .as_deref()
            .filter(|ct| is_valid_content_type(ct))
            .unwrap_or(APPLICATION_PROBLEM_JSON_UTF8)
    }

    #[must_use]
    pub fn log_arg_key(&self) -> &str {
        self.log_arg_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .unwrap_or(DEFAULT_LOG_ARG_KEY)
    }

    #[must_use]
    pub fn stack_flags(&self) -> Flags {
        self.stack_flags
    }

    #[must_use]
    pub fn uuid_flags(&self) -> Flags {
        self.uuid_flags
    }

    #[must_use]
    pub fn unwrapper(&self) -> &Unwrapper {
        &self.unwrapper
    }

    /// Localized value of `key`, empty when unknown or when no translator is set.
    #[must_use]
    pub fn translate(&self, ctx: &Context, key: &str) -> String {
        self.translator
            .as_ref()
            .map_or_else(String::new, |t| t.translate(ctx, key))
    }

    pub(crate) fn type_uri_for(&self, problem_type: &ProblemType) -> Option<String> {
        self.typer
            .as_ref()
            .and_then(|typer| typer(problem_type))
            .filter(|uri| !uri.is_empty())
    }

    pub(crate) fn log_level_for(&self, problem_type: &ProblemType) -> Option<LogLevel> {
        self.leveler.as_ref().and_then(|leveler| leveler(problem_type))
    }

    pub(crate) fn generate_id(&self, ctx: &Context) -> String {
        self.id_generator.generate_id(ctx)
    }

    pub(crate) fn capture_stack(&self, skip: usize) -> String {
        self.stack_capturer.capture_stack(skip)
    }

    pub fn builder(&self) -> Builder<'_> {
        Builder::new(self)
    }

    pub fn builder_with_context(&self, ctx: Context) -> Builder<'_> {
        Builder::new(self).context(ctx)
    }

    /// Resolves a problem from `options`, applied in order.
    pub fn new_problem(&self, options: impl IntoIterator<Item = ProblemOption>) -> Problem {
        self.new_problem_with_context(Context::new(), options)
    }

    pub fn new_problem_with_context(
        &self,
        ctx: Context,
        options: impl IntoIterator<Item = ProblemOption>,
    ) -> Problem {
        options
            .into_iter()
            .fold(self.builder_with_context(ctx), |builder, option| {
                option.apply(builder)
            })
            .into_problem()
    }

    /// Logs `message` at the problem's log level, passing the problem's
    /// [`log_value`](Problem::log_value) under [`Generator::log_arg_key`]
    /// alongside `fields`.
    pub fn log(
        &self,
        ctx: &Context,
        message: &str,
        problem: &Problem,
        mut fields: Map<String, Value>,
    ) {
        fields.insert(self.log_arg_key().to_owned(), problem.log_value());
        self.logger.log(ctx, problem.log_level(), message, &fields);
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn content_type_falls_back_to_json_utf8() {
        assert_eq!(Generator::new().content_type(), APPLICATION_PROBLEM_JSON_UTF8);
        let g = Generator::new().with_content_type(APPLICATION_PROBLEM_XML);
        assert_eq!(g.content_type(), APPLICATION_PROBLEM_XML);
        let g = Generator::new().with_content_type("text/html");
        assert_eq!(g.content_type(), APPLICATION_PROBLEM_JSON_UTF8);
    }

    #[test]
    fn defaults_disable_generated_data() {
        let g = Generator::global();
        assert!(g.stack_flags().is_disabled());
        assert!(g.uuid_flags().is_disabled());
        assert_eq!(g.log_arg_key(), "problem");
        assert_eq!(g.translate(&Context::new(), "any.key"), "");
        assert!(matches!(g.unwrapper(), Unwrapper::Propagated));
    }

    #[test]
    fn typer_and_leveler_only_apply_when_they_answer() {
        let g = Generator::new()
            .with_typer(|t| {
                (t.status == Some(404)).then(|| "https://errors.example.com/404".to_owned())
            })
            .with_leveler(|t| t.status.filter(|s| *s < 500).map(|_| LogLevel::Warn));
        let not_found = ProblemType::new().with_status(404);
        let teapot = ProblemType::new().with_status(418);
        assert_eq!(
            g.type_uri_for(&not_found).as_deref(),
            Some("https://errors.example.com/404")
        );
        assert!(g.type_uri_for(&teapot).is_none());
        assert_eq!(g.log_level_for(&teapot), Some(LogLevel::Warn));
        assert!(g.log_level_for(&ProblemType::new()).is_none());
    }

    #[test]
    fn log_adds_problem_under_configured_key() {
        type Seen = Vec<(LogLevel, String, Map<String, Value>)>;

        let seen: Arc<Mutex<Seen>> = Arc::default();
        let sink = Arc::clone(&seen);
        let logger = move |_: &Context, level: LogLevel, msg: &str, fields: &Map<String, Value>| {
            sink.lock().push((level, msg.to_owned(), fields.clone()));
        };
        let g = Generator::new().with_log_arg_key("err").with_logger(logger);

        let problem = g
            .builder()
            .status(404)
            .title("Not Found")
            .log_level(LogLevel::Info)
            .into_problem();
        let mut fields = Map::new();
        fields.insert("request_id".to_owned(), Value::from("req-1"));
        g.log(&Context::new(), "lookup failed", &problem, fields);

        let seen = seen.lock();
        let (level, msg, fields) = &seen[0];
        assert_eq!(*level, LogLevel::Info);
        assert_eq!(msg, "lookup failed");
        assert_eq!(fields["request_id"], "req-1");
        assert_eq!(fields["err"]["status"], 404);
        assert_eq!(fields["err"]["title"], "Not Found");
    }

    #[test]
    #[tracing_test::traced_test]
    fn default_logger_emits_tracing_event_at_problem_level() {
        let g = Generator::new();
        let problem = g
            .builder()
            .status(503)
            .title("Service Unavailable")
            .log_level(LogLevel::Warn)
            .into_problem();
        g.log(&Context::new(), "upstream unavailable", &problem, Map::new());
        assert!(logs_contain("WARN"));
        assert!(logs_contain("upstream unavailable"));
        assert!(logs_contain("\"title\":\"Service Unavailable\""));
    }
}
