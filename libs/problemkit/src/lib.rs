//! RFC 9457 problem details assembled from layered configuration.
//!
//! A [`Problem`] is resolved by a [`Builder`] from four sources, in order of
//! precedence for each field:
//! - explicit per-call overrides set on the builder,
//! - fields inherited from a `Problem` found in a wrapped error chain,
//! - a reusable [`Definition`] (and its embedded [`ProblemType`]),
//! - fixed defaults.
//!
//! Expensive data (stack traces, unique identifiers) is generated lazily, at
//! most once per builder, and exposed as a public field, a log-only attribute,
//! or both, according to [`Flags`].
//!
//! ```
//! use problemkit::{Definition, Generator, ProblemType};
//!
//! let not_found = Definition::new()
//!     .with_code("USER-404")
//!     .with_type(ProblemType::new().with_status(404).with_title("Not Found"));
//!
//! let problem = not_found
//!     .builder(Generator::global())
//!     .detail("user 42 does not exist")
//!     .into_problem();
//!
//! assert_eq!(problem.to_string(), "404 Not Found - user 42 does not exist [USER-404]");
//! ```
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod builder;
pub mod catalog;
pub mod code;
pub mod config;
pub mod context;
pub mod definition;
pub mod flags;
pub mod generator;
pub mod i18n;
pub mod id;
pub mod log;
pub mod matcher;
pub mod option;
pub mod pool;
pub mod problem;
pub mod stack;
pub mod unwrap;
pub mod uri;

// Re-export commonly used types
pub use builder::Builder;
pub use catalog::{CATALOG_SECTION, Catalog};
pub use code::{
    AllOf, CharValidator, Code, CodeError, CodeSettings, Coder, DEFAULT_CODE_SEPARATOR, LenBounds,
    NamespaceRejection, NamespaceValidator, ParseCodeError, ParsedCode, PatternValidator,
    build_code, parse_code, validate_code,
};
pub use config::{CONFIG_SECTION, ConfigError, ENV_PREFIX, GeneratorConfig};
pub use context::Context;
pub use definition::{Definition, ProblemType};
pub use flags::Flags;
pub use generator::{
    APPLICATION_PROBLEM_JSON, APPLICATION_PROBLEM_JSON_UTF8, APPLICATION_PROBLEM_XML,
    APPLICATION_PROBLEM_XML_UTF8, Generator,
};
pub use i18n::{StaticTranslator, Translator};
pub use id::{FALLBACK_UUID, IdGenerator, ReaderIdGenerator, V4IdGenerator};
pub use log::{DEFAULT_LOG_ARG_KEY, LogInfo, LogLevel, NoopLogger, ProblemLogger, TracingLogger};
pub use matcher::{Matcher, Operator, matches_all};
pub use option::ProblemOption;
pub use problem::{
    DEFAULT_TITLE, DEFAULT_TYPE_URI, ExtensionKeyError, Extensions, Problem, RESERVED_KEYS,
    validate_extension_key,
};
pub use stack::{BacktraceCapturer, StackCapturer};
pub use unwrap::{
    Inherited, Unwrapper, as_match, as_match_or_else, as_problem, is_match, is_problem,
};
pub use uri::UriBuilder;
