//! The resolved, immutable [`Problem`].
//!
//! Extensions serialize as top-level members next to the standard ones and
//! can never shadow them. Log-only stack traces and identifiers stay off the
//! wire and show up in [`Problem::log_info`] and [`Problem::log_value`].

use std::error::Error;
use std::fmt;
use std::sync::Arc;

use http::StatusCode;
use serde::de::Deserializer;
use serde::ser::{Error as _, SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::code::Code;
use crate::log::{LogInfo, LogLevel};

/// Title given to a problem when none was set or could be derived.
pub const DEFAULT_TITLE: &str = "Unknown Error";

/// Type URI given to a problem when none was set or could be derived.
pub const DEFAULT_TYPE_URI: &str = "about:blank";

/// Keys an extension can never use since they clash with top-level fields.
pub const RESERVED_KEYS: [&str; 9] = [
    "code",
    "detail",
    "extensions",
    "instance",
    "stack",
    "status",
    "title",
    "type",
    "uuid",
];

const NIL: &str = "<nil>";

/// Additional members of a problem, serialized at the top level.
pub type Extensions = Map<String, Value>;

/// Rejected extension key.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtensionKeyError {
    #[error("extension key cannot be empty")]
    Empty,
    #[error("extension key is reserved: {0:?}")]
    Reserved(String),
}

/// # Errors
/// Returns [`ExtensionKeyError`] if `key` is empty or one of [`RESERVED_KEYS`].
pub fn validate_extension_key(key: &str) -> Result<(), ExtensionKeyError> {
    if key.is_empty() {
        return Err(ExtensionKeyError::Empty);
    }
    if RESERVED_KEYS.contains(&key) {
        return Err(ExtensionKeyError::Reserved(key.to_owned()));
    }
    Ok(())
}

/// RFC 9457 Problem Details for HTTP APIs.
///
/// Produced by a [`Builder`](crate::Builder) and immutable afterwards. Besides
/// the public members, a problem carries the error it wraps (exposed through
/// [`Error::source`]) and log-only data (see [`Problem::log_info`]).
#[derive(Clone, Default)]
#[must_use]
pub struct Problem {
    pub(crate) code: Code,
    pub(crate) detail: String,
    pub(crate) extensions: Extensions,
    pub(crate) instance: String,
    pub(crate) stack: String,
    pub(crate) status: u16,
    pub(crate) title: String,
    pub(crate) type_uri: String,
    pub(crate) uuid: String,
    pub(crate) source: Option<Arc<dyn Error + Send + Sync>>,
    pub(crate) log_level: Option<LogLevel>,
    pub(crate) log_stack: String,
    pub(crate) log_uuid: String,
}

impl Problem {
    /// Machine-readable code identifying this kind of occurrence. May be empty.
    #[must_use]
    pub fn code(&self) -> &Code {
        &self.code
    }

    /// Human-readable explanation specific to this occurrence.
    #[must_use]
    pub fn detail(&self) -> &str {
        &self.detail
    }

    #[must_use]
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    #[must_use]
    pub fn extension(&self, key: &str) -> Option<&Value> {
        self.extensions.get(key)
    }

    /// URI reference identifying this occurrence.
    #[must_use]
    pub fn instance(&self) -> &str {
        &self.instance
    }

    /// Stack trace visible on the public field, or empty.
    #[must_use]
    pub fn stack(&self) -> &str {
        &self.stack
    }

    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    /// The status as an [`http::StatusCode`], when it is a valid one.
    #[must_use]
    pub fn status_code(&self) -> Option<StatusCode> {
        StatusCode::from_u16(self.status).ok()
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// URI reference identifying the problem type.
    #[must_use]
    pub fn type_uri(&self) -> &str {
        &self.type_uri
    }

    /// Identifier visible on the public field, or empty.
    #[must_use]
    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    /// The wrapped error, if any.
    #[must_use]
    pub fn wrapped(&self) -> Option<&(dyn Error + Send + Sync + 'static)> {
        self.source.as_deref()
    }

    #[must_use]
    pub fn log_level(&self) -> LogLevel {
        self.log_level.unwrap_or_default()
    }

    /// Log-only view: level (defaulting to [`LogLevel::Error`]) and the stack
    /// trace and identifier requested for logs.
    #[must_use]
    pub fn log_info(&self) -> LogInfo {
        LogInfo {
            level: self.log_level(),
            stack: self.log_stack.clone(),
            uuid: self.log_uuid.clone(),
        }
    }

    /// Renders `problem`, or `"<nil>"` when there is none.
    #[must_use]
    pub fn display_optional(problem: Option<&Problem>) -> String {
        problem.map_or_else(|| NIL.to_owned(), ToString::to_string)
    }

    /// Like [`Display`](fmt::Display) but followed by `": <source>"` when an
    /// error is wrapped.
    #[must_use]
    pub fn message_with_source(&self) -> String {
        match &self.source {
            Some(source) => format!("{self}: {source}"),
            None => self.to_string(),
        }
    }

    /// JSON view used when logging: every non-empty public member, the wrapped
    /// error message, and the log-only stack and identifier in place of the
    /// public ones.
    #[must_use]
    pub fn log_value(&self) -> Value {
        let mut map = Map::new();
        let mut put = |key: &str, value: &str| {
            if !value.is_empty() {
                map.insert(key.to_owned(), Value::String(value.to_owned()));
            }
        };
        put("code", self.code.as_str());
        put("detail", &self.detail);
        if let Some(source) = &self.source {
            put("error", &source.to_string());
        }
        put("instance", &self.instance);
        put("stack", &self.log_stack);
        put("title", &self.title);
        put("type", &self.type_uri);
        put("uuid", &self.log_uuid);
        if self.status != 0 {
            map.insert("status".to_owned(), Value::from(self.status));
        }
        if !self.extensions.is_empty() {
            map.insert(
                "extensions".to_owned(),
                Value::Object(self.extensions.clone()),
            );
        }
        Value::Object(map)
    }
}

impl PartialEq for Problem {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code
            && self.detail == other.detail
            && self.extensions == other.extensions
            && self.instance == other.instance
            && self.stack == other.stack
            && self.status == other.status
            && self.title == other.title
            && self.type_uri == other.type_uri
            && self.uuid == other.uuid
            && self.log_level == other.log_level
            && self.log_stack == other.log_stack
            && self.log_uuid == other.log_uuid
            && self.source.as_ref().map(ToString::to_string)
                == other.source.as_ref().map(ToString::to_string)
    }
}

impl fmt::Debug for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Problem")
            .field("code", &self.code)
            .field("detail", &self.detail)
            .field("extensions", &self.extensions)
            .field("instance", &self.instance)
            .field("stack", &self.stack)
            .field("status", &self.status)
            .field("title", &self.title)
            .field("type", &self.type_uri)
            .field("uuid", &self.uuid)
            .field("source", &self.source.as_ref().map(ToString::to_string))
            .field("log_level", &self.log_level)
            .field("log_stack", &self.log_stack)
            .field("log_uuid", &self.log_uuid)
            .finish()
    }
}

/// `"<status> <title>[ - <detail>][ [<code>]]"`
impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.status)?;
        if !self.title.is_empty() {
            write!(f, " {}", self.title)?;
        }
        if !self.detail.is_empty() {
            write!(f, " - {}", self.detail)?;
        }
        if !self.code.is_empty() {
            write!(f, " [{}]", self.code)?;
        }
        Ok(())
    }
}

impl Error for Problem {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source.as_deref().map(|e| e as &(dyn Error + 'static))
    }
}

impl Serialize for Problem {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        if !self.code.is_empty() {
            map.serialize_entry("code", &self.code)?;
        }
        if !self.detail.is_empty() {
            map.serialize_entry("detail", &self.detail)?;
        }
        if !self.instance.is_empty() {
            map.serialize_entry("instance", &self.instance)?;
        }
        if !self.stack.is_empty() {
            map.serialize_entry("stack", &self.stack)?;
        }
        map.serialize_entry("status", &self.status)?;
        map.serialize_entry("title", &self.title)?;
        map.serialize_entry("type", &self.type_uri)?;
        if !self.uuid.is_empty() {
            map.serialize_entry("uuid", &self.uuid)?;
        }
        for (key, value) in &self.extensions {
            validate_extension_key(key).map_err(S::Error::custom)?;
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

#[derive(Deserialize)]
struct WireProblem {
    #[serde(default)]
    code: Code,
    #[serde(default)]
    detail: String,
    #[serde(default)]
    instance: String,
    #[serde(default)]
    stack: String,
    #[serde(default)]
    status: u16,
    #[serde(default)]
    title: String,
    #[serde(default, rename = "type")]
    type_uri: String,
    #[serde(default)]
    uuid: String,
    #[serde(flatten)]
    extensions: Extensions,
}

/// Unknown top-level members become extensions; reserved keys never do.
impl<'de> Deserialize<'de> for Problem {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let mut wire = WireProblem::deserialize(deserializer)?;
        wire.extensions.retain(|key, _| validate_extension_key(key).is_ok());
        Ok(Self {
            code: wire.code,
            detail: wire.detail,
            extensions: wire.extensions,
            instance: wire.instance,
            stack: wire.stack,
            status: wire.status,
            title: wire.title,
            type_uri: wire.type_uri,
            uuid: wire.uuid,
            ..Self::default()
        })
    }
}
