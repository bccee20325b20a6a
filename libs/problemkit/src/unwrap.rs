//! Finding problems in error chains and inheriting their fields.

use std::error::Error;
use std::fmt;
use std::sync::Arc;

use crate::code::Code;
use crate::log::LogLevel;
use crate::matcher::{Matcher, matches_all};
use crate::problem::{Extensions, Problem};

/// Fields a [`Builder`](crate::Builder) inherits from a wrapped problem.
///
/// Inherited values only beat definition and type defaults; explicit builder
/// values always win. Empty strings, empty maps and a zero status are treated
/// as absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inherited {
    pub code: Option<Code>,
    pub detail: Option<String>,
    pub extensions: Option<Extensions>,
    pub instance: Option<String>,
    pub status: Option<u16>,
    pub title: Option<String>,
    pub type_uri: Option<String>,
    pub stack: Option<String>,
    pub uuid: Option<String>,
    pub log_level: Option<LogLevel>,
    pub log_stack: Option<String>,
    pub log_uuid: Option<String>,
}

fn present(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_owned())
}

impl Inherited {
    /// Fields meant to survive re-wrapping: stack trace, identifier and log data.
    #[must_use]
    pub fn propagated(problem: &Problem) -> Self {
        Self {
            stack: present(&problem.stack),
            uuid: present(&problem.uuid),
            log_level: problem.log_level,
            log_stack: present(&problem.log_stack),
            log_uuid: present(&problem.log_uuid),
            ..Self::default()
        }
    }

    /// Every public field, extensions and log data.
    #[must_use]
    pub fn all(problem: &Problem) -> Self {
        Self {
            code: (!problem.code.is_empty()).then(|| problem.code.clone()),
            detail: present(&problem.detail),
            extensions: (!problem.extensions.is_empty()).then(|| problem.extensions.clone()),
            instance: present(&problem.instance),
            status: (problem.status != 0).then_some(problem.status),
            title: present(&problem.title),
            type_uri: present(&problem.type_uri),
            ..Self::propagated(problem)
        }
    }
}

type UnwrapFn = dyn Fn(&(dyn Error + 'static)) -> Inherited + Send + Sync;

/// Strategy deciding what a builder inherits from a problem found in the
/// chain of the error it wraps.
#[derive(Clone, Default)]
pub enum Unwrapper {
    /// Inherit nothing.
    None,
    /// Inherit [`Inherited::propagated`] fields.
    #[default]
    Propagated,
    /// Inherit [`Inherited::all`] fields.
    All,
    Custom(Arc<UnwrapFn>),
}

impl Unwrapper {
    #[must_use]
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&(dyn Error + 'static)) -> Inherited + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(f))
    }

    #[must_use]
    pub fn unwrap_error(&self, err: &(dyn Error + 'static)) -> Inherited {
        match self {
            Self::None => Inherited::default(),
            Self::Propagated => {
                as_problem(err).map_or_else(Inherited::default, Inherited::propagated)
            }
            Self::All => as_problem(err).map_or_else(Inherited::default, Inherited::all),
            Self::Custom(f) => f(err),
        }
    }
}

impl fmt::Debug for Unwrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Propagated => f.write_str("Propagated"),
            Self::All => f.write_str("All"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Walks the `source` chain of `err`, starting with `err` itself, and returns
/// the first [`Problem`].
#[must_use]
pub fn as_problem<'e>(err: &'e (dyn Error + 'static)) -> Option<&'e Problem> {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(problem) = e.downcast_ref::<Problem>() {
            return Some(problem);
        }
        current = e.source();
    }
    None
}

#[must_use]
pub fn is_problem(err: &(dyn Error + 'static)) -> bool {
    as_problem(err).is_some()
}

/// Returns the first problem in the chain of `err` satisfying every matcher.
///
/// When a problem found in the chain does not match, the search resumes from
/// that problem's own wrapped error, so an outer problem never hides a
/// matching inner one.
#[must_use]
pub fn as_match<'e>(err: &'e (dyn Error + 'static), matchers: &[Matcher]) -> Option<&'e Problem> {
    let mut problem = as_problem(err)?;
    loop {
        if matches_all(Some(problem), matchers) {
            return Some(problem);
        }
        problem = as_problem(problem.source()?)?;
    }
}

#[must_use]
pub fn is_match(err: &(dyn Error + 'static), matchers: &[Matcher]) -> bool {
    as_match(err, matchers).is_some()
}

/// Like [`as_match`], falling back to `default` when nothing matches.
pub fn as_match_or_else<F>(err: &(dyn Error + 'static), matchers: &[Matcher], default: F) -> Problem
where
    F: FnOnce() -> Problem,
{
    as_match(err, matchers).map_or_else(default, Clone::clone)
}
