//! Composable predicates over [`Problem`] fields.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::code::{Code, CodeSettings};
use crate::generator::Generator;
use crate::problem::Problem;

/// Relational operator applied as `<problem field> <op> <operand>`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Operator {
    #[default]
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl Operator {
    #[must_use]
    pub fn compare<T: Ord + ?Sized>(self, actual: &T, expected: &T) -> bool {
        let ordering = actual.cmp(expected);
        match self {
            Self::Eq => ordering == Ordering::Equal,
            Self::Ne => ordering != Ordering::Equal,
            Self::Gt => ordering == Ordering::Greater,
            Self::Ge => ordering != Ordering::Less,
            Self::Lt => ordering == Ordering::Less,
            Self::Le => ordering != Ordering::Greater,
        }
    }
}

type MatchFn = dyn Fn(&Problem) -> bool + Send + Sync;

/// Predicate over a problem.
///
/// Field matchers compare with [`Operator::Eq`] unless built through their
/// `*_with` variant.
#[derive(Clone)]
pub struct Matcher(Arc<MatchFn>);

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Matcher(..)")
    }
}

impl Matcher {
    #[must_use]
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Problem) -> bool + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    #[must_use]
    pub fn matches(&self, problem: &Problem) -> bool {
        (self.0)(problem)
    }

    #[must_use]
    pub fn code(code: impl Into<Code>) -> Self {
        Self::code_with(code, Operator::Eq)
    }

    #[must_use]
    pub fn code_with(code: impl Into<Code>, op: Operator) -> Self {
        let code = code.into();
        Self::new(move |p| op.compare(p.code(), &code))
    }

    /// Matches the namespace of a code parsed with the global generator's
    /// settings. Problems whose code does not parse never match.
    #[must_use]
    pub fn code_namespace(namespace: impl Into<String>) -> Self {
        Self::code_namespace_using(
            Generator::global().code_settings().clone(),
            namespace,
            Operator::Eq,
        )
    }

    #[must_use]
    pub fn code_namespace_using(
        settings: CodeSettings,
        namespace: impl Into<String>,
        op: Operator,
    ) -> Self {
        let namespace = namespace.into();
        Self::new(move |p| {
            settings
                .coder(None)
                .parse(p.code().as_str())
                .is_ok_and(|parsed| op.compare(parsed.namespace.as_str(), namespace.as_str()))
        })
    }

    /// Matches the numeric value of a code parsed with the global generator's
    /// settings. Problems whose code does not parse never match.
    #[must_use]
    pub fn code_value(value: u64) -> Self {
        Self::code_value_using(
            Generator::global().code_settings().clone(),
            value,
            Operator::Eq,
        )
    }

    #[must_use]
    pub fn code_value_using(settings: CodeSettings, value: u64, op: Operator) -> Self {
        Self::new(move |p| {
            settings
                .coder(None)
                .parse(p.code().as_str())
                .is_ok_and(|parsed| op.compare(&parsed.value, &value))
        })
    }

    #[must_use]
    pub fn detail(detail: impl Into<String>) -> Self {
        Self::detail_with(detail, Operator::Eq)
    }

    #[must_use]
    pub fn detail_with(detail: impl Into<String>, op: Operator) -> Self {
        let detail = detail.into();
        Self::new(move |p| op.compare(p.detail(), detail.as_str()))
    }

    #[must_use]
    pub fn instance(instance: impl Into<String>) -> Self {
        Self::instance_with(instance, Operator::Eq)
    }

    #[must_use]
    pub fn instance_with(instance: impl Into<String>, op: Operator) -> Self {
        let instance = instance.into();
        Self::new(move |p| op.compare(p.instance(), instance.as_str()))
    }

    #[must_use]
    pub fn status(status: u16) -> Self {
        Self::status_with(status, Operator::Eq)
    }

    #[must_use]
    pub fn status_with(status: u16, op: Operator) -> Self {
        Self::new(move |p| op.compare(&p.status(), &status))
    }

    #[must_use]
    pub fn title(title: impl Into<String>) -> Self {
        Self::title_with(title, Operator::Eq)
    }

    #[must_use]
    pub fn title_with(title: impl Into<String>, op: Operator) -> Self {
        let title = title.into();
        Self::new(move |p| op.compare(p.title(), title.as_str()))
    }

    #[must_use]
    pub fn type_uri(type_uri: impl Into<String>) -> Self {
        Self::type_uri_with(type_uri, Operator::Eq)
    }

    #[must_use]
    pub fn type_uri_with(type_uri: impl Into<String>, op: Operator) -> Self {
        let type_uri = type_uri.into();
        Self::new(move |p| op.compare(p.type_uri(), type_uri.as_str()))
    }

    /// Matches problems carrying an extension named `key`.
    #[must_use]
    pub fn extension(key: impl Into<String>) -> Self {
        let key = key.into();
        Self::new(move |p| p.extension(&key).is_some())
    }

    /// Matches problems carrying every extension in `keys`.
    #[must_use]
    pub fn extensions<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        let keys: Vec<String> = keys.into_iter().map(Into::into).collect();
        Self::new(move |p| keys.iter().all(|key| p.extension(key).is_some()))
    }

    /// Matches problems with a stack trace on the public field.
    #[must_use]
    pub fn has_stack() -> Self {
        Self::new(|p| !p.stack().is_empty())
    }

    /// Matches problems with an identifier on the public field.
    #[must_use]
    pub fn has_uuid() -> Self {
        Self::new(|p| !p.uuid().is_empty())
    }

    /// Conjunction; an empty list matches everything.
    #[must_use]
    pub fn all(matchers: impl IntoIterator<Item = Matcher>) -> Self {
        let matchers: Vec<Matcher> = matchers.into_iter().collect();
        Self::new(move |p| matchers.iter().all(|m| m.matches(p)))
    }

    /// Disjunction; an empty list matches nothing.
    #[must_use]
    pub fn any(matchers: impl IntoIterator<Item = Matcher>) -> Self {
        let matchers: Vec<Matcher> = matchers.into_iter().collect();
        Self::new(move |p| matchers.iter().any(|m| m.matches(p)))
    }
}

/// Whether `problem` satisfies every matcher.
///
/// An empty list matches anything, including no problem at all; otherwise a
/// missing problem never matches.
#[must_use]
pub fn matches_all(problem: Option<&Problem>, matchers: &[Matcher]) -> bool {
    if matchers.is_empty() {
        return true;
    }
    problem.is_some_and(|p| matchers.iter().all(|m| m.matches(p)))
}
