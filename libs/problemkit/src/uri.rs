//! Composition of `type` and `instance` URI references.

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::fmt;

use url::Url;
use url::form_urlencoded::Serializer;

/// Builds a URI reference from an optional base URL, a path with `:name`
/// placeholders, query parameters and a fragment.
///
/// Without a base the result is a relative reference such as
/// `/users/42?verbose=true#name`. The path is always rooted.
///
/// ```
/// use problemkit::UriBuilder;
///
/// let uri = UriBuilder::new()
///     .path("/tenants/:tenant/users/:id")
///     .path_value("tenant", "acme corp")
///     .path_value("id", "42")
///     .add_query("view", "full")
///     .to_string();
/// assert_eq!(uri, "/tenants/acme%20corp/users/42?view=full");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[must_use]
pub struct UriBuilder {
    base: Option<Url>,
    fragment: String,
    path: String,
    path_values: BTreeMap<String, String>,
    queries: BTreeMap<String, Vec<String>>,
    trailing_slash: Option<bool>,
}

impl UriBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `base` and uses it as the base URL.
    ///
    /// # Errors
    /// Returns the parse error if `base` is not an absolute URL.
    pub fn base(self, base: &str) -> Result<Self, url::ParseError> {
        Ok(self.base_url(Url::parse(base)?))
    }

    /// Uses `base` without its query and fragment.
    pub fn base_url(mut self, mut base: Url) -> Self {
        base.set_query(None);
        base.set_fragment(None);
        self.base = Some(base);
        self
    }

    pub fn clear_base(mut self) -> Self {
        self.base = None;
        self
    }

    pub fn fragment(mut self, fragment: impl Into<String>) -> Self {
        self.fragment = fragment.into();
        self
    }

    /// Replaces the path of the base URL, if any.
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Value replacing the `:name` placeholder, percent-encoded.
    pub fn path_value(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_values.insert(name.into(), value.into());
        self
    }

    /// Merges placeholder values; an empty collection clears them.
    pub fn path_values<I, K, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut values = values.into_iter().peekable();
        if values.peek().is_none() {
            self.path_values.clear();
            return self;
        }
        self.path_values
            .extend(values.map(|(name, value)| (name.into(), value.into())));
        self
    }

    /// Appends a value to the query parameter `key`.
    pub fn add_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.queries.entry(key.into()).or_default().push(value.into());
        self
    }

    /// Replaces every value of the query parameter `key`.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.queries.insert(key.into(), vec![value.into()]);
        self
    }

    /// Replaces the values of each given key; an empty collection clears all
    /// query parameters.
    pub fn queries<I, K>(mut self, queries: I) -> Self
    where
        I: IntoIterator<Item = (K, Vec<String>)>,
        K: Into<String>,
    {
        let mut queries = queries.into_iter().peekable();
        if queries.peek().is_none() {
            self.queries.clear();
            return self;
        }
        self.queries
            .extend(queries.map(|(key, values)| (key.into(), values)));
        self
    }

    /// Forces the path to end (`true`) or not end (`false`) with a slash.
    pub fn trailing_slash(mut self, trailing_slash: bool) -> Self {
        self.trailing_slash = Some(trailing_slash);
        self
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn resolved_path(&self) -> String {
        let mut path = match (&self.base, self.path.is_empty()) {
            (Some(base), true) => base.path().to_owned(),
            _ => self.path.clone(),
        };
        if !path.starts_with('/') {
            path.insert(0, '/');
        }

        // Longest names first so that `:id` never eats into `:identifier`.
        let mut values: Vec<(&String, &String)> = self.path_values.iter().collect();
        values.sort_by_key(|(name, _)| Reverse(name.len()));
        for (name, value) in values {
            path = path.replace(&format!(":{name}"), &urlencoding::encode(value));
        }

        match self.trailing_slash {
            Some(true) if !path.ends_with('/') => path.push('/'),
            Some(false) if path.len() > 1 && path.ends_with('/') => {
                path.pop();
            }
            _ => {}
        }
        path
    }

    fn encoded_query(&self) -> Option<String> {
        if self.queries.is_empty() {
            return None;
        }
        let mut serializer = Serializer::new(String::new());
        for (key, values) in &self.queries {
            for value in values {
                serializer.append_pair(key, value);
            }
        }
        Some(serializer.finish())
    }

    /// Absolute URL, when a base is set.
    #[must_use]
    pub fn to_url(&self) -> Option<Url> {
        let mut url = self.base.clone()?;
        url.set_path(&self.resolved_path());
        url.set_query(self.encoded_query().as_deref());
        url.set_fragment((!self.fragment.is_empty()).then_some(self.fragment.as_str()));
        Some(url)
    }
}

impl fmt::Display for UriBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(url) = self.to_url() {
            return f.write_str(url.as_str());
        }
        f.write_str(&self.resolved_path())?;
        if let Some(query) = self.encoded_query() {
            write!(f, "?{query}")?;
        }
        if !self.fragment.is_empty() {
            write!(f, "#{}", self.fragment)?;
        }
        Ok(())
    }
}
