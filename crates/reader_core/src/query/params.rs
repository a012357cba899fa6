//! Raw query parameters as received from an outer surface.

/// Ordered `(name, value)` pairs; a name may repeat (`flag=a&flag=b`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one pair, keeping earlier values for the same name.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((name.into(), value.into()));
    }

    /// Builder form of [`QueryParams::push`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(name, value);
        self
    }

    /// Parses one `name=value` token. A token without `=` is a bare flag
    /// with an empty value.
    pub fn push_token(&mut self, token: &str) {
        match token.split_once('=') {
            Some((name, value)) => self.push(name.trim(), value),
            None => self.push(token.trim(), ""),
        }
    }

    /// First non-blank value for `name`, trimmed.
    pub fn first(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .filter(|(key, _)| key == name)
            .map(|(_, value)| value.trim())
            .find(|value| !value.is_empty())
    }

    /// First non-blank value among several accepted names.
    pub fn first_of(&self, names: &[&str]) -> Option<&str> {
        names.iter().find_map(|name| self.first(name))
    }

    /// Every non-blank value for `name`, trimmed, in insertion order.
    pub fn all(&self, name: &str) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|(key, _)| key == name)
            .map(|(_, value)| value.trim())
            .filter(|value| !value.is_empty())
            .collect()
    }

    /// Positive integer value, or `None` when absent, non-numeric or <= 0.
    pub fn positive_u32(&self, name: &str) -> Option<u32> {
        self.first(name)
            .and_then(|value| value.parse::<i64>().ok())
            .filter(|value| *value > 0)
            .map(|value| u32::try_from(value).unwrap_or(u32::MAX))
    }

    /// `true` only for a case-insensitive `true` or `1`.
    pub fn flag(&self, name: &str) -> bool {
        self.first(name)
            .map(|value| value.eq_ignore_ascii_case("true") || value == "1")
            .unwrap_or(false)
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for QueryParams
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (name, value) in iter {
            params.push(name, value);
        }
        params
    }
}
