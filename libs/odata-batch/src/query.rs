//! OData query string → backend query parameters.
//!
//! Only two OData keywords are rewritten:
//!
//! | OData                     | Backend              |
//! |---------------------------|----------------------|
//! | `$select=a,b`             | `select=a,b`         |
//! | `$filter=<col> eq <val>`  | `<col>=eq.<val>`     |
//!
//! Everything else, including other `$` keywords, is forwarded unchanged.
//! A `$filter` that is not a single equality comparison is dropped: it has no
//! effect on the backend query. Broader filter grammar is out of scope and is
//! never guessed at.

use url::form_urlencoded;

const SELECT: &str = "$select";
const FILTER: &str = "$filter";
const BACKEND_SELECT: &str = "select";
const EQ_INFIX: &str = " eq ";

/// Ordered multimap of query parameters. Keys may repeat and insertion order
/// is preserved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode an `application/x-www-form-urlencoded` query string (without the
    /// leading `?`).
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        form_urlencoded::parse(raw.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.push((key.into(), value.into()));
    }

    /// All values recorded for `key`, in insertion order.
    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.0
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.iter().any(|(k, _)| k == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Encode back into a query string, preserving parameter order.
    #[must_use]
    pub fn to_query_string(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.iter())
            .finish()
    }
}

impl<K, V> FromIterator<(K, V)> for QueryParams
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl IntoIterator for QueryParams {
    type Item = (String, String);
    type IntoIter = std::vec::IntoIter<(String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Query parameters in backend filter syntax (`column=eq.value`).
///
/// Only produced by [`translate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendQuery(QueryParams);

impl BackendQuery {
    #[must_use]
    pub fn params(&self) -> &QueryParams {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn to_query_string(&self) -> String {
        self.0.to_query_string()
    }
}

/// Translate OData query parameters into backend query parameters.
///
/// Output order follows input order: a rewritten parameter takes the position
/// of the parameter it replaces.
#[must_use]
pub fn translate(raw: &QueryParams) -> BackendQuery {
    let mut out = QueryParams::new();
    for (key, value) in raw.iter() {
        match key {
            SELECT => out.push(BACKEND_SELECT, value),
            FILTER => match equality_filter(value) {
                Some((column, literal)) => out.push(column, format!("eq.{literal}")),
                None => {
                    tracing::warn!(filter = %value, "$filter is not a single 'eq' comparison; dropped");
                }
            },
            _ => out.push(key, value),
        }
    }
    BackendQuery(out)
}

/// Recognize `<column> eq <literal>` and nothing else.
///
/// The column must be a plain identifier. The literal must be one quoted string
/// (`'...'` with `''` escapes) or a single token without quotes, so compound
/// expressions such as `A eq 1 and B eq 2` and unbalanced quotes such as `'''`
/// are rejected instead of mis-split.
fn equality_filter(expr: &str) -> Option<(&str, &str)> {
    let (column, literal) = expr.trim().split_once(EQ_INFIX)?;
    let column = column.trim();
    let literal = literal.trim();

    if !is_identifier(column) || literal.is_empty() {
        return None;
    }

    if is_quoted_string(literal)
        || !literal.contains(|c: char| c.is_whitespace() || c == '\'')
    {
        Some((column, literal))
    } else {
        None
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

fn is_quoted_string(s: &str) -> bool {
    let Some(inner) = s
        .strip_prefix('\'')
        .and_then(|rest| rest.strip_suffix('\''))
    else {
        return false;
    };
    !inner.replace("''", "").contains('\'')
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> QueryParams {
        pairs.iter().copied().collect()
    }

    #[test]
    fn select_is_renamed() {
        let out = translate(&params(&[("$select", "Year,Month")]));
        assert_eq!(out.params(), &params(&[("select", "Year,Month")]));
    }

    #[test]
    fn eq_filter_becomes_column_param() {
        let out = translate(&params(&[("$filter", "Year eq 2024")]));
        assert_eq!(out.params(), &params(&[("Year", "eq.2024")]));
    }

    #[test]
    fn quoted_literal_is_kept_verbatim() {
        let out = translate(&params(&[("$filter", "Origin eq 'JFK'")]));
        assert_eq!(out.params(), &params(&[("Origin", "eq.'JFK'")]));

        let out = translate(&params(&[("$filter", "Name eq 'O''Hare Intl'")]));
        assert_eq!(out.params(), &params(&[("Name", "eq.'O''Hare Intl'")]));
    }

    #[test]
    fn non_eq_filter_is_dropped() {
        for expr in [
            "Year gt 2024",
            "Year ne 2024",
            "Year lt 2024",
            "Year eq 2024 and Month eq 1",
            "Origin eq 'JFK' or Origin eq 'LAX'",
            "startswith(Origin,'J') eq true",
            "Year EQ 2024",
            "Name eq '''",
            "Name eq 'JFK",
            "Name eq O'Hare",
            "",
        ] {
            let out = translate(&params(&[("$filter", expr)]));
            assert!(out.is_empty(), "expected '{expr}' to be dropped, got {out:?}");
        }
    }

    #[test]
    fn other_params_pass_through_in_order() {
        let raw = params(&[
            ("$top", "10"),
            ("$filter", "Year eq 2024"),
            ("limit", "5"),
            ("$select", "Year"),
            ("$format", "json"),
        ]);
        let out = translate(&raw);
        assert_eq!(
            out.params(),
            &params(&[
                ("$top", "10"),
                ("Year", "eq.2024"),
                ("limit", "5"),
                ("select", "Year"),
                ("$format", "json"),
            ])
        );
    }

    #[test]
    fn repeated_keys_are_all_translated() {
        let raw = params(&[("$filter", "Year eq 2024"), ("$filter", "Month eq 3")]);
        let out = translate(&raw);
        assert_eq!(
            out.params(),
            &params(&[("Year", "eq.2024"), ("Month", "eq.3")])
        );
    }

    #[test]
    fn translation_is_deterministic() {
        let raw = QueryParams::parse("$select=Year,Month&$filter=Origin%20eq%20JFK&x=1&x=2");
        let first = translate(&raw).to_query_string();
        for _ in 0..10 {
            assert_eq!(translate(&raw).to_query_string(), first);
        }
        assert_eq!(first, "select=Year%2CMonth&Origin=eq.JFK&x=1&x=2");
    }

    #[test]
    fn parse_decodes_plus_and_percent() {
        let q = QueryParams::parse("$filter=Year+eq+2024&$select=A%2CB");
        assert_eq!(q.get_all("$filter").collect::<Vec<_>>(), vec!["Year eq 2024"]);
        assert_eq!(q.get_all("$select").collect::<Vec<_>>(), vec!["A,B"]);
        assert!(q.contains_key("$select"));
        assert_eq!(q.len(), 2);
    }
}
