//! Named-parameter query templates.
//!
//! [`prepare`] finds `:name` tokens in a query; [`QueryTemplate::with`] binds
//! values to them and rewrites every token into positional placeholders:
//!
//! ```
//! use dbmapper::{prepare, Param};
//!
//! let query = prepare("select * from t where id in (:ids) and name like :kw").with([
//!     Param::list("ids", ["1", "2", "3"]),
//!     Param::new("kw", "%abc%"),
//! ]);
//! assert_eq!(query.sql(), "select * from t where id in (?, ?, ?) and name like ?");
//! assert_eq!(query.param_names(), [":ids", ":kw"]);
//! assert_eq!(query.params().len(), 4);
//! ```
//!
//! # Token grammar
//!
//! A token is `:` followed by one or more of `[A-Za-z0-9_]`. Never tokens:
//!
//! - a `::` cast (`created::date`)
//! - anything inside a single-quoted literal (`''` escapes a quote inside it,
//!   and `E'...'` strings also take backslash escapes)
//! - anything inside a `"quoted identifier"` or a `$$...$$` body
//! - `-- line` and `/* block */` comments
//!
//! Only a single quote that never closes makes the template malformed.
//! Tagged dollar quotes (`$fn$...$fn$`) are not recognized.
//!
//! # Repeated tokens
//!
//! Every occurrence of a name is rewritten, but the name is listed once in
//! [`BoundQuery::param_names`]. With `?` placeholders each occurrence
//! consumes its own copy of the values, so the argument list always matches
//! the placeholder count. With `$n` placeholders every occurrence reuses the
//! same numbers and the values appear once.

use std::collections::HashMap;
use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::QueryError;
use crate::value::Value;

/// Matches, in priority order: a line comment, a block comment, a `$$` body,
/// a quoted identifier, an `E'...'` string, a quoted literal, an unterminated
/// quote, a `::` cast, a named parameter.
static TOKEN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?s)--[^\n]*",
        r"|/\*.*?\*/",
        r"|\$\$.*?\$\$",
        r#"|"(?:[^"]|"")*""#,
        r"|\b[Ee]'(?:[^'\\]|\\.|'')*'",
        r"|'(?:[^']|'')*'",
        r"|(?P<open>')",
        r"|::",
        r"|:(?P<name>[A-Za-z0-9_]+)",
    ))
    .unwrap()
});

/// Positional placeholder syntax written into the rewritten query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placeholder {
    /// `?` (MySQL, SQLite, CQL)
    #[default]
    Question,
    /// `$1`, `$2`, ... (PostgreSQL)
    Dollar,
}

/// A named value (or list of values) supplied to [`QueryTemplate::with`].
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    name: String,
    values: Vec<Value>,
}

impl Param {
    /// A single-valued parameter. The leading `:` on `name` is optional.
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: token_name(name.into()),
            values: vec![value.into()],
        }
    }

    /// A multi-valued parameter, expanded to one placeholder per value.
    pub fn list<I, V>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self {
            name: token_name(name.into()),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// The parameter name in `:name` form.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

fn token_name(name: String) -> String {
    if name.starts_with(':') {
        name
    } else {
        format!(":{}", name)
    }
}

#[derive(Debug, Clone)]
struct Token {
    name: String,
    span: Range<usize>,
}

/// A query whose named tokens have been located but not yet bound.
#[derive(Debug, Clone)]
pub struct QueryTemplate {
    raw: String,
    tokens: Vec<Token>,
    names: Vec<String>,
    placeholder: Placeholder,
    error: Option<QueryError>,
}

/// Prepares a template that rewrites to `?` placeholders.
pub fn prepare(sql: impl Into<String>) -> QueryTemplate {
    prepare_with(sql, Placeholder::default())
}

/// Prepares a template with an explicit placeholder style.
pub fn prepare_with(sql: impl Into<String>, placeholder: Placeholder) -> QueryTemplate {
    let raw = sql.into();
    let mut tokens = Vec::new();
    let mut names: Vec<String> = Vec::new();
    let mut error = None;

    for caps in TOKEN_REGEX.captures_iter(&raw) {
        if let Some(open) = caps.name("open") {
            error = Some(QueryError::MalformedTemplate {
                position: open.start(),
                reason: "unterminated string literal".to_string(),
            });
            break;
        }
        if let (Some(whole), Some(name)) = (caps.get(0), caps.name("name")) {
            let name = format!(":{}", name.as_str());
            if !names.contains(&name) {
                names.push(name.clone());
            }
            tokens.push(Token {
                name,
                span: whole.range(),
            });
        }
    }

    QueryTemplate {
        raw,
        tokens,
        names,
        placeholder,
        error,
    }
}

impl QueryTemplate {
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Distinct token names in first-occurrence order, `:name` form.
    pub fn param_names(&self) -> &[String] {
        &self.names
    }

    pub fn placeholder(&self) -> Placeholder {
        self.placeholder
    }

    pub fn error(&self) -> Option<&QueryError> {
        self.error.as_ref()
    }

    /// Binds values and rewrites the query.
    ///
    /// Supplied parameters that match no token are ignored; if a name is
    /// supplied twice the last one is used. Failures are recorded on the
    /// returned query rather than returned.
    pub fn with<I>(self, params: I) -> BoundQuery
    where
        I: IntoIterator<Item = Param>,
    {
        if let Some(err) = self.error {
            return BoundQuery::failed(self.raw, err);
        }

        let supplied: HashMap<String, Vec<Value>> =
            params.into_iter().map(|p| (p.name, p.values)).collect();

        let missing: Vec<String> = self
            .names
            .iter()
            .filter(|name| !supplied.contains_key(name.as_str()))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return BoundQuery::failed(self.raw, QueryError::MissingParameters { names: missing });
        }
        if let Some(name) = self.names.iter().find(|name| supplied[name.as_str()].is_empty()) {
            let err = QueryError::EmptyParameter { name: name.clone() };
            return BoundQuery::failed(self.raw, err);
        }

        let mut sql = String::with_capacity(self.raw.len());
        let mut params = Vec::new();
        let mut numbered: HashMap<&str, usize> = HashMap::new();
        let mut next_number = 1;
        let mut last = 0;

        for token in &self.tokens {
            sql.push_str(&self.raw[last..token.span.start]);
            let values = &supplied[token.name.as_str()];
            let placeholders: Vec<String> = match self.placeholder {
                Placeholder::Question => {
                    params.extend(values.iter().cloned());
                    vec!["?".to_string(); values.len()]
                }
                Placeholder::Dollar => {
                    let first = *numbered.entry(token.name.as_str()).or_insert_with(|| {
                        let first = next_number;
                        next_number += values.len();
                        params.extend(values.iter().cloned());
                        first
                    });
                    (first..first + values.len()).map(|n| format!("${}", n)).collect()
                }
            };
            sql.push_str(&placeholders.join(", "));
            last = token.span.end;
        }
        sql.push_str(&self.raw[last..]);

        BoundQuery {
            raw: self.raw,
            sql,
            param_names: self.names,
            params,
            error: None,
        }
    }
}

/// A rewritten query and its flat, ordered argument list.
///
/// Immutable once built; every accessor returns the same value on every call.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundQuery {
    raw: String,
    sql: String,
    param_names: Vec<String>,
    params: Vec<Value>,
    error: Option<QueryError>,
}

impl BoundQuery {
    fn failed(raw: String, error: QueryError) -> Self {
        warn!(query = %raw, error = %error, "invalid query template");
        Self {
            raw,
            sql: String::new(),
            param_names: Vec::new(),
            params: Vec::new(),
            error: Some(error),
        }
    }

    /// The rewritten query, or `""` when the template is invalid.
    pub fn sql(&self) -> &str {
        if let Some(err) = &self.error {
            warn!(error = %err, "reading sql of an invalid query");
        }
        &self.sql
    }

    /// Flat argument list in placeholder order.
    pub fn params(&self) -> &[Value] {
        &self.params
    }

    /// Distinct parameter names, or empty when the template is invalid.
    pub fn param_names(&self) -> &[String] {
        if let Some(err) = &self.error {
            warn!(error = %err, "reading parameter names of an invalid query");
        }
        &self.param_names
    }

    pub fn error(&self) -> Option<&QueryError> {
        self.error.as_ref()
    }

    /// The query text before rewriting.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Splits into `(sql, params)` for a driver, or the recorded error.
    pub fn into_parts(self) -> Result<(String, Vec<Value>), QueryError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok((self.sql, self.params)),
        }
    }
}
