//! Schema naming resolution.
//!
//! Maps logical entity-type names to physical table names and logical field
//! names to physical column names. The compiler emits every identifier it
//! writes into SQL through a [`NamingStrategy`], so the physical layout is
//! owned by the storage backend's configured convention rather than by the
//! filter being compiled.
//!
//! The default [`SnakeCaseNaming`] follows the usual ORM rules:
//!
//! | logical          | physical            |
//! |------------------|---------------------|
//! | `User`           | `users`             |
//! | `UserTeamRole`   | `user_team_roles`   |
//! | `Repository`     | `repositories`      |
//! | `ParentID`       | `parent_id`         |

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Naming convention of the storage backend.
///
/// Implementations must be pure and total: the same input always yields the
/// same identifier.
pub trait NamingStrategy: Send + Sync {
    /// Physical table name for a logical entity type.
    fn table_name(&self, entity_type: &str) -> String;

    /// Physical column name for a logical field of `table`.
    fn column_name(&self, table: &str, field: &str) -> String;
}

/// How logical field names are turned into column names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnConvention {
    /// `ParentID` → `parent_id`
    #[default]
    #[serde(rename = "snake_case")]
    SnakeCase,
    /// `ParentID` → `parentId`
    #[serde(rename = "camelCase")]
    CamelCase,
}

#[derive(Debug, Clone, Error, PartialEq)]
#[error("Unknown column convention `{0}` (expected `snake_case` or `camelCase`)")]
pub struct UnknownColumnConvention(pub String);

impl FromStr for ColumnConvention {
    type Err = UnknownColumnConvention;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "snake_case" => Ok(ColumnConvention::SnakeCase),
            "camelCase" => Ok(ColumnConvention::CamelCase),
            other => Err(UnknownColumnConvention(other.to_string())),
        }
    }
}

impl fmt::Display for ColumnConvention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnConvention::SnakeCase => write!(f, "snake_case"),
            ColumnConvention::CamelCase => write!(f, "camelCase"),
        }
    }
}

/// Default naming strategy: snake_case, pluralised tables, optional prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnakeCaseNaming {
    /// Prepended verbatim to every table name.
    pub table_prefix: String,
    /// Skip pluralisation (`User` → `user` instead of `users`).
    pub singular_tables: bool,
    pub column_convention: ColumnConvention,
}

impl SnakeCaseNaming {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.table_prefix = prefix.into();
        self
    }

    pub fn with_singular_tables(mut self, singular: bool) -> Self {
        self.singular_tables = singular;
        self
    }

    pub fn with_column_convention(mut self, convention: ColumnConvention) -> Self {
        self.column_convention = convention;
        self
    }
}

impl NamingStrategy for SnakeCaseNaming {
    fn table_name(&self, entity_type: &str) -> String {
        let base = to_snake_case(entity_type);
        let base = if self.singular_tables {
            base
        } else {
            pluralize(&base)
        };
        format!("{}{}", self.table_prefix, base)
    }

    fn column_name(&self, _table: &str, field: &str) -> String {
        let snake = to_snake_case(field);
        match self.column_convention {
            ColumnConvention::SnakeCase => snake,
            ColumnConvention::CamelCase => snake_to_camel_case(&snake),
        }
    }
}

/// Convert a PascalCase / camelCase name to snake_case.
///
/// Runs of capitals are treated as one initialism, so `HTTPServer` becomes
/// `http_server` and `ParentID` becomes `parent_id`. Names that are already
/// snake_case come back unchanged.
pub fn to_snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut result = String::with_capacity(name.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                let prev = chars[i - 1];
                let next_is_lower = chars
                    .get(i + 1)
                    .is_some_and(|next| next.is_ascii_lowercase());
                if prev.is_ascii_lowercase()
                    || prev.is_ascii_digit()
                    || (prev.is_ascii_uppercase() && next_is_lower)
                {
                    result.push('_');
                }
            }
            result.push(c.to_ascii_lowercase());
        } else {
            result.push(c);
        }
    }

    result
}

/// Convert snake_case to camelCase
fn snake_to_camel_case(s: &str) -> String {
    let mut result = String::new();
    let mut capitalize_next = false;

    for c in s.chars() {
        if c == '_' {
            capitalize_next = !result.is_empty();
        } else if capitalize_next {
            result.push(c.to_ascii_uppercase());
            capitalize_next = false;
        } else {
            result.push(c);
        }
    }

    result
}

const IRREGULAR_PLURALS: &[(&str, &str)] = &[
    ("person", "people"),
    ("child", "children"),
    ("man", "men"),
    ("woman", "women"),
    ("mouse", "mice"),
];

/// English pluralisation of the last snake_case segment.
fn pluralize(word: &str) -> String {
    if word.is_empty() {
        return String::new();
    }

    let (head, last) = match word.rfind('_') {
        Some(idx) => word.split_at(idx + 1),
        None => ("", word),
    };

    if let Some((_, plural)) = IRREGULAR_PLURALS
        .iter()
        .find(|(singular, _)| *singular == last)
    {
        return format!("{}{}", head, plural);
    }

    if ["s", "x", "z", "ch", "sh"]
        .iter()
        .any(|suffix| last.ends_with(suffix))
    {
        return format!("{}es", word);
    }

    if let Some(stem) = last.strip_suffix('y') {
        let consonant_before = stem
            .chars()
            .last()
            .is_some_and(|c| !matches!(c, 'a' | 'e' | 'i' | 'o' | 'u'));
        if consonant_before {
            return format!("{}{}ies", head, stem);
        }
    }

    format!("{}s", word)
}

/// Double-quoted SQL identifier, embedded quotes doubled. Keywords such as
/// `order` or `group` are safe as table and column names once quoted.
pub fn quote_identifier(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// True when `ident` matches `[A-Za-z_][A-Za-z0-9_]*`. Identifiers are still
/// quoted when emitted; this only rejects names no convention should produce.
pub fn is_valid_identifier(ident: &str) -> bool {
    let mut chars = ident.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
