//! SQL identifiers that are safe to interpolate into statement text
//!
//! Table and column names cannot be bound as parameters, so every name that
//! ends up in SQL text goes through [`Identifier`]. There are two public ways
//! to obtain one:
//!
//! - [`Identifier::new`] checks a user-supplied name against
//!   `[A-Za-z_][A-Za-z0-9_]*` (used for names that do not exist yet, e.g. when
//!   creating a table)
//! - [`Identifier::resolve`] accepts a name only if it is a member of a set
//!   returned by the schema introspector
//!
//! Inside the crate, names read straight out of introspection results are
//! wrapped with `from_catalog`.

use std::fmt;

use crate::database::traits::DatabaseError;

/// Longest identifier PostgreSQL keeps without truncation (NAMEDATALEN - 1)
pub const MAX_IDENTIFIER_LENGTH: usize = 63;

/// A validated table or column name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(String);

impl Identifier {
    /// Validate a name against the safe identifier pattern
    pub fn new(name: &str) -> Result<Self, DatabaseError> {
        if is_safe_identifier(name) {
            Ok(Self(name.to_string()))
        } else {
            Err(DatabaseError::InvalidIdentifier(name.to_string()))
        }
    }

    /// Accept a name only if it appears in `known`, the catalog's own list
    ///
    /// Catalog names may contain characters outside the safe pattern (quoted
    /// identifiers); they are still emitted through [`Identifier::quoted`].
    pub fn resolve<'a, I>(name: &str, known: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        known
            .into_iter()
            .find(|candidate| *candidate == name)
            .map(|candidate| Self(candidate.to_string()))
    }

    /// Wrap a name the introspector has just reported for this connection
    pub(crate) fn from_catalog(name: &str) -> Self {
        Self(name.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Double-quoted form for SQL text, with embedded quotes doubled
    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.0.replace('"', "\"\""))
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`, at most [`MAX_IDENTIFIER_LENGTH`] bytes
pub fn is_safe_identifier(name: &str) -> bool {
    if name.len() > MAX_IDENTIFIER_LENGTH {
        return false;
    }
    let mut characters = name.chars();
    let Some(first) = characters.next() else {
        return false;
    };
    if !(first.is_ascii_alphabetic() || first == '_') {
        return false;
    }
    characters.all(|character| character.is_ascii_alphanumeric() || character == '_')
}
