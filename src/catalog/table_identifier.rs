/*!
Table identifiers: a namespace plus a table name (§4.L). Carried over from the teacher's
`catalog/table_identifier.rs`, retargeted onto [IcebergError] in place of `anyhow`.
*/
use core::fmt::{self, Display};
use std::str::FromStr;

use super::namespace::Namespace;
use crate::error::{IcebergError, Result};

/// Separator between namespace levels and the table name in string form.
pub static SEPARATOR: &str = ".";

/// Identifies a table within a catalog: `(namespace, name)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableIdentifier {
    namespace: Namespace,
    name: String,
}

impl TableIdentifier {
    /// Builds an identifier from `names`, the last element being the table name and the rest
    /// the namespace.
    pub fn try_new(names: &[String]) -> Result<Self> {
        let length = names.len();
        if names.is_empty() {
            Err(IcebergError::Message(
                "cannot create a table identifier from an empty sequence".to_string(),
            ))
        } else if names[length - 1].is_empty() {
            Err(IcebergError::Message("table name cannot be empty".to_string()))
        } else {
            Ok(TableIdentifier {
                namespace: Namespace::try_new(&names[0..length - 1])?,
                name: names[length - 1].clone(),
            })
        }
    }

    /// Parses a dot-separated identifier string.
    pub fn parse(identifier: &str) -> Result<Self> {
        let names = identifier.split(SEPARATOR).map(|x| x.to_string()).collect::<Vec<String>>();
        TableIdentifier::try_new(&names)
    }

    /// The table's namespace.
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// The table's name within its namespace.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Display for TableIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}{}{}", self.namespace, SEPARATOR, self.name)
        }
    }
}

impl FromStr for TableIdentifier {
    type Err = IcebergError;

    fn from_str(s: &str) -> Result<Self> {
        TableIdentifier::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::TableIdentifier;

    #[test]
    fn formats_namespace_dot_name() {
        let identifier =
            TableIdentifier::try_new(&["level1".to_string(), "level2".to_string(), "table".to_string()])
                .unwrap();
        assert_eq!(&format!("{identifier}"), "level1.level2.table");
    }

    #[test]
    fn rejects_empty_table_name() {
        assert!(TableIdentifier::try_new(&["level1".to_string(), "".to_string()]).is_err());
    }

    #[test]
    fn rejects_empty_identifier() {
        assert!(TableIdentifier::try_new(&[]).is_err());
    }

    #[test]
    fn parses_dot_separated_string() {
        let identifier: TableIdentifier = "level1.level2.table".parse().unwrap();
        assert_eq!(&format!("{identifier}"), "level1.level2.table");
    }
}
