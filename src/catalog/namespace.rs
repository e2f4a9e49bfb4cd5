/*!
Namespace identifiers: a sequence of non-empty levels (§4.L). Carried over from the teacher's
`catalog/namespace.rs` nearly unchanged, retargeted onto [IcebergError].
*/
use core::fmt::{self, Display};
use std::str::FromStr;

use itertools::Itertools;

use crate::error::{IcebergError, Result};

/// Separator between namespace levels in their string form.
pub static SEPARATOR: &str = ".";

/// A hierarchical namespace: zero or more non-empty levels.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    levels: Vec<String>,
}

impl Namespace {
    /// Builds a namespace from its levels, rejecting any empty level.
    pub fn try_new(levels: &[String]) -> Result<Self> {
        if levels.iter().any(|x| x.is_empty()) {
            Err(IcebergError::Message("namespace levels cannot be empty".to_string()))
        } else {
            Ok(Namespace { levels: levels.to_vec() })
        }
    }

    /// The top-level (root) namespace.
    pub fn empty() -> Self {
        Namespace { levels: vec![] }
    }

    /// The namespace's levels, outermost first.
    pub fn levels(&self) -> &[String] {
        &self.levels
    }

    /// Number of levels.
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// `true` for the root namespace.
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// The namespace one level up, or `None` for the root namespace.
    pub fn parent(&self) -> Option<Namespace> {
        if self.levels.is_empty() {
            None
        } else {
            Some(Namespace { levels: self.levels[..self.levels.len() - 1].to_vec() })
        }
    }
}

impl Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Itertools::intersperse(self.levels.iter().map(|x| x as &str), SEPARATOR).collect::<String>())
    }
}

impl FromStr for Namespace {
    type Err = IcebergError;

    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Ok(Namespace::empty());
        }
        let levels: Vec<String> = s.split(SEPARATOR).map(|x| x.to_string()).collect();
        Namespace::try_new(&levels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_dot_separated_levels() {
        let ns = Namespace::try_new(&["db".to_string(), "schema".to_string()]).unwrap();
        assert_eq!(ns.to_string(), "db.schema");
    }

    #[test]
    fn rejects_empty_level() {
        assert!(Namespace::try_new(&["".to_string()]).is_err());
    }

    #[test]
    fn parent_strips_last_level() {
        let ns = Namespace::try_new(&["db".to_string(), "schema".to_string()]).unwrap();
        assert_eq!(ns.parent().unwrap().to_string(), "db");
    }

    #[test]
    fn parses_from_str() {
        let ns: Namespace = "db.schema".parse().unwrap();
        assert_eq!(ns.levels(), &["db".to_string(), "schema".to_string()]);
    }
}
