use std::{convert::Infallible, fmt, str::FromStr};

pub const GLOBAL: &str = "__global__";

/// Dot-joined path of scope names. The empty path is the global namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Namespace(Vec<String>);

impl Namespace {
    pub fn global() -> Self {
        Self(Vec::new())
    }

    pub fn is_global(&self) -> bool {
        self.0.is_empty()
    }

    pub fn child(&self, name: &str) -> Self {
        let mut path = self.0.clone();
        path.push(name.to_string());
        Self(path)
    }

    pub fn parent(&self) -> Option<Self> {
        let (_, init) = self.0.split_last()?;
        Some(Self(init.to_vec()))
    }

    /// This namespace followed by each enclosing one, ending at global.
    pub fn ancestors(&self) -> impl Iterator<Item = Namespace> + '_ {
        (0..=self.0.len()).rev().map(|n| Self(self.0[..n].to_vec()))
    }

    /// Fully qualified name of `name` declared in this namespace.
    pub fn qualify(&self, name: &str) -> String {
        if self.is_global() {
            name.to_string()
        } else {
            format!("{self}.{name}")
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_global() {
            write!(f, "{GLOBAL}")
        } else {
            write!(f, "{}", self.0.join("."))
        }
    }
}

impl FromStr for Namespace {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || s == GLOBAL {
            return Ok(Self::global());
        }
        Ok(Self(s.split('.').map(str::to_string).collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ancestors_walk_to_global() {
        let ns: Namespace = "a.b.c".parse().unwrap();
        let names = ns.ancestors().map(|ns| ns.to_string()).collect::<Vec<_>>();
        assert_eq!(names, vec!["a.b.c", "a.b", "a", GLOBAL]);
    }

    #[test]
    fn qualify() {
        assert_eq!(Namespace::global().qualify("x"), "x");
        assert_eq!(Namespace::global().child("main").qualify("x"), "main.x");
        assert_eq!(Namespace::global().parent(), None);
    }
}
