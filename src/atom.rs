//! Atoms: the named propositions that facts, goals and consequents refer to.
//!
//! An [`Atom`] is an opaque, case-sensitive name compared by exact value.
//! It is backed by an `Arc<str>` so that copying atoms between the rule base,
//! the fact store and trace records never reallocates the name.

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{RuleError, RuleResult};

/// An opaque named proposition.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Atom(Arc<str>);

impl Atom {
    /// Create an atom from any string-like value.
    ///
    /// Emptiness is not checked here; use [`Atom::parse`] at input
    /// boundaries where an empty name is a user error.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// Create an atom from user input, trimming whitespace and rejecting
    /// empty names.
    pub fn parse(name: &str) -> RuleResult<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RuleError::InvalidAtom {
                message: "atom name is empty".into(),
            });
        }
        Ok(Self::new(name))
    }

    /// The atom's name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Atom({:?})", &*self.0)
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Atom {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Atom {
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

impl AsRef<str> for Atom {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Atom {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl Serialize for Atom {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Atom {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Self::from(name))
    }
}
