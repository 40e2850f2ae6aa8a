//! Rich diagnostic error types for rulebase.
//!
//! The inference algorithms themselves never fail: every query ends in a
//! boolean or a fixpoint. Errors only arise while a rule base or knowledge
//! file is being built, and they carry miette error codes and help text so the
//! user knows which rule to fix.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for rule base construction and loading.
#[derive(Debug, Error, Diagnostic)]
pub enum RuleError {
    #[error("invalid condition: {message}")]
    #[diagnostic(
        code(rulebase::rules::invalid_condition),
        help(
            "Conditions are an atom, all(...) with at least one operand, \
             or(a, b) with exactly two operands, or not(c). \
             Atom names must not be empty."
        )
    )]
    InvalidCondition { message: String },

    /// `line` is the 1-based line of a text rule block, or 0 when the rule
    /// did not come from one.
    #[error("rule parse error: {message}")]
    #[diagnostic(
        code(rulebase::rules::parse),
        help("Rules are written `consequent :- cond, cond, ...`, optionally prefixed by `name:`.")
    )]
    Parse { line: usize, message: String },

    #[error("invalid atom: {message}")]
    #[diagnostic(
        code(rulebase::atom::invalid),
        help("Facts and goals must be non-empty names, e.g. `has_fur`.")
    )]
    InvalidAtom { message: String },

    #[error("failed to read knowledge base: {path}")]
    #[diagnostic(
        code(rulebase::knowledge::read),
        help("Ensure the file exists and is readable.")
    )]
    KnowledgeRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse knowledge base {path}: {message}")]
    #[diagnostic(
        code(rulebase::knowledge::parse),
        help("Knowledge bases are TOML (or JSON for `.json` files) with `facts`, `rules` and `[[rule]]` entries.")
    )]
    KnowledgeParse { path: String, message: String },
}

impl RuleError {
    fn map_message(self, f: impl FnOnce(String) -> String) -> Self {
        match self {
            Self::InvalidCondition { message } => Self::InvalidCondition { message: f(message) },
            Self::Parse { line, message } => Self::Parse {
                line,
                message: f(message),
            },
            Self::InvalidAtom { message } => Self::InvalidAtom { message: f(message) },
            other => other,
        }
    }

    /// Attach the text line a rule was read from.
    pub(crate) fn at_line(self, line: usize) -> Self {
        match self.map_message(|m| format!("line {line}: {m}")) {
            Self::Parse { message, .. } => Self::Parse { line, message },
            other => other,
        }
    }

    /// Attach the 1-based position of a rule within its rule base.
    pub(crate) fn at_rule(self, index: usize) -> Self {
        self.map_message(|m| format!("rule {index}: {m}"))
    }

    /// Attach the file (or other source) the failing input came from. The
    /// error kind is kept.
    pub(crate) fn in_origin(self, origin: &str) -> Self {
        self.map_message(|m| format!("{origin}: {m}"))
    }
}

/// Convenience alias for rulebase results.
pub type RuleResult<T> = std::result::Result<T, RuleError>;
