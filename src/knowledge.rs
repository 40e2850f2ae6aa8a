//! Knowledge-base files: base facts plus a rule base, loaded from TOML or JSON.
//!
//! ```toml
//! name = "reptiles"
//! description = "Identify an animal by backward chaining."
//! facts = ["has_scales", "lays_eggs"]
//! rules = [
//!     "reptile :- has_scales, lays_eggs, can_swim",
//! ]
//!
//! [[rule]]
//! name = "veg"
//! consequent = "vegetarian"
//! antecedent = { not = { atom = "eats_meat" } }
//! ```
//!
//! Text `rules` keep their listed order and come before the structured
//! `[[rule]]` entries.

use std::path::Path;

use serde::Deserialize;

use crate::atom::Atom;
use crate::error::{RuleError, RuleResult};
use crate::facts::FactStore;
use crate::rules::{RawRule, Rule, RuleBase};

/// On-disk shape of a knowledge base.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct KnowledgeFile {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    facts: Vec<String>,
    #[serde(default)]
    rules: Vec<String>,
    #[serde(default)]
    rule: Vec<RawRule>,
}

/// Base facts and rules, validated and ready for either engine.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
    pub name: String,
    pub description: String,
    pub facts: FactStore,
    pub rules: RuleBase,
}

impl KnowledgeBase {
    /// Load a knowledge base from disk. `.json` files are read as JSON,
    /// everything else as TOML.
    pub fn load(path: &Path) -> RuleResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| RuleError::KnowledgeRead {
            path: path.display().to_string(),
            source: e,
        })?;
        let origin = path.display().to_string();
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let mut kb = if is_json {
            Self::from_json_str(&content, &origin)?
        } else {
            Self::from_toml_str(&content, &origin)?
        };
        if kb.name.is_empty() {
            kb.name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
        }
        tracing::debug!(
            path = %path.display(),
            facts = kb.facts.len(),
            rules = kb.rules.len(),
            "loaded knowledge base"
        );
        Ok(kb)
    }

    /// Parse a TOML knowledge base. `origin` names the source in errors.
    pub fn from_toml_str(content: &str, origin: &str) -> RuleResult<Self> {
        let file: KnowledgeFile = toml::from_str(content).map_err(|e| RuleError::KnowledgeParse {
            path: origin.to_string(),
            message: e.to_string(),
        })?;
        Self::from_file(file, origin)
    }

    /// Parse a JSON knowledge base. `origin` names the source in errors.
    pub fn from_json_str(content: &str, origin: &str) -> RuleResult<Self> {
        let file: KnowledgeFile =
            serde_json::from_str(content).map_err(|e| RuleError::KnowledgeParse {
                path: origin.to_string(),
                message: e.to_string(),
            })?;
        Self::from_file(file, origin)
    }

    /// Validate a parsed file. Errors keep their kind and are tagged with
    /// `origin` and, for rules, the 1-based rule position (text `rules`
    /// first, then `[[rule]]` entries).
    fn from_file(file: KnowledgeFile, origin: &str) -> RuleResult<Self> {
        let mut facts = FactStore::new();
        for fact in &file.facts {
            facts.insert(Atom::parse(fact).map_err(|e| e.in_origin(origin))?);
        }

        let mut rules = RuleBase::new();
        for (idx, line) in file.rules.iter().enumerate() {
            Rule::parse(line)
                .and_then(|rule| rules.push(rule))
                .map_err(|e| e.at_rule(idx + 1).in_origin(origin))?;
        }
        rules
            .extend_raw(file.rule, file.rules.len())
            .map_err(|e| e.in_origin(origin))?;

        Ok(Self {
            name: file.name.unwrap_or_default(),
            description: file.description.unwrap_or_default(),
            facts,
            rules,
        })
    }

    /// Add extra base facts (e.g. from the command line).
    pub fn with_facts<I, S>(mut self, extra: I) -> RuleResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for fact in extra {
            self.facts.insert(Atom::parse(fact.as_ref())?);
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::Condition;

    const SAMPLE: &str = r#"
name = "sample"
description = "two text rules and a structured one"
facts = ["has_fur", "eats_meat", "has_fur"]
rules = [
    "is_mammal :- has_fur",
    "carnivore: is_carnivore :- is_mammal, eats_meat",
]

[[rule]]
name = "veg"
consequent = "vegetarian"
antecedent = { not = { atom = "eats_meat" } }
"#;

    #[test]
    fn toml_text_and_structured_rules() {
        let kb = KnowledgeBase::from_toml_str(SAMPLE, "sample.toml").unwrap();
        assert_eq!(kb.name, "sample");
        assert_eq!(kb.facts.len(), 2);
        assert_eq!(kb.rules.len(), 3);
        let last = kb.rules.get(2).unwrap();
        assert_eq!(last.name.as_deref(), Some("veg"));
        assert_eq!(last.antecedent, Condition::not(Condition::atom("eats_meat")));
    }

    #[test]
    fn invalid_rules_name_the_origin() {
        let bad = "rules = [\"a :- b\", \"c :- or(a)\"]\n";
        match KnowledgeBase::from_toml_str(bad, "bad.toml") {
            Err(RuleError::InvalidCondition { message }) => {
                assert!(message.starts_with("bad.toml: rule 2: or(...)"), "{message}");
            }
            other => panic!("unexpected result: {other:?}"),
        }

        let structured = r#"
rules = ["a :- b"]

[[rule]]
consequent = "x"
antecedent = { or = [{ atom = "a" }] }
"#;
        match KnowledgeBase::from_toml_str(structured, "s.toml") {
            Err(RuleError::InvalidCondition { message }) => {
                assert!(message.starts_with("s.toml: rule 2: or(...)"), "{message}");
            }
            other => panic!("unexpected result: {other:?}"),
        }

        assert!(matches!(
            KnowledgeBase::from_toml_str("rules = [\"no arrow\"]", "p.toml"),
            Err(RuleError::Parse { .. })
        ));
        assert!(matches!(
            KnowledgeBase::from_toml_str("facts = [\"\"]", "e.toml"),
            Err(RuleError::InvalidAtom { .. })
        ));
        assert!(matches!(
            KnowledgeBase::from_toml_str("unknown = 1", "u.toml"),
            Err(RuleError::KnowledgeParse { .. })
        ));
    }

    #[test]
    fn json_knowledge_base() {
        let json = r#"{
            "facts": ["a"],
            "rules": ["b :- a"],
            "rule": [{"consequent": "c", "antecedent": {"or": [{"atom": "b"}, {"atom": "z"}]}}]
        }"#;
        let kb = KnowledgeBase::from_json_str(json, "kb.json").unwrap();
        assert_eq!(kb.rules.len(), 2);
        assert!(kb.facts.contains("a"));
    }

    #[test]
    fn load_from_disk_and_extra_facts() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("animals.toml");
        std::fs::write(&path, "facts = [\"has_fur\"]\nrules = [\"is_mammal :- has_fur\"]\n").unwrap();

        let kb = KnowledgeBase::load(&path)
            .unwrap()
            .with_facts(["eats_meat"])
            .unwrap();
        assert_eq!(kb.name, "animals");
        assert!(kb.facts.contains("eats_meat"));
        assert_eq!(kb.rules.len(), 1);

        let missing = KnowledgeBase::load(&dir.path().join("missing.toml"));
        assert!(matches!(missing, Err(RuleError::KnowledgeRead { .. })));
    }
}
