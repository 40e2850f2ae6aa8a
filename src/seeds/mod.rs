//! Seed knowledge bases: ready-made facts and rules for demos and tests.
//!
//! A seed is a knowledge-base TOML file (see [`crate::knowledge`]). Three
//! seeds are bundled into the binary: `reptiles` (backward chaining),
//! `mammals` (forward chaining) and `diet` (compound conditions). More can be
//! discovered from a directory holding one `<id>/seed.toml` per seed.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use miette::Diagnostic;
use thiserror::Error;

use crate::knowledge::KnowledgeBase;

// ── Errors ──────────────────────────────────────────────────────────────

#[derive(Debug, Error, Diagnostic)]
pub enum SeedError {
    #[error("seed not found: \"{id}\"")]
    #[diagnostic(
        code(rulebase::seed::not_found),
        help("List available seeds with `rulebase seeds`.")
    )]
    NotFound { id: String },

    #[error("failed to parse seed \"{id}\": {message}")]
    #[diagnostic(
        code(rulebase::seed::parse),
        help("Seeds use the knowledge-base TOML format: `facts`, `rules` and `[[rule]]` entries.")
    )]
    Parse { id: String, message: String },
}

pub type SeedResult<T> = std::result::Result<T, SeedError>;

// ── Seed data model ─────────────────────────────────────────────────────

/// Where a seed came from.
#[derive(Debug, Clone)]
pub enum SeedSource {
    /// Bundled into the binary via `include_str!`.
    Bundled,
    /// Loaded from an external directory.
    External(PathBuf),
}

/// A named knowledge base available to the CLI and tests.
#[derive(Debug, Clone)]
pub struct SeedPack {
    pub id: String,
    pub source: SeedSource,
    pub knowledge: KnowledgeBase,
}

// ── Bundled seeds ───────────────────────────────────────────────────────

const REPTILES_TOML: &str = include_str!("../../data/seeds/reptiles/seed.toml");
const MAMMALS_TOML: &str = include_str!("../../data/seeds/mammals/seed.toml");
const DIET_TOML: &str = include_str!("../../data/seeds/diet/seed.toml");

fn parse_seed(id: &str, toml_str: &str, source: SeedSource) -> SeedResult<SeedPack> {
    let mut knowledge =
        KnowledgeBase::from_toml_str(toml_str, id).map_err(|e| SeedError::Parse {
            id: id.to_string(),
            message: e.to_string(),
        })?;
    if knowledge.name.is_empty() {
        knowledge.name = id.to_string();
    }
    Ok(SeedPack {
        id: id.to_string(),
        source,
        knowledge,
    })
}

fn bundled_seeds() -> Vec<SeedPack> {
    [
        ("reptiles", REPTILES_TOML),
        ("mammals", MAMMALS_TOML),
        ("diet", DIET_TOML),
    ]
    .iter()
    .filter_map(|(id, toml)| match parse_seed(id, toml, SeedSource::Bundled) {
        Ok(seed) => Some(seed),
        Err(e) => {
            tracing::warn!(seed = id, "Failed to parse bundled seed: {e}");
            None
        }
    })
    .collect()
}

// ── Seed Registry ───────────────────────────────────────────────────────

/// Registry of available seeds (bundled + discovered from disk).
pub struct SeedRegistry {
    seeds: BTreeMap<String, SeedPack>,
}

impl SeedRegistry {
    /// Create a registry with only the bundled seeds.
    pub fn bundled() -> Self {
        let seeds = bundled_seeds()
            .into_iter()
            .map(|s| (s.id.clone(), s))
            .collect();
        Self { seeds }
    }

    /// Discover seeds from a directory (in addition to the bundled ones).
    ///
    /// Each subdirectory containing a `seed.toml` is loaded as a seed named
    /// after the subdirectory; a discovered seed replaces a bundled one with
    /// the same id.
    pub fn discover(seeds_dir: &Path) -> Self {
        let mut registry = Self::bundled();

        if let Ok(entries) = std::fs::read_dir(seeds_dir) {
            for entry in entries.flatten() {
                let seed_file = entry.path().join("seed.toml");
                if !seed_file.is_file() {
                    continue;
                }
                let id = entry.file_name().to_string_lossy().into_owned();
                match std::fs::read_to_string(&seed_file) {
                    Ok(content) => {
                        match parse_seed(&id, &content, SeedSource::External(entry.path())) {
                            Ok(seed) => {
                                registry.seeds.insert(seed.id.clone(), seed);
                            }
                            Err(e) => {
                                tracing::warn!(
                                    path = %seed_file.display(),
                                    "Failed to parse seed: {e}"
                                );
                            }
                        }
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %seed_file.display(),
                            "Failed to read seed file: {e}"
                        );
                    }
                }
            }
        }

        registry
    }

    /// List all available seeds, sorted by id.
    pub fn list(&self) -> Vec<&SeedPack> {
        self.seeds.values().collect()
    }

    /// Get a seed by id.
    pub fn get(&self, id: &str) -> SeedResult<&SeedPack> {
        self.seeds.get(id).ok_or_else(|| SeedError::NotFound { id: id.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::Atom;
    use crate::infer::{prove, saturate};

    #[test]
    fn bundled_seeds_parse() {
        let registry = SeedRegistry::bundled();
        let ids: Vec<&str> = registry.list().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["diet", "mammals", "reptiles"]);

        let reptiles = &registry.get("reptiles").unwrap().knowledge;
        assert_eq!(reptiles.rules.len(), 9);
        assert_eq!(reptiles.facts.len(), 5);
        assert_eq!(reptiles.name, "Reptiles");
    }

    #[test]
    fn unknown_seed() {
        assert!(matches!(
            SeedRegistry::bundled().get("dragons"),
            Err(SeedError::NotFound { .. })
        ));
    }

    #[test]
    fn reptiles_prove_crocodile() {
        let kb = SeedRegistry::bundled().get("reptiles").unwrap().knowledge.clone();
        let mut facts = kb.facts.clone();
        assert!(prove(&Atom::new("crocodile"), &mut facts, &kb.rules));
        assert!(facts.contains("reptile"));

        // has_fur :- mammal and mammal :- has_fur, gives_birth form a cycle.
        let mut facts = kb.facts.clone();
        assert!(!prove(&Atom::new("mammal"), &mut facts, &kb.rules));
        assert!(!prove(&Atom::new("cheetah"), &mut facts, &kb.rules));
    }

    #[test]
    fn mammals_saturate_to_tiger() {
        let kb = SeedRegistry::bundled().get("mammals").unwrap().knowledge.clone();
        let mut facts = kb.facts.clone();
        let derived: Vec<String> = saturate(&mut facts, &kb.rules)
            .into_iter()
            .map(|a| a.to_string())
            .collect();
        assert_eq!(
            derived,
            vec!["is_mammal", "is_animal", "is_carnivore", "is_tiger"]
        );
    }

    #[test]
    fn diet_compound_conditions() {
        let kb = SeedRegistry::bundled().get("diet").unwrap().knowledge.clone();
        let mut facts = kb.facts.clone();
        saturate(&mut facts, &kb.rules);
        assert!(facts.contains("is_carnivore"));
        assert!(facts.contains("predator"));
        assert!(!facts.contains("vegetarian"));
        assert!(!facts.contains("omnivore"));
    }

    #[test]
    fn discover_external_seeds() {
        let dir = tempfile::TempDir::new().unwrap();
        let good = dir.path().join("birds");
        std::fs::create_dir_all(&good).unwrap();
        std::fs::write(
            good.join("seed.toml"),
            "facts = [\"has_feathers\"]\nrules = [\"bird :- has_feathers\"]\n",
        )
        .unwrap();
        let bad = dir.path().join("broken");
        std::fs::create_dir_all(&bad).unwrap();
        std::fs::write(bad.join("seed.toml"), "rules = [\"no arrow\"]\n").unwrap();

        let registry = SeedRegistry::discover(dir.path());
        let birds = registry.get("birds").unwrap();
        assert!(matches!(birds.source, SeedSource::External(_)));
        assert_eq!(birds.knowledge.name, "birds");
        assert!(registry.get("broken").is_err());
        assert!(registry.get("reptiles").is_ok());
    }
}
