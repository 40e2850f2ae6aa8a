//! rulebase CLI: backward and forward chaining over knowledge-base files.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use rulebase::analysis::DependencyGraph;
use rulebase::atom::Atom;
use rulebase::facts::FactStore;
use rulebase::infer::{prove_all, prove_with, saturate_with};
use rulebase::knowledge::KnowledgeBase;
use rulebase::seeds::SeedRegistry;
use rulebase::trace::{TraceRecorder, TracingObserver};

#[derive(Parser)]
#[command(name = "rulebase", version, about = "Rule-based inference: backward and forward chaining")]
struct Cli {
    /// Directory with extra seed knowledge bases (`<id>/seed.toml`).
    #[arg(long, global = true)]
    seeds_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Where the facts and rules come from.
#[derive(Args)]
struct Source {
    /// Knowledge-base file (TOML, or JSON for `.json` files).
    #[arg(long, conflicts_with = "seed")]
    kb: Option<PathBuf>,

    /// Bundled or discovered seed id (see `rulebase seeds`).
    #[arg(long)]
    seed: Option<String>,

    /// Extra base fact; may be repeated.
    #[arg(long = "fact", value_name = "ATOM")]
    facts: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Prove a goal by backward chaining.
    Prove {
        #[command(flatten)]
        source: Source,

        /// The goal atom to prove.
        goal: String,

        /// Print the step-by-step proof trace.
        #[arg(long)]
        trace: bool,
    },

    /// Derive every reachable fact by forward chaining.
    Saturate {
        #[command(flatten)]
        source: Source,

        /// Print the pass-by-pass derivation trace.
        #[arg(long)]
        trace: bool,

        /// Print the result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Prove several goals independently (defaults to every rule consequent).
    Query {
        #[command(flatten)]
        source: Source,

        /// Goals to prove.
        goals: Vec<String>,
    },

    /// Validate a knowledge base and report rule cycles.
    Check {
        #[command(flatten)]
        source: Source,
    },

    /// List available seed knowledge bases.
    Seeds,
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let registry = match &cli.seeds_dir {
        Some(dir) => SeedRegistry::discover(dir),
        None => SeedRegistry::bundled(),
    };

    match cli.command {
        Commands::Prove {
            source,
            goal,
            trace,
        } => {
            let kb = load_source(&source, &registry)?;
            let goal = Atom::parse(&goal)?;
            let mut facts = kb.facts.clone();

            let mut observer = (TracingObserver, trace.then(TraceRecorder::new));
            let proven = prove_with(&goal, &mut facts, &kb.rules, &mut observer);

            if let Some(recorder) = &observer.1 {
                print!("{}", recorder.render());
                println!();
            }
            println!("Conclusion: the hypothesis '{goal}' is {proven}.");
            print_new_facts(&kb.facts, &facts);
            print_facts("Final facts", &facts);
        }

        Commands::Saturate {
            source,
            trace,
            json,
        } => {
            let kb = load_source(&source, &registry)?;
            let mut facts = kb.facts.clone();

            // JSON output carries no narration.
            let mut observer = (TracingObserver, (trace && !json).then(TraceRecorder::new));
            let result = saturate_with(&mut facts, &kb.rules, &mut observer);

            if json {
                let out = serde_json::json!({
                    "knowledge_base": kb.name,
                    "saturation": result,
                    "facts": facts.sorted(),
                });
                let text = serde_json::to_string_pretty(&out).into_diagnostic()?;
                println!("{text}");
                return Ok(());
            }

            if let Some(recorder) = &observer.1 {
                print!("{}", recorder.render());
                println!();
            }
            if result.is_empty() {
                println!("No new facts inferred.");
            } else {
                println!("Inferred {} new fact(s) in {} pass(es):", result.derived.len(), result.passes);
                for d in &result.derived {
                    println!("  {} (pass {}, {})", d.atom, d.pass, d.rule_name);
                }
            }
            print_facts("Inference complete. Final facts", &facts);
        }

        Commands::Query { source, goals } => {
            let kb = load_source(&source, &registry)?;
            let goals: Vec<Atom> = if goals.is_empty() {
                kb.rules.consequents().into_iter().cloned().collect()
            } else {
                goals
                    .iter()
                    .map(|g| Atom::parse(g))
                    .collect::<std::result::Result<_, _>>()?
            };

            if goals.is_empty() {
                println!("Nothing to query: the knowledge base has no rules.");
                return Ok(());
            }

            let results = prove_all(&goals, &kb.facts, &kb.rules);
            let proven = results.iter().filter(|(_, ok)| *ok).count();
            println!("Queried {} goal(s), {proven} provable:", results.len());
            for (goal, ok) in &results {
                let status = if *ok { "provable" } else { "unprovable" };
                println!("  {goal}: {status}");
            }
        }

        Commands::Check { source } => {
            let kb = load_source(&source, &registry)?;
            let graph = DependencyGraph::build(&kb.rules);

            println!("Knowledge base \"{}\" is valid.", kb.name);
            if !kb.description.is_empty() {
                println!("  {}", kb.description);
            }
            println!("  facts:    {}", kb.facts.len());
            println!("  rules:    {}", kb.rules.len());
            println!("  atoms:    {}", graph.atom_count());
            println!("  derivable: {}", graph.derivable_atoms().len());
            println!("  negation: {}", if graph.uses_negation() { "yes" } else { "no" });

            let cycles = graph.cycles();
            if cycles.is_empty() {
                println!("  cycles:   none");
            } else {
                println!("  cycles:   {} (unprovable without outside support)", cycles.len());
                for cycle in &cycles {
                    let names: Vec<&str> = cycle.iter().map(Atom::as_str).collect();
                    println!("    {}", names.join(" <-> "));
                }
            }
        }

        Commands::Seeds => {
            let seeds = registry.list();
            if seeds.is_empty() {
                println!("No seeds available.");
            } else {
                println!("Seeds ({}):", seeds.len());
                for seed in seeds {
                    let kb = &seed.knowledge;
                    println!(
                        "  {} - {} ({} facts, {} rules)",
                        seed.id,
                        kb.name,
                        kb.facts.len(),
                        kb.rules.len()
                    );
                    if !kb.description.is_empty() {
                        println!("      {}", kb.description);
                    }
                }
            }
        }
    }

    Ok(())
}

/// Resolve `--kb` / `--seed` and add any `--fact` atoms.
fn load_source(source: &Source, registry: &SeedRegistry) -> Result<KnowledgeBase> {
    let kb = match (&source.kb, &source.seed) {
        (Some(path), _) => KnowledgeBase::load(path)?,
        (None, Some(id)) => registry.get(id)?.knowledge.clone(),
        (None, None) => miette::bail!("no knowledge base given: pass --kb <file> or --seed <id>"),
    };
    tracing::info!(
        kb = %kb.name,
        facts = kb.facts.len(),
        rules = kb.rules.len(),
        "knowledge base ready"
    );
    Ok(kb.with_facts(&source.facts)?)
}

fn print_new_facts(before: &FactStore, after: &FactStore) {
    let mut new: Vec<&Atom> = after.iter().filter(|a| !before.contains(a.as_str())).collect();
    if new.is_empty() {
        return;
    }
    new.sort();
    let names: Vec<&str> = new.into_iter().map(Atom::as_str).collect();
    println!("Newly established: {}", names.join(", "));
}

fn print_facts(heading: &str, facts: &FactStore) {
    println!("{heading} ({}):", facts.len());
    for fact in facts.sorted() {
        println!("  - {fact}");
    }
}
