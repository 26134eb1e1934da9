use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use spl_core::evaluation::{self, QuestionCase};
use spl_core::setops;
use spl_core::{
    ConnectorDirections, ConnectorEntry, Engine, EngineConfig, Lexicon, PopulationMap,
    PositionMap, RelationSpec, Resolver, ResolverConfig,
};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_SAMPLE_EVERY: usize = 100;
const DEFAULT_MIN_CONNECTOR_FREQUENCY: usize = 1;

#[derive(Parser)]
#[command(name = "spl")]
#[command(about = "Predator-prey word positioning CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train populations from an input file
    Train {
        /// Path to input file (JSON)
        #[arg(long)]
        input: PathBuf,

        /// Path to engine config file (JSON, optional)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Number of steps to train (default: the config's `steps`)
        #[arg(long)]
        steps: Option<usize>,

        /// Steps between summary samples
        #[arg(long, default_value_t = DEFAULT_SAMPLE_EVERY)]
        sample_every: usize,

        /// Output directory for results (optional)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Answer questions from trained populations
    Ask {
        #[arg(long)]
        input: PathBuf,

        /// Trained populations (JSON, as written by `train`)
        #[arg(long)]
        populations: PathBuf,

        /// Resolver config file (JSON, optional)
        #[arg(long)]
        resolver_config: Option<PathBuf>,

        #[arg(required = true)]
        questions: Vec<String>,
    },
    /// Score answers against a question set
    Evaluate {
        #[arg(long)]
        input: PathBuf,

        #[arg(long)]
        populations: PathBuf,

        /// Question set (JSON array of {id?, question, expected})
        #[arg(long)]
        questions: PathBuf,

        /// Best positions (JSON, as written by `train`)
        #[arg(long)]
        best: Option<PathBuf>,

        #[arg(long)]
        resolver_config: Option<PathBuf>,
    },
    /// Combine two population files
    Combine {
        #[arg(long)]
        a: PathBuf,

        #[arg(long)]
        b: PathBuf,

        #[arg(long, value_enum)]
        op: CombineOp,

        /// Distance radius (default: 0.1 for union, 0.5 for intersection)
        #[arg(long)]
        radius: Option<f64>,

        #[arg(long)]
        out: PathBuf,
    },
    /// Dump the default engine and resolver configuration to stdout
    DumpDefaultConfig,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CombineOp {
    Union,
    Intersection,
}

/// Entities, relations and dictionary data handed over by the extraction step.
#[derive(Debug, Deserialize)]
struct InputFile {
    entities: Vec<String>,
    relations: Vec<RelationSpec>,
    #[serde(default)]
    connectors: Option<Vec<ConnectorEntry>>,
    #[serde(default)]
    min_connector_frequency: Option<usize>,
    #[serde(default)]
    definitions: BTreeMap<String, String>,
    #[serde(default)]
    structural: Option<BTreeSet<String>>,
    #[serde(default)]
    content: Option<BTreeSet<String>>,
}

impl InputFile {
    fn lexicon(&self, config: &ResolverConfig) -> Lexicon {
        let extra = self.entities.iter().cloned();
        match (&self.structural, &self.content) {
            (Some(structural), Some(content)) => Lexicon::with_roles(
                self.definitions.clone(),
                extra,
                structural.clone(),
                content.clone(),
            ),
            _ => Lexicon::classified(self.definitions.clone(), extra, config.structural_fraction),
        }
    }
}

#[derive(Serialize)]
struct DefaultConfigs {
    engine: EngineConfig,
    resolver: ResolverConfig,
}

#[derive(Serialize)]
struct EvaluationOutput {
    mean: evaluation::EvaluationReport,
    best: Option<evaluation::EvaluationReport>,
    configurations: evaluation::ConfigurationScores,
}

fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let file = File::open(path).with_context(|| format!("failed to open {what} file {path:?}"))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("failed to parse {what} file {path:?}"))
}

fn write_json<T: Serialize>(path: &Path, value: &T, what: &str) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("failed to create {what} file {path:?}"))?;
    serde_json::to_writer_pretty(BufWriter::new(file), value)
        .with_context(|| format!("failed to write {what}"))
}

fn load_resolver_config(path: Option<&Path>) -> Result<ResolverConfig> {
    match path {
        Some(path) => read_json(path, "resolver config"),
        None => Ok(ResolverConfig::default()),
    }
}

fn build_engine(input: &InputFile, config: EngineConfig) -> Result<(Engine, ConnectorDirections)> {
    config.validate().context("config validation error")?;
    // An explicit table must cover every relation; a generated one drops rare patterns.
    let (directions, relations) = match &input.connectors {
        Some(entries) => {
            let directions = ConnectorDirections::from_entries(entries.clone())
                .map_err(|p| anyhow!("duplicate direction entry for connector pattern `{p}`"))?;
            (directions, input.relations.clone())
        }
        None => {
            let directions = ConnectorDirections::from_relation_frequencies(
                &input.relations,
                input
                    .min_connector_frequency
                    .unwrap_or(DEFAULT_MIN_CONNECTOR_FREQUENCY),
                config.dimensions,
                config.seed,
            );
            let relations = directions.filter_relations(input.relations.clone());
            (directions, relations)
        }
    };
    info!(
        entities = input.entities.len(),
        relations = relations.len(),
        dropped = input.relations.len() - relations.len(),
        connectors = directions.len(),
        "building engine"
    );
    let engine = Engine::new(&input.entities, &relations, &directions, config)
        .context("failed to initialize engine")?;
    Ok((engine, directions))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::DumpDefaultConfig => {
            let configs = DefaultConfigs {
                engine: EngineConfig::default(),
                resolver: ResolverConfig::default(),
            };
            println!("{}", serde_json::to_string_pretty(&configs)?);
        }
        Commands::Train {
            input,
            config,
            steps,
            sample_every,
            out,
        } => {
            let input_file: InputFile = read_json(&input, "input")?;
            let engine_config = match &config {
                Some(path) => read_json(path, "config")?,
                None => EngineConfig::default(),
            };
            let steps = steps.unwrap_or(engine_config.steps);
            let (mut engine, directions) = build_engine(&input_file, engine_config)?;

            info!(steps, "training");
            let summary = engine
                .try_run_experiment(steps, sample_every)
                .context("invalid experiment parameters")?;

            if let Some(out_dir) = out {
                std::fs::create_dir_all(&out_dir).context("failed to create output directory")?;
                write_json(&out_dir.join("populations.json"), &engine.all_positions(), "populations")?;
                write_json(
                    &out_dir.join("mean_positions.json"),
                    &engine.mean_positions(),
                    "mean positions",
                )?;
                write_json(
                    &out_dir.join("best_positions.json"),
                    &engine.best_positions(),
                    "best positions",
                )?;
                write_json(
                    &out_dir.join("spread.json"),
                    &engine.population_spread(),
                    "population spread",
                )?;
                write_json(
                    &out_dir.join("connectors.json"),
                    &directions.to_entries(),
                    "connectors",
                )?;
                write_json(&out_dir.join("summary.json"), &summary, "summary")?;
                println!("Run complete. Results saved to {:?}", out_dir);
            } else {
                match summary.final_mean_violation {
                    Some(v) => println!(
                        "Run complete. Final prey: {}, predators: {}, mean violation: {v:.4}",
                        summary.final_prey_count, summary.final_predator_count
                    ),
                    None => println!(
                        "Run complete. Final prey: {}, predators: {}, mean violation: n/a",
                        summary.final_prey_count, summary.final_predator_count
                    ),
                }
            }
        }
        Commands::Ask {
            input,
            populations,
            resolver_config,
            questions,
        } => {
            let input_file: InputFile = read_json(&input, "input")?;
            let populations: PopulationMap = read_json(&populations, "populations")?;
            let config = load_resolver_config(resolver_config.as_deref())?;
            let lexicon = input_file.lexicon(&config);
            let resolver = Resolver::new(setops::population_means(&populations), &lexicon, config);
            for question in &questions {
                println!("{question} -> {}", resolver.resolve(question));
            }
        }
        Commands::Evaluate {
            input,
            populations,
            questions,
            best,
            resolver_config,
        } => {
            let input_file: InputFile = read_json(&input, "input")?;
            let populations: PopulationMap = read_json(&populations, "populations")?;
            let cases: Vec<QuestionCase> = read_json(&questions, "questions")?;
            let config = load_resolver_config(resolver_config.as_deref())?;
            let lexicon = input_file.lexicon(&config);

            let mean_resolver = Resolver::new(
                setops::population_means(&populations),
                &lexicon,
                config.clone(),
            );
            let mean = evaluation::evaluate(&mean_resolver, &cases);
            let best = match &best {
                Some(path) => {
                    let positions: PositionMap = read_json(path, "best positions")?;
                    let resolver = Resolver::new(positions, &lexicon, config.clone());
                    Some(evaluation::evaluate(&resolver, &cases))
                }
                None => None,
            };
            let configurations =
                evaluation::score_configurations(&populations, &lexicon, &config, &cases);

            info!(
                mean = mean.correct,
                best = best.as_ref().map(|r| r.correct),
                config_min = configurations.min,
                config_max = configurations.max,
                config_mean = configurations.mean,
                total = cases.len(),
                "evaluation complete"
            );
            let output = EvaluationOutput {
                mean,
                best,
                configurations,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Commands::Combine {
            a,
            b,
            op,
            radius,
            out,
        } => {
            let a: PopulationMap = read_json(&a, "populations")?;
            let b: PopulationMap = read_json(&b, "populations")?;
            let combined = match op {
                CombineOp::Union => {
                    setops::union(&a, &b, radius.unwrap_or(setops::DEFAULT_DEDUP_RADIUS))
                }
                CombineOp::Intersection => {
                    setops::intersection(&a, &b, radius.unwrap_or(setops::DEFAULT_MATCH_RADIUS))
                }
            };
            write_json(&out, &combined, "combined populations")?;
            println!(
                "Combined {} + {} entities into {} ({:?})",
                a.len(),
                b.len(),
                combined.len(),
                op
            );
        }
    }
    Ok(())
}
