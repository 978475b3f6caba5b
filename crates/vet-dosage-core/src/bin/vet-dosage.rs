//! Command-line front end for the recommendation engine.
//!
//! Read-only: every command prints JSON and nothing is persisted.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::debug;

use vet_dosage_core::config::ServiceConfig;
use vet_dosage_core::logging::init_logging;
use vet_dosage_core::models::{parse_age_days, parse_weight_kg};
use vet_dosage_core::{AnimalDetails, AntibioticRequest, RecommendationEngine, ReferenceData, TreatmentQuery};

/// Poultry antibiotic recommendation and dosage planning
#[derive(Parser, Debug)]
#[command(name = "vet-dosage")]
#[command(version)]
#[command(about = "Poultry antibiotic recommendation and dosage planning", long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Reference dataset CSV (overrides the config file)
    #[arg(short, long)]
    dataset: Option<PathBuf>,

    /// Log filter, e.g. "debug" (RUST_LOG takes precedence)
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List diseases in the reference dataset
    Diseases,

    /// Antibiotics to offer for a disease (partial names and typos accepted)
    Antibiotics {
        disease: String,
    },

    /// Closest reference cases for an animal
    Suggest {
        #[arg(long)]
        disease: String,
        /// Age in days
        #[arg(long)]
        age: String,
        /// Weight in kg
        #[arg(long)]
        weight: String,
        #[arg(long)]
        breed: Option<String>,
        /// Number of suggestions (config default when omitted)
        #[arg(long)]
        top_n: Option<usize>,
    },

    /// Dosage plans for one animal, starting today
    Preview {
        #[arg(long)]
        disease: String,
        /// Free-form animal type, e.g. Broiler
        #[arg(long, default_value = "Broiler")]
        animal_type: String,
        #[arg(long)]
        age: String,
        #[arg(long)]
        weight: String,
        /// Antibiotic as NAME or NAME:TIMES_PER_DAY; repeat for several
        #[arg(long = "antibiotic", required = true)]
        antibiotics: Vec<String>,
    },

    /// Dosage standards for a category
    Standards {
        #[arg(default_value = "Poultry")]
        category: String,
    },

    /// Weight-based total dose for a medicine
    AutoDose {
        #[arg(long, default_value = "Poultry")]
        category: String,
        #[arg(long)]
        medicine: String,
        #[arg(long)]
        weight: String,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(Some(&args.log_level));

    let config = ServiceConfig::load(args.config.as_deref())
        .with_context(|| format!("loading config {:?}", args.config))?;
    let dataset_path = args.dataset.clone().unwrap_or_else(|| config.dataset.path.clone());
    debug!(path = %dataset_path.display(), "Using reference dataset");

    let data = ReferenceData::load_or_empty(&dataset_path, &config.dataset.category);
    let default_frequency = config.recommendation.default_daily_frequency;
    let default_top_n = config.recommendation.top_n;
    let engine = RecommendationEngine::with_config(Arc::new(data), config.recommendation);

    match args.command {
        Command::Diseases => print_json(&engine.list_diseases()),
        Command::Antibiotics { disease } => print_json(&engine.antibiotics_for_disease(&disease)?),
        Command::Suggest {
            disease,
            age,
            weight,
            breed,
            top_n,
        } => {
            let mut query = TreatmentQuery::new(parse_age_days(&age)?, parse_weight_kg(&weight)?, disease)
                .with_top_n(top_n.unwrap_or(default_top_n));
            query.breed = breed;
            print_json(&engine.suggest(&query)?)
        }
        Command::Preview {
            disease,
            animal_type,
            age,
            weight,
            antibiotics,
        } => {
            let animal = AnimalDetails {
                disease,
                animal_type,
                age_days: parse_age_days(&age)?,
                weight_kg: parse_weight_kg(&weight)?,
            };
            let requests = antibiotics
                .iter()
                .map(|arg| parse_antibiotic(arg, default_frequency))
                .collect::<Result<Vec<_>>>()?;
            print_json(&engine.preview(&animal, &requests)?)
        }
        Command::Standards { category } => print_json(&engine.dosage_standards(&category)?),
        Command::AutoDose {
            category,
            medicine,
            weight,
        } => print_json(&engine.auto_dosage(&category, &medicine, parse_weight_kg(&weight)?)?),
    }
}

/// Parse `NAME` or `NAME:TIMES_PER_DAY`.
fn parse_antibiotic(arg: &str, default_frequency: u32) -> Result<AntibioticRequest> {
    let (name, frequency) = match arg.rsplit_once(':') {
        Some((name, freq)) => {
            let freq: u32 = freq
                .trim()
                .parse()
                .with_context(|| format!("invalid frequency in {:?}", arg))?;
            (name.trim(), freq)
        }
        None => (arg.trim(), default_frequency),
    };
    if name.is_empty() {
        bail!("empty antibiotic name in {:?}", arg);
    }
    Ok(AntibioticRequest::new(name).with_frequency(frequency))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
