// src/main.rs
use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

use homecare_lib::availability::parse_availability_schedule;
use homecare_lib::import::csv_line::parse_csv_line;
use homecare_lib::import::headers::score_csv_type;
use homecare_lib::import::{export_csv, preview_mapping};
use homecare_lib::matching::finder::find_matches_for_patient;
use homecare_lib::matching::{calculate_all_provider_utilization, calculate_provider_utilization};
use homecare_lib::utils::config::{parse_type_hint, AppConfig};
use homecare_lib::utils::env::load_env;
use homecare_lib::utils::progress_config::ProgressConfig;
use homecare_lib::{
    Collection, DuplicateStrategy, FileStore, ImportError, ImportOptions, Importer, RecordRepository, RecordType,
};

#[derive(Parser)]
#[command(author, version, about = "Home-care patient/provider import and matching", long_about = None)]
struct Cli {
    /// Data directory (overrides HOMECARE_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Import a CSV file of patients or providers
    Import {
        file: PathBuf,
        /// auto, patients or providers
        #[arg(long = "type")]
        record_type: Option<String>,
        /// skip, overwrite or merge
        #[arg(long)]
        strategy: Option<DuplicateStrategy>,
    },
    /// Export a collection as CSV
    Export {
        record_type: RecordType,
        /// Write to a file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Show how a CSV file's headers would be mapped, without importing
    Preview {
        file: PathBuf,
        #[arg(long = "type")]
        record_type: Option<String>,
    },
    /// Parse free-text availability and print the schedule as JSON
    Availability { text: String },
    /// Recompute provider utilization for the current week
    Utilization {
        /// Only this provider
        #[arg(long)]
        provider: Option<String>,
    },
    /// Rank providers for a patient
    Match {
        patient_id: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

fn main() -> Result<()> {
    // Initialize logging and environment
    env_logger::init();
    load_env();

    let cli = Cli::parse();
    let mut config = AppConfig::from_env();
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    config.log_config();
    let progress = ProgressConfig::from_env();

    match cli.command {
        Command::Import {
            file,
            record_type,
            strategy,
        } => {
            let type_hint = resolve_type_hint(record_type.as_deref(), &config)?;
            let mut options = ImportOptions::from_config(&config);
            if let Some(strategy) = strategy {
                options.duplicate_strategy = strategy;
            }
            let csv_text = read_file(&file)?;
            let mut store = FileStore::open(&config.data_dir)?;

            let spinner = progress.create_spinner(&format!("Importing {}", file.display()));
            let result = Importer::new(&mut store).import_data(&csv_text, type_hint, &options);
            spinner.finish_and_clear();

            let outcome = match result {
                Ok(outcome) => outcome,
                Err(ImportError::Validation(message)) => bail!("{}: {}", file.display(), message),
                Err(e) => return Err(e).context("Import failed"),
            };
            println!(
                "Imported {} {}: {} new, {} updated, {} skipped, {} rejected",
                outcome.records.len(),
                outcome.record_type,
                outcome.imported,
                outcome.updated,
                outcome.skipped,
                outcome.errors.len()
            );
            for error in &outcome.errors {
                println!("  {}", error);
            }
        }
        Command::Export { record_type, output } => {
            let mut store = FileStore::open(&config.data_dir)?;
            let records = RecordRepository::new(&mut store, Collection::from(record_type)).list()?;
            let csv = export_csv(&records, record_type)?;
            match output {
                Some(path) => {
                    fs::write(&path, csv).with_context(|| format!("Failed writing {}", path.display()))?;
                    info!("Exported {} {} to {}", records.len(), record_type, path.display());
                }
                None => print!("{}", csv),
            }
        }
        Command::Preview { file, record_type } => {
            let csv_text = read_file(&file)?;
            let header_line = csv_text
                .lines()
                .find(|line| !line.trim().is_empty())
                .ok_or_else(|| anyhow!("{} has no header row", file.display()))?;
            let headers = parse_csv_line(header_line);

            let record_type = match resolve_type_hint(record_type.as_deref(), &config)? {
                Some(record_type) => record_type,
                None => {
                    let detection = score_csv_type(&headers);
                    println!(
                        "Detected {} (patients={}, providers={})",
                        detection.record_type, detection.patient_score, detection.provider_score
                    );
                    detection.record_type
                }
            };
            for mapping in preview_mapping(&headers, record_type) {
                match (mapping.matched, mapping.field.is_empty(), &mapping.suggestion) {
                    (_, true, _) => println!("  {:<30} (ignored)", mapping.header),
                    (true, _, _) => println!("  {:<30} -> {}", mapping.header, mapping.field),
                    (false, _, Some(suggestion)) => println!(
                        "  {:<30} -> {} (new field; did you mean {}?)",
                        mapping.header, mapping.field, suggestion
                    ),
                    (false, _, None) => println!("  {:<30} -> {} (new field)", mapping.header, mapping.field),
                }
            }
        }
        Command::Availability { text } => {
            let schedule = parse_availability_schedule(&text);
            println!("{}", serde_json::to_string_pretty(&schedule)?);
        }
        Command::Utilization { provider } => {
            let mut store = FileStore::open(&config.data_dir)?;
            match provider {
                Some(provider_id) => match calculate_provider_utilization(&mut store, &provider_id)? {
                    Some(stats) => println!("{}", serde_json::to_string_pretty(&stats)?),
                    None => bail!("No provider with id {}", provider_id),
                },
                None => {
                    let pb = progress.create_bar(0, "Utilization: loading providers...");
                    let results = calculate_all_provider_utilization(&mut store, Some(pb))?;
                    for (provider_id, stats) in &results {
                        println!(
                            "{:<36} {:>6.1}/{:<6.1} hours {:>4}%",
                            provider_id,
                            stats.scheduled_hours,
                            stats.total_available_hours,
                            stats.utilization_percentage
                        );
                    }
                    println!("Recomputed utilization for {} providers", results.len());
                }
            }
        }
        Command::Match { patient_id, limit } => {
            let store = FileStore::open(&config.data_dir)?;
            let Some((patient, matches)) = find_matches_for_patient(&store, &patient_id)? else {
                bail!("No patient with id {}", patient_id);
            };
            println!("Matches for {} ({}):", patient.name, patient.id);
            if matches.is_empty() {
                println!("  no provider scored above zero");
            }
            for (rank, m) in matches.iter().take(limit).enumerate() {
                println!("{:>3}. {} [{}] score {}", rank + 1, m.provider.name, m.provider.id, m.match_score);
                for reason in &m.reasons {
                    println!("       - {}", reason);
                }
            }
        }
    }

    Ok(())
}

fn resolve_type_hint(raw: Option<&str>, config: &AppConfig) -> Result<Option<RecordType>> {
    match raw {
        Some(raw) => parse_type_hint(raw)
            .ok_or_else(|| anyhow!("Unknown --type '{}', expected auto, patients or providers", raw)),
        None => Ok(config.default_type),
    }
}

fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed reading {}", path.display()))
}
