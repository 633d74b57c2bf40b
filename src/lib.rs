pub mod config;
pub mod entities;
pub mod persistence;
pub mod telemetry;

pub use config::{AppConfig, Command, PersistenceConfig};
pub use entities::character::CharacterRecord;
pub use persistence::{CharacterStore, PersistenceError, PlayerIndex, SaveMode};

use tracing::info;

pub fn run(args: &[String]) -> Result<(), String> {
    let config = AppConfig::from_args(args)?;
    telemetry::logging::init(&config.root)?;
    let store = CharacterStore::from_root(&config.root, config.persistence.clone());
    let mut index = store.open_index().map_err(|err| err.to_string())?;

    match config.command {
        Command::Scan => {
            let report = store.validate_records(&index);
            info!(
                indexed = report.indexed,
                parsed = report.parsed,
                warnings = report.warnings,
                errors = report.errors.len(),
                "record scan finished"
            );
            println!("pfile: record scan");
            println!("- root: {}", config.root.display());
            println!("- index entries: {}", index.len());
            println!("- top id: {}", index.top_id());
            if report.missing_dir {
                println!("- records: missing {} directory", store.player_dir().display());
            } else {
                println!(
                    "- records: indexed={}, parsed={}, missing={}, unindexed={}, warnings={}, errors={}",
                    report.indexed,
                    report.parsed,
                    report.missing_files.len(),
                    report.unindexed_files,
                    report.warnings,
                    report.errors.len()
                );
            }
            for name in &report.missing_files {
                eprintln!("pfile: no record file for {}", name);
            }
            for err in &report.errors {
                eprintln!("pfile: record validate {}", err);
            }
        }
        Command::Clean => {
            let report = store.clean_records(&mut index, telemetry::logging::unix_timestamp());
            info!(
                removed = report.removed.len(),
                errors = report.errors.len(),
                "clean pass finished"
            );
            println!("pfile: clean");
            println!("- root: {}", config.root.display());
            println!("- removed: {}", report.removed.len());
            for name in &report.removed {
                println!("  - {}", name);
            }
            println!("- index entries left: {}", index.len());
            for err in &report.errors {
                eprintln!("pfile: {}", err);
            }
        }
    }

    index.teardown();
    Ok(())
}
