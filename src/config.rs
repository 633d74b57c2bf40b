use crate::persistence::error::{PersistenceError, PersistenceResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "pfile.yml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Scan,
    Clean,
}

#[derive(Debug)]
pub struct AppConfig {
    pub root: PathBuf,
    pub command: Command,
    pub persistence: PersistenceConfig,
}

impl AppConfig {
    pub fn from_args(args: &[String]) -> Result<Self, String> {
        if args.len() < 2 {
            return Err("usage: pfile <data-root> [scan|clean]".to_string());
        }

        let root = Path::new(&args[1]).to_path_buf();
        let command = match args.get(2).map(|arg| arg.as_str()) {
            None | Some("scan") => Command::Scan,
            Some("clean") => Command::Clean,
            Some(other) => return Err(format!("unknown command: {}", other)),
        };
        let mut persistence = PersistenceConfig::load(&root).map_err(|err| err.to_string())?;
        if let Some(level) = std::env::var("PFILE_IMMORTAL_LEVEL")
            .ok()
            .and_then(|value| value.trim().parse::<i32>().ok())
        {
            persistence.immortal_level = level;
        }
        Ok(Self {
            root,
            command,
            persistence,
        })
    }
}

/// Removal rule: characters at or below `level` that have not logged in for
/// more than `days` are purged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanCriterion {
    pub level: i32,
    pub days: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    pub player_dir: String,
    pub index_file: String,
    pub record_extension: String,
    pub immortal_level: i32,
    pub clean_criteria: Vec<CleanCriterion>,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            player_dir: "plrfiles".to_string(),
            index_file: "index".to_string(),
            record_extension: "plr".to_string(),
            immortal_level: 31,
            clean_criteria: vec![
                CleanCriterion { level: 0, days: 0 },
                CleanCriterion { level: 1, days: 4 },
                CleanCriterion { level: 4, days: 7 },
                CleanCriterion { level: 10, days: 30 },
                CleanCriterion { level: 30, days: 60 },
                CleanCriterion { level: 34, days: 90 },
            ],
        }
    }
}

impl PersistenceConfig {
    /// Reads `<root>/pfile.yml`; a missing file means defaults.
    pub fn load(root: &Path) -> PersistenceResult<Self> {
        let path = root.join(CONFIG_FILE);
        let data = match fs::read_to_string(&path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => return Err(PersistenceError::FileOpen { path, source }),
        };
        serde_yaml::from_str(&data).map_err(|err| PersistenceError::Config {
            path,
            message: err.to_string(),
        })
    }
}
