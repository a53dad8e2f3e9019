use serde::{Deserialize, Serialize};
use tokio::fs;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use directories::ProjectDirs;

use crate::shared::error::{EngineError, EngineResult};

/// Characters accepted on either side of a matched quantity.
/// Whitespace, ASCII punctuation, markdown emphasis and the degree sign.
pub const DEFAULT_BOUNDARY_CHARS: &str = " \t\r\n.,;:!?()[]{}<>\"'`*_~|/°";

/// Number of channel messages inspected when collecting participants.
pub const DEFAULT_CHANNEL_HISTORY_LIMIT: usize = 20;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineSettings {
    pub boundary_chars: String,
    pub currency_abbreviations: bool,
    pub channel_history_limit: usize,
    /// Additional measurement links, applied symmetrically on top of the built-in table.
    pub extra_links: Vec<(String, String)>,
    pub database_path: Option<PathBuf>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            boundary_chars: DEFAULT_BOUNDARY_CHARS.to_string(),
            currency_abbreviations: true,
            channel_history_limit: DEFAULT_CHANNEL_HISTORY_LIMIT,
            extra_links: Vec::new(),
            database_path: None,
        }
    }
}

impl EngineSettings {
    pub fn get_settings_path() -> EngineResult<PathBuf> {
        ProjectDirs::from("org", "unitscan", "unit-scan")
            .map(|dirs| dirs.config_dir().join("settings.json"))
            .ok_or_else(|| EngineError::Configuration("Failed to determine config directory".to_string()))
    }

    /// Load from the platform config directory, writing defaults on first run.
    pub async fn load() -> EngineResult<Self> {
        let path = Self::get_settings_path()?;
        Self::load_from(&path).await
    }

    pub async fn load_from(path: &Path) -> EngineResult<Self> {
        if !fs::try_exists(path).await? {
            let settings = Self::default();
            settings.save_to(path).await?;
            return Ok(settings);
        }

        let content = fs::read_to_string(path).await
            .map_err(|e| EngineError::Configuration(format!("Failed to read settings file: {}", e)))?;

        serde_json::from_str(&content)
            .map_err(|e| EngineError::Configuration(format!("Failed to parse settings: {}", e)))
    }

    pub async fn save_to(&self, path: &Path) -> EngineResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await
                .map_err(|e| EngineError::Configuration(format!("Failed to create config directory: {}", e)))?;
        }

        let content = serde_json::to_string_pretty(self)?;

        fs::write(path, content).await
            .map_err(|e| EngineError::Configuration(format!("Failed to write settings file: {}", e)))
    }

    /// Default location of the redb catalog database.
    pub fn resolved_database_path(&self) -> EngineResult<PathBuf> {
        if let Some(path) = &self.database_path {
            return Ok(path.clone());
        }
        ProjectDirs::from("org", "unitscan", "unit-scan")
            .map(|dirs| dirs.data_dir().join("catalog.redb"))
            .ok_or_else(|| EngineError::Configuration("Unable to determine data directory".to_string()))
    }

    pub fn boundary_set(&self) -> BoundarySet {
        BoundarySet::new(&self.boundary_chars)
    }
}

/// Set of characters that may sit immediately before or after a match.
#[derive(Debug, Clone)]
pub struct BoundarySet {
    chars: HashSet<char>,
}

impl BoundarySet {
    /// Text edges are treated as this character.
    pub const EDGE: char = ' ';

    pub fn new(chars: &str) -> Self {
        let mut set: HashSet<char> = chars.chars().collect();
        set.insert(Self::EDGE);
        Self { chars: set }
    }

    pub fn contains(&self, c: char) -> bool {
        self.chars.contains(&c)
    }
}

impl Default for BoundarySet {
    fn default() -> Self {
        Self::new(DEFAULT_BOUNDARY_CHARS)
    }
}
