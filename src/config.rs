use std::error::Error;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use manga_scraper::exists;
use serde::{Deserialize, Serialize};

use crate::backend::AppDirectories;
use crate::global::BROWSER_USER_AGENT;

static CONFIG_TEMPLATE: &str = include_str!("../scraper-config.toml");

pub static DEFAULT_CONFIG_FILE: &str = "scraper-config.toml";

/// Everything a run needs besides the command line, read from a toml file
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    pub scrape: ScrapeSection,
    pub fetch: FetchConfig,
    pub volumes: VolumesConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapeSection {
    pub title: Option<String>,
    pub main_url: Option<String>,
    pub chapter_link_selector: Option<String>,
    pub page_selector: Option<String>,
    pub fallback_page_selectors: Vec<String>,
    pub start_chapter: Option<String>,
    pub end_chapter: Option<String>,
    pub merge_into_pdf: bool,
    pub download_directory: PathBuf,
}

impl Default for ScrapeSection {
    fn default() -> Self {
        Self {
            title: None,
            main_url: None,
            chapter_link_selector: None,
            page_selector: None,
            fallback_page_selectors: vec![],
            start_chapter: None,
            end_chapter: None,
            merge_into_pdf: false,
            download_directory: AppDirectories::MangaDownloads.get_full_path(Path::new(".")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub max_retries: u32,
    pub delay_min_secs: f64,
    pub delay_max_secs: f64,
    pub retry_backoff_min_secs: u64,
    pub retry_backoff_max_secs: u64,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            delay_min_secs: 2.0,
            delay_max_secs: 5.0,
            retry_backoff_min_secs: 5,
            retry_backoff_max_secs: 10,
            timeout_secs: 10,
            user_agent: BROWSER_USER_AGENT.to_string(),
        }
    }
}

/// Upper bound of the courtesy delay
const MAX_DELAY_SECS: f64 = 3600.0;

/// Negative and `NaN` become zero, anything above [`MAX_DELAY_SECS`] is capped
fn delay_from_secs(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs.clamp(0.0, MAX_DELAY_SECS)).unwrap_or_default()
}

impl FetchConfig {
    /// Delays must be a finite amount of seconds, zero or more
    pub fn check(&self) -> Result<(), String> {
        for (name, value) in [("delay_min_secs", self.delay_min_secs), ("delay_max_secs", self.delay_max_secs)] {
            if !value.is_finite() || value < 0.0 {
                return Err(format!("`{name}` must be a positive amount of seconds, found {value}"));
            }
        }
        Ok(())
    }

    /// The pause taken after every successful request, `(min, max)`
    pub fn courtesy_delay(&self) -> (Duration, Duration) {
        let min = delay_from_secs(self.delay_min_secs);
        let max = delay_from_secs(self.delay_max_secs);
        if min <= max { (min, max) } else { (max, min) }
    }

    /// The pause taken after a failed request, `(min, max)`
    pub fn retry_backoff(&self) -> (Duration, Duration) {
        let min = self.retry_backoff_min_secs.min(self.retry_backoff_max_secs);
        let max = self.retry_backoff_min_secs.max(self.retry_backoff_max_secs);
        (Duration::from_secs(min), Duration::from_secs(max))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// At least one attempt is always made
    pub fn attempts(&self) -> u32 {
        self.max_retries.max(1)
    }

    #[cfg(test)]
    pub fn without_delays() -> Self {
        Self {
            delay_min_secs: 0.0,
            delay_max_secs: 0.0,
            retry_backoff_min_secs: 0,
            retry_backoff_max_secs: 0,
            timeout_secs: 5,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumesConfig {
    pub chapters_per_volume: u32,
    pub start_volume_number: u32,
}

impl Default for VolumesConfig {
    fn default() -> Self {
        Self {
            chapters_per_volume: 12,
            start_volume_number: 1,
        }
    }
}

impl ScraperConfig {
    pub fn read_raw_config(config_file: &Path) -> Result<String, std::io::Error> {
        let mut config_file = File::open(config_file)?;

        let mut contents = String::new();
        config_file.read_to_string(&mut contents)?;

        Ok(contents)
    }

    pub fn read(config_file: &Path) -> Result<Self, Box<dyn Error>> {
        let contents = Self::read_raw_config(config_file)?;

        let config: ScraperConfig =
            toml::from_str(&contents).map_err(|e| format!("invalid config file {} : {e}", config_file.display()))?;

        config.fetch.check().map_err(|e| format!("invalid config file {} : {e}", config_file.display()))?;

        Ok(config)
    }

    /// Reads `config_file` when it is given, otherwise the default config file if it exists in the
    /// current directory, falls back to the default configuration
    pub fn load(config_file: Option<&Path>) -> Result<Self, Box<dyn Error>> {
        match config_file {
            Some(file) => Self::read(file),
            None if exists!(DEFAULT_CONFIG_FILE) => Self::read(Path::new(DEFAULT_CONFIG_FILE)),
            None => Ok(Self::default()),
        }
    }

    pub fn get_config_template() -> &'static str {
        CONFIG_TEMPLATE
    }

    /// Returns `true` if the file was written
    pub fn write_if_not_exists(config_file: &Path) -> Result<bool, std::io::Error> {
        if exists!(config_file) {
            return Ok(false);
        }

        let mut file = File::create(config_file)?;
        file.write_all(Self::get_config_template().as_bytes())?;

        Ok(true)
    }
}
