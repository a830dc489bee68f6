use chrono::NaiveDate;
use clap::{CommandFactory, Parser};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{ClaimsError, Result};
use crate::models::{DenialSort, TrendGranularity};
use crate::time_utils::parse_filter_date;

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Revenue-cycle analytics over healthcare claim records
#[derive(Parser, Debug, Clone)]
#[command(
    name = "claims-dashboard",
    about = "Revenue-cycle analytics over healthcare claim records",
    version
)]
pub struct Settings {
    /// Claims file (.json / .jsonl) or a directory of them
    #[arg(long, env = "CLAIMS_DATA")]
    pub data: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    pub format: String,

    /// Trend granularity shown in text output
    #[arg(long, default_value = "daily", value_parser = ["monthly", "daily"])]
    pub trend: String,

    /// Sort key for the denial-reasons breakdown
    #[arg(long, default_value = "count", value_parser = ["count", "amount"])]
    pub denial_sort: String,

    /// Only include claims billed to this payer
    #[arg(long)]
    pub payer: Option<String>,

    /// Only include claims from this department
    #[arg(long)]
    pub dept: Option<String>,

    /// First service date to include (inclusive)
    #[arg(long, requires = "end")]
    pub start: Option<String>,

    /// Last service date to include (inclusive)
    #[arg(long, requires = "start")]
    pub end: Option<String>,

    /// List the claims having this status
    #[arg(long)]
    pub status: Option<String>,

    /// Timezone used to bucket timestamps into days (auto-detected if not specified)
    #[arg(long, default_value = "auto")]
    pub timezone: String,

    /// Date field names to try first, in priority order
    #[arg(long, value_delimiter = ',')]
    pub date_fields: Vec<String>,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Clear saved configuration
    #[arg(long)]
    pub clear: bool,
}

// ── LastUsedParams ─────────────────────────────────────────────────────────────

/// Persisted last-used parameters saved to `~/.claims-dashboard/last_used.json`.
///
/// Filters (`payer`, `dept`, date range, `status`) are per-run and never
/// persisted.
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct LastUsedParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trend: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub denial_sort: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_fields: Option<Vec<String>>,
}

impl LastUsedParams {
    /// Return the default path to the persisted config file.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// Return the config path rooted at `base_dir` (used for testing).
    pub fn config_path_in(base_dir: &std::path::Path) -> PathBuf {
        base_dir.join(".claims-dashboard").join("last_used.json")
    }

    /// Load persisted params from an explicit path.
    /// Returns `Default` when the file is absent or cannot be parsed.
    pub fn load_from(path: &std::path::Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_default()
    }

    /// Atomically write params to an explicit path, creating parent
    /// directories if needed.
    pub fn save_to(&self, path: &std::path::Path) -> std::result::Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;

        // Write to a temp file then rename.
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    /// Delete the config file at an explicit path if it exists.
    pub fn clear_at(path: &std::path::Path) -> std::result::Result<(), std::io::Error> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse CLI arguments, merge with last-used params where no explicit CLI
    /// value was provided, resolve `"auto"` values, and persist the result.
    pub fn load_with_last_used() -> Self {
        Self::load_with_last_used_impl(
            std::env::args_os().collect(),
            &LastUsedParams::config_path(),
        )
    }

    /// Takes the args and config path explicitly so
    /// tests can redirect to a temporary directory.
    pub fn load_with_last_used_impl(
        args: Vec<std::ffi::OsString>,
        config_path: &std::path::Path,
    ) -> Self {
        // Raw ArgMatches are needed to query ValueSource.
        let matches = Settings::command().get_matches_from(args.clone());
        let mut settings = Settings::parse_from(args);

        if settings.clear {
            let _ = LastUsedParams::clear_at(config_path);
            return Self::resolve_auto_values(settings);
        }

        let last = LastUsedParams::load_from(config_path);

        // CLI always wins over persisted values.
        let saved_data = persisted_data(&matches, &settings.data, last.data.clone());
        if settings.data.is_none() {
            settings.data = last.data;
        }
        if !is_arg_explicitly_set(&matches, "format") {
            if let Some(v) = last.format {
                settings.format = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "trend") {
            if let Some(v) = last.trend {
                settings.trend = v;
            }
        }
        // NOTE: clap stores the arg id using the *field name* (underscores),
        // not the long-flag spelling (hyphens).
        if !is_arg_explicitly_set(&matches, "denial_sort") {
            if let Some(v) = last.denial_sort {
                settings.denial_sort = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "timezone") {
            if let Some(v) = last.timezone {
                settings.timezone = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "date_fields") && settings.date_fields.is_empty() {
            settings.date_fields = last.date_fields.unwrap_or_default();
        }

        // Persist before resolving "auto" so the sentinel survives.
        let mut params = LastUsedParams::from(&settings);
        params.data = saved_data;
        let _ = params.save_to(config_path);

        Self::resolve_auto_values(settings)
    }

    /// Resolve `"auto"` sentinel values and apply the `--debug` flag.
    fn resolve_auto_values(mut settings: Settings) -> Settings {
        settings.timezone = crate::time_utils::resolve_timezone_name(&settings.timezone);

        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }

        settings
    }

    pub fn denial_sort(&self) -> DenialSort {
        self.denial_sort.parse().unwrap_or_default()
    }

    pub fn trend_granularity(&self) -> TrendGranularity {
        self.trend.parse().unwrap_or_default()
    }

    pub fn json_output(&self) -> bool {
        self.format == "json"
    }

    /// The inclusive date filter, when both bounds are given.
    pub fn date_range(&self) -> Result<Option<(NaiveDate, NaiveDate)>> {
        match (&self.start, &self.end) {
            (Some(start), Some(end)) => {
                let (start, end) = (parse_filter_date(start)?, parse_filter_date(end)?);
                if start > end {
                    return Err(ClaimsError::Config(format!(
                        "--start {start} is after --end {end}"
                    )));
                }
                Ok(Some((start, end)))
            }
            _ => Ok(None),
        }
    }
}

// ── Conversion ─────────────────────────────────────────────────────────────────

impl From<&Settings> for LastUsedParams {
    fn from(s: &Settings) -> Self {
        LastUsedParams {
            data: s.data.clone(),
            format: Some(s.format.clone()),
            trend: Some(s.trend.clone()),
            denial_sort: Some(s.denial_sort.clone()),
            timezone: Some(s.timezone.clone()),
            date_fields: if s.date_fields.is_empty() {
                None
            } else {
                Some(s.date_fields.clone())
            },
        }
    }
}

/// Data path to save: only a `--data` given on the command line replaces the
/// saved one. A path from `CLAIMS_DATA` applies to the current run only.
fn persisted_data(
    matches: &clap::ArgMatches,
    current: &Option<PathBuf>,
    saved: Option<PathBuf>,
) -> Option<PathBuf> {
    if is_arg_explicitly_set(matches, "data") {
        current.clone()
    } else {
        saved
    }
}

/// Returns `true` when `name` was supplied explicitly on the command line
/// (not via default value or environment variable).
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(clap::parser::ValueSource::CommandLine)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
