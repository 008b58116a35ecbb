//! Configuration file handling.
//!
//! The file lives next to the other plugin data under
//! `Data/NVSE/Plugins/`. A missing file is created from the shipped
//! defaults, and individual keys that are missing or carry the wrong type
//! are repaired in place and written back, so a half-edited file degrades
//! to defaults instead of failing the load.

use std::fs;
use std::path::{Path, PathBuf};

use log::LevelFilter;
use toml_edit::{DocumentMut, Item, Table};

use crate::budget::{BudgetMb, BudgetPreset};
use crate::error::{Error, Result};

/// Shipped default configuration, written verbatim when no file exists.
pub const DEFAULT_CONFIG: &str = include_str!("overdrive.toml");

/// Parsed plugin configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Master switch; when false the plugin loads but changes nothing.
    pub enabled: bool,
    /// Budget tier applied at startup.
    pub preset: BudgetPreset,
    /// Log file verbosity.
    pub log_level: LevelFilter,
    /// Per-pool overrides in MB; zero keeps the preset value.
    pub overrides: BudgetMb,
    pub dynamic: DynamicConfig,
    pub telemetry: TelemetryConfig,
}

/// Settings for load-driven budget scaling.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicConfig {
    pub enabled: bool,
    /// Frame time to hold, in milliseconds.
    pub target_frame_ms: f64,
    /// Fractional cut per adjustment while over target.
    pub scale_down: f64,
    /// Fractional growth per adjustment while under target.
    pub scale_up: f64,
    /// Samples between adjustments.
    pub adjust_period: u32,
    /// Per-pool lower bounds in MB.
    pub floor: BudgetMb,
    /// Per-pool upper bounds in MB.
    pub ceiling: BudgetMb,
}

/// Settings for the metrics file.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryConfig {
    pub enabled: bool,
    /// Samples between rows.
    pub period: u32,
    pub output: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enabled: true,
            preset: BudgetPreset::Aggressive,
            log_level: LevelFilter::Info,
            overrides: ZERO_MB,
            dynamic: DynamicConfig {
                enabled: true,
                target_frame_ms: 16.67,
                scale_down: 0.2,
                scale_up: 0.02,
                adjust_period: 30,
                floor: BudgetMb {
                    exterior_texture: 128,
                    interior_geometry: 64,
                    interior_texture: 128,
                    interior_water: 32,
                    actor_memory: 32,
                },
                ceiling: BudgetMb {
                    exterior_texture: 4096,
                    interior_geometry: 2048,
                    interior_texture: 4096,
                    interior_water: 1024,
                    actor_memory: 1024,
                },
            },
            telemetry: TelemetryConfig {
                enabled: true,
                period: 300,
                output: PathBuf::from("Data/NVSE/Plugins/overdrive-metrics.csv"),
            },
        }
    }
}

const ZERO_MB: BudgetMb = BudgetMb {
    exterior_texture: 0,
    interior_geometry: 0,
    interior_texture: 0,
    interior_water: 0,
    actor_memory: 0,
};

impl Config {
    /// Loads the configuration from `path`, creating it from defaults when
    /// missing and repairing unusable keys in place.
    ///
    /// # Errors
    ///
    /// Fails on i/o errors and on files that are not TOML at all; key-level
    /// problems are repaired, not reported.
    pub fn load(path: &Path) -> Result<Self> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        if !path.exists() {
            fs::write(path, DEFAULT_CONFIG)?;
        }
        let text = fs::read_to_string(path)?;
        let mut doc = text.parse::<DocumentMut>().map_err(|source| Error::Config {
            path: path.to_path_buf(),
            source,
        })?;
        let (config, changed) = Self::from_document(&mut doc);
        if changed {
            fs::write(path, doc.to_string())?;
        }
        Ok(config)
    }

    /// Reads the configuration out of a parsed document, inserting defaults
    /// for keys that are missing or mistyped. Returns the configuration and
    /// whether the document was modified.
    pub fn from_document(doc: &mut DocumentMut) -> (Self, bool) {
        let defaults = Self::default();
        let mut changed = false;

        let general = section(doc, "general", &mut changed);
        let enabled = read_bool(general, "enabled", defaults.enabled, &mut changed);
        let preset_name = read_str(general, "preset", defaults.preset.name(), &mut changed);
        let preset = match BudgetPreset::from_name(&preset_name) {
            Some(preset) => preset,
            None => {
                general["preset"] = toml_edit::value(defaults.preset.name());
                changed = true;
                defaults.preset
            }
        };
        let level_name = read_str(
            general,
            "log_level",
            defaults.log_level.as_str(),
            &mut changed,
        );
        let log_level = match level_name.parse::<LevelFilter>() {
            Ok(level) => level,
            Err(_) => {
                general["log_level"] = toml_edit::value(defaults.log_level.as_str());
                changed = true;
                defaults.log_level
            }
        };

        let budgets = section(doc, "budgets", &mut changed);
        let overrides = read_budget_mb(budgets, "", ZERO_MB, &mut changed);

        let dynamic = section(doc, "dynamic", &mut changed);
        let dyn_defaults = &defaults.dynamic;
        let dynamic = DynamicConfig {
            enabled: read_bool(dynamic, "enabled", dyn_defaults.enabled, &mut changed),
            target_frame_ms: read_f64(
                dynamic,
                "target_frame_ms",
                dyn_defaults.target_frame_ms,
                &mut changed,
            ),
            scale_down: read_f64(dynamic, "scale_down", dyn_defaults.scale_down, &mut changed),
            scale_up: read_f64(dynamic, "scale_up", dyn_defaults.scale_up, &mut changed),
            adjust_period: read_u32(
                dynamic,
                "adjust_period",
                dyn_defaults.adjust_period,
                &mut changed,
            ),
            floor: read_budget_mb(dynamic, "min_", dyn_defaults.floor, &mut changed),
            ceiling: read_budget_mb(dynamic, "max_", dyn_defaults.ceiling, &mut changed),
        };

        let telemetry = section(doc, "telemetry", &mut changed);
        let tel_defaults = &defaults.telemetry;
        let telemetry = TelemetryConfig {
            enabled: read_bool(telemetry, "enabled", tel_defaults.enabled, &mut changed),
            period: read_u32(telemetry, "period", tel_defaults.period, &mut changed),
            output: PathBuf::from(read_str(
                telemetry,
                "output",
                &tel_defaults.output.to_string_lossy(),
                &mut changed,
            )),
        };

        (
            Self {
                enabled,
                preset,
                log_level,
                overrides,
                dynamic,
                telemetry,
            },
            changed,
        )
    }
}

fn section<'a>(doc: &'a mut DocumentMut, name: &str, changed: &mut bool) -> &'a mut Table {
    if !doc.get(name).is_some_and(Item::is_table) {
        doc.insert(name, toml_edit::table());
        *changed = true;
    }
    doc[name].as_table_mut().expect("section was just inserted")
}

fn read_bool(table: &mut Table, key: &str, default: bool, changed: &mut bool) -> bool {
    match table.get(key).and_then(Item::as_bool) {
        Some(value) => value,
        None => {
            table[key] = toml_edit::value(default);
            *changed = true;
            default
        }
    }
}

fn read_u32(table: &mut Table, key: &str, default: u32, changed: &mut bool) -> u32 {
    match table
        .get(key)
        .and_then(Item::as_integer)
        .and_then(|raw| u32::try_from(raw).ok())
    {
        Some(value) => value,
        None => {
            table[key] = toml_edit::value(i64::from(default));
            *changed = true;
            default
        }
    }
}

fn read_f64(table: &mut Table, key: &str, default: f64, changed: &mut bool) -> f64 {
    // Accept integer spellings of fractional settings.
    let value = table.get(key).and_then(|item| {
        item.as_float()
            .or_else(|| item.as_integer().map(|raw| raw as f64))
    });
    match value {
        Some(value) => value,
        None => {
            table[key] = toml_edit::value(default);
            *changed = true;
            default
        }
    }
}

fn read_str(table: &mut Table, key: &str, default: &str, changed: &mut bool) -> String {
    match table.get(key).and_then(Item::as_str) {
        Some(value) => value.to_owned(),
        None => {
            table[key] = toml_edit::value(default);
            *changed = true;
            default.to_owned()
        }
    }
}

fn read_budget_mb(table: &mut Table, prefix: &str, default: BudgetMb, changed: &mut bool) -> BudgetMb {
    let key = |name: &str| format!("{prefix}{name}");
    BudgetMb {
        exterior_texture: read_u32(
            table,
            &key("exterior_texture"),
            default.exterior_texture,
            changed,
        ),
        interior_geometry: read_u32(
            table,
            &key("interior_geometry"),
            default.interior_geometry,
            changed,
        ),
        interior_texture: read_u32(
            table,
            &key("interior_texture"),
            default.interior_texture,
            changed,
        ),
        interior_water: read_u32(
            table,
            &key("interior_water"),
            default.interior_water,
            changed,
        ),
        actor_memory: read_u32(table, &key("actor_memory"), default.actor_memory, changed),
    }
}
