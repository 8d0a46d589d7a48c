//! TOML session configuration files.

use std::{fs, path::Path};

use anyhow::{bail, Context, Result};
use grid_defence_simulation::SimulationConfig;
use serde::Deserialize;

const SUPPORTED_CONFIG_VERSION: u32 = 1;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    version: u32,
    #[serde(default)]
    simulation: SimulationConfig,
}

/// Reads a session configuration from `path`.
pub(crate) fn load(path: &Path) -> Result<SimulationConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config at {}", path.display()))?;
    parse(&contents).with_context(|| format!("invalid config at {}", path.display()))
}

fn parse(contents: &str) -> Result<SimulationConfig> {
    let file: ConfigFile = toml::from_str(contents).context("failed to parse config toml")?;
    if file.version != SUPPORTED_CONFIG_VERSION {
        bail!(
            "unsupported config version {}; expected {}",
            file.version,
            SUPPORTED_CONFIG_VERSION
        );
    }
    Ok(file.simulation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use grid_defence_core::CellCoord;

    #[test]
    fn empty_simulation_table_uses_defaults() {
        let config = parse("version = 1\n").expect("config parses");
        assert_eq!(config, SimulationConfig::default());
    }

    #[test]
    fn nested_tables_override_defaults() {
        let config = parse(
            r#"
            version = 1

            [simulation]
            seed = 99
            columns = 48
            pathfinding = "worker"
            entry = { column = 2, row = 30 }

            [simulation.path]
            max_turns = 12

            [simulation.waves]
            boss_interval = 4
            "#,
        )
        .expect("config parses");

        assert_eq!(config.seed, 99);
        assert_eq!(config.columns, 48);
        assert_eq!(config.rows, SimulationConfig::default().rows);
        assert_eq!(config.entry, Some(CellCoord::new(2, 30)));
        assert_eq!(config.path.max_turns, 12);
        assert_eq!(config.path.min_segment, 4);
        assert_eq!(config.waves.boss_interval, 4);
        assert_eq!(config.waves.spawn_interval_ms, 800);
    }

    #[test]
    fn unsupported_versions_are_rejected() {
        let error = parse("version = 2\n").expect_err("version 2 is unknown");
        assert!(error.to_string().contains("unsupported config version 2"));
    }

    #[test]
    fn missing_version_is_rejected() {
        assert!(parse("[simulation]\nseed = 1\n").is_err());
    }
}
