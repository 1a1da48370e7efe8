//! Command handler modules for the `pdk` binary.
//!
//! Shared utilities used by multiple command paths live here.

pub mod audit;
pub mod providers;
pub mod run;

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use pdk_config::{load_layered_yaml, resolve_strategy_secrets, LoadedConfig, ResolvedSecrets, SimConfig};

/// Merged config, its typed view and the API keys it names.
pub struct Setup {
    pub loaded: LoadedConfig,
    pub cfg: SimConfig,
    pub secrets: ResolvedSecrets,
}

pub fn load_setup(config_paths: &[PathBuf]) -> Result<Setup> {
    let loaded = load_layered_yaml(config_paths)?;
    let cfg = loaded.sim_config()?;
    let secrets = resolve_strategy_secrets(&cfg)?;
    Ok(Setup {
        loaded,
        cfg,
        secrets,
    })
}

/// Parse a CLI `YYYY-MM-DD` date argument.
pub fn parse_date(flag: &str, raw: Option<&str>) -> Result<Option<NaiveDate>> {
    raw.map(|s| {
        NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .with_context(|| format!("invalid --{flag} '{s}'. expected YYYY-MM-DD"))
    })
    .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_date_accepts_iso_and_none() {
        assert_eq!(parse_date("start", None).unwrap(), None);
        assert_eq!(
            parse_date("start", Some(" 2024-03-01 ")).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
        let err = parse_date("end", Some("01/03/2024")).unwrap_err();
        assert!(err.to_string().contains("--end"));
    }
}
