//! `pdk providers check|models`.

use std::path::PathBuf;

use anyhow::{bail, Result};
use pdk_agent::build_manager;

use super::load_setup;

pub async fn check(config_paths: &[PathBuf]) -> Result<()> {
    let setup = load_setup(config_paths)?;
    let manager = build_manager(&setup.cfg, &setup.secrets)?;

    let status = manager.check_availability().await;
    let down: Vec<&String> = status.iter().filter(|(_, up)| !**up).map(|(s, _)| s).collect();
    for (sig, up) in &status {
        println!("provider={sig} available={up}");
    }
    if !down.is_empty() {
        bail!("{} of {} providers unavailable", down.len(), status.len());
    }
    Ok(())
}

pub async fn models(config_paths: &[PathBuf]) -> Result<()> {
    let setup = load_setup(config_paths)?;
    let manager = build_manager(&setup.cfg, &setup.secrets)?;

    for (sig, res) in manager.list_all_models().await {
        match res {
            Ok(models) => {
                println!("provider={sig} models={}", models.len());
                for m in models {
                    println!("  {m}");
                }
            }
            Err(e) => println!("provider={sig} error={} detail={e}", e.kind()),
        }
    }
    Ok(())
}
