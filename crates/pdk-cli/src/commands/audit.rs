//! `pdk audit verify`.

use std::path::Path;

use anyhow::{bail, Result};
use pdk_audit::{verify_hash_chain, VerifyResult};

pub fn verify(path: &Path) -> Result<()> {
    match verify_hash_chain(path)? {
        VerifyResult::Valid { lines } => {
            println!("audit_valid=true lines={lines}");
            Ok(())
        }
        VerifyResult::Broken { line, reason } => {
            println!("audit_valid=false line={line}");
            bail!("audit chain broken at line {line}: {reason}")
        }
    }
}
