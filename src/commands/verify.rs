use std::path::Path;

use clap::Args;
use serde::Serialize;

use busmigrate::migrate::{self, Fixture, VerifyReport};
use busmigrate::utils::io;
use busmigrate::{log_status, Error};

use super::{CmdResult, GlobalArgs};

#[derive(Args)]
pub struct VerifyArgs {
    /// JSON file with `[{"name", "input", "expected"}]` fixtures (default: built-in set)
    #[arg(long, value_name = "FILE")]
    pub fixtures: Option<String>,

    /// Path to a busmigrate.json (default: discovered in the current directory)
    #[arg(long, value_name = "FILE")]
    pub config: Option<String>,
}

#[derive(Serialize)]
pub struct VerifyOutput {
    pub command: &'static str,
    pub source: String,
    #[serde(flatten)]
    pub report: VerifyReport,
}

pub fn run(args: VerifyArgs, _global: &GlobalArgs) -> CmdResult<VerifyOutput> {
    let config = super::load_config(args.config.as_deref(), Path::new("."))?;
    let registry = config.build_registry()?;
    let options = config.options()?;

    let (source, fixtures) = match &args.fixtures {
        Some(path) => (path.clone(), read_fixtures(Path::new(path))?),
        None => ("builtin".to_string(), migrate::builtin_fixtures()),
    };

    if fixtures.is_empty() {
        return Err(Error::validation_invalid_argument(
            "fixtures",
            "No fixtures to verify",
        ));
    }

    let report = migrate::verify(&fixtures, &registry, &options)?;
    log_status!("verify", "{}/{} fixture(s) passed", report.passed, report.total);

    Ok((
        VerifyOutput {
            command: "verify",
            source,
            report,
        },
        0,
    ))
}

fn read_fixtures(path: &Path) -> busmigrate::Result<Vec<Fixture>> {
    if !path.is_file() {
        return Err(Error::path_not_found(path.display().to_string()));
    }
    let raw = io::read_text(path)?;
    serde_json::from_str(&raw).map_err(|e| {
        Error::validation_invalid_argument("fixtures", format!("{}: {}", path.display(), e))
    })
}
