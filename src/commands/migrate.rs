use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use busmigrate::config::normalize_extension;
use busmigrate::migrate::{self, RunStatistics, Strictness};
use busmigrate::Error;

use super::{CmdResult, GlobalArgs};

#[derive(Args)]
pub struct MigrateArgs {
    /// File or directory to migrate
    #[arg(default_value = ".")]
    pub path: String,

    /// Report what would change without writing any file
    #[arg(long)]
    pub dry_run: bool,

    /// Print per-file and per-rule progress to stderr
    #[arg(short, long)]
    pub verbose: bool,

    /// Directory names or globs to skip (replaces the default list)
    #[arg(long, value_delimiter = ',', value_name = "DIRS")]
    pub skip_dirs: Option<Vec<String>>,

    /// Script extension to scan (default: gd)
    #[arg(long, value_name = "EXT")]
    pub extension: Option<String>,

    /// Fail the run if any call-site is left unmigrated
    #[arg(long)]
    pub strict: bool,

    /// Path to a busmigrate.json (default: discovered in PATH)
    #[arg(long, value_name = "FILE")]
    pub config: Option<String>,
}

#[derive(Serialize)]
pub struct MigrateOutput {
    pub command: &'static str,
    pub path: String,
    pub dry_run: bool,
    pub strictness: Strictness,
    pub stats: RunStatistics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

pub fn run(args: MigrateArgs, _global: &GlobalArgs) -> CmdResult<MigrateOutput> {
    let target = PathBuf::from(&args.path);
    if !target.exists() {
        return Err(Error::path_not_found(args.path));
    }

    let config = super::load_config(args.config.as_deref(), &target)?;
    let registry = config.build_registry()?;
    let mut options = config.options()?;

    options.dry_run = args.dry_run;
    options.verbose = args.verbose;
    if let Some(skip_dirs) = args.skip_dirs {
        options.skip_dirs = skip_dirs;
    }
    if let Some(extension) = &args.extension {
        options.extension = normalize_extension(extension)
            .map_err(|problem| Error::validation_invalid_argument("extension", problem))?;
    }
    if args.strict {
        options.strictness = Strictness::Strict;
    }

    let stats = migrate::run(&target, &registry, &options)?;
    stats.enforce(options.strictness)?;

    let notice = options.dry_run.then(|| {
        format!(
            "Dry run: no files were changed ({} file(s) would be modified)",
            stats.changed_files.len()
        )
    });

    Ok((
        MigrateOutput {
            command: "migrate",
            path: args.path,
            dry_run: options.dry_run,
            strictness: options.strictness,
            stats,
            notice,
        },
        0,
    ))
}
