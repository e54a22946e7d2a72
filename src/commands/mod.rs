use std::path::Path;

use busmigrate::config::MigrateConfig;

pub type CmdResult<T> = busmigrate::Result<(T, i32)>;

pub(crate) struct GlobalArgs {}

/// Load `--config` if given, otherwise discover `busmigrate.json` next to
/// `target`.
pub(crate) fn load_config(explicit: Option<&str>, target: &Path) -> busmigrate::Result<MigrateConfig> {
    MigrateConfig::resolve(explicit.map(Path::new), target)
}

pub mod events;
pub mod migrate;
pub mod verify;

/// Dispatch a command to its handler and map result to JSON.
macro_rules! dispatch {
    ($args:expr, $global:expr, $module:ident) => {
        crate::output::map_cmd_result_to_json($module::run($args, $global))
    };
}

pub(crate) fn run_json(
    command: crate::Commands,
    global: &GlobalArgs,
) -> (busmigrate::Result<serde_json::Value>, i32) {
    crate::tty::status("busmigrate is working...");

    match command {
        crate::Commands::Migrate(args) => dispatch!(args, global, migrate),
        crate::Commands::Verify(args) => dispatch!(args, global, verify),
        crate::Commands::Events(args) => dispatch!(args, global, events),
    }
}
