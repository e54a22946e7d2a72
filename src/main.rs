use clap::{Parser, Subcommand};

use commands::GlobalArgs;

mod commands;
mod output;
mod tty;

use commands::{events, migrate, verify};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "busmigrate")]
#[command(version = VERSION)]
#[command(about = "Migrate legacy EventBus call-sites to the typed GlobalEventBus API")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rewrite legacy event-bus calls in a file or directory
    Migrate(migrate::MigrateArgs),
    /// Run the migration over known fixtures and compare the output
    Verify(verify::VerifyArgs),
    /// List the event mapping table
    #[command(visible_alias = "list-events")]
    Events(events::EventsArgs),
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    let global = GlobalArgs {};

    let (json_result, exit_code) = commands::run_json(cli.command, &global);

    if let Err(err) = output::print_json_result(json_result) {
        eprintln!("[busmigrate] {}", err.detail_message());
        return std::process::ExitCode::from(exit_code_to_u8(1));
    }

    std::process::ExitCode::from(exit_code_to_u8(exit_code))
}

fn exit_code_to_u8(code: i32) -> u8 {
    if code <= 0 {
        0
    } else if code >= 255 {
        255
    } else {
        code as u8
    }
}
