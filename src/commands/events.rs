use std::path::Path;

use clap::Args;
use serde::Serialize;

use busmigrate::migrate::EventDescriptor;

use super::{CmdResult, GlobalArgs};

#[derive(Args)]
pub struct EventsArgs {
    /// Only list events in this namespace
    #[arg(long, short)]
    pub namespace: Option<String>,

    /// Path to a busmigrate.json (default: discovered in the current directory)
    #[arg(long, value_name = "FILE")]
    pub config: Option<String>,
}

#[derive(Serialize)]
pub struct EventsOutput {
    pub command: &'static str,
    pub total: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub malformed: Vec<String>,
    pub events: Vec<EventDescriptor>,
}

pub fn run(args: EventsArgs, _global: &GlobalArgs) -> CmdResult<EventsOutput> {
    let config = super::load_config(args.config.as_deref(), Path::new("."))?;
    let registry = config.build_registry()?;

    let in_scope = |d: &&EventDescriptor| {
        args.namespace
            .as_deref()
            .map_or(true, |ns| d.namespace == ns)
    };

    let events: Vec<EventDescriptor> = registry
        .descriptors()
        .into_iter()
        .filter(in_scope)
        .cloned()
        .collect();

    let malformed: Vec<String> = registry
        .malformed()
        .into_iter()
        .filter(in_scope)
        .map(|d| d.key())
        .collect();

    Ok((
        EventsOutput {
            command: "events",
            total: events.len(),
            malformed,
            events,
        },
        0,
    ))
}
