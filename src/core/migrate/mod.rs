//! Event-bus call-site migration.
//!
//! Rewrites legacy `EventBus.<ns>.emit_event/connect_event/disconnect_event`
//! calls into `GlobalEventBus.<ns>.dispatch_event/add_listener/remove_listener`.
//!
//! - `registry`: `(namespace, event_name)` → typed event class
//! - `args`: bracket- and quote-aware argument splitting
//! - `rules`: the three rewrite rules and the per-file [`Rewriter`]
//! - `driver`: directory walk, per-file processing, run statistics
//! - `harness`: fixture verification with an idempotence pass

mod args;
mod driver;
mod harness;
mod registry;
mod rules;

pub use args::{find_call_end, split_arguments};
pub use driver::{
    run, ChangedFile, FileError, MigrateOptions, RunStatistics, Strictness, DEFAULT_EXTENSION,
    DEFAULT_SKIP_DIRS,
};
pub use harness::{builtin_fixtures, verify, Fixture, FixtureResult, VerifyReport};
pub use registry::{EventDescriptor, EventMapping, EventRegistry};
pub use rules::{
    suggest_mapping, CallSiteWarning, FileChange, Replacement, RewriteRule, Rewriter, RuleCounts,
    RuleKind, RuleOutcome, WarningKind, LEGACY_BUS, TYPED_BUS,
};
