//! Verification harness: run the driver over known fixtures and compare the
//! output byte-for-byte (ignoring only leading/trailing whitespace of the
//! whole file).
//!
//! Each fixture is also migrated a second time to check idempotence. The
//! temporary directory is removed on drop, whether verification passes or not.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tempfile::TempDir;

use super::driver::{self, MigrateOptions, RunStatistics};
use super::registry::EventRegistry;
use crate::error::{Error, Result};
use crate::utils::io;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fixture {
    pub name: String,
    pub input: String,
    pub expected: String,
}

impl Fixture {
    pub fn new(name: impl Into<String>, input: impl Into<String>, expected: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            input: input.into(),
            expected: expected.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FixtureResult {
    pub name: String,
    pub passed: bool,
    pub idempotent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifyReport {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub results: Vec<FixtureResult>,
    pub stats: RunStatistics,
}

/// Verify every fixture. Returns an error carrying the full report when any
/// fixture mismatches or is not idempotent.
pub fn verify(
    fixtures: &[Fixture],
    registry: &EventRegistry,
    options: &MigrateOptions,
) -> Result<VerifyReport> {
    validate_names(fixtures)?;

    let temp = TempDir::new()
        .map_err(|e| Error::internal_io(e.to_string(), Some("create fixture dir".to_string())))?;
    let root = temp.path();

    let options = MigrateOptions {
        dry_run: false,
        ..options.clone()
    };

    for fixture in fixtures {
        std::fs::write(fixture_path(root, fixture, &options), &fixture.input).map_err(|e| {
            Error::internal_io(e.to_string(), Some(format!("write fixture {}", fixture.name)))
        })?;
    }

    log_status!("verify", "Migrating {} fixture(s) in {}", fixtures.len(), root.display());
    let stats = driver::run(root, registry, &options)?;

    let mut first_pass = Vec::with_capacity(fixtures.len());
    for fixture in fixtures {
        first_pass.push(io::read_text(&fixture_path(root, fixture, &options))?);
    }

    driver::run(root, registry, &options)?;

    let mut results = Vec::with_capacity(fixtures.len());
    for (fixture, actual) in fixtures.iter().zip(first_pass) {
        let second = io::read_text(&fixture_path(root, fixture, &options))?;
        let matches = fixture.expected.trim() == actual.trim();
        let idempotent = second == actual;

        if matches && idempotent {
            log_status!("verify", "pass: {}", fixture.name);
        } else {
            log_status!("verify", "FAIL: {}", fixture.name);
        }

        results.push(FixtureResult {
            name: fixture.name.clone(),
            passed: matches && idempotent,
            idempotent,
            expected: (!matches).then(|| fixture.expected.trim().to_string()),
            actual: (!matches).then(|| actual.trim().to_string()),
        });
    }

    let passed = results.iter().filter(|r| r.passed).count();
    let report = VerifyReport {
        total: results.len(),
        passed,
        failed: results.len() - passed,
        results,
        stats,
    };

    if report.failed > 0 {
        let details = serde_json::to_value(&report)
            .map_err(|e| Error::internal_json(e.to_string(), Some("serialize report".to_string())))?;
        return Err(Error::migration_verification_failed(report.failed, details));
    }

    Ok(report)
}

fn fixture_path(root: &Path, fixture: &Fixture, options: &MigrateOptions) -> std::path::PathBuf {
    root.join(format!("{}.{}", fixture.name, options.extension))
}

fn validate_names(fixtures: &[Fixture]) -> Result<()> {
    let mut seen = HashSet::new();
    for fixture in fixtures {
        let valid = !fixture.name.is_empty()
            && fixture
                .name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(Error::validation_invalid_argument(
                "fixtures",
                format!("Fixture name '{}' must be non-empty [A-Za-z0-9_-]", fixture.name),
            ));
        }
        if !seen.insert(fixture.name.as_str()) {
            return Err(Error::validation_invalid_argument(
                "fixtures",
                format!("Duplicate fixture name '{}'", fixture.name),
            ));
        }
    }
    Ok(())
}

/// The regression fixtures shipped with the tool.
pub fn builtin_fixtures() -> Vec<Fixture> {
    vec![
        Fixture::new(
            "emit_event_basic",
            r#"
func test_emit_event():
    # game started
    EventBus.game.emit_event("game_started", [1])

    # damage dealt
    EventBus.battle.emit_event("damage_dealt", [source, target, 25.0, "physical", true])
"#,
            r#"
func test_emit_event():
    # game started
    GlobalEventBus.game.dispatch_event(GameEvents.GameStartedEvent.new(1))

    # damage dealt
    GlobalEventBus.battle.dispatch_event(BattleEvents.DamageDealtEvent.new(source, target, 25.0, "physical", true))
"#,
        ),
        Fixture::new(
            "connect_event_basic",
            r#"
func _ready():
    # listen for game start
    EventBus.game.connect_event("game_started", _on_game_started)

    # listen for damage
    EventBus.battle.connect_event("damage_dealt", _on_damage_dealt)
"#,
            r#"
func _ready():
    # listen for game start
    GlobalEventBus.game.add_listener("game_started", _on_game_started)

    # listen for damage
    GlobalEventBus.battle.add_listener("damage_dealt", _on_damage_dealt)
"#,
        ),
        Fixture::new(
            "disconnect_event_basic",
            r#"
func _exit_tree():
    # stop listening for game start
    EventBus.game.disconnect_event("game_started", _on_game_started)

    # stop listening for damage
    EventBus.battle.disconnect_event("damage_dealt", _on_damage_dealt)
"#,
            r#"
func _exit_tree():
    # stop listening for game start
    GlobalEventBus.game.remove_listener("game_started", _on_game_started)

    # stop listening for damage
    GlobalEventBus.battle.remove_listener("damage_dealt", _on_damage_dealt)
"#,
        ),
        Fixture::new(
            "complex_case",
            r#"
extends Node
class_name TestEventSystem

func _ready():
    EventBus.game.connect_event("game_started", _on_game_started)
    EventBus.battle.connect_event("damage_dealt", _on_damage_dealt)
    EventBus.chess.connect_event("chess_piece_moved", _on_chess_piece_moved)

func _exit_tree():
    EventBus.game.disconnect_event("game_started", _on_game_started)
    EventBus.battle.disconnect_event("damage_dealt", _on_damage_dealt)
    EventBus.chess.disconnect_event("chess_piece_moved", _on_chess_piece_moved)

func test_events():
    EventBus.game.emit_event("game_started", [1])
    EventBus.battle.emit_event("damage_dealt", [self, target, 25.0, "physical", true])
    EventBus.chess.emit_event("chess_piece_moved", [piece, Vector2(0, 0), Vector2(1, 1)])

func _on_game_started(event):
    print("game started")

func _on_damage_dealt(event):
    print("damage dealt")

func _on_chess_piece_moved(event):
    print("piece moved")
"#,
            r#"
extends Node
class_name TestEventSystem

func _ready():
    GlobalEventBus.game.add_listener("game_started", _on_game_started)
    GlobalEventBus.battle.add_listener("damage_dealt", _on_damage_dealt)
    GlobalEventBus.chess.add_listener("chess_piece_moved", _on_chess_piece_moved)

func _exit_tree():
    GlobalEventBus.game.remove_listener("game_started", _on_game_started)
    GlobalEventBus.battle.remove_listener("damage_dealt", _on_damage_dealt)
    GlobalEventBus.chess.remove_listener("chess_piece_moved", _on_chess_piece_moved)

func test_events():
    GlobalEventBus.game.dispatch_event(GameEvents.GameStartedEvent.new(1))
    GlobalEventBus.battle.dispatch_event(BattleEvents.DamageDealtEvent.new(self, target, 25.0, "physical", true))
    GlobalEventBus.chess.dispatch_event(ChessEvents.ChessPieceMovedEvent.new(piece, Vector2(0, 0), Vector2(1, 1)))

func _on_game_started(event):
    print("game started")

func _on_damage_dealt(event):
    print("damage dealt")

func _on_chess_piece_moved(event):
    print("piece moved")
"#,
        ),
    ]
}
