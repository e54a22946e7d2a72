use std::fs;
use std::path::Path;

use busmigrate::config::{MigrateConfig, CONFIG_FILE_NAME};
use busmigrate::migrate::{
    builtin_fixtures, run, verify, EventRegistry, Fixture, MigrateOptions, Rewriter, Strictness,
    WarningKind,
};
use tempfile::TempDir;

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn read(root: &Path, relative: &str) -> String {
    fs::read_to_string(root.join(relative)).unwrap()
}

const PLAYER: &str = r#"extends Node

func _ready():
    EventBus.game.connect_event("game_started", _on_game_started)

func _exit_tree():
    EventBus.game.disconnect_event("game_started", _on_game_started)

func hit(target):
    EventBus.battle.emit_event("damage_dealt", [self, target, 25.0, "physical", true])
"#;

const PLAYER_MIGRATED: &str = r#"extends Node

func _ready():
    GlobalEventBus.game.add_listener("game_started", _on_game_started)

func _exit_tree():
    GlobalEventBus.game.remove_listener("game_started", _on_game_started)

func hit(target):
    GlobalEventBus.battle.dispatch_event(BattleEvents.DamageDealtEvent.new(self, target, 25.0, "physical", true))
"#;

// ============================================================================
// End-to-end
// ============================================================================

#[test]
fn migrates_project_tree() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "scripts/player.gd", PLAYER);
    write(dir.path(), "scripts/plain.gd", "func noop():\n    pass\n");
    write(dir.path(), "README.md", "EventBus.game.emit_event(\"game_started\", [1])\n");

    let stats = run(dir.path(), &EventRegistry::builtin(), &MigrateOptions::default()).unwrap();

    assert_eq!(read(dir.path(), "scripts/player.gd"), PLAYER_MIGRATED);
    assert_eq!(read(dir.path(), "scripts/plain.gd"), "func noop():\n    pass\n");
    assert!(read(dir.path(), "README.md").starts_with("EventBus."));

    assert_eq!(stats.files_processed, 2);
    assert_eq!(stats.files_modified, 1);
    assert_eq!(stats.replacements.dispatch, 1);
    assert_eq!(stats.replacements.subscribe, 1);
    assert_eq!(stats.replacements.unsubscribe, 1);
    assert_eq!(stats.errors, 0);
    assert_eq!(stats.changed_files.len(), 1);
    assert_eq!(stats.changed_files[0].file, "scripts/player.gd");
}

#[test]
fn dry_run_reports_same_counts_without_writing() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a.gd", PLAYER);
    write(dir.path(), "nested/b.gd", PLAYER);

    let options = MigrateOptions {
        dry_run: true,
        ..MigrateOptions::default()
    };
    let preview = run(dir.path(), &EventRegistry::builtin(), &options).unwrap();

    assert_eq!(read(dir.path(), "a.gd"), PLAYER);
    assert_eq!(read(dir.path(), "nested/b.gd"), PLAYER);
    assert_eq!(preview.files_modified, 0);
    assert_eq!(preview.changed_files.len(), 2);
    assert!(preview.changed_files.iter().all(|c| !c.written));

    let real = run(dir.path(), &EventRegistry::builtin(), &MigrateOptions::default()).unwrap();
    assert_eq!(real.replacements, preview.replacements);
    assert_eq!(real.files_processed, preview.files_processed);
    assert_eq!(real.files_modified, 2);
}

#[test]
fn skipped_directories_are_never_touched() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), ".godot/cache.gd", PLAYER);
    write(dir.path(), "addons/build/gen.gd", PLAYER);
    write(dir.path(), "src/main.gd", PLAYER);

    let stats = run(dir.path(), &EventRegistry::builtin(), &MigrateOptions::default()).unwrap();

    assert_eq!(stats.files_processed, 1);
    assert_eq!(read(dir.path(), ".godot/cache.gd"), PLAYER);
    assert_eq!(read(dir.path(), "addons/build/gen.gd"), PLAYER);
    assert_eq!(read(dir.path(), "src/main.gd"), PLAYER_MIGRATED);
}

#[test]
fn unmapped_event_is_left_unchanged_with_one_warning() {
    let dir = TempDir::new().unwrap();
    let source = "func f():\n    EventBus.foo.emit_event(\"bar_baz\", [1])\n";
    write(dir.path(), "x.gd", source);

    let stats = run(dir.path(), &EventRegistry::builtin(), &MigrateOptions::default()).unwrap();

    assert_eq!(read(dir.path(), "x.gd"), source);
    assert_eq!(stats.files_modified, 0);
    assert_eq!(stats.replacements.total(), 0);
    assert_eq!(stats.warnings.len(), 1);

    let warning = &stats.warnings[0];
    assert_eq!(warning.kind, WarningKind::UnmappedEvent);
    assert_eq!(warning.file, "x.gd");
    assert_eq!(warning.line, 2);
    assert!(warning.hint.as_deref().unwrap().contains("FooEvents.BarBazEvent"));
}

#[test]
fn strict_mode_fails_after_migrating_everything_else() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a.gd", PLAYER);
    write(dir.path(), "b.gd", "EventBus.foo.emit_event(\"bar_baz\", [1])\n");

    let options = MigrateOptions {
        strictness: Strictness::Strict,
        ..MigrateOptions::default()
    };
    let stats = run(dir.path(), &EventRegistry::builtin(), &options).unwrap();
    assert_eq!(read(dir.path(), "a.gd"), PLAYER_MIGRATED);

    let err = stats.enforce(options.strictness).unwrap_err();
    assert_eq!(err.code.as_str(), "migration.unmapped_events");
    assert_eq!(err.details["warnings"][0]["file"], "b.gd");
}

#[test]
fn missing_path_is_not_found() {
    let dir = TempDir::new().unwrap();
    let err = run(
        &dir.path().join("does-not-exist"),
        &EventRegistry::builtin(),
        &MigrateOptions::default(),
    )
    .unwrap_err();
    assert_eq!(err.code.as_str(), "path.not_found");
}

// ============================================================================
// Idempotence and verification
// ============================================================================

#[test]
fn second_pass_changes_nothing() {
    let rewriter = Rewriter::new().unwrap();
    let registry = EventRegistry::builtin();

    for fixture in builtin_fixtures() {
        let once = rewriter.rewrite(&fixture.input, &registry);
        let twice = rewriter.rewrite(&once.rewritten, &registry);
        assert!(!twice.modified, "{} changed on second pass", fixture.name);
        assert_eq!(twice.counts.total(), 0);
    }
}

#[test]
fn builtin_fixtures_verify() {
    let report = verify(
        &builtin_fixtures(),
        &EventRegistry::builtin(),
        &MigrateOptions::default(),
    )
    .unwrap();
    assert_eq!(report.passed, report.total);
    assert_eq!(report.total, 4);
}

#[test]
fn harness_detects_wrong_expectation() {
    let fixtures = vec![Fixture::new(
        "stale_expectation",
        "EventBus.game.connect_event(\"game_started\", cb)",
        "GlobalEventBus.game.connect_event(\"game_started\", cb)",
    )];

    let err = verify(&fixtures, &EventRegistry::builtin(), &MigrateOptions::default()).unwrap_err();
    assert_eq!(err.code.as_str(), "migration.verification_failed");
    assert_eq!(err.details["failed"], 1);
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn discovered_config_extends_registry_and_extension() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        CONFIG_FILE_NAME,
        r#"{
            "extension": "gdx",
            "events": { "shop.item_bought": { "class": "ShopEvents.ItemBoughtEvent", "args": ["item", "price"] } }
        }"#,
    );
    write(dir.path(), "shop.gdx", "EventBus.shop.emit_event(\"item_bought\", [sword, 10])\n");
    write(dir.path(), "ignored.gd", PLAYER);

    let config = MigrateConfig::resolve(None, dir.path()).unwrap();
    let registry = config.build_registry().unwrap();
    let options = config.options().unwrap();

    let stats = run(dir.path(), &registry, &options).unwrap();

    assert_eq!(stats.files_processed, 1);
    assert_eq!(
        read(dir.path(), "shop.gdx"),
        "GlobalEventBus.shop.dispatch_event(ShopEvents.ItemBoughtEvent.new(sword, 10))\n"
    );
    assert_eq!(read(dir.path(), "ignored.gd"), PLAYER);
    assert!(stats.warnings.is_empty());
}
