//! Event registry: maps legacy `(namespace, event_name)` pairs to the typed
//! event class that replaces them.
//!
//! The registry is built once (built-in table plus config overrides) and then
//! only read. Lookups are exact and case-sensitive; there is no fallback.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ============================================================================
// Types
// ============================================================================

/// Destination shape for one legacy event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventDescriptor {
    pub namespace: String,
    pub event_name: String,
    /// Dotted `EventGroup.EventType` name of the constructor to call.
    pub qualified_type: String,
    /// Constructor parameter names. Call-site arguments are passed through
    /// positionally; these are only used to validate arity.
    pub parameter_names: Vec<String>,
}

impl EventDescriptor {
    pub fn new(
        namespace: impl Into<String>,
        event_name: impl Into<String>,
        qualified_type: impl Into<String>,
        parameter_names: Vec<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            event_name: event_name.into(),
            qualified_type: qualified_type.into(),
            parameter_names,
        }
    }

    /// `namespace.event_name`, the key format used by mapping tables.
    pub fn key(&self) -> String {
        format!("{}.{}", self.namespace, self.event_name)
    }

    /// Split the qualified type into `(event_group, event_type)`.
    ///
    /// Returns `None` unless the name has exactly two non-empty dotted parts.
    pub fn type_parts(&self) -> Option<(&str, &str)> {
        let (group, name) = self.qualified_type.split_once('.')?;
        if group.is_empty() || name.is_empty() || name.contains('.') {
            return None;
        }
        Some((group, name))
    }
}

/// One mapping-table entry as written in config files.
///
/// ```json
/// "game.game_started": { "class": "GameEvents.GameStartedEvent", "args": ["difficulty_level"] }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMapping {
    pub class: String,
    #[serde(default)]
    pub args: Vec<String>,
}

/// Immutable lookup table keyed by `(namespace, event_name)`.
#[derive(Debug, Clone, Default)]
pub struct EventRegistry {
    by_namespace: HashMap<String, HashMap<String, EventDescriptor>>,
    len: usize,
}

impl EventRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in mapping table.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for (key, class, args) in BUILTIN_EVENTS {
            // Built-in keys are static and always well-formed.
            if let Some((namespace, event_name)) = key.split_once('.') {
                registry.insert(EventDescriptor::new(
                    namespace,
                    event_name,
                    *class,
                    args.iter().map(|a| a.to_string()).collect(),
                ));
            }
        }
        registry
    }

    /// Build a registry from a mapping table keyed `namespace.event_name`.
    pub fn from_mappings(mappings: &BTreeMap<String, EventMapping>) -> Result<Self> {
        let mut registry = Self::new();
        registry.extend_from_mappings(mappings)?;
        Ok(registry)
    }

    /// Add (or override) entries from a mapping table.
    pub fn extend_from_mappings(&mut self, mappings: &BTreeMap<String, EventMapping>) -> Result<()> {
        for (key, mapping) in mappings {
            let (namespace, event_name) = parse_key(key)?;
            self.insert(EventDescriptor::new(
                namespace,
                event_name,
                mapping.class.clone(),
                mapping.args.clone(),
            ));
        }
        Ok(())
    }

    /// Insert a descriptor, returning the one it replaced.
    pub fn insert(&mut self, descriptor: EventDescriptor) -> Option<EventDescriptor> {
        let previous = self
            .by_namespace
            .entry(descriptor.namespace.clone())
            .or_default()
            .insert(descriptor.event_name.clone(), descriptor);
        if previous.is_none() {
            self.len += 1;
        }
        previous
    }

    /// Exact, case-sensitive lookup.
    pub fn lookup(&self, namespace: &str, event_name: &str) -> Option<&EventDescriptor> {
        self.by_namespace.get(namespace)?.get(event_name)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// All descriptors sorted by `(namespace, event_name)`.
    pub fn descriptors(&self) -> Vec<&EventDescriptor> {
        let mut all: Vec<&EventDescriptor> = self
            .by_namespace
            .values()
            .flat_map(|events| events.values())
            .collect();
        all.sort_by(|a, b| {
            (a.namespace.as_str(), a.event_name.as_str())
                .cmp(&(b.namespace.as_str(), b.event_name.as_str()))
        });
        all
    }

    /// Descriptors whose qualified type does not split into two parts.
    pub fn malformed(&self) -> Vec<&EventDescriptor> {
        self.descriptors()
            .into_iter()
            .filter(|d| d.type_parts().is_none())
            .collect()
    }
}

fn parse_key(key: &str) -> Result<(&str, &str)> {
    match key.split_once('.') {
        Some((namespace, event_name))
            if !namespace.is_empty() && !event_name.is_empty() && !event_name.contains('.') =>
        {
            Ok((namespace, event_name))
        }
        _ => Err(Error::config_invalid_value(
            "events",
            Some(key.to_string()),
            "Event keys must look like 'namespace.event_name'",
        )),
    }
}

// ============================================================================
// Built-in mapping table
// ============================================================================

type BuiltinEntry = (&'static str, &'static str, &'static [&'static str]);

const BUILTIN_EVENTS: &[BuiltinEntry] = &[
    // game
    ("game.game_state_changed", "GameEvents.GameStateChangedEvent", &["old_state", "new_state"]),
    ("game.game_paused", "GameEvents.GamePausedEvent", &["is_paused"]),
    ("game.game_started", "GameEvents.GameStartedEvent", &["difficulty_level"]),
    ("game.game_ended", "GameEvents.GameEndedEvent", &["is_victory", "play_time", "score"]),
    ("game.player_health_changed", "GameEvents.PlayerHealthChangedEvent", &["old_health", "new_health", "max_health"]),
    ("game.player_level_changed", "GameEvents.PlayerLevelChangedEvent", &["old_level", "new_level"]),
    ("game.player_died", "GameEvents.PlayerDiedEvent", &[]),
    ("game.difficulty_changed", "GameEvents.DifficultyChangedEvent", &["old_level", "new_level"]),
    // battle
    ("battle.battle_started", "BattleEvents.BattleStartedEvent", &["battle_id", "round", "player_pieces", "enemy_pieces"]),
    ("battle.battle_ended", "BattleEvents.BattleEndedEvent", &["battle_id", "is_victory", "duration", "remaining_pieces"]),
    ("battle.round_started", "BattleEvents.RoundStartedEvent", &["round"]),
    ("battle.round_ended", "BattleEvents.RoundEndedEvent", &["round"]),
    ("battle.damage_dealt", "BattleEvents.DamageDealtEvent", &["source_entity", "target_entity", "amount", "damage_type", "is_critical"]),
    ("battle.heal_received", "BattleEvents.HealReceivedEvent", &["source_entity", "target_entity", "amount"]),
    ("battle.unit_died", "BattleEvents.UnitDiedEvent", &["unit", "killer"]),
    ("battle.ability_used", "BattleEvents.AbilityUsedEvent", &["caster", "ability_data", "targets"]),
    // chess
    ("chess.chess_piece_created", "ChessEvents.ChessPieceCreatedEvent", &["piece"]),
    ("chess.chess_piece_upgraded", "ChessEvents.ChessPieceUpgradedEvent", &["piece", "old_level", "new_level"]),
    ("chess.chess_piece_sold", "ChessEvents.ChessPieceSoldEvent", &["piece", "gold_amount"]),
    ("chess.chess_piece_moved", "ChessEvents.ChessPieceMovedEvent", &["piece", "from_position", "to_position"]),
    ("chess.chess_piece_target_changed", "ChessEvents.ChessPieceTargetChangedEvent", &["piece", "old_target", "new_target"]),
    ("chess.chess_piece_target_lost", "ChessEvents.ChessPieceTargetLostEvent", &["piece", "old_target"]),
    ("chess.chess_piece_damaged", "ChessEvents.ChessPieceDamagedEvent", &["piece", "source", "amount", "damage_type", "is_critical"]),
    ("chess.chess_piece_healed", "ChessEvents.ChessPieceHealedEvent", &["piece", "source", "amount"]),
    ("chess.chess_piece_dodged", "ChessEvents.ChessPieceDodgedEvent", &["piece", "source"]),
    // ui
    ("ui.update_ui", "UIEvents.UIUpdateEvent", &["component", "data"]),
    ("ui.button_clicked", "UIEvents.ButtonClickedEvent", &["button_id", "button_text", "button_data"]),
    ("ui.menu_opened", "UIEvents.MenuOpenedEvent", &["menu_id", "menu_data"]),
    ("ui.menu_closed", "UIEvents.MenuClosedEvent", &["menu_id"]),
    ("ui.dialog_shown", "UIEvents.DialogShownEvent", &["dialog_id", "title", "content", "options"]),
    ("ui.show_toast", "UIEvents.ToastShownEvent", &["title", "message", "type", "duration"]),
    // debug
    ("debug.debug_message", "DebugEvents.DebugMessageEvent", &["message", "level", "tag"]),
    ("debug.command_executed", "DebugEvents.DebugCommandExecutedEvent", &["command", "args", "result"]),
    ("debug.console_toggled", "DebugEvents.DebugConsoleToggledEvent", &["visible"]),
    ("debug.performance_warning", "DebugEvents.PerformanceWarningEvent", &["warning_type", "details"]),
];

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_lookup_hits() {
        let registry = EventRegistry::builtin();
        let desc = registry.lookup("game", "game_started").unwrap();
        assert_eq!(desc.qualified_type, "GameEvents.GameStartedEvent");
        assert_eq!(desc.parameter_names, vec!["difficulty_level"]);
        assert_eq!(desc.type_parts(), Some(("GameEvents", "GameStartedEvent")));
    }

    #[test]
    fn builtin_table_has_unique_keys() {
        let registry = EventRegistry::builtin();
        assert_eq!(registry.len(), BUILTIN_EVENTS.len());
        assert!(registry.malformed().is_empty());
    }

    #[test]
    fn lookup_is_exact_and_case_sensitive() {
        let registry = EventRegistry::builtin();
        assert!(registry.lookup("Game", "game_started").is_none());
        assert!(registry.lookup("game", "GAME_STARTED").is_none());
        assert!(registry.lookup("game", "game_start").is_none());
        assert!(registry.lookup("foo", "bar_baz").is_none());
    }

    #[test]
    fn same_event_name_in_different_namespaces_is_distinct() {
        let mut registry = EventRegistry::new();
        registry.insert(EventDescriptor::new("a", "tick", "A.Tick", vec![]));
        registry.insert(EventDescriptor::new("b", "tick", "B.Tick", vec![]));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.lookup("a", "tick").unwrap().qualified_type, "A.Tick");
        assert_eq!(registry.lookup("b", "tick").unwrap().qualified_type, "B.Tick");
    }

    #[test]
    fn insert_overrides_without_growing() {
        let mut registry = EventRegistry::builtin();
        let before = registry.len();
        let previous = registry.insert(EventDescriptor::new(
            "game",
            "game_started",
            "MatchEvents.MatchStartedEvent",
            vec![],
        ));

        assert!(previous.is_some());
        assert_eq!(registry.len(), before);
        assert_eq!(
            registry.lookup("game", "game_started").unwrap().qualified_type,
            "MatchEvents.MatchStartedEvent"
        );
    }

    #[test]
    fn type_parts_rejects_malformed_names() {
        let desc = |t: &str| EventDescriptor::new("ns", "ev", t, vec![]);
        assert!(desc("GameStartedEvent").type_parts().is_none());
        assert!(desc("A.B.C").type_parts().is_none());
        assert!(desc(".Event").type_parts().is_none());
        assert!(desc("Group.").type_parts().is_none());
    }

    #[test]
    fn from_mappings_parses_keys() {
        let mut mappings = BTreeMap::new();
        mappings.insert(
            "shop.item_bought".to_string(),
            EventMapping {
                class: "ShopEvents.ItemBoughtEvent".to_string(),
                args: vec!["item".to_string(), "price".to_string()],
            },
        );

        let registry = EventRegistry::from_mappings(&mappings).unwrap();
        let desc = registry.lookup("shop", "item_bought").unwrap();
        assert_eq!(desc.key(), "shop.item_bought");
        assert_eq!(desc.parameter_names.len(), 2);
    }

    #[test]
    fn from_mappings_rejects_bad_keys() {
        for key in ["no_namespace", ".event", "ns.", "a.b.c"] {
            let mut mappings = BTreeMap::new();
            mappings.insert(
                key.to_string(),
                EventMapping {
                    class: "X.Y".to_string(),
                    args: vec![],
                },
            );
            let err = EventRegistry::from_mappings(&mappings).unwrap_err();
            assert_eq!(err.code.as_str(), "config.invalid_value", "key {}", key);
        }
    }

    #[test]
    fn malformed_lists_bad_types() {
        let mut registry = EventRegistry::new();
        registry.insert(EventDescriptor::new("ns", "good", "G.Good", vec![]));
        registry.insert(EventDescriptor::new("ns", "bad", "Bad", vec![]));

        let malformed = registry.malformed();
        assert_eq!(malformed.len(), 1);
        assert_eq!(malformed[0].event_name, "bad");
    }
}
