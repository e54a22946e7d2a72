//! Call-site rewrite rules.
//!
//! Each rule anchors on `EventBus.<namespace>.<legacy_method>(` and, when the
//! arguments have the expected shape and the event is registered, replaces
//! the whole call with its `GlobalEventBus` equivalent. Anything else is left
//! byte-for-byte unchanged and reported as a [`CallSiteWarning`].
//!
//! The typed method names never match a legacy pattern, so running a rule
//! over already-migrated text is a no-op.

use heck::ToUpperCamelCase;
use regex::Regex;
use serde::Serialize;

use super::args::{find_call_end, list_literal_inner, split_arguments, string_literal_value};
use super::registry::{EventDescriptor, EventRegistry};
use crate::error::{Error, Result};

/// Receiver of the legacy API.
pub const LEGACY_BUS: &str = "EventBus";
/// Receiver of the typed API.
pub const TYPED_BUS: &str = "GlobalEventBus";

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    Dispatch,
    Subscribe,
    Unsubscribe,
}

impl RuleKind {
    /// Fixed application order.
    pub const ALL: [RuleKind; 3] = [RuleKind::Dispatch, RuleKind::Subscribe, RuleKind::Unsubscribe];

    pub fn legacy_method(self) -> &'static str {
        match self {
            RuleKind::Dispatch => "emit_event",
            RuleKind::Subscribe => "connect_event",
            RuleKind::Unsubscribe => "disconnect_event",
        }
    }

    pub fn typed_method(self) -> &'static str {
        match self {
            RuleKind::Dispatch => "dispatch_event",
            RuleKind::Subscribe => "add_listener",
            RuleKind::Unsubscribe => "remove_listener",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RuleKind::Dispatch => "dispatch",
            RuleKind::Subscribe => "subscribe",
            RuleKind::Unsubscribe => "unsubscribe",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// `(namespace, event)` is not in the registry. Call left unchanged.
    UnmappedEvent,
    /// Registry entry's type is not `Group.Type`. Call left unchanged.
    MalformedQualifiedType,
    /// Anchored call whose arguments cannot be migrated. Call left unchanged.
    UnsupportedCall,
    /// Dispatch argument count differs from the descriptor. Call rewritten.
    ArityMismatch,
}

/// A non-fatal problem found at one call-site.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallSiteWarning {
    pub kind: WarningKind,
    pub rule: RuleKind,
    /// Path relative to the scan root. Empty until the driver attaches it.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub file: String,
    /// 1-indexed line of the call-site.
    pub line: usize,
    pub namespace: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl CallSiteWarning {
    /// Whether the call-site this warning refers to was left unmigrated.
    pub fn is_unresolved(&self) -> bool {
        self.kind != WarningKind::ArityMismatch
    }
}

/// One rewritten call-site.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Replacement {
    pub rule: RuleKind,
    pub line: usize,
    pub before: String,
    pub after: String,
}

/// Replacement counts per rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RuleCounts {
    pub dispatch: usize,
    pub subscribe: usize,
    pub unsubscribe: usize,
}

impl RuleCounts {
    pub fn add(&mut self, kind: RuleKind, n: usize) {
        match kind {
            RuleKind::Dispatch => self.dispatch += n,
            RuleKind::Subscribe => self.subscribe += n,
            RuleKind::Unsubscribe => self.unsubscribe += n,
        }
    }

    pub fn get(&self, kind: RuleKind) -> usize {
        match kind {
            RuleKind::Dispatch => self.dispatch,
            RuleKind::Subscribe => self.subscribe,
            RuleKind::Unsubscribe => self.unsubscribe,
        }
    }

    pub fn merge(&mut self, other: &RuleCounts) {
        for kind in RuleKind::ALL {
            self.add(kind, other.get(kind));
        }
    }

    pub fn total(&self) -> usize {
        self.dispatch + self.subscribe + self.unsubscribe
    }
}

/// Result of running one rule over a text.
#[derive(Debug, Clone)]
pub struct RuleOutcome {
    pub text: String,
    pub replacements: Vec<Replacement>,
    pub warnings: Vec<CallSiteWarning>,
}

/// In-memory result of rewriting one file's text with every rule.
#[derive(Debug, Clone)]
pub struct FileChange {
    pub original: String,
    pub rewritten: String,
    pub modified: bool,
    pub counts: RuleCounts,
    pub replacements: Vec<Replacement>,
    pub warnings: Vec<CallSiteWarning>,
}

// ============================================================================
// Rules
// ============================================================================

/// A single anchored rewrite rule.
#[derive(Debug, Clone)]
pub struct RewriteRule {
    kind: RuleKind,
    pattern: Regex,
}

impl RewriteRule {
    pub fn new(kind: RuleKind) -> Result<Self> {
        let source = format!(
            r"\b{}\.([A-Za-z_][A-Za-z0-9_]*)\.{}\s*\(",
            regex::escape(LEGACY_BUS),
            regex::escape(kind.legacy_method())
        );
        let pattern = Regex::new(&source).map_err(|e| {
            Error::internal_unexpected(format!("invalid {} pattern: {}", kind.label(), e))
        })?;
        Ok(Self { kind, pattern })
    }

    pub fn kind(&self) -> RuleKind {
        self.kind
    }

    /// Find and replace every call-site of this rule in `text`.
    ///
    /// Calls of the same rule nested inside another call's arguments are
    /// rewritten in the same pass, so a second pass never finds more work.
    pub fn apply(&self, text: &str, registry: &EventRegistry) -> RuleOutcome {
        let mut out = String::with_capacity(text.len());
        let mut replacements = Vec::new();
        let mut warnings = Vec::new();
        let mut cursor = 0;
        let mut scanned = 0;
        let mut lines = LineTracker::default();

        for caps in self.pattern.captures_iter(text) {
            let Some(head) = caps.get(0) else { continue };
            // Inside a call whose arguments were already handled.
            if head.start() < scanned {
                continue;
            }

            let namespace = &caps[1];
            let line = lines.line_at(text, head.start());
            let open = head.end() - 1;

            let Some(close) = find_call_end(text, open) else {
                warnings.push(self.warning(
                    WarningKind::UnsupportedCall,
                    line,
                    namespace,
                    None,
                    "call does not close on the same line or has unbalanced brackets".to_string(),
                ));
                continue;
            };
            scanned = close + 1;

            // Calls close on the line they open, so nested sites share `line`.
            let inner = self.apply(&text[open + 1..close], registry);
            replacements.extend(inner.replacements.into_iter().map(|r| Replacement { line, ..r }));
            warnings.extend(inner.warnings.into_iter().map(|w| CallSiteWarning { line, ..w }));
            let nested_changed = inner.text != text[open + 1..close];

            let site = CallSite {
                namespace,
                args: split_arguments(&inner.text),
                line,
            };

            match self.render(&site, registry, &mut warnings) {
                Some(after) => {
                    out.push_str(&text[cursor..head.start()]);
                    out.push_str(&after);
                    replacements.push(Replacement {
                        rule: self.kind,
                        line,
                        before: text[head.start()..=close].to_string(),
                        after,
                    });
                    cursor = close + 1;
                }
                None if nested_changed => {
                    out.push_str(&text[cursor..=open]);
                    out.push_str(&inner.text);
                    out.push(')');
                    cursor = close + 1;
                }
                None => {}
            }
        }

        out.push_str(&text[cursor..]);

        RuleOutcome {
            text: out,
            replacements,
            warnings,
        }
    }

    fn render(
        &self,
        site: &CallSite<'_>,
        registry: &EventRegistry,
        warnings: &mut Vec<CallSiteWarning>,
    ) -> Option<String> {
        let Some(literal) = site.args.first() else {
            warnings.push(self.unsupported(site, None, "call has no event name argument"));
            return None;
        };
        let Some(event) = string_literal_value(literal) else {
            warnings.push(self.unsupported(site, None, "event name is not a string literal"));
            return None;
        };

        match self.kind {
            RuleKind::Dispatch => self.render_dispatch(site, event, registry, warnings),
            RuleKind::Subscribe | RuleKind::Unsubscribe => {
                if site.args.len() != 2 {
                    warnings.push(self.unsupported(
                        site,
                        Some(event),
                        &format!("expected an event name and one callback, found {} argument(s)", site.args.len()),
                    ));
                    return None;
                }
                lookup(registry, site, event, self.kind, warnings)?;
                Some(format!(
                    "{}.{}.{}({}, {})",
                    TYPED_BUS,
                    site.namespace,
                    self.kind.typed_method(),
                    literal,
                    site.args[1]
                ))
            }
        }
    }

    fn render_dispatch(
        &self,
        site: &CallSite<'_>,
        event: &str,
        registry: &EventRegistry,
        warnings: &mut Vec<CallSiteWarning>,
    ) -> Option<String> {
        let payload = match site.args.len() {
            1 => "",
            2 => match list_literal_inner(&site.args[1]) {
                Some(inner) => inner,
                None => {
                    warnings.push(self.unsupported(
                        site,
                        Some(event),
                        "event arguments are not a bracketed list",
                    ));
                    return None;
                }
            },
            n => {
                warnings.push(self.unsupported(
                    site,
                    Some(event),
                    &format!("expected at most 2 arguments, found {}", n),
                ));
                return None;
            }
        };

        let descriptor = lookup(registry, site, event, self.kind, warnings)?;

        let Some((group, type_name)) = descriptor.type_parts() else {
            warnings.push(self.warning(
                WarningKind::MalformedQualifiedType,
                site.line,
                site.namespace,
                Some(event),
                format!(
                    "mapping for {}.{} has invalid type '{}' (expected Group.Type)",
                    site.namespace, event, descriptor.qualified_type
                ),
            ));
            return None;
        };

        let values = split_arguments(payload);
        if values.len() != descriptor.parameter_names.len() {
            warnings.push(self.warning(
                WarningKind::ArityMismatch,
                site.line,
                site.namespace,
                Some(event),
                format!(
                    "{} expects {} argument(s) ({}), call passes {}",
                    descriptor.qualified_type,
                    descriptor.parameter_names.len(),
                    descriptor.parameter_names.join(", "),
                    values.len()
                ),
            ));
        }

        Some(format!(
            "{}.{}.{}({}.{}.new({}))",
            TYPED_BUS,
            site.namespace,
            self.kind.typed_method(),
            group,
            type_name,
            values.join(", ")
        ))
    }

    fn unsupported(&self, site: &CallSite<'_>, event: Option<&str>, message: &str) -> CallSiteWarning {
        self.warning(
            WarningKind::UnsupportedCall,
            site.line,
            site.namespace,
            event,
            message.to_string(),
        )
    }

    fn warning(
        &self,
        kind: WarningKind,
        line: usize,
        namespace: &str,
        event: Option<&str>,
        message: String,
    ) -> CallSiteWarning {
        CallSiteWarning {
            kind,
            rule: self.kind,
            file: String::new(),
            line,
            namespace: namespace.to_string(),
            event: event.map(str::to_string),
            message,
            hint: None,
        }
    }
}

struct CallSite<'a> {
    namespace: &'a str,
    args: Vec<String>,
    line: usize,
}

fn lookup<'r>(
    registry: &'r EventRegistry,
    site: &CallSite<'_>,
    event: &str,
    rule: RuleKind,
    warnings: &mut Vec<CallSiteWarning>,
) -> Option<&'r EventDescriptor> {
    let found = registry.lookup(site.namespace, event);
    if found.is_none() {
        warnings.push(CallSiteWarning {
            kind: WarningKind::UnmappedEvent,
            rule,
            file: String::new(),
            line: site.line,
            namespace: site.namespace.to_string(),
            event: Some(event.to_string()),
            message: format!("no mapping for event {}.{}", site.namespace, event),
            hint: Some(suggest_mapping(site.namespace, event)),
        });
    }
    found
}

/// Suggested config entry following the `<Namespace>Events.<Name>Event` convention.
pub fn suggest_mapping(namespace: &str, event: &str) -> String {
    format!(
        "add \"{}.{}\": {{ \"class\": \"{}Events.{}Event\" }} to the events table",
        namespace,
        event,
        namespace.to_upper_camel_case(),
        event.to_upper_camel_case()
    )
}

/// 1-indexed line lookup for increasing offsets, scanning each byte once.
#[derive(Default)]
struct LineTracker {
    offset: usize,
    newlines: usize,
}

impl LineTracker {
    fn line_at(&mut self, text: &str, offset: usize) -> usize {
        if offset < self.offset {
            self.offset = 0;
            self.newlines = 0;
        }
        self.newlines += text[self.offset..offset].bytes().filter(|b| *b == b'\n').count();
        self.offset = offset;
        self.newlines + 1
    }
}

// ============================================================================
// Rewriter
// ============================================================================

/// All rules, applied in fixed order (dispatch, subscribe, unsubscribe).
#[derive(Debug, Clone)]
pub struct Rewriter {
    rules: Vec<RewriteRule>,
}

impl Rewriter {
    pub fn new() -> Result<Self> {
        let rules = RuleKind::ALL
            .iter()
            .map(|kind| RewriteRule::new(*kind))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    pub fn rules(&self) -> &[RewriteRule] {
        &self.rules
    }

    /// Run every rule over `text`, each on the previous rule's output.
    pub fn rewrite(&self, text: &str, registry: &EventRegistry) -> FileChange {
        let mut current = text.to_string();
        let mut counts = RuleCounts::default();
        let mut replacements = Vec::new();
        let mut warnings = Vec::new();

        for rule in &self.rules {
            let outcome = rule.apply(&current, registry);
            counts.add(rule.kind(), outcome.replacements.len());
            replacements.extend(outcome.replacements);
            warnings.extend(outcome.warnings);
            current = outcome.text;
        }

        FileChange {
            modified: current != text,
            original: text.to_string(),
            rewritten: current,
            counts,
            replacements,
            warnings,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
