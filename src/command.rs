//! Command routing - classifies free-form transcripts into intents
//!
//! Classification walks an ordered rule table; the first rule whose keywords
//! appear in the lowercased transcript wins. Each rule is scoped to the reader
//! modes it applies in, so the same word can mean different things:
//! "continue" is `Next` while presenting but `ResumeFromCommandMode` in command
//! mode, and in lookup mode anything that is not the wake phrase or a cancel
//! phrase is query text.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::config::CommandsConfig;
use crate::wake::WakePhrase;

/// What the user asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent {
    StartAuto,
    SpeedUp,
    SlowDown,
    Next,
    Previous,
    Stop,
    Restart,
    ResumeFromCommandMode,
    EnterLookup,
    LookupCancel,
    None,
}

impl Intent {
    /// Parse the snake_case name used in config files
    pub fn from_name(name: &str) -> Option<Self> {
        let intent = match name {
            "start_auto" => Intent::StartAuto,
            "speed_up" => Intent::SpeedUp,
            "slow_down" => Intent::SlowDown,
            "next" => Intent::Next,
            "previous" => Intent::Previous,
            "stop" => Intent::Stop,
            "restart" => Intent::Restart,
            "resume" => Intent::ResumeFromCommandMode,
            "lookup" => Intent::EnterLookup,
            "lookup_cancel" => Intent::LookupCancel,
            _ => return None,
        };
        Some(intent)
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Intent::StartAuto => "start_auto",
            Intent::SpeedUp => "speed_up",
            Intent::SlowDown => "slow_down",
            Intent::Next => "next",
            Intent::Previous => "previous",
            Intent::Stop => "stop",
            Intent::Restart => "restart",
            Intent::ResumeFromCommandMode => "resume",
            Intent::EnterLookup => "lookup",
            Intent::LookupCancel => "lookup_cancel",
            Intent::None => "none",
        };
        f.write_str(name)
    }
}

/// Reader mode a transcript arrives in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Idle,
    Presenting,
    CommandMode,
    Lookup,
}

/// Modes a rule is consulted in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleScope {
    Always,
    /// Presentation vocabulary; also consulted while idle, where it is a no-op
    Presenting,
    CommandMode,
    Lookup,
}

impl RuleScope {
    fn applies(self, scope: Scope) -> bool {
        match self {
            RuleScope::Always => true,
            RuleScope::Presenting => matches!(scope, Scope::Presenting | Scope::Idle),
            RuleScope::CommandMode => scope == Scope::CommandMode,
            RuleScope::Lookup => scope == Scope::Lookup,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Matcher {
    Keywords(Vec<String>),
    Wake(WakePhrase),
}

impl Matcher {
    fn matches(&self, lower: &str) -> bool {
        match self {
            Matcher::Keywords(keywords) => keywords.iter().any(|k| lower.contains(k.as_str())),
            Matcher::Wake(wake) => wake.matches(lower),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Rule {
    pub intent: Intent,
    pub scope: RuleScope,
    pub matcher: Matcher,
}

/// Built-in keyword table in priority order. The wake rule is prepended by
/// [`CommandRouter::new`].
pub const DEFAULT_RULES: &[(Intent, RuleScope, &[&str])] = &[
    (
        Intent::LookupCancel,
        RuleScope::Lookup,
        &["cancel", "exit lookup", "continue reading", "resume reading"],
    ),
    (
        Intent::StartAuto,
        RuleScope::Presenting,
        &["auto", "play", "start reading"],
    ),
    (
        Intent::SpeedUp,
        RuleScope::Presenting,
        &["faster", "speed up", "go faster"],
    ),
    (
        Intent::SlowDown,
        RuleScope::Presenting,
        &["slower", "slow down", "go slower"],
    ),
    (Intent::Next, RuleScope::Presenting, &["next", "continue"]),
    (Intent::Previous, RuleScope::Presenting, &["previous", "back"]),
    (
        Intent::Stop,
        RuleScope::Presenting,
        &["stop", "exit", "pause", "transcribe"],
    ),
    (Intent::Restart, RuleScope::Presenting, &["restart"]),
    (
        Intent::ResumeFromCommandMode,
        RuleScope::CommandMode,
        &[
            "start text",
            "resume text",
            "continue text",
            "read text",
            "continue",
            "start",
        ],
    ),
];

/// A classified transcript
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub raw_text: String,
    pub intent: Intent,
    pub is_final: bool,
}

/// Ordered keyword classifier
#[derive(Debug, Clone)]
pub struct CommandRouter {
    rules: Vec<Rule>,
    wake: WakePhrase,
}

impl Default for CommandRouter {
    fn default() -> Self {
        Self::new(&CommandsConfig::default())
    }
}

impl CommandRouter {
    /// Build the rule table from config: wake rule first, then the built-in
    /// table with any extra keywords appended to their intent's rule
    pub fn new(config: &CommandsConfig) -> Self {
        let wake = WakePhrase::new(&config.wake_phrase, config.fuzzy_wake);
        let extra = extra_keywords(&config.extra);

        let mut rules = vec![Rule {
            intent: Intent::EnterLookup,
            scope: RuleScope::Always,
            matcher: Matcher::Wake(wake.clone()),
        }];

        rules.extend(DEFAULT_RULES.iter().map(|(intent, scope, keywords)| {
            let mut keywords: Vec<String> = keywords.iter().map(|k| k.to_string()).collect();
            if let Some(more) = extra.get(intent) {
                keywords.extend(more.iter().cloned());
            }
            Rule {
                intent: *intent,
                scope: *scope,
                matcher: Matcher::Keywords(keywords),
            }
        }));

        Self { rules, wake }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn wake(&self) -> &WakePhrase {
        &self.wake
    }

    /// First rule in scope whose matcher fires, or `Intent::None`
    pub fn classify(&self, text: &str, scope: Scope) -> Intent {
        let lower = text.to_lowercase();
        let lower = lower.trim();

        self.rules
            .iter()
            .filter(|rule| rule.scope.applies(scope))
            .find(|rule| rule.matcher.matches(lower))
            .map(|rule| rule.intent)
            .unwrap_or(Intent::None)
    }

    pub fn command(&self, text: &str, is_final: bool, scope: Scope) -> Command {
        Command {
            raw_text: text.to_string(),
            intent: self.classify(text, scope),
            is_final,
        }
    }
}

fn extra_keywords(extra: &BTreeMap<String, Vec<String>>) -> HashMap<Intent, Vec<String>> {
    let mut out: HashMap<Intent, Vec<String>> = HashMap::new();
    for (name, keywords) in extra {
        let Some(intent) = Intent::from_name(name) else {
            tracing::warn!(name = %name, "ignoring extra keywords for unknown intent");
            continue;
        };
        let keywords = keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty());
        out.entry(intent).or_default().extend(keywords);
    }
    out
}
