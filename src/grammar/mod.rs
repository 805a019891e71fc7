//! Grammar sources and expansion.
//!
//! Bot scripts are Tracery-style grammars: a JSON object mapping symbol names to
//! one or more rules. Rules reference other symbols with `#symbol#`, optionally
//! followed by modifiers (`#animal.s.capitalize#`), and can push or pop rules
//! with actions (`[hero:#name#]`, `[hero:POP]`).
//!
//! ```json
//! {
//!   "origin": ["#greeting#, #animal.a# appears! {img https://example.com/#animal#.png}"],
//!   "greeting": ["Hello", "Good morning"],
//!   "animal": ["owl", "otter"]
//! }
//! ```
//!
//! Expansion is delegated to a [`GrammarEngine`]; [`TraceryEngine`] is the
//! built-in implementation.
//!
//! # Escapes
//!
//! `\#`, `\[`, `\]` and `\\` expand to the literal character. A backslash
//! before anything else is left alone, so media escapes such as `\{` survive
//! expansion untouched and are handled later by the media scanner.

mod modifiers;
mod tracery;

pub use tracery::TraceryEngine;

use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use strsim::levenshtein;
use thiserror::Error;

/// Maximum allowed Levenshtein distance as a percentage of the symbol length for suggestions.
const SIMILARITY_THRESHOLD_PERCENT: usize = 50;

/// Errors raised while loading or expanding a grammar.
///
/// Any of these fails the whole render; a post is never published from a
/// partially expanded template.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GrammarError {
    /// The script is not a JSON object of string rules
    #[error("invalid grammar source: {reason}")]
    InvalidSource {
        /// Why the source was rejected
        reason: String,
    },

    /// A rule referenced a symbol that is not defined
    #[error("unknown grammar symbol '{symbol}'{}", format_suggestions(.suggestions))]
    UnknownSymbol {
        /// The missing symbol
        symbol: String,
        /// Defined symbols with similar names
        suggestions: Vec<String>,
    },

    /// A rule could not be parsed
    #[error("syntax error in rule \"{rule}\": {reason}")]
    Syntax {
        /// The offending rule text
        rule: String,
        /// What is wrong with it
        reason: String,
    },

    /// Expansion nested deeper than the allowed limit
    #[error("expansion of '{symbol}' exceeded the nesting limit of {limit}")]
    RecursionLimit {
        /// Symbol being expanded when the limit was hit
        symbol: String,
        /// The limit
        limit: usize,
    },
}

fn format_suggestions(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!(" (did you mean: {}?)", suggestions.join(", "))
    }
}

/// A symbol's rules as written in JSON: a single string or a list.
#[derive(Deserialize)]
#[serde(untagged)]
enum RuleSet {
    One(String),
    Many(Vec<String>),
}

/// A parsed grammar.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateSource {
    symbols: BTreeMap<String, Vec<String>>,
}

impl TemplateSource {
    /// Parse a grammar from its JSON text.
    pub fn from_json(json: &str) -> Result<Self, GrammarError> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| GrammarError::InvalidSource {
                reason: e.to_string(),
            })?;
        Self::from_value(value)
    }

    /// Build a grammar from an already parsed JSON value.
    pub fn from_value(value: serde_json::Value) -> Result<Self, GrammarError> {
        if !value.is_object() {
            return Err(GrammarError::InvalidSource {
                reason: "expected a JSON object mapping symbols to rules".to_string(),
            });
        }

        let raw: BTreeMap<String, RuleSet> =
            serde_json::from_value(value).map_err(|e| GrammarError::InvalidSource {
                reason: format!("rules must be strings or lists of strings ({e})"),
            })?;

        let mut symbols = BTreeMap::new();
        for (name, rules) in raw {
            let rules = match rules {
                RuleSet::One(rule) => vec![rule],
                RuleSet::Many(rules) => rules,
            };
            if rules.is_empty() {
                return Err(GrammarError::InvalidSource {
                    reason: format!("symbol '{name}' has no rules"),
                });
            }
            symbols.insert(name, rules);
        }

        Ok(Self {
            symbols,
        })
    }

    /// Build a grammar directly from symbol/rule pairs.
    pub fn from_rules<I, S, R>(rules: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<R>)>,
        S: Into<String>,
        R: Into<String>,
    {
        Self {
            symbols: rules
                .into_iter()
                .map(|(name, rules)| (name.into(), rules.into_iter().map(Into::into).collect()))
                .collect(),
        }
    }

    #[must_use]
    pub fn rules(&self, symbol: &str) -> Option<&[String]> {
        self.symbols.get(symbol).map(Vec::as_slice)
    }

    #[must_use]
    pub fn has_symbol(&self, symbol: &str) -> bool {
        self.symbols.contains_key(symbol)
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.symbols.keys().map(String::as_str)
    }

    /// Symbols referenced by some rule but neither defined nor set by an action.
    ///
    /// This is a static check; nothing is expanded. Rules that fail to parse
    /// are skipped here and reported by [`TemplateSource::lint`].
    #[must_use]
    pub fn undefined_references(&self) -> Vec<String> {
        let mut referenced = BTreeSet::new();
        let mut assigned = BTreeSet::new();
        for rule in self.symbols.values().flatten() {
            tracery::collect_references(rule, &mut referenced, &mut assigned);
        }

        referenced
            .into_iter()
            .filter(|name| !self.symbols.contains_key(name) && !assigned.contains(name))
            .collect()
    }

    /// Every problem that would make expanding `start` fail or misbehave.
    ///
    /// Reports a missing start symbol, rules with syntax errors, and references
    /// to undefined symbols. An empty list means the grammar is well formed.
    #[must_use]
    pub fn lint(&self, start: &str) -> Vec<GrammarError> {
        let mut problems = Vec::new();
        if !self.has_symbol(start) {
            problems.push(GrammarError::UnknownSymbol {
                symbol: start.to_string(),
                suggestions: self.similar_symbols(start),
            });
        }
        for rule in self.symbols.values().flatten() {
            if let Err(e) = tracery::parse_rule(rule) {
                problems.push(e);
            }
        }
        for symbol in self.undefined_references() {
            problems.push(GrammarError::UnknownSymbol {
                suggestions: self.similar_symbols(&symbol),
                symbol,
            });
        }
        problems
    }

    /// Defined symbols whose names are close to `target`, closest first.
    #[must_use]
    pub fn similar_symbols(&self, target: &str) -> Vec<String> {
        let mut scored: Vec<_> =
            self.symbols.keys().map(|name| (name.clone(), levenshtein(target, name))).collect();

        scored.sort_by_key(|(_, dist)| *dist);

        scored
            .into_iter()
            .filter(|(_, dist)| *dist <= target.len() * SIMILARITY_THRESHOLD_PERCENT / 100)
            .take(3)
            .map(|(name, _)| name)
            .collect()
    }
}

/// Expands a start symbol of a grammar into text.
pub trait GrammarEngine: Send + Sync {
    fn expand(&self, source: &TemplateSource, start: &str) -> Result<String, GrammarError>;
}
