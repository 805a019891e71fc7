//! Tracery-compatible grammar expansion.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;

use super::modifiers::apply_modifier;
use super::{GrammarEngine, GrammarError, TemplateSource};
use crate::constants::MAX_EXPANSION_DEPTH;

/// One piece of a parsed rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Section {
    /// Literal text, escapes already resolved
    Text(String),
    /// Contents of a `#...#` tag
    Tag(String),
    /// Contents of a top-level `[...]` action
    Action(String),
}

/// A tag split into its parts: `#[a:b][c:POP]symbol.mod1.mod2#`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TagParts {
    pub actions: Vec<String>,
    pub symbol: String,
    pub modifiers: Vec<String>,
}

/// A parsed `[target:rules]` action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Action {
    Push { target: String, rules: Vec<String> },
    Pop { target: String },
}

fn syntax(rule: &str, reason: impl Into<String>) -> GrammarError {
    GrammarError::Syntax {
        rule: rule.to_string(),
        reason: reason.into(),
    }
}

/// Split a rule into text, tag and action sections.
///
/// Inside tags and actions the raw text (escapes included) is preserved, since
/// it is parsed again when the tag or action is evaluated.
pub(crate) fn parse_rule(rule: &str) -> Result<Vec<Section>, GrammarError> {
    let mut sections = Vec::new();
    let mut buf = String::new();
    let mut depth = 0usize;
    let mut in_tag = false;
    let mut chars = rule.chars();

    while let Some(c) = chars.next() {
        let top_level = depth == 0 && !in_tag;
        match c {
            '\\' => {
                let next = chars.next();
                match next {
                    Some(n @ ('#' | '[' | ']' | '\\')) if top_level => buf.push(n),
                    Some(n) => {
                        buf.push('\\');
                        buf.push(n);
                    }
                    None => buf.push('\\'),
                }
            }
            '[' => {
                if top_level {
                    if !buf.is_empty() {
                        sections.push(Section::Text(std::mem::take(&mut buf)));
                    }
                } else {
                    buf.push('[');
                }
                depth += 1;
            }
            ']' => {
                if depth == 0 {
                    return Err(syntax(rule, "unmatched ']'"));
                }
                depth -= 1;
                if depth == 0 && !in_tag {
                    sections.push(Section::Action(std::mem::take(&mut buf)));
                } else {
                    buf.push(']');
                }
            }
            '#' if depth == 0 => {
                if in_tag {
                    sections.push(Section::Tag(std::mem::take(&mut buf)));
                } else if !buf.is_empty() {
                    sections.push(Section::Text(std::mem::take(&mut buf)));
                }
                in_tag = !in_tag;
            }
            _ => buf.push(c),
        }
    }

    if in_tag {
        return Err(syntax(rule, "unterminated '#' tag"));
    }
    if depth > 0 {
        return Err(syntax(rule, "unterminated '[' action"));
    }
    if !buf.is_empty() {
        sections.push(Section::Text(buf));
    }
    Ok(sections)
}

/// Split a tag body into leading actions, the symbol and its modifiers.
pub(crate) fn parse_tag(tag: &str) -> Result<TagParts, GrammarError> {
    let mut actions = Vec::new();
    let mut rest = tag;

    while rest.starts_with('[') {
        let mut depth = 0usize;
        let mut escaped = false;
        let mut end = None;
        for (i, c) in rest.char_indices() {
            if escaped {
                escaped = false;
                continue;
            }
            match c {
                '\\' => escaped = true,
                '[' => depth += 1,
                ']' => {
                    depth -= 1;
                    if depth == 0 {
                        end = Some(i);
                        break;
                    }
                }
                _ => {}
            }
        }
        let end = end.ok_or_else(|| syntax(tag, "unterminated '[' action in tag"))?;
        actions.push(rest[1..end].to_string());
        rest = &rest[end + 1..];
    }

    let mut parts = split_modifiers(rest).into_iter();
    let symbol = parts.next().unwrap_or_default().trim().to_string();
    Ok(TagParts {
        actions,
        symbol,
        modifiers: parts.collect(),
    })
}

/// Split `symbol.mod1.mod2(a,b)` on dots outside parentheses.
fn split_modifiers(s: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut parens = 0usize;
    for c in s.chars() {
        match c {
            '(' => {
                parens += 1;
                current.push(c);
            }
            ')' => {
                parens = parens.saturating_sub(1);
                current.push(c);
            }
            '.' if parens == 0 => parts.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    parts.push(current);
    parts
}

/// Parse an action body such as `hero:#name#,#other#` or `hero:POP`.
pub(crate) fn parse_action(body: &str) -> Result<Action, GrammarError> {
    let (target, rules) = body
        .split_once(':')
        .ok_or_else(|| syntax(body, "action must have the form [name:rule]"))?;
    let target = target.trim().to_string();
    if target.is_empty() {
        return Err(syntax(body, "action has no target symbol"));
    }
    if rules == "POP" {
        return Ok(Action::Pop {
            target,
        });
    }
    Ok(Action::Push {
        target,
        rules: split_top_level_commas(rules),
    })
}

/// Split on commas that are not inside a tag or a nested action.
fn split_top_level_commas(s: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut in_tag = false;
    let mut escaped = false;
    for c in s.chars() {
        if escaped {
            escaped = false;
            current.push(c);
            continue;
        }
        match c {
            '\\' => {
                escaped = true;
                current.push(c);
            }
            '[' => {
                depth += 1;
                current.push(c);
            }
            ']' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            '#' if depth == 0 => {
                in_tag = !in_tag;
                current.push(c);
            }
            ',' if depth == 0 && !in_tag => parts.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    parts.push(current);
    parts
}

/// Record symbols referenced by `rule` and symbols assigned by its actions.
pub(crate) fn collect_references(
    rule: &str,
    referenced: &mut BTreeSet<String>,
    assigned: &mut BTreeSet<String>,
) {
    let Ok(sections) = parse_rule(rule) else {
        return;
    };
    for section in sections {
        match section {
            Section::Text(_) => {}
            Section::Action(body) => collect_action(&body, referenced, assigned),
            Section::Tag(tag) => {
                let Ok(parts) = parse_tag(&tag) else {
                    continue;
                };
                for body in &parts.actions {
                    collect_action(body, referenced, assigned);
                }
                if !parts.symbol.is_empty() {
                    referenced.insert(parts.symbol);
                }
            }
        }
    }
}

fn collect_action(body: &str, referenced: &mut BTreeSet<String>, assigned: &mut BTreeSet<String>) {
    if let Ok(Action::Push {
        target,
        rules,
    }) = parse_action(body)
    {
        assigned.insert(target);
        for rule in &rules {
            collect_references(rule, referenced, assigned);
        }
    }
}

/// Per-expansion state: rules pushed by actions, layered over the grammar.
struct Expansion<'a> {
    source: &'a TemplateSource,
    pushed: HashMap<String, Vec<Vec<String>>>,
    rng: &'a mut StdRng,
}

impl Expansion<'_> {
    fn rules_for(&self, symbol: &str) -> Option<&[String]> {
        self.pushed
            .get(symbol)
            .and_then(|stack| stack.last())
            .map(Vec::as_slice)
            .or_else(|| self.source.rules(symbol))
    }

    fn expand_symbol(&mut self, symbol: &str, depth: usize) -> Result<String, GrammarError> {
        if depth > MAX_EXPANSION_DEPTH {
            return Err(GrammarError::RecursionLimit {
                symbol: symbol.to_string(),
                limit: MAX_EXPANSION_DEPTH,
            });
        }

        let count = self.rules_for(symbol).map_or(0, <[String]>::len);
        if count == 0 {
            return Err(GrammarError::UnknownSymbol {
                symbol: symbol.to_string(),
                suggestions: self.source.similar_symbols(symbol),
            });
        }

        let pick = self.rng.gen_range(0..count);
        let rule = self.rules_for(symbol).map(|rules| rules[pick].clone()).unwrap_or_default();
        self.expand_rule(&rule, depth + 1)
    }

    fn expand_rule(&mut self, rule: &str, depth: usize) -> Result<String, GrammarError> {
        let mut out = String::new();
        for section in parse_rule(rule)? {
            match section {
                Section::Text(text) => out.push_str(&text),
                Section::Action(body) => {
                    self.run_action(&body, depth)?;
                }
                Section::Tag(tag) => out.push_str(&self.expand_tag(&tag, depth)?),
            }
        }
        Ok(out)
    }

    fn expand_tag(&mut self, tag: &str, depth: usize) -> Result<String, GrammarError> {
        let parts = parse_tag(tag)?;

        // Pushes made by a tag's own actions only last for that tag.
        let mut scoped = Vec::new();
        for body in &parts.actions {
            if let Some(target) = self.run_action(body, depth)? {
                scoped.push(target);
            }
        }

        let result = if parts.symbol.is_empty() {
            Ok(String::new())
        } else {
            self.expand_symbol(&parts.symbol, depth).map(|expanded| {
                parts.modifiers.iter().fold(expanded, |text, modifier| apply_modifier(modifier, &text))
            })
        };

        for target in scoped {
            self.pop(&target);
        }
        result
    }

    /// Run an action; returns the target when a rule was pushed.
    fn run_action(&mut self, body: &str, depth: usize) -> Result<Option<String>, GrammarError> {
        match parse_action(body)? {
            Action::Pop {
                target,
            } => {
                self.pop(&target);
                Ok(None)
            }
            Action::Push {
                target,
                rules,
            } => {
                let expanded = rules
                    .iter()
                    .map(|rule| self.expand_rule(rule, depth + 1))
                    .collect::<Result<Vec<_>, _>>()?;
                self.pushed.entry(target.clone()).or_default().push(expanded);
                Ok(Some(target))
            }
        }
    }

    fn pop(&mut self, target: &str) {
        if let Some(stack) = self.pushed.get_mut(target) {
            stack.pop();
        }
    }
}

/// Random-choice grammar engine with Tracery semantics.
///
/// Each expansion picks uniformly among a symbol's rules. Seed the engine for
/// reproducible output.
pub struct TraceryEngine {
    rng: Mutex<StdRng>,
}

impl TraceryEngine {
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for TraceryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TraceryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TraceryEngine").finish_non_exhaustive()
    }
}

impl GrammarEngine for TraceryEngine {
    fn expand(&self, source: &TemplateSource, start: &str) -> Result<String, GrammarError> {
        let mut rng = self.rng.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut expansion = Expansion {
            source,
            pushed: HashMap::new(),
            rng: &mut rng,
        };
        expansion.expand_symbol(start, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grammar(rules: &[(&str, &[&str])]) -> TemplateSource {
        TemplateSource::from_rules(rules.iter().map(|(name, rules)| (*name, rules.to_vec())))
    }

    fn expand(source: &TemplateSource) -> Result<String, GrammarError> {
        TraceryEngine::seeded(7).expand(source, "origin")
    }

    #[test]
    fn test_parse_rule_sections() {
        assert_eq!(
            parse_rule("Hi #name#[x:y]!").unwrap(),
            vec![
                Section::Text("Hi ".to_string()),
                Section::Tag("name".to_string()),
                Section::Action("x:y".to_string()),
                Section::Text("!".to_string()),
            ]
        );
        assert_eq!(
            parse_rule("#[hero:#name#]story#").unwrap(),
            vec![Section::Tag("[hero:#name#]story".to_string())]
        );
    }

    #[test]
    fn test_parse_rule_errors() {
        assert!(matches!(parse_rule("#open"), Err(GrammarError::Syntax { .. })));
        assert!(matches!(parse_rule("[x:y"), Err(GrammarError::Syntax { .. })));
        assert!(matches!(parse_rule("x]"), Err(GrammarError::Syntax { .. })));
    }

    #[test]
    fn test_parse_tag_parts() {
        let parts = parse_tag("[a:b][c:POP]animal.s.replace(a,b)").unwrap();
        assert_eq!(parts.actions, vec!["a:b", "c:POP"]);
        assert_eq!(parts.symbol, "animal");
        assert_eq!(parts.modifiers, vec!["s", "replace(a,b)"]);
    }

    #[test]
    fn test_expands_nested_symbols() {
        let source = grammar(&[
            ("origin", &["#greeting#, #name#!"]),
            ("greeting", &["Hello"]),
            ("name", &["#first# #last#"]),
            ("first", &["Ada"]),
            ("last", &["Lovelace"]),
        ]);
        assert_eq!(expand(&source).unwrap(), "Hello, Ada Lovelace!");
    }

    #[test]
    fn test_modifiers_apply_in_order() {
        let source = grammar(&[("origin", &["#animal.s.capitalize# and #animal.a#"]), ("animal", &["owl"])]);
        assert_eq!(expand(&source).unwrap(), "Owls and an owl");
    }

    #[test]
    fn test_actions_push_and_scope() {
        let source = grammar(&[
            ("origin", &["#[hero:#name#]story# / #hero#"]),
            ("story", &["#hero# meets #hero#"]),
            ("name", &["Ada"]),
            ("hero", &["nobody"]),
        ]);
        assert_eq!(expand(&source).unwrap(), "Ada meets Ada / nobody");
    }

    #[test]
    fn test_top_level_action_persists_until_pop() {
        let source = grammar(&[
            ("origin", &["[pet:cat]#pet# #pet#[pet:POP] #pet#"]),
            ("pet", &["dog"]),
        ]);
        assert_eq!(expand(&source).unwrap(), "cat cat dog");
    }

    #[test]
    fn test_escapes() {
        let source = grammar(&[("origin", &[r"\#tag\# \[x\] \\ \{keep\}"])]);
        assert_eq!(expand(&source).unwrap(), r"#tag# [x] \ \{keep\}");
    }

    #[test]
    fn test_media_directives_pass_through() {
        let source = grammar(&[
            ("origin", &["Look {img https://example.com/#pic#.png}"]),
            ("pic", &["cat"]),
        ]);
        assert_eq!(expand(&source).unwrap(), "Look {img https://example.com/cat.png}");
    }

    #[test]
    fn test_unknown_symbol_suggests_names() {
        let source = grammar(&[("origin", &["#anmal#"]), ("animal", &["cat"])]);
        match expand(&source) {
            Err(GrammarError::UnknownSymbol {
                symbol,
                suggestions,
            }) => {
                assert_eq!(symbol, "anmal");
                assert_eq!(suggestions, vec!["animal".to_string()]);
            }
            other => panic!("expected unknown symbol, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_start_symbol() {
        let source = grammar(&[("greeting", &["hi"])]);
        assert!(matches!(expand(&source), Err(GrammarError::UnknownSymbol { .. })));
    }

    #[test]
    fn test_self_reference_hits_recursion_limit() {
        let source = grammar(&[("origin", &["a#origin#"])]);
        assert!(matches!(expand(&source), Err(GrammarError::RecursionLimit { .. })));
    }

    #[test]
    fn test_seeded_engines_agree() {
        let source = grammar(&[("origin", &["#n##n##n##n#"]), ("n", &["0", "1", "2", "3", "4"])]);
        let a = TraceryEngine::seeded(42).expand(&source, "origin").unwrap();
        let b = TraceryEngine::seeded(42).expand(&source, "origin").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 4);
    }

    #[test]
    fn test_comma_separated_push_rules() {
        let source = grammar(&[("origin", &["[c:red,red]#c#"])]);
        assert_eq!(expand(&source).unwrap(), "red");
    }
}
