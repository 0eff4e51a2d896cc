/// Recap grammar — weighted template rules, RON loading, and expansion.
///
/// A grammar is a map of named rules. Each rule carries tag preconditions
/// and weighted alternatives; an alternative is a template of literal text,
/// `{rule}` references, and `{fact.slot}` interpolations.

use rand::distributions::WeightedIndex;
use rand::prelude::Distribution;
use rand::rngs::StdRng;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use thiserror::Error;

/// Deepest rule nesting an expansion may reach.
const MAX_DEPTH: usize = 24;

/// Grammar shipped with the crate; used when no grammar path is configured.
const BUILTIN_GRAMMAR: &str = include_str!("../../recap_data/grammar.ron");

#[derive(Debug, Error)]
pub enum GrammarError {
    #[error("template parse error: {0}")]
    TemplateParse(String),
    #[error("rule not found: {0}")]
    RuleNotFound(String),
    #[error("rule '{0}' has no alternatives")]
    EmptyRule(String),
    #[error("no value for fact slot '{0}'")]
    UnknownSlot(String),
    #[error("expansion exceeded depth {0}")]
    TooDeep(usize),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// A segment of a parsed template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TemplateSegment {
    Literal(String),
    /// `{rule_name}`
    RuleRef(String),
    /// `{fact.slot}`
    Slot(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub segments: Vec<TemplateSegment>,
}

impl Template {
    /// Parse template text. `{{` and `}}` are literal braces.
    pub fn parse(input: &str) -> Result<Template, GrammarError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = input.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '}' => {
                    return Err(GrammarError::TemplateParse(format!(
                        "unmatched '}}' in \"{}\"",
                        input
                    )));
                }
                '{' => {
                    let mut reference = String::new();
                    let mut closed = false;
                    for inner in chars.by_ref() {
                        match inner {
                            '}' => {
                                closed = true;
                                break;
                            }
                            '{' => {
                                return Err(GrammarError::TemplateParse(format!(
                                    "nested '{{' in \"{}\"",
                                    input
                                )));
                            }
                            other => reference.push(other),
                        }
                    }
                    if !closed {
                        return Err(GrammarError::TemplateParse(format!(
                            "unclosed '{{' in \"{}\"",
                            input
                        )));
                    }
                    if !literal.is_empty() {
                        segments.push(TemplateSegment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Self::reference(reference.trim(), input)?);
                }
                other => literal.push(other),
            }
        }

        if !literal.is_empty() {
            segments.push(TemplateSegment::Literal(literal));
        }
        Ok(Template { segments })
    }

    fn reference(content: &str, input: &str) -> Result<TemplateSegment, GrammarError> {
        if content.is_empty() {
            return Err(GrammarError::TemplateParse(format!(
                "empty reference in \"{}\"",
                input
            )));
        }
        match content.strip_prefix("fact.") {
            Some("") => Err(GrammarError::TemplateParse(format!(
                "empty fact slot in \"{}\"",
                input
            ))),
            Some(slot) => Ok(TemplateSegment::Slot(slot.to_string())),
            None => Ok(TemplateSegment::RuleRef(content.to_string())),
        }
    }

    pub fn rule_refs(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            TemplateSegment::RuleRef(name) => Some(name.as_str()),
            _ => None,
        })
    }

    pub fn slots(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            TemplateSegment::Slot(name) => Some(name.as_str()),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alternative {
    pub weight: u32,
    pub template: Template,
}

/// A named rule. A rule whose `requires`/`excludes` do not match the
/// selection tags expands to nothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrammarRule {
    pub name: String,
    pub requires: Vec<String>,
    pub excludes: Vec<String>,
    pub alternatives: Vec<Alternative>,
}

impl GrammarRule {
    pub fn applies(&self, tags: &FxHashSet<String>) -> bool {
        self.requires.iter().all(|t| tags.contains(t))
            && !self.excludes.iter().any(|t| tags.contains(t))
    }
}

/// What an expansion may draw on: selection tags and fact slot values.
#[derive(Debug, Clone, Default)]
pub struct SelectionContext {
    pub tags: FxHashSet<String>,
    pub slots: HashMap<String, String>,
}

impl SelectionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tag(&mut self, tag: &str) {
        self.tags.insert(tag.to_string());
    }

    pub fn slot(&mut self, name: &str, value: impl Into<String>) {
        self.slots.insert(name.to_string(), value.into());
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GrammarSet {
    pub rules: HashMap<String, GrammarRule>,
}

// On-disk shape: `{ "name": Rule(requires: [..], excludes: [..], alternatives: [(weight: 1, text: "..")]) }`

#[derive(Debug, Deserialize)]
struct RonAlternative {
    weight: u32,
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename = "Rule")]
struct RonRule {
    #[serde(default)]
    requires: Vec<String>,
    #[serde(default)]
    excludes: Vec<String>,
    alternatives: Vec<RonAlternative>,
}

impl GrammarSet {
    /// The grammar bundled with the crate.
    pub fn builtin() -> Result<GrammarSet, GrammarError> {
        Self::parse_ron(BUILTIN_GRAMMAR)
    }

    pub fn load_from_ron(path: &Path) -> Result<GrammarSet, GrammarError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    pub fn parse_ron(input: &str) -> Result<GrammarSet, GrammarError> {
        let raw: HashMap<String, RonRule> = ron::from_str(input)?;
        let mut rules = HashMap::with_capacity(raw.len());
        for (name, rule) in raw {
            let alternatives = rule
                .alternatives
                .into_iter()
                .map(|alt| {
                    Ok(Alternative {
                        weight: alt.weight,
                        template: Template::parse(&alt.text)?,
                    })
                })
                .collect::<Result<Vec<_>, GrammarError>>()?;
            rules.insert(
                name.clone(),
                GrammarRule {
                    name,
                    requires: rule.requires,
                    excludes: rule.excludes,
                    alternatives,
                },
            );
        }
        Ok(GrammarSet { rules })
    }

    /// Rules from `other` replace same-named rules here.
    pub fn merge(&mut self, other: GrammarSet) {
        self.rules.extend(other.rules);
    }

    /// Expand `rule_name` against the context. The entry rule must exist;
    /// nested rules that do not apply to the tags expand to nothing.
    pub fn expand(
        &self,
        rule_name: &str,
        ctx: &SelectionContext,
        rng: &mut StdRng,
    ) -> Result<String, GrammarError> {
        let mut out = String::new();
        self.expand_into(rule_name, ctx, rng, 0, &mut out)?;
        Ok(tidy(&out))
    }

    fn expand_into(
        &self,
        rule_name: &str,
        ctx: &SelectionContext,
        rng: &mut StdRng,
        depth: usize,
        out: &mut String,
    ) -> Result<(), GrammarError> {
        if depth > MAX_DEPTH {
            return Err(GrammarError::TooDeep(MAX_DEPTH));
        }
        let rule = self
            .rules
            .get(rule_name)
            .ok_or_else(|| GrammarError::RuleNotFound(rule_name.to_string()))?;
        if !rule.applies(&ctx.tags) {
            return Ok(());
        }
        if rule.alternatives.is_empty() {
            return Err(GrammarError::EmptyRule(rule_name.to_string()));
        }

        let chosen = if rule.alternatives.len() == 1 {
            &rule.alternatives[0]
        } else {
            let weights = rule.alternatives.iter().map(|a| a.weight.max(1));
            let index = WeightedIndex::new(weights)
                .map_err(|_| GrammarError::EmptyRule(rule_name.to_string()))?;
            &rule.alternatives[index.sample(rng)]
        };

        for segment in &chosen.template.segments {
            match segment {
                TemplateSegment::Literal(text) => out.push_str(text),
                TemplateSegment::RuleRef(name) => {
                    self.expand_into(name, ctx, rng, depth + 1, out)?
                }
                TemplateSegment::Slot(name) => {
                    let value = ctx
                        .slots
                        .get(name)
                        .ok_or_else(|| GrammarError::UnknownSlot(name.clone()))?;
                    out.push_str(value);
                }
            }
        }
        Ok(())
    }

    /// Static checks: missing entry rules, thin rules, dangling references,
    /// unknown slots, and rules that can only recurse into themselves.
    pub fn lint(&self, entry_rules: &[&str], known_slots: &[&str]) -> LintReport {
        let mut report = LintReport::default();

        for entry in entry_rules {
            if !self.rules.contains_key(*entry) {
                report.errors.push(format!("missing entry rule '{}'", entry));
            }
        }

        let ordered: BTreeMap<&String, &GrammarRule> = self.rules.iter().collect();
        for (name, rule) in ordered {
            if rule.alternatives.len() < 3 {
                report.warnings.push(format!(
                    "rule '{}' has only {} alternatives (minimum 3 recommended)",
                    name,
                    rule.alternatives.len()
                ));
            }
            for alt in &rule.alternatives {
                for target in alt.template.rule_refs() {
                    if !self.rules.contains_key(target) {
                        report.errors.push(format!(
                            "rule '{}' references non-existent rule '{}'",
                            name, target
                        ));
                    }
                }
                for slot in alt.template.slots() {
                    if !known_slots.contains(&slot) {
                        report.errors.push(format!(
                            "rule '{}' uses unknown fact slot '{}'",
                            name, slot
                        ));
                    }
                }
            }
            let always_recurses = !rule.alternatives.is_empty()
                && rule
                    .alternatives
                    .iter()
                    .all(|a| a.template.rule_refs().any(|r| r == name.as_str()));
            if always_recurses {
                report.errors.push(format!(
                    "rule '{}' has no non-recursive alternative",
                    name
                ));
            }
        }
        report
    }
}

/// Findings from [`GrammarSet::lint`].
#[derive(Debug, Clone, Default)]
pub struct LintReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl LintReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Collapse runs of whitespace, drop spaces before punctuation, trim.
fn tidy(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for word in text.split_whitespace() {
        let glues = word.starts_with(['.', ',', ';', ':', '!', '?']);
        if !out.is_empty() && !glues {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}
