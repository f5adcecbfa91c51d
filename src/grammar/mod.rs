/*
    This module is for storing grammars the matcher walks
*/

pub mod verifier;

use std::collections::HashMap;

use itertools::Itertools;
use serde::Deserialize;

use crate::matcher::{self, MatchError};

// Rules are identified by plain integers
pub type RuleId = u32;

// One sequence of rule IDs inside a group
pub type Alternative = Vec<RuleId>;

/// The body of a single rule.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Production {
    /// Text the input must contain at this point, byte for byte
    Literal(String),
    /// Rules that must match one after another
    Sequence(Vec<RuleId>),
    /// Alternatives tried in order, exactly one of which must match
    Group(Vec<Alternative>),
}

impl Production {
    pub fn literal(text: &str) -> Self {
        Production::Literal(text.to_string())
    }

    pub fn sequence(ids: &[RuleId]) -> Self {
        Production::Sequence(ids.to_vec())
    }

    pub fn group(alternatives: &[&[RuleId]]) -> Self {
        Production::Group(alternatives.iter().map(|a| a.to_vec()).collect())
    }

    // Every rule ID this production mentions, in the order written
    pub fn references(&self) -> Vec<RuleId> {
        match self {
            Production::Literal(_) => Vec::new(),
            Production::Sequence(ids) => ids.clone(),
            Production::Group(alternatives) => alternatives.iter().flatten().copied().collect(),
        }
    }
}

/// An immutable rule table plus the rule parsing starts from by default.
///
/// A grammar is never changed once built, so one instance can be shared by
/// any number of threads matching at the same time.
///
/// The grammar must not be left recursive: a rule that can reach itself in
/// first position without consuming input makes the matcher loop forever
/// (unless a step budget is set in [`matcher::MatchOptions`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grammar {
    root: RuleId,
    rules: HashMap<RuleId, Production>,
}

impl Grammar {
    pub fn new(rules: HashMap<RuleId, Production>) -> Self {
        Grammar { root: 0, rules }
    }

    pub fn with_root(mut self, root: RuleId) -> Self {
        self.root = root;
        self
    }

    pub fn root(&self) -> RuleId {
        self.root
    }

    pub fn get(&self, id: RuleId) -> Option<&Production> {
        self.rules.get(&id)
    }

    pub fn rule(&self, id: RuleId) -> Result<&Production, MatchError> {
        self.get(id).ok_or(MatchError::UnknownRule(id))
    }

    pub fn contains(&self, id: RuleId) -> bool {
        self.rules.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rule_ids(&self) -> Vec<RuleId> {
        self.rules.keys().copied().sorted().collect_vec()
    }

    /// Matches `text` against the root rule.
    pub fn parse(&self, text: &str) -> Result<bool, MatchError> {
        self.parse_from(text, self.root)
    }

    /// Matches `text` against `start`, ignoring the root.
    pub fn parse_from(&self, text: &str, start: RuleId) -> Result<bool, MatchError> {
        matcher::parse(self, text, start)
    }
}

impl FromIterator<(RuleId, Production)> for Grammar {
    fn from_iter<I: IntoIterator<Item = (RuleId, Production)>>(iter: I) -> Self {
        Grammar::new(iter.into_iter().collect())
    }
}
