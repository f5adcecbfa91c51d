/*
    This module generates random text a grammar accepts
*/

use rand::prelude::*;

use crate::grammar::*;
use crate::error_handling::*;

// How deep expansion may nest before a derivation is abandoned
pub const DEFAULT_MAX_DEPTH: usize = 64;

// How many derivations `sample` tries before giving up
pub const DEFAULT_ATTEMPTS: usize = 100;

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum GenerateErrorType {
    // An undefined rule was used
    #[error("No definition for rule {0}")]
    UndefinedRule(RuleId),
    // Expansion nested deeper than allowed, usually through a recursive rule
    #[error("Expansion went deeper than {0} rules")]
    DepthExceeded(usize),
    // A group with no alternatives derives nothing
    #[error("Rule {0} is a group with no alternatives")]
    EmptyGroup(RuleId),
}

impl ErrorType for GenerateErrorType {}

pub type GenerateError = Error<GenerateErrorType>;
pub type GenResult = Result<String, GenerateError>;

struct Generator<'a, R: Rng> {
    grammar: &'a Grammar,
    rng: &'a mut R,
    max_depth: usize,
    location: &'a Location,
}

impl<'a, R: Rng> Generator<'a, R> {
    fn error(&self, error: GenerateErrorType) -> GenerateError {
        GenerateError {
            location: self.location.clone(),
            error
        }
    }

    fn rule(&mut self, id: RuleId, depth: usize, out: &mut String) -> Result<(), GenerateError> {
        if depth > self.max_depth {
            return Err(self.error(GenerateErrorType::DepthExceeded(self.max_depth)));
        }

        let grammar = self.grammar;
        let production = grammar
            .get(id)
            .ok_or_else(|| self.error(GenerateErrorType::UndefinedRule(id)))?;

        match production {
            Production::Literal(text) => out.push_str(text),
            Production::Sequence(ids) => self.sequence(ids, depth, out)?,
            Production::Group(alternatives) => {
                let alternative = alternatives
                    .choose(&mut *self.rng)
                    .ok_or_else(|| self.error(GenerateErrorType::EmptyGroup(id)))?;
                self.sequence(alternative, depth, out)?;
            }
        }

        Ok(())
    }

    fn sequence(&mut self, ids: &[RuleId], depth: usize, out: &mut String) -> Result<(), GenerateError> {
        for id in ids {
            self.rule(*id, depth + 1, out)?;
        }
        Ok(())
    }
}

/// Picks one random derivation of `start`.
///
/// Every group chooses uniformly among its alternatives, so a recursive rule
/// can fail with [`GenerateErrorType::DepthExceeded`] on an unlucky draw.
pub fn generate_from(grammar: &Grammar, start: RuleId, rng: &mut impl Rng, max_depth: usize, location: &Location) -> GenResult {
    let mut out = String::new();
    let mut generator = Generator {
        grammar,
        rng,
        max_depth,
        location,
    };
    generator.rule(start, 0, &mut out)?;
    Ok(out)
}

// Generates text from the grammar's root rule
pub fn generate(grammar: &Grammar, rng: &mut impl Rng, location: &Location) -> GenResult {
    generate_from(grammar, grammar.root(), rng, DEFAULT_MAX_DEPTH, location)
}

/// Like [`generate_from`], but retries derivations that nest too deep.
/// Undefined rules fail straight away.
pub fn sample(grammar: &Grammar, start: RuleId, rng: &mut impl Rng, attempts: usize, location: &Location) -> GenResult {
    let mut last = GenerateError {
        location: location.clone(),
        error: GenerateErrorType::DepthExceeded(DEFAULT_MAX_DEPTH)
    };

    for _ in 0..attempts {
        match generate_from(grammar, start, rng, DEFAULT_MAX_DEPTH, location) {
            Err(e) if e.error == GenerateErrorType::DepthExceeded(DEFAULT_MAX_DEPTH) => last = e,
            result => return result,
        }
    }

    Err(last)
}
