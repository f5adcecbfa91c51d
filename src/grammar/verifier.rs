use crate::error_handling::{Error, ErrorType, Errors, Location};
use super::{Grammar, Production, RuleId};

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum GrammarErrorType {
    // A rule mentions an ID with no definition
    #[error("Rule {owner} refers to undefined rule {missing}")]
    UndefinedRule { owner: RuleId, missing: RuleId },
    // The rule matching would start from has no definition
    #[error("Start rule {0} is not defined")]
    MissingStartRule(RuleId),
}

impl ErrorType for GrammarErrorType {}

pub type GrammarError = Error<GrammarErrorType>;
pub type GrammarErrors = Errors<GrammarErrorType>;

fn get_production_undefined_rules(owner: RuleId, production: &Production, grammar: &Grammar, location: &Location) -> GrammarErrors {
    production.references()
        .into_iter()
        .filter(|id| !grammar.contains(*id))
        .map(|missing| GrammarError {
            location: location.to_owned(),
            error: GrammarErrorType::UndefinedRule { owner, missing }
        })
        .collect()
}

fn get_undefined_rules(grammar: &Grammar, location: &Location) -> GrammarErrors {
    // Walk the rules in ID order so the report reads the same on every run
    grammar.rule_ids()
        .into_iter()
        .filter_map(|id| grammar.get(id).map(|production| (id, production)))
        .flat_map(|(id, production)| get_production_undefined_rules(id, production, grammar, location))
        .collect()
}

/// Collects every dangling rule reference in `grammar`, plus a missing
/// `start`, instead of stopping at the first one.
pub fn verify_rules(grammar: &Grammar, start: RuleId, location: &Location) -> Result<(), GrammarErrors> {
    let mut errors = Vec::new();

    if !grammar.contains(start) {
        errors.push(GrammarError {
            location: location.to_owned(),
            error: GrammarErrorType::MissingStartRule(start)
        });
    }

    errors.extend(get_undefined_rules(grammar, location));

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_grammar_passes() {
        let grammar = Grammar::from_iter([
            (0, Production::group(&[&[1, 1], &[1]])),
            (1, Production::literal("a")),
        ]);
        assert_eq!(verify_rules(&grammar, 0, &Location::default()), Ok(()));
    }

    #[test]
    fn every_undefined_rule_is_reported() {
        let grammar = Grammar::from_iter([
            (0, Production::sequence(&[1, 7])),
            (1, Production::group(&[&[8], &[2]])),
            (2, Production::literal("b")),
        ]);
        let errors = verify_rules(&grammar, 5, &Location::default()).unwrap_err();
        let kinds: Vec<_> = errors.into_iter().map(|e| e.error).collect();

        assert_eq!(kinds, vec![
            GrammarErrorType::MissingStartRule(5),
            GrammarErrorType::UndefinedRule { owner: 0, missing: 7 },
            GrammarErrorType::UndefinedRule { owner: 1, missing: 8 },
        ]);
    }
}
