/*
    This module loads grammars and messages from files

    Grammars are stored as JSON in the same mapping form the matcher uses,
    keyed by rule ID:

        {"0": {"sequence": [1, 2]}, "1": {"literal": "a"}, "2": {"group": [[1], [1, 2]]}}
*/

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use itertools::Itertools;
use log::debug;

use crate::error_handling::*;
use crate::grammar::verifier::{verify_rules, GrammarError, GrammarErrorType};
use crate::grammar::*;

#[derive(Debug, thiserror::Error)]
pub enum LoadErrorType {
    // There was an issue with reading a file
    #[error("File error: {0}")]
    FileError(std::io::Error),
    // The grammar file is not a valid rule mapping
    #[error("Malformed grammar: {0}")]
    Malformed(serde_json::Error),
    // The rules were read but do not form a usable grammar
    #[error(transparent)]
    Grammar(GrammarErrorType),
}

impl ErrorType for LoadErrorType {}

impl PartialEq for LoadErrorType {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (LoadErrorType::FileError(a), LoadErrorType::FileError(b)) => a.kind() == b.kind(),
            (LoadErrorType::Malformed(a), LoadErrorType::Malformed(b)) => a.classify() == b.classify(),
            (LoadErrorType::Grammar(a), LoadErrorType::Grammar(b)) => a == b,
            _ => false,
        }
    }
}

pub type LoadError = Error<LoadErrorType>;
pub type LoadErrors = Errors<LoadErrorType>;

pub type LineResult<T> = std::result::Result<T, LoadError>;
pub type FileResult<T> = std::result::Result<T, LoadErrors>;

fn io_error(error: std::io::Error, file: PathBuf) -> LoadError {
    LoadError {
        location: Location::file(file),
        error: LoadErrorType::FileError(error)
    }
}

fn from_grammar_error(error: GrammarError) -> LoadError {
    LoadError {
        location: error.location,
        error: LoadErrorType::Grammar(error.error)
    }
}

/// One line of text to be matched, with where it was read from.
#[derive(Debug, PartialEq, Clone)]
pub struct Message {
    pub text: String,
    pub location: Location,
}

/// Reads a grammar file and checks it, starting from `start`.
///
/// Every dangling reference is reported at once, so a grammar that loads is
/// one the matcher can never fail on with an unknown rule.
pub fn load_grammar(path: &PathBuf, start: RuleId) -> FileResult<Grammar> {
    let file = File::open(path).map_err(|e| vec![io_error(e, path.clone())])?;

    let rules: HashMap<RuleId, Production> = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| vec![LoadError {
            location: Location::line(path.clone(), e.line()),
            error: LoadErrorType::Malformed(e)
        }])?;

    let grammar = Grammar::new(rules).with_root(start);
    verify_rules(&grammar, start, &Location::file(path.clone()))
        .map_err(|errors| errors.into_iter().map(from_grammar_error).collect_vec())?;

    debug!("loaded {} rules from {}", grammar.len(), path.display());
    Ok(grammar)
}

fn is_message_line(line: &String) -> bool {
    !line.is_empty()
}

// Returns an iterator over the lines of a file, with the io errors wrapped
// in LoadError and enumerated
fn file_line_nums<'a>(file: File, path: &'a PathBuf) -> impl Iterator<Item = (usize, LineResult<String>)> + 'a {
    BufReader::new(file)
        .lines()
        .map(move |line| line.map_err(|e| io_error(e, path.clone())))
        .enumerate()
        .filter(|(_, line)| line.as_ref().is_ok_and(is_message_line) || line.is_err())
        .map(|(num, line)| (num + 1, line))
}

/// Reads every non-blank line of `path` as a message.
pub fn load_messages(path: &PathBuf) -> FileResult<Vec<Message>> {
    let file = File::open(path).map_err(|e| vec![io_error(e, path.clone())])?;

    let (messages, errors): (Vec<_>, Vec<_>) = file_line_nums(file, path)
        .partition_map(|(num, line)| match line {
            Ok(text) => itertools::Either::Left(Message {
                text,
                location: Location::line(path.clone(), num)
            }),
            Err(e) => itertools::Either::Right(e),
        });

    if !errors.is_empty() {
        return Err(errors);
    }

    debug!("loaded {} messages from {}", messages.len(), path.display());
    Ok(messages)
}
