/*
    This module matches text against a grammar

    Matching is top down and backtracking, but never recursive: a stack of
    pending frames stands in for call frames, and a stack of checkpoints
    remembers every group whose remaining alternatives have not been tried.
*/

use im::Vector;
use log::{debug, trace};
use thiserror::Error;

use crate::error_handling::ErrorType;
use crate::grammar::{Alternative, Grammar, Production, RuleId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    // The grammar mentions a rule it never defines
    #[error("Rule {0} is referenced but not defined")]
    UnknownRule(RuleId),
    // The step budget ran out before a verdict was reached
    #[error("No verdict after {budget} steps (is the grammar left recursive?)")]
    StepBudgetExhausted { budget: usize },
}

impl ErrorType for MatchError {}

pub type Result<T> = std::result::Result<T, MatchError>;

/// Knobs for a single [`Matcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MatchOptions {
    /// Loop iterations allowed before giving up. `None` never gives up, which
    /// means a left recursive grammar never returns.
    pub step_budget: Option<usize>,
}

impl MatchOptions {
    pub fn with_step_budget(budget: usize) -> Self {
        MatchOptions { step_budget: Some(budget) }
    }
}

/// Counters describing how a match went.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MatchStats {
    /// Iterations of the main loop
    pub steps: usize,
    /// Times a derivation path was abandoned
    pub backtracks: usize,
    /// Deepest the checkpoint stack got
    pub max_checkpoint_depth: usize,
    /// Checkpoints still saved when the verdict was reached
    pub pending_checkpoints: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub accepted: bool,
    pub stats: MatchStats,
}

// Work still to be matched against the rest of the input
#[derive(Debug, Clone, Copy)]
enum Frame<'g> {
    Rule(&'g Production),
    // A group alternative, which behaves like an anonymous sequence
    Alternative(&'g [RuleId]),
}

// Everything needed to undo a group's choice and try its next alternative
#[derive(Debug, Clone)]
struct Checkpoint<'g> {
    // Pending frames as they were just before the group was expanded
    pending: Vector<Frame<'g>>,
    alternatives: &'g [Alternative],
    next: usize,
    cursor: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Advancing,
    Backtracking,
}

// The mutable half of a match. A fresh one is made for every run.
struct State<'g> {
    // Top of the stack is the back of the vector
    pending: Vector<Frame<'g>>,
    checkpoints: Vec<Checkpoint<'g>>,
    cursor: usize,
    mode: Mode,
    stats: MatchStats,
}

impl<'g> State<'g> {
    fn new(start: &'g Production) -> Self {
        State {
            pending: Vector::unit(Frame::Rule(start)),
            checkpoints: Vec::new(),
            cursor: 0,
            mode: Mode::Advancing,
            stats: MatchStats::default(),
        }
    }

    fn fail(&mut self) {
        self.mode = Mode::Backtracking;
        self.stats.backtracks += 1;
    }

    fn save(&mut self, checkpoint: Checkpoint<'g>) {
        self.checkpoints.push(checkpoint);
        self.stats.max_checkpoint_depth = self.stats.max_checkpoint_depth.max(self.checkpoints.len());
    }

    fn finish(mut self, accepted: bool) -> Outcome {
        self.stats.pending_checkpoints = self.checkpoints.len();
        Outcome { accepted, stats: self.stats }
    }
}

/// Runs matches of text against one grammar.
///
/// The matcher only borrows the grammar. All state lives inside a single call
/// to [`Matcher::run`], so a matcher can be reused and shared freely.
#[derive(Debug, Clone, Copy)]
pub struct Matcher<'g> {
    grammar: &'g Grammar,
    options: MatchOptions,
}

impl<'g> Matcher<'g> {
    pub fn new(grammar: &'g Grammar) -> Self {
        Matcher { grammar, options: MatchOptions::default() }
    }

    pub fn with_options(mut self, options: MatchOptions) -> Self {
        self.options = options;
        self
    }

    /// Decides whether `start` can derive exactly `text`.
    ///
    /// Returns `Ok` with `accepted == false` when no derivation exists. Errors
    /// are reserved for a malformed grammar or a spent step budget.
    pub fn run(&self, text: &str, start: RuleId) -> Result<Outcome> {
        let input = text.as_bytes();
        let mut state = State::new(self.grammar.rule(start)?);
        debug!("matching {} bytes from rule {}", input.len(), start);

        loop {
            state.stats.steps += 1;
            if let Some(budget) = self.options.step_budget {
                if state.stats.steps > budget {
                    return Err(MatchError::StepBudgetExhausted { budget });
                }
            }

            match state.mode {
                Mode::Advancing => match state.pending.pop_back() {
                    Some(frame) => self.advance(&mut state, frame, input)?,
                    None if state.cursor == input.len() => {
                        let outcome = state.finish(true);
                        debug!("accepted from rule {}: {:?}", start, outcome.stats);
                        return Ok(outcome);
                    }
                    // Everything matched but input is left over
                    None => state.fail(),
                },
                Mode::Backtracking => match state.checkpoints.pop() {
                    Some(checkpoint) => Self::resume(&mut state, checkpoint),
                    None => {
                        let outcome = state.finish(false);
                        debug!("rejected from rule {}: {:?}", start, outcome.stats);
                        return Ok(outcome);
                    }
                },
            }
        }
    }

    fn advance(&self, state: &mut State<'g>, frame: Frame<'g>, input: &[u8]) -> Result<()> {
        match frame {
            Frame::Rule(Production::Literal(literal)) => {
                if input[state.cursor..].starts_with(literal.as_bytes()) {
                    state.cursor += literal.len();
                } else {
                    state.fail();
                }
            }
            Frame::Rule(Production::Sequence(ids)) => self.expand(state, ids)?,
            Frame::Alternative(ids) => self.expand(state, ids)?,
            Frame::Rule(Production::Group(alternatives)) => match alternatives.first() {
                Some(first) => {
                    trace!("group entered at {} with {} alternatives", state.cursor, alternatives.len());
                    let checkpoint = Checkpoint {
                        pending: state.pending.clone(),
                        alternatives,
                        next: 1,
                        cursor: state.cursor,
                    };
                    state.save(checkpoint);
                    state.pending.push_back(Frame::Alternative(first));
                }
                // A group with no alternatives matches nothing
                None => state.fail(),
            },
        }
        Ok(())
    }

    // Pushes `ids` so the first one is popped next
    fn expand(&self, state: &mut State<'g>, ids: &'g [RuleId]) -> Result<()> {
        for id in ids.iter().rev() {
            state.pending.push_back(Frame::Rule(self.grammar.rule(*id)?));
        }
        Ok(())
    }

    fn resume(state: &mut State<'g>, checkpoint: Checkpoint<'g>) {
        let alternatives = checkpoint.alternatives;
        let next = checkpoint.next;

        // Exhausted checkpoints are dropped and backtracking carries on
        if let Some(alternative) = alternatives.get(next) {
            trace!("retrying group at {} with alternative {}", checkpoint.cursor, next);
            state.pending = checkpoint.pending.clone();
            state.cursor = checkpoint.cursor;
            state.pending.push_back(Frame::Alternative(alternative));
            state.save(Checkpoint { next: next + 1, ..checkpoint });
            state.mode = Mode::Advancing;
        }
    }
}

/// Decides whether `start_rule` derives exactly `text` under `grammar`.
pub fn parse(grammar: &Grammar, text: &str, start_rule: RuleId) -> Result<bool> {
    Matcher::new(grammar)
        .run(text, start_rule)
        .map(|outcome| outcome.accepted)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(text: &str) -> Production {
        Production::literal(text)
    }

    fn seq(ids: &[RuleId]) -> Production {
        Production::sequence(ids)
    }

    fn group(alternatives: &[&[RuleId]]) -> Production {
        Production::group(alternatives)
    }

    // The small message grammar from the source puzzle
    fn messages() -> Grammar {
        Grammar::from_iter([
            (0, seq(&[4, 1, 5])),
            (1, group(&[&[2, 3], &[3, 2]])),
            (2, group(&[&[4, 4], &[5, 5]])),
            (3, group(&[&[4, 5], &[5, 4]])),
            (4, lit("a")),
            (5, lit("b")),
        ])
    }

    #[test]
    fn literal_exactness() {
        let grammar = Grammar::from_iter([(0, lit("a"))]);
        assert_eq!(parse(&grammar, "a", 0), Ok(true));
        assert_eq!(parse(&grammar, "", 0), Ok(false));
        assert_eq!(parse(&grammar, "aa", 0), Ok(false));
        assert_eq!(parse(&grammar, "b", 0), Ok(false));
    }

    #[test]
    fn empty_literal_matches_empty_text() {
        let grammar = Grammar::from_iter([(0, lit(""))]);
        assert_eq!(parse(&grammar, "", 0), Ok(true));
        assert_eq!(parse(&grammar, "x", 0), Ok(false));
    }

    #[test]
    fn sequence_composition() {
        let grammar = Grammar::from_iter([
            (0, seq(&[1, 2])),
            (1, lit("a")),
            (2, lit("b")),
        ]);
        assert_eq!(parse(&grammar, "ab", 0), Ok(true));
        assert_eq!(parse(&grammar, "ba", 0), Ok(false));
        assert_eq!(parse(&grammar, "a", 0), Ok(false));
        assert_eq!(parse(&grammar, "abb", 0), Ok(false));
    }

    #[test]
    fn group_falls_back_to_later_alternative() {
        let grammar = Grammar::from_iter([
            (0, group(&[&[1], &[2]])),
            (1, seq(&[3, 4])),
            (2, seq(&[3])),
            (3, lit("a")),
            (4, lit("x")),
        ]);
        let outcome = Matcher::new(&grammar).run("a", 0).unwrap();

        assert!(outcome.accepted);
        // "ax" had to be tried and abandoned first
        assert_eq!(outcome.stats.backtracks, 1);
        assert_eq!(parse(&grammar, "ax", 0), Ok(true));
        assert_eq!(parse(&grammar, "x", 0), Ok(false));
    }

    #[test]
    fn leftover_input_reopens_earlier_group() {
        let grammar = Grammar::from_iter([
            (0, seq(&[1, 2])),
            (1, group(&[&[3], &[4]])),
            (2, lit("c")),
            (3, lit("a")),
            (4, lit("ab")),
        ]);
        assert_eq!(parse(&grammar, "abc", 0), Ok(true));
        assert_eq!(parse(&grammar, "ac", 0), Ok(true));
        assert_eq!(parse(&grammar, "ab", 0), Ok(false));
    }

    #[test]
    fn short_alternative_first_still_reaches_longer_one() {
        // The first alternative matches a prefix, and only the leftover input
        // tells the matcher to come back
        let grammar = Grammar::from_iter([
            (0, group(&[&[1], &[1, 1]])),
            (1, lit("a")),
        ]);
        assert_eq!(parse(&grammar, "aa", 0), Ok(true));
        assert_eq!(parse(&grammar, "aaa", 0), Ok(false));
    }

    #[test]
    fn message_grammar() {
        let grammar = messages();
        let verdicts: Vec<_> = ["ababbb", "bababa", "abbbab", "aaabbb", "aaaabbb"]
            .iter()
            .map(|text| parse(&grammar, text, 0).unwrap())
            .collect();
        assert_eq!(verdicts, vec![true, false, true, false, false]);
    }

    #[test]
    fn right_recursive_rules_terminate() {
        // 8: 42 | 42 8 and 11: 42 31 | 42 11 31
        let grammar = Grammar::from_iter([
            (0, seq(&[8, 11])),
            (8, group(&[&[42], &[42, 8]])),
            (11, group(&[&[42, 31], &[42, 11, 31]])),
            (42, lit("a")),
            (31, lit("b")),
        ]);
        assert_eq!(parse(&grammar, "aab", 0), Ok(true));
        assert_eq!(parse(&grammar, "aaaabb", 0), Ok(true));
        assert_eq!(parse(&grammar, "aabb", 0), Ok(false));
        assert_eq!(parse(&grammar, "ab", 0), Ok(false));
    }

    #[test]
    fn exhaustive_rejection_leaves_no_checkpoints() {
        let grammar = Grammar::from_iter([
            (0, group(&[&[1, 2], &[2, 1]])),
            (1, group(&[&[3], &[4]])),
            (2, group(&[&[3], &[4]])),
            (3, lit("x")),
            (4, lit("y")),
        ]);
        let outcome = Matcher::new(&grammar).run("zz", 0).unwrap();

        assert!(!outcome.accepted);
        assert_eq!(outcome.stats.pending_checkpoints, 0);
        assert!(outcome.stats.max_checkpoint_depth >= 2);
    }

    #[test]
    fn empty_group_matches_nothing() {
        let grammar = Grammar::from_iter([
            (0, group(&[&[1], &[2]])),
            (1, seq(&[3, 4])),
            (2, lit("a")),
            (3, lit("a")),
            (4, Production::Group(Vec::new())),
        ]);
        assert_eq!(parse(&grammar, "a", 0), Ok(true));
        assert_eq!(parse(&grammar, "aa", 0), Ok(false));
    }

    #[test]
    fn repeated_runs_agree() {
        let grammar = messages();
        let matcher = Matcher::new(&grammar);
        let first = matcher.run("abbbab", 0).unwrap();

        for _ in 0..10 {
            assert_eq!(matcher.run("abbbab", 0).unwrap(), first);
        }
    }

    #[test]
    fn identical_grammars_agree() {
        let one = messages();
        let two = messages();

        for text in ["ababbb", "bababa", "abbbab", "", "a"] {
            assert_eq!(parse(&one, text, 0), parse(&two, text, 0));
        }
    }

    #[test]
    fn unknown_start_rule() {
        let grammar = messages();
        assert_eq!(parse(&grammar, "ab", 99), Err(MatchError::UnknownRule(99)));
    }

    #[test]
    fn unknown_rule_reached_during_matching() {
        let grammar = Grammar::from_iter([
            (0, group(&[&[1], &[9]])),
            (1, lit("a")),
        ]);
        // Rule 9 is never expanded when the first alternative succeeds
        assert_eq!(parse(&grammar, "a", 0), Ok(true));
        assert_eq!(parse(&grammar, "b", 0), Err(MatchError::UnknownRule(9)));
    }

    #[test]
    fn step_budget_stops_left_recursion() {
        let grammar = Grammar::from_iter([
            (0, group(&[&[0, 1], &[1]])),
            (1, lit("a")),
        ]);
        let matcher = Matcher::new(&grammar).with_options(MatchOptions::with_step_budget(1_000));

        assert_eq!(matcher.run("aa", 0), Err(MatchError::StepBudgetExhausted { budget: 1_000 }));
    }

    #[test]
    fn step_budget_large_enough_changes_nothing() {
        let grammar = messages();
        let limited = Matcher::new(&grammar).with_options(MatchOptions::with_step_budget(10_000));

        assert_eq!(limited.run("ababbb", 0), Matcher::new(&grammar).run("ababbb", 0));
    }

    #[test]
    fn deep_nesting_does_not_recurse() {
        // Each rule wraps the next one, far deeper than a call stack would like
        let depth: RuleId = 50_000;
        let mut rules: Vec<(RuleId, Production)> = (0..depth)
            .map(|id| (id, group(&[&[id + 1]])))
            .collect();
        rules.push((depth, lit("z")));
        let grammar = Grammar::from_iter(rules);

        assert_eq!(parse(&grammar, "z", 0), Ok(true));
        assert_eq!(parse(&grammar, "y", 0), Ok(false));
    }

    #[test]
    fn shared_across_threads() {
        let grammar = &messages();
        let texts = ["ababbb", "bababa", "abbbab", "aaabbb", "aaaabbb"];

        let verdicts: Vec<bool> = std::thread::scope(|scope| {
            let handles: Vec<_> = texts
                .iter()
                .map(|text| scope.spawn(move || parse(grammar, text, 0).unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(verdicts, vec![true, false, true, false, false]);
    }
}
