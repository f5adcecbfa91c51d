//! Backtracking, top down matching of text against integer-keyed grammars.
//!
//! A [`Grammar`] maps rule IDs to [`Production`]s. [`parse`] decides whether
//! a rule derives exactly a given text, trying group alternatives in order
//! and backtracking on failure without ever recursing.

pub mod error_handling;
pub mod generator;
pub mod grammar;
pub mod loader;
pub mod matcher;

pub use grammar::{Alternative, Grammar, Production, RuleId};
pub use matcher::{parse, MatchError, MatchOptions, MatchStats, Matcher, Outcome};
