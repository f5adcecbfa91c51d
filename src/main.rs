mod cli;

use std::process::ExitCode;

use clap::Parser;
use env_logger::Env;
use rand::prelude::*;
use rand::rngs::StdRng;

use retrace::error_handling::{Error, ErrorType, Location};
use retrace::generator::{self, DEFAULT_ATTEMPTS};
use retrace::loader::{self, Message};
use retrace::{Grammar, MatchOptions, Matcher, RuleId};

use cli::Cli;

fn report<T: ErrorType>(errors: impl IntoIterator<Item = Error<T>>) {
    for error in errors {
        eprintln!("{}", error);
    }
}

// Prints each message's verdict and returns whether every message got one
fn check_messages(grammar: &Grammar, start: RuleId, messages: &[Message], options: MatchOptions) -> bool {
    let matcher = Matcher::new(grammar).with_options(options);
    let mut matching = 0;
    let mut failed = false;

    for message in messages {
        match matcher.run(&message.text, start) {
            Ok(outcome) => {
                if outcome.accepted {
                    matching += 1;
                }
                println!("{}\t{}", if outcome.accepted { "match" } else { "no match" }, message.text);
            }
            Err(error) => {
                failed = true;
                report([Error { location: message.location.clone(), error }]);
            }
        }
    }

    println!("{}/{} messages match rule {}", matching, messages.len(), start);
    !failed
}

fn print_samples(grammar: &Grammar, start: RuleId, amount: u32, rng: &mut StdRng, location: &Location) -> bool {
    for _ in 0..amount {
        match generator::sample(grammar, start, rng, DEFAULT_ATTEMPTS, location) {
            Ok(text) => println!("{}", text),
            Err(error) => {
                report([error]);
                return false;
            }
        }
    }
    true
}

fn run(cli: &Cli) -> bool {
    let start = cli.start.unwrap_or(0);
    let grammar = match loader::load_grammar(&cli.grammar, start) {
        Ok(grammar) => grammar,
        Err(errors) => {
            report(errors);
            return false;
        }
    };

    let options = MatchOptions { step_budget: cli.budget };
    let mut ok = true;

    if let Some(path) = &cli.messages {
        match loader::load_messages(path) {
            Ok(messages) => ok &= check_messages(&grammar, start, &messages, options),
            Err(errors) => {
                report(errors);
                return false;
            }
        }
    }

    let amount = cli.amount.unwrap_or(if cli.messages.is_some() { 0 } else { 1 });
    if amount > 0 {
        let mut rng = match cli.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        ok &= print_samples(&grammar, start, amount, &mut rng, &Location::file(cli.grammar.clone()));
    }

    ok
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    if run(&cli) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
