use std::path::PathBuf;

use clap::Parser;
use retrace::RuleId;

#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    /// JSON file containing the grammar rules
    pub grammar: PathBuf,

    /// File with one message to match per line
    pub messages: Option<PathBuf>,

    /// Rule to start from (default: 0)
    #[arg(short, long, value_name = "RULE")]
    pub start: Option<RuleId>,

    /// Give up on a message after this many steps (default: never)
    #[arg(short, long, value_name = "STEPS")]
    pub budget: Option<usize>,

    /// Amount of random samples to generate (default: 1 when no messages are given)
    #[arg(short = 'n', long, value_name = "AMOUNT")]
    pub amount: Option<u32>,

    /// Seed for random samples
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Log matching details (RUST_LOG overrides)
    #[arg(short, long)]
    pub verbose: bool
}
