use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Poll timeout per attempt, in milliseconds
    #[arg(long, global = true, default_value_t = 5000)]
    pub poll_timeout_ms: u64,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run read calls against a scripted mock reader and print each result
    Read {
        #[arg(long, value_enum, default_value_t = Scenario::Clean)]
        scenario: Scenario,

        /// Number of read calls
        #[arg(long, default_value_t = 1)]
        calls: usize,

        /// Print controller counters after the last call
        #[arg(long)]
        stats: bool,
    },
    /// Run the background reader loop and print its events
    Watch {
        #[arg(long, value_enum, default_value_t = Scenario::Clean)]
        scenario: Scenario,

        /// Stop after this many events
        #[arg(long, default_value_t = 3)]
        events: usize,
    },
}

/// Scripted hardware behavior for the mock reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Scenario {
    /// Card present, reads cleanly
    Clean,
    /// No card ever enters the field
    NoCard,
    /// Chip configuration fails once, then the card reads
    ConfigureFault,
    /// Every attempt faults
    Cascade,
    /// Two failed calls, then the card reads
    Recover,
}
