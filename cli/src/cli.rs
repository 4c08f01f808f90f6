use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[clap(name = "argentum", version, about = "Silver price ingestion pipeline")]
pub struct Cli {
    /// Emit JSON log lines (always on when APP_ENV=production)
    #[clap(long, global = true)]
    pub json_logs: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the scheduler until Ctrl-C
    Serve,

    /// Run one ingestion cycle now and print the appended record
    Scrape,

    /// Print the latest record
    Latest,

    /// Print recent records, oldest first
    History {
        /// Defaults to HISTORY_LIMIT (24)
        #[clap(long)]
        limit: Option<usize>,
    },
}
