//! Command-line interface.

use clap::{Args, Parser, Subcommand};

/// REST CRUD over an in-memory user store, optionally served by a pool of
/// worker processes behind a round-robin dispatcher.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Port for the public listener. Falls back to $PORT, then 4000.
    #[arg(long)]
    pub port: Option<u16>,

    /// Run a primary with a pool of worker processes instead of a single
    /// in-process server.
    #[arg(long)]
    pub multi: bool,

    /// How many workers to spawn in --multi mode. Defaults to available
    /// parallelism minus one.
    #[arg(long)]
    pub workers: Option<usize>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one worker process. Spawned by the primary with a piped stdio
    /// channel; not meant to be invoked by hand.
    #[command(hide = true)]
    Worker(WorkerArgs),
}

#[derive(Args, Debug, Clone)]
pub struct WorkerArgs {
    /// Port this worker's HTTP listener binds to.
    #[arg(long)]
    pub port: u16,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_subcommand_parses_its_port() {
        let cli = Cli::parse_from(["user-cluster", "worker", "--port", "4101"]);
        match cli.command {
            Some(Command::Worker(args)) => assert_eq!(args.port, 4101),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn multi_mode_flags_parse() {
        let cli = Cli::parse_from(["user-cluster", "--multi", "--port", "8080", "--workers", "3"]);
        assert!(cli.multi);
        assert_eq!(cli.port, Some(8080));
        assert_eq!(cli.workers, Some(3));
        assert!(cli.command.is_none());
    }
}
