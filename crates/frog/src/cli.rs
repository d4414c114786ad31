//! Command-line interface for the `frog` binary.
//!
//! Flags given here override the values loaded from the configuration file.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "frog", version, about = "Frog game server and its ping client")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the game server until SIGINT/SIGTERM
    Serve(ServeArgs),
    /// Connect to a running server, authenticate once and report the result
    Ping(PingArgs),
}

#[derive(Debug, Clone, Args)]
pub struct ServeArgs {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
    pub config: PathBuf,

    /// Bind address (e.g., 127.0.0.1:8080)
    #[arg(short, long = "bind", value_name = "ADDRESS")]
    pub bind_address: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Output logs in JSON format
    #[arg(long)]
    pub json_logs: bool,

    /// Worker pool size (0 = one per CPU)
    #[arg(short, long = "workers", value_name = "N")]
    pub worker_threads: Option<usize>,
}

#[derive(Debug, Clone, Args)]
pub struct PingArgs {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
    pub config: PathBuf,

    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    #[arg(long)]
    pub port: u16,

    #[arg(long)]
    pub account: String,

    #[arg(long, default_value = "")]
    pub password: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, value_name = "LEVEL")]
    pub log_level: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_overrides() {
        let cli = Cli::try_parse_from([
            "frog", "serve", "-c", "test.toml", "-b", "127.0.0.1:9000", "-l", "debug", "--json-logs", "-w", "3",
        ])
        .unwrap();

        let Command::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.config, PathBuf::from("test.toml"));
        assert_eq!(args.bind_address.as_deref(), Some("127.0.0.1:9000"));
        assert_eq!(args.log_level.as_deref(), Some("debug"));
        assert!(args.json_logs);
        assert_eq!(args.worker_threads, Some(3));
    }

    #[test]
    fn test_serve_defaults() {
        let cli = Cli::try_parse_from(["frog", "serve"]).unwrap();
        let Command::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.config, PathBuf::from("config.toml"));
        assert!(args.bind_address.is_none());
        assert!(!args.json_logs);
    }

    #[test]
    fn test_ping_requires_port_and_account() {
        assert!(Cli::try_parse_from(["frog", "ping", "--account", "frog"]).is_err());

        let cli = Cli::try_parse_from(["frog", "ping", "--port", "8080", "--account", "frog"]).unwrap();
        let Command::Ping(args) = cli.command else {
            panic!("expected ping");
        };
        assert_eq!(args.host, "127.0.0.1");
        assert_eq!(args.port, 8080);
        assert_eq!(args.password, "");
    }
}
