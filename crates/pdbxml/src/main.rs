//! pdbxml - Inspect XML-encoded debug symbol type databases
//!
//! Usage:
//!   pdbxml list <xml>          List named types in document order
//!   pdbxml show <xml> <name>   Print the C definition of a type
//!   pdbxml json <xml>          Export the decoded database as JSON
//!   pdbxml check <xml>         Report statistics and dangling references

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::LevelFilter;
use simple_logger::SimpleLogger;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pdbxml")]
#[command(about = "Inspect XML-encoded debug symbol type databases", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Fail on out-of-order records instead of scanning for them
    #[arg(long, global = true)]
    strict: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// List named types in document order
    List {
        /// Path to the type database XML
        xml: PathBuf,
        /// Show only structs
        #[arg(long)]
        structs: bool,
        /// Show only unions
        #[arg(long)]
        unions: bool,
        /// Show only enums
        #[arg(long)]
        enums: bool,
    },
    /// Show the C definition of a named type
    Show {
        /// Path to the type database XML
        xml: PathBuf,
        /// Type name (e.g., "_LIST_ENTRY")
        name: String,
    },
    /// Export the decoded database as JSON
    Json {
        /// Path to the type database XML
        xml: PathBuf,
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print statistics and fail if any referenced type is missing
    Check {
        /// Path to the type database XML
        xml: PathBuf,
    },
}

fn log_level(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    SimpleLogger::new().with_level(log_level(cli.verbose)).init()?;

    let loader = commands::Loader::new(cli.strict);

    match cli.command {
        Commands::List {
            xml,
            structs,
            unions,
            enums,
        } => {
            let filter = commands::KindFilter {
                structs,
                unions,
                enums,
            };
            commands::handle_list(&loader, &xml, filter)?;
        }
        Commands::Show { xml, name } => {
            commands::handle_show(&loader, &xml, &name)?;
        }
        Commands::Json { xml, output } => {
            commands::handle_json(&loader, &xml, output.as_deref())?;
        }
        Commands::Check { xml } => {
            commands::handle_check(&loader, &xml)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level() {
        assert_eq!(log_level(0), LevelFilter::Warn);
        assert_eq!(log_level(1), LevelFilter::Info);
        assert_eq!(log_level(2), LevelFilter::Debug);
        assert_eq!(log_level(9), LevelFilter::Trace);
    }

    #[test]
    fn test_cli_parses_global_flags() {
        let cli = Cli::try_parse_from(["pdbxml", "check", "t.xml", "--strict", "-vv"]).unwrap();
        assert!(cli.strict);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Commands::Check { .. }));
    }
}
