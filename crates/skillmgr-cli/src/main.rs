use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use skillmgr_registry::SkillSourceKind;

mod completion;
mod dispatch;
mod logging;
mod prompt;
mod render;
mod telemetry;

use completion::CliCompletionShell;

#[derive(Parser, Debug)]
#[command(name = "skillmgr")]
#[command(about = "Install, update and remove voice assistant skills", long_about = None)]
struct Cli {
    /// Installation prefix. Defaults to SKILLMGR_PREFIX, then the user prefix.
    #[arg(long, global = true)]
    prefix: Option<PathBuf>,
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Install a skill by name; without a name, suggest some.
    Install {
        skill: Option<String>,
        /// Install the latest upstream revision instead of the pinned one.
        #[arg(long, requires = "skill")]
        beta: bool,
    },
    Remove {
        skill: String,
    },
    Available,
    InstallLink {
        url: String,
    },
    List,
    /// Apply a desired-state delta. Lists are JSON arrays of names or
    /// `{"name", "devices"}` objects.
    Sync {
        #[arg(long, default_value = "[]")]
        install: String,
        #[arg(long, default_value = "[]")]
        remove: String,
        /// Install this repository first, as a settings installer link would.
        #[arg(long)]
        link: Option<String>,
    },
    Source {
        #[command(subcommand)]
        command: SourceCommands,
    },
    Ledger,
    Completions {
        #[arg(value_enum)]
        shell: CliCompletionShell,
    },
}

#[derive(Subcommand, Debug)]
enum SourceCommands {
    Add {
        name: String,
        location: String,
        #[arg(long, value_enum, default_value_t = CliSourceKind::Git)]
        kind: CliSourceKind,
        #[arg(long, default_value_t = 0)]
        priority: u32,
    },
    List,
    Remove {
        name: String,
        #[arg(long)]
        purge_cache: bool,
    },
    Update {
        sources: Vec<String>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum CliSourceKind {
    Git,
    Filesystem,
}

impl From<CliSourceKind> for SkillSourceKind {
    fn from(value: CliSourceKind) -> Self {
        match value {
            CliSourceKind::Git => Self::Git,
            CliSourceKind::Filesystem => Self::Filesystem,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    match dispatch::run_cli(cli) {
        Ok(status) => ExitCode::from(status),
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
