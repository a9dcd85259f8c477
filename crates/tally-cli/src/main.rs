//! The `tally` binary

use clap::{ArgAction, Parser, Subcommand};
use std::io;
use std::path::PathBuf;
use tally_cli::vcs::GitCli;
use tally_cli::{check, generate, scaffold, view};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "tally",
    version,
    about = "Compile manual-test checklists from YAML templates and track results in git"
)]
struct Cli {
    #[arg(short, long, global = true, action = ArgAction::Count, help = "increase verbosity")]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a new checklist directory from a YAML template
    New {
        template: PathBuf,
        directory: Option<PathBuf>,
    },
    /// View and update a checklist directory
    ///
    /// Defaults to the tally-latest symlink, then to the most recently
    /// created checklist directory.
    View { directory: Option<PathBuf> },
    /// Set up a directory as a new checklist repository
    Setup { directory: PathBuf },
    /// Run the tally-check script in a checklist directory
    Check { directory: PathBuf },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "error",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .init();

    let base = std::env::current_dir()?;

    match cli.command {
        Commands::New {
            template,
            directory,
        } => {
            let target = generate::run(&base, &template, directory.as_deref())?;
            println!("Your test records and log files are");
            println!("  {}/", target.display());
            for file in generate::list_tree(&target) {
                println!("  {}", file.display());
            }
            println!("Run \"git reset HEAD~\" to throw them away");
        }
        Commands::View { directory } => {
            let dir = view::locate_directory(&base, directory.as_deref())?;
            check::run(&dir)?;
            let repo = GitCli::discover(&dir)?;
            let checklist = view::find_checklist(&dir)?;
            let session = view::Session::open(&dir, &checklist, &repo)?;
            view::run_session(session, io::stdin().lock(), io::stdout())?;
        }
        Commands::Setup { directory } => {
            let template = scaffold::run(&directory)?;
            println!("New checklist directory set up at {}/", directory.display());
            println!("Please edit the test template at {} and commit it.", template.display());
            println!();
            println!("To start a new test set:");
            println!("    cd {}", directory.display());
            println!("    tally new {}", template.file_name().unwrap_or_default().to_string_lossy());
            println!("    tally view");
        }
        Commands::Check { directory } => {
            check::run(&base.join(directory))?;
        }
    }

    Ok(())
}
