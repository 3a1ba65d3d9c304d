//! # inicheck demo application
//!
//! A command line checker built on the library, used to try the features by
//! hand against the sample files next to this one.
//!
//! ## Running
//!
//! ```sh
//! cargo run --example inicheck -- -m demos/inicheck/master.ini -f demos/inicheck/config.ini
//! ```
//!
//! | Feature                | How to exercise it                                          |
//! |------------------------|-------------------------------------------------------------|
//! | Status report          | `-m master.ini -f config.ini`                               |
//! | JSON report            | add `--json`                                                |
//! | Applied recipes        | add `-r`                                                    |
//! | Changelog matches      | add `-c` (uses `--changelog changelog.ini`)                 |
//! | Changelog migration    | add `-a -w migrated.ini` (uses `--changelog changelog.ini`) |
//! | Non-default values     | add `-n`                                                    |
//! | Resolved config output | add `-w resolved.ini`                                       |
//! | Config comparison      | `-m master.ini --compare config.ini resolved.ini`           |
//! | Schema details         | `-m master.ini -d precip idw_power`                         |
//! | Engine settings        | `--settings inicheck.toml`, or `INICHECK_RECIPE_KEYWORDS`   |
//! | Engine logs            | `RUST_LOG=inicheck=debug`                                   |
//! | Settings template      | `--settings-template`                                       |

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use inicheck::{CheckArgs, CheckOutcome, MasterSchema, Settings, ops};

/// Check an INI config file against a master config.
#[derive(Parser, Debug)]
#[command(name = "inicheck")]
struct Cli {
    /// Master config files; recipe files may follow the schema files.
    #[arg(short, long = "master", num_args = 1.., required = true)]
    master: Vec<PathBuf>,

    /// Changelog files to compare the config against.
    #[arg(long)]
    changelog: Vec<PathBuf>,

    /// TOML file overriding the engine settings.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Print a commented settings template and exit.
    #[arg(long, exclusive = true)]
    settings_template: bool,

    /// Print the check report as JSON.
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    check: CheckArgs,
}

fn run(cli: Cli) -> Result<bool, Box<dyn std::error::Error>> {
    if cli.settings_template {
        println!("{}", Settings::template());
        return Ok(false);
    }

    let settings = match &cli.settings {
        Some(path) => Settings::load_from(path)?,
        None => Settings::defaults()?,
    };

    let mut builder = MasterSchema::builder().paths(cli.master).settings(settings);
    for changelog in cli.changelog {
        builder = builder.changelog(changelog);
    }
    let schema = builder.load()?;

    let action = cli
        .check
        .into_action()
        .ok_or("one of --config, --details or --compare is required")?;
    let outcome = ops::handle(action, &schema)?;

    match &outcome {
        CheckOutcome::Checked { report, .. } if cli.json => println!("{}", report.to_json()?),
        _ => println!("{outcome}"),
    }
    Ok(outcome.has_errors())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(false) => ExitCode::SUCCESS,
        Ok(true) => ExitCode::from(1),
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(2)
        }
    }
}
