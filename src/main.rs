#![warn(
    clippy::pedantic,
    noop_method_call,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_op_in_unsafe_fn,
    unused_lifetimes,
    unused_qualifications
)]
#![allow(clippy::items_after_statements, clippy::needless_pass_by_value)]

fn main() -> process::ExitCode {
    init_logging();
    if let Err(e) = try_main() {
        report_error(e.as_ref());
        return process::ExitCode::FAILURE;
    }
    process::ExitCode::SUCCESS
}

fn try_main() -> anyhow::Result<()> {
    let args = Args::parse();

    let project_dirs = ProjectDirs::from("", "", "fly-accounts").context("no home directory")?;

    let Config {
        lock_timeout,
        config_dir,
    } = config::load(project_dirs.config_dir())?;

    let config_dir = match args.config_dir.or(config_dir) {
        Some(config_dir) => config_dir,
        None => default_config_dir()?,
    };

    let settings = Settings {
        config_dir,
        lock_timeout,
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match args.command {
        Command::Accounts(args) => accounts::run(&settings, args, &mut out),
        Command::Login(args) => login::run(&settings, args, &mut out),
        Command::Switch(args) => switch::run(&settings, args, &mut out),
        Command::Remove(args) => remove::run(&settings, args, &mut out),
        Command::Logout => logout::run(&settings, &mut out, &mut io::stderr()),
    }
}

/// Manage the accounts the fly CLI is authenticated as
#[derive(Debug, clap::Parser)]
#[clap(version)]
struct Args {
    /// Directory holding accounts.yml and config.yml [default: ~/.fly]
    #[clap(long, env = "FLY_CONFIG_DIR", global = true, value_parser)]
    config_dir: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, clap::Subcommand)]
enum Command {
    /// List all authenticated accounts; the active one is marked with an asterisk
    Accounts(accounts::Args),
    /// Record an account's credentials and make it active
    Login(login::Args),
    /// Switch the active account
    Switch(switch::Args),
    /// Remove an account; if it was active, another account takes over
    Remove(remove::Args),
    /// Log the active account out, switching to another one if there is one
    Logout,
}

fn default_config_dir() -> anyhow::Result<PathBuf> {
    let base_dirs = BaseDirs::new().context("no home directory")?;
    Ok(base_dirs.home_dir().join(".fly"))
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

const LOG_ENV_VAR: &str = "FLY_ACCOUNTS_LOG";

mod accounts;

mod login;

mod switch;

mod remove;

mod logout;

mod config;

use settings::Settings;
mod settings;

use error_reporting::report_error;
mod error_reporting;

use anyhow::Context as _;
use clap::Parser as _;
use config::Config;
use directories::BaseDirs;
use directories::ProjectDirs;
use std::io;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;
