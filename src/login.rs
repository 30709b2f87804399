#[derive(Debug, clap::Args)]
pub(crate) struct Args {
    /// Email address of the account
    #[clap(value_parser)]
    email: String,

    /// API access token issued for the account
    #[clap(long, value_parser)]
    access_token: String,

    /// Token used when reporting metrics, if the account has one
    #[clap(long, value_parser)]
    metrics_token: Option<String>,
}

pub(crate) fn run(settings: &Settings, args: Args, out: &mut dyn Write) -> anyhow::Result<()> {
    let Args {
        email,
        access_token,
        metrics_token,
    } = args;

    let email = email.trim();
    anyhow::ensure!(!email.is_empty(), "email must not be empty");
    anyhow::ensure!(
        !access_token.trim().is_empty(),
        "access token must not be empty"
    );

    settings
        .create_config_dir()
        .context("failed to create the config directory")?;

    let mut store = settings.load_accounts()?;

    let mut account = Account::new(email, access_token).with_last_login(Utc::now());
    if let Some(metrics_token) = metrics_token.filter(|token| !token.is_empty()) {
        account = account.with_metrics_token(metrics_token);
    }
    store.add_or_update_account(account);

    settings.save_accounts(&store)?;
    settings.sync_config()?;

    tracing::debug!(%email, accounts = store.account_count(), "logged in");
    writeln!(out, "Logged in as {email}")?;

    Ok(())
}


use crate::Settings;
use anyhow::Context as _;
use chrono::Utc;
use fly_accounts_store::Account;
use std::io::Write;
