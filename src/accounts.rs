#[derive(Debug, clap::Args)]
pub(crate) struct Args {
    /// Print the accounts as JSON
    #[clap(long, action)]
    json: bool,
}

pub(crate) fn run(settings: &Settings, args: Args, out: &mut dyn Write) -> anyhow::Result<()> {
    let store = settings.load_accounts()?;

    if !store.has_accounts() {
        writeln!(
            out,
            "No accounts configured. Use 'fly-accounts login' to add an account."
        )?;
        return Ok(());
    }

    if args.json {
        let accounts = store
            .accounts()
            .iter()
            .map(|account| JsonAccount {
                email: &account.email,
                active: store.is_active(&account.email),
                last_login: account
                    .last_login
                    .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string()),
            })
            .collect::<Vec<_>>();
        serde_json::to_writer_pretty(&mut *out, &accounts).context("failed to write JSON")?;
        writeln!(out)?;
        return Ok(());
    }

    writeln!(out, "Authenticated accounts:")?;
    writeln!(out)?;

    for account in store.accounts() {
        let marker = if store.is_active(&account.email) {
            "* "
        } else {
            "  "
        };
        let last_login = account
            .last_login
            .map(|at| format!(" (last login: {})", at.format("%Y-%m-%d")))
            .unwrap_or_default();
        writeln!(out, "{marker}{}{last_login}", account.email)?;
    }

    writeln!(out)?;
    writeln!(out, "Active account: {}", store.active_account()?.email)?;

    Ok(())
}

#[derive(Serialize)]
struct JsonAccount<'account> {
    email: &'account str,
    active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_login: Option<String>,
}


use crate::Settings;
use anyhow::Context as _;
use serde::Serialize;
use std::io::Write;
