#[derive(Debug, clap::Args)]
pub(crate) struct Args {
    /// Email address of the account to remove
    #[clap(value_parser)]
    email: String,
}

pub(crate) fn run(settings: &Settings, args: Args, out: &mut dyn Write) -> anyhow::Result<()> {
    let mut store = settings.load_accounts()?;

    if !store.has_accounts() {
        bail!("no accounts configured");
    }

    let was_active = store.is_active(&args.email);

    if store.remove_account(&args.email).is_err() {
        bail!(
            "account '{}' not found. Use 'fly-accounts accounts' to list available accounts",
            args.email
        );
    }

    settings.save_accounts(&store)?;

    writeln!(out, "Removed account: {}", args.email)?;

    if !was_active {
        return Ok(());
    }

    match store.active_account() {
        Ok(next) => {
            settings.sync_config()?;
            writeln!(out, "Switched to account: {}", next.email)?;
        }
        Err(NoAccounts) => {
            settings.clear_config()?;
            writeln!(
                out,
                "No accounts remaining. Use 'fly-accounts login' to authenticate."
            )?;
        }
    }

    Ok(())
}


use crate::Settings;
use anyhow::bail;
use fly_accounts_store::NoAccounts;
use std::io::Write;
