#[derive(Debug, clap::Args)]
pub(crate) struct Args {
    /// Email address of the account to make active
    #[clap(value_parser)]
    email: String,
}

pub(crate) fn run(settings: &Settings, args: Args, out: &mut dyn Write) -> anyhow::Result<()> {
    let mut store = settings.load_accounts()?;

    if !store.has_accounts() {
        bail!("no accounts configured. Use 'fly-accounts login' to add an account");
    }

    if let [only] = store.accounts() {
        writeln!(out, "Only one account configured: {}", only.email)?;
        return Ok(());
    }

    // A stale marker resolves to the first account, so compare against the marker itself.
    if store.active_email() == Some(&*args.email) {
        writeln!(out, "Already using account: {}", args.email)?;
        return Ok(());
    }

    if store.set_active(&args.email).is_err() {
        bail!(
            "account '{}' not found. Use 'fly-accounts accounts' to list available accounts",
            args.email
        );
    }

    settings.save_accounts(&store)?;
    settings.sync_config()?;

    writeln!(out, "Switched to account: {}", args.email)?;

    Ok(())
}


use crate::Settings;
use anyhow::bail;
use std::io::Write;
