pub(crate) fn run(
    settings: &Settings,
    out: &mut dyn Write,
    err_out: &mut dyn Write,
) -> anyhow::Result<()> {
    logout(settings, out)?;
    warn_env_vars(err_out, |key| env::var_os(key).is_some())?;
    Ok(())
}

fn logout(settings: &Settings, out: &mut dyn Write) -> anyhow::Result<()> {
    if let Some(next) = log_out_of_active(settings, out)? {
        writeln!(out, "Switched to account: {next}")?;
        return Ok(());
    }

    settings.clear_config()?;
    writeln!(out, "Logged out successfully.")?;
    Ok(())
}

/// Drops the active account and hands over to the next one, returning its email. `None` means
/// nothing is left to hand over to and the credentials should be cleared instead.
fn log_out_of_active(settings: &Settings, out: &mut dyn Write) -> anyhow::Result<Option<String>> {
    let mut store = match settings.load_accounts() {
        Ok(store) => store,
        Err(e) => {
            tracing::warn!("{e:#}");
            return Ok(None);
        }
    };

    let Ok(current) = store.active_account().map(|account| account.email.clone()) else {
        return Ok(None);
    };

    if store.remove_account(&current).is_err() {
        return Ok(None);
    }

    if let Err(e) = settings.save_accounts(&store) {
        tracing::warn!("{e:#}");
    }

    let Ok(next) = store.active_account().map(|account| account.email.clone()) else {
        return Ok(None);
    };

    if let Err(e) = settings.sync_config() {
        tracing::warn!("{e:#}");
    }

    writeln!(out, "Logged out of {current}")?;
    Ok(Some(next))
}

/// Credentials in the environment outlive the logout, so point them out.
fn warn_env_vars(out: &mut dyn Write, is_set: impl Fn(&str) -> bool) -> io::Result<()> {
    match (is_set(API_TOKEN_ENV_VAR), is_set(ACCESS_TOKEN_ENV_VAR)) {
        (true, true) => writeln!(
            out,
            "${API_TOKEN_ENV_VAR} & ${ACCESS_TOKEN_ENV_VAR} are set in your environment; \
             don't forget to remove them."
        ),
        (true, false) => warn_single(out, API_TOKEN_ENV_VAR),
        (false, true) => warn_single(out, ACCESS_TOKEN_ENV_VAR),
        (false, false) => Ok(()),
    }
}

fn warn_single(out: &mut dyn Write, key: &str) -> io::Result<()> {
    writeln!(
        out,
        "${key} is set in your environment; don't forget to remove it."
    )
}

const API_TOKEN_ENV_VAR: &str = "FLY_API_TOKEN";
const ACCESS_TOKEN_ENV_VAR: &str = "FLY_ACCESS_TOKEN";


use crate::Settings;
use std::env;
use std::io;
use std::io::Write;
