//! Keeping the legacy single-account config in step with the active account.

/// Syncs the active account in `config_dir` into the `config.yml` next to it.
pub fn sync_active_account_to_config(
    config_dir: &fs::Path,
    timeout: Timeout,
) -> Result<(), Error> {
    let mut config = LegacyConfigFile::in_dir(config_dir, timeout);
    sync_active_account(config_dir, timeout, &mut config)
}

/// Loads the accounts in `config_dir` and pushes the active one's credentials into `config`.
/// Without accounts there is nothing to do.
///
/// The setters run one after another and the first failure stops the sync, so `config` may be
/// left partially updated.
pub fn sync_active_account<C: LegacyConfig>(
    config_dir: &fs::Path,
    timeout: Timeout,
    config: &mut C,
) -> Result<(), Error> {
    let store = persist::load(config_dir, timeout)?;

    let Ok(account) = store.active_account() else {
        tracing::debug!("no accounts to sync");
        return Ok(());
    };

    apply(account, config)
}

/// Pushes `account`'s credentials into `config`. Absent optional fields are left as they are.
pub fn apply<C: LegacyConfig>(account: &Account, config: &mut C) -> Result<(), Error> {
    config
        .set_access_token(&account.access_token)
        .map_err(|e| Error::apply(Setting::AccessToken, e))?;

    if let Some(metrics_token) = &account.metrics_token {
        config
            .set_metrics_token(metrics_token)
            .map_err(|e| Error::apply(Setting::MetricsToken, e))?;
    }

    if let Some(last_login) = account.last_login {
        config
            .set_last_login(last_login)
            .map_err(|e| Error::apply(Setting::LastLogin, e))?;
    }

    tracing::debug!(email = %account.email, "synced active account to legacy config");

    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Setting {
    AccessToken,
    MetricsToken,
    LastLogin,
}

impl Display for Setting {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AccessToken => "access token",
            Self::MetricsToken => "metrics token",
            Self::LastLogin => "last login",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to load accounts")]
    Load(#[from] persist::load::Error),

    #[error("failed to set the {setting} in the legacy config")]
    Apply {
        setting: Setting,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl Error {
    fn apply<E: std::error::Error + Send + Sync + 'static>(setting: Setting, source: E) -> Self {
        Self::Apply {
            setting,
            source: Box::new(source),
        }
    }
}


use crate::persist;
use crate::Account;
use crate::LegacyConfig;
use crate::LegacyConfigFile;
use crate::Timeout;
use fly_accounts_util::fs;
use std::fmt;
use std::fmt::Display;
use std::fmt::Formatter;
