/// Where the accounts live and how long to wait for their locks.
#[derive(Debug, Clone)]
pub(crate) struct Settings {
    pub(crate) config_dir: fs::PathBuf,
    pub(crate) lock_timeout: Timeout,
}

impl Settings {
    pub(crate) fn load_accounts(&self) -> anyhow::Result<AccountStore> {
        fly_accounts_store::load(&self.config_dir, self.lock_timeout)
            .context("failed to load accounts")
    }

    pub(crate) fn save_accounts(&self, store: &AccountStore) -> anyhow::Result<()> {
        fly_accounts_store::save(&self.config_dir, store, self.lock_timeout)
            .context("failed to save accounts")
    }

    pub(crate) fn sync_config(&self) -> anyhow::Result<()> {
        fly_accounts_store::sync_active_account_to_config(&self.config_dir, self.lock_timeout)
            .context("failed to sync account config")
    }

    pub(crate) fn clear_config(&self) -> anyhow::Result<()> {
        self.create_config_dir()?;
        let mut config = self.legacy_config();
        config
            .clear()
            .with_context(|| format!("failed to clear config file at {}", config.path().display()))
    }

    pub(crate) fn legacy_config(&self) -> LegacyConfigFile {
        LegacyConfigFile::in_dir(&self.config_dir, self.lock_timeout)
    }

    pub(crate) fn create_config_dir(&self) -> anyhow::Result<()> {
        fs::create_dir_all(&self.config_dir)?;
        Ok(())
    }
}


use anyhow::Context as _;
use fly_accounts_store::AccountStore;
use fly_accounts_store::LegacyConfigFile;
use fly_accounts_store::Timeout;
use fly_accounts_util::fs;
