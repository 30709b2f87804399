//! A local, file-backed store of authenticated accounts, exactly one of which is active at a time.
//!
//! Callers [`load`] an [`AccountStore`], change it in memory and [`save`] it whole. Every load
//! and save is guarded by a lock file next to the accounts file, so concurrent invocations never
//! see a torn document. Nothing stops two processes that both loaded the same state from saving
//! over each other: the last save wins.
//!
//! After the active account changes, [`sync_active_account_to_config`] copies its credentials
//! into the single-account `config.yml` for code that only knows about one token.
#![warn(
    clippy::pedantic,
    noop_method_call,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_op_in_unsafe_fn,
    unused_lifetimes,
    unused_qualifications
)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

pub use account::Account;
mod account;

pub use store::AccountNotFound;
pub use store::AccountStore;
pub use store::NoAccounts;
mod store;

pub use persist::load;
pub use persist::save;
pub mod persist;

pub use legacy::LegacyConfig;
pub use legacy::LegacyConfigFile;
pub mod legacy;

pub use sync::sync_active_account;
pub use sync::sync_active_account_to_config;
pub mod sync;

pub use fly_accounts_util::lock::Timeout;

pub const ACCOUNTS_FILE_NAME: &str = "accounts.yml";

pub const ACCOUNTS_LOCK_FILE_NAME: &str = "flyctl.accounts.lock";

#[must_use]
pub fn accounts_file_path(config_dir: &Path) -> PathBuf {
    config_dir.join(ACCOUNTS_FILE_NAME)
}

use std::path::Path;
use std::path::PathBuf;
