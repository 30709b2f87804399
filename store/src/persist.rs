//! Reading and writing the accounts file.
//!
//! One lock file per config directory guards the whole document: shared while loading,
//! exclusive while saving. Saves replace the file atomically and only the owner can read it.

/// Loads the accounts file in `config_dir`. A missing file is an empty store, not an error.
pub fn load(config_dir: &fs::Path, timeout: Timeout) -> Result<AccountStore, load::Error> {
    let path = crate::accounts_file_path(config_dir);

    if let Ok(false) = path.try_exists() {
        tracing::debug!(path = %path.display(), "no accounts file yet");
        return Ok(AccountStore::default());
    }

    let guard = lock::shared(&lock_path(config_dir), timeout)?;
    let read = fs::read(&*path);
    let released = guard.release();

    let bytes = match read {
        Ok(bytes) => bytes,
        Err(e) if e.is_not_found() => return Ok(AccountStore::default()),
        Err(e) => return Err(e.into()),
    };
    released?;

    let store = decode(&bytes).map_err(|source| load::Error::Decode {
        path: path.as_path().into(),
        source,
    })?;

    tracing::debug!(
        path = %path.display(),
        accounts = store.account_count(),
        "loaded accounts"
    );

    Ok(store)
}

fn decode(bytes: &[u8]) -> Result<AccountStore, serde_yaml::Error> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(AccountStore::default());
    }
    serde_yaml::from_slice(bytes)
}

pub mod load {
    #[derive(Debug, thiserror::Error)]
    pub enum Error {
        #[error("failed to lock the accounts file")]
        Lock(#[from] lock::Error),

        #[error("failed to read the accounts file")]
        Read(#[from] fs::read::Error),

        #[error("{} is not a valid accounts file", path.display())]
        Decode {
            path: Box<fs::Path>,
            #[source]
            source: serde_yaml::Error,
        },
    }

    impl Error {
        #[must_use]
        pub fn is_lock_timeout(&self) -> bool {
            matches!(self, Self::Lock(e) if e.is_timeout())
        }
    }

    use fly_accounts_util::fs;
    use fly_accounts_util::lock;
}

/// Replaces the accounts file in `config_dir` with `store`. The directory must exist.
pub fn save(
    config_dir: &fs::Path,
    store: &AccountStore,
    timeout: Timeout,
) -> Result<(), save::Error> {
    let path = crate::accounts_file_path(config_dir);
    let contents = serde_yaml::to_string(store).map_err(save::Error::Encode)?;

    let guard = lock::exclusive(&lock_path(config_dir), timeout)?;
    let written = fs::overwrite::with(&*path, contents.as_bytes(), 0o600);
    let released = guard.release();
    written?;
    released?;

    tracing::debug!(
        path = %path.display(),
        accounts = store.account_count(),
        active = store.active_email().unwrap_or_default(),
        "saved accounts"
    );

    Ok(())
}

pub mod save {
    #[derive(Debug, thiserror::Error)]
    pub enum Error {
        #[error("failed to encode the accounts file")]
        Encode(#[source] serde_yaml::Error),

        #[error("failed to lock the accounts file")]
        Lock(#[from] lock::Error),

        #[error("failed to write the accounts file")]
        Write(#[from] fs::overwrite::WithError),
    }

    impl Error {
        #[must_use]
        pub fn is_lock_timeout(&self) -> bool {
            matches!(self, Self::Lock(e) if e.is_timeout())
        }
    }

    use fly_accounts_util::fs;
    use fly_accounts_util::lock;
}

fn lock_path(config_dir: &fs::Path) -> fs::PathBuf {
    config_dir.join(crate::ACCOUNTS_LOCK_FILE_NAME)
}

#[cfg(test)]
mod tests {
    fn sample() -> AccountStore {
        let mut store = AccountStore::default();
        store.add_or_update_account(
            Account::new("user1@example.com", "token1")
                .with_metrics_token("metrics1")
                .with_last_login(Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap()),
        );
        store.add_or_update_account(Account::new("user2@example.com", "token2"));
        store.set_active("user1@example.com").unwrap();
        store
    }

    #[test]
    fn round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = sample();

        persist::save(dir.path(), &store, SHORT).unwrap();
        let loaded = persist::load(dir.path(), SHORT).unwrap();

        assert_eq!(loaded, store);
        assert_eq!(loaded.active_email(), Some("user1@example.com"));
        assert_eq!(loaded.accounts(), store.accounts());
    }

    #[test]
    fn round_trip_of_empty_store() {
        let dir = tempfile::tempdir().unwrap();

        persist::save(dir.path(), &AccountStore::default(), SHORT).unwrap();
        let loaded = persist::load(dir.path(), SHORT).unwrap();

        assert!(!loaded.has_accounts());
        assert_eq!(loaded.active_email(), None);
    }

    #[test]
    fn missing_file_is_an_empty_store() {
        let dir = tempfile::tempdir().unwrap();

        let store = persist::load(dir.path(), SHORT).unwrap();
        assert_eq!(store.account_count(), 0);
        assert!(!store.has_accounts());

        let store = persist::load(&dir.path().join("never-created"), SHORT).unwrap();
        assert!(!store.has_accounts());
    }

    #[test]
    fn blank_file_is_an_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(ACCOUNTS_FILE_NAME), "\n  \n").unwrap();

        assert!(!persist::load(dir.path(), SHORT).unwrap().has_accounts());
    }

    #[test]
    fn malformed_file_fails_to_decode() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(ACCOUNTS_FILE_NAME), "accounts: [email: {").unwrap();

        let e = persist::load(dir.path(), SHORT).unwrap_err();
        assert!(matches!(e, load::Error::Decode { .. }), "{e:?}");
    }

    #[test]
    fn reads_files_written_by_older_versions() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(ACCOUNTS_FILE_NAME),
            "\
active: b@example.com
accounts:
    - email: a@example.com
      access_token: fo1_a
      last_login: 2024-02-03T04:05:06.123456789+01:00
    - email: b@example.com
      access_token: fo1_b
      metrics_token: \"\"
",
        )
        .unwrap();

        let store = persist::load(dir.path(), SHORT).unwrap();

        assert_eq!(store.active_account().unwrap().email, "b@example.com");
        let a = store.account("a@example.com").unwrap();
        assert_eq!(
            a.last_login,
            Some(
                Utc.with_ymd_and_hms(2024, 2, 3, 3, 5, 6).unwrap()
                    + chrono::Duration::nanoseconds(123_456_789)
            )
        );
        assert_eq!(store.account("b@example.com").unwrap().metrics_token, None);
    }

    #[test]
    fn saved_file_is_private() {
        let dir = tempfile::tempdir().unwrap();

        persist::save(dir.path(), &sample(), SHORT).unwrap();

        let metadata = std::fs::metadata(dir.path().join(ACCOUNTS_FILE_NAME)).unwrap();
        assert_eq!(metadata.permissions().mode() & 0o777, 0o600);
    }

    #[test]
    fn save_replaces_the_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        persist::save(dir.path(), &sample(), SHORT).unwrap();

        let mut store = AccountStore::default();
        store.add_or_update_account(Account::new("only@example.com", "t"));
        persist::save(dir.path(), &store, SHORT).unwrap();

        let text = std::fs::read_to_string(dir.path().join(ACCOUNTS_FILE_NAME)).unwrap();
        assert!(!text.contains("user1"));
        assert_eq!(persist::load(dir.path(), SHORT).unwrap(), store);
    }

    #[test]
    fn save_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");

        assert!(persist::save(&missing, &sample(), SHORT).is_err());
    }

    #[test]
    fn writer_blocks_readers_and_writers() {
        let dir = tempfile::tempdir().unwrap();
        persist::save(dir.path(), &sample(), SHORT).unwrap();
        let before = std::fs::read(dir.path().join(ACCOUNTS_FILE_NAME)).unwrap();

        let held = lock::exclusive(&dir.path().join(ACCOUNTS_LOCK_FILE_NAME), SHORT).unwrap();

        let e = persist::load(dir.path(), SHORT).unwrap_err();
        assert!(e.is_lock_timeout(), "{e:?}");
        let e = persist::save(dir.path(), &AccountStore::default(), SHORT).unwrap_err();
        assert!(e.is_lock_timeout(), "{e:?}");

        let after = std::fs::read(dir.path().join(ACCOUNTS_FILE_NAME)).unwrap();
        assert_eq!(before, after);

        held.release().unwrap();
        persist::load(dir.path(), SHORT).unwrap();
    }

    #[test]
    fn readers_share_the_lock() {
        let dir = tempfile::tempdir().unwrap();
        persist::save(dir.path(), &sample(), SHORT).unwrap();

        let _reader = lock::shared(&dir.path().join(ACCOUNTS_LOCK_FILE_NAME), SHORT).unwrap();

        assert_eq!(persist::load(dir.path(), SHORT).unwrap(), sample());
        assert!(persist::save(dir.path(), &sample(), SHORT)
            .unwrap_err()
            .is_lock_timeout());
    }

    #[test]
    fn last_writer_wins() {
        let dir = tempfile::tempdir().unwrap();
        persist::save(dir.path(), &sample(), SHORT).unwrap();

        let mut first = persist::load(dir.path(), SHORT).unwrap();
        let mut second = persist::load(dir.path(), SHORT).unwrap();

        first.add_or_update_account(Account::new("first@example.com", "t"));
        second.remove_account("user2@example.com").unwrap();

        persist::save(dir.path(), &first, SHORT).unwrap();
        persist::save(dir.path(), &second, SHORT).unwrap();

        let loaded = persist::load(dir.path(), SHORT).unwrap();
        assert_eq!(loaded, second);
        assert!(loaded.account("first@example.com").is_err());
    }

    const SHORT: Timeout = Timeout::After(Duration::from_millis(50));

    use super::load;
    use crate::persist;
    use crate::Account;
    use crate::AccountStore;
    use crate::Timeout;
    use crate::ACCOUNTS_FILE_NAME;
    use crate::ACCOUNTS_LOCK_FILE_NAME;
    use chrono::TimeZone as _;
    use chrono::Utc;
    use fly_accounts_util::lock;
    use std::os::unix::fs::PermissionsExt as _;
    use std::time::Duration;
}

use crate::AccountStore;
use crate::Timeout;
use fly_accounts_util::fs;
use fly_accounts_util::lock;
