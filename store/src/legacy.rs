//! The single-account `config.yml` that predates the accounts file.
//!
//! Only the credential keys are owned here. Everything else in the file belongs to other code
//! and is carried through untouched.

/// Where the active account's credentials get copied to.
pub trait LegacyConfig {
    type Error: std::error::Error + Send + Sync + 'static;

    fn set_access_token(&mut self, token: &str) -> Result<(), Self::Error>;

    fn set_metrics_token(&mut self, token: &str) -> Result<(), Self::Error>;

    fn set_last_login(&mut self, at: DateTime<Utc>) -> Result<(), Self::Error>;
}

pub const FILE_NAME: &str = "config.yml";

pub const LOCK_FILE_NAME: &str = "flyctl.config.lock";

pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const METRICS_TOKEN_KEY: &str = "metrics_token";
pub const LAST_LOGIN_KEY: &str = "last_login";

#[derive(Debug, Clone)]
pub struct LegacyConfigFile {
    path: fs::PathBuf,
    lock_path: fs::PathBuf,
    timeout: Timeout,
}

impl LegacyConfigFile {
    #[must_use]
    pub fn in_dir(config_dir: &fs::Path, timeout: Timeout) -> Self {
        Self {
            path: config_dir.join(FILE_NAME),
            lock_path: config_dir.join(LOCK_FILE_NAME),
            timeout,
        }
    }

    #[must_use]
    pub fn path(&self) -> &fs::Path {
        &self.path
    }

    /// Forgets the stored credentials, as when the last account logs out.
    pub fn clear(&mut self) -> Result<(), Error> {
        self.update(|document| {
            for key in [ACCESS_TOKEN_KEY, METRICS_TOKEN_KEY, LAST_LOGIN_KEY] {
                document.remove(key);
            }
        })
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), Error> {
        self.update(|document| {
            document.insert(Value::from(key), Value::from(value));
        })
    }

    fn update<F: FnOnce(&mut Mapping)>(&self, f: F) -> Result<(), Error> {
        let guard = lock::exclusive(&self.lock_path, self.timeout)?;
        let updated = self.update_locked(f);
        let released = guard.release();
        updated?;
        released?;
        Ok(())
    }

    fn update_locked<F: FnOnce(&mut Mapping)>(&self, f: F) -> Result<(), Error> {
        let mut document = match fs::read(&*self.path) {
            Ok(bytes) => decode(&bytes).map_err(|source| Error::Decode {
                path: self.path.as_path().into(),
                source,
            })?,
            Err(e) if e.is_not_found() => Mapping::new(),
            Err(e) => return Err(e.into()),
        };

        f(&mut document);

        let contents = serde_yaml::to_string(&document).map_err(Error::Encode)?;
        fs::overwrite::with(&*self.path, contents.as_bytes(), 0o600)?;
        Ok(())
    }
}

impl LegacyConfig for LegacyConfigFile {
    type Error = Error;

    fn set_access_token(&mut self, token: &str) -> Result<(), Self::Error> {
        self.set(ACCESS_TOKEN_KEY, token.to_owned())
    }

    fn set_metrics_token(&mut self, token: &str) -> Result<(), Self::Error> {
        self.set(METRICS_TOKEN_KEY, token.to_owned())
    }

    fn set_last_login(&mut self, at: DateTime<Utc>) -> Result<(), Self::Error> {
        self.set(LAST_LOGIN_KEY, at.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }
}

fn decode(bytes: &[u8]) -> Result<Mapping, serde_yaml::Error> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Mapping::new());
    }
    Ok(serde_yaml::from_slice::<Option<Mapping>>(bytes)?.unwrap_or_default())
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to lock the config file")]
    Lock(#[from] lock::Error),

    #[error("failed to read the config file")]
    Read(#[from] fs::read::Error),

    #[error("{} is not a valid config file", path.display())]
    Decode {
        path: Box<fs::Path>,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to encode the config file")]
    Encode(#[source] serde_yaml::Error),

    #[error("failed to write the config file")]
    Write(#[from] fs::overwrite::WithError),
}

#[cfg(test)]
mod tests {
    fn read_document(config: &LegacyConfigFile) -> Mapping {
        serde_yaml::from_slice(&std::fs::read(config.path()).unwrap()).unwrap()
    }

    fn get<'document>(document: &'document Mapping, key: &str) -> Option<&'document str> {
        document.get(key).and_then(Value::as_str)
    }

    #[test]
    fn setters_create_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = LegacyConfigFile::in_dir(dir.path(), SHORT);

        config.set_access_token("fo1_token").unwrap();
        config.set_metrics_token("metrics").unwrap();
        config
            .set_last_login(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap())
            .unwrap();

        let document = read_document(&config);
        assert_eq!(get(&document, ACCESS_TOKEN_KEY), Some("fo1_token"));
        assert_eq!(get(&document, METRICS_TOKEN_KEY), Some("metrics"));
        assert_eq!(
            get(&document, LAST_LOGIN_KEY),
            Some("2024-01-02T03:04:05Z")
        );

        let mode = std::fs::metadata(config.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn unrelated_keys_survive() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(FILE_NAME),
            "access_token: old\nauto_update: true\nwire_guard_state:\n  peer: x\n",
        )
        .unwrap();
        let mut config = LegacyConfigFile::in_dir(dir.path(), SHORT);

        config.set_access_token("new").unwrap();

        let document = read_document(&config);
        assert_eq!(get(&document, ACCESS_TOKEN_KEY), Some("new"));
        assert_eq!(document.get("auto_update"), Some(&Value::Bool(true)));
        assert!(document.get("wire_guard_state").unwrap().is_mapping());
    }

    #[test]
    fn clear_removes_only_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = LegacyConfigFile::in_dir(dir.path(), SHORT);
        config.set_access_token("t").unwrap();
        config.set_metrics_token("m").unwrap();
        config.set("auto_update", "yes".to_owned()).unwrap();

        config.clear().unwrap();

        let document = read_document(&config);
        assert_eq!(get(&document, ACCESS_TOKEN_KEY), None);
        assert_eq!(get(&document, METRICS_TOKEN_KEY), None);
        assert_eq!(get(&document, "auto_update"), Some("yes"));
    }

    #[test]
    fn blank_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(FILE_NAME), "").unwrap();
        let mut config = LegacyConfigFile::in_dir(dir.path(), SHORT);

        config.set_access_token("t").unwrap();

        assert_eq!(read_document(&config).len(), 1);
    }

    #[test]
    fn malformed_file_is_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(FILE_NAME), "- not\n- a mapping\n").unwrap();
        let mut config = LegacyConfigFile::in_dir(dir.path(), SHORT);

        let e = config.set_access_token("t").unwrap_err();
        assert!(matches!(e, Error::Decode { .. }), "{e:?}");
        assert_eq!(
            std::fs::read_to_string(config.path()).unwrap(),
            "- not\n- a mapping\n"
        );
    }

    #[test]
    fn contended_lock_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let _held = lock::exclusive(&dir.path().join(LOCK_FILE_NAME), SHORT).unwrap();
        let mut config = LegacyConfigFile::in_dir(dir.path(), SHORT);

        let e = config.set_access_token("t").unwrap_err();
        assert!(matches!(&e, Error::Lock(e) if e.is_timeout()), "{e:?}");
        assert!(!config.path().exists());
    }

    const SHORT: Timeout = Timeout::After(Duration::from_millis(50));

    use super::Error;
    use super::LegacyConfig as _;
    use super::LegacyConfigFile;
    use super::ACCESS_TOKEN_KEY;
    use super::FILE_NAME;
    use super::LAST_LOGIN_KEY;
    use super::LOCK_FILE_NAME;
    use super::METRICS_TOKEN_KEY;
    use crate::Timeout;
    use chrono::TimeZone as _;
    use chrono::Utc;
    use fly_accounts_util::lock;
    use serde_yaml::Mapping;
    use serde_yaml::Value;
    use std::os::unix::fs::PermissionsExt as _;
    use std::time::Duration;
}

use crate::Timeout;
use chrono::DateTime;
use chrono::SecondsFormat;
use chrono::Utc;
use fly_accounts_util::fs;
use fly_accounts_util::lock;
use serde_yaml::Mapping;
use serde_yaml::Value;
