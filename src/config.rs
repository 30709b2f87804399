pub(crate) fn load(config_dir: &fs::Path) -> anyhow::Result<Config> {
    load_inner(config_dir).context("failed to load config file")
}

fn load_inner(config_dir: &fs::Path) -> anyhow::Result<Config> {
    let path = config_dir.join("config.toml");

    let bytes = match fs::read(&*path) {
        Ok(bytes) => bytes,
        Err(e) if e.is_not_found() => return Ok(Config::default()),
        Err(e) => return Err(e.into()),
    };

    let config = toml::from_slice::<Config>(&*bytes)
        .with_context(|| format!("{} is invalid", path.display()))?;

    Ok(config)
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Config {
    #[serde(
        default = "default_lock_timeout",
        deserialize_with = "lock_timeout::deserialize"
    )]
    pub(crate) lock_timeout: Timeout,

    /// Overrides the directory holding the accounts file.
    #[serde(default)]
    pub(crate) config_dir: Option<fs::PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            lock_timeout: default_lock_timeout(),
            config_dir: None,
        }
    }
}

fn default_lock_timeout() -> Timeout {
    Timeout::After(Duration::from_secs(10))
}

mod lock_timeout {
    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Timeout, D::Error> {
        deserializer.deserialize_str(Visitor)
    }

    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Timeout;
        fn expecting(&self, f: &mut Formatter<'_>) -> fmt::Result {
            f.write_str("a duration or `never`")
        }
        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            parse(v).ok_or_else(|| de::Error::invalid_value(de::Unexpected::Str(v), &self))
        }
    }

    fn parse(s: &str) -> Option<Timeout> {
        let s = s.trim();

        if s.eq_ignore_ascii_case("never") {
            return Some(Timeout::Never);
        }

        let multiplier = match s.chars().last()? {
            'h' => 60 * 60,
            'm' => 60,
            's' => 1,
            _ => return None,
        };

        let number = s[..s.len() - 1].parse::<u64>().ok()?;

        let seconds = number.checked_mul(multiplier)?;

        Some(Timeout::After(Duration::from_secs(seconds)))
    }

    #[test]
    fn test_parse() {
        assert_eq!(parse(""), None);
        assert_eq!(parse("  "), None);
        assert_eq!(parse("s"), None);
        assert_eq!(parse("10"), None);
        assert_eq!(parse("-1s"), None);
        assert_eq!(parse(" NeVEr "), Some(Timeout::Never));
        assert_eq!(parse("0s"), Some(Timeout::After(Duration::ZERO)));
        assert_eq!(parse("45s"), Some(Timeout::After(Duration::from_secs(45))));
        assert_eq!(
            parse("2m"),
            Some(Timeout::After(Duration::from_secs(2 * 60)))
        );
        assert_eq!(
            parse("\t1h\t"),
            Some(Timeout::After(Duration::from_secs(60 * 60)))
        );
    }

    use fly_accounts_store::Timeout;
    use serde::de;
    use serde::Deserializer;
    use std::fmt;
    use std::fmt::Formatter;
    use std::time::Duration;
}


use anyhow::Context as _;
use fly_accounts_store::Timeout;
use fly_accounts_util::fs;
use serde::Deserialize;
use std::time::Duration;
