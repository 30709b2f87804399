/// One authenticated identity. Token fields are wiped from memory when the value is dropped.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct Account {
    pub email: String,

    pub access_token: String,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "non_empty"
    )]
    pub metrics_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[zeroize(skip)]
    pub last_login: Option<DateTime<Utc>>,
}

impl Account {
    #[must_use]
    pub fn new(email: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            access_token: access_token.into(),
            metrics_token: None,
            last_login: None,
        }
    }

    #[must_use]
    pub fn with_metrics_token(mut self, metrics_token: impl Into<String>) -> Self {
        self.metrics_token = Some(metrics_token.into());
        self
    }

    #[must_use]
    pub fn with_last_login(mut self, last_login: DateTime<Utc>) -> Self {
        self.last_login = Some(last_login);
        self
    }
}

impl Debug for Account {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("email", &self.email)
            .field("access_token", &"<redacted>")
            .field(
                "metrics_token",
                &self.metrics_token.as_ref().map(|_| "<redacted>"),
            )
            .field("last_login", &self.last_login)
            .finish()
    }
}

/// Older writers store an absent token as an empty string.
fn non_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.filter(|s| !s.is_empty()))
}

#[cfg(test)]
mod tests {
    #[test]
    fn empty_metrics_token_reads_as_absent() {
        let account: Account =
            serde_yaml::from_str("email: a@example.com\naccess_token: t\nmetrics_token: \"\"\n")
                .unwrap();
        assert_eq!(account.metrics_token, None);
        assert_eq!(account.last_login, None);
    }

    #[test]
    fn absent_optionals_are_not_written() {
        let yaml = serde_yaml::to_string(&Account::new("a@example.com", "t")).unwrap();
        assert_eq!(yaml, "email: a@example.com\naccess_token: t\n");
    }

    #[test]
    fn last_login_accepts_any_offset() {
        let account: Account = serde_yaml::from_str(
            "email: a@example.com\naccess_token: t\nlast_login: 2024-03-01T10:00:00.5-07:00\n",
        )
        .unwrap();
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 17, 0, 0).unwrap()
            + chrono::Duration::milliseconds(500);
        assert_eq!(account.last_login, Some(expected));
    }

    #[test]
    fn debug_output_hides_tokens() {
        let account = Account::new("a@example.com", "secret-access").with_metrics_token("secret-m");
        let debug = format!("{account:?}");
        assert!(debug.contains("a@example.com"));
        assert!(!debug.contains("secret"));
    }

    use super::Account;
    use chrono::TimeZone as _;
    use chrono::Utc;
}

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use std::fmt;
use std::fmt::Debug;
use std::fmt::Formatter;
use zeroize::Zeroize;
use zeroize::ZeroizeOnDrop;
