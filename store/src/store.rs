/// The accounts file in memory: every known account in the order it was first added, plus which
/// one is active.
///
/// Emails are unique. Adding or updating an account always makes it the active one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Document")]
pub struct AccountStore {
    #[serde(serialize_with = "active_marker::serialize")]
    active: Option<String>,

    accounts: Vec<Account>,
}

/// The accounts file as written, before a marker left on an empty store is dropped.
#[derive(Deserialize)]
struct Document {
    #[serde(default, deserialize_with = "active_marker::deserialize")]
    active: Option<String>,

    #[serde(default)]
    accounts: Vec<Account>,
}

impl From<Document> for AccountStore {
    fn from(Document { active, accounts }: Document) -> Self {
        let active = active.filter(|_| !accounts.is_empty());
        Self { active, accounts }
    }
}

impl AccountStore {
    /// The raw active marker. It can name an account that no longer exists if the file was edited
    /// by hand; [`Self::active_account`] copes with that.
    #[must_use]
    pub fn active_email(&self) -> Option<&str> {
        self.active.as_deref()
    }

    #[must_use]
    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    #[must_use]
    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    #[must_use]
    pub fn has_accounts(&self) -> bool {
        self.account_count() > 0
    }

    pub fn account(&self, email: &str) -> Result<&Account, AccountNotFound> {
        self.accounts
            .iter()
            .find(|account| account.email == email)
            .ok_or_else(|| AccountNotFound::new(email))
    }

    /// The active account, falling back to the first account when the marker is unset or stale.
    pub fn active_account(&self) -> Result<&Account, NoAccounts> {
        let first = self.accounts.first().ok_or(NoAccounts)?;
        Ok(self
            .active
            .as_deref()
            .and_then(|active| self.account(active).ok())
            .unwrap_or(first))
    }

    /// Whether `email` belongs to the account [`Self::active_account`] resolves to.
    #[must_use]
    pub fn is_active(&self, email: &str) -> bool {
        self.active_account()
            .map_or(false, |account| account.email == email)
    }

    /// Replaces the account with the same email in place, or appends it. Either way it becomes
    /// active.
    pub fn add_or_update_account(&mut self, account: Account) {
        let email = account.email.clone();
        match self
            .accounts
            .iter_mut()
            .find(|existing| existing.email == account.email)
        {
            Some(existing) => *existing = account,
            None => self.accounts.push(account),
        }
        self.active = Some(email);
    }

    /// Removes an account, keeping the others in order. If it was active, the first remaining
    /// account takes over.
    pub fn remove_account(&mut self, email: &str) -> Result<Account, AccountNotFound> {
        let index = self
            .accounts
            .iter()
            .position(|account| account.email == email)
            .ok_or_else(|| AccountNotFound::new(email))?;

        let removed = self.accounts.remove(index);

        if self.accounts.is_empty() || self.active.as_deref() == Some(email) {
            self.active = self.accounts.first().map(|account| account.email.clone());
        }

        Ok(removed)
    }

    pub fn set_active(&mut self, email: &str) -> Result<(), AccountNotFound> {
        let account = self.account(email)?;
        self.active = Some(account.email.clone());
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("account {email} not found")]
pub struct AccountNotFound {
    pub email: String,
}

impl AccountNotFound {
    fn new(email: &str) -> Self {
        Self {
            email: email.to_owned(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("no accounts configured")]
pub struct NoAccounts;

/// On disk, "no active account" is the empty string.
mod active_marker {
    pub(super) fn serialize<S: Serializer>(
        active: &Option<String>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(active.as_deref().unwrap_or(""))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<String>, D::Error> {
        Ok(Option::<String>::deserialize(deserializer)?.filter(|active| !active.is_empty()))
    }

    use serde::Deserialize;
    use serde::Deserializer;
    use serde::Serializer;
}


use crate::Account;
use serde::Deserialize;
use serde::Serialize;
