//! In-process backend implementing every odpady data port.
//!
//! Reports are keyed by [`ReportKey`], so inserting a second row for the same
//! municipality and quarter fails with [`PortError::Conflict`] exactly like the
//! unique constraint of the hosted database.

use std::collections::HashMap;
use std::io::Read;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use log::debug;
use serde::Deserialize;

use odpady_core::{
    CollectionPort, CollectionRecord, DateRange, IdentityPort, Municipality, MunicipalityId,
    MunicipalityPort, PortError, ReportArtifact, ReportKey, ReportListing, ReportStorePort,
    UserId,
};

/// Account known to the store: the token it authenticates with and the
/// municipality it administers, if any.
#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    /// Bearer token accepted for this account.
    pub token: String,
    /// Account identifier.
    pub user: UserId,
    /// Municipality administered by the account.
    #[serde(default)]
    pub municipality: Option<Municipality>,
}

/// Initial contents loaded from JSON.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Seed {
    /// Known accounts.
    #[serde(default)]
    pub accounts: Vec<Account>,
    /// Recorded collections.
    #[serde(default)]
    pub collections: Vec<CollectionRecord>,
}

/// Error raised while loading a [`Seed`].
#[derive(thiserror::Error, Debug)]
#[error("Invalid seed data: {0}")]
pub struct SeedError(#[from] serde_json::Error);

/// Thread-safe in-memory backend.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tokens: RwLock<HashMap<String, UserId>>,
    municipalities: RwLock<HashMap<UserId, Municipality>>,
    collections: RwLock<Vec<CollectionRecord>>,
    reports: RwLock<HashMap<ReportKey, ReportArtifact>>,
}

impl MemoryStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `seed`.
    #[must_use]
    pub fn from_seed(seed: Seed) -> Self {
        let store = Self::new();
        for account in seed.accounts {
            store.add_account(account);
        }
        store.add_collections(seed.collections);
        store
    }

    /// Parse a JSON seed document and build a store from it.
    ///
    /// # Errors
    ///
    /// Returns a [`SeedError`] if the document is not a valid [`Seed`].
    pub fn from_json<R: Read>(reader: R) -> Result<Self, SeedError> {
        let seed: Seed = serde_json::from_reader(reader)?;
        Ok(Self::from_seed(seed))
    }

    /// Builder form of [`Self::add_account`].
    #[must_use]
    pub fn with_account(self, account: Account) -> Self {
        self.add_account(account);
        self
    }

    /// Builder form of [`Self::add_collections`].
    #[must_use]
    pub fn with_collections<I>(self, records: I) -> Self
    where
        I: IntoIterator<Item = CollectionRecord>,
    {
        self.add_collections(records);
        self
    }

    /// Register an account, replacing any previous one with the same token.
    pub fn add_account(&self, account: Account) {
        let Account {
            token,
            user,
            municipality,
        } = account;
        if let Some(municipality) = municipality {
            write(&self.municipalities).insert(user.clone(), municipality);
        }
        write(&self.tokens).insert(token, user);
    }

    /// Record collections.
    pub fn add_collections<I>(&self, records: I)
    where
        I: IntoIterator<Item = CollectionRecord>,
    {
        write(&self.collections).extend(records);
    }

    /// Number of stored report rows.
    #[must_use]
    pub fn report_count(&self) -> usize {
        read(&self.reports).len()
    }
}

// Every write is a single map operation, so a poisoned lock still guards consistent data.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl IdentityPort for MemoryStore {
    async fn authenticate(&self, token: &str) -> Result<UserId, PortError> {
        read(&self.tokens)
            .get(token)
            .cloned()
            .ok_or(PortError::Unauthorized)
    }
}

#[async_trait]
impl MunicipalityPort for MemoryStore {
    async fn municipality_for_user(
        &self,
        user: &UserId,
    ) -> Result<Option<Municipality>, PortError> {
        Ok(read(&self.municipalities).get(user).cloned())
    }
}

#[async_trait]
impl CollectionPort for MemoryStore {
    async fn collections(
        &self,
        municipality: MunicipalityId,
        range: DateRange,
    ) -> Result<Vec<CollectionRecord>, PortError> {
        let mut records: Vec<_> = read(&self.collections)
            .iter()
            .filter(|record| {
                record.municipality == municipality && range.contains(record.collected_on)
            })
            .cloned()
            .collect();
        records.sort_by_key(|record| record.collected_on);
        Ok(records)
    }
}

#[async_trait]
impl ReportStorePort for MemoryStore {
    async fn insert_report(&self, artifact: &ReportArtifact) -> Result<(), PortError> {
        let mut reports = write(&self.reports);
        if reports.contains_key(&artifact.key) {
            return Err(PortError::Conflict);
        }
        reports.insert(artifact.key, artifact.clone());
        debug!("Inserted report row {:?}", artifact.key);
        Ok(())
    }

    async fn update_report(&self, artifact: &ReportArtifact) -> Result<(), PortError> {
        let mut reports = write(&self.reports);
        let stored = reports.get_mut(&artifact.key).ok_or(PortError::NotFound)?;
        stored.clone_from(artifact);
        debug!("Updated report row {:?}", artifact.key);
        Ok(())
    }

    async fn find_report(&self, key: &ReportKey) -> Result<Option<ReportArtifact>, PortError> {
        Ok(read(&self.reports).get(key).cloned())
    }

    async fn list_reports(
        &self,
        municipality: MunicipalityId,
    ) -> Result<Vec<ReportListing>, PortError> {
        let mut listings: Vec<_> = read(&self.reports)
            .values()
            .filter(|artifact| artifact.key.municipality == municipality)
            .map(ReportArtifact::listing)
            .collect();
        listings.sort_by(|left, right| {
            (right.key.year, right.key.quarter).cmp(&(left.key.year, left.key.quarter))
        });
        Ok(listings)
    }
}
