//! Bundle of ports implementing one data backend.

use std::sync::Arc;

use crate::ports::{CollectionPort, IdentityPort, MunicipalityPort, ReportStorePort};

/// Collection of ports the report service talks to.
#[derive(Clone)]
pub struct Backend {
    /// Token validation.
    pub identity: Arc<dyn IdentityPort>,
    /// Municipality lookup.
    pub municipalities: Arc<dyn MunicipalityPort>,
    /// Collection records.
    pub collections: Arc<dyn CollectionPort>,
    /// Stored reports.
    pub reports: Arc<dyn ReportStorePort>,
}

impl Backend {
    /// Use one value implementing every port for all of them.
    #[must_use]
    pub fn from_shared<T>(store: Arc<T>) -> Self
    where
        T: IdentityPort + MunicipalityPort + CollectionPort + ReportStorePort + 'static,
    {
        Self {
            identity: Arc::<T>::clone(&store),
            municipalities: Arc::<T>::clone(&store),
            collections: Arc::<T>::clone(&store),
            reports: store,
        }
    }
}
