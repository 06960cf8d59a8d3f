//! Traits describing the backend collaborators and report encoders.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::document::ReportDocument;
use crate::model::{
    ArtifactFormat, CollectionRecord, DateRange, Municipality, MunicipalityId, ReportArtifact,
    ReportKey, ReportListing, UserId,
};

#[derive(thiserror::Error, Debug)]
/// Errors that can occur while talking to backend services.
pub enum PortError {
    /// Identity token missing, expired, or rejected.
    #[error("Unauthorized")]
    Unauthorized,
    /// Network layer failed.
    #[error("Network error: {0}")]
    Network(String),
    /// Backend answered with a payload that could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),
    /// A row with the same unique key already exists.
    #[error("Unique key conflict")]
    Conflict,
    /// The row to update does not exist.
    #[error("Row not found")]
    NotFound,
    /// Internal backend error.
    #[error("Internal error: {0}")]
    Internal(String),
}

#[async_trait]
/// Resolves caller tokens to accounts.
pub trait IdentityPort: Send + Sync {
    /// Validate a bearer token and return the account it belongs to.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::Unauthorized`] for invalid tokens, or another
    /// [`PortError`] when the identity provider cannot be reached.
    async fn authenticate(&self, token: &str) -> Result<UserId, PortError>;
}

#[async_trait]
/// Read access to municipality records.
pub trait MunicipalityPort: Send + Sync {
    /// Municipality administered by the given account, if any.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the data store request fails.
    async fn municipality_for_user(&self, user: &UserId)
    -> Result<Option<Municipality>, PortError>;
}

#[async_trait]
/// Read access to recorded waste collections.
pub trait CollectionPort: Send + Sync {
    /// Collections of one municipality dated within `range` (inclusive).
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the data store request fails.
    async fn collections(
        &self,
        municipality: MunicipalityId,
        range: DateRange,
    ) -> Result<Vec<CollectionRecord>, PortError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// What an upsert did.
pub enum UpsertOutcome {
    /// A new row was created.
    Inserted,
    /// An existing row was overwritten.
    Updated,
}

#[async_trait]
/// Persistence of generated reports, at most one row per [`ReportKey`].
pub trait ReportStorePort: Send + Sync {
    /// Insert a new row.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::Conflict`] if a row with the same key exists.
    async fn insert_report(&self, artifact: &ReportArtifact) -> Result<(), PortError>;

    /// Overwrite payloads and timestamp of an existing row.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::NotFound`] if no row with the key exists.
    async fn update_report(&self, artifact: &ReportArtifact) -> Result<(), PortError>;

    /// Insert the row, or overwrite it when the key already exists.
    ///
    /// The provided implementation inserts first and falls back to an update
    /// when the unique key rejects the insert, so concurrent writers for the
    /// same key never create a second row. Stores with a native upsert
    /// primitive should override it.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when either write fails.
    async fn upsert_report(&self, artifact: &ReportArtifact) -> Result<UpsertOutcome, PortError> {
        match self.insert_report(artifact).await {
            Ok(()) => Ok(UpsertOutcome::Inserted),
            Err(PortError::Conflict) => {
                self.update_report(artifact).await?;
                Ok(UpsertOutcome::Updated)
            }
            Err(err) => Err(err),
        }
    }

    /// Load one stored report.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the data store request fails.
    async fn find_report(&self, key: &ReportKey) -> Result<Option<ReportArtifact>, PortError>;

    /// Stored reports of one municipality, newest period first.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the data store request fails.
    async fn list_reports(
        &self,
        municipality: MunicipalityId,
    ) -> Result<Vec<ReportListing>, PortError>;
}

/// Source of the generation timestamp.
pub trait Clock: Send + Sync {
    /// Current instant in UTC.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(thiserror::Error, Debug)]
/// Failure while rendering one artifact.
pub enum EncodeError {
    /// Writing the payload failed.
    #[error("Failed to write {format} artifact: {message}")]
    Write {
        /// Format being written.
        format: ArtifactFormat,
        /// Underlying error message.
        message: String,
    },
    /// A text encoder produced bytes that are not UTF-8.
    #[error("{0} artifact is not valid UTF-8")]
    InvalidUtf8(ArtifactFormat),
}

/// Renders a [`ReportDocument`] into one artifact format.
pub trait ReportEncoder: Send + Sync {
    /// Format produced by this encoder.
    fn format(&self) -> ArtifactFormat;

    /// Render the document.
    ///
    /// # Errors
    ///
    /// Returns an [`EncodeError`] when the payload cannot be written.
    fn encode(&self, document: &ReportDocument<'_>) -> Result<Vec<u8>, EncodeError>;
}
