//! Zone and Domain Catalogue Ports
//!
//! The resolver never talks to a database directly. It consumes the catalogue through
//! two capability sets:
//!
//! - [`ZoneReader`] - the read-only surface used by the zone cache refresh and by
//!   per-query domain lookups.
//! - [`ZoneStorage`] - a superset with the create/update/delete operations, used only
//!   by provisioning tools.
//!
//! Anything holding a `ZoneReader` is provably unable to mutate the catalogue.

use std::fmt;
use std::time::Duration;

use crate::rr::{AddressError, Domain, DomainID, NewDomain, NewZone, Zone, ZoneID};

/// Which kind of catalogue entry an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Zone,
    Domain,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::Zone => f.write_str("zone"),
            EntryKind::Domain => f.write_str("domain"),
        }
    }
}

/// Error type for catalogue operations
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("{kind} {id} not found")]
    NotFound { kind: EntryKind, id: i64 },

    #[error("conflicting catalogue entry: {0}")]
    Conflict(String),

    #[error(transparent)]
    Address(#[from] AddressError),

    #[error("SQLite: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("encoding address list: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("catalogue did not answer within {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl CatalogError {
    /// Create a new catalog error from any error type
    pub fn new<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        CatalogError::Other(error.into())
    }

    pub(crate) fn zone_not_found(id: ZoneID) -> Self {
        CatalogError::NotFound {
            kind: EntryKind::Zone,
            id: id.get(),
        }
    }

    pub(crate) fn domain_not_found(id: DomainID) -> Self {
        CatalogError::NotFound {
            kind: EntryKind::Domain,
            id: id.get(),
        }
    }

    /// Whether this error reports a missing catalogue entry.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CatalogError::NotFound { .. })
    }
}

/// Read-only access to the zone and domain catalogue
///
/// This is the only storage surface the resolution core depends on.
#[async_trait::async_trait]
pub trait ZoneReader: Send + Sync {
    /// Fetch every zone in the catalogue, ordered by zone identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend fails. Callers must not apply a
    /// partial result.
    async fn fetch_zones(&self) -> Result<Vec<Zone>, CatalogError>;

    /// Look up one domain by exact name.
    ///
    /// The name is passed exactly as given; case sensitivity is up to the backend.
    ///
    /// # Returns
    ///
    /// The domain, or `None` if no domain has this name
    async fn lookup_domain(&self, name: &str) -> Result<Option<Domain>, CatalogError>;
}

/// Read and write access to the catalogue, used by provisioning tools
///
/// Writes go straight to the backend. A running resolver picks zone changes up on its
/// next refresh; domain changes are visible immediately because domains are looked up
/// per query.
#[async_trait::async_trait]
pub trait ZoneStorage: ZoneReader {
    /// Get a single zone by identifier
    async fn get_zone(&self, id: ZoneID) -> Result<Zone, CatalogError>;

    /// Add a new zone, returning it with its assigned identifier
    async fn add_zone(&self, zone: NewZone) -> Result<Zone, CatalogError>;

    /// Replace the name and address lists of an existing zone
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] if no zone has this identifier
    async fn update_zone(&self, zone: &Zone) -> Result<Zone, CatalogError>;

    /// Delete a zone and every domain bound to it
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] if no zone has this identifier
    async fn delete_zone(&self, id: ZoneID) -> Result<(), CatalogError>;

    /// Get a single domain by identifier
    async fn get_domain(&self, id: DomainID) -> Result<Domain, CatalogError>;

    /// Add a new domain bound to an existing zone
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] if the zone does not exist, and
    /// [`CatalogError::Conflict`] if the name is already taken
    async fn add_domain(&self, domain: NewDomain) -> Result<Domain, CatalogError>;

    /// Replace the zone binding, name and text of an existing domain
    async fn update_domain(&self, domain: &Domain) -> Result<Domain, CatalogError>;

    /// Delete a single domain
    async fn delete_domain(&self, id: DomainID) -> Result<(), CatalogError>;
}
