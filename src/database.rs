//! SQLite catalogue backend
//!
//! [`SqliteStore`] implements both [`ZoneReader`] and [`ZoneStorage`] over a single
//! SQLite connection. Zones keep their address lists as JSON arrays of literals;
//! domains reference zones with a cascading foreign key, so deleting a zone deletes
//! its domains.

use std::sync::{Arc, Mutex};

use rusqlite::{Connection, ErrorCode, Transaction};

use crate::catalog::{CatalogError, ZoneReader, ZoneStorage};
use crate::config::SqliteConfiguration;
use crate::rr::{Domain, DomainID, NewDomain, NewZone, Zone, ZoneID};

use self::domain::DomainPersistence;
use self::zone::ZonePersistence;

mod domain;
mod zone;

pub(crate) trait FromRow {
    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self>
    where
        Self: Sized;
}

/// Schema migrations, applied in order and tracked with `PRAGMA user_version`.
const MIGRATIONS: [&str; 1] = [include_str!("migrations/01.zonedns.sql")];

#[tracing::instrument(skip_all, level = "debug")]
fn migrate(connection: &mut Connection) -> rusqlite::Result<()> {
    connection.pragma_update(None, "foreign_keys", true)?;

    let version: i64 = connection.pragma_query_value(None, "user_version", |row| row.get(0))?;
    let applied = usize::try_from(version).unwrap_or(0);

    let tx = connection.transaction()?;
    for (idx, migration) in MIGRATIONS.iter().enumerate().skip(applied) {
        tracing::debug!("applying migration {}", idx + 1);
        tx.execute_batch(migration)?;
    }
    tx.pragma_update(None, "user_version", MIGRATIONS.len().max(applied) as i64)?;
    tx.commit()
}

struct QueryBuilder<const N: usize> {
    table: &'static str,
    columns: [&'static str; N],
    primary: &'static str,
}

impl<const N: usize> QueryBuilder<N> {
    fn select(&self, filters: &str) -> String {
        let columns = self.columns.join(", ");
        format!(
            "SELECT {columns} FROM {table} {filters}",
            table = self.table
        )
    }

    fn values(&self) -> impl Iterator<Item = &&'static str> {
        self.columns.iter().filter(|&&c| c != self.primary)
    }

    fn insert(&self) -> String {
        let columns = self.values().copied().collect::<Vec<_>>().join(", ");
        let params = self
            .values()
            .map(|c| format!(":{c}"))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "INSERT INTO {table} ({columns}) VALUES ({params})",
            table = self.table
        )
    }

    fn update(&self) -> String {
        let assignments = self
            .values()
            .map(|c| format!("{c}=:{c}"))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "UPDATE {table} SET {assignments} WHERE {primary}=:{primary}",
            table = self.table,
            primary = self.primary
        )
    }

    fn delete(&self) -> String {
        format!(
            "DELETE FROM {table} WHERE {primary}=:{primary}",
            table = self.table,
            primary = self.primary
        )
    }
}

/// Translate unique-constraint failures into catalogue conflicts.
fn conflict(error: rusqlite::Error, what: impl FnOnce() -> String) -> CatalogError {
    match &error {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == ErrorCode::ConstraintViolation =>
        {
            CatalogError::Conflict(what())
        }
        _ => CatalogError::Database(error),
    }
}

/// Run blocking database work without stalling a multi-threaded runtime.
fn block_in_place<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    use tokio::runtime::{Handle, RuntimeFlavor};

    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(f)
        }
        _ => f(),
    }
}

/// SqliteStore is a catalogue implementation that uses SQLite as the backend for zones and domains
#[derive(Debug, Clone)]
pub struct SqliteStore {
    connection: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Wrap an open connection, applying any pending migrations.
    pub fn new(mut connection: Connection) -> rusqlite::Result<Self> {
        migrate(&mut connection)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Creates a new SqliteStore instance from a configuration.
    pub fn new_from_config(config: &SqliteConfiguration) -> rusqlite::Result<Self> {
        let connection = if let Some(path) = config.path() {
            tracing::debug!(%path, "opening catalogue database");
            Connection::open(path)?
        } else {
            Connection::open_in_memory()?
        };

        Self::new(connection)
    }

    /// Creates a new SqliteStore instance from an in-memory database.
    pub fn new_in_memory() -> rusqlite::Result<Self> {
        Self::new(Connection::open_in_memory()?)
    }

    fn transaction<T, F>(&self, f: F) -> Result<T, CatalogError>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, CatalogError>,
    {
        block_in_place(|| {
            let mut conn = self.connection.lock().expect("connection poisoned");
            let tx = conn.transaction()?;
            let value = f(&tx)?;
            tx.commit()?;
            Ok(value)
        })
    }
}

#[async_trait::async_trait]
impl ZoneReader for SqliteStore {
    #[tracing::instrument(skip_all, level = "debug")]
    async fn fetch_zones(&self) -> Result<Vec<Zone>, CatalogError> {
        self.transaction(|tx| {
            let zones = ZonePersistence::new(tx).all()?;
            tracing::debug!("fetched {n} zones", n = zones.len());
            Ok(zones)
        })
    }

    #[tracing::instrument(skip_all, fields(%name), level = "debug")]
    async fn lookup_domain(&self, name: &str) -> Result<Option<Domain>, CatalogError> {
        self.transaction(|tx| Ok(DomainPersistence::new(tx).lookup(name)?))
    }
}

#[async_trait::async_trait]
impl ZoneStorage for SqliteStore {
    #[tracing::instrument(skip_all, fields(zone=%id), level = "debug")]
    async fn get_zone(&self, id: ZoneID) -> Result<Zone, CatalogError> {
        self.transaction(|tx| {
            ZonePersistence::new(tx)
                .get(id)?
                .ok_or_else(|| CatalogError::zone_not_found(id))
        })
    }

    #[tracing::instrument(skip_all, fields(zone=%zone.name), level = "debug")]
    async fn add_zone(&self, zone: NewZone) -> Result<Zone, CatalogError> {
        self.transaction(|tx| {
            let id = ZonePersistence::new(tx).insert(&zone)?;
            tracing::debug!("added zone {id}");
            Ok(zone.into_zone(id))
        })
    }

    #[tracing::instrument(skip_all, fields(zone=%zone.id()), level = "debug")]
    async fn update_zone(&self, zone: &Zone) -> Result<Zone, CatalogError> {
        self.transaction(|tx| {
            let zx = ZonePersistence::new(tx);
            if zx.update(zone)? == 0 {
                return Err(CatalogError::zone_not_found(zone.id()));
            }
            zx.get(zone.id())?
                .ok_or_else(|| CatalogError::zone_not_found(zone.id()))
        })
    }

    #[tracing::instrument(skip_all, fields(zone=%id), level = "debug")]
    async fn delete_zone(&self, id: ZoneID) -> Result<(), CatalogError> {
        self.transaction(|tx| {
            let n = ZonePersistence::new(tx).delete(id)?;
            tracing::debug!("delete {n} zones");
            if n == 0 {
                return Err(CatalogError::zone_not_found(id));
            }
            Ok(())
        })
    }

    #[tracing::instrument(skip_all, fields(domain=%id), level = "debug")]
    async fn get_domain(&self, id: DomainID) -> Result<Domain, CatalogError> {
        self.transaction(|tx| {
            DomainPersistence::new(tx)
                .get(id)?
                .ok_or_else(|| CatalogError::domain_not_found(id))
        })
    }

    #[tracing::instrument(skip_all, fields(domain=%domain.name), level = "debug")]
    async fn add_domain(&self, domain: NewDomain) -> Result<Domain, CatalogError> {
        let domain = NewDomain::new(domain.name, domain.zone_id).with_txt(domain.txt);
        self.transaction(|tx| {
            if !ZonePersistence::new(tx).exists(domain.zone_id)? {
                return Err(CatalogError::zone_not_found(domain.zone_id));
            }
            let id = DomainPersistence::new(tx)
                .insert(&domain)
                .map_err(|error| conflict(error, || format!("domain {} exists", domain.name)))?;
            tracing::debug!("added domain {id}");
            Ok(domain.into_domain(id))
        })
    }

    #[tracing::instrument(skip_all, fields(domain=%domain.id()), level = "debug")]
    async fn update_domain(&self, domain: &Domain) -> Result<Domain, CatalogError> {
        self.transaction(|tx| {
            if !ZonePersistence::new(tx).exists(domain.zone_id())? {
                return Err(CatalogError::zone_not_found(domain.zone_id()));
            }
            let dx = DomainPersistence::new(tx);
            let n = dx
                .update(domain)
                .map_err(|error| conflict(error, || format!("domain {} exists", domain.name())))?;
            if n == 0 {
                return Err(CatalogError::domain_not_found(domain.id()));
            }
            dx.get(domain.id())?
                .ok_or_else(|| CatalogError::domain_not_found(domain.id()))
        })
    }

    #[tracing::instrument(skip_all, fields(domain=%id), level = "debug")]
    async fn delete_domain(&self, id: DomainID) -> Result<(), CatalogError> {
        self.transaction(|tx| {
            let n = DomainPersistence::new(tx).delete(id)?;
            tracing::debug!("delete {n} domains");
            if n == 0 {
                return Err(CatalogError::domain_not_found(id));
            }
            Ok(())
        })
    }
}
