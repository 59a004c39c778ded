use rusqlite::{OptionalExtension as _, named_params};

use crate::{
    database::FromRow as _,
    rr::{NewZone, SqlAddresses, Zone, ZoneID},
};

use super::QueryBuilder;

#[derive(Debug, Clone)]
pub(crate) struct ZonePersistence<'c> {
    connection: &'c rusqlite::Connection,
}

impl<'c> ZonePersistence<'c> {
    pub(crate) fn new(connection: &'c rusqlite::Connection) -> Self {
        Self { connection }
    }

    const TABLE: QueryBuilder<4> = QueryBuilder {
        table: "zone",
        columns: ["id", "name", "a", "aaaa"],
        primary: "id",
    };

    /// All zones, ordered by ID
    #[tracing::instrument(skip_all, level = "trace")]
    pub(crate) fn all(&self) -> rusqlite::Result<Vec<Zone>> {
        let mut stmt = self
            .connection
            .prepare(&Self::TABLE.select("ORDER BY id"))?;
        let zones = stmt
            .query_map([], Zone::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        tracing::trace!("loaded {} zones", zones.len());
        Ok(zones)
    }

    /// Get a single zone by ID
    #[tracing::instrument(skip_all, fields(zone=%id), level = "trace")]
    pub(crate) fn get(&self, id: ZoneID) -> rusqlite::Result<Option<Zone>> {
        let mut stmt = self
            .connection
            .prepare(&Self::TABLE.select("WHERE id = :id"))?;
        stmt.query_row(named_params! { ":id": id }, Zone::from_row)
            .optional()
    }

    #[tracing::instrument(skip_all, fields(zone=%id), level = "trace")]
    pub(crate) fn exists(&self, id: ZoneID) -> rusqlite::Result<bool> {
        let mut stmt = self.connection.prepare(&format!(
            "SELECT 1 FROM {table} WHERE id = :id",
            table = Self::TABLE.table
        ))?;
        stmt.exists(named_params! { ":id": id })
    }

    #[tracing::instrument(skip_all, fields(zone=%zone.name), level = "trace")]
    pub(crate) fn insert(&self, zone: &NewZone) -> rusqlite::Result<ZoneID> {
        let mut stmt = self.connection.prepare(&Self::TABLE.insert())?;
        stmt.execute(named_params! {
            ":name": zone.name,
            ":a": SqlAddresses::from(zone.a.as_slice()),
            ":aaaa": SqlAddresses::from(zone.aaaa.as_slice()),
        })?;
        Ok(ZoneID::new(self.connection.last_insert_rowid()))
    }

    #[tracing::instrument(skip_all, fields(zone=%zone.id()), level = "trace")]
    pub(crate) fn update(&self, zone: &Zone) -> rusqlite::Result<usize> {
        let mut stmt = self.connection.prepare(&Self::TABLE.update())?;
        let n = stmt.execute(named_params! {
            ":id": zone.id(),
            ":name": zone.name(),
            ":a": SqlAddresses::from(zone.ipv4()),
            ":aaaa": SqlAddresses::from(zone.ipv6()),
        })?;
        if n > 0 {
            tracing::trace!("affected {} rows", n);
        } else {
            tracing::trace!("no rows affected")
        }
        Ok(n)
    }

    #[tracing::instrument(skip_all, fields(zone=%id), level = "trace")]
    pub(crate) fn delete(&self, id: ZoneID) -> rusqlite::Result<usize> {
        // CASCADE will handle deleting the associated domains.
        let mut stmt = self.connection.prepare(&Self::TABLE.delete())?;
        stmt.execute(named_params! { ":id": id })
    }
}
