use rusqlite::{OptionalExtension as _, named_params};

use crate::{
    database::FromRow as _,
    rr::{Domain, DomainID, NewDomain},
};

use super::QueryBuilder;

#[derive(Debug, Clone)]
pub(crate) struct DomainPersistence<'c> {
    connection: &'c rusqlite::Connection,
}

impl<'c> DomainPersistence<'c> {
    pub(crate) fn new(connection: &'c rusqlite::Connection) -> Self {
        Self { connection }
    }

    const TABLE: QueryBuilder<4> = QueryBuilder {
        table: "domain",
        columns: ["id", "zone_id", "name", "txt"],
        primary: "id",
    };

    /// Find a domain by exact name
    #[tracing::instrument(skip_all, fields(domain=%name), level = "trace")]
    pub(crate) fn lookup(&self, name: &str) -> rusqlite::Result<Option<Domain>> {
        let mut stmt = self
            .connection
            .prepare(&Self::TABLE.select("WHERE name = :name LIMIT 1"))?;
        stmt.query_row(named_params! { ":name": name }, Domain::from_row)
            .optional()
    }

    /// Get a single domain by ID
    #[tracing::instrument(skip_all, fields(domain=%id), level = "trace")]
    pub(crate) fn get(&self, id: DomainID) -> rusqlite::Result<Option<Domain>> {
        let mut stmt = self
            .connection
            .prepare(&Self::TABLE.select("WHERE id = :id"))?;
        stmt.query_row(named_params! { ":id": id }, Domain::from_row)
            .optional()
    }

    #[tracing::instrument(skip_all, fields(domain=%domain.name), level = "trace")]
    pub(crate) fn insert(&self, domain: &NewDomain) -> rusqlite::Result<DomainID> {
        let mut stmt = self.connection.prepare(&Self::TABLE.insert())?;
        stmt.execute(named_params! {
            ":zone_id": domain.zone_id,
            ":name": domain.name,
            ":txt": domain.txt,
        })?;
        Ok(DomainID::new(self.connection.last_insert_rowid()))
    }

    #[tracing::instrument(skip_all, fields(domain=%domain.id()), level = "trace")]
    pub(crate) fn update(&self, domain: &Domain) -> rusqlite::Result<usize> {
        let mut stmt = self.connection.prepare(&Self::TABLE.update())?;
        stmt.execute(named_params! {
            ":id": domain.id(),
            ":zone_id": domain.zone_id(),
            ":name": domain.name(),
            ":txt": domain.txt().unwrap_or_default(),
        })
    }

    #[tracing::instrument(skip_all, fields(domain=%id), level = "trace")]
    pub(crate) fn delete(&self, id: DomainID) -> rusqlite::Result<usize> {
        let mut stmt = self.connection.prepare(&Self::TABLE.delete())?;
        stmt.execute(named_params! { ":id": id })
    }
}
