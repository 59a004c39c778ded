use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, Value, ValueRef};
use serde::{Serialize, de::DeserializeOwned};
use std::{ops::Deref, str};

/// Wrapper type for an address list to provide SQLite trait implementations
///
/// Address lists are stored as a JSON array of textual literals. Decoding parses every
/// literal, so a malformed address in the database fails the read instead of reaching
/// the resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlAddresses<T>(Vec<T>);

impl<T> SqlAddresses<T> {
    pub fn into_inner(self) -> Vec<T> {
        self.0
    }
}

impl<T> From<Vec<T>> for SqlAddresses<T> {
    fn from(addresses: Vec<T>) -> Self {
        SqlAddresses(addresses)
    }
}

impl<T: Clone> From<&[T]> for SqlAddresses<T> {
    fn from(addresses: &[T]) -> Self {
        SqlAddresses(addresses.to_vec())
    }
}

impl<T> Deref for SqlAddresses<T> {
    type Target = [T];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T: Serialize> ToSql for SqlAddresses<T> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'static>> {
        let text = serde_json::to_string(&self.0)
            .map_err(|error| rusqlite::Error::ToSqlConversionFailure(error.into()))?;
        Ok(ToSqlOutput::Owned(Value::Text(text)))
    }
}

impl<T: DeserializeOwned> FromSql for SqlAddresses<T> {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Null => Ok(SqlAddresses(Vec::new())),
            ValueRef::Text(value) => {
                let text = str::from_utf8(value).map_err(FromSqlError::other)?;
                let addresses = serde_json::from_str(text).map_err(FromSqlError::other)?;
                Ok(SqlAddresses(addresses))
            }
            _ => Err(FromSqlError::InvalidType),
        }
    }
}
