//! Catalogue Identifiers
//!
//! Zones and domains are keyed by integer identifiers assigned by the store when a
//! record is first written. They are immutable afterwards, so the zone cache and the
//! domain table can both refer to a zone by its identifier alone.

macro_rules! impl_id {
    (
    $(#[$outer:meta])*
    pub struct $name:ident
   ) => {
       $(#[$outer])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[derive(::serde::Serialize, ::serde::Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wrap a raw identifier as handed out by the store.
            pub const fn new(id: i64) -> $name {
                $name(id)
            }

            /// The raw integer value of this identifier.
            pub const fn get(&self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                $name(value)
            }
        }

        impl From<$name> for i64 {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl ::rusqlite::types::FromSql for $name {
            fn column_result(
                value: ::rusqlite::types::ValueRef<'_>,
            ) -> ::rusqlite::types::FromSqlResult<Self> {
                i64::column_result(value).map($name)
            }
        }

        impl ::rusqlite::types::ToSql for $name {
            fn to_sql(&self) -> ::rusqlite::Result<::rusqlite::types::ToSqlOutput<'_>> {
                Ok(::rusqlite::types::ToSqlOutput::Owned(
                    ::rusqlite::types::Value::Integer(self.0),
                ))
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = ::std::num::ParseIntError;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse::<i64>().map($name)
            }
        }
    };
}

impl_id! {
    #[doc="Zone identifier assigned by the catalogue store"]
    pub struct ZoneID
}

impl_id! {
    #[doc="Domain identifier assigned by the catalogue store"]
    pub struct DomainID
}
