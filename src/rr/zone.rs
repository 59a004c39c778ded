use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

use serde::{Deserialize, Serialize};

use crate::database::FromRow;

use super::{SqlAddresses, ZoneID};

/// Address family of a literal held by a zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressFamily {
    V4,
    V6,
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressFamily::V4 => f.write_str("IPv4"),
            AddressFamily::V6 => f.write_str("IPv6"),
        }
    }
}

/// An address literal which is not valid for its family.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {family} address provided in zone: {literal:?}")]
pub struct AddressError {
    family: AddressFamily,
    literal: String,
}

impl AddressError {
    pub fn family(&self) -> AddressFamily {
        self.family
    }

    pub fn literal(&self) -> &str {
        &self.literal
    }
}

fn parse_all<T, S>(family: AddressFamily, literals: &[S]) -> Result<Vec<T>, AddressError>
where
    T: std::str::FromStr,
    S: AsRef<str>,
{
    literals
        .iter()
        .map(|literal| {
            let literal = literal.as_ref();
            literal.trim().parse::<T>().map_err(|_| AddressError {
                family,
                literal: literal.to_owned(),
            })
        })
        .collect()
}

/// Zone contents which have not yet been written to the catalogue.
///
/// The store assigns the identifier when the draft is added, and returns the
/// saved [`Zone`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewZone {
    pub name: String,
    #[serde(default)]
    pub a: Vec<Ipv4Addr>,
    #[serde(default)]
    pub aaaa: Vec<Ipv6Addr>,
}

impl NewZone {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            a: Vec::new(),
            aaaa: Vec::new(),
        }
    }

    /// Build a draft from textual address literals, rejecting any literal which
    /// does not parse for its family.
    pub fn parse<S4, S6>(
        name: impl Into<String>,
        a: &[S4],
        aaaa: &[S6],
    ) -> Result<Self, AddressError>
    where
        S4: AsRef<str>,
        S6: AsRef<str>,
    {
        Ok(Self {
            name: name.into(),
            a: parse_all(AddressFamily::V4, a)?,
            aaaa: parse_all(AddressFamily::V6, aaaa)?,
        })
    }

    pub fn with_ipv4(mut self, addr: Ipv4Addr) -> Self {
        self.a.push(addr);
        self
    }

    pub fn with_ipv6(mut self, addr: Ipv6Addr) -> Self {
        self.aaaa.push(addr);
        self
    }

    /// Attach the store-assigned identifier.
    pub fn into_zone(self, id: ZoneID) -> Zone {
        Zone {
            id,
            name: self.name,
            a: self.a,
            aaaa: self.aaaa,
        }
    }
}

/// A named group of IPv4 and IPv6 addresses.
///
/// Zones are treated as immutable values by the resolver: an update to the catalogue
/// produces a whole new `Zone` which replaces the cached one. Equality is structural and
/// order-sensitive, which lets the zone table skip reconciliation when nothing changed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Zone {
    id: ZoneID,
    name: String,
    a: Vec<Ipv4Addr>,
    aaaa: Vec<Ipv6Addr>,
}

impl Zone {
    pub fn new(id: ZoneID, name: impl Into<String>, a: Vec<Ipv4Addr>, aaaa: Vec<Ipv6Addr>) -> Self {
        Self {
            id,
            name: name.into(),
            a,
            aaaa,
        }
    }

    /// Build a zone from textual address literals.
    pub fn parse<S4, S6>(
        id: ZoneID,
        name: impl Into<String>,
        a: &[S4],
        aaaa: &[S6],
    ) -> Result<Self, AddressError>
    where
        S4: AsRef<str>,
        S6: AsRef<str>,
    {
        NewZone::parse(name, a, aaaa).map(|draft| draft.into_zone(id))
    }

    pub fn id(&self) -> ZoneID {
        self.id
    }

    /// Display name; carries no meaning for resolution.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ipv4(&self) -> &[Ipv4Addr] {
        &self.a
    }

    pub fn ipv6(&self) -> &[Ipv6Addr] {
        &self.aaaa
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_ipv4(&mut self, a: Vec<Ipv4Addr>) {
        self.a = a;
    }

    pub fn set_ipv6(&mut self, aaaa: Vec<Ipv6Addr>) {
        self.aaaa = aaaa;
    }
}

impl FromRow for Zone {
    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        let a: SqlAddresses<Ipv4Addr> = row.get("a")?;
        let aaaa: SqlAddresses<Ipv6Addr> = row.get("aaaa")?;
        Ok(Zone {
            id: row.get("id")?,
            name: row.get("name")?,
            a: a.into_inner(),
            aaaa: aaaa.into_inner(),
        })
    }
}
