use serde::{Deserialize, Serialize};

use crate::database::FromRow;

use super::{DomainID, ZoneID};

/// Drop one trailing root label, so names are stored the way queries look them up.
fn relative_name(name: impl Into<String>) -> String {
    let mut name = name.into();
    if name.ends_with('.') {
        name.pop();
    }
    name
}

/// Domain contents which have not yet been written to the catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDomain {
    pub name: String,
    pub zone_id: ZoneID,
    #[serde(default)]
    pub txt: String,
}

impl NewDomain {
    pub fn new(name: impl Into<String>, zone_id: ZoneID) -> Self {
        Self {
            name: relative_name(name),
            zone_id,
            txt: String::new(),
        }
    }

    pub fn with_txt(mut self, txt: impl Into<String>) -> Self {
        self.txt = txt.into();
        self
    }

    /// Attach the store-assigned identifier.
    pub fn into_domain(self, id: DomainID) -> Domain {
        Domain {
            id,
            zone_id: self.zone_id,
            name: relative_name(self.name),
            txt: self.txt,
        }
    }
}

/// A fully-qualified name bound to exactly one zone.
///
/// Names are stored without the trailing root label. The optional text value is
/// served as the domain's TXT record; an empty string means there is none.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Domain {
    id: DomainID,
    zone_id: ZoneID,
    name: String,
    txt: String,
}

impl Domain {
    pub fn new(id: DomainID, zone_id: ZoneID, name: impl Into<String>) -> Self {
        Self {
            id,
            zone_id,
            name: relative_name(name),
            txt: String::new(),
        }
    }

    pub fn with_txt(mut self, txt: impl Into<String>) -> Self {
        self.txt = txt.into();
        self
    }

    pub fn id(&self) -> DomainID {
        self.id
    }

    pub fn zone_id(&self) -> ZoneID {
        self.zone_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The TXT payload, if any.
    pub fn txt(&self) -> Option<&str> {
        if self.txt.is_empty() {
            None
        } else {
            Some(&self.txt)
        }
    }

    pub fn set_zone_id(&mut self, zone_id: ZoneID) {
        self.zone_id = zone_id;
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = relative_name(name);
    }

    pub fn set_txt(&mut self, txt: impl Into<String>) {
        self.txt = txt.into();
    }
}

impl FromRow for Domain {
    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Domain {
            id: row.get("id")?,
            zone_id: row.get("zone_id")?,
            name: row.get("name")?,
            txt: row.get::<_, Option<String>>("txt")?.unwrap_or_default(),
        })
    }
}
