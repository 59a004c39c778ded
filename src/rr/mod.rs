//! Catalogue Record Definitions

mod domain;
mod id;
mod sql;
mod ttl;
mod zone;

pub use self::domain::{Domain, NewDomain};
pub use self::id::{DomainID, ZoneID};
pub use self::sql::SqlAddresses;
pub use self::ttl::TimeToLive;
pub use self::zone::{AddressError, AddressFamily, NewZone, Zone};

/// DNS Name with case preserved.
///
pub use hickory_proto::rr::Name;
