pub mod catalog;
pub mod config;
pub mod database;
pub mod error;
pub mod refresh;
pub mod resolve;
pub mod rr;
pub mod server;
pub mod zones;

pub use self::catalog::{CatalogError, ZoneReader, ZoneStorage};
pub use self::config::{SqliteConfiguration, ZoneDnsConfig};
pub use self::database::SqliteStore;
pub use self::resolve::{QueryType, ResolutionEngine, Unresolved};
pub use self::server::ZoneDns;
pub use self::zones::ZoneTable;
