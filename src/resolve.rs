//! Query resolution
//!
//! [`ResolutionEngine`] turns one `(name, type)` question into answer records. The
//! queried name is looked up as a domain through the [`ZoneReader`], the domain's zone
//! is taken from the [`ZoneTable`], and the answer set is built from the zone's address
//! lists or the domain's text value. The engine keeps no state between queries.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use hickory_proto::op::ResponseCode;
use hickory_proto::rr::rdata::{A, AAAA, TXT};
use hickory_proto::rr::{Name, RData, Record, RecordType};

use crate::catalog::ZoneReader;
use crate::rr::{Domain, TimeToLive, Zone};
use crate::zones::ZoneTable;

/// The record types this resolver distinguishes.
///
/// Dispatch in [`ResolutionEngine`] is an exhaustive match over this type, so a new
/// variant does not compile until it has a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryType {
    A,
    AAAA,
    TXT,
    MX,
    Unsupported(RecordType),
}

impl From<RecordType> for QueryType {
    fn from(value: RecordType) -> Self {
        match value {
            RecordType::A => QueryType::A,
            RecordType::AAAA => QueryType::AAAA,
            RecordType::TXT => QueryType::TXT,
            RecordType::MX => QueryType::MX,
            other => QueryType::Unsupported(other),
        }
    }
}

impl From<QueryType> for RecordType {
    fn from(value: QueryType) -> Self {
        match value {
            QueryType::A => RecordType::A,
            QueryType::AAAA => RecordType::AAAA,
            QueryType::TXT => RecordType::TXT,
            QueryType::MX => RecordType::MX,
            QueryType::Unsupported(other) => other,
        }
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", RecordType::from(*self))
    }
}

/// A successful resolution: the answer records for an authoritative response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    answers: Vec<Record>,
}

impl Resolved {
    pub fn answers(&self) -> &[Record] {
        &self.answers
    }

    pub fn into_answers(self) -> Vec<Record> {
        self.answers
    }
}

/// Why the name exists but the requested type cannot be answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unanswerable {
    /// The zone holds no address of the requested family.
    NoAddresses,
    /// The domain carries no text value.
    NoText,
    /// The type is known but not served (MX).
    Unimplemented,
    /// The type is not served at all.
    Unsupported,
    /// The catalogue failed or did not answer in time.
    CatalogUnavailable,
}

impl fmt::Display for Unanswerable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unanswerable::NoAddresses => f.write_str("no addresses of the requested family"),
            Unanswerable::NoText => f.write_str("no text record"),
            Unanswerable::Unimplemented => f.write_str("record type not implemented"),
            Unanswerable::Unsupported => f.write_str("record type not supported"),
            Unanswerable::CatalogUnavailable => f.write_str("catalogue unavailable"),
        }
    }
}

/// Failed resolutions, each mapping to a distinct DNS response code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Unresolved {
    /// The name is not in the catalogue, or its zone is not cached.
    #[error("no such domain")]
    NameError,

    /// The name exists but this type cannot be answered.
    #[error("{0}")]
    ServerFailure(Unanswerable),
}

impl Unresolved {
    pub fn response_code(&self) -> ResponseCode {
        match self {
            Unresolved::NameError => ResponseCode::NXDomain,
            Unresolved::ServerFailure(_) => ResponseCode::ServFail,
        }
    }
}

/// Longest payload of a single DNS character-string.
const CHARACTER_STRING_MAX: usize = 255;

/// Remove at most one trailing root-label separator from a textual query name.
pub fn strip_root(name: &str) -> &str {
    name.strip_suffix('.').unwrap_or(name)
}

/// Resolves queries against the catalogue and the zone cache.
#[derive(Clone)]
pub struct ResolutionEngine {
    reader: Arc<dyn ZoneReader>,
    zones: Arc<ZoneTable>,
    ttl: TimeToLive,
    lookup_timeout: Duration,
}

impl fmt::Debug for ResolutionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolutionEngine")
            .field("zones", &self.zones)
            .field("ttl", &self.ttl)
            .field("lookup_timeout", &self.lookup_timeout)
            .finish()
    }
}

impl ResolutionEngine {
    pub fn new(
        reader: Arc<dyn ZoneReader>,
        zones: Arc<ZoneTable>,
        ttl: TimeToLive,
        lookup_timeout: Duration,
    ) -> Self {
        Self {
            reader,
            zones,
            ttl,
            lookup_timeout,
        }
    }

    pub fn ttl(&self) -> TimeToLive {
        self.ttl
    }

    pub fn zones(&self) -> &Arc<ZoneTable> {
        &self.zones
    }

    /// Resolve one question.
    ///
    /// The answer records carry `qname` as their owner, exactly as received.
    #[tracing::instrument(skip_all, fields(name = %qname, qtype = %qtype), level = "debug")]
    pub async fn resolve(&self, qname: &Name, qtype: QueryType) -> Result<Resolved, Unresolved> {
        let text = qname.to_string();
        let key = strip_root(&text);

        let domain = self.lookup_domain(key).await?;

        let Some(zone) = self.zones.get(domain.zone_id()) else {
            tracing::debug!(
                zone = %domain.zone_id(),
                "domain references a zone missing from the cache"
            );
            return Err(Unresolved::NameError);
        };

        let answers = match qtype {
            QueryType::A => self.resolve_a(qname, &zone),
            QueryType::AAAA => self.resolve_aaaa(qname, &zone),
            QueryType::TXT => self.resolve_txt(qname, &domain),
            QueryType::MX => self.resolve_mx(qname, &domain, &zone),
            QueryType::Unsupported(_) => Err(Unanswerable::Unsupported),
        }
        .map_err(Unresolved::ServerFailure)?;

        tracing::debug!(answers = answers.len(), "resolved");
        Ok(Resolved { answers })
    }

    async fn lookup_domain(&self, key: &str) -> Result<Domain, Unresolved> {
        match tokio::time::timeout(self.lookup_timeout, self.reader.lookup_domain(key)).await {
            Ok(Ok(Some(domain))) => Ok(domain),
            Ok(Ok(None)) => {
                tracing::debug!(%key, "domain not in catalogue");
                Err(Unresolved::NameError)
            }
            Ok(Err(error)) => {
                tracing::error!(%error, %key, "domain lookup failed");
                Err(Unresolved::ServerFailure(Unanswerable::CatalogUnavailable))
            }
            Err(_) => {
                tracing::warn!(timeout = ?self.lookup_timeout, %key, "domain lookup timed out");
                Err(Unresolved::ServerFailure(Unanswerable::CatalogUnavailable))
            }
        }
    }

    fn record(&self, qname: &Name, rdata: RData) -> Record {
        Record::from_rdata(qname.clone(), self.ttl.into(), rdata)
    }

    fn resolve_a(&self, qname: &Name, zone: &Zone) -> Result<Vec<Record>, Unanswerable> {
        if zone.ipv4().is_empty() {
            return Err(Unanswerable::NoAddresses);
        }

        Ok(zone
            .ipv4()
            .iter()
            .map(|addr| self.record(qname, RData::A(A::from(*addr))))
            .collect())
    }

    fn resolve_aaaa(&self, qname: &Name, zone: &Zone) -> Result<Vec<Record>, Unanswerable> {
        if zone.ipv6().is_empty() {
            return Err(Unanswerable::NoAddresses);
        }

        Ok(zone
            .ipv6()
            .iter()
            .map(|addr| self.record(qname, RData::AAAA(AAAA::from(*addr))))
            .collect())
    }

    /// One TXT record, with the text split across as many character-strings as it needs.
    fn resolve_txt(&self, qname: &Name, domain: &Domain) -> Result<Vec<Record>, Unanswerable> {
        let text = domain.txt().ok_or(Unanswerable::NoText)?;
        let chunks: Vec<&[u8]> = text.as_bytes().chunks(CHARACTER_STRING_MAX).collect();
        Ok(vec![
            self.record(qname, RData::TXT(TXT::from_bytes(chunks))),
        ])
    }

    // TODO: serve MX once the catalogue has a mail-exchanger entity per domain.
    fn resolve_mx(
        &self,
        _qname: &Name,
        _domain: &Domain,
        _zone: &Zone,
    ) -> Result<Vec<Record>, Unanswerable> {
        Err(Unanswerable::Unimplemented)
    }
}
