#![allow(unused)]

use std::collections::BTreeMap;
use std::future::poll_fn;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::task::Poll;
use std::time::Duration;

use futures::FutureExt as _;
use hickory_proto::serialize::binary::BinDecodable as _;
use hickory_proto::{
    op::Message,
    rr::Record,
    serialize::binary::{BinDecoder, BinEncoder},
};
use hickory_server::{
    authority::MessageResponse,
    server::{ResponseHandler, ResponseInfo},
};
use zonedns::catalog::{CatalogError, ZoneReader};
use zonedns::rr::{Domain, DomainID, Zone, ZoneID};

/// Registers a global default tracing subscriber when called for the first time. This is intended
/// for use in tests.
pub fn subscribe() {
    static INSTALL_TRACING_SUBSCRIBER: Once = Once::new();
    INSTALL_TRACING_SUBSCRIBER.call_once(|| {
        let subscriber = tracing_subscriber::FmtSubscriber::builder()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .finish();
        tracing::subscriber::set_global_default(subscriber).unwrap();
    });
}

/// Zone 1, "EU", with two addresses of each family.
pub fn example_zone() -> Zone {
    Zone::parse(
        ZoneID::new(1),
        "EU",
        &["192.168.1.7", "192.168.2.7"],
        &["fe80::4a:d4ff:fede:5f6b", "fe80::f017:65ff:fe62:8e5e"],
    )
    .unwrap()
}

/// `example.org`, bound to zone 1, with a TXT value.
pub fn example_domain() -> Domain {
    Domain::new(DomainID::new(1), ZoneID::new(1), "example.org").with_txt("TEXT RECORD")
}

#[derive(Debug, Default)]
struct Contents {
    zones: Vec<Zone>,
    domains: BTreeMap<DomainID, Domain>,
}

/// An in-memory catalogue with switches for simulating a misbehaving backend.
#[derive(Debug, Default)]
pub struct MemoryReader {
    contents: Mutex<Contents>,
    fail_fetches: AtomicBool,
    fail_lookups: AtomicBool,
    lookup_delay: Mutex<Option<Duration>>,
    fetch_delay: Mutex<Option<Duration>>,
    fetches: AtomicUsize,
}

impl MemoryReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// The `EU` zone with `example.org` bound to it.
    pub fn example() -> Self {
        Self::new()
            .with_zone(example_zone())
            .with_domain(example_domain())
    }

    pub fn with_zone(self, zone: Zone) -> Self {
        self.contents.lock().unwrap().zones.push(zone);
        self
    }

    pub fn with_domain(self, domain: Domain) -> Self {
        self.insert_domain(domain);
        self
    }

    pub fn insert_domain(&self, domain: Domain) {
        self.contents
            .lock()
            .unwrap()
            .domains
            .insert(domain.id(), domain);
    }

    pub fn set_zones(&self, zones: Vec<Zone>) {
        self.contents.lock().unwrap().zones = zones;
    }

    pub fn fail_fetches(&self, fail: bool) {
        self.fail_fetches.store(fail, Ordering::SeqCst);
    }

    pub fn fail_lookups(&self, fail: bool) {
        self.fail_lookups.store(fail, Ordering::SeqCst);
    }

    pub fn delay_fetches(&self, delay: Duration) {
        *self.fetch_delay.lock().unwrap() = Some(delay);
    }

    pub fn delay_lookups(&self, delay: Duration) {
        *self.lookup_delay.lock().unwrap() = Some(delay);
    }

    /// Number of `fetch_zones` calls so far, successful or not.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ZoneReader for MemoryReader {
    async fn fetch_zones(&self) -> Result<Vec<Zone>, CatalogError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let delay = *self.fetch_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_fetches.load(Ordering::SeqCst) {
            return Err(CatalogError::new("catalogue unreachable"));
        }
        Ok(self.contents.lock().unwrap().zones.clone())
    }

    async fn lookup_domain(&self, name: &str) -> Result<Option<Domain>, CatalogError> {
        let delay = *self.lookup_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(CatalogError::new("catalogue unreachable"));
        }

        Ok(self
            .contents
            .lock()
            .unwrap()
            .domains
            .values()
            .find(|domain| domain.name().eq_ignore_ascii_case(name))
            .cloned())
    }
}

#[derive(Clone, Default)]
pub struct TestResponseHandler {
    message_ready: Arc<AtomicBool>,
    buf: Arc<Mutex<Vec<u8>>>,
}

impl TestResponseHandler {
    pub fn new() -> Self {
        let buf = Arc::new(Mutex::new(Vec::with_capacity(512)));
        let message_ready = Arc::new(AtomicBool::new(false));
        TestResponseHandler { message_ready, buf }
    }

    fn into_inner(self) -> impl Future<Output = Vec<u8>> {
        poll_fn(move |_| {
            if self
                .message_ready
                .compare_exchange(true, false, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
            {
                let bytes: Vec<u8> = std::mem::take(&mut self.buf.lock().unwrap());
                Poll::Ready(bytes)
            } else {
                Poll::Pending
            }
        })
    }

    pub fn into_message(self) -> impl Future<Output = Message> {
        let bytes = self.into_inner();
        bytes.map(|b| {
            let mut decoder = BinDecoder::new(&b);
            Message::read(&mut decoder).expect("could not decode message")
        })
    }
}

#[async_trait::async_trait]
impl ResponseHandler for TestResponseHandler {
    async fn send_response<'a>(
        &mut self,
        response: MessageResponse<
            '_,
            'a,
            impl Iterator<Item = &'a Record> + Send + 'a,
            impl Iterator<Item = &'a Record> + Send + 'a,
            impl Iterator<Item = &'a Record> + Send + 'a,
            impl Iterator<Item = &'a Record> + Send + 'a,
        >,
    ) -> io::Result<ResponseInfo> {
        let buf = &mut self.buf.lock().unwrap();
        buf.clear();
        let mut encoder = BinEncoder::new(buf);
        let info = response
            .destructive_emit(&mut encoder)
            .expect("could not encode");
        self.message_ready.store(true, Ordering::Release);
        Ok(info)
    }
}
