use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use hickory_proto::op::Message;
use hickory_proto::rr::{Name, RData, RecordType};
use hickory_proto::serialize::binary::BinEncodable as _;
use zonedns::resolve::Unanswerable;
use zonedns::rr::{Domain, DomainID, TimeToLive, Zone, ZoneID};
use zonedns::{QueryType, ResolutionEngine, Unresolved, ZoneReader as _, ZoneTable};

mod support;
use support::{MemoryReader, example_zone, subscribe};

async fn engine(reader: MemoryReader) -> (Arc<MemoryReader>, ResolutionEngine) {
    let reader = Arc::new(reader);
    let table = Arc::new(ZoneTable::new(reader.fetch_zones().await.unwrap()));
    let engine = ResolutionEngine::new(
        reader.clone(),
        table,
        TimeToLive::from_secs(123),
        Duration::from_secs(2),
    );
    (reader, engine)
}

fn name(name: &str) -> Name {
    Name::from_str(name).unwrap()
}

#[tokio::test]
async fn a_records_follow_zone_order() {
    subscribe();
    let (_, engine) = engine(MemoryReader::example()).await;

    let qname = name("example.org.");
    let resolved = engine.resolve(&qname, QueryType::A).await.unwrap();

    let answers = resolved.answers();
    assert_eq!(answers.len(), 2);
    let addresses: Vec<Ipv4Addr> = answers
        .iter()
        .map(|record| {
            assert_eq!(record.name(), &qname);
            assert_eq!(record.ttl(), 123);
            assert_eq!(record.record_type(), RecordType::A);
            match record.data() {
                RData::A(a) => a.0,
                other => panic!("unexpected rdata: {other:?}"),
            }
        })
        .collect();
    assert_eq!(
        addresses,
        vec![Ipv4Addr::new(192, 168, 1, 7), Ipv4Addr::new(192, 168, 2, 7)]
    );
}

#[tokio::test]
async fn aaaa_records_follow_zone_order() {
    subscribe();
    let (_, engine) = engine(MemoryReader::example()).await;

    let resolved = engine
        .resolve(&name("example.org."), QueryType::AAAA)
        .await
        .unwrap();

    let addresses: Vec<Ipv6Addr> = resolved
        .answers()
        .iter()
        .map(|record| match record.data() {
            RData::AAAA(aaaa) => aaaa.0,
            other => panic!("unexpected rdata: {other:?}"),
        })
        .collect();
    assert_eq!(
        addresses,
        vec![
            "fe80::4a:d4ff:fede:5f6b".parse::<Ipv6Addr>().unwrap(),
            "fe80::f017:65ff:fe62:8e5e".parse::<Ipv6Addr>().unwrap(),
        ]
    );
}

#[tokio::test]
async fn txt_record_carries_domain_text() {
    subscribe();
    let (_, engine) = engine(MemoryReader::example()).await;

    let resolved = engine
        .resolve(&name("example.org."), QueryType::TXT)
        .await
        .unwrap();

    let answers = resolved.answers();
    assert_eq!(answers.len(), 1);
    assert_eq!(answers[0].record_type(), RecordType::TXT);
    assert_eq!(answers[0].ttl(), 123);
    match answers[0].data() {
        RData::TXT(txt) => {
            assert_eq!(txt.txt_data().len(), 1);
            assert_eq!(&*txt.txt_data()[0], b"TEXT RECORD");
        }
        other => panic!("unexpected rdata: {other:?}"),
    }
}

#[tokio::test]
async fn empty_txt_is_server_failure() {
    subscribe();
    let reader = MemoryReader::new()
        .with_zone(example_zone())
        .with_domain(Domain::new(DomainID::new(1), ZoneID::new(1), "example.org"));
    let (_, engine) = engine(reader).await;

    let error = engine
        .resolve(&name("example.org."), QueryType::TXT)
        .await
        .unwrap_err();
    assert_eq!(error, Unresolved::ServerFailure(Unanswerable::NoText));
}

#[tokio::test]
async fn unknown_name_is_name_error() {
    subscribe();
    let (_, engine) = engine(MemoryReader::example()).await;

    for qtype in [QueryType::A, QueryType::AAAA, QueryType::TXT, QueryType::MX] {
        let error = engine
            .resolve(&name("missing.example.org."), qtype)
            .await
            .unwrap_err();
        assert_eq!(error, Unresolved::NameError, "{qtype}");
    }
}

#[tokio::test]
async fn address_families_are_independent() {
    subscribe();
    let zone = Zone::parse(ZoneID::new(1), "EU", &["192.168.1.7"], &[] as &[&str]).unwrap();
    let reader = MemoryReader::new()
        .with_zone(zone)
        .with_domain(support::example_domain());
    let (_, engine) = engine(reader).await;

    let qname = name("example.org.");
    assert_eq!(
        engine.resolve(&qname, QueryType::A).await.unwrap().answers().len(),
        1
    );
    assert_eq!(
        engine.resolve(&qname, QueryType::AAAA).await.unwrap_err(),
        Unresolved::ServerFailure(Unanswerable::NoAddresses)
    );

    let zone = Zone::parse(ZoneID::new(1), "EU", &[] as &[&str], &["fe80::1"]).unwrap();
    let reader = MemoryReader::new()
        .with_zone(zone)
        .with_domain(support::example_domain());
    let (_, engine) = self::engine(reader).await;
    assert_eq!(
        engine.resolve(&qname, QueryType::A).await.unwrap_err(),
        Unresolved::ServerFailure(Unanswerable::NoAddresses)
    );
}

#[tokio::test]
async fn mx_and_other_types_are_server_failures() {
    subscribe();
    let (_, engine) = engine(MemoryReader::example()).await;
    let qname = name("example.org.");

    assert_eq!(
        engine.resolve(&qname, QueryType::MX).await.unwrap_err(),
        Unresolved::ServerFailure(Unanswerable::Unimplemented)
    );

    for rtype in [RecordType::PTR, RecordType::SRV, RecordType::CNAME] {
        let error = engine.resolve(&qname, rtype.into()).await.unwrap_err();
        assert_eq!(
            error,
            Unresolved::ServerFailure(Unanswerable::Unsupported),
            "{rtype}"
        );
    }
}

#[tokio::test]
async fn zone_missing_from_cache_is_name_error() {
    subscribe();
    let reader = MemoryReader::example().with_domain(Domain::new(
        DomainID::new(2),
        ZoneID::new(9),
        "orphan.example.org",
    ));
    let (_, engine) = engine(reader).await;

    let error = engine
        .resolve(&name("orphan.example.org."), QueryType::A)
        .await
        .unwrap_err();
    assert_eq!(error, Unresolved::NameError);
}

#[tokio::test]
async fn trailing_dot_is_optional() {
    subscribe();
    let (_, engine) = engine(MemoryReader::example()).await;

    let relative = name("example.org");
    assert!(!relative.is_fqdn());
    let resolved = engine.resolve(&relative, QueryType::A).await.unwrap();
    assert_eq!(resolved.answers().len(), 2);
    assert_eq!(resolved.answers()[0].name(), &relative);
}

#[tokio::test]
async fn lookup_is_case_insensitive() {
    subscribe();
    let (_, engine) = engine(MemoryReader::example()).await;

    let resolved = engine
        .resolve(&name("Example.ORG."), QueryType::A)
        .await
        .unwrap();
    assert_eq!(resolved.answers().len(), 2);
}

#[tokio::test]
async fn lookup_failure_is_server_failure() {
    subscribe();
    let (reader, engine) = engine(MemoryReader::example()).await;
    reader.fail_lookups(true);

    let error = engine
        .resolve(&name("example.org."), QueryType::A)
        .await
        .unwrap_err();
    assert_eq!(
        error,
        Unresolved::ServerFailure(Unanswerable::CatalogUnavailable)
    );
}

#[tokio::test(start_paused = true)]
async fn slow_lookup_is_server_failure() {
    subscribe();
    let (reader, engine) = engine(MemoryReader::example()).await;
    reader.delay_lookups(Duration::from_secs(5));

    let error = engine
        .resolve(&name("example.org."), QueryType::A)
        .await
        .unwrap_err();
    assert_eq!(
        error,
        Unresolved::ServerFailure(Unanswerable::CatalogUnavailable)
    );
}

#[tokio::test]
async fn domain_changes_are_visible_immediately() {
    subscribe();
    let (reader, engine) = engine(MemoryReader::example()).await;

    reader.insert_domain(Domain::new(DomainID::new(2), ZoneID::new(1), "new.example.org"));
    let resolved = engine
        .resolve(&name("new.example.org."), QueryType::A)
        .await
        .unwrap();
    assert_eq!(resolved.answers().len(), 2);
}

#[tokio::test]
async fn zero_ttl_is_applied() {
    subscribe();
    let reader = Arc::new(MemoryReader::example());
    let table = Arc::new(ZoneTable::new(reader.fetch_zones().await.unwrap()));
    let engine = ResolutionEngine::new(reader, table, TimeToLive::ZERO, Duration::from_secs(2));

    let resolved = engine
        .resolve(&name("example.org."), QueryType::A)
        .await
        .unwrap();
    assert!(resolved.answers().iter().all(|record| record.ttl() == 0));
}

#[tokio::test]
async fn long_txt_is_split_into_character_strings() {
    subscribe();
    let text = "x".repeat(300);
    let reader = MemoryReader::new()
        .with_zone(example_zone())
        .with_domain(
            Domain::new(DomainID::new(1), ZoneID::new(1), "example.org").with_txt(text.clone()),
        );
    let (_, engine) = engine(reader).await;

    let resolved = engine
        .resolve(&name("example.org."), QueryType::TXT)
        .await
        .unwrap();
    assert_eq!(resolved.answers().len(), 1);
    match resolved.answers()[0].data() {
        RData::TXT(txt) => {
            let chunks = txt.txt_data();
            assert_eq!(chunks.len(), 2);
            assert_eq!(chunks[0].len(), 255);
            assert_eq!(chunks[1].len(), 45);
            assert_eq!(chunks.concat(), text.as_bytes());
        }
        other => panic!("unexpected rdata: {other:?}"),
    }

    let mut message = Message::new();
    message.add_answers(resolved.into_answers());
    let bytes = message.to_vec().expect("answer must encode");
    let decoded = Message::from_vec(&bytes).unwrap();
    assert_eq!(decoded.answers().len(), 1);
}
