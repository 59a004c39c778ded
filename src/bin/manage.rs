#![cfg(feature = "cli")]

use std::{
    net::{IpAddr, Ipv4Addr, Ipv6Addr},
    process::ExitCode,
    sync::Arc,
    time::Duration,
};

use camino::Utf8PathBuf;
use clap::{ArgAction, ArgMatches, arg};
use hickory_server::ServerFuture;
use tracing_subscriber::EnvFilter;
use zonedns::{
    SqliteConfiguration, SqliteStore, ZoneDns, ZoneDnsConfig, ZoneReader as _, ZoneStorage as _,
    rr::{DomainID, NewDomain, NewZone, ZoneID},
};

fn main() -> ExitCode {
    match manage() {
        Ok(_) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}

fn zone_args() -> [clap::Arg; 2] {
    [
        arg!(--ipv4 <IPV4> "IPv4 address served for A queries")
            .action(ArgAction::Append)
            .value_parser(clap::value_parser!(Ipv4Addr)),
        arg!(--ipv6 <IPV6> "IPv6 address served for AAAA queries")
            .action(ArgAction::Append)
            .value_parser(clap::value_parser!(Ipv6Addr)),
    ]
}

fn manage() -> Result<(), ()> {
    tracing_subscriber::fmt()
        .compact()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let app = clap::Command::new("zonedns")
        .about("Serve and manage the zonedns catalogue")
        .subcommand_required(true)
        .args([arg!(--db <PATH> "Path to the zonedns SQLite database")
            .required(true)
            .value_parser(clap::value_parser!(Utf8PathBuf))])
        .subcommand(
            clap::Command::new("serve")
                .about("Run the DNS server")
                .arg(
                    arg!(--port <PORT> "Port to listen on")
                        .value_parser(clap::value_parser!(u16))
                        .default_value("8053"),
                )
                .arg(
                    arg!(--address <ADDRESS> "Address to listen on")
                        .value_parser(clap::value_parser!(IpAddr))
                        .default_value("127.0.0.1"),
                )
                .arg(
                    arg!(--refresh <SECONDS> "Seconds between zone refreshes")
                        .value_parser(clap::value_parser!(u64).range(1..))
                        .default_value("30"),
                )
                .arg(
                    arg!(--ttl <SECONDS> "TTL of every answer record")
                        .value_parser(clap::value_parser!(u32))
                        .default_value("600"),
                )
                .arg(
                    arg!(--"lookup-timeout" <MILLIS> "Timeout for a single domain lookup")
                        .value_parser(clap::value_parser!(u64).range(1..))
                        .default_value("2000"),
                ),
        )
        .subcommand(clap::Command::new("list-zones").about("Print every zone as JSON"))
        .subcommand(
            clap::Command::new("add-zone")
                .about("Add a zone")
                .arg(arg!(<NAME> "Display name for the zone"))
                .args(zone_args()),
        )
        .subcommand(
            clap::Command::new("update-zone")
                .about("Replace the name or address lists of a zone")
                .arg(arg!(<ID> "Zone ID").value_parser(clap::value_parser!(ZoneID)))
                .arg(arg!(--name <NAME> "New display name"))
                .args(zone_args()),
        )
        .subcommand(
            clap::Command::new("delete-zone")
                .about("Delete a zone and all of its domains")
                .arg(arg!(<ID> "Zone ID").value_parser(clap::value_parser!(ZoneID))),
        )
        .subcommand(
            clap::Command::new("add-domain")
                .about("Bind a domain name to a zone")
                .arg(arg!(<NAME> "Fully-qualified domain name, without the trailing dot"))
                .arg(arg!(<ZONE> "Zone ID").value_parser(clap::value_parser!(ZoneID)))
                .arg(arg!(--txt <TEXT> "Text served for TXT queries")),
        )
        .subcommand(
            clap::Command::new("update-domain")
                .about("Change a domain's zone, name or text")
                .arg(arg!(<ID> "Domain ID").value_parser(clap::value_parser!(DomainID)))
                .arg(arg!(--zone <ZONE> "New zone ID").value_parser(clap::value_parser!(ZoneID)))
                .arg(arg!(--name <NAME> "New domain name"))
                .arg(arg!(--txt <TEXT> "New TXT text, empty to remove")),
        )
        .subcommand(
            clap::Command::new("delete-domain")
                .about("Delete a domain")
                .arg(arg!(<ID> "Domain ID").value_parser(clap::value_parser!(DomainID))),
        )
        .subcommand(
            clap::Command::new("lookup-domain")
                .about("Print a domain as JSON")
                .arg(arg!(<NAME> "Domain name")),
        );

    let args = app.get_matches();
    let db: &Utf8PathBuf = args.get_one("db").expect("db is required");
    let database = SqliteConfiguration::new(db.clone());

    let result = match args.subcommand() {
        Some(("serve", matches)) => {
            let address = matches
                .get_one::<IpAddr>("address")
                .expect("address is required");
            let port = matches.get_one::<u16>("port").expect("port is required");
            let config = ZoneDnsConfig::default()
                .with_database(database)
                .with_refresh_interval(*matches.get_one::<u64>("refresh").expect("has default"))
                .with_ttl(*matches.get_one::<u32>("ttl").expect("has default"))
                .with_lookup_timeout(Duration::from_millis(
                    *matches
                        .get_one::<u64>("lookup-timeout")
                        .expect("has default"),
                ));
            serve_dns(*address, *port, config)
        }
        Some((command, matches)) => catalogue(&database, command, matches),
        None => unreachable!("clap crimes?"),
    };

    if let Err(error) = result {
        eprintln!("{error}");
        return Err(());
    }

    Ok(())
}

fn addresses<T: Clone + Send + Sync + 'static>(matches: &ArgMatches, id: &str) -> Option<Vec<T>> {
    matches
        .get_many::<T>(id)
        .map(|values| values.cloned().collect())
}

fn catalogue(
    database: &SqliteConfiguration,
    command: &str,
    matches: &ArgMatches,
) -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    rt.block_on(async {
        let store = SqliteStore::new_from_config(database)?;

        match command {
            "list-zones" => {
                for zone in store.fetch_zones().await? {
                    println!("{}", serde_json::to_string(&zone)?);
                }
            }
            "add-zone" => {
                let name = matches.get_one::<String>("NAME").expect("NAME is required");
                let mut zone = NewZone::new(name.clone());
                zone.a = addresses(matches, "ipv4").unwrap_or_default();
                zone.aaaa = addresses(matches, "ipv6").unwrap_or_default();
                let zone = store.add_zone(zone).await?;
                println!("Zone '{}' added with id {}", zone.name(), zone.id());
            }
            "update-zone" => {
                let id = *matches.get_one::<ZoneID>("ID").expect("ID is required");
                let mut zone = store.get_zone(id).await?;
                if let Some(name) = matches.get_one::<String>("name") {
                    zone.set_name(name.clone());
                }
                if let Some(a) = addresses(matches, "ipv4") {
                    zone.set_ipv4(a);
                }
                if let Some(aaaa) = addresses(matches, "ipv6") {
                    zone.set_ipv6(aaaa);
                }
                let zone = store.update_zone(&zone).await?;
                println!("{}", serde_json::to_string(&zone)?);
            }
            "delete-zone" => {
                let id = *matches.get_one::<ZoneID>("ID").expect("ID is required");
                store.delete_zone(id).await?;
                println!("Zone {id} deleted");
            }
            "add-domain" => {
                let name = matches.get_one::<String>("NAME").expect("NAME is required");
                let zone = *matches.get_one::<ZoneID>("ZONE").expect("ZONE is required");
                let mut domain = NewDomain::new(name.clone(), zone);
                if let Some(txt) = matches.get_one::<String>("txt") {
                    domain = domain.with_txt(txt.clone());
                }
                let domain = store.add_domain(domain).await?;
                println!("Domain '{}' added with id {}", domain.name(), domain.id());
            }
            "update-domain" => {
                let id = *matches.get_one::<DomainID>("ID").expect("ID is required");
                let mut domain = store.get_domain(id).await?;
                if let Some(zone) = matches.get_one::<ZoneID>("zone") {
                    domain.set_zone_id(*zone);
                }
                if let Some(name) = matches.get_one::<String>("name") {
                    domain.set_name(name.clone());
                }
                if let Some(txt) = matches.get_one::<String>("txt") {
                    domain.set_txt(txt.clone());
                }
                let domain = store.update_domain(&domain).await?;
                println!("{}", serde_json::to_string(&domain)?);
            }
            "delete-domain" => {
                let id = *matches.get_one::<DomainID>("ID").expect("ID is required");
                store.delete_domain(id).await?;
                println!("Domain {id} deleted");
            }
            "lookup-domain" => {
                let name = matches.get_one::<String>("NAME").expect("NAME is required");
                match store.lookup_domain(name).await? {
                    Some(domain) => println!("{}", serde_json::to_string(&domain)?),
                    None => return Err(format!("no domain named {name}").into()),
                }
            }
            _ => unreachable!("clap crimes?"),
        }
        Ok::<_, Box<dyn std::error::Error>>(())
    })
}

fn serve_dns(
    address: IpAddr,
    port: u16,
    config: ZoneDnsConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    rt.block_on(serve(address, port, config))
}

async fn serve(
    address: IpAddr,
    port: u16,
    config: ZoneDnsConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = SqliteStore::new_from_config(config.database())?;
    let service = ZoneDns::build(Arc::new(store), &config).await?;
    let refresh = service.shutdown_token();

    let mut server = ServerFuture::new(service);
    server.register_socket(tokio::net::UdpSocket::bind((address, port)).await?);
    server.register_listener(
        tokio::net::TcpListener::bind((address, port)).await?,
        Duration::from_secs(30),
    );

    println!("Server started on {address}:{port}");
    tokio::signal::ctrl_c().await?;
    refresh.cancel();
    server.shutdown_gracefully().await?;
    println!("...end");
    Ok(())
}
