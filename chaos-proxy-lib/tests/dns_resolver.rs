use chaos_proxy_lib::config::{DnsConfig, DnsMode, DnsServers, DotServer};
use chaos_proxy_lib::DnsResolver;
use tokio::net::TcpListener;

type TestResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// A DoT upstream that accepts and immediately hangs up, so every
/// encrypted query dies during the TLS handshake.
async fn spawn_dead_tls_server() -> TestResult<u16> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let port = listener.local_addr()?.port();
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                continue;
            };
            drop(stream);
        }
    });
    Ok(port)
}

fn dot_resolver(port: u16) -> DnsResolver {
    let servers = DnsServers {
        doh_servers: Vec::new(),
        dot_servers: vec![DotServer {
            name: "dead".to_string(),
            host: "127.0.0.1".to_string(),
            port,
            hostname: Some("localhost".to_string()),
        }],
    };
    let config = DnsConfig { mode: DnsMode::Dot, ..DnsConfig::default() };
    DnsResolver::new(servers, &config)
}

#[tokio::test]
async fn falls_back_to_the_system_resolver_and_caches() -> TestResult<()> {
    let port = spawn_dead_tls_server().await?;
    let resolver = dot_resolver(port);

    let ip = resolver
        .resolve("localhost")
        .await
        .ok_or("system fallback returned nothing")?;
    assert!(ip.is_loopback());

    // the fallback answer landed in the cache
    let stats = resolver.cache_stats();
    assert_eq!(stats.cache_size, 1);

    // a second lookup is a cache hit, case-insensitively
    let ip2 = resolver.resolve("LOCALHOST").await.ok_or("expected cache hit")?;
    assert_eq!(ip, ip2);
    assert_eq!(resolver.cache_stats().cache_hits, 1);
    Ok(())
}

#[tokio::test]
async fn ipv4_literals_short_circuit_resolution() -> TestResult<()> {
    let port = spawn_dead_tls_server().await?;
    let resolver = dot_resolver(port);

    let ip = resolver.resolve("93.184.216.34").await.ok_or("literal")?;
    assert_eq!(ip.to_string(), "93.184.216.34");

    // literals never touch the cache
    assert_eq!(resolver.cache_stats().cache_size, 0);
    Ok(())
}

#[tokio::test]
async fn unresolvable_names_return_none() -> TestResult<()> {
    let port = spawn_dead_tls_server().await?;
    let resolver = dot_resolver(port);

    assert!(resolver.resolve("does-not-exist.invalid").await.is_none());
    Ok(())
}
