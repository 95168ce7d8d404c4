#![forbid(unsafe_code)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use chaos_proxy_lib::config::{
    load_from_path, load_json_or_default, sibling_path, BypassRules, CdnDomains, DnsServers,
};
use chaos_proxy_lib::proxy::{self, ProxyContext};
use chaos_proxy_lib::telemetry::{init_tracing, serve_stats};
use chaos_proxy_lib::{
    BypassList, ConnectionLimiter, DnsResolver, DomainFronter, StatsCollector,
};
use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about = "Chaos-driven anti-censorship forward proxy")]
struct Cli {
    /// Path to configuration YAML file
    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = "config/config.yaml"
    )]
    config: PathBuf,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let cfg = match load_from_path(&cli.config) {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("failed to load configuration: {err}");
            std::process::exit(1);
        }
    };

    init_tracing(&cfg.logging);
    info!(config = %cli.config.display(), "chaos proxy starting");

    let servers: DnsServers =
        load_json_or_default(&sibling_path(&cli.config, &cfg.dns.servers_file));
    let cdn_domains: CdnDomains =
        load_json_or_default(&sibling_path(&cli.config, &cfg.evasion.cdn_domains_file));
    let bypass_rules: BypassRules =
        load_json_or_default(&sibling_path(&cli.config, &cfg.bypass.domains_file));

    let ctx = Arc::new(ProxyContext {
        dns: DnsResolver::new(servers, &cfg.dns),
        bypass: BypassList::from_rules(bypass_rules),
        fronter: DomainFronter::new(cdn_domains, cfg.evasion.domain_fronting),
        stats: StatsCollector::new(),
        limiter: ConnectionLimiter::new(cfg.limits.max_connections),
        buffers: cfg.buffers.clone(),
        chaos: cfg.chaos.clone(),
        evasion: cfg.evasion.clone(),
    });

    let listener = match TcpListener::bind(cfg.server.listen_addr()).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(addr = %cfg.server.listen_addr(), %err, "failed to bind listener");
            std::process::exit(1);
        }
    };

    if cfg.web.enabled {
        let web_addr = SocketAddr::from(([0, 0, 0, 0], cfg.web.port));
        let web_ctx = ctx.clone();
        tokio::spawn(async move {
            if let Err(err) = serve_stats(web_addr, web_ctx).await {
                error!(%err, "stats endpoint exited");
            }
        });
    }

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    if let Err(err) = proxy::run(ctx.clone(), listener, &mut shutdown_rx).await {
        error!(%err, "proxy exited with error");
        std::process::exit(1);
    }

    ctx.stats.log_summary().await;
    info!("chaos proxy stopped");
}

async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
