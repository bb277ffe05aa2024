use std::net::UdpSocket;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use matching_exchange::dispatch::{OrderBookManager, DEFAULT_QUEUE_CAPACITY};
use matching_exchange::model::{Symbol, TWO_DIGITS_PRICE_SPEC};
use matching_exchange::{Exchange, ReportSink, UdpIngress};

/// UDP multi-symbol limit order book matching engine.
#[derive(Parser, Debug)]
#[command(name = "matching-exchange", about = "UDP Exchange Server")]
struct Cli {
    /// UDP port to listen on (1-65535).
    #[arg(value_parser = clap::value_parser!(u16).range(1..=65535))]
    port: u16,

    /// Number of shard worker threads.
    #[arg(long, default_value_t = default_shard_count())]
    shards: usize,

    /// Per-shard event queue capacity.
    #[arg(long, default_value_t = DEFAULT_QUEUE_CAPACITY)]
    queue_capacity: usize,

    /// Report sink queue capacity.
    #[arg(long, default_value_t = 4096)]
    report_capacity: usize,

    /// Tradable symbols, comma-separated (e.g. AAPL,MSFT).
    #[arg(long, default_value = "AAPL", value_delimiter = ',')]
    symbols: Vec<String>,
}

fn default_shard_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| (n.get() / 2).max(2))
        .unwrap_or(2)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let symbols: Vec<Symbol> = cli
        .symbols
        .iter()
        .map(|s| Symbol::from_str_truncating(s))
        .collect();

    let sink = Arc::new(ReportSink::to_stdout(cli.report_capacity));
    let manager = Arc::new(OrderBookManager::new(
        &symbols,
        Arc::clone(&sink),
        cli.shards,
        cli.queue_capacity,
    ));
    let ingress = Arc::new(
        UdpIngress::bind(cli.port).with_context(|| format!("failed to bind UDP port {}", cli.port))?,
    );

    let exchange = Arc::new(Exchange::new(
        Arc::clone(&ingress),
        Arc::clone(&manager),
        Arc::clone(&sink),
        TWO_DIGITS_PRICE_SPEC,
    ));

    let signal_port = cli.port;
    let signal_exchange = Arc::clone(&exchange);
    ctrlc::set_handler(move || {
        info!(port = signal_port, "received shutdown signal");
        if let Ok(socket) = UdpSocket::bind("127.0.0.1:0") {
            let _ = socket.send_to(b"QUIT", ("127.0.0.1", signal_port));
        }
        signal_exchange.stop();
    })
    .context("failed to install signal handler")?;

    info!(port = cli.port, shards = cli.shards, "UDP exchange server running");
    exchange.run();
    info!("server stopped");

    Ok(())
}
