//! Soak command - drive a registry with simulated concurrent clients.
//!
//! Each client is a task that binds its token on every request the way a
//! transport would, bumps a per-session visit counter, and bumps the shared
//! request counter. Clients can periodically discard their token so the
//! sweep has abandoned sessions to evict.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Result, bail};
use clap::Args;
use console::{Style, style};
use serde::Serialize;

use satchel_session::{
    RegistryConfig, SessionBinder, SessionRegistry, SharedDataStore, SharedSessionStore, Value,
};

use super::Context;

const APPLICATION_NAME: &str = "satchel-soak";
const REQUESTS_KEY: &str = "requests";
const VISITS_KEY: &str = "visits";

/// Arguments for the soak command.
#[derive(Args, Debug)]
pub struct SoakArgs {
    /// Number of concurrent clients
    #[arg(long, default_value_t = 8)]
    pub clients: usize,

    /// Requests issued by each client
    #[arg(long, default_value_t = 50)]
    pub requests: usize,

    /// Pause between a client's requests, in milliseconds
    #[arg(long, default_value_t = 1)]
    pub interval_ms: u64,

    /// Session expiration override, in milliseconds
    #[arg(long)]
    pub expiration_ms: Option<u64>,

    /// Sweep interval override, in milliseconds
    #[arg(long)]
    pub sweep_ms: Option<u64>,

    /// Discard the client's token every K requests (0 disables)
    #[arg(long, default_value_t = 0)]
    pub abandon_every: usize,

    /// Wait after the last request before reporting, in milliseconds
    #[arg(long, default_value_t = 0)]
    pub settle_ms: u64,
}

/// Outcome of a soak run.
#[derive(Debug, Serialize)]
struct SoakReport {
    clients: usize,
    requests_per_client: usize,
    requests_served: u64,
    sessions_issued: usize,
    sessions_live: usize,
    sessions_expired: usize,
    sweep_passes: u64,
    evicted: u64,
    elapsed_ms: u128,
}

/// Per-client tally.
#[derive(Debug, Default)]
struct ClientOutcome {
    issued: usize,
}

/// Run the soak command.
pub async fn run(args: SoakArgs, ctx: &Context) -> Result<()> {
    if args.clients == 0 || args.requests == 0 {
        bail!("--clients and --requests must both be at least 1");
    }

    let mut config = RegistryConfig::from_session_config(&ctx.loaded.config.session_or_default());
    if let Some(ms) = args.expiration_ms {
        config = config.with_default_expiration(Duration::from_millis(ms));
    }
    if let Some(ms) = args.sweep_ms {
        config = config.with_sweep_interval(Duration::from_millis(ms));
    }

    tracing::info!(
        clients = args.clients,
        requests = args.requests,
        expiration_ms = config.default_expiration.as_millis() as u64,
        sweep_ms = config.sweep_interval.as_millis() as u64,
        sweep = config.enable_sweep,
        "Starting soak run"
    );

    let registry = SessionRegistry::start(config);
    let store: SharedSessionStore = Arc::new(registry.clone());
    let shared = Arc::new(SharedDataStore::new());
    let binder = SessionBinder::new(APPLICATION_NAME, store, Arc::clone(&shared));

    let started = Instant::now();
    let mut handles = Vec::with_capacity(args.clients);
    for client in 0..args.clients {
        let binder = binder.clone();
        let requests = args.requests;
        let abandon_every = args.abandon_every;
        let pause = Duration::from_millis(args.interval_ms);
        handles.push(tokio::spawn(async move {
            run_client(client, binder, requests, abandon_every, pause).await
        }));
    }

    let mut issued = 0;
    for handle in handles {
        issued += handle.await?.issued;
    }

    if args.settle_ms > 0 {
        tokio::time::sleep(Duration::from_millis(args.settle_ms)).await;
    }

    let stats = registry.stats();
    registry.stop().await;

    let requests_served = shared
        .get(REQUESTS_KEY)
        .and_then(|v| v.as_u64())
        .unwrap_or(0);

    let report = SoakReport {
        clients: args.clients,
        requests_per_client: args.requests,
        requests_served,
        sessions_issued: issued,
        sessions_live: stats.sessions - stats.expired,
        sessions_expired: stats.expired,
        sweep_passes: stats.sweep_passes,
        evicted: stats.evicted,
        elapsed_ms: started.elapsed().as_millis(),
    };

    tracing::info!(
        served = report.requests_served,
        issued = report.sessions_issued,
        evicted = report.evicted,
        "Soak run finished"
    );

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report, ctx.verbose);
    }
    Ok(())
}

async fn run_client(
    client: usize,
    binder: SessionBinder,
    requests: usize,
    abandon_every: usize,
    pause: Duration,
) -> ClientOutcome {
    let mut outcome = ClientOutcome::default();
    let mut token: Option<String> = None;

    for request in 1..=requests {
        let bound = binder.bind(token.as_deref()).await;
        if let Some(issued) = bound.issued_token() {
            outcome.issued += 1;
            token = Some(issued.value);
        }

        let session = bound.session();
        let visits = session.get(VISITS_KEY).and_then(|v| v.as_u64()).unwrap_or(0) + 1;
        session.set(VISITS_KEY, visits);

        bound.shared().update(REQUESTS_KEY, |current| {
            Value::from(current.and_then(Value::as_u64).unwrap_or(0) + 1)
        });

        tracing::trace!(client, request, visits, "Request served");

        if abandon_every > 0 && request % abandon_every == 0 {
            token = None;
        }
        if !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
    }

    outcome
}

fn print_report(report: &SoakReport, verbose: bool) {
    let label = Style::new().dim();

    println!("{}", style("Soak run complete").bold().green());
    println!(
        "  {}  {} x {}",
        label.apply_to("clients     "),
        report.clients,
        report.requests_per_client
    );
    println!(
        "  {}  {}",
        label.apply_to("served      "),
        report.requests_served
    );
    println!(
        "  {}  {}",
        label.apply_to("issued      "),
        report.sessions_issued
    );
    println!(
        "  {}  {} live, {} expired",
        label.apply_to("tracked     "),
        report.sessions_live,
        report.sessions_expired
    );
    println!(
        "  {}  {} ({} passes)",
        label.apply_to("evicted     "),
        report.evicted,
        report.sweep_passes
    );
    if verbose {
        println!(
            "  {}  {}ms",
            label.apply_to("elapsed     "),
            report.elapsed_ms
        );
    }
}
