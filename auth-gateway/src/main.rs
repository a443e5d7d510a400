use anyhow::Context;
use auth_gateway::{router, SkillRequestGuard};
use clap::Parser;
use colored::*;
use skill_verification::{RequestAuthenticator, SystemClock, VerifierConfig};
use std::{
    env,
    io::{self, IsTerminal},
    net::SocketAddr,
    sync::Arc,
    time::Duration,
};
use tracing::{info, Level};
use tracing_subscriber::{
    fmt::{self, time::ChronoUtc},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

const CACHE_PURGE_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Signed voice skill request gateway
#[derive(Parser, Debug)]
#[command(name = "auth-gateway")]
#[command(about = "Authenticates signed voice skill requests before they reach RustCare handlers")]
struct Args {
    /// Server bind address
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Server port
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Path of the signature-guarded skill endpoint
    #[arg(long, default_value = "/skill")]
    route: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    init_tracing(args.verbose);

    info!("🔐 {}", "Starting skill request gateway".bright_cyan());
    info!("📋 Version: {}", env!("CARGO_PKG_VERSION").bright_white());

    let config = VerifierConfig::from_env().context("invalid verifier configuration")?;
    info!(
        fetch_timeout_secs = config.fetch_timeout.as_secs(),
        timestamp_tolerance_secs = config.timestamp_tolerance.num_seconds(),
        max_body_bytes = config.max_body_bytes,
        "verifier configuration loaded"
    );

    let clock = Arc::new(SystemClock);
    let authenticator = Arc::new(
        RequestAuthenticator::http(&config, clock.clone())
            .context("failed to build certificate HTTP client")?,
    );

    let purge_target = Arc::clone(&authenticator);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CACHE_PURGE_INTERVAL);
        loop {
            interval.tick().await;
            let purged = purge_target.cache().purge_expired();
            if purged > 0 {
                info!(purged, "expired signing certificates purged");
            }
        }
    });

    let guard = SkillRequestGuard::new(authenticator, clock, config);
    let app = router(guard, &args.route);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .with_context(|| format!("invalid bind address {}:{}", args.host, args.port))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;

    info!("🚀 {}", format!("Gateway running on http://{}", addr).bright_green());
    info!("📋 {}", format!("Health check available at: http://{}/health", addr).bright_blue());
    info!("🎙️  {}", format!("Skill endpoint: POST http://{}{}", addr, args.route).bright_blue());

    axum::serve(listener, app).await.context("HTTP server error")?;
    Ok(())
}

fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    let is_development =
        env::var("RUSTCARE_ENV").unwrap_or_else(|_| "development".to_string()) == "development";
    let use_colors = env::var("NO_COLOR").is_err() && io::stdout().is_terminal();

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "auth_gateway={level},skill_verification={level},tower_http=info"
        )
        .into()
    });

    if is_development && use_colors {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(true)
                    .with_level(true),
            )
            .init();

        print_startup_banner();
    } else {
        // Structured JSON logging for production
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(false)
                    .json(),
            )
            .init();
    }
}

fn print_startup_banner() {
    println!("{}", "╔══════════════════════════════════════════════════════════════╗".bright_cyan());
    println!("{}", "║                  🔐 RUSTCARE SKILL GATEWAY                   ║".bright_cyan());
    println!("{}", "║             Signed Voice Request Authentication              ║".bright_cyan());
    println!("{}", "╚══════════════════════════════════════════════════════════════╝".bright_cyan());
    println!();
}
