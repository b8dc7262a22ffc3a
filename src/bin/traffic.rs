//! Storefront traffic generator
//!
//! Run with: cargo run --bin traffic -- --iterations 100 --fast
//!
//! Service URLs default to localhost and can also be set with
//! PRODUCTS_URL, ORDERS_URL and SHIPPING_URL.

use clap::Parser;
use std::process::ExitCode;
use std::time::Duration;
use storefront::traffic::{RunMode, ServiceUrls, TrafficConfig, TrafficGenerator};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const FAST_DELAY: f64 = 0.5;
const SLOW_DELAY: f64 = 3.0;

#[derive(Parser, Debug)]
#[command(name = "traffic")]
#[command(about = "Generate synthetic shopper traffic against the storefront services")]
#[command(version)]
struct Cli {
    /// Run until interrupted with Ctrl+C
    #[arg(long, conflicts_with = "iterations")]
    continuous: bool,

    /// Number of scenario iterations
    #[arg(long, short = 'n', default_value_t = 50)]
    iterations: u64,

    /// Short pause between iterations (0.5s)
    #[arg(long, conflicts_with_all = ["slow", "delay"])]
    fast: bool,

    /// Long pause between iterations (3s)
    #[arg(long, conflicts_with = "delay")]
    slow: bool,

    /// Pause between iterations in seconds
    #[arg(long, value_name = "SECONDS", value_parser = parse_delay)]
    delay: Option<f64>,

    /// Log every request
    #[arg(long, short = 'v')]
    verbose: bool,

    /// Seed for reproducible scenario selection
    #[arg(long)]
    seed: Option<u64>,

    #[arg(long, env = "PRODUCTS_URL", default_value = "http://127.0.0.1:3001")]
    products_url: String,

    #[arg(long, env = "ORDERS_URL", default_value = "http://127.0.0.1:5001")]
    orders_url: String,

    #[arg(long, env = "SHIPPING_URL", default_value = "http://127.0.0.1:8080")]
    shipping_url: String,
}

impl Cli {
    fn delay(&self) -> Duration {
        let secs = if self.fast {
            FAST_DELAY
        } else if self.slow {
            SLOW_DELAY
        } else {
            self.delay.unwrap_or(1.0)
        };
        Duration::from_secs_f64(secs)
    }

    fn into_config(self) -> TrafficConfig {
        TrafficConfig {
            urls: ServiceUrls::new(&self.products_url, &self.orders_url, &self.shipping_url),
            mode: if self.continuous {
                RunMode::Continuous
            } else {
                RunMode::Iterations(self.iterations)
            },
            delay: self.delay(),
            verbose: self.verbose,
            seed: self.seed,
            ..Default::default()
        }
    }
}

fn parse_delay(s: &str) -> Result<f64, String> {
    let secs: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("invalid delay: {}", s))?;
    if !secs.is_finite() || secs < 0.0 {
        return Err(format!("delay must be a non-negative number of seconds: {}", s));
    }
    Ok(secs)
}

async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install CTRL+C signal handler: {}", e);
        std::future::pending::<()>().await;
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let default_filter = if cli.verbose {
        "storefront=debug,traffic=debug"
    } else {
        "storefront=info,traffic=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = cli.into_config();
    tracing::info!("Traffic configuration:");
    tracing::info!("  Products: {}", config.urls.products);
    tracing::info!("  Orders:   {}", config.urls.orders);
    tracing::info!("  Shipping: {}", config.urls.shipping);
    tracing::info!("  Mode:     {:?}", config.mode);
    tracing::info!("  Delay:    {:.1}s", config.delay.as_secs_f64());

    let mut generator = match TrafficGenerator::new(config) {
        Ok(generator) => generator,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match generator.preflight().await {
        Ok(health) => tracing::info!(%health, "Services reachable"),
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    }

    let stats = generator.run(interrupted()).await;
    println!("\n{}", stats);
    ExitCode::SUCCESS
}
