//! Console demo driving a payment pipeline through a fixed set of scenarios.

use anyhow::{Context, Result};
use clap::Parser;
use paychain::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Retry delay used by the demo when neither a config file nor a flag sets one.
const DEMO_DELAY_MS: u64 = 300;

const CARD: &str = "4111111111111111";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON pipeline configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Maximum gateway attempts per request
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Delay between attempts in milliseconds
    #[arg(long)]
    delay_ms: Option<u64>,

    /// Probability in [0, 1] that a gateway call fails transiently
    #[arg(long)]
    failure_probability: Option<f64>,

    /// Seed for a reproducible failure sequence
    #[arg(long)]
    seed: Option<u64>,

    /// Comma-separated layer order, outermost first
    #[arg(long, value_delimiter = ',')]
    layers: Option<Vec<Layer>>,

    /// Number of distinct payments in the batch scenario
    #[arg(long, default_value_t = 10)]
    batch: usize,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

impl Cli {
    fn pipeline_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_file(path)
                .with_context(|| format!("failed to load {}", path.display()))?,
            None => {
                let mut config = PipelineConfig::default();
                config.retry.delay_ms = DEMO_DELAY_MS;
                config
            }
        };

        if let Some(max_attempts) = self.max_attempts {
            config.retry.max_attempts = max_attempts;
        }
        if let Some(delay_ms) = self.delay_ms {
            config.retry.delay_ms = delay_ms;
        }
        if let Some(probability) = self.failure_probability {
            config.gateway.failure_probability = probability;
        }
        if self.seed.is_some() {
            config.gateway.seed = self.seed;
        }
        if let Some(layers) = &self.layers {
            config.layers.clone_from(layers);
        }

        config.validate()?;
        Ok(config)
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    if json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

/// Cancels the returned token on the first Ctrl-C.
fn shutdown_on_ctrl_c() -> Arc<CancellationToken> {
    let token = Arc::new(CancellationToken::new());
    token.on_cancel(|| warn!("Shutdown requested, pending retries will stop"));

    let on_signal = Arc::clone(&token);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel("interrupted");
        }
    });
    token
}

fn request(key: &str, amount: Decimal, card: &str, cvc: &str) -> PaymentRequest {
    PaymentRequest::new(key, amount, card, "Jane Doe", "12/27", cvc)
}

async fn run_scenario(pipeline: &Pipeline, title: &str, request: &PaymentRequest) {
    println!("\n--- {title} ---");
    println!(
        "key={:?} amount={} card={}",
        request.idempotency_key,
        request.amount,
        request.masked_card_number()
    );
    match pipeline.process(request).await {
        Ok(response) => println!("{response}"),
        Err(err) => println!("[error:{}] {err}", err.kind()),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let config = cli.pipeline_config()?;
    let shutdown = shutdown_on_ctrl_c();
    let gateway = Arc::new(TransactionGateway::from_config(&config.gateway));
    let pipeline = PipelineBuilder::from_config(&config)
        .with_cancellation(Arc::clone(&shutdown))
        .build(Arc::clone(&gateway))
        .context("failed to assemble pipeline")?;

    info!(
        layers = ?pipeline.layers(),
        max_attempts = config.retry.max_attempts,
        delay_ms = config.retry.delay_ms,
        failure_probability = config.gateway.failure_probability,
        "Pipeline ready"
    );

    let valid = request("order-001", dec!(100.00), CARD, "123");
    run_scenario(&pipeline, "Valid payment", &valid).await;
    run_scenario(&pipeline, "Duplicate submission", &valid).await;
    let invalid = [
        ("Negative amount", request("order-002", dec!(-5), CARD, "123")),
        ("Short card number", request("order-003", dec!(25), "4111", "123")),
        ("Bad CVC", request("order-004", dec!(25), CARD, "12")),
        ("Missing idempotency key", request("", dec!(25), CARD, "123")),
    ];
    for (title, request) in &invalid {
        run_scenario(&pipeline, title, request).await;
    }

    println!("\n--- Batch of {} payments ---", cli.batch);
    let mut approved = 0usize;
    for i in 0..cli.batch {
        if shutdown.is_cancelled() {
            break;
        }
        let amount = Decimal::from(10 + i) + dec!(0.99);
        let request = request(&format!("batch-{i:03}"), amount, CARD, "123");
        match pipeline.process(&request).await {
            Ok(response) if response.success => approved += 1,
            Ok(response) => println!("{}: {}", request.idempotency_key, response.message),
            Err(err) => println!("{}: {err}", request.idempotency_key),
        }
    }
    println!("approved {approved}/{}", cli.batch);

    println!("\n--- Summary ---");
    println!("gateway calls: {}", gateway.invocation_count());
    if let Some(store) = pipeline.idempotency_store() {
        println!("cached responses: {}", store.len());
    }
    match pipeline.metrics_snapshot() {
        Some(snapshot) => println!("metrics: {snapshot}"),
        None => println!("metrics: layer not installed"),
    }

    Ok(())
}
