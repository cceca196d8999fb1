use clap::{Parser, ValueEnum};
use std::sync::Arc;
use std::time::Duration;

use stockbot::batch::{BatchConfig, BatchReport, BatchRequest, CancelFlag, LogSink, SymbolOutcome};
use stockbot::consensus::StrategyWeights;
use stockbot::engine::RecommendationEngine;
use stockbot::input;
use stockbot::models::{Recommendation, StrategyId};
use stockbot::provider::{FeatureApiClient, FeatureProvider, MarketScenario, Period, SyntheticFeed};

#[derive(Parser)]
#[command(name = "stockbot", version, about = "Multi-strategy stock recommendation engine", long_about = None)]
struct Cli {
    /// Ticker symbol to analyze (omit when using --multi or --file)
    symbol: Option<String>,

    /// Comma-separated symbols for a small batch, e.g. AAPL,MSFT,NVDA
    #[arg(long, conflicts_with = "symbol")]
    multi: Option<String>,

    /// Watchlist file: one or more symbols per line, `#` starts a comment
    #[arg(long, conflicts_with_all = ["symbol", "multi"])]
    file: Option<String>,

    /// History window behind the feature snapshot
    #[arg(long, default_value = "1y")]
    period: Period,

    /// Strategy to run
    #[arg(long, value_enum, default_value_t = StrategyChoice::Combined)]
    strategy: StrategyChoice,

    /// Print raw JSON instead of the formatted view
    #[arg(long)]
    json: bool,

    /// Use the offline synthetic feed with the given market scenario
    #[arg(long, value_enum)]
    synthetic: Option<ScenarioChoice>,

    /// Override the number of concurrent evaluations in batch mode
    #[arg(long)]
    concurrency: Option<usize>,

    /// Override the per-symbol timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Override the retry budget per symbol
    #[arg(long)]
    retries: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StrategyChoice {
    Technical,
    Quantitative,
    Model,
    Combined,
}

impl StrategyChoice {
    fn to_ids(self) -> Vec<StrategyId> {
        match self {
            StrategyChoice::Technical => vec![StrategyId::Technical],
            StrategyChoice::Quantitative => vec![StrategyId::Quantitative],
            StrategyChoice::Model => vec![StrategyId::Model],
            StrategyChoice::Combined => StrategyId::ALL.to_vec(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ScenarioChoice {
    Bullish,
    Bearish,
    Sideways,
    Volatile,
}

impl ScenarioChoice {
    fn to_scenario(self) -> MarketScenario {
        match self {
            ScenarioChoice::Bullish => MarketScenario::Bullish,
            ScenarioChoice::Bearish => MarketScenario::Bearish,
            ScenarioChoice::Sideways => MarketScenario::Sideways,
            ScenarioChoice::Volatile => MarketScenario::Volatile,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    setup_logging();

    let cli = Cli::parse();

    let provider = build_provider(&cli);
    let engine = Arc::new(RecommendationEngine::new(provider));
    let weights = weights_from_env();
    let strategies = cli.strategy.to_ids();

    if let Some(path) = &cli.file {
        let symbols = input::load_symbol_file(path)?;
        run_batch_mode(engine, symbols, strategies, weights, &cli).await
    } else if let Some(inline) = &cli.multi {
        let symbols = input::parse_inline_symbols(inline)?;
        run_batch_mode(engine, symbols, strategies, weights, &cli).await
    } else if let Some(symbol) = &cli.symbol {
        run_single_mode(engine, symbol, strategies, weights, &cli).await
    } else {
        anyhow::bail!("Give a symbol, or use --multi / --file for a batch (see --help)");
    }
}

// ============================================================================
// Initialization
// ============================================================================

fn setup_logging() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "stockbot=info".to_string());
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn build_provider(cli: &Cli) -> Arc<dyn FeatureProvider> {
    if let Some(choice) = cli.synthetic {
        let scenario = choice.to_scenario();
        let seed = std::env::var("STOCKBOT_SYNTHETIC_SEED")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(42);
        tracing::info!("📊 Using synthetic {} feed (no network)", scenario);
        Arc::new(SyntheticFeed::new(scenario, seed))
    } else {
        match std::env::var("STOCKBOT_FEATURES_URL") {
            Ok(url) => Arc::new(FeatureApiClient::with_base_url(url)),
            Err(_) => Arc::new(FeatureApiClient::new()),
        }
    }
}

fn weights_from_env() -> StrategyWeights {
    let defaults = StrategyWeights::default();
    StrategyWeights {
        technical: env_f64("STOCKBOT_WEIGHT_TECHNICAL", defaults.technical),
        quantitative: env_f64("STOCKBOT_WEIGHT_QUANT", defaults.quantitative),
        model: env_f64("STOCKBOT_WEIGHT_MODEL", defaults.model),
    }
}

fn env_f64(name: &str, default: f64) -> f64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<f64>().ok())
        .unwrap_or(default)
}

// ============================================================================
// Modes
// ============================================================================

async fn run_single_mode(
    engine: Arc<RecommendationEngine>,
    symbol: &str,
    strategies: Vec<StrategyId>,
    weights: StrategyWeights,
    cli: &Cli,
) -> anyhow::Result<()> {
    let recommendation = match engine
        .evaluate_one(symbol, &strategies, &weights, cli.period)
        .await
    {
        Ok(rec) => rec,
        Err(err) => {
            eprintln!("❌ {}: {}", symbol.trim().to_uppercase(), err.friendly());
            std::process::exit(1);
        }
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&recommendation)?);
    } else {
        print_recommendation(&recommendation);
    }
    Ok(())
}

async fn run_batch_mode(
    engine: Arc<RecommendationEngine>,
    symbols: Vec<String>,
    strategies: Vec<StrategyId>,
    weights: StrategyWeights,
    cli: &Cli,
) -> anyhow::Result<()> {
    let mut config = BatchConfig::optimized_for(symbols.len());
    if let Some(n) = cli.concurrency {
        config.max_concurrency = n.max(1);
    }
    if let Some(secs) = cli.timeout_secs {
        config.per_task_timeout = Duration::from_secs(secs);
    }
    if let Some(n) = cli.retries {
        config.max_retries = n;
    }

    let request = BatchRequest {
        symbols,
        strategies,
        weights,
        period: cli.period,
    };

    // Ctrl+C stops dispatching; in-flight work winds down cooperatively.
    let cancel = CancelFlag::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("🛑 Ctrl+C received, stopping batch...");
                cancel.cancel();
            }
        });
    }

    let report = engine
        .evaluate_batch(request, config, Arc::new(LogSink), cancel)
        .await;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_batch_report(&report);
    }
    Ok(())
}

// ============================================================================
// Output Formatting
// ============================================================================

fn print_recommendation(rec: &Recommendation) {
    println!("\n╔═══════════════════════════════════════════════════════╗");
    println!("║               STOCKBOT RECOMMENDATION                 ║");
    println!("╚═══════════════════════════════════════════════════════╝\n");

    println!("  Symbol:     {}", rec.symbol);
    println!("  As of:      {}", rec.as_of.format("%Y-%m-%d %H:%M UTC"));
    println!("  Action:     {} (score {:+.1})", rec.action.label(), rec.score);
    println!("  Confidence: {:.0}%", rec.confidence);
    println!("  Consensus:  {}", rec.consensus);
    println!("  Risk:       {}", rec.risk_level());

    println!("\n  Strategy breakdown:");
    println!(
        "  {:<14} {:>8} {:>11}  {}",
        "Strategy", "Score", "Confidence", "Notes"
    );
    println!("  {}", "─".repeat(64));
    for outcome in &rec.outcomes {
        if let Some(failure) = &outcome.failure {
            println!(
                "  {:<14} {:>8} {:>11}  skipped: {}",
                outcome.strategy.as_str(),
                "-",
                "-",
                failure
            );
        } else {
            println!(
                "  {:<14} {:>8.1} {:>10.0}%  {}",
                outcome.strategy.as_str(),
                outcome.score,
                outcome.confidence,
                outcome.reasons.join("; ")
            );
        }
    }
    println!();
}

fn print_batch_report(report: &BatchReport) {
    println!("\n╔═══════════════════════════════════════════════════════╗");
    println!("║                STOCKBOT BATCH REPORT                  ║");
    println!("╚═══════════════════════════════════════════════════════╝\n");

    println!(
        "  Batch {} finished in {:.1}s: {} succeeded, {} failed, {} cancelled\n",
        report.batch_id,
        report.elapsed.as_secs_f64(),
        report.succeeded,
        report.failed,
        report.cancelled
    );

    println!(
        "  {:<10} {:<12} {:>7} {:>6} {:>9}  {}",
        "Symbol", "Action", "Score", "Conf%", "Attempts", "Detail"
    );
    println!("  {}", "─".repeat(68));
    for entry in &report.entries {
        match &entry.outcome {
            SymbolOutcome::Succeeded { recommendation } => {
                println!(
                    "  {:<10} {:<12} {:>+7.1} {:>6.0} {:>9}  {} consensus, {} risk",
                    entry.symbol,
                    recommendation.action.label(),
                    recommendation.score,
                    recommendation.confidence,
                    entry.attempts,
                    recommendation.consensus,
                    recommendation.risk_level()
                );
            }
            SymbolOutcome::Failed { reason, .. } => {
                println!(
                    "  {:<10} {:<12} {:>7} {:>6} {:>9}  {}",
                    entry.symbol, "FAILED", "-", "-", entry.attempts, reason
                );
            }
            SymbolOutcome::Cancelled => {
                println!(
                    "  {:<10} {:<12} {:>7} {:>6} {:>9}  stopped before completion",
                    entry.symbol, "CANCELLED", "-", "-", entry.attempts
                );
            }
        }
    }

    if let Some(best) = report
        .recommendations()
        .max_by(|a, b| a.score.total_cmp(&b.score))
    {
        println!(
            "\n🏆 Strongest signal: {} {} ({:+.1})",
            best.symbol,
            best.action.label(),
            best.score
        );
    }
    println!();
}
