//! One-shot run for cron: ingest every source once, optionally compose, print the report.

use clap::Parser;

use donkee::bootstrap::Runtime;
use donkee::config::BotConfig;

#[derive(Parser, Debug)]
#[command(name = "donkee-once", about = "Run one Donkee ingest pass and exit")]
struct Args {
    /// Also generate and publish one post after ingesting.
    #[arg(long)]
    compose: bool,

    /// Pretty-print the JSON report.
    #[arg(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    donkee::telemetry::init_tracing();
    let args = Args::parse();

    let runtime = Runtime::from_config(BotConfig::from_env()?).await?;

    let report = runtime.bot.ingest().await;
    let json = if args.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{json}");

    if args.compose {
        match runtime.bot.compose().await {
            Ok(outcome) => println!("{}", serde_json::to_string(&outcome)?),
            Err(e) => tracing::warn!(error = %e, "compose failed"),
        }
    }

    runtime.shutdown().await;
    Ok(())
}
