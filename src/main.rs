use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use matchday::config::TrackerConfig;
use matchday::controller::SessionController;
use matchday::notify::NotifierConfig;
use matchday::provider::ProviderConfig;
use matchday::store::StoreConfig;

const USAGE: &str = "usage: matchday <morning|check>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Morning,
    Check,
}

fn parse_command() -> Result<Command> {
    match std::env::args().nth(1).as_deref() {
        Some("morning") => Ok(Command::Morning),
        Some("check") => Ok(Command::Check),
        Some(other) => Err(anyhow!("unknown command {other:?}; {USAGE}")),
        None => Err(anyhow!(USAGE)),
    }
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let command = parse_command()?;
    let config = TrackerConfig::from_env();
    let store = StoreConfig::from_env().build();
    let provider = ProviderConfig::from_env()
        .and_then(ProviderConfig::build)
        .context("fixture provider configuration")?;
    let notifier = NotifierConfig::from_env()
        .context("notifier configuration")?
        .build();
    let policy = config.prediction_policy.build();

    let controller = SessionController::new(
        &config,
        store.as_ref(),
        provider.as_ref(),
        notifier.as_ref(),
        policy.as_ref(),
    );

    let now = Utc::now();
    match command {
        Command::Morning => {
            let outcome = controller.run_morning_selection(now);
            info!(?outcome, "morning run finished");
        }
        Command::Check => {
            let outcome = controller.run_check_poll(now);
            info!(?outcome, "check run finished");
        }
    }
    Ok(())
}
