use autoclaim::ledger::HttpLedgerClient;
use autoclaim::registry::{HttpSubjectRegistry, PostgresSubjectRegistry};
use autoclaim::shuffle::{RandomShuffler, Shuffler};
use autoclaim::{
    ClaimConfig, ClaimError, ClaimMatchingEngine, ClaimWorker, HealthCache, LedgerClient,
    RegistrySource, Shutdown, SubjectRegistry,
};
use clap::Parser;
use dotenv::dotenv;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "claim_worker")]
#[command(about = "Automated certificate claiming worker", long_about = None)]
struct Cli {
    /// Exit immediately without claiming
    #[arg(long)]
    disabled: bool,
    /// Wallet ledger base URL
    #[arg(long)]
    wallet_url: Option<String>,
    /// Subject enrollment API base URL
    #[arg(long)]
    registry_url: Option<String>,
    /// Postgres URL of the enrollment table
    #[arg(long)]
    database_url: Option<String>,
    /// Seed for the matching order
    #[arg(long)]
    seed: Option<u64>,
    /// Run a single pass and exit
    #[arg(long)]
    once: bool,
}

impl Cli {
    fn apply(self, config: &mut ClaimConfig) {
        if self.disabled {
            config.enabled = false;
        }
        if self.once {
            config.run_once = true;
        }
        if self.wallet_url.is_some() {
            config.wallet_url = self.wallet_url;
        }
        if self.registry_url.is_some() {
            config.registry_url = self.registry_url;
        }
        if self.database_url.is_some() {
            config.database_url = self.database_url;
        }
        if self.seed.is_some() {
            config.shuffle_seed = self.seed;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), ClaimError> {
    dotenv().ok();
    autoclaim::telemetry::init_tracing("claim-worker");

    let mut config = ClaimConfig::from_env()?;
    Cli::parse().apply(&mut config);
    config.validate()?;

    if !config.enabled {
        tracing::warn!("claim automation disabled by configuration");
        return Ok(());
    }

    let health = HealthCache::new();
    let ledger: Arc<dyn LedgerClient> = Arc::new(HttpLedgerClient::new(config.wallet_url()?)?);
    let registry: Arc<dyn SubjectRegistry> = match config.registry_source()? {
        RegistrySource::Http(url) => Arc::new(HttpSubjectRegistry::new(&url)?),
        RegistrySource::Postgres(url) => Arc::new(PostgresSubjectRegistry::new(&url)),
    };
    let shuffler: Arc<dyn Shuffler> = match config.shuffle_seed {
        Some(seed) => Arc::new(RandomShuffler::seeded(seed)),
        None => Arc::new(RandomShuffler::from_entropy()),
    };
    let worker = ClaimWorker::new(
        registry,
        ledger,
        ClaimMatchingEngine::new(shuffler),
        health.clone(),
    );

    let shutdown = Shutdown::new();
    if config.run_once {
        let report = worker.run_pass(&shutdown).await?;
        println!(
            "[claim_worker] subjects={} claims={} quantity={} health={}",
            report.subjects,
            report.claims,
            report.quantity_claimed,
            health.get()
        );
        return Ok(());
    }

    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown requested");
            signal.trigger();
        }
    });

    worker.run(shutdown).await;
    Ok(())
}
