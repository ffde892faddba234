//! stationhub - monitoring-station ingestion hub
//!
//! Wires an in-memory bus, the configured stages and (optionally) simulated sensors, then
//! runs the supervisor until SIGINT/SIGTERM.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use stationhub::{
    BackoffPolicy, BusRef, Config, JitterPolicy, LogWriter, MemoryBus, MemoryStore, RandomIntegerSensor, Sensor,
    SensorPublisher, StageRegistry, Supervisor, logging,
};

/// Monitoring-station hub: bus → supervised pipeline → stages
#[derive(Parser, Debug)]
#[command(name = "stationhub")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Args {
    /// Log level name (RUST_LOG overrides it)
    #[arg(long, global = true, env = "LOG_LEVEL", default_value = "INFO")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the supervisor until a termination signal arrives
    Run(RunArgs),
    /// List the stage names accepted by `--stage`
    Stages,
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    /// Topic to subscribe to (repeatable)
    #[arg(long = "topic", env = "STATIONHUB_TOPICS", value_delimiter = ',', default_value = "sensors")]
    topics: Vec<String>,

    /// Stage to append to the chain, in order (repeatable)
    #[arg(long = "stage", env = "STATIONHUB_STAGES", value_delimiter = ',', default_value = "sensors")]
    stages: Vec<String>,

    /// Capacity of the producer → consumer channel
    #[arg(long, env = "STATIONHUB_CHANNEL_CAPACITY", default_value_t = 100)]
    channel_capacity: usize,

    /// Worker tick and wait interval in milliseconds
    #[arg(long, env = "STATIONHUB_TICK_MS", default_value_t = 1000)]
    tick_ms: u64,

    /// Pending buffer bound (0 = unbounded)
    #[arg(long, env = "STATIONHUB_MAX_PENDING", default_value_t = 0)]
    max_pending: usize,

    /// Cooldown after respawning a dead worker, in milliseconds
    #[arg(long, env = "STATIONHUB_RESPAWN_MS", default_value_t = 2000)]
    respawn_ms: u64,

    /// Growth of the cooldown per consecutive death (1.0 keeps it fixed)
    #[arg(long, env = "STATIONHUB_RESPAWN_FACTOR", default_value_t = 1.0)]
    respawn_factor: f64,

    /// Upper bound for the cooldown in milliseconds (defaults to --respawn-ms)
    #[arg(long, env = "STATIONHUB_RESPAWN_MAX_MS")]
    respawn_max_ms: Option<u64>,

    /// Randomization applied to the cooldown
    #[arg(long, env = "STATIONHUB_RESPAWN_JITTER", value_enum, default_value_t = Jitter::None)]
    respawn_jitter: Jitter,

    /// Grace period for shutdown, in seconds
    #[arg(long, env = "STATIONHUB_GRACE_SECS", default_value_t = 10)]
    grace_secs: u64,

    /// Publish random sensor readings to the `sensors` topic
    #[arg(long, env = "STATIONHUB_SIMULATE")]
    simulate: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Jitter {
    None,
    Full,
    Equal,
}

impl From<Jitter> for JitterPolicy {
    fn from(j: Jitter) -> Self {
        match j {
            Jitter::None => JitterPolicy::None,
            Jitter::Full => JitterPolicy::Full,
            Jitter::Equal => JitterPolicy::Equal,
        }
    }
}

impl RunArgs {
    fn respawn(&self) -> BackoffPolicy {
        let first = Duration::from_millis(self.respawn_ms);
        let max = self.respawn_max_ms.map_or(first, Duration::from_millis);
        BackoffPolicy {
            first,
            max: max.max(first),
            factor: self.respawn_factor.max(1.0),
            jitter: self.respawn_jitter.into(),
        }
    }

    fn config(&self) -> Config {
        let mut cfg = Config::default().with_interval(Duration::from_millis(self.tick_ms));
        cfg.channel_capacity = self.channel_capacity;
        cfg.producer.max_pending = self.max_pending;
        cfg.respawn = self.respawn();
        cfg.grace = Duration::from_secs(self.grace_secs);
        cfg
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init(&args.log_level);

    match args.command {
        Command::Stages => {
            let registry = StageRegistry::builtin(Arc::new(MemoryStore::new()));
            for name in registry.names() {
                println!("{name}");
            }
            Ok(())
        }
        Command::Run(run) => run_hub(run).await,
    }
}

async fn run_hub(args: RunArgs) -> anyhow::Result<()> {
    let broker = MemoryBus::new();
    let store = Arc::new(MemoryStore::new());
    let registry = StageRegistry::builtin(store);

    let stages = registry
        .resolve(args.stages.as_slice())
        .with_context(|| format!("known stages: {:?}", registry.names()))?;

    let bus: BusRef = Arc::new(broker.connect().await);
    let sup = Supervisor::builder(args.config(), bus)
        .topics(args.topics.clone())
        .context("invalid --topic")?
        .stages(stages)
        .context("invalid --stage")?
        .subscriber(Arc::new(LogWriter))
        .build()?;

    let simulator = CancellationToken::new();
    let publisher = if args.simulate {
        let sensors: Vec<Arc<dyn Sensor>> = vec![Arc::new(RandomIntegerSensor::default())];
        let publisher = SensorPublisher::new(
            Arc::new(broker.connect().await),
            sensors,
            Duration::from_millis(args.tick_ms),
        )
        .with_token(simulator.clone());
        Some(tokio::spawn(async move { publisher.run().await }))
    } else {
        None
    };

    let stages = sup.stages().names().await;
    info!(topics = ?sup.topics().as_slice(), ?stages, "stationhub starting");
    let res = sup.run_until_signal().await;

    simulator.cancel();
    if let Some(publisher) = publisher {
        if let Err(e) = publisher.await {
            error!(error = %e, "sensor publisher task failed");
        }
    }
    res?;
    info!("stationhub stopped");
    Ok(())
}
