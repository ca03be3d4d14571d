use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{ArgAction, Parser};
use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use idle_tracker::bridge::dbus::ScreenSaverSource;
use idle_tracker::config::generate_client_id;
use idle_tracker::logging::{self, LogFormat};
use idle_tracker::sink::mqtt::MqttSink;
use idle_tracker::sink::topic::{local_host_name, local_user_name, status_topic};
use idle_tracker::{
    BrokerConfig, Config, Event, EventKind, LogWriter, RuntimeError, Subscribe, Tracker,
    wait_for_shutdown_signal,
};

/// Publish this desktop user's activity state to an MQTT broker.
#[derive(Parser, Debug)]
#[command(name = "idle-tracker", version, about)]
struct Cli {
    /// Broker file (default: ~/.config/mqtt/mqtt.toml).
    #[arg(long, env = "IDLE_TRACKER_CONFIG")]
    config: Option<PathBuf>,

    /// Profile (table) to read from the broker file.
    #[arg(long, default_value = "default")]
    profile: String,

    /// Seconds between heartbeat publishes.
    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u64).range(1..))]
    interval: u64,

    /// Consecutive failed publishes before giving up (0 = never).
    #[arg(long, default_value_t = 5)]
    stop_after_fails: u32,

    /// Host name used in the topic (default: this machine's).
    #[arg(long)]
    host: Option<String>,

    /// User name used in the topic (default: $USER).
    #[arg(long)]
    user: Option<String>,

    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    /// More output (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = logging::init(cli.log_format, cli.verbose) {
        eprintln!("idle-tracker: {e}");
        return ExitCode::from(2);
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => ExitCode::from(e.exit_code()),
    }
}

async fn run(cli: Cli) -> Result<(), RuntimeError> {
    let broker = match &cli.config {
        Some(path) => BrokerConfig::load(path, &cli.profile)?,
        None => BrokerConfig::load_default(&cli.profile)?,
    };
    let host = cli.host.or_else(local_host_name).unwrap_or_else(|| {
        warn!("host name unknown, using \"localhost\"");
        "localhost".to_string()
    });
    let user = cli.user.or_else(local_user_name).unwrap_or_else(|| {
        warn!("user name unknown, using \"unknown\"");
        "unknown".to_string()
    });
    let cfg = Config {
        interval: Duration::from_secs(cli.interval),
        failure_threshold: cli.stop_after_fails,
        ..Config::default()
    };

    let client_id = generate_client_id();
    let (sink, driver) = MqttSink::connect(&broker, &client_id)?;
    let topic = status_topic(&host, &user);
    info!(broker = %broker.broker, port = broker.port, client_id = %client_id, topic = %topic, "starting");

    let subscribers: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let tracker = Tracker::new(&cfg, Arc::new(sink), topic, subscribers)?;
    let bus = tracker.bus().clone();
    let token = CancellationToken::new();
    let mut driver_task = tokio::spawn(driver.run(bus.clone(), token.clone()));

    let sources = ScreenSaverSource::candidates().await.unwrap_or_else(|e| {
        error!(error = %e, "session bus unavailable");
        Vec::new()
    });

    let until = async {
        select! {
            r = wait_for_shutdown_signal() => {
                r?;
                warn!("received termination signal");
                bus.publish(Event::new(EventKind::ShutdownRequested));
                Ok(())
            }
            r = &mut driver_task => match r {
                Ok(res) => res,
                Err(e) => Err(RuntimeError::BrokerUnreachable { reason: e.to_string() }),
            },
        }
    };
    let res = tracker.run(&sources, until).await;

    token.cancel();
    tracker.shutdown().await;
    res
}
