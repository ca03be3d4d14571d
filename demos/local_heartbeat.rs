//! # Example: local_heartbeat
//!
//! Runs the tracker against an in-memory sink and a simulated screensaver
//! that toggles every 4 seconds, so the publish cadence is visible without a
//! broker or a desktop session.
//!
//! ## Flow
//! ```text
//! Tracker::run()
//!   ├─► ActivityBridge::bind([SimulatedScreenSaver])
//!   │     └─► set_value("active") ─► RetryTimer ─► LocalSink (every 2s)
//!   ├─► toggle ─► handler.on_change(idle) ─► immediate publish
//!   └─► until: Ctrl-C or 12s
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example local_heartbeat
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use idle_tracker::logging::{self, LogFormat};
use idle_tracker::{
    ActivityHandler, ActivitySource, Config, LocalSink, LogWriter, SourceError, SourceRef,
    Subscribe, Tracker, wait_for_shutdown_signal,
};

/// Pretends to be a screensaver that activates and deactivates on a timer.
struct SimulatedScreenSaver {
    period: Duration,
}

#[async_trait]
impl ActivitySource for SimulatedScreenSaver {
    fn identity(&self) -> &str {
        "simulated.ScreenSaver"
    }

    async fn current_state(&self) -> Result<bool, SourceError> {
        Ok(false)
    }

    async fn watch(
        &self,
        handler: Arc<dyn ActivityHandler>,
        token: CancellationToken,
    ) -> Result<(), SourceError> {
        let period = self.period;
        tokio::spawn(async move {
            let mut idle = false;
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(period) => {
                        idle = !idle;
                        handler.on_change(idle);
                    }
                }
            }
        });
        Ok(())
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init(LogFormat::Pretty, 1)?;

    let sink = Arc::new(LocalSink::new());
    let mut feed = sink.subscribe();
    tokio::spawn(async move {
        while let Ok(msg) = feed.recv().await {
            println!("[sink] {} <- {}", msg.topic, msg.payload);
        }
    });

    let cfg = Config {
        interval: Duration::from_secs(2),
        ..Config::default()
    };
    let subscribers: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let tracker = Tracker::new(&cfg, sink.clone(), "demo-host/user/demo/status", subscribers)?;
    let sources = vec![Arc::new(SimulatedScreenSaver {
        period: Duration::from_secs(4),
    }) as SourceRef];

    let until = async {
        tokio::select! {
            r = wait_for_shutdown_signal() => r.map_err(Into::into),
            _ = tokio::time::sleep(Duration::from_secs(12)) => Ok(()),
        }
    };
    tracker.run(&sources, until).await?;
    tracker.shutdown().await;

    println!("published {} messages", sink.published().len());
    Ok(())
}
