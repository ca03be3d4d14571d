//! # MQTT sink.
//!
//! ```text
//! MqttSink::connect(cfg, client_id) ──► (MqttSink, MqttDriver)
//!
//! MqttSink::publish(topic, payload)        MqttDriver::run(token)
//!   ├─ not connected ─► NotConnected        loop {
//!   ├─ queue full     ─► Rejected(15)         poll event loop
//!   └─ queue request  ─► Ok / Closed
//!                                               ├─ ConnAck ok   ─► BrokerConnected
//!                                               ├─ refused      ─► Err(BrokerRefused)
//!                                               └─ io/network   ─► warn, retry in 1s
//!                                           }
//! ```
//!
//! Payloads go out with QoS 0 and no retain flag. The driver must be polled
//! for anything to reach the broker. Publishing never waits for queue space.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{
    AsyncClient, ClientError, ConnectReturnCode, ConnectionError, Event as MqttEvent, EventLoop,
    MqttOptions, Packet, QoS, TlsConfiguration, Transport,
};
use tokio::{select, time};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::PublishSink;
use crate::config::BrokerConfig;
use crate::error::{ConfigError, PublishError, RuntimeError};
use crate::events::{Bus, Event, EventKind};

const KEEP_ALIVE: Duration = Duration::from_secs(30);
const RECONNECT_DELAY: Duration = Duration::from_secs(1);
const REQUEST_QUEUE: usize = 16;
/// MQTT client code for "too many queued messages".
pub const QUEUE_FULL_CODE: i32 = 15;

/// Publishing half of an MQTT connection.
pub struct MqttSink {
    client: AsyncClient,
    connected: Arc<AtomicBool>,
}

/// Connection half: drives the network event loop.
pub struct MqttDriver {
    eventloop: EventLoop,
    connected: Arc<AtomicBool>,
    broker: String,
}

impl MqttSink {
    /// Prepares a client for `cfg`. No network I/O happens until the driver runs.
    pub fn connect(cfg: &BrokerConfig, client_id: &str) -> Result<(Self, MqttDriver), ConfigError> {
        let mut opts = MqttOptions::new(client_id, cfg.broker.clone(), cfg.port);
        opts.set_keep_alive(KEEP_ALIVE);
        if let Some(user) = &cfg.username {
            opts.set_credentials(user.clone(), cfg.password.clone().unwrap_or_default());
        }
        if cfg.tls_enabled() {
            opts.set_transport(Transport::tls_with_config(tls_config(cfg)?));
        }

        let (client, eventloop) = AsyncClient::new(opts, REQUEST_QUEUE);
        let connected = Arc::new(AtomicBool::new(false));
        Ok((
            Self {
                client,
                connected: Arc::clone(&connected),
            },
            MqttDriver {
                eventloop,
                connected,
                broker: format!("{}:{}", cfg.broker, cfg.port),
            },
        ))
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }
}

#[async_trait]
impl PublishSink for MqttSink {
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), PublishError> {
        if !self.is_connected() {
            return Err(PublishError::NotConnected);
        }
        self.client
            .try_publish(topic, QoS::AtMostOnce, false, payload.as_bytes().to_vec())
            .map_err(|e| match e {
                ClientError::TryRequest(_) => PublishError::Rejected {
                    code: QUEUE_FULL_CODE,
                    detail: format!("request queue full ({REQUEST_QUEUE} pending)"),
                },
                _ => PublishError::Closed,
            })
    }
}

impl MqttDriver {
    /// Polls the connection until `token` is cancelled or the broker refuses us.
    ///
    /// Transient failures (DNS, TCP, TLS, dropped connection) are retried every
    /// second; publishes fail with `NotConnected` in the meantime, and after
    /// the driver has returned.
    pub async fn run(mut self, bus: Bus, token: CancellationToken) -> Result<(), RuntimeError> {
        let res = self.drive(&bus, &token).await;
        self.connected.store(false, Ordering::Release);
        res
    }

    async fn drive(&mut self, bus: &Bus, token: &CancellationToken) -> Result<(), RuntimeError> {
        loop {
            let polled = select! {
                biased;
                _ = token.cancelled() => return Ok(()),
                ev = self.eventloop.poll() => ev,
            };
            match polled {
                Ok(MqttEvent::Incoming(Packet::ConnAck(ack))) => {
                    if ack.code != ConnectReturnCode::Success {
                        return Err(self.refused(ack.code, bus));
                    }
                    self.connected.store(true, Ordering::Release);
                    info!(broker = %self.broker, "connected to broker");
                    bus.publish(Event::new(EventKind::BrokerConnected).with_subject(self.broker.as_str()));
                }
                Ok(_) => {}
                Err(ConnectionError::ConnectionRefused(code)) => {
                    return Err(self.refused(code, bus));
                }
                Err(e) => {
                    self.connected.store(false, Ordering::Release);
                    warn!(broker = %self.broker, error = %e, "broker connection failed; retrying");
                    select! {
                        _ = token.cancelled() => return Ok(()),
                        _ = time::sleep(RECONNECT_DELAY) => {}
                    }
                }
            }
        }
    }

    fn refused(&self, code: ConnectReturnCode, bus: &Bus) -> RuntimeError {
        self.connected.store(false, Ordering::Release);
        let code = code as u8;
        error!(critical = true, broker = %self.broker, code, "broker refused connection");
        bus.publish(
            Event::new(EventKind::BrokerRefused)
                .with_subject(self.broker.as_str())
                .with_reason(format!("return code {code}")),
        );
        RuntimeError::BrokerRefused { code }
    }
}

fn tls_config(cfg: &BrokerConfig) -> Result<TlsConfiguration, ConfigError> {
    let Some(ca_path) = &cfg.ca_certs else {
        return Err(ConfigError::Tls {
            reason: "ca_certs is required when TLS is enabled".to_string(),
        });
    };
    let ca = read(ca_path)?;
    let client_auth = match (&cfg.certfile, &cfg.keyfile) {
        (Some(cert), Some(key)) => Some((read(cert)?, read(key)?)),
        (None, None) => None,
        _ => {
            return Err(ConfigError::Tls {
                reason: "certfile and keyfile must be set together".to_string(),
            });
        }
    };
    Ok(TlsConfiguration::Simple {
        ca,
        alpn: None,
        client_auth,
    })
}

fn read(path: &Path) -> Result<Vec<u8>, ConfigError> {
    std::fs::read(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn plain() -> BrokerConfig {
        BrokerConfig {
            broker: "localhost".to_string(),
            port: 1883,
            username: None,
            password: None,
            certfile: None,
            keyfile: None,
            ca_certs: None,
        }
    }

    #[tokio::test]
    async fn publish_before_connack_is_not_connected() {
        let (sink, _driver) = MqttSink::connect(&plain(), "idle-tracker-1").expect("sink");
        assert!(!sink.is_connected());
        let err = sink.publish("t", "active").await.expect_err("no connection");
        assert_eq!(err, PublishError::NotConnected);
        assert_eq!(err.code(), 4);
    }

    #[tokio::test]
    async fn full_request_queue_rejects_instead_of_waiting() {
        let (sink, _driver) = MqttSink::connect(&plain(), "idle-tracker-2").expect("sink");
        sink.connected.store(true, Ordering::Release);

        for _ in 0..REQUEST_QUEUE {
            sink.publish("t", "active").await.expect("queued");
        }
        let err = sink.publish("t", "active").await.expect_err("queue full");
        assert!(matches!(err, PublishError::Rejected { code: QUEUE_FULL_CODE, .. }));
        assert_eq!(err.code(), 15);
        assert_eq!(err.as_label(), "publish_rejected");
    }

    #[tokio::test]
    async fn cancelled_driver_marks_sink_disconnected() {
        let (sink, driver) = MqttSink::connect(&plain(), "idle-tracker-3").expect("sink");
        sink.connected.store(true, Ordering::Release);
        let token = CancellationToken::new();
        token.cancel();

        assert!(driver.run(Bus::new(8), token).await.is_ok());
        assert!(!sink.is_connected());
        assert_eq!(
            sink.publish("t", "active").await,
            Err(PublishError::NotConnected)
        );
    }

    #[test]
    fn tls_without_ca_is_rejected() {
        let cfg = BrokerConfig {
            certfile: Some(PathBuf::from("/tmp/client.pem")),
            ..plain()
        };
        let err = tls_config(&cfg).err().expect("no CA");
        assert_eq!(err.as_label(), "config_tls");
    }

    #[test]
    fn tls_files_are_read_from_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ca = dir.path().join("ca.pem");
        std::fs::write(&ca, b"-----BEGIN CERTIFICATE-----").expect("write ca");
        let cfg = BrokerConfig {
            ca_certs: Some(ca),
            ..plain()
        };
        assert!(matches!(
            tls_config(&cfg),
            Ok(TlsConfiguration::Simple { client_auth: None, .. })
        ));

        let missing = BrokerConfig {
            ca_certs: Some(dir.path().join("nope.pem")),
            ..plain()
        };
        assert!(matches!(tls_config(&missing), Err(ConfigError::Read { .. })));
    }
}
