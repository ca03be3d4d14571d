//! # Screensaver activity sources on the D-Bus session bus.
//!
//! Desktop environments expose the screensaver under different names; the
//! candidates are probed in [`SCREENSAVER_SERVICES`] order. Each service lives at
//! the object path derived from its name (`org.gnome.ScreenSaver` →
//! `/org/gnome/ScreenSaver`) and offers `GetActive() -> b` plus the
//! `ActiveChanged(b)` signal.

use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use zbus::{Connection, Proxy};

use super::source::{ActivityHandler, ActivitySource, SourceRef};
use crate::error::SourceError;

/// Known screensaver services, in probing order.
pub const SCREENSAVER_SERVICES: [&str; 4] = [
    "org.gnome.ScreenSaver",
    "org.cinnamon.ScreenSaver",
    "org.kde.screensaver",
    "org.freedesktop.ScreenSaver",
];

/// Object path a screensaver service is exported at.
pub fn object_path(service: &str) -> String {
    format!("/{}", service.replace('.', "/"))
}

/// One screensaver service on the session bus.
pub struct ScreenSaverSource {
    conn: Connection,
    service: &'static str,
}

impl ScreenSaverSource {
    pub fn new(conn: Connection, service: &'static str) -> Self {
        Self { conn, service }
    }

    /// Connects to the session bus and returns every known service as a candidate.
    pub async fn candidates() -> Result<Vec<SourceRef>, SourceError> {
        let conn = Connection::session()
            .await
            .map_err(|e| SourceError::Unavailable {
                identity: "session bus".to_string(),
                reason: e.to_string(),
            })?;
        Ok(SCREENSAVER_SERVICES
            .into_iter()
            .map(|service| Arc::new(Self::new(conn.clone(), service)) as SourceRef)
            .collect())
    }

    async fn proxy(&self) -> zbus::Result<Proxy<'static>> {
        Proxy::new(
            &self.conn,
            self.service,
            object_path(self.service),
            self.service,
        )
        .await
    }
}

#[async_trait]
impl ActivitySource for ScreenSaverSource {
    fn identity(&self) -> &str {
        self.service
    }

    async fn current_state(&self) -> Result<bool, SourceError> {
        let unavailable = |e: zbus::Error| SourceError::Unavailable {
            identity: self.service.to_string(),
            reason: e.to_string(),
        };
        let proxy = self.proxy().await.map_err(unavailable)?;
        proxy
            .call::<_, _, bool>("GetActive", &())
            .await
            .map_err(unavailable)
    }

    async fn watch(
        &self,
        handler: Arc<dyn ActivityHandler>,
        token: CancellationToken,
    ) -> Result<(), SourceError> {
        let watch_failed = |e: zbus::Error| SourceError::Watch {
            identity: self.service.to_string(),
            reason: e.to_string(),
        };
        let proxy = self.proxy().await.map_err(watch_failed)?;
        let mut signals = proxy
            .receive_signal("ActiveChanged")
            .await
            .map_err(watch_failed)?;

        let service = self.service;
        tokio::spawn(async move {
            let _proxy = proxy;
            loop {
                select! {
                    _ = token.cancelled() => break,
                    msg = signals.next() => match msg {
                        Some(msg) => match msg.body().deserialize::<bool>() {
                            Ok(idle) => handler.on_change(idle),
                            Err(e) => warn!(source = service, error = %e, "malformed ActiveChanged signal"),
                        },
                        None => {
                            warn!(source = service, "ActiveChanged stream ended");
                            break;
                        }
                    }
                }
            }
            debug!(source = service, "stopped watching");
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_paths_follow_service_names() {
        assert_eq!(object_path("org.gnome.ScreenSaver"), "/org/gnome/ScreenSaver");
        assert_eq!(object_path("org.kde.screensaver"), "/org/kde/screensaver");
    }
}
