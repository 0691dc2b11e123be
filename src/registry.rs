//! Process-wide map of device sessions.
//!
//! Sessions are created on first use and live until [`SessionRegistry::close_all`];
//! there is no eviction, which suits a small fixed set of TVs.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::device::{ChannelFactory, DeviceAddress};
use crate::probe::ConnectivityCheck;
use crate::session::DeviceSession;

/// One [`DeviceSession`] per address.
pub struct SessionRegistry {
    factory: Arc<dyn ChannelFactory>,
    probe: Arc<dyn ConnectivityCheck>,
    settings: Arc<Settings>,
    sessions: RwLock<HashMap<DeviceAddress, Arc<DeviceSession>>>,
}

impl SessionRegistry {
    pub fn new(
        factory: Arc<dyn ChannelFactory>,
        probe: Arc<dyn ConnectivityCheck>,
        settings: Arc<Settings>,
    ) -> Self {
        Self {
            factory,
            probe,
            settings,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The session for `address`, created if absent.
    pub async fn get(&self, address: &DeviceAddress) -> Arc<DeviceSession> {
        if let Some(session) = self.sessions.read().await.get(address) {
            return Arc::clone(session);
        }

        let mut sessions = self.sessions.write().await;
        let session = sessions.entry(address.clone()).or_insert_with(|| {
            debug!(address = %address, "Creating session");
            Arc::new(DeviceSession::new(
                address.clone(),
                Arc::clone(&self.factory),
                Arc::clone(&self.probe),
                Arc::clone(&self.settings),
            ))
        });
        Arc::clone(session)
    }

    /// The session for `address` if one exists.
    pub async fn existing(&self, address: &DeviceAddress) -> Option<Arc<DeviceSession>> {
        self.sessions.read().await.get(address).cloned()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Close every session concurrently and empty the registry.
    ///
    /// Returns the number of sessions closed.
    pub async fn close_all(&self) -> usize {
        let sessions: Vec<Arc<DeviceSession>> = {
            let mut map = self.sessions.write().await;
            map.drain().map(|(_, session)| session).collect()
        };
        let count = sessions.len();

        let results = join_all(sessions.iter().map(|session| session.close())).await;
        for (session, result) in sessions.iter().zip(results) {
            if let Err(e) = result {
                warn!(address = %session.address(), error = %e, "Session close failed");
            }
        }

        info!(sessions = count, "Closed all sessions");
        count
    }
}
