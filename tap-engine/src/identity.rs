use std::time::Duration;

use async_trait::async_trait;
use tap_types::{LaunchContext, RewardError};
use tokio::sync::watch;
use tokio::time::{Instant, sleep};
use tracing::{debug, warn};

/// Host bridge that may hand over the launch descriptor at some point after
/// start-up, or never.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Non-blocking check for the descriptor.
    async fn poll(&self) -> Option<LaunchContext>;

    /// Poll every `interval` until the descriptor shows up or `timeout` elapses.
    async fn resolve(
        &self,
        timeout: Duration,
        interval: Duration,
    ) -> Result<LaunchContext, RewardError> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(context) = self.poll().await {
                debug!("Identity resolved for user {}", context.user.id);
                return Ok(context);
            }
            let now = Instant::now();
            if now >= deadline {
                warn!("No platform identity after {:?}", timeout);
                return Err(RewardError::IdentityUnavailable);
            }
            sleep(interval.min(deadline - now)).await;
        }
    }
}

/// Identity known up front, or known to be absent.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity {
    context: Option<LaunchContext>,
}

impl StaticIdentity {
    pub fn new(context: LaunchContext) -> Self {
        Self {
            context: Some(context),
        }
    }

    pub fn none() -> Self {
        Self::default()
    }

    /// Parse the JSON launch descriptor the host passes at start-up.
    pub fn from_init_data(raw: &str) -> Result<Self, serde_json::Error> {
        let context: LaunchContext = serde_json::from_str(raw)?;
        Ok(Self::new(context))
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn poll(&self) -> Option<LaunchContext> {
        self.context.clone()
    }
}

/// Identity that arrives late through a watch channel.
#[derive(Debug, Clone)]
pub struct WatchIdentity {
    receiver: watch::Receiver<Option<LaunchContext>>,
}

impl WatchIdentity {
    pub fn channel() -> (watch::Sender<Option<LaunchContext>>, Self) {
        let (sender, receiver) = watch::channel(None);
        (sender, Self { receiver })
    }
}

#[async_trait]
impl IdentityProvider for WatchIdentity {
    async fn poll(&self) -> Option<LaunchContext> {
        self.receiver.borrow().clone()
    }
}
