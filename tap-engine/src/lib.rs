use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::Rng;
use tap_core::{Clock, EngineEventBus, FaucetState, UserStore};
use tap_types::{RewardError, SpinKind};
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub mod config;
pub mod console;
pub mod coordinator;
pub mod identity;
pub mod leaderboard;
pub mod memory_store;
pub mod mirror;
pub mod rate_limiter;
pub mod referrals;
pub mod scheduler;
pub mod session;
pub mod tap_batcher;
pub mod tasks;

use config::EngineConfig;
use coordinator::{MutationCoordinator, ResolvedSpin};
use identity::IdentityProvider;
use leaderboard::LeaderboardService;
use rate_limiter::RateLimiter;
use referrals::ReferralService;
use scheduler::RewardScheduler;
use session::Session;
use tap_batcher::TapBatcher;
use tasks::TaskBoard;

/// External collaborators handed to the engine.
pub struct EngineDeps {
    pub store: Arc<dyn UserStore>,
    pub clock: Arc<dyn Clock>,
    pub events: EngineEventBus,
}

/// One player session with all four sub-mechanisms wired to the same
/// mirror and store.
pub struct TapEngine {
    pub session: Session,
    pub taps: TapBatcher,
    pub scheduler: RewardScheduler,
    pub coordinator: MutationCoordinator,
    pub referrals: ReferralService,
    pub tasks: TaskBoard,
    pub leaderboard: LeaderboardService,
    countdown_tick: Duration,
}

impl TapEngine {
    /// Resolve the platform identity and load the session. Without an
    /// identity the engine starts offline instead of failing.
    pub async fn start(
        config: &EngineConfig,
        identity: &dyn IdentityProvider,
        deps: EngineDeps,
    ) -> Result<Self, RewardError> {
        let events = Arc::new(Mutex::new(deps.events));
        let resolved = identity
            .resolve(config.identity_timeout, config.identity_poll_interval)
            .await;

        let session = match resolved {
            Ok(context) => {
                Session::establish(&context, deps.store, deps.clock, config.rules.clone(), events)
                    .await?
            }
            Err(RewardError::IdentityUnavailable) => {
                Session::offline(deps.store, deps.clock, config.rules.clone(), events)
            }
            Err(e) => return Err(e),
        };

        Ok(Self::from_session(config, session))
    }

    pub fn from_session(config: &EngineConfig, session: Session) -> Self {
        let coordinator = MutationCoordinator::new(
            session.clone(),
            config.persist_retry_attempts,
            config.persist_retry_backoff,
        );
        let limiter = RateLimiter::new_with_limits(config.tap_rate_burst, config.tap_rate_refill);

        Self {
            taps: TapBatcher::new(session.clone(), config.tap_debounce, limiter),
            scheduler: RewardScheduler::new(session.clone(), coordinator.clone()),
            referrals: ReferralService::new(session.clone(), coordinator.clone()),
            tasks: TaskBoard::new(session.clone(), coordinator.clone()),
            leaderboard: LeaderboardService::new(session.clone(), config.leaderboard_size),
            coordinator,
            session,
            countdown_tick: config.countdown_tick,
        }
    }

    /// Consume a spin of `kind` and draw its reward.
    pub async fn spin<R: Rng + ?Sized>(
        &self,
        kind: SpinKind,
        rng: &mut R,
    ) -> Result<ResolvedSpin, RewardError> {
        let ticket = self.scheduler.consume_spin(kind).await?;
        Ok(self.coordinator.resolve_spin(ticket, rng))
    }

    pub fn countdown(&self) -> (watch::Receiver<FaucetState>, JoinHandle<()>) {
        self.scheduler.spawn_countdown(self.countdown_tick)
    }

    /// Flush pending taps and wait for the write.
    pub async fn shutdown(self) -> Result<i64, RewardError> {
        match self.taps.shutdown().await {
            Ok(result) => result,
            Err(e) => Err(RewardError::PersistenceFailure {
                message: e.to_string(),
            }),
        }
    }
}
