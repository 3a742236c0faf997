use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tap_core::{
    EngineEvent, FieldValue, MutationLog, SpinOutcome, SpinWheel, UserField, check_purchase,
    reward_credit,
};
use tap_types::{RewardError, SpinKind, SpinReward, UpgradeId, UserRecord};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::session::Session;

/// Proof that one spin was taken off an allotment. Consumed by the single
/// draw it pays for.
#[derive(Debug)]
pub struct SpinTicket {
    kind: SpinKind,
}

impl SpinTicket {
    pub(crate) fn new(kind: SpinKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> SpinKind {
        self.kind
    }
}

/// A drawn reward waiting for confirmation. The wheel is positioned from
/// `segment()`; confirming credits exactly `reward()`.
#[derive(Debug)]
pub struct ResolvedSpin {
    kind: SpinKind,
    outcome: SpinOutcome,
}

impl ResolvedSpin {
    pub fn kind(&self) -> SpinKind {
        self.kind
    }

    pub fn segment(&self) -> usize {
        self.outcome.segment
    }

    pub fn reward(&self) -> SpinReward {
        self.outcome.reward
    }
}

fn revert_logged(log: &MutationLog, record: &mut UserRecord) {
    if let Err(e) = log.revert(record) {
        error!("Could not revert {} ({}): {}", log.label(), log.id(), e);
    }
}

/// Applies economy mutations to the mirror first, then persists them, one
/// at a time per session. A failed write reverts exactly what the mutation
/// logged.
#[derive(Clone)]
pub struct MutationCoordinator {
    session: Session,
    queue: Arc<Mutex<()>>,
    wheel: Arc<SpinWheel>,
    retry_attempts: u32,
    retry_backoff: Duration,
}

impl MutationCoordinator {
    pub fn new(session: Session, retry_attempts: u32, retry_backoff: Duration) -> Self {
        Self {
            session,
            queue: Arc::new(Mutex::new(())),
            wheel: Arc::new(SpinWheel::default()),
            retry_attempts: retry_attempts.max(1),
            retry_backoff,
        }
    }

    pub fn with_wheel(mut self, wheel: SpinWheel) -> Self {
        self.wheel = Arc::new(wheel);
        self
    }

    pub fn wheel(&self) -> &SpinWheel {
        &self.wheel
    }

    /// Run `plan` against the mirror and persist what it logged.
    ///
    /// The plan validates and records its changes through the log. If it
    /// fails, whatever it already logged is reverted and nothing is written.
    pub async fn run<T, F>(&self, label: &'static str, plan: F) -> Result<T, RewardError>
    where
        T: Send,
        F: FnOnce(&mut UserRecord, &mut MutationLog) -> Result<T, RewardError> + Send,
    {
        self.run_with_attempts(label, 1, plan).await
    }

    async fn run_with_attempts<T, F>(
        &self,
        label: &'static str,
        attempts: u32,
        plan: F,
    ) -> Result<T, RewardError>
    where
        T: Send,
        F: FnOnce(&mut UserRecord, &mut MutationLog) -> Result<T, RewardError> + Send,
    {
        let user_id = self.session.require_user()?;
        let _turn = self.queue.lock().await;

        let mirror = self.session.mirror();
        let mut log = MutationLog::new(label);
        let value = mirror.update(|record| match plan(record, &mut log) {
            Ok(value) => Ok(value),
            Err(e) => {
                revert_logged(&log, record);
                Err(e)
            }
        })?;

        if log.is_empty() {
            return Ok(value);
        }

        let mut attempt = 1;
        let mut backoff = self.retry_backoff;
        loop {
            match self.session.store().apply(user_id, log.to_update()).await {
                Ok(()) => {
                    debug!("Persisted {} ({}) for user {}", label, log.id(), user_id);
                    return Ok(value);
                }
                Err(e) if attempt < attempts => {
                    warn!(
                        "Persisting {} for user {} failed (attempt {}/{}): {}",
                        label, user_id, attempt, attempts, e
                    );
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                    attempt += 1;
                }
                Err(e) => {
                    error!(
                        "Persisting {} for user {} failed, rolling back: {}",
                        label, user_id, e
                    );
                    mirror.update(|record| revert_logged(&log, record));
                    self.session.publish(EngineEvent::MutationRolledBack {
                        user_id,
                        mutation_id: log.id(),
                        label,
                        reason: e.to_string(),
                    });
                    return Err(e.into());
                }
            }
        }
    }

    /// Buy the next level of `upgrade`. Returns the new level.
    pub async fn purchase_upgrade(&self, upgrade: UpgradeId) -> Result<u32, RewardError> {
        let (level, cost) = self
            .run("upgrade-purchase", |record, log| {
                let cost = check_purchase(&record.upgrades, record.balance, upgrade)?;
                let level = record.upgrades.get(upgrade) + 1;
                log.add(record, UserField::Balance, -cost)?;
                log.set(
                    record,
                    UserField::UpgradeLevel(upgrade),
                    FieldValue::Int(i64::from(level)),
                )?;
                Ok((level, cost))
            })
            .await?;

        let user_id = self.session.require_user()?;
        info!("User {} bought {} level {} for {}", user_id, upgrade, level, cost);
        self.session.publish(EngineEvent::UpgradePurchased {
            user_id,
            upgrade,
            level,
            cost,
        });
        Ok(level)
    }

    /// Draw the reward for a consumed spin. This is the only draw the spin
    /// ever gets.
    pub fn resolve_spin<R: Rng + ?Sized>(&self, ticket: SpinTicket, rng: &mut R) -> ResolvedSpin {
        let outcome = self.wheel.draw(rng);
        if let Some(user_id) = self.session.user_id() {
            self.session.publish(EngineEvent::SpinResolved {
                user_id,
                kind: ticket.kind,
                segment: outcome.segment,
                reward: outcome.reward,
            });
        }
        ResolvedSpin {
            kind: ticket.kind,
            outcome,
        }
    }

    /// Credit the drawn reward. The write is spawned so it completes even if
    /// the caller stops waiting, and is retried before being rolled back.
    pub fn confirm_spin(&self, spin: ResolvedSpin) -> JoinHandle<Result<SpinReward, RewardError>> {
        let coordinator = self.clone();
        tokio::spawn(async move { coordinator.save_spin_reward(spin.outcome.reward).await })
    }

    async fn save_spin_reward(&self, reward: SpinReward) -> Result<SpinReward, RewardError> {
        let Some((field, amount)) = reward_credit(&reward) else {
            return Ok(reward);
        };

        self.run_with_attempts("spin-reward", self.retry_attempts, |record, log| {
            log.add(record, field, amount)?;
            Ok(())
        })
        .await?;

        let user_id = self.session.require_user()?;
        info!("User {} won {}", user_id, reward.label());
        self.session
            .publish(EngineEvent::SpinRewardSaved { user_id, reward });
        Ok(reward)
    }
}
