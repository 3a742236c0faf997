use std::time::Duration;

use chrono::{DateTime, Utc};
use tap_core::{
    EngineEvent, FaucetState, FieldValue, UserField, can_check_in, check_in_reward, faucet_amount,
};
use tap_types::{RewardError, SpinKind};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::coordinator::{MutationCoordinator, SpinTicket};
use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaucetClaim {
    pub amount: i64,
    pub next_claim_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckIn {
    pub reward: i64,
    pub streak: i64,
}

/// Faucet cycle, spin allotments and daily check-in. Every state change is
/// written through the coordinator, never debounced.
#[derive(Clone)]
pub struct RewardScheduler {
    session: Session,
    coordinator: MutationCoordinator,
}

impl RewardScheduler {
    pub fn new(session: Session, coordinator: MutationCoordinator) -> Self {
        Self {
            session,
            coordinator,
        }
    }

    pub fn faucet_state(&self) -> FaucetState {
        let next_claim_at = self.session.mirror().read(|record| record.next_faucet_claim_at);
        FaucetState::at(next_claim_at, self.session.clock().now())
    }

    /// Start the faucet cycle. Already running cycles are left alone.
    pub async fn activate_faucet(&self) -> Result<DateTime<Utc>, RewardError> {
        let clock = self.session.clock().clone();
        let cooldown = self.session.rules().faucet_cooldown;

        let (next_claim_at, activated) = self
            .coordinator
            .run("faucet-activate", |record, log| {
                if let Some(existing) = record.next_faucet_claim_at {
                    return Ok((existing, false));
                }
                let next_claim_at = clock.now() + cooldown;
                log.set(
                    record,
                    UserField::NextFaucetClaimAt,
                    FieldValue::Timestamp(Some(next_claim_at)),
                )?;
                Ok((next_claim_at, true))
            })
            .await?;

        if activated {
            let user_id = self.session.require_user()?;
            info!("Faucet armed for user {} until {}", user_id, next_claim_at);
            self.session.publish(EngineEvent::FaucetActivated {
                user_id,
                next_claim_at,
            });
        }
        Ok(next_claim_at)
    }

    /// Credit the faucet and re-arm it. Both land in one write, so the
    /// credit can never trail the timer reset.
    pub async fn claim_faucet(&self) -> Result<FaucetClaim, RewardError> {
        let clock = self.session.clock().clone();
        let cooldown = self.session.rules().faucet_cooldown;

        let claim = self
            .coordinator
            .run("faucet-claim", |record, log| {
                // Read once the queue is ours, not when the call was made
                let now = clock.now();
                match FaucetState::at(record.next_faucet_claim_at, now) {
                    FaucetState::Inactive => return Err(RewardError::FaucetInactive),
                    FaucetState::Armed { remaining, .. } => {
                        return Err(RewardError::FaucetNotReady {
                            seconds_remaining: remaining.num_seconds().max(1),
                        });
                    }
                    FaucetState::Claimable => {}
                }

                let amount = faucet_amount(&record.upgrades);
                let next_claim_at = now + cooldown;
                log.add(record, UserField::Balance, amount)?;
                log.set(
                    record,
                    UserField::NextFaucetClaimAt,
                    FieldValue::Timestamp(Some(next_claim_at)),
                )?;
                Ok(FaucetClaim {
                    amount,
                    next_claim_at,
                })
            })
            .await?;

        let user_id = self.session.require_user()?;
        info!("User {} claimed {} from the faucet", user_id, claim.amount);
        self.session.publish(EngineEvent::FaucetClaimed {
            user_id,
            amount: claim.amount,
            next_claim_at: claim.next_claim_at,
        });
        Ok(claim)
    }

    /// Publish the faucet state every `tick` until every receiver is gone.
    pub fn spawn_countdown(&self, tick: Duration) -> (watch::Receiver<FaucetState>, JoinHandle<()>) {
        let (sender, receiver) = watch::channel(self.faucet_state());
        let scheduler = self.clone();

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick);
            loop {
                interval.tick().await;
                if sender.send(scheduler.faucet_state()).is_err() {
                    debug!("Countdown stopped, no listeners left");
                    break;
                }
            }
        });

        (receiver, handle)
    }

    /// Take one spin off the `kind` allotment. The decrement is persisted
    /// before the ticket is handed out.
    pub async fn consume_spin(&self, kind: SpinKind) -> Result<SpinTicket, RewardError> {
        let field = match kind {
            SpinKind::Free => UserField::SpinsFree,
            SpinKind::Ad => UserField::SpinsAd,
        };

        self.coordinator
            .run("spin-consume", |record, log| {
                let left = match kind {
                    SpinKind::Free => record.spins_free,
                    SpinKind::Ad => record.spins_ad,
                };
                if left <= 0 {
                    return Err(RewardError::NoSpinsLeft { kind });
                }
                log.add(record, field, -1)?;
                Ok(())
            })
            .await?;

        Ok(SpinTicket::new(kind))
    }

    /// Claim today's check-in reward and extend the streak.
    pub async fn check_in(&self) -> Result<CheckIn, RewardError> {
        let clock = self.session.clock().clone();
        let rules = self.session.rules().clone();

        let check_in = self
            .coordinator
            .run("check-in", |record, log| {
                let today = clock.today();
                if !can_check_in(record.last_check_in_date, today) {
                    return Err(RewardError::AlreadyClaimedToday);
                }
                let reward = check_in_reward(record.check_in_count, &rules);
                log.add(record, UserField::Balance, reward)?;
                let streak = log.add(record, UserField::CheckInCount, 1)?;
                log.set(
                    record,
                    UserField::LastCheckInDate,
                    FieldValue::Date(Some(today)),
                )?;
                Ok(CheckIn { reward, streak })
            })
            .await?;

        let user_id = self.session.require_user()?;
        info!(
            "User {} checked in (streak {}) for {}",
            user_id, check_in.streak, check_in.reward
        );
        self.session.publish(EngineEvent::CheckedIn {
            user_id,
            reward: check_in.reward,
            streak: check_in.streak,
        });
        Ok(check_in)
    }
}
