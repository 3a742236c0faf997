use tap_core::{EngineEvent, FieldValue, UserField, UserFilter, referral_link};
use tap_types::{LeaderboardEntry, RewardError};
use tracing::info;

use crate::coordinator::MutationCoordinator;
use crate::session::Session;

/// Upper bound on how many referred users the referrals screen lists.
const REFERRAL_LIST_LIMIT: u64 = 500;

#[derive(Clone)]
pub struct ReferralService {
    session: Session,
    coordinator: MutationCoordinator,
}

impl ReferralService {
    pub fn new(session: Session, coordinator: MutationCoordinator) -> Self {
        Self {
            session,
            coordinator,
        }
    }

    /// Credit referrals that joined since the last reconciliation. Safe to
    /// call on every load: with no new referrals it changes nothing.
    pub async fn reconcile(&self) -> Result<i64, RewardError> {
        let user_id = self.session.require_user()?;
        let referred = self
            .session
            .store()
            .count_where(UserFilter::ReferredBy(user_id))
            .await?;
        let referred = i64::try_from(referred).unwrap_or(i64::MAX);
        let per_referral = self.session.rules().referral_reward;

        let (new_referrals, bonus) = self
            .coordinator
            .run("referral-bonus", |record, log| {
                let new_referrals = referred - record.referral_rewarded_count;
                if new_referrals <= 0 {
                    return Ok((0, 0));
                }
                let bonus = new_referrals * per_referral;
                log.add(record, UserField::Balance, bonus)?;
                log.set(
                    record,
                    UserField::ReferralRewardedCount,
                    FieldValue::Int(referred),
                )?;
                Ok((new_referrals, bonus))
            })
            .await?;

        if bonus > 0 {
            info!(
                "Credited {} for {} new referrals of user {}",
                bonus, new_referrals, user_id
            );
            self.session.publish(EngineEvent::ReferralsCredited {
                user_id,
                new_referrals,
                bonus,
            });
        }
        Ok(bonus)
    }

    /// Users referred by the current user, richest first.
    pub async fn list(&self) -> Result<Vec<LeaderboardEntry>, RewardError> {
        let user_id = self.session.require_user()?;
        let referred = self
            .session
            .store()
            .top_n(
                UserField::Balance,
                REFERRAL_LIST_LIMIT,
                Some(UserFilter::ReferredBy(user_id)),
            )
            .await?;

        Ok(referred
            .into_iter()
            .zip(1u32..)
            .map(|(record, rank)| LeaderboardEntry {
                user_id: record.id,
                display_name: record.display_name(),
                balance: record.balance,
                rank,
            })
            .collect())
    }

    /// Invite link to share; `None` without an identity.
    pub fn link(&self) -> Option<String> {
        self.session.user_id().map(referral_link)
    }

    pub fn code(&self) -> Option<String> {
        self.session.user_id()?;
        Some(self.session.mirror().read(|record| record.referral_code.clone()))
    }
}
