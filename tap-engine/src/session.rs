use std::sync::{Arc, Mutex, PoisonError};

use tap_core::{
    Clock, DailyQuota, EngineEvent, EngineEventBus, FieldValue, GameRules, UserField, UserPatch,
    UserStore, referrer_candidate, refresh_quota,
};
use tap_types::{LaunchContext, RewardError, UserId, UserRecord};
use tracing::{debug, info, warn};

use crate::mirror::UserMirror;

pub type SharedEventBus = Arc<Mutex<EngineEventBus>>;

/// Order in which daily quotas are checked on load.
const DAILY_QUOTAS: [DailyQuota; 3] = [DailyQuota::Taps, DailyQuota::Spins, DailyQuota::Ads];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    Online(UserId),
    /// No platform identity: everything runs locally and nothing is written.
    Offline,
}

/// Collaborators every sub-mechanism shares.
#[derive(Clone)]
pub struct Session {
    mode: SessionMode,
    mirror: UserMirror,
    store: Arc<dyn UserStore>,
    clock: Arc<dyn Clock>,
    rules: Arc<GameRules>,
    events: SharedEventBus,
}

impl Session {
    /// Load or create the record for `context` and run the daily refills.
    pub async fn establish(
        context: &LaunchContext,
        store: Arc<dyn UserStore>,
        clock: Arc<dyn Clock>,
        rules: GameRules,
        events: SharedEventBus,
    ) -> Result<Self, RewardError> {
        let user = &context.user;
        let existing = store.get_user(user.id).await?;

        let mut patch = UserPatch::new();
        if let Some(username) = &user.username {
            patch.insert(UserField::Username, FieldValue::Text(username.clone()));
        }
        if let Some(first_name) = &user.first_name {
            patch.insert(UserField::FirstName, FieldValue::Text(first_name.clone()));
        }
        if let Some(last_name) = &user.last_name {
            patch.insert(UserField::LastName, FieldValue::Text(last_name.clone()));
        }

        let referral_open = existing
            .as_ref()
            .is_none_or(|record| record.referred_by.is_none());
        if referral_open {
            if let Some(referrer) = referrer_candidate(user.id, context.start_param.as_deref()) {
                if store.get_user(referrer).await?.is_some() {
                    info!("User {} referred by {}", user.id, referrer);
                    patch.insert(UserField::ReferredBy, FieldValue::UserRef(Some(referrer)));
                } else {
                    debug!("Ignoring referral from unknown user {}", referrer);
                }
            }
        }

        let outcome = store.upsert_user(user.id, &patch).await?;
        if outcome.created {
            info!("Created user record {}", user.id);
        }

        let session = Self {
            mode: SessionMode::Online(user.id),
            mirror: UserMirror::new(outcome.record),
            store,
            clock,
            rules: Arc::new(rules),
            events,
        };
        session.refresh_daily().await?;
        session.publish(EngineEvent::SessionStarted {
            user_id: user.id,
            created: outcome.created,
        });

        Ok(session)
    }

    /// Session without an identity. Quotas are filled locally so the game is
    /// playable; nothing reaches the store.
    pub fn offline(
        store: Arc<dyn UserStore>,
        clock: Arc<dyn Clock>,
        rules: GameRules,
        events: SharedEventBus,
    ) -> Self {
        let mut record = UserRecord::new(0, clock.now());
        let today = clock.today();
        for quota in DAILY_QUOTAS {
            refresh_quota(&mut record, quota, today, &rules);
        }
        warn!("Running without a platform identity; progress will not be saved");

        Self {
            mode: SessionMode::Offline,
            mirror: UserMirror::new(record),
            store,
            clock,
            rules: Arc::new(rules),
            events,
        }
    }

    /// Refill every daily quota whose stored date is not today and persist
    /// the refills together. Returns the quotas that were refilled.
    pub async fn refresh_daily(&self) -> Result<Vec<DailyQuota>, RewardError> {
        let today = self.clock.today();
        let (refilled, patch) = self.mirror.update(|record| {
            let mut refilled = Vec::new();
            let mut patch = UserPatch::new();
            for quota in DAILY_QUOTAS {
                if let Some(quota_patch) = refresh_quota(record, quota, today, &self.rules) {
                    refilled.push(quota);
                    patch.merge(quota_patch);
                }
            }
            (refilled, patch)
        });

        if patch.is_empty() {
            return Ok(refilled);
        }

        if let SessionMode::Online(user_id) = self.mode {
            self.store.update_fields(user_id, &patch).await?;
            for quota in &refilled {
                debug!("Refilled {:?} for user {}", quota, user_id);
                self.publish(EngineEvent::QuotaRefilled {
                    user_id,
                    quota: *quota,
                });
            }
        }

        Ok(refilled)
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn user_id(&self) -> Option<UserId> {
        match self.mode {
            SessionMode::Online(user_id) => Some(user_id),
            SessionMode::Offline => None,
        }
    }

    pub fn require_user(&self) -> Result<UserId, RewardError> {
        self.user_id().ok_or(RewardError::NotAuthenticated)
    }

    pub fn mirror(&self) -> &UserMirror {
        &self.mirror
    }

    pub fn store(&self) -> &Arc<dyn UserStore> {
        &self.store
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn rules(&self) -> &GameRules {
        &self.rules
    }

    pub fn events(&self) -> &SharedEventBus {
        &self.events
    }

    pub fn publish(&self, event: EngineEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .publish(event);
    }
}
