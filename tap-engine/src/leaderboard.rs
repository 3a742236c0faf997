use tap_core::{UserField, UserFilter};
use tap_types::{Leaderboard, LeaderboardEntry, RewardError};
use tracing::debug;

use crate::session::Session;

#[derive(Clone)]
pub struct LeaderboardService {
    session: Session,
    size: u64,
}

impl LeaderboardService {
    pub fn new(session: Session, size: u64) -> Self {
        Self { session, size }
    }

    /// Top players by balance, plus where the current user stands.
    pub async fn load(&self) -> Result<Leaderboard, RewardError> {
        let store = self.session.store();
        let top: Vec<LeaderboardEntry> = store
            .top_n(UserField::Balance, self.size, None)
            .await?
            .into_iter()
            .zip(1u32..)
            .map(|(record, rank)| LeaderboardEntry {
                user_id: record.id,
                display_name: record.display_name(),
                balance: record.balance,
                rank,
            })
            .collect();

        let Some(user_id) = self.session.user_id() else {
            return Ok(Leaderboard {
                top,
                me: None,
                me_in_top: false,
            });
        };

        if let Some(entry) = top.iter().find(|entry| entry.user_id == user_id) {
            let me = entry.clone();
            return Ok(Leaderboard {
                top,
                me: Some(me),
                me_in_top: true,
            });
        }

        // Ranked by the saved balance, the same one the top list compares;
        // taps still waiting for a flush do not count yet
        let (balance, display_name) = match store.get_user(user_id).await? {
            Some(record) => (record.balance, record.display_name()),
            None => self
                .session
                .mirror()
                .read(|record| (record.balance, record.display_name())),
        };
        let ahead = store.count_where(UserFilter::BalanceAbove(balance)).await?;
        let rank = u32::try_from(ahead + 1).unwrap_or(u32::MAX);
        debug!("User {} ranked {} outside the top {}", user_id, rank, self.size);

        Ok(Leaderboard {
            top,
            me: Some(LeaderboardEntry {
                user_id,
                display_name,
                balance,
                rank,
            }),
            me_in_top: false,
        })
    }
}
