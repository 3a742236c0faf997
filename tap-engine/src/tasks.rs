use tap_core::{EngineEvent, FieldValue, GameRules, UserField, UserFilter};
use tap_types::{RewardError, TaskKind};
use tracing::info;

use crate::coordinator::MutationCoordinator;
use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskStatus {
    pub task: TaskKind,
    pub reward: i64,
    /// Whether it can be claimed again. The ad task counts daily views left.
    pub available: bool,
}

fn task_reward(task: TaskKind, rules: &GameRules) -> i64 {
    match task {
        TaskKind::WatchAd => rules.reward_per_ad,
        TaskKind::InviteThree => rules.invite_three_reward,
        TaskKind::InviteFive => rules.invite_five_reward,
        TaskKind::FollowTelegram => rules.follow_telegram_reward,
        TaskKind::FollowX => rules.follow_x_reward,
    }
}

fn invites_needed(task: TaskKind) -> Option<i64> {
    match task {
        TaskKind::InviteThree => Some(3),
        TaskKind::InviteFive => Some(5),
        _ => None,
    }
}

#[derive(Clone)]
pub struct TaskBoard {
    session: Session,
    coordinator: MutationCoordinator,
}

impl TaskBoard {
    pub fn new(session: Session, coordinator: MutationCoordinator) -> Self {
        Self {
            session,
            coordinator,
        }
    }

    pub fn status(&self) -> Vec<TaskStatus> {
        let rules = self.session.rules();
        self.session.mirror().read(|record| {
            [
                TaskKind::WatchAd,
                TaskKind::InviteThree,
                TaskKind::InviteFive,
                TaskKind::FollowTelegram,
                TaskKind::FollowX,
            ]
            .into_iter()
            .map(|task| TaskStatus {
                task,
                reward: task_reward(task, rules),
                available: match record.tasks.is_done(task) {
                    Some(done) => !done,
                    None => record.tasks.daily_ads_left > 0,
                },
            })
            .collect()
        })
    }

    /// Claim the reward for `task`. Returns the amount credited.
    pub async fn complete(&self, task: TaskKind) -> Result<i64, RewardError> {
        let user_id = self.session.require_user()?;
        let reward = task_reward(task, self.session.rules());

        let referred = match invites_needed(task) {
            Some(_) => {
                let count = self
                    .session
                    .store()
                    .count_where(UserFilter::ReferredBy(user_id))
                    .await?;
                i64::try_from(count).unwrap_or(i64::MAX)
            }
            None => 0,
        };

        self.coordinator
            .run("task-reward", |record, log| {
                match record.tasks.is_done(task) {
                    None => {
                        if record.tasks.daily_ads_left <= 0 {
                            return Err(RewardError::DailyLimitReached);
                        }
                        log.add(record, UserField::DailyAdsLeft, -1)?;
                    }
                    Some(true) => return Err(RewardError::TaskAlreadyCompleted),
                    Some(false) => {
                        if let Some(need) = invites_needed(task) {
                            if referred < need {
                                return Err(RewardError::TaskRequirementNotMet {
                                    have: referred,
                                    need,
                                });
                            }
                        }
                        log.set(record, UserField::TaskDone(task), FieldValue::Flag(true))?;
                    }
                }
                log.add(record, UserField::Balance, reward)?;
                Ok(())
            })
            .await?;

        info!("User {} completed {:?} for {}", user_id, task, reward);
        self.session.publish(EngineEvent::TaskCompleted {
            user_id,
            task,
            reward,
        });
        Ok(reward)
    }
}
