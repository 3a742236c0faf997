use std::str::FromStr;

use rand::Rng;
use tap_core::UpgradeDefinition;
use tap_types::{RewardError, SpinKind, TaskKind, UpgradeId};
use thiserror::Error;

use crate::TapEngine;
use crate::tap_batcher::TapOutcome;

/// Line commands understood by the session runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Tap(u32),
    Flush,
    Activate,
    Claim,
    CheckIn,
    Spin(SpinKind),
    Buy(UpgradeId),
    Upgrades,
    Referrals,
    Task(TaskKind),
    Tasks,
    Top,
    Status,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command '{0}', try 'help'")]
    Unknown(String),
    #[error("'{0}' needs an argument")]
    MissingArgument(String),
    #[error("bad argument '{argument}' for '{command}'")]
    BadArgument { command: String, argument: String },
}

pub const HELP: &str = "tap [n] | flush | activate | claim | checkin | spin free|ad | \
buy faucet-rate|tap-power|tap-energy | upgrades | referrals | task ad|invite3|invite5|telegram|x | \
tasks | top | status | quit";

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let command = words.next().ok_or(CommandError::Empty)?.to_lowercase();
        let argument = words.next().map(str::to_lowercase);

        let bad = |argument: &str| CommandError::BadArgument {
            command: command.clone(),
            argument: argument.to_string(),
        };

        let parsed = match (command.as_str(), argument.as_deref()) {
            ("tap", None) => Command::Tap(1),
            ("tap", Some(n)) => Command::Tap(n.parse().map_err(|_| bad(n))?),
            ("flush", None) => Command::Flush,
            ("activate", None) => Command::Activate,
            ("claim", None) => Command::Claim,
            ("checkin", None) => Command::CheckIn,
            ("spin", Some("free")) => Command::Spin(SpinKind::Free),
            ("spin", Some("ad")) => Command::Spin(SpinKind::Ad),
            ("buy", Some(id)) => Command::Buy(
                UpgradeId::ALL
                    .into_iter()
                    .find(|upgrade| upgrade.as_str() == id)
                    .ok_or_else(|| bad(id))?,
            ),
            ("upgrades", None) => Command::Upgrades,
            ("referrals", None) => Command::Referrals,
            ("task", Some(kind)) => Command::Task(match kind {
                "ad" => TaskKind::WatchAd,
                "invite3" => TaskKind::InviteThree,
                "invite5" => TaskKind::InviteFive,
                "telegram" => TaskKind::FollowTelegram,
                "x" => TaskKind::FollowX,
                other => return Err(bad(other)),
            }),
            ("tasks", None) => Command::Tasks,
            ("top", None) => Command::Top,
            ("status", None) => Command::Status,
            ("help", None) => Command::Help,
            ("quit" | "exit", None) => Command::Quit,
            (_, Some(argument)) if is_known(&command) => return Err(bad(argument)),
            (_, None) if is_known(&command) => {
                return Err(CommandError::MissingArgument(command.clone()));
            }
            _ => return Err(CommandError::Unknown(command.clone())),
        };
        Ok(parsed)
    }
}

fn is_known(command: &str) -> bool {
    matches!(
        command,
        "tap"
            | "flush"
            | "activate"
            | "claim"
            | "checkin"
            | "spin"
            | "buy"
            | "upgrades"
            | "referrals"
            | "task"
            | "tasks"
            | "top"
            | "status"
            | "help"
            | "quit"
            | "exit"
    )
}

/// Run `command` against the engine and render the result as text.
pub async fn execute<R: Rng + ?Sized>(
    engine: &TapEngine,
    command: Command,
    rng: &mut R,
) -> Result<String, RewardError> {
    let output = match command {
        Command::Tap(count) => {
            let mut earned = 0;
            let mut last = None;
            for _ in 0..count {
                match engine.taps.tap() {
                    TapOutcome::Accepted { earned: e, .. } => earned += e,
                    rejected => {
                        last = Some(rejected);
                        break;
                    }
                }
            }
            match last {
                Some(TapOutcome::OutOfEnergy) => format!("+{} (out of tap energy)", earned),
                Some(TapOutcome::RateLimited) => format!("+{} (slow down)", earned),
                _ => format!("+{}", earned),
            }
        }
        Command::Flush => format!("flushed {}", engine.taps.flush().await?),
        Command::Activate => {
            let next = engine.scheduler.activate_faucet().await?;
            format!("faucet armed until {}", next)
        }
        Command::Claim => {
            let claim = engine.scheduler.claim_faucet().await?;
            format!("claimed {}, next at {}", claim.amount, claim.next_claim_at)
        }
        Command::CheckIn => {
            let check_in = engine.scheduler.check_in().await?;
            format!("+{} (streak {})", check_in.reward, check_in.streak)
        }
        Command::Spin(kind) => {
            let spin = engine.spin(kind, rng).await?;
            let segment = spin.segment();
            let reward = engine.coordinator.confirm_spin(spin).await.map_err(|e| {
                RewardError::PersistenceFailure {
                    message: e.to_string(),
                }
            })??;
            format!("segment {}: {}", segment, reward.label())
        }
        Command::Buy(upgrade) => {
            let level = engine.coordinator.purchase_upgrade(upgrade).await?;
            format!("{} is now level {}", upgrade, level)
        }
        Command::Upgrades => {
            let levels = engine.session.mirror().read(|record| record.upgrades.clone());
            UpgradeId::ALL
                .into_iter()
                .map(|upgrade| {
                    let definition = UpgradeDefinition::get(upgrade);
                    let level = levels.get(upgrade);
                    let price = definition
                        .cost_at(level)
                        .map_or_else(|| "max".to_string(), |cost| cost.to_string());
                    format!(
                        "{} {}/{} {} next: {}",
                        definition.name,
                        level,
                        definition.max_level,
                        definition.benefit_label(level),
                        price
                    )
                })
                .collect::<Vec<_>>()
                .join("\n")
        }
        Command::Referrals => {
            let bonus = engine.referrals.reconcile().await?;
            let referred = engine.referrals.list().await?;
            let mut lines = vec![format!(
                "{} referred, +{} new bonus, link {}",
                referred.len(),
                bonus,
                engine.referrals.link().unwrap_or_default()
            )];
            lines.extend(
                referred
                    .iter()
                    .map(|entry| format!("  {} {}", entry.display_name, entry.balance)),
            );
            lines.join("\n")
        }
        Command::Task(task) => format!("+{}", engine.tasks.complete(task).await?),
        Command::Tasks => engine
            .tasks
            .status()
            .iter()
            .map(|status| {
                format!(
                    "{:?} +{} {}",
                    status.task,
                    status.reward,
                    if status.available { "open" } else { "done" }
                )
            })
            .collect::<Vec<_>>()
            .join("\n"),
        Command::Top => {
            let board = engine.leaderboard.load().await?;
            let mut lines: Vec<String> = board
                .top
                .iter()
                .map(|entry| format!("#{} {} {}", entry.rank, entry.display_name, entry.balance))
                .collect();
            if let Some(me) = board.me.filter(|_| !board.me_in_top) {
                lines.push(format!("... #{} {} {}", me.rank, me.display_name, me.balance));
            }
            lines.join("\n")
        }
        Command::Status => {
            let record = engine.session.mirror().snapshot();
            let faucet = engine.scheduler.faucet_state();
            format!(
                "{} [{:?}] balance {} taps {} pending {} faucet {} spins {}/{}",
                record.display_name(),
                record.title(),
                record.balance,
                record.taps_remaining,
                engine.taps.pending(),
                if faucet.is_claimable() {
                    "ready".to_string()
                } else {
                    faucet.countdown()
                },
                record.spins_free,
                record.spins_ad
            )
        }
        Command::Help => HELP.to_string(),
        Command::Quit => String::new(),
    };
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!("tap".parse(), Ok(Command::Tap(1)));
        assert_eq!(" TAP 25 ".parse(), Ok(Command::Tap(25)));
        assert_eq!("spin ad".parse(), Ok(Command::Spin(SpinKind::Ad)));
        assert_eq!(
            "buy tap-energy".parse(),
            Ok(Command::Buy(UpgradeId::TapEnergy))
        );
        assert_eq!("task invite5".parse(), Ok(Command::Task(TaskKind::InviteFive)));
        assert_eq!("exit".parse(), Ok(Command::Quit));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("".parse::<Command>(), Err(CommandError::Empty));
        assert_eq!(
            "dance".parse::<Command>(),
            Err(CommandError::Unknown("dance".to_string()))
        );
        assert_eq!(
            "buy rocket".parse::<Command>(),
            Err(CommandError::BadArgument {
                command: "buy".to_string(),
                argument: "rocket".to_string()
            })
        );
        assert!("tap many".parse::<Command>().is_err());
        assert_eq!(
            "spin".parse::<Command>(),
            Err(CommandError::MissingArgument("spin".to_string()))
        );
    }
}
