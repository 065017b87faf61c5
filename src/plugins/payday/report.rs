use chrono::{DateTime, FixedOffset};
use indexmap::{IndexMap, IndexSet};
use std::collections::BTreeMap;

use super::data::{CrimeDefinition, Outcome};

/// Accumulated payout state for one display name. Insertion into the tally
/// happens on first attribution and entries are never removed within a run.
#[derive(Debug, Clone, Default)]
pub struct Participant {
    pub reward: u64,
    pub events: u32,
}

#[derive(Debug, Clone, Default)]
pub struct CrimeStat {
    pub total: u32,
    pub wins: u32,
}

impl CrimeStat {
    pub fn rate(&self) -> u32 {
        if self.total == 0 {
            0
        } else {
            ((self.wins as f64 / self.total as f64) * 100.0).round() as u32
        }
    }
}

/// Per-invocation accumulator, built fresh for every command. Participants
/// keep first-reward order, crime stats iterate name-ascending.
#[derive(Debug, Clone, Default)]
pub struct Tally {
    pub rewards: IndexMap<String, Participant>,
    pub crimes: BTreeMap<String, CrimeStat>,
}

impl Tally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one classified report message into the running totals.
    ///
    /// Win/loss stats move only on decided outcomes, and at most once per
    /// message. Rewardees are paid the crime's payout on a clean win and the
    /// flat failure payout in every other case, contested included.
    pub fn absorb(
        &mut self,
        crime: &CrimeDefinition,
        outcome: Outcome,
        rewardees: &IndexSet<String>,
        fail_payment: u64,
    ) {
        if outcome.decided() {
            let stat = self.crimes.entry(crime.name.clone()).or_default();
            stat.total += 1;
            if outcome == Outcome::Win {
                stat.wins += 1;
            }
        }

        for name in rewardees {
            let entry = self.rewards.entry(name.clone()).or_default();
            entry.reward += match outcome {
                Outcome::Win => crime.payment,
                _ => fail_payment,
            };
            entry.events += 1;
        }
    }

    pub fn total_reward(&self) -> u64 {
        self.rewards.values().map(|p| p.reward).sum()
    }

    /// Final name → reward mapping, in first-reward order. This is what the
    /// snapshot files serialize.
    pub fn reward_map(&self) -> IndexMap<String, u64> {
        self.rewards
            .iter()
            .map(|(name, p)| (name.clone(), p.reward))
            .collect()
    }
}

/// Renders the report as ordered lines, one platform message each.
pub fn render_report(
    tally: &Tally,
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
) -> Vec<String> {
    let mut lines = vec![format!(
        "=== 危険手当未受け取りのメンバー ===\n{} ～ {}",
        start.format("%Y/%m/%d %H:%M"),
        end.format("%Y/%m/%d %H:%M")
    )];

    for (name, participant) in &tally.rewards {
        lines.push(format!("・{name} : {}円", participant.reward));
    }

    lines.push(format!("\n=== 合計支給額: {}円 ===", tally.total_reward()));

    lines.push("\n=== 犯罪別勝率統計 ===".to_string());
    for (crime, stat) in &tally.crimes {
        lines.push(format!(
            "{crime}: {}% ({}件中 {}件が金持ち検挙)",
            stat.rate(),
            stat.total,
            stat.wins
        ));
    }

    lines
}
