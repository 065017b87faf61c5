use indexmap::IndexSet;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

// config struct
// hot changeable parameters, read from config/payday.toml on every command
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PaydayConf {
    pub enable: bool,
    pub source_channel: String,
    pub fail_payment: u64,
    pub emoji: EmojiConf,
    pub crimes: Vec<CrimeDefinition>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct EmojiConf {
    pub win: String,
    pub lose: String,
    pub approve: String,
}

/// One crime type: canonical name, free-text aliases and the payout for a
/// clean win. Aliases are compared after kana folding, so either script works
/// in the report message.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CrimeDefinition {
    pub name: String,
    pub aliases: Vec<String>,
    pub payment: u64,
}

// platform-agnostic message shape, built at the boundary in process.rs
#[derive(Debug, Clone, Default)]
pub struct MessageRecord {
    pub content: String,
    pub reactions: Vec<ReactionRecord>,
}

#[derive(Debug, Clone)]
pub struct ReactionRecord {
    pub emoji: String,
    pub reactors: Vec<Reactor>,
}

#[derive(Debug, Clone)]
pub struct Reactor {
    pub display_name: String,
    pub automated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Win,
    Loss,
    Contested,
    Undecided,
}

impl Outcome {
    /// Only clean wins and clean losses count towards the win-rate stats.
    pub fn decided(self) -> bool {
        matches!(self, Outcome::Win | Outcome::Loss)
    }
}

/// Folds katakana into hiragana, everything else passes through.
pub fn kata_to_hira(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            'ァ'..='ヶ' => char::from_u32(c as u32 - 0x60).unwrap_or(c),
            _ => c,
        })
        .collect()
}

fn crime_marker() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| Regex::new(r"犯罪種類\[(.*?)\]").expect("marker pattern is valid"))
}

/// Pulls the bracketed token out of a report message and resolves it against
/// the configured crime table. Messages without the marker are not reports.
///
/// A token matching aliases of several crimes resolves to the first crime in
/// config declaration order.
pub fn match_crime<'a>(conf: &'a PaydayConf, text: &str) -> Option<&'a CrimeDefinition> {
    let token = crime_marker().captures(text)?.get(1)?.as_str();
    let token = kata_to_hira(token);

    conf.crimes.iter().find(|crime| {
        crime
            .aliases
            .iter()
            .any(|alias| token.contains(&kata_to_hira(alias)))
    })
}

/// Reads a message's reactions into an outcome and the set of reward-eligible
/// display names (everyone human under the approve emoji).
pub fn classify(conf: &PaydayConf, record: &MessageRecord) -> (Outcome, IndexSet<String>) {
    let mut has_win = false;
    let mut has_lose = false;
    let mut rewardees = IndexSet::new();

    for reaction in &record.reactions {
        if reaction.emoji == conf.emoji.win {
            has_win = true;
        } else if reaction.emoji == conf.emoji.lose {
            has_lose = true;
        } else if reaction.emoji == conf.emoji.approve {
            for reactor in &reaction.reactors {
                if !reactor.automated {
                    rewardees.insert(reactor.display_name.clone());
                }
            }
        }
    }

    let outcome = match (has_win, has_lose) {
        (true, false) => Outcome::Win,
        (false, true) => Outcome::Loss,
        (true, true) => Outcome::Contested,
        (false, false) => Outcome::Undecided,
    };

    (outcome, rewardees)
}
