use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone, Utc};
use futures_util::future::join_all;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

use reywen::{
    client::{
        methods::message::{DataMessageSend, DataQueryMessages},
        Client,
    },
    structures::channels::message::{BulkMessageResponse, Message},
};

use super::{
    data::{classify, match_crime, MessageRecord, PaydayConf, ReactionRecord, Reactor},
    report::{render_report, Tally},
    snapshot::{save_snapshot, CSV_PATH, JSON_PATH},
    BAD_DATE, HELP, NO_CHANNEL, SNAPSHOT_FAILED,
};
use crate::plugins::conf_from_file;

// history scan stops after this many messages regardless of window
const MESSAGE_FETCH_CAP: usize = 200;

fn jst() -> FixedOffset {
    FixedOffset::east_opt(9 * 3600).expect("UTC+9 is a valid offset")
}

pub async fn on_message(client: &Client, message: &Message) {
    let Some(mut content) = message.content_contains("?calculate", " ") else {
        return;
    };

    let conf: PaydayConf = conf_from_file("config/payday.toml");
    if !conf.enable {
        return;
    }

    // drop the command token, leaving the optional date pair
    match content.len() {
        0 => return,
        _ => content.remove(0),
    };

    if content.first().map(String::as_str) == Some("help") {
        send(client, &message.channel, HELP).await;
        return;
    }

    let now = Utc::now().with_timezone(&jst());
    let Some((start, end)) = resolve_window(&content, now) else {
        send(client, &message.channel, BAD_DATE).await;
        return;
    };

    let history = match fetch_history(client, &conf.source_channel, start.with_timezone(&Utc)).await
    {
        Some(history) => history,
        None => {
            send(client, &message.channel, NO_CHANNEL).await;
            return;
        }
    };
    debug!(count = history.len(), "history fetched");

    let mut tally = Tally::new();
    let mut seen_users: HashMap<String, Reactor> = HashMap::new();

    for entry in &history {
        let Some(text) = entry.content.as_deref() else {
            continue;
        };
        let Some(crime) = match_crime(&conf, text) else {
            continue;
        };

        let record = adapt_message(client, entry, &mut seen_users).await;
        let (outcome, rewardees) = classify(&conf, &record);
        tally.absorb(crime, outcome, &rewardees, conf.fail_payment);
    }

    for line in render_report(&tally, start, end) {
        send(client, &message.channel, &line).await;
    }

    let rewards = tally.reward_map();
    if let Err(error) = save_snapshot(Path::new(JSON_PATH), Path::new(CSV_PATH), &rewards) {
        warn!(%error, "snapshot write failed");
        send(client, &message.channel, SNAPSHOT_FAILED).await;
    }
}

async fn send(client: &Client, channel: &str, content: &str) {
    client
        .message_send(channel, &DataMessageSend::new().set_content(content))
        .await
        .ok();
}

/// Resolves the report window. Both dates given: parsed as `YYYY/MM/DD` in
/// JST, end forced to 23:59. Anything less than two arguments falls back to
/// the last seven days. Returns `None` only for unparseable dates.
pub fn resolve_window(
    args: &[String],
    now: DateTime<FixedOffset>,
) -> Option<(DateTime<FixedOffset>, DateTime<FixedOffset>)> {
    match (args.first(), args.get(1)) {
        (Some(start), Some(end)) => {
            let tz = now.timezone();
            Some((parse_jst_date(start, 0, 0, tz)?, parse_jst_date(end, 23, 59, tz)?))
        }
        _ => Some((now - Duration::days(7), now)),
    }
}

fn parse_jst_date(raw: &str, hour: u32, min: u32, tz: FixedOffset) -> Option<DateTime<FixedOffset>> {
    NaiveDate::parse_from_str(raw, "%Y/%m/%d")
        .ok()?
        .and_hms_opt(hour, min, 0)?
        .and_local_timezone(tz)
        .single()
}

/// Pages backwards through the channel from newest to oldest, keeping
/// messages created at or after `start`. The platform serves at most 100
/// messages per query, so the 200-message cap takes up to two pages. `None`
/// means the channel could not be queried at all.
async fn fetch_history(client: &Client, channel: &str, start: DateTime<Utc>) -> Option<Vec<Message>> {
    let mut history: Vec<Message> = Vec::new();
    let mut cursor: Option<String> = None;

    while history.len() < MESSAGE_FETCH_CAP {
        let mut query = DataQueryMessages::new().set_limit(100);
        if let Some(before) = cursor.as_deref() {
            query = query.set_before(before);
        }

        let batch: Vec<Message> = match client.message_query(channel, &query).await {
            Ok(BulkMessageResponse::JustMessages(messages)) => messages,
            Ok(BulkMessageResponse::MessagesAndUsers { messages, .. }) => messages,
            Err(_) => return None,
        };
        if batch.is_empty() {
            break;
        }

        cursor = batch.last().map(|m| m.id.clone());

        let mut reached_start = false;
        for entry in batch {
            if message_instant(&entry).is_some_and(|instant| instant >= start) {
                history.push(entry);
                if history.len() >= MESSAGE_FETCH_CAP {
                    break;
                }
            } else {
                reached_start = true;
            }
        }
        if reached_start {
            break;
        }
    }

    Some(history)
}

// message ids are ULIDs; the first 10 chars carry a 48-bit unix-ms timestamp
const ULID_ALPHABET: &str = "0123456789ABCDEFGHJKMNPQRSTVWXYZ";

pub fn ulid_timestamp_ms(id: &str) -> Option<i64> {
    if id.len() < 10 {
        return None;
    }
    let mut ms: i64 = 0;
    for c in id.chars().take(10) {
        let value = ULID_ALPHABET.find(c.to_ascii_uppercase())?;
        ms = ms * 32 + value as i64;
    }
    Some(ms)
}

fn message_instant(message: &Message) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ulid_timestamp_ms(&message.id)?).single()
}

/// Boundary adapter: turns a platform message into a plain record, resolving
/// every reaction contributor in one batched lookup per message. Users
/// already seen this invocation come from the cache instead of the API.
async fn adapt_message(
    client: &Client,
    message: &Message,
    seen_users: &mut HashMap<String, Reactor>,
) -> MessageRecord {
    let mut pending: Vec<String> = Vec::new();
    for (_, user_ids) in &message.reactions {
        for user_id in user_ids {
            if !seen_users.contains_key(user_id) && !pending.contains(user_id) {
                pending.push(user_id.clone());
            }
        }
    }

    let fetched = join_all(pending.iter().map(|id| client.user_fetch(id))).await;
    for (user_id, user) in pending.into_iter().zip(fetched) {
        if let Ok(user) = user {
            let automated = user.bot.is_some();
            seen_users.insert(
                user_id,
                Reactor {
                    display_name: user.username,
                    automated,
                },
            );
        }
    }

    let mut reactions = Vec::new();
    for (emoji, user_ids) in &message.reactions {
        let reactors = user_ids
            .iter()
            .filter_map(|id| seen_users.get(id).cloned())
            .collect();
        reactions.push(ReactionRecord {
            emoji: emoji.clone(),
            reactors,
        });
    }

    MessageRecord {
        content: message.content.clone().unwrap_or_default(),
        reactions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn now() -> DateTime<FixedOffset> {
        jst().with_ymd_and_hms(2025, 5, 15, 12, 30, 0).unwrap()
    }

    #[test]
    fn explicit_window_parses_in_jst() {
        let (start, end) = resolve_window(&args(&["2025/05/08", "2025/05/11"]), now()).unwrap();
        assert_eq!(start.to_rfc3339(), "2025-05-08T00:00:00+09:00");
        assert_eq!(end.to_rfc3339(), "2025-05-11T23:59:00+09:00");
    }

    #[test]
    fn missing_dates_default_to_last_week() {
        let (start, end) = resolve_window(&args(&[]), now()).unwrap();
        assert_eq!(end, now());
        assert_eq!(end - start, Duration::days(7));
    }

    #[test]
    fn single_date_also_defaults() {
        let (start, end) = resolve_window(&args(&["2025/05/08"]), now()).unwrap();
        assert_eq!(end, now());
        assert_eq!(end - start, Duration::days(7));
    }

    #[test]
    fn malformed_dates_are_rejected() {
        assert!(resolve_window(&args(&["2025-05-08", "2025/05/11"]), now()).is_none());
        assert!(resolve_window(&args(&["2025/05/08", "soon"]), now()).is_none());
        assert!(resolve_window(&args(&["2025/13/40", "2025/05/11"]), now()).is_none());
    }

    #[test]
    fn ulid_timestamp_decodes_leading_chars() {
        assert_eq!(ulid_timestamp_ms("0000000000ABCDEFGHJKMNPQRS"), Some(0));
        assert_eq!(ulid_timestamp_ms("0000000001ABCDEFGHJKMNPQRS"), Some(1));
        assert_eq!(ulid_timestamp_ms("000000000ZABCDEFGHJKMNPQRS"), Some(31));
        // I, L, O and U are not in the alphabet
        assert_eq!(ulid_timestamp_ms("000000000UABCDEFGHJKMNPQRS"), None);
        assert_eq!(ulid_timestamp_ms("short"), None);
    }

    #[test]
    fn later_ulids_decode_to_later_instants() {
        let older = ulid_timestamp_ms("01ARZ3NDEKTSV4RRFFQ69G5FAV").unwrap();
        let newer = ulid_timestamp_ms("01BX5ZZKBKACTAV9WEVGEMMVRZ").unwrap();
        assert!(newer > older);
    }
}
