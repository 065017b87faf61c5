use indexmap::IndexMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

pub const JSON_PATH: &str = "data.json";
pub const CSV_PATH: &str = "data.csv";

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to serialize reward map: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to write csv snapshot: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to write snapshot file: {0}")]
    Io(#[from] std::io::Error),
}

/// Writes the final reward mapping to both snapshot formats: pretty JSON with
/// names kept as-is (no ASCII escaping) and a two-column CSV. Each write
/// replaces the previous file wholesale.
pub fn save_snapshot(
    json_path: &Path,
    csv_path: &Path,
    rewards: &IndexMap<String, u64>,
) -> Result<(), SnapshotError> {
    fs::write(json_path, serde_json::to_string_pretty(rewards)?)?;

    let mut writer = csv::Writer::from_path(csv_path)?;
    writer.write_record(["名前", "報酬（円）"])?;
    for (name, reward) in rewards {
        let reward = reward.to_string();
        writer.write_record([name.as_str(), reward.as_str()])?;
    }
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rewards() -> IndexMap<String, u64> {
        let mut map = IndexMap::new();
        map.insert("やまだ".to_string(), 300_000);
        map.insert("A".to_string(), 100_000);
        map
    }

    #[test]
    fn json_snapshot_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let json = dir.path().join("data.json");
        let csv = dir.path().join("data.csv");

        let rewards = rewards();
        save_snapshot(&json, &csv, &rewards).unwrap();

        let raw = fs::read_to_string(&json).unwrap();
        // non-ASCII names survive unescaped
        assert!(raw.contains("やまだ"));

        let reread: IndexMap<String, u64> = serde_json::from_str(&raw).unwrap();
        assert_eq!(reread, rewards);
    }

    #[test]
    fn csv_snapshot_has_header_and_rows_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let json = dir.path().join("data.json");
        let csv = dir.path().join("data.csv");

        save_snapshot(&json, &csv, &rewards()).unwrap();

        let raw = fs::read_to_string(&csv).unwrap();
        let lines: Vec<&str> = raw.lines().collect();
        assert_eq!(lines[0], "名前,報酬（円）");
        assert_eq!(lines[1], "やまだ,300000");
        assert_eq!(lines[2], "A,100000");
    }

    #[test]
    fn rerun_overwrites_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let json = dir.path().join("data.json");
        let csv = dir.path().join("data.csv");

        save_snapshot(&json, &csv, &rewards()).unwrap();

        let mut second = IndexMap::new();
        second.insert("B".to_string(), 500_000);
        save_snapshot(&json, &csv, &second).unwrap();

        let reread: IndexMap<String, u64> =
            serde_json::from_str(&fs::read_to_string(&json).unwrap()).unwrap();
        assert_eq!(reread, second);
        assert!(!fs::read_to_string(&csv).unwrap().contains("やまだ"));
    }
}
