pub mod data;
pub mod process;
pub mod report;
pub mod snapshot;
pub use process::on_message;

pub const HELP: &str = "
### Payday
Scans the crime-report channel and posts the payout sheet for a date range.
#### Syntax
```text
?calculate [START] [END]
```
Dates are `YYYY/MM/DD` in JST. Omit both for the last seven days.
##### Example
```text
?calculate 2025/05/08 2025/05/11
```
Report messages carry a `犯罪種類[...]` marker; ⭕️/❌ reactions decide the
outcome and everyone under ✅ gets paid.";

pub const BAD_DATE: &str = "日付の形式が正しくありません。例: `?calculate 2025/05/08 2025/05/11`";
pub const NO_CHANNEL: &str = "指定チャンネルが見つかりません。";
pub const SNAPSHOT_FAILED: &str = "**Failed to write the snapshot files**";
