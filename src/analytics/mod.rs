//! Fetch analytics: an opt-in JSONL record of every dashboard call.
//!
//! Enabled with `[logging] enabled = true` or `MELANALYTICS_LOG=1`; read back
//! by `melanalytics health`.

pub mod logger;
