//! Rolling per-user list of recently profiled requests.
//!
//! Stored as a JSON array under the user's toolbar token. Entries use short
//! field names to keep the blob small. Concurrent writers may lose an entry
//! (read-modify-write without compare-and-swap); that is acceptable here.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Number of entries kept per user.
pub const DEFAULT_HISTORY_LEN: usize = 15;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Duration in seconds.
    pub d: f64,
    /// Start time, epoch seconds.
    pub t: f64,
    /// Full request path including the query string.
    pub u: String,
    /// Correlation id.
    pub c: String,
    /// HTTP method.
    pub v: String,
    /// Response status code.
    pub s: u16,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestHistory {
    entries: Vec<HistoryEntry>,
}

impl RequestHistory {
    /// Decode a stored list; a missing or empty blob is an empty history.
    pub fn decode(raw: Option<&str>) -> Result<Self> {
        let entries = match raw {
            Some(s) if !s.trim().is_empty() => serde_json::from_str(s)?,
            _ => Vec::new(),
        };
        Ok(Self { entries })
    }

    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.entries)?)
    }

    /// Append and keep only the newest `keep` entries.
    pub fn push(&mut self, entry: HistoryEntry, keep: usize) {
        self.entries.push(entry);
        if self.entries.len() > keep {
            let excess = self.entries.len() - keep;
            self.entries.drain(..excess);
        }
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<HistoryEntry> {
        self.entries
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn entry(i: usize) -> HistoryEntry {
        HistoryEntry {
            d: 0.1,
            t: i as f64,
            u: format!("/page/{i}"),
            c: format!("cid{i}"),
            v: "GET".into(),
            s: 200,
        }
    }

    #[test]
    fn keeps_newest_entries() {
        let mut h = RequestHistory::default();
        for i in 0..20 {
            h.push(entry(i), DEFAULT_HISTORY_LEN);
        }
        assert_eq!(h.entries().len(), DEFAULT_HISTORY_LEN);
        assert_eq!(h.entries()[0].c, "cid5");
        assert_eq!(h.entries()[14].c, "cid19");
    }

    #[test]
    fn empty_blob_decodes_to_empty() {
        assert!(RequestHistory::decode(None).unwrap().entries().is_empty());
        assert!(RequestHistory::decode(Some("")).unwrap().entries().is_empty());
        assert!(RequestHistory::decode(Some("not json")).is_err());
    }

    #[test]
    fn short_field_names_on_the_wire() {
        let mut h = RequestHistory::default();
        h.push(entry(1), 5);
        let s = h.encode().unwrap();
        assert!(s.contains(r#""c":"cid1""#));
        assert!(s.contains(r#""s":200"#));
    }
}
