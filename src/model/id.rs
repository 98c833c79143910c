//! Record id generation.
//!
//! Ids combine the creation time in milliseconds with a process-wide
//! sequence number, so two records created in the same millisecond still get
//! distinct ids.

use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Return a new unique id of the form `<unix millis>-<sequence>`.
///
pub fn next_id() -> String {
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("{}-{}", Utc::now().timestamp_millis(), seq)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn ids_are_unique_within_a_tick() {
        let ids: HashSet<String> = (0..1000).map(|_| next_id()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn id_starts_with_timestamp() {
        let before = Utc::now().timestamp_millis();
        let id = next_id();
        let millis: i64 = id.split('-').next().unwrap().parse().unwrap();
        assert!(millis >= before);
    }
}
