use std::collections::VecDeque;

use chrono::{DateTime, Utc};

use crate::{domain::Trigger, version::VersionToken};

/// Result of one Checking phase.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckOutcome {
    pub local: VersionToken,
    pub remote: VersionToken,
    pub changed: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActivityKind {
    Checked(CheckOutcome),
    CheckFailed(String),
    Downloaded {
        from: VersionToken,
        to: VersionToken,
    },
    DownloadFailed(String),
    Notified,
    NotificationFailed(String),
    ReloadSent,
    ReloadFailed(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActivityEntry {
    pub timestamp: DateTime<Utc>,
    pub trigger: Trigger,
    pub kind: ActivityKind,
}

/// Bounded in-memory activity history; the oldest entries are evicted first.
#[derive(Debug)]
pub struct ActivityLog {
    capacity: usize,
    entries: VecDeque<ActivityEntry>,
}

impl ActivityLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    pub fn record(&mut self, trigger: Trigger, kind: ActivityKind) {
        self.record_at(Utc::now(), trigger, kind);
    }

    pub fn record_at(&mut self, timestamp: DateTime<Utc>, trigger: Trigger, kind: ActivityKind) {
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(ActivityEntry {
            timestamp,
            trigger,
            kind,
        });
    }

    /// Entries at or after `since`, oldest first.
    pub fn since(&self, since: DateTime<Utc>) -> Vec<ActivityEntry> {
        self.entries
            .iter()
            .filter(|e| e.timestamp >= since)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 10, min, 0).unwrap()
    }

    #[test]
    fn evicts_oldest_when_full() {
        let mut log = ActivityLog::new(2);
        log.record_at(at(0), Trigger::Periodic, ActivityKind::ReloadSent);
        log.record_at(at(1), Trigger::Periodic, ActivityKind::Notified);
        log.record_at(at(2), Trigger::OnDemand, ActivityKind::DownloadFailed("x".into()));

        let all = log.since(at(0));
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].kind, ActivityKind::Notified);
        assert_eq!(all[1].trigger, Trigger::OnDemand);
    }

    #[test]
    fn since_is_inclusive_and_ordered() {
        let mut log = ActivityLog::new(10);
        for m in 0..5 {
            log.record_at(at(m), Trigger::Periodic, ActivityKind::ReloadSent);
        }
        let recent = log.since(at(3));
        assert_eq!(recent.len(), 2);
        assert!(recent[0].timestamp < recent[1].timestamp);
        assert!(log.since(at(4) + Duration::seconds(1)).is_empty());
    }
}
