// StatsAggregator - incremental counters and running means

use crate::domain::{elapsed_minutes, EntryStatus, QueueEntry, QueueStats};

/// A committed entry transition, as seen by the aggregator
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transition {
    Issued,
    Served { wait_minutes: u32 },
    Completed { service_minutes: u32 },
    Left,
    Expired,
}

impl Transition {
    /// Derive the transition from an entry's previous status and its new state.
    /// `before = None` means the entry was just created.
    pub fn between(before: Option<EntryStatus>, after: &QueueEntry) -> Option<Self> {
        match (before, after.status) {
            (None, EntryStatus::Waiting) => Some(Transition::Issued),
            (Some(EntryStatus::Waiting), EntryStatus::Serving) => Some(Transition::Served {
                wait_minutes: after.actual_wait_time.unwrap_or(0),
            }),
            (Some(EntryStatus::Serving), EntryStatus::Completed) => {
                let service_minutes = match (after.served_at, after.completed_at) {
                    (Some(served), Some(done)) => elapsed_minutes(served, done),
                    _ => 0,
                };
                Some(Transition::Completed { service_minutes })
            }
            (Some(prev), EntryStatus::Left) if prev.is_active() => Some(Transition::Left),
            (Some(EntryStatus::Waiting), EntryStatus::Expired) => Some(Transition::Expired),
            _ => None,
        }
    }
}

/// Welford-style incremental mean; `n` is the sample count including `sample`
fn running_mean(avg: f64, sample: f64, n: u64) -> f64 {
    if n == 0 {
        return avg;
    }
    avg + (sample - avg) / n as f64
}

/// Fold one transition into the counters
pub fn record(stats: &mut QueueStats, transition: Transition) {
    match transition {
        Transition::Issued => stats.total_tokens_issued += 1,
        Transition::Served { wait_minutes } => {
            stats.wait_samples += 1;
            stats.average_wait_time = running_mean(
                stats.average_wait_time,
                f64::from(wait_minutes),
                stats.wait_samples,
            );
        }
        Transition::Completed { service_minutes } => {
            stats.total_served += 1;
            stats.service_samples += 1;
            stats.average_service_time = running_mean(
                stats.average_service_time,
                f64::from(service_minutes),
                stats.service_samples,
            );
        }
        Transition::Left => stats.total_left += 1,
        Transition::Expired => stats.total_expired += 1,
    }
}

/// Record whatever transition `entry` just went through
pub fn apply(stats: &mut QueueStats, before: Option<EntryStatus>, entry: &QueueEntry) {
    if let Some(transition) = Transition::between(before, entry) {
        record(stats, transition);
    }
}

/// Recompute all stats from the entry history (repair path only)
pub fn rebuild(entries: &[QueueEntry]) -> QueueStats {
    let mut stats = QueueStats::default();
    for entry in entries {
        record(&mut stats, Transition::Issued);
        if entry.served_at.is_some() {
            record(
                &mut stats,
                Transition::Served {
                    wait_minutes: entry.actual_wait_time.unwrap_or(0),
                },
            );
        }
        match entry.status {
            EntryStatus::Completed => {
                if let Some(t) = Transition::between(Some(EntryStatus::Serving), entry) {
                    record(&mut stats, t);
                }
            }
            EntryStatus::Left => record(&mut stats, Transition::Left),
            EntryStatus::Expired => record(&mut stats, Transition::Expired),
            EntryStatus::Waiting | EntryStatus::Serving => {}
        }
    }
    stats
}
