//! Process-wide scoring statistics.
//!
//! All counters live behind one mutex so a snapshot is always a consistent
//! point-in-time copy. The lock is held only for the increment or the copy,
//! never across pipeline work.

use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::Decision;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    Single,
    Batch,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestCounts {
    pub total: u64,
    pub single: u64,
    pub batch: u64,
    pub batch_records: u64,
    pub rejected_records: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionCounts {
    #[serde(rename = "APPROVE")]
    pub approve: u64,
    #[serde(rename = "CONDITIONAL_APPROVAL")]
    pub conditional_approval: u64,
    #[serde(rename = "REJECT")]
    pub reject: u64,
}

impl DecisionCounts {
    pub fn get(&self, decision: Decision) -> u64 {
        match decision {
            Decision::Approve => self.approve,
            Decision::ConditionalApproval => self.conditional_approval,
            Decision::Reject => self.reject,
        }
    }

    pub fn total(&self) -> u64 {
        self.approve + self.conditional_approval + self.reject
    }

    fn increment(&mut self, decision: Decision) {
        match decision {
            Decision::Approve => self.approve += 1,
            Decision::ConditionalApproval => self.conditional_approval += 1,
            Decision::Reject => self.reject += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencySummary {
    pub count: u64,
    pub total_ms: f64,
    pub mean_ms: f64,
    pub last_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub requests: RequestCounts,
    pub decisions: DecisionCounts,
    pub latency_ms: LatencySummary,
    pub captured_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct MetricsState {
    requests: RequestCounts,
    decisions: DecisionCounts,
    latency_count: u64,
    latency_total_ms: f64,
    latency_last_ms: f64,
}

#[derive(Debug, Default)]
pub struct MetricsAggregator {
    state: Mutex<MetricsState>,
}

impl MetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one completed scoring call. `decisions` holds one entry per
    /// successfully scored record; `rejected` counts records that failed.
    pub fn record(
        &self,
        kind: RequestKind,
        decisions: &[Decision],
        rejected: usize,
        latency_ms: f64,
    ) {
        let latency_ms = if latency_ms.is_finite() && latency_ms >= 0.0 {
            latency_ms
        } else {
            0.0
        };

        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.requests.total += 1;
        match kind {
            RequestKind::Single => state.requests.single += 1,
            RequestKind::Batch => {
                state.requests.batch += 1;
                state.requests.batch_records += (decisions.len() + rejected) as u64;
            }
        }
        state.requests.rejected_records += rejected as u64;
        for decision in decisions {
            state.decisions.increment(*decision);
        }
        state.latency_count += 1;
        state.latency_total_ms += latency_ms;
        state.latency_last_ms = latency_ms;
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let mean_ms = if state.latency_count == 0 {
            0.0
        } else {
            state.latency_total_ms / state.latency_count as f64
        };

        MetricsSnapshot {
            requests: state.requests,
            decisions: state.decisions,
            latency_ms: LatencySummary {
                count: state.latency_count,
                total_ms: state.latency_total_ms,
                mean_ms,
                last_ms: state.latency_last_ms,
            },
            captured_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn batch_counts_once_but_each_decision_individually() {
        let metrics = MetricsAggregator::new();

        metrics.record(
            RequestKind::Batch,
            &[Decision::Approve, Decision::Reject, Decision::Approve],
            1,
            12.0,
        );

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.requests.total, 1);
        assert_eq!(snapshot.requests.batch, 1);
        assert_eq!(snapshot.requests.single, 0);
        assert_eq!(snapshot.requests.batch_records, 4);
        assert_eq!(snapshot.requests.rejected_records, 1);
        assert_eq!(snapshot.decisions.get(Decision::Approve), 2);
        assert_eq!(snapshot.decisions.get(Decision::Reject), 1);
        assert_eq!(snapshot.decisions.total(), 3);
    }

    #[test]
    fn mean_latency_is_derived_from_running_sum() {
        let metrics = MetricsAggregator::new();
        assert_eq!(metrics.snapshot().latency_ms.mean_ms, 0.0);

        metrics.record(RequestKind::Single, &[Decision::Approve], 0, 10.0);
        metrics.record(RequestKind::Single, &[Decision::Approve], 0, 30.0);

        let latency = metrics.snapshot().latency_ms;
        assert_eq!(latency.count, 2);
        assert_eq!(latency.total_ms, 40.0);
        assert_eq!(latency.mean_ms, 20.0);
        assert_eq!(latency.last_ms, 30.0);
    }

    #[test]
    fn non_finite_latency_is_recorded_as_zero() {
        let metrics = MetricsAggregator::new();
        metrics.record(RequestKind::Single, &[], 1, f64::NAN);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.latency_ms.total_ms, 0.0);
        assert_eq!(snapshot.requests.rejected_records, 1);
    }

    #[test]
    fn concurrent_writers_lose_no_updates() {
        let metrics = MetricsAggregator::new();

        thread::scope(|scope| {
            for worker in 0..8 {
                let metrics = &metrics;
                scope.spawn(move || {
                    for _ in 0..250 {
                        if worker % 2 == 0 {
                            metrics.record(RequestKind::Single, &[Decision::Approve], 0, 1.0);
                        } else {
                            metrics.record(
                                RequestKind::Batch,
                                &[Decision::ConditionalApproval, Decision::Reject],
                                0,
                                2.0,
                            );
                        }
                    }
                });
            }

            scope.spawn(|| {
                for _ in 0..100 {
                    let snapshot = metrics.snapshot();
                    let expected = snapshot.requests.single + 2 * snapshot.requests.batch;
                    assert_eq!(snapshot.decisions.total(), expected);
                    assert_eq!(
                        snapshot.requests.total,
                        snapshot.requests.single + snapshot.requests.batch
                    );
                }
            });
        });

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.requests.single, 1000);
        assert_eq!(snapshot.requests.batch, 1000);
        assert_eq!(snapshot.decisions.total(), 3000);
        assert_eq!(snapshot.latency_ms.count, 2000);
    }
}
