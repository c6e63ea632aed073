//! Batch health metrics and progress formatting for bulk enumeration.
//!
//! Every flush of the solved database is summarized: integrity counters
//! (zero keys, impossible move bytes, implausible ply distances), the
//! turn/win distributions, and ply aggregates. A cumulative baseline tracks
//! the win rate across the whole run; once past a warmup of 10,000 records,
//! a batch whose win rate drifts more than 0.2 from the baseline is flagged
//! ANOMALY, as is any batch with a non-zero integrity counter. Anomalies
//! are logged and the run continues — the operator decides.

use crate::constants::{move_from, move_to, MOVE_NONE, PLIES_SANITY_MAX};
use crate::records::SolvedRecord;

/// Accumulated statistics over a set of solved records.
#[derive(Clone, Copy, Debug)]
pub struct BatchStats {
    pub records: u64,
    pub zero_keys: u64,
    pub illegal_best: u64,
    pub plies_over_cap: u64,
    pub turn_counts: [u64; 2],
    pub win_counts: [u64; 2],
    pub plies_sum: u64,
    pub plies_min: u16,
    pub plies_max: u16,
}

impl Default for BatchStats {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchStats {
    pub fn new() -> BatchStats {
        BatchStats {
            records: 0,
            zero_keys: 0,
            illegal_best: 0,
            plies_over_cap: 0,
            turn_counts: [0; 2],
            win_counts: [0; 2],
            plies_sum: 0,
            plies_min: u16::MAX,
            plies_max: 0,
        }
    }

    pub fn observe(&mut self, r: &SolvedRecord) {
        self.records += 1;
        if r.key == 0 {
            self.zero_keys += 1;
        }
        // both nibbles of a move byte are structurally in range; the one
        // encodable impossibility is a move that starts and ends on the
        // same cell
        if r.best != MOVE_NONE && move_from(r.best) == move_to(r.best) {
            self.illegal_best += 1;
        }
        if r.plies > PLIES_SANITY_MAX {
            self.plies_over_cap += 1;
        }
        self.turn_counts[(r.turn & 1) as usize] += 1;
        self.win_counts[(r.win & 1) as usize] += 1;
        self.plies_sum += r.plies as u64;
        self.plies_min = self.plies_min.min(r.plies);
        self.plies_max = self.plies_max.max(r.plies);
    }

    pub fn merge(&mut self, other: &BatchStats) {
        self.records += other.records;
        self.zero_keys += other.zero_keys;
        self.illegal_best += other.illegal_best;
        self.plies_over_cap += other.plies_over_cap;
        for i in 0..2 {
            self.turn_counts[i] += other.turn_counts[i];
            self.win_counts[i] += other.win_counts[i];
        }
        self.plies_sum += other.plies_sum;
        self.plies_min = self.plies_min.min(other.plies_min);
        self.plies_max = self.plies_max.max(other.plies_max);
    }

    /// Fraction of records with `win == 1`.
    pub fn win_rate(&self) -> f64 {
        if self.records == 0 {
            0.0
        } else {
            self.win_counts[1] as f64 / self.records as f64
        }
    }

    pub fn mean_plies(&self) -> f64 {
        if self.records == 0 {
            0.0
        } else {
            self.plies_sum as f64 / self.records as f64
        }
    }

    /// Sum of the integrity counters; non-zero means a broken batch.
    pub fn integrity_violations(&self) -> u64 {
        self.zero_keys + self.illegal_best + self.plies_over_cap
    }

    /// One-line summary for flush logging.
    pub fn summary(&self) -> String {
        let min = if self.records == 0 { 0 } else { self.plies_min };
        format!(
            "records={} zero_keys={} illegal_best={} plies_over_cap={} \
             turn0={} turn1={} win0={} win1={} win_rate={:.4} \
             plies_mean={:.2} plies_min={} plies_max={}",
            self.records,
            self.zero_keys,
            self.illegal_best,
            self.plies_over_cap,
            self.turn_counts[0],
            self.turn_counts[1],
            self.win_counts[0],
            self.win_counts[1],
            self.win_rate(),
            self.mean_plies(),
            min,
            self.plies_max,
        )
    }
}

/// Records required in the cumulative baseline before drift is judged.
pub const DRIFT_WARMUP_RECORDS: u64 = 10_000;

/// Maximum allowed win-rate drift between a batch and the baseline.
pub const DRIFT_THRESHOLD: f64 = 0.2;

/// Verdict for one flushed batch.
#[derive(Clone, Copy, Debug)]
pub struct BatchReport {
    pub anomaly: bool,
    pub drift: f64,
}

/// Cumulative health tracker across all flushes of a run.
#[derive(Default)]
pub struct HealthMonitor {
    cumulative: BatchStats,
}

impl HealthMonitor {
    pub fn new() -> HealthMonitor {
        HealthMonitor {
            cumulative: BatchStats::new(),
        }
    }

    pub fn cumulative(&self) -> &BatchStats {
        &self.cumulative
    }

    /// Judge a batch against the baseline accumulated so far, then fold the
    /// batch in. Drift only counts after the warmup.
    pub fn check(&mut self, batch: &BatchStats) -> BatchReport {
        let drift = (batch.win_rate() - self.cumulative.win_rate()).abs();
        let drift_anomaly = self.cumulative.records >= DRIFT_WARMUP_RECORDS && drift > DRIFT_THRESHOLD;
        let report = BatchReport {
            anomaly: batch.integrity_violations() != 0 || drift_anomaly,
            drift,
        };
        self.cumulative.merge(batch);
        report
    }
}

/// Elapsed milliseconds as `HH:MM:SS`.
pub fn format_hms(ms: u64) -> String {
    let total_s = ms / 1000;
    let h = total_s / 3600;
    let m = (total_s % 3600) / 60;
    let s = total_s % 60;
    format!("{h:02}:{m:02}:{s:02}")
}

/// Shared suffix of flush/progress lines: elapsed, rate, percent, ETA.
pub fn progress_suffix(produced: u64, limit: u64, elapsed_ms: u64) -> String {
    let rate = if elapsed_ms > 0 {
        produced as f64 * 1000.0 / elapsed_ms as f64
    } else {
        0.0
    };
    let mut out = format!("elapsed={} rate_per_s={:.0}", format_hms(elapsed_ms), rate);
    if limit > 0 {
        let pct = 100.0 * produced as f64 / limit as f64;
        out.push_str(&format!(" pct={pct:.2}"));
        if rate > 0.0 && produced < limit {
            let eta_ms = ((limit - produced) as f64 / rate * 1000.0) as u64;
            out.push_str(&format!(" eta={}", format_hms(eta_ms)));
        }
    }
    out
}
