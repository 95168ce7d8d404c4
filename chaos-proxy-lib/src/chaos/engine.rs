use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};

use sha2::{Digest, Sha256};

const SIGMA: f64 = 10.0;
const RHO: f64 = 28.0;
const BETA: f64 = 8.0 / 3.0;
const LOGISTIC_R: f64 = 3.99;
const GOLDEN_FRAC: f64 = 0.618033988749;
const HISTORY_CAP: usize = 1000;

/// Per-connection entropy source. A Lorenz attractor and a logistic map,
/// seeded from the wall clock and the connection id, are blended into a
/// (0,1) stream that drives fragment counts, cut positions, and delays.
///
/// One engine per connection; the owning relay task is the only mutator.
pub struct ChaosEngine {
    x: f64,
    y: f64,
    z: f64,
    logistic_x: f64,
    iteration: u64,
    pub(crate) history: VecDeque<f64>,
    pub(crate) last_lyapunov: f64,
    pub(crate) last_entropy: f64,
    pub(crate) last_correlation_dim: f64,
}

impl ChaosEngine {
    pub fn new(connection_id: &[u8]) -> Self {
        let ns = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();

        let mut hasher = Sha256::new();
        hasher.update(ns.to_string().as_bytes());
        hasher.update(connection_id);
        let digest = hasher.finalize();

        let extract = |offset: usize| -> f64 {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(&digest[offset..offset + 8]);
            u64::from_be_bytes(raw) as f64 / (u64::MAX as f64 + 1.0)
        };

        Self {
            x: extract(0) * 20.0 - 10.0,
            y: extract(8) * 20.0 - 10.0,
            z: extract(16) * 40.0,
            logistic_x: extract(24),
            iteration: 0,
            history: VecDeque::with_capacity(HISTORY_CAP),
            last_lyapunov: 0.0,
            last_entropy: 0.0,
            last_correlation_dim: 0.0,
        }
    }

    fn lorenz_step(&mut self, dt: f64) {
        let dx = SIGMA * (self.y - self.x) * dt;
        let dy = (self.x * (RHO - self.z) - self.y) * dt;
        let dz = (self.x * self.y - BETA * self.z) * dt;
        self.x += dx;
        self.y += dy;
        self.z += dz;
    }

    fn logistic_step(&mut self) {
        self.logistic_x = LOGISTIC_R * self.logistic_x * (1.0 - self.logistic_x);
    }

    /// Advance both maps one step and emit the next value in (0,1).
    pub fn mix(&mut self) -> f64 {
        self.lorenz_step(0.01);
        self.logistic_step();

        let lorenz_contrib = (self.x + 10.0) / 20.0;
        let mixed = (lorenz_contrib + self.logistic_x).rem_euclid(1.0);

        self.iteration += 1;
        let time_factor = (self.iteration as f64 * GOLDEN_FRAC).rem_euclid(1.0);

        let sample = (mixed + time_factor).rem_euclid(1.0);

        if self.history.len() == HISTORY_CAP {
            self.history.pop_front();
        }
        self.history.push_back(sample);

        sample
    }

    pub fn fragment_count(&mut self, min_frags: usize, max_frags: usize) -> usize {
        let v = self.mix();
        let count = min_frags + (v * (max_frags - min_frags + 1) as f64) as usize;
        count.clamp(min_frags, max_frags)
    }

    /// Pick cut offsets for a buffer of `total_len` bytes. Each cut lands
    /// inside its own segment of the safe range, nudged by the chaos
    /// stream; cuts closer than 5 bytes to the previous kept cut are
    /// dropped, so fewer than `num_fragments` may come back.
    pub fn fragment_positions(&mut self, total_len: usize, num_fragments: usize) -> Vec<usize> {
        if num_fragments <= 1 {
            return Vec::new();
        }

        let safe_start = 10usize;
        let Some(safe_end) = total_len.checked_sub(10) else {
            return Vec::new();
        };
        let Some(safe_range) = safe_end.checked_sub(safe_start) else {
            return Vec::new();
        };
        if safe_range < num_fragments - 1 {
            return Vec::new();
        }

        let mut positions = Vec::with_capacity(num_fragments - 1);
        for i in 0..num_fragments - 1 {
            let v = self.mix();

            let segment_size = safe_range as f64 / num_fragments as f64;
            let segment_base = safe_start as f64 + (i as f64 + 0.3) * segment_size;
            let segment_variance = segment_size * 0.4;

            let pos = (segment_base + (v - 0.5) * segment_variance).round() as i64;
            let pos = pos.clamp(safe_start as i64, safe_end as i64) as usize;
            positions.push(pos);
        }

        positions.sort_unstable();

        let mut cleaned = Vec::with_capacity(positions.len());
        let mut last_pos = safe_start;
        for pos in positions {
            if pos - last_pos >= 5 {
                cleaned.push(pos);
                last_pos = pos;
            }
        }

        cleaned
    }

    /// A delay in seconds around `base_ms`: 70% of draws land in a narrow
    /// band above the base, the rest spread across the full variance.
    pub fn jitter_delay(&mut self, base_ms: f64, variance: f64) -> f64 {
        let v = self.mix();

        let delay_ms = if v < 0.7 {
            base_ms + v * variance * 0.3
        } else {
            base_ms + variance * (v - 0.7) / 0.3
        };

        delay_ms / 1000.0
    }
}
