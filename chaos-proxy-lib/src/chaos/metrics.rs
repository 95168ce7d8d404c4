use serde::Serialize;

use super::engine::ChaosEngine;

const LOGISTIC_R: f64 = 3.99;

/// Informational summaries of the emitted sample stream. Read-only; none
/// of these feed back into emission.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ChaosMetrics {
    pub lyapunov_exponent: f64,
    pub shannon_entropy: f64,
    pub correlation_dimension: f64,
    pub samples_collected: usize,
}

impl ChaosEngine {
    pub fn lyapunov_exponent(&mut self) -> f64 {
        const SAMPLES: usize = 100;
        if self.history.len() < SAMPLES {
            return self.last_lyapunov;
        }

        let recent: Vec<f64> = self.history.iter().rev().take(SAMPLES).rev().copied().collect();

        let mut sum = 0.0;
        for pair in recent.windows(2) {
            let dx = (pair[1] - pair[0]).abs();
            if dx > 1e-10 {
                sum += (LOGISTIC_R * (1.0 - 2.0 * pair[0])).abs().ln();
            }
        }

        self.last_lyapunov = sum / (recent.len() - 1) as f64;
        self.last_lyapunov
    }

    pub fn shannon_entropy(&mut self) -> f64 {
        const BINS: usize = 256;
        if self.history.len() < 10 {
            return self.last_entropy;
        }

        let mut hist = [0usize; BINS];
        for &sample in &self.history {
            let bin = ((sample * BINS as f64) as usize).min(BINS - 1);
            hist[bin] += 1;
        }

        let total = self.history.len() as f64;
        let mut entropy = 0.0;
        for &count in &hist {
            if count > 0 {
                let p = count as f64 / total;
                entropy -= p * p.log2();
            }
        }

        self.last_entropy = entropy;
        entropy
    }

    pub fn correlation_dimension(&mut self) -> f64 {
        const WINDOW: usize = 500;
        const RADIUS: f64 = 0.1;
        if self.history.len() < 50 {
            return self.last_correlation_dim;
        }

        let recent: Vec<f64> = self
            .history
            .iter()
            .rev()
            .take(WINDOW)
            .rev()
            .copied()
            .collect();

        let n = recent.len();
        let mut close_pairs = 0usize;
        for i in 0..n {
            for j in 0..n {
                if i != j && (recent[i] - recent[j]).abs() < RADIUS {
                    close_pairs += 1;
                }
            }
        }

        let total_pairs = n * (n - 1);
        if total_pairs > 0 {
            let correlation = close_pairs as f64 / total_pairs as f64;
            if correlation > 0.0 {
                self.last_correlation_dim = correlation.ln() / RADIUS.ln();
            }
        }

        self.last_correlation_dim
    }

    pub fn metrics(&mut self) -> ChaosMetrics {
        ChaosMetrics {
            lyapunov_exponent: self.lyapunov_exponent(),
            shannon_entropy: self.shannon_entropy(),
            correlation_dimension: self.correlation_dimension(),
            samples_collected: self.history.len(),
        }
    }
}
