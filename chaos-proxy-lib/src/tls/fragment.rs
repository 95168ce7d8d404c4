use std::time::Duration;

use tracing::{debug, info};

use crate::chaos::ChaosEngine;
use crate::tls::inspect::{extract_sni, is_client_hello};

/// One entry of a write plan: send `data[prev_end..end]`, then pause for
/// `delay` before the next write.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fragment {
    pub end: usize,
    pub delay: Duration,
}

/// Plans how the first outbound write of a connection is split. Cut
/// positions and delays come from the connection's own chaos engine, so
/// two connections never share a fragmentation pattern.
#[derive(Debug, Clone, Copy)]
pub struct Fragmenter {
    aggressive: bool,
}

impl Fragmenter {
    pub fn new(aggressive: bool) -> Self {
        Self { aggressive }
    }

    /// Build the write plan for `data`. Anything that is not a ClientHello
    /// goes out as a single chunk, as does a ClientHello too short to cut
    /// safely.
    pub fn plan(&self, engine: &mut ChaosEngine, data: &[u8]) -> Vec<Fragment> {
        if !is_client_hello(data) {
            return vec![Fragment { end: data.len(), delay: Duration::ZERO }];
        }

        let num_fragments = if self.aggressive {
            engine.fragment_count(3, 7)
        } else {
            engine.fragment_count(2, 4)
        };

        let positions = engine.fragment_positions(data.len(), num_fragments);
        if positions.is_empty() {
            debug!(len = data.len(), "cannot fragment safely, sending whole");
            return vec![Fragment { end: data.len(), delay: Duration::ZERO }];
        }

        if let Some(sni) = extract_sni(data) {
            info!(%sni, "fragmenting ClientHello");
        }

        let mut plan = Vec::with_capacity(positions.len() + 1);
        for pos in positions {
            let delay = Duration::from_secs_f64(engine.jitter_delay(0.5, 2.5));
            plan.push(Fragment { end: pos, delay });
        }
        let final_delay = Duration::from_secs_f64(engine.jitter_delay(0.3, 1.5));
        plan.push(Fragment { end: data.len(), delay: final_delay });

        debug!(fragments = plan.len(), "ClientHello write plan built");

        plan
    }

    /// Optional variant that chunks arbitrary data into jittered record
    /// sized pieces. Not used on the primary path; reachable behind the
    /// `evasion.record_randomization` flag.
    pub fn randomize_record_size(&self, engine: &mut ChaosEngine, data: &[u8]) -> Vec<Fragment> {
        if data.len() < 32 {
            return vec![Fragment { end: data.len(), delay: Duration::ZERO }];
        }

        let base_size = 256.0 + engine.mix() * 7936.0;

        let mut plan = Vec::new();
        let mut pos = 0usize;
        while pos < data.len() {
            let v = engine.mix();
            let size = ((base_size * (0.7 + v * 0.6)) as usize).max(64);
            let end = (pos + size).min(data.len());
            let delay = Duration::from_secs_f64(engine.jitter_delay(0.1, 0.5));
            plan.push(Fragment { end, delay });
            pos = end;
        }

        plan
    }
}
