//! Rolling timings for named host-loop phases

use super::ring_buffer::RingBuffer;
use std::time::{Duration, Instant};

/// Keeps a window of samples per phase (e.g. "update", "commit").
///
/// Phases are few and fixed per host loop, so a linear scan over a small
/// vector beats hashing the name on every sample.
pub struct PhaseTimer {
    window: usize,
    phases: Vec<(&'static str, RingBuffer<Duration>)>,
}

impl PhaseTimer {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            phases: Vec::new(),
        }
    }

    pub fn time<F, R>(&mut self, phase: &'static str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let start = Instant::now();
        let result = f();
        self.record(phase, start.elapsed());
        result
    }

    pub fn record(&mut self, phase: &'static str, elapsed: Duration) {
        match self.phases.iter_mut().find(|(name, _)| *name == phase) {
            Some((_, samples)) => samples.push(elapsed),
            None => {
                let mut samples = RingBuffer::new(self.window);
                samples.push(elapsed);
                self.phases.push((phase, samples));
            }
        }
    }

    pub fn average_ms(&self, phase: &str) -> f64 {
        self.samples(phase)
            .map(|s| s.average().as_secs_f64() * 1000.0)
            .unwrap_or(0.0)
    }

    pub fn range_ms(&self, phase: &str) -> (f64, f64) {
        self.samples(phase)
            .map(|s| {
                let (min, max) = s.min_max();
                (min.as_secs_f64() * 1000.0, max.as_secs_f64() * 1000.0)
            })
            .unwrap_or((0.0, 0.0))
    }

    pub fn phases(&self) -> Vec<&'static str> {
        self.phases.iter().map(|(name, _)| *name).collect()
    }

    fn samples(&self, phase: &str) -> Option<&RingBuffer<Duration>> {
        self.phases
            .iter()
            .find(|(name, _)| *name == phase)
            .map(|(_, samples)| samples)
    }
}

impl Default for PhaseTimer {
    fn default() -> Self {
        Self::new(60)
    }
}
