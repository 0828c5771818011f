//! Tessera Metrics - lightweight instrumentation for the storage engine
//!
//! Counters for structural events (migrations, disposals, archetype
//! creation) and rolling timings for host-loop phases. Everything here
//! vanishes when the `metrics` feature is disabled.
//!
//! # Feature Flags
//!
//! - `metrics` - Enable metrics collection (default: disabled)
//!
//! # Usage
//!
//! ```ignore
//! use tessera_metrics::PhaseTimer;
//!
//! let mut phases = PhaseTimer::new(120); // Keep the last 120 samples per phase
//! phases.time("commit", || world.commit());
//! println!("commit avg: {:.3}ms", phases.average_ms("commit"));
//! ```

#[cfg(feature = "metrics")]
mod counter;
#[cfg(feature = "metrics")]
mod phase_timer;
#[cfg(feature = "metrics")]
mod ring_buffer;

#[cfg(feature = "metrics")]
pub use counter::Counter;
#[cfg(feature = "metrics")]
pub use phase_timer::PhaseTimer;
#[cfg(feature = "metrics")]
pub use ring_buffer::RingBuffer;

// ============================================================================
// Macros for conditional compilation
// ============================================================================

/// Execute code only when metrics are enabled
#[macro_export]
macro_rules! metrics {
    ($($tt:tt)*) => {
        #[cfg(feature = "metrics")]
        {
            $($tt)*
        }
    };
}

// ============================================================================
// No-op stubs when metrics disabled
// ============================================================================

#[cfg(not(feature = "metrics"))]
#[derive(Debug, Default)]
pub struct Counter;

#[cfg(not(feature = "metrics"))]
impl Counter {
    pub fn new() -> Self { Self }
    pub fn increment(&mut self, _name: &'static str, _value: usize) {}
    pub fn get(&self, _name: &str) -> usize { 0 }
    pub fn reset_all(&mut self) {}
    pub fn iter(&self) -> std::iter::Empty<(&'static str, usize)> { std::iter::empty() }
}

#[cfg(not(feature = "metrics"))]
pub struct RingBuffer<T>(std::marker::PhantomData<T>);

#[cfg(not(feature = "metrics"))]
impl<T> RingBuffer<T> {
    pub fn new(_capacity: usize) -> Self { Self(std::marker::PhantomData) }
    pub fn push(&mut self, _value: T) {}
    pub fn len(&self) -> usize { 0 }
    pub fn is_empty(&self) -> bool { true }
}

#[cfg(not(feature = "metrics"))]
#[derive(Debug, Default)]
pub struct PhaseTimer;

#[cfg(not(feature = "metrics"))]
impl PhaseTimer {
    pub fn new(_window: usize) -> Self { Self }
    pub fn time<F, R>(&mut self, _phase: &'static str, f: F) -> R where F: FnOnce() -> R { f() }
    pub fn record(&mut self, _phase: &'static str, _elapsed: std::time::Duration) {}
    pub fn average_ms(&self, _phase: &str) -> f64 { 0.0 }
    pub fn range_ms(&self, _phase: &str) -> (f64, f64) { (0.0, 0.0) }
    pub fn phases(&self) -> Vec<&'static str> { Vec::new() }
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_compiles_in_either_mode() {
        let mut counter = super::Counter::new();
        counter.increment("migrated", 3);
        let mut phases = super::PhaseTimer::new(8);
        let value = phases.time("commit", || 7);
        assert_eq!(value, 7);
        let mut _buffer = super::RingBuffer::<std::time::Duration>::new(4);
    }
}
