//! Hardware counters

/// Counter clocked by an external pulse train (the LMT01 output)
pub trait PulseCounter {
    /// Pulses counted since the last reset
    fn count(&self) -> u16;

    fn reset(&mut self);
}
