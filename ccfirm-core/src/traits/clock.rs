//! Monotonic time source

/// Monotonic millisecond clock with an async delay
///
/// `now_ms` must never go backwards. The orchestrator only ever sleeps
/// through `delay_ms`, so a host test can substitute a manual clock that
/// advances instantly.
pub trait Clock {
    /// Milliseconds since an arbitrary fixed origin
    fn now_ms(&self) -> u64;

    /// Suspend for `ms` milliseconds
    fn delay_ms(&mut self, ms: u32) -> impl core::future::Future<Output = ()>;
}
