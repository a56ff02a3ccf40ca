//! Wall-clock source.  Reconciliation and the progress timer read time only
//! through this trait so tests can drive it by hand.

pub trait Clock {
    /// Seconds since the Unix epoch, with sub-second precision.
    fn now_epoch_secs(&self) -> f64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_epoch_secs(&self) -> f64 {
        chrono::Utc::now().timestamp_millis() as f64 / 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_is_after_2023() {
        assert!(SystemClock.now_epoch_secs() > 1_672_531_200.0);
    }
}
