//! Frame clock shared between the loop and movement code

/// Elapsed time of the most recent frame. The engine writes it once per
/// tick; anything that converts a speed into a displacement reads it.
/// Milliseconds are the canonical unit.
#[derive(Debug, Clone, Copy, Default)]
pub struct Clock {
    delta_ms: f32,
}

impl Clock {
    pub fn new() -> Self {
        Self { delta_ms: 0.0 }
    }

    /// Record the last frame's duration in milliseconds.
    pub fn set_delta_ms(&mut self, delta_ms: f32) {
        self.delta_ms = delta_ms;
    }

    pub fn delta_ms(&self) -> f32 {
        self.delta_ms
    }

    /// Last frame's duration in seconds, for px/s speeds.
    pub fn delta_seconds(&self) -> f32 {
        self.delta_ms / 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_starts_at_zero() {
        let clock = Clock::new();
        assert_eq!(clock.delta_ms(), 0.0);
        assert_eq!(clock.delta_seconds(), 0.0);
    }

    #[test]
    fn test_clock_converts_to_seconds() {
        let mut clock = Clock::new();
        clock.set_delta_ms(16.0);
        assert_eq!(clock.delta_ms(), 16.0);
        assert_eq!(clock.delta_seconds(), 0.016);

        clock.set_delta_ms(250.0);
        assert_eq!(clock.delta_seconds(), 0.25);
    }
}
