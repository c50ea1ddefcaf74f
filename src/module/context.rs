//! Tick context for modules.
//!
//! Provides the frame timing modules need when they emit on their own
//! schedule (sensors, players).

/// Context handed to [`Module::poll`](super::Module::poll) once per frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TickContext {
    /// Seconds since the previous tick.
    pub delta_seconds: f32,
    /// Seconds since the host started ticking.
    pub elapsed_seconds: f64,
}

impl TickContext {
    /// Creates a new tick context.
    pub fn new(delta_seconds: f32, elapsed_seconds: f64) -> Self {
        Self {
            delta_seconds,
            elapsed_seconds,
        }
    }

    /// Returns the context for the following frame, `delta_seconds` later.
    pub fn advance(&self, delta_seconds: f32) -> Self {
        Self {
            delta_seconds,
            elapsed_seconds: self.elapsed_seconds + delta_seconds as f64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_accumulates_elapsed() {
        let ctx = TickContext::default().advance(0.5).advance(0.25);
        assert!((ctx.delta_seconds - 0.25).abs() < f32::EPSILON);
        assert!((ctx.elapsed_seconds - 0.75).abs() < 1e-9);
    }
}
