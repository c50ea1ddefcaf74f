//! Heartbeat sensor module.
//!
//! Emits one pulse per beat on its heartbeat sender port. Real sensor input
//! is not modeled; the rate is set from the panel or configuration.

use std::any::Any;

use crate::module::{Module, ModuleInfo, ModuleKind, Outbox, PortSpec, TickContext};
use crate::patch::category;

pub const MIN_BPM: f32 = 20.0;
pub const MAX_BPM: f32 = 240.0;
pub const DEFAULT_BPM: f32 = 72.0;

/// Beats emitted in one tick at most; a long stall does not burst.
const MAX_CATCH_UP: u32 = 4;

static PORTS: [PortSpec; 1] = [PortSpec::sender("beat_out", "Beat", category::HEARTBEAT)];

/// A heartbeat sensor.
///
/// # Ports
///
/// - **Beat** (sender, "heartbeat"): `[beats_per_minute]` once per beat.
pub struct HeartbeatSensor {
    bpm: f32,
    /// Position within the current beat, 0.0 to 1.0.
    phase: f32,
    beats: u64,
}

impl HeartbeatSensor {
    pub fn new(bpm: f32) -> Self {
        Self {
            bpm: bpm.clamp(MIN_BPM, MAX_BPM),
            phase: 0.0,
            beats: 0,
        }
    }

    pub fn bpm(&self) -> f32 {
        self.bpm
    }

    pub fn set_bpm(&mut self, bpm: f32) {
        self.bpm = bpm.clamp(MIN_BPM, MAX_BPM);
    }

    /// Beats emitted so far.
    pub fn beats(&self) -> u64 {
        self.beats
    }

    pub fn phase(&self) -> f32 {
        self.phase
    }
}

impl Default for HeartbeatSensor {
    fn default() -> Self {
        Self::new(DEFAULT_BPM)
    }
}

impl Module for HeartbeatSensor {
    fn info(&self) -> &ModuleInfo {
        static INFO: ModuleInfo = ModuleInfo {
            id: "sensor.heartbeat",
            name: "Heartbeat",
            kind: ModuleKind::Sensor,
            description: "Pulses once per heartbeat",
            ports: &PORTS,
        };
        &INFO
    }

    fn poll(&mut self, context: &TickContext, outbox: &mut Outbox) {
        self.phase += context.delta_seconds.max(0.0) * self.bpm / 60.0;
        let due = self.phase.floor() as u32;
        self.phase = self.phase.fract();

        if due > MAX_CATCH_UP {
            log::debug!("Heartbeat skipped {} beats after a stall", due - MAX_CATCH_UP);
        }
        for _ in 0..due.min(MAX_CATCH_UP) {
            self.beats += 1;
            outbox.send(&[self.bpm], category::HEARTBEAT);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tick(sensor: &mut HeartbeatSensor, dt: f32) -> usize {
        let mut outbox = Outbox::new();
        sensor.poll(&TickContext::new(dt, 0.0), &mut outbox);
        outbox.len()
    }

    #[test]
    fn test_one_beat_per_period() {
        // 60 bpm = one beat per second
        let mut sensor = HeartbeatSensor::new(60.0);
        assert_eq!(tick(&mut sensor, 0.5), 0);
        assert_eq!(tick(&mut sensor, 0.5), 1);
        assert_eq!(tick(&mut sensor, 0.25), 0);
        assert_eq!(sensor.beats(), 1);
    }

    #[test]
    fn test_payload_is_bpm() {
        let mut sensor = HeartbeatSensor::new(120.0);
        let mut outbox = Outbox::new();
        sensor.poll(&TickContext::new(0.5, 0.0), &mut outbox);
        let messages = outbox.into_messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].payload, vec![120.0]);
        assert_eq!(messages[0].category, category::HEARTBEAT);
    }

    #[test]
    fn test_stall_is_capped() {
        let mut sensor = HeartbeatSensor::new(60.0);
        assert_eq!(tick(&mut sensor, 30.0), MAX_CATCH_UP as usize);
    }

    #[test]
    fn test_bpm_clamped() {
        let mut sensor = HeartbeatSensor::new(5.0);
        assert_eq!(sensor.bpm(), MIN_BPM);
        sensor.set_bpm(1000.0);
        assert_eq!(sensor.bpm(), MAX_BPM);
    }
}
