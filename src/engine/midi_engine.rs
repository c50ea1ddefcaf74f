//! MIDI Engine
//!
//! Receives MIDI from hardware controllers and virtual ports. midir delivers
//! bytes on its own callback thread; parsed events cross to the UI thread
//! through an rtrb ring buffer, where the MIDI input module drains them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use midir::{MidiInput, MidiInputConnection, MidiInputPort};
use rtrb::{Consumer, Producer, RingBuffer};

/// Default buffer size for MIDI events.
pub const DEFAULT_MIDI_BUFFER_SIZE: usize = 512;

/// Seconds between hot-plug rescans.
const SCAN_INTERVAL: Duration = Duration::from_secs(2);

const CLIENT_NAME: &str = "Module Patcher";

/// Information about a MIDI input device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MidiDeviceInfo {
    /// Human-readable device name.
    pub name: String,
    /// Internal port index.
    pub index: usize,
}

/// Channel messages understood by the patcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiEvent {
    NoteOn { channel: u8, note: u8, velocity: u8 },
    NoteOff { channel: u8, note: u8 },
    ControlChange { channel: u8, controller: u8, value: u8 },
    /// 14-bit bend, centered at zero (-8192 to 8191).
    PitchBend { channel: u8, value: i16 },
}

impl MidiEvent {
    /// Parse a channel message from raw bytes.
    ///
    /// Returns None for system messages, unsupported channel messages and
    /// truncated input. A note-on with velocity 0 is a note-off.
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        let (&status, rest) = data.split_first()?;
        let channel = status & 0x0F;
        let &[a, b, ..] = rest else {
            return None;
        };
        let (a, b) = (a & 0x7F, b & 0x7F);

        match status & 0xF0 {
            0x90 if b > 0 => Some(MidiEvent::NoteOn {
                channel,
                note: a,
                velocity: b,
            }),
            0x80 | 0x90 => Some(MidiEvent::NoteOff { channel, note: a }),
            0xB0 => Some(MidiEvent::ControlChange {
                channel,
                controller: a,
                value: b,
            }),
            0xE0 => Some(MidiEvent::PitchBend {
                channel,
                value: (((b as i16) << 7) | a as i16) - 8192,
            }),
            _ => None,
        }
    }

    /// Get the MIDI channel for this event.
    pub fn channel(&self) -> u8 {
        match *self {
            MidiEvent::NoteOn { channel, .. }
            | MidiEvent::NoteOff { channel, .. }
            | MidiEvent::ControlChange { channel, .. }
            | MidiEvent::PitchBend { channel, .. } => channel,
        }
    }

    /// The `[note, velocity]` payload carried on "midi" ports, with note-off
    /// as velocity 0. None for non-note events.
    pub fn note_payload(&self) -> Option<[f32; 2]> {
        match *self {
            MidiEvent::NoteOn { note, velocity, .. } => Some([note as f32, velocity as f32]),
            MidiEvent::NoteOff { note, .. } => Some([note as f32, 0.0]),
            _ => None,
        }
    }
}

/// MIDI event with the driver's timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestampedMidiEvent {
    pub event: MidiEvent,
    /// Microseconds since the connection was opened.
    pub timestamp_us: u64,
}

/// Error type for MIDI operations.
#[derive(Debug, thiserror::Error)]
pub enum MidiError {
    /// Failed to initialize the MIDI subsystem.
    #[error("MIDI init error: {0}")]
    Init(String),
    /// Failed to connect to a device.
    #[error("MIDI connection error: {0}")]
    Connection(String),
    /// No device matches the requested index or name.
    #[error("MIDI device not found: {0}")]
    DeviceNotFound(String),
}

/// Port list shared with the scan thread.
struct MidiState {
    ports: Vec<MidiInputPort>,
    port_names: Vec<String>,
}

fn scan_ports(midi_in: &MidiInput) -> MidiState {
    let ports: Vec<MidiInputPort> = midi_in.ports().into_iter().collect();
    let port_names = ports
        .iter()
        .map(|p| midi_in.port_name(p).unwrap_or_else(|_| "Unknown".to_string()))
        .collect();
    MidiState { ports, port_names }
}

/// MIDI engine for receiving MIDI input from one device at a time.
pub struct MidiEngine {
    /// Cached device list.
    devices: Vec<MidiDeviceInfo>,
    /// Port name of the connected device. Indices shift when devices come
    /// and go, names do not.
    connected_device: Option<String>,
    /// Active MIDI connection.
    connection: Option<MidiInputConnection<()>>,
    /// Producer side of the event ring, shared with the connection callback
    /// so it survives reconnects.
    producer: Arc<Mutex<Producer<TimestampedMidiEvent>>>,
    /// Shared state for device enumeration.
    state: Arc<Mutex<MidiState>>,
    /// Flag to signal the scan thread to stop.
    scan_running: Arc<AtomicBool>,
    scan_thread: Option<thread::JoinHandle<()>>,
}

impl MidiEngine {
    /// Create a new MIDI engine.
    ///
    /// Returns the engine and a consumer for receiving MIDI events.
    pub fn new() -> Result<(Self, Consumer<TimestampedMidiEvent>), MidiError> {
        let (producer, consumer) = RingBuffer::new(DEFAULT_MIDI_BUFFER_SIZE);

        let midi_in = MidiInput::new(CLIENT_NAME).map_err(|e| MidiError::Init(e.to_string()))?;
        let state = Arc::new(Mutex::new(scan_ports(&midi_in)));

        // Hot-plug detection
        let scan_running = Arc::new(AtomicBool::new(true));
        let scan_thread = {
            let state = Arc::clone(&state);
            let running = Arc::clone(&scan_running);
            thread::spawn(move || {
                while running.load(Ordering::Relaxed) {
                    thread::sleep(SCAN_INTERVAL);
                    if !running.load(Ordering::Relaxed) {
                        break;
                    }
                    match MidiInput::new(CLIENT_NAME) {
                        Ok(scanner) => {
                            let fresh = scan_ports(&scanner);
                            if let Ok(mut state) = state.lock() {
                                if state.port_names != fresh.port_names {
                                    log::debug!("MIDI devices changed: {:?}", fresh.port_names);
                                }
                                *state = fresh;
                            }
                        }
                        Err(e) => log::warn!("MIDI rescan failed: {}", e),
                    }
                }
            })
        };

        let mut engine = Self {
            devices: Vec::new(),
            connected_device: None,
            connection: None,
            producer: Arc::new(Mutex::new(producer)),
            state,
            scan_running,
            scan_thread: Some(scan_thread),
        };
        engine.enumerate_devices();
        log::info!("MIDI engine started with {} input(s)", engine.devices.len());

        Ok((engine, consumer))
    }

    /// Enumerate available MIDI input devices, reflecting hot-plugged ones.
    pub fn enumerate_devices(&mut self) -> Vec<MidiDeviceInfo> {
        if let Ok(state) = self.state.lock() {
            self.devices = state
                .port_names
                .iter()
                .enumerate()
                .map(|(index, name)| MidiDeviceInfo {
                    name: name.clone(),
                    index,
                })
                .collect();
        }
        self.devices.clone()
    }

    /// Get the cached device list without rescanning.
    pub fn devices(&self) -> &[MidiDeviceInfo] {
        &self.devices
    }

    /// Current index of the connected device in [`devices`](Self::devices).
    pub fn selected_device(&self) -> Option<usize> {
        let name = self.connected_device.as_deref()?;
        device_index(&self.devices, name)
    }

    /// Name of the connected device, if any.
    pub fn selected_device_name(&self) -> Option<&str> {
        self.connected_device.as_deref()
    }

    /// Connect to a MIDI device by index, replacing any current connection.
    pub fn connect(&mut self, device_index: usize) -> Result<(), MidiError> {
        self.disconnect();

        let (port, name) = {
            let state = self
                .state
                .lock()
                .map_err(|_| MidiError::Connection("device list lock poisoned".to_string()))?;
            let port = state
                .ports
                .get(device_index)
                .cloned()
                .ok_or_else(|| MidiError::DeviceNotFound(format!("index {}", device_index)))?;
            let name = state
                .port_names
                .get(device_index)
                .cloned()
                .unwrap_or_else(|| "Unknown".to_string());
            (port, name)
        };

        let midi_in = MidiInput::new(CLIENT_NAME).map_err(|e| MidiError::Init(e.to_string()))?;
        let producer = Arc::clone(&self.producer);
        let connection = midi_in
            .connect(
                &port,
                "module-patcher-input",
                move |timestamp_us, data, _| {
                    let Some(event) = MidiEvent::from_bytes(data) else {
                        return;
                    };
                    if let Ok(mut producer) = producer.lock() {
                        // Drop events when the UI falls behind
                        if producer
                            .push(TimestampedMidiEvent {
                                event,
                                timestamp_us,
                            })
                            .is_err()
                        {
                            log::warn!("MIDI buffer full, dropped {:?}", event);
                        }
                    }
                    log::trace!("MIDI: {:?}", event);
                },
                (),
            )
            .map_err(|e| MidiError::Connection(e.to_string()))?;

        log::info!("MIDI connected to device {}: {}", device_index, name);
        self.connection = Some(connection);
        self.connected_device = Some(name);
        Ok(())
    }

    /// Connect to the first device whose name starts with `prefix`.
    pub fn connect_by_name(&mut self, prefix: &str) -> Result<(), MidiError> {
        let index = self
            .enumerate_devices()
            .iter()
            .find(|d| d.name.starts_with(prefix))
            .map(|d| d.index)
            .ok_or_else(|| MidiError::DeviceNotFound(prefix.to_string()))?;
        self.connect(index)
    }

    /// Disconnect from the current MIDI device.
    pub fn disconnect(&mut self) {
        if let Some(connection) = self.connection.take() {
            connection.close();
            self.connected_device = None;
            log::info!("MIDI disconnected");
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }
}

/// Index of the device called `name` in `devices`.
fn device_index(devices: &[MidiDeviceInfo], name: &str) -> Option<usize> {
    devices.iter().find(|d| d.name == name).map(|d| d.index)
}

impl Drop for MidiEngine {
    fn drop(&mut self) {
        self.scan_running.store(false, Ordering::Relaxed);
        self.disconnect();
        if let Some(thread) = self.scan_thread.take() {
            let _ = thread.join();
        }
    }
}
