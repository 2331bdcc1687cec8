//! The render gate: the only path to the LED device.
//!
//! The strip is a single shared resource. All render and reset calls go
//! through one `RenderGate`, which serializes device access behind a
//! mutex so two cycles can never interleave partial frames (visible as
//! flicker on the physical strip). A call arriving mid-write queues
//! behind the one in progress; nothing preempts.

use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{DeviceKind, LedConfig};
use crate::error::DeviceError;
use crate::model::Rgb;
use crate::sequence::LightEntry;

/// Channel packing order of the device's native pixel word. Fixed per
/// deployment: ws281x-family strips commonly want GRB, others RGB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelOrder {
    #[default]
    Rgb,
    Grb,
}

impl ChannelOrder {
    /// Pack a color triple into the device's 24-bit pixel word.
    pub fn pack(self, color: Rgb) -> u32 {
        let (first, second, third) = match self {
            ChannelOrder::Rgb => (color.r, color.g, color.b),
            ChannelOrder::Grb => (color.g, color.r, color.b),
        };
        (u32::from(first) << 16) | (u32::from(second) << 8) | u32::from(third)
    }
}

/// Low-level strip driver boundary. Implementations shift packed pixel
/// words onto the bus; everything above this trait is hardware-agnostic.
pub trait LedDevice: Send {
    fn write_frame(&mut self, frame: &[u32]) -> Result<(), DeviceError>;

    /// Drive a zero/blank frame.
    fn blank(&mut self) -> Result<(), DeviceError>;
}

/// Development device: logs frames instead of driving hardware.
#[derive(Debug)]
pub struct ConsoleDevice {
    count: usize,
}

impl ConsoleDevice {
    pub fn new(count: usize) -> Self {
        info!(count, "console LED device initialized");
        Self { count }
    }
}

impl LedDevice for ConsoleDevice {
    fn write_frame(&mut self, frame: &[u32]) -> Result<(), DeviceError> {
        let rendered: Vec<String> = frame.iter().map(|px| format!("{px:06x}")).collect();
        info!(pixels = self.count, frame = %rendered.join(","), "frame");
        Ok(())
    }

    fn blank(&mut self) -> Result<(), DeviceError> {
        info!(pixels = self.count, "blank");
        Ok(())
    }
}

/// Construct the configured device implementation.
pub fn device_from_config(config: &LedConfig) -> Result<Box<dyn LedDevice>, DeviceError> {
    let device: Box<dyn LedDevice> = match config.device {
        DeviceKind::Console => Box::new(ConsoleDevice::new(config.count)),
    };
    Ok(device)
}

/// Owns the device and serializes every write to it.
pub struct RenderGate {
    device: Mutex<Box<dyn LedDevice>>,
    count: usize,
    channel_order: ChannelOrder,
    fault_color: Rgb,
}

impl RenderGate {
    pub fn new(device: Box<dyn LedDevice>, config: &LedConfig, fault_color: Rgb) -> Self {
        Self {
            device: Mutex::new(device),
            count: config.count,
            channel_order: config.channel_order,
            fault_color,
        }
    }

    /// Pack and push one frame. Exactly one device write per call.
    ///
    /// Entries beyond the physical pixel count are ignored; a shorter
    /// sequence leaves the tail blank. The sequence builder always emits a
    /// full-length sequence, but the gate must not write past device
    /// bounds even when called incorrectly.
    pub fn render(&self, sequence: &[LightEntry]) -> Result<(), DeviceError> {
        let mut frame = vec![0u32; self.count];
        for (pixel, entry) in frame.iter_mut().zip(sequence) {
            *pixel = self.channel_order.pack(entry.color);
        }

        debug!(pixels = self.count, "rendering frame");
        self.lock_device().write_frame(&frame)
    }

    /// Blank the strip. Used on startup and before shutdown.
    pub fn reset(&self) -> Result<(), DeviceError> {
        self.lock_device().blank()
    }

    /// Render an all-fault frame: the visible "degraded" state used when a
    /// cycle cannot complete, so the strip never shows stale output.
    pub fn render_fault(&self) -> Result<(), DeviceError> {
        let frame = vec![self.channel_order.pack(self.fault_color); self.count];
        self.lock_device().write_frame(&frame)
    }

    fn lock_device(&self) -> std::sync::MutexGuard<'_, Box<dyn LedDevice>> {
        // A panic mid-write leaves no partial state worth protecting;
        // keep serving the strip.
        self.device.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LightMetadata;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn led_config(count: usize, channel_order: ChannelOrder) -> LedConfig {
        LedConfig {
            count,
            channel_order,
            device: DeviceKind::Console,
        }
    }

    fn entry(color: Rgb) -> LightEntry {
        LightEntry {
            color,
            metadata: Some(LightMetadata {
                icon: "icon".to_string(),
                name: "KSEA".to_string(),
            }),
        }
    }

    /// Records frames and checks that writes never overlap.
    struct RecordingDevice {
        frames: Arc<Mutex<Vec<Vec<u32>>>>,
        busy: Arc<AtomicBool>,
        overlaps: Arc<AtomicUsize>,
        write_delay: Duration,
    }

    impl LedDevice for RecordingDevice {
        fn write_frame(&mut self, frame: &[u32]) -> Result<(), DeviceError> {
            if self.busy.swap(true, Ordering::SeqCst) {
                self.overlaps.fetch_add(1, Ordering::SeqCst);
            }
            thread::sleep(self.write_delay);
            self.frames
                .lock()
                .expect("test mutex")
                .push(frame.to_vec());
            self.busy.store(false, Ordering::SeqCst);
            Ok(())
        }

        fn blank(&mut self) -> Result<(), DeviceError> {
            self.write_frame(&[])?;
            Ok(())
        }
    }

    fn recording_gate(
        count: usize,
        channel_order: ChannelOrder,
        write_delay: Duration,
    ) -> (RenderGate, Arc<Mutex<Vec<Vec<u32>>>>, Arc<AtomicUsize>) {
        let frames = Arc::new(Mutex::new(Vec::new()));
        let overlaps = Arc::new(AtomicUsize::new(0));
        let device = RecordingDevice {
            frames: Arc::clone(&frames),
            busy: Arc::new(AtomicBool::new(false)),
            overlaps: Arc::clone(&overlaps),
            write_delay,
        };
        let gate = RenderGate::new(
            Box::new(device),
            &led_config(count, channel_order),
            Rgb::new(255, 255, 0),
        );
        (gate, frames, overlaps)
    }

    #[test]
    fn packs_rgb_and_grb_orders() {
        let color = Rgb::new(0x12, 0x34, 0x56);
        assert_eq!(ChannelOrder::Rgb.pack(color), 0x0012_3456);
        assert_eq!(ChannelOrder::Grb.pack(color), 0x0034_1256);
    }

    #[test]
    fn render_issues_one_full_length_write() {
        let (gate, frames, _) = recording_gate(4, ChannelOrder::Rgb, Duration::ZERO);
        let sequence = vec![entry(Rgb::new(255, 0, 0)), entry(Rgb::new(0, 255, 0))];

        gate.render(&sequence).expect("render");

        let frames = frames.lock().expect("test mutex");
        assert_eq!(frames.len(), 1);
        // Short input leaves the tail blank; frame is still device-length.
        assert_eq!(frames[0], vec![0x00FF_0000, 0x0000_FF00, 0, 0]);
    }

    #[test]
    fn render_truncates_to_device_bounds() {
        let (gate, frames, _) = recording_gate(2, ChannelOrder::Rgb, Duration::ZERO);
        let sequence = vec![
            entry(Rgb::new(1, 0, 0)),
            entry(Rgb::new(2, 0, 0)),
            entry(Rgb::new(3, 0, 0)),
        ];

        gate.render(&sequence).expect("render");

        let frames = frames.lock().expect("test mutex");
        assert_eq!(frames[0].len(), 2);
        assert_eq!(frames[0], vec![0x0001_0000, 0x0002_0000]);
    }

    #[test]
    fn render_fault_fills_the_strip_with_the_fault_color() {
        let (gate, frames, _) = recording_gate(3, ChannelOrder::Grb, Duration::ZERO);

        gate.render_fault().expect("render fault");

        let frames = frames.lock().expect("test mutex");
        let fault = ChannelOrder::Grb.pack(Rgb::new(255, 255, 0));
        assert_eq!(frames[0], vec![fault; 3]);
    }

    #[test]
    fn concurrent_renders_never_overlap() {
        let (gate, frames, overlaps) =
            recording_gate(8, ChannelOrder::Rgb, Duration::from_millis(5));
        let gate = Arc::new(gate);

        let handles: Vec<_> = (0..8u8)
            .map(|i| {
                let gate = Arc::clone(&gate);
                thread::spawn(move || {
                    let sequence = vec![entry(Rgb::new(i, i, i)); 8];
                    if i % 4 == 0 {
                        gate.reset().expect("reset");
                    } else {
                        gate.render(&sequence).expect("render");
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().expect("thread");
        }

        assert_eq!(overlaps.load(Ordering::SeqCst), 0);
        assert_eq!(frames.lock().expect("test mutex").len(), 8);
    }
}
