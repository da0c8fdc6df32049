use crate::disk::TRANSFER_SIZE;
use crate::error::ConfigError;
use crate::event::{EventBuffering, MAX_QUEUE_CAPACITY};
use crate::palette::PaletteVariant;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 4.5 MiHz.
pub const NOMINAL_CLOCK_HZ: u64 = 4_718_592;
pub const REFRESH_HZ: u64 = 60;
pub const DISK_CYCLES_PER_BYTE: u64 = 32;

/// Machine parameters that are fixed for the lifetime of an emulator.
#[derive(Debug, PartialEq, Eq, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Config {
    /// Nominal cycles per second. Only used to derive the refresh period and
    /// the disk activity threshold; `run` itself is not throttled.
    pub clock_hz: u64,
    pub refresh_hz: u64,
    pub disk_cycles_per_byte: u64,
    pub event_buffering: EventBuffering,
    pub palette: PaletteVariant,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            clock_hz: NOMINAL_CLOCK_HZ,
            refresh_hz: REFRESH_HZ,
            disk_cycles_per_byte: DISK_CYCLES_PER_BYTE,
            event_buffering: EventBuffering::Latest,
            palette: PaletteVariant::Hsv,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.clock_hz == 0 {
            return Err(ConfigError::ZeroClock);
        }
        if self.refresh_hz == 0 {
            return Err(ConfigError::ZeroRefreshRate);
        }
        if self.refresh_hz > self.clock_hz {
            return Err(ConfigError::RefreshFasterThanClock {
                refresh_hz: self.refresh_hz,
                clock_hz: self.clock_hz,
            });
        }
        if self.disk_cycles_per_byte == 0 {
            return Err(ConfigError::ZeroDiskSpeed);
        }
        if let EventBuffering::Queue { capacity } = self.event_buffering {
            if capacity == 0 || capacity > MAX_QUEUE_CAPACITY {
                return Err(ConfigError::QueueCapacity {
                    capacity,
                    max: MAX_QUEUE_CAPACITY,
                });
            }
        }
        Ok(())
    }

    /// Cycles between screen refresh ticks.
    pub fn refresh_period(&self) -> u64 {
        self.clock_hz / self.refresh_hz
    }

    /// Cycles a single `read` or `write` keeps its drive busy.
    pub fn transfer_cycles(&self) -> u64 {
        self.disk_cycles_per_byte.saturating_mul(TRANSFER_SIZE as u64)
    }

    /// Idle cycles after which a drive's activity light goes dark.
    pub fn activity_threshold(&self) -> u64 {
        self.clock_hz / 2
    }
}
