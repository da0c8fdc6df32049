use crate::disk::DriveId;
use thiserror::Error;

/// Why an instruction could not be decoded.
#[derive(Error, Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum DecodeError {
    #[error("invalid opcode {0:#04x}")]
    InvalidOpcode(u8),
    #[error("opcode {opcode:#04x} needs a register, got operand code {code}")]
    InvalidRegister { opcode: u8, code: u8 },
}

/// Disk request failure, reported to the guest as a `diskN-finished` payload.
#[derive(Error, Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum DiskError {
    #[error("disk not present")]
    NotPresent,
    #[error("disk busy")]
    Busy,
    #[error("disk not writeable")]
    NotWriteable,
}

impl DiskError {
    pub fn code(self) -> u16 {
        match self {
            DiskError::NotPresent => 1,
            DiskError::Busy => 2,
            DiskError::NotWriteable => 3,
        }
    }
}

/// Host misuse of the emulator API. Never visible to the guest.
#[derive(Error, Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum HostError {
    #[error("invalid drive index {0}")]
    InvalidDrive(u32),
    #[error("drive {0:?} has a transfer in flight")]
    DriveBusy(DriveId),
    #[error("key code {0} does not fit in 16 bits")]
    InvalidKeyCode(u32),
}

impl HostError {
    /// Non-zero status code for hosts that only see integers.
    pub fn code(self) -> u32 {
        match self {
            HostError::InvalidDrive(_) => 1,
            HostError::DriveBusy(_) => 2,
            HostError::InvalidKeyCode(_) => 3,
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq, Clone, Copy)]
pub enum ConfigError {
    #[error("clock rate must be non-zero")]
    ZeroClock,
    #[error("refresh rate must be non-zero")]
    ZeroRefreshRate,
    #[error("refresh rate {refresh_hz} Hz is faster than the {clock_hz} Hz clock")]
    RefreshFasterThanClock { refresh_hz: u64, clock_hz: u64 },
    #[error("disk transfers need at least one cycle per byte")]
    ZeroDiskSpeed,
    #[error("event queue capacity must be between 1 and {max}, got {capacity}")]
    QueueCapacity { capacity: usize, max: usize },
}
