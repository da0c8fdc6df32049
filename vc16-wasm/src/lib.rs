//! Host-facing layer of the emulator.
//!
//! [`Runtime`] carries every operation the page calls, with typed errors. On
//! `wasm32` the `exports` module wraps it in `extern "C"` functions that
//! report errors as integer status codes.

use core::cmp;
use core::convert::TryFrom;

use vc16::{
    Access, Config, ConfigError, DiskImage, DriveId, DriveStatus, Emulator, HostError, Memory, SCREEN_HEIGHT,
    SCREEN_WIDTH,
};

#[cfg(target_arch = "wasm32")]
mod exports;
mod logger;

pub use logger::{format_record, HostLogger};

pub type HostEmulator = Emulator<Memory, DiskImage>;

pub struct Runtime {
    emulator: HostEmulator,
    /// `r, g, b` triples for all 256 palette indices.
    palette: Vec<u8>,
}

impl Runtime {
    pub fn new() -> Self {
        Self::from_emulator(Emulator::new())
    }

    pub fn with_config(config: Config) -> Result<Self, ConfigError> {
        Ok(Self::from_emulator(Emulator::with_config(config)?))
    }

    fn from_emulator(emulator: HostEmulator) -> Self {
        let mut palette = Vec::with_capacity(3 * 256);
        for color in emulator.palette().colors().iter() {
            palette.extend_from_slice(&[color.r, color.g, color.b]);
        }
        Runtime { emulator, palette }
    }

    pub fn emulator(&self) -> &HostEmulator {
        &self.emulator
    }

    pub fn emulator_mut(&mut self) -> &mut HostEmulator {
        &mut self.emulator
    }

    pub fn run(&mut self, cycles: u32) {
        self.emulator.run(cycles.into());
    }

    pub fn reset(&mut self) {
        self.emulator.reset();
    }

    pub fn key_down(&mut self, code: u32) -> Result<bool, HostError> {
        let key = key_code(code)?;
        Ok(self.emulator.key_down(key))
    }

    pub fn key_up(&mut self, code: u32) -> Result<bool, HostError> {
        let key = key_code(code)?;
        Ok(self.emulator.key_up(key))
    }

    /// Palette indices of the last refreshed frame, row by row.
    pub fn screen_buffer(&self) -> *const u8 {
        self.emulator.screen().as_ptr()
    }

    pub fn screen_width() -> u32 {
        SCREEN_WIDTH as u32
    }

    pub fn screen_height() -> u32 {
        SCREEN_HEIGHT as u32
    }

    pub fn palette(&self) -> &[u8] {
        &self.palette
    }

    pub fn palette_buffer(&self) -> *const u8 {
        self.palette.as_ptr()
    }

    /// The host fills the image through this pointer before inserting it.
    pub fn disk_buffer(&mut self, index: u32) -> Result<*mut u8, HostError> {
        let id = DriveId::try_from(index)?;
        Ok(self.emulator.disk_image_mut(id).as_mut_ptr())
    }

    pub fn insert_disk(&mut self, index: u32) -> Result<(), HostError> {
        self.emulator.insert_disk(DriveId::try_from(index)?, Access::ReadWrite)
    }

    pub fn insert_read_only_disk(&mut self, index: u32) -> Result<(), HostError> {
        self.emulator.insert_disk(DriveId::try_from(index)?, Access::ReadOnly)
    }

    pub fn remove_disk(&mut self, index: u32) -> Result<(), HostError> {
        self.emulator.remove_disk(DriveId::try_from(index)?)
    }

    pub fn disk_stats(&self, index: u32) -> Result<DiskStats, HostError> {
        let id = DriveId::try_from(index)?;
        Ok(DiskStats::from(self.emulator.drive_status(id)))
    }

    /// Idle cycles after which the page should turn a drive light off.
    pub fn activity_threshold(&self) -> u32 {
        let threshold = self.emulator.config().activity_threshold();
        u32::try_from(threshold).unwrap_or(u32::max_value())
    }

    pub fn is_running(&self) -> bool {
        self.emulator.is_running()
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Runtime::new()
    }
}

fn key_code(code: u32) -> Result<u16, HostError> {
    u16::try_from(code).map_err(|_| HostError::InvalidKeyCode(code))
}

/// Drive state as the page sees it, packed into one integer by [`as_bits`].
///
/// [`as_bits`]: DiskStats::as_bits
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct DiskStats {
    pub present: bool,
    pub modified: bool,
    pub writeable: bool,
    pub idle_time: u64,
}

impl DiskStats {
    /// Returned instead of stats for a drive index that does not exist.
    /// The top bit is never set in a packed value.
    pub const INVALID: u32 = u32::max_value();
    const MAX_IDLE_TIME: u32 = (1 << 28) - 1;
    /// Bits below the idle time field.
    pub const IDLE_TIME_SHIFT: u32 = 3;

    /// `present | modified << 1 | writeable << 2 | idle_time << 3`, with the
    /// idle time capped at `2^28 - 1`.
    pub fn as_bits(&self) -> u32 {
        let idle_time = cmp::min(self.idle_time, u64::from(Self::MAX_IDLE_TIME)) as u32;
        (idle_time << Self::IDLE_TIME_SHIFT)
            | (u32::from(self.writeable) << 2)
            | (u32::from(self.modified) << 1)
            | u32::from(self.present)
    }
}

impl From<DriveStatus> for DiskStats {
    fn from(status: DriveStatus) -> Self {
        DiskStats {
            present: status.present,
            modified: status.modified,
            writeable: status.writeable,
            idle_time: if status.present { status.idle_time } else { 0 },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vc16::{CpuState, PaletteVariant, DISK_SIZE};

    #[test]
    fn packs_disk_stats() {
        let stats = |present, modified, writeable, idle_time| {
            DiskStats { present, modified, writeable, idle_time }.as_bits()
        };
        assert_eq!(stats(false, false, false, 0), 0);
        assert_eq!(stats(true, false, false, 0), 1);
        assert_eq!(stats(true, false, true, 0), 0b101);
        assert_eq!(stats(true, true, false, 5), 0b101011);
        assert_eq!(stats(true, true, true, u64::max_value()), (1 << 31) - 1);
        assert_ne!(stats(true, true, true, u64::max_value()), DiskStats::INVALID);
    }

    #[test]
    fn rejects_invalid_indices() {
        let mut runtime = Runtime::new();
        assert_eq!(runtime.disk_stats(2), Err(HostError::InvalidDrive(2)));
        assert_eq!(runtime.insert_disk(7), Err(HostError::InvalidDrive(7)));
        assert_eq!(runtime.remove_disk(u32::max_value()), Err(HostError::InvalidDrive(u32::max_value())));
        assert!(runtime.disk_buffer(2).is_err());
        assert_eq!(runtime.key_down(0x1_0000), Err(HostError::InvalidKeyCode(0x1_0000)));
        assert_eq!(runtime.key_up(0xffff), Ok(false));
    }

    #[test]
    fn boots_disk_written_through_buffer() {
        let mut runtime = Runtime::new();
        let program = [
            0x80, 0x0d, 0x42, // mov a, 0x42
            0x04, // halt
        ];
        let buffer = runtime.disk_buffer(0).unwrap();
        let image = unsafe { std::slice::from_raw_parts_mut(buffer, DISK_SIZE) };
        image[..program.len()].copy_from_slice(&program);

        runtime.insert_read_only_disk(0).unwrap();
        runtime.reset();
        runtime.run(100);
        assert!(!runtime.is_running());
        assert_eq!(runtime.emulator().registers().a, 0x42);
        assert_eq!(runtime.emulator().state(), CpuState::Halted);

        let stats = runtime.disk_stats(0).unwrap();
        assert!(stats.present);
        assert!(!stats.modified);
        assert!(!stats.writeable);
        assert_eq!(stats.idle_time, 100);
        assert_eq!(runtime.disk_stats(1).unwrap().as_bits(), 0);
    }

    #[test]
    fn screen_buffer_shows_last_frame() {
        let mut runtime = Runtime::with_config(Config {
            clock_hz: 600,
            ..Config::default()
        })
        .unwrap();
        runtime.emulator_mut().memory_mut()[..2].copy_from_slice(&[0x5d, 0x00]); // jmp 0
        runtime.emulator_mut().memory_mut()[0xc000 + 64 * 47 + 63] = 0xab;
        runtime.run(10);

        let len = (Runtime::screen_width() * Runtime::screen_height()) as usize;
        let screen = unsafe { std::slice::from_raw_parts(runtime.screen_buffer(), len) };
        assert_eq!(screen[len - 1], 0xab);
        assert!(screen[..len - 1].iter().all(|&p| p == 0));
    }

    #[test]
    fn palette_buffer_has_rgb_triples() {
        let runtime = Runtime::with_config(Config {
            palette: PaletteVariant::Rgb332,
            ..Config::default()
        })
        .unwrap();
        let palette = runtime.palette();
        assert_eq!(palette.len(), 256 * 3);
        assert_eq!(&palette[..3], &[0, 0, 0]);
        assert_eq!(&palette[255 * 3..], &[255, 255, 255]);
        let color = runtime.emulator().palette().color(0b111_000_00);
        assert_eq!(&palette[0b111_000_00 * 3..][..3], &[color.r, color.g, color.b]);
    }

    #[test]
    fn busy_drive_cannot_be_removed() {
        let mut runtime = Runtime::new();
        runtime.insert_disk(1).unwrap();
        runtime.emulator_mut().memory_mut()[..3].copy_from_slice(&[
            0xf1, 0xd8, 0x40, // read1 0x40, 0
        ]);
        runtime.run(1);
        assert_eq!(runtime.remove_disk(1), Err(HostError::DriveBusy(DriveId::D1)));
        assert_eq!(runtime.insert_disk(1), Err(HostError::DriveBusy(DriveId::D1)));
        assert_eq!(HostError::DriveBusy(DriveId::D1).code(), 2);
    }

    #[test]
    fn drive_reads_active_during_transfer() {
        let mut runtime = Runtime::new();
        runtime.insert_disk(0).unwrap();
        let idle = |runtime: &Runtime| runtime.disk_stats(0).unwrap().as_bits() >> DiskStats::IDLE_TIME_SHIFT;
        assert!(idle(&runtime) >= runtime.activity_threshold());

        runtime.emulator_mut().memory_mut()[..6].copy_from_slice(&[
            0xf0, 0xd8, 0x40, // read0 0x40, 0
            0x02, // wait
            0x5d, 0x03, // jmp 3
        ]);
        runtime.run(1000);
        assert!(runtime.emulator().drive_status(DriveId::D0).busy);
        assert_eq!(idle(&runtime), 0);
        assert!(idle(&runtime) < runtime.activity_threshold());

        // still lit for a while after the transfer completes
        runtime.run(131_072);
        assert!(!runtime.emulator().drive_status(DriveId::D0).busy);
        let after = idle(&runtime);
        assert!(after > 0 && after < runtime.activity_threshold());
    }

    #[test]
    fn read_only_disk_reports_write_protect() {
        let mut runtime = Runtime::new();
        runtime.insert_disk(0).unwrap();
        runtime.insert_read_only_disk(1).unwrap();
        assert_eq!(runtime.disk_stats(0).unwrap().as_bits() & 0b111, 0b101);
        assert_eq!(runtime.disk_stats(1).unwrap().as_bits() & 0b111, 0b001);
    }

    #[test]
    fn activity_threshold_is_half_a_second() {
        assert_eq!(Runtime::new().activity_threshold(), 2_359_296);
    }
}
