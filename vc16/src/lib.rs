//! Emulator for a small 16-bit computer.
//!
//! The machine has eight 16-bit registers, 64 KiB of little-endian memory, a
//! 64x48 framebuffer mapped at `0xc000`, two 1 MiB disk drives that transfer
//! 4 KiB blocks asynchronously, and a pending-event slot fed by the keyboard,
//! the screen refresh tick and the disk drives.
//!
//! The crate is `no_std` unless the `std` feature is enabled, in which case
//! heap-backed storage is available as [`HeapBuffer`].
#![cfg_attr(all(not(test), not(feature = "std")), no_std)]

mod config;
mod disk;
mod display;
mod emulator;
mod error;
mod event;
mod instruction;
mod memory;
mod operand;
mod palette;
mod registers;
mod tracer;


pub use config::{Config, DISK_CYCLES_PER_BYTE, NOMINAL_CLOCK_HZ, REFRESH_HZ};
pub use disk::{Access, Direction, DriveId, DriveStatus, DISK_ADDRESS_UNIT, DISK_SIZE, TRANSFER_SIZE};
pub use display::{Frame, SCREEN_ADDRESS, SCREEN_HEIGHT, SCREEN_WIDTH};
pub use emulator::{CpuState, Emulator, Fault};
pub use error::{ConfigError, DecodeError, DiskError, HostError};
pub use event::{Event, EventBuffering, EventKind, MAX_QUEUE_CAPACITY};
pub use instruction::{decode, Decoded, Instruction};
pub use memory::{AddressSpace, Storage, MEMORY_SIZE};
pub use operand::{Address, Operand};
pub use palette::{Palette, PaletteVariant, Rgb};
pub use registers::{Register, Registers};
pub use tracer::{NoopTracer, Tracer};

#[cfg(any(test, feature = "std"))]
pub use memory::HeapBuffer;

/// Heap-backed main memory.
#[cfg(any(test, feature = "std"))]
pub type Memory = HeapBuffer<MEMORY_SIZE>;

/// Heap-backed disk image.
#[cfg(any(test, feature = "std"))]
pub type DiskImage = HeapBuffer<DISK_SIZE>;
