//! Memory-mapped framebuffer.

use crate::memory::{AddressSpace, MEMORY_SIZE};

pub const SCREEN_WIDTH: usize = 64;
pub const SCREEN_HEIGHT: usize = 48;
/// First byte of the framebuffer; pixels are stored row by row.
pub const SCREEN_ADDRESS: u16 = 0b1100_0000_0000_0000;

/// One complete picture, copied out of memory on every refresh tick.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    pixels: [[u8; SCREEN_WIDTH]; SCREEN_HEIGHT],
}

impl Frame {
    pub const fn blank() -> Self {
        Frame {
            pixels: [[0; SCREEN_WIDTH]; SCREEN_HEIGHT],
        }
    }

    /// Palette index of the pixel at column `x`, row `y`.
    pub fn pixel(&self, x: usize, y: usize) -> u8 {
        self.pixels[y][x]
    }

    pub fn rows(&self) -> &[[u8; SCREEN_WIDTH]; SCREEN_HEIGHT] {
        &self.pixels
    }

    /// Start of the `SCREEN_WIDTH * SCREEN_HEIGHT` contiguous pixel bytes.
    pub fn as_ptr(&self) -> *const u8 {
        self.pixels.as_ptr() as *const u8
    }

    pub(crate) fn capture(&mut self, memory: &[u8; MEMORY_SIZE]) {
        let mut address = SCREEN_ADDRESS;
        for row in self.pixels.iter_mut() {
            memory.read_block(address, row);
            address = address.wrapping_add(SCREEN_WIDTH as u16);
        }
    }
}

impl Default for Frame {
    fn default() -> Self {
        Frame::blank()
    }
}
