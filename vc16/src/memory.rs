//! Byte storage for main memory and disk images.
//!
//! Main memory is 64 KiB and byte addressed. Words are little-endian: the low
//! byte lives at the lower address, the same order used for two-byte immediates
//! in the instruction stream. Address arithmetic wraps at 64 KiB.

pub const MEMORY_SIZE: usize = 1 << 16;

/// Owner of a fixed-size byte buffer.
///
/// The emulator is generic over this so that hosts can decide where the large
/// buffers live (heap, static memory, or a page they grew themselves).
pub trait Storage<const N: usize> {
    fn bytes(&self) -> &[u8; N];
    fn bytes_mut(&mut self) -> &mut [u8; N];
}

impl<const N: usize> Storage<N> for [u8; N] {
    fn bytes(&self) -> &[u8; N] { self }
    fn bytes_mut(&mut self) -> &mut [u8; N] { self }
}

#[cfg(any(test, feature = "std"))]
mod heap {
    use super::Storage;
    use core::convert::TryFrom;

    /// Zero-initialized buffer allocated directly on the heap.
    pub struct HeapBuffer<const N: usize> {
        bytes: Box<[u8; N]>,
    }

    impl<const N: usize> Default for HeapBuffer<N> {
        fn default() -> Self {
            // going through a Vec keeps the array off the stack
            let slice = vec![0u8; N].into_boxed_slice();
            let bytes = Box::<[u8; N]>::try_from(slice)
                .unwrap_or_else(|_| unreachable!("vec was allocated with length {}", N));
            HeapBuffer { bytes }
        }
    }

    impl<const N: usize> Storage<N> for HeapBuffer<N> {
        fn bytes(&self) -> &[u8; N] { &self.bytes }
        fn bytes_mut(&mut self) -> &mut [u8; N] { &mut self.bytes }
    }
}

#[cfg(any(test, feature = "std"))]
pub use heap::HeapBuffer;

/// Wrapping byte and word access over the 64 KiB address space.
pub trait AddressSpace {
    fn load(&self, address: u16) -> u8;
    fn store(&mut self, address: u16, value: u8);

    fn load_word(&self, address: u16) -> u16 {
        let low = self.load(address);
        let high = self.load(address.wrapping_add(1));
        u16::from_le_bytes([low, high])
    }

    fn store_word(&mut self, address: u16, value: u16) {
        let [low, high] = value.to_le_bytes();
        self.store(address, low);
        self.store(address.wrapping_add(1), high);
    }

    fn read_block(&self, start: u16, out: &mut [u8]) {
        let mut address = start;
        for byte in out {
            *byte = self.load(address);
            address = address.wrapping_add(1);
        }
    }

    fn write_block(&mut self, start: u16, bytes: &[u8]) {
        let mut address = start;
        for &byte in bytes {
            self.store(address, byte);
            address = address.wrapping_add(1);
        }
    }
}

impl AddressSpace for [u8; MEMORY_SIZE] {
    // a u16 index can never be out of bounds here, so these compile without checks
    fn load(&self, address: u16) -> u8 {
        self[usize::from(address)]
    }

    fn store(&mut self, address: u16, value: u8) {
        self[usize::from(address)] = value;
    }
}
