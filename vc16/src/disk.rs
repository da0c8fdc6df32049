//! Two-drive disk controller with asynchronous 4 KiB block transfers.

use core::convert::TryFrom;

use crate::error::{DiskError, HostError};
use crate::memory::{AddressSpace, Storage, MEMORY_SIZE};

pub const DISK_SIZE: usize = 1 << 20;
/// Bytes moved by one `read` or `write` instruction.
pub const TRANSFER_SIZE: usize = 4096;
/// The disk operand addresses the image in units of this many bytes.
pub const DISK_ADDRESS_UNIT: usize = 16;

#[derive(PartialEq, Eq, Debug, Hash, Copy, Clone)]
pub enum DriveId {
    D0,
    D1,
}

impl DriveId {
    pub const ALL: [DriveId; 2] = [DriveId::D0, DriveId::D1];

    pub fn index(self) -> usize {
        match self {
            DriveId::D0 => 0,
            DriveId::D1 => 1,
        }
    }
}

macro_rules! drive_id_from {
    ($($num:ty),*) => {
        $(
            impl TryFrom<$num> for DriveId {
                type Error = HostError;

                fn try_from(from: $num) -> Result<Self, Self::Error> {
                    match from {
                        0 => Ok(DriveId::D0),
                        1 => Ok(DriveId::D1),
                        other => Err(HostError::InvalidDrive(u32::try_from(other).unwrap_or(u32::max_value()))),
                    }
                }
            }
        )*
    }
}

drive_id_from!(u8, u16, u32, u64, usize);

/// Whether the guest may write to an inserted disk.
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone)]
pub enum Access {
    ReadWrite,
    ReadOnly,
}

#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone)]
pub enum Direction {
    /// Disk to memory.
    Read,
    /// Memory to disk.
    Write,
}

struct Transfer {
    direction: Direction,
    memory_address: u16,
    disk_address: usize,
    remaining: u64,
}

struct Mounted {
    access: Access,
    modified: bool,
    idle_time: u64,
    transfer: Option<Transfer>,
}

struct Drive<S> {
    image: S,
    mounted: Option<Mounted>,
}

/// Snapshot of one drive, for the host.
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone)]
pub struct DriveStatus {
    pub present: bool,
    pub writeable: bool,
    pub busy: bool,
    pub modified: bool,
    /// Cycles since the drive last finished a transfer; zero while one is
    /// in flight.
    pub idle_time: u64,
}

impl DriveStatus {
    const ABSENT: DriveStatus = DriveStatus {
        present: false,
        writeable: false,
        busy: false,
        modified: false,
        idle_time: 0,
    };

    /// Activity light: stays lit for `threshold` cycles after a transfer.
    pub fn is_active(&self, threshold: u64) -> bool {
        self.present && (self.busy || self.idle_time < threshold)
    }
}

pub(crate) struct DiskController<S> {
    drives: [Drive<S>; 2],
    transfer_cycles: u64,
}

impl<S> DiskController<S>
where
    S: Storage<DISK_SIZE>,
{
    pub(crate) fn new(images: [S; 2], transfer_cycles: u64) -> Self {
        let [d0, d1] = images;
        DiskController {
            drives: [
                Drive { image: d0, mounted: None },
                Drive { image: d1, mounted: None },
            ],
            transfer_cycles,
        }
    }

    fn drive(&self, id: DriveId) -> &Drive<S> {
        &self.drives[id.index()]
    }

    fn drive_mut(&mut self, id: DriveId) -> &mut Drive<S> {
        &mut self.drives[id.index()]
    }

    pub(crate) fn image(&self, id: DriveId) -> &[u8; DISK_SIZE] {
        self.drive(id).image.bytes()
    }

    pub(crate) fn image_mut(&mut self, id: DriveId) -> &mut [u8; DISK_SIZE] {
        self.drive_mut(id).image.bytes_mut()
    }

    /// Binds the image buffer to the drive. Rebinding an idle drive clears its
    /// modified flag.
    pub(crate) fn insert(&mut self, id: DriveId, access: Access) -> Result<(), HostError> {
        let drive = self.drive_mut(id);
        if let Some(Mounted { transfer: Some(_), .. }) = drive.mounted {
            return Err(HostError::DriveBusy(id));
        }
        drive.mounted = Some(Mounted {
            access,
            modified: false,
            idle_time: u64::max_value(),
            transfer: None,
        });
        log::debug!("inserted {:?} disk into {:?}", access, id);
        Ok(())
    }

    pub(crate) fn remove(&mut self, id: DriveId) -> Result<(), HostError> {
        let drive = self.drive_mut(id);
        if let Some(Mounted { transfer: Some(_), .. }) = drive.mounted {
            return Err(HostError::DriveBusy(id));
        }
        if drive.mounted.take().is_some() {
            log::debug!("removed disk from {:?}", id);
        }
        Ok(())
    }

    pub(crate) fn status(&self, id: DriveId) -> DriveStatus {
        match &self.drive(id).mounted {
            None => DriveStatus::ABSENT,
            Some(mounted) => DriveStatus {
                present: true,
                writeable: mounted.access == Access::ReadWrite,
                busy: mounted.transfer.is_some(),
                modified: mounted.modified,
                idle_time: mounted.idle_time,
            },
        }
    }

    /// Validates and queues a transfer. A rejected request changes nothing.
    pub(crate) fn start(
        &mut self,
        id: DriveId,
        direction: Direction,
        memory_address: u16,
        disk_address: u16,
    ) -> Result<(), DiskError> {
        let transfer_cycles = self.transfer_cycles;
        let mounted = self.drive_mut(id).mounted.as_mut().ok_or(DiskError::NotPresent)?;
        if mounted.transfer.is_some() {
            return Err(DiskError::Busy);
        }
        if direction == Direction::Write && mounted.access == Access::ReadOnly {
            return Err(DiskError::NotWriteable);
        }
        mounted.transfer = Some(Transfer {
            direction,
            memory_address,
            disk_address: usize::from(disk_address) * DISK_ADDRESS_UNIT,
            remaining: transfer_cycles,
        });
        // held at zero until completion, so the drive reads as active
        mounted.idle_time = 0;
        Ok(())
    }

    /// Cycles until the earliest in-flight transfer completes.
    pub(crate) fn cycles_until_completion(&self) -> Option<u64> {
        self.drives
            .iter()
            .filter_map(|drive| drive.mounted.as_ref()?.transfer.as_ref())
            .map(|transfer| transfer.remaining)
            .min()
    }

    /// Advances every drive by `cycles`, which must not overshoot
    /// `cycles_until_completion`. Returns which drives finished.
    pub(crate) fn elapse(&mut self, cycles: u64, memory: &mut [u8; MEMORY_SIZE]) -> [Option<DriveId>; 2] {
        let mut finished = [None; 2];
        for (index, &id) in DriveId::ALL.iter().enumerate() {
            let drive = &mut self.drives[index];
            let mounted = match &mut drive.mounted {
                Some(mounted) => mounted,
                None => continue,
            };
            let transfer = match &mut mounted.transfer {
                Some(transfer) => transfer,
                None => {
                    mounted.idle_time = mounted.idle_time.saturating_add(cycles);
                    continue;
                }
            };
            debug_assert!(cycles <= transfer.remaining);
            transfer.remaining = transfer.remaining.saturating_sub(cycles);
            if transfer.remaining > 0 {
                continue;
            }
            copy_block(transfer, drive.image.bytes_mut(), memory);
            if transfer.direction == Direction::Write {
                mounted.modified = true;
            }
            log::debug!(
                "{:?} finished {:?} of memory {:#06x}, disk {:#07x}",
                id,
                transfer.direction,
                transfer.memory_address,
                transfer.disk_address,
            );
            mounted.transfer = None;
            mounted.idle_time = 0;
            finished[index] = Some(id);
        }
        finished
    }

    /// Drops in-flight transfers without performing them.
    pub(crate) fn cancel_all(&mut self) {
        for drive in &mut self.drives {
            if let Some(mounted) = &mut drive.mounted {
                mounted.transfer = None;
            }
        }
    }

    /// Loads the first block of drive 0 at address 0, if a disk is present.
    pub(crate) fn boot(&mut self, memory: &mut [u8; MEMORY_SIZE]) -> bool {
        let drive = &mut self.drives[DriveId::D0.index()];
        match &mut drive.mounted {
            Some(mounted) => {
                memory.write_block(0, &drive.image.bytes()[..TRANSFER_SIZE]);
                mounted.idle_time = 0;
                true
            }
            None => false,
        }
    }
}

fn copy_block(transfer: &Transfer, image: &mut [u8; DISK_SIZE], memory: &mut [u8; MEMORY_SIZE]) {
    let mut memory_address = transfer.memory_address;
    for offset in 0..TRANSFER_SIZE {
        let disk_address = (transfer.disk_address + offset) % DISK_SIZE;
        match transfer.direction {
            Direction::Read => memory.store(memory_address, image[disk_address]),
            Direction::Write => image[disk_address] = memory.load(memory_address),
        }
        memory_address = memory_address.wrapping_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::HeapBuffer;

    const CYCLES: u64 = 100;

    fn controller() -> DiskController<HeapBuffer<DISK_SIZE>> {
        DiskController::new(Default::default(), CYCLES)
    }

    fn memory() -> HeapBuffer<MEMORY_SIZE> {
        HeapBuffer::default()
    }

    #[test]
    fn drive_ids_from_integers() {
        assert_eq!(DriveId::try_from(0u32), Ok(DriveId::D0));
        assert_eq!(DriveId::try_from(1usize), Ok(DriveId::D1));
        assert_eq!(DriveId::try_from(2u8), Err(HostError::InvalidDrive(2)));
        assert_eq!(DriveId::try_from(u64::max_value()), Err(HostError::InvalidDrive(u32::max_value())));
    }

    #[test]
    fn validation_order() {
        let mut disks = controller();
        assert_eq!(disks.start(DriveId::D0, Direction::Write, 0, 0), Err(DiskError::NotPresent));
        disks.insert(DriveId::D0, Access::ReadOnly).unwrap();
        assert_eq!(disks.start(DriveId::D0, Direction::Write, 0, 0), Err(DiskError::NotWriteable));
        assert_eq!(disks.start(DriveId::D0, Direction::Read, 0, 0), Ok(()));
        // busy takes precedence over read-only
        assert_eq!(disks.start(DriveId::D0, Direction::Write, 0, 0), Err(DiskError::Busy));
        assert_eq!(disks.start(DriveId::D0, Direction::Read, 0, 0), Err(DiskError::Busy));
    }

    #[test]
    fn read_completes_after_transfer_time() {
        let mut disks = controller();
        let mut memory = memory();
        disks.image_mut(DriveId::D1)[0x120..0x120 + TRANSFER_SIZE].copy_from_slice(&[0x5a; TRANSFER_SIZE]);
        disks.insert(DriveId::D1, Access::ReadWrite).unwrap();
        disks.start(DriveId::D1, Direction::Read, 0x8000, 0x12).unwrap();
        assert_eq!(disks.cycles_until_completion(), Some(CYCLES));

        assert_eq!(disks.elapse(CYCLES - 1, memory.bytes_mut()), [None, None]);
        assert_eq!(memory.bytes()[0x8000], 0);
        assert!(disks.status(DriveId::D1).busy);

        assert_eq!(disks.elapse(1, memory.bytes_mut()), [None, Some(DriveId::D1)]);
        assert!(memory.bytes()[0x8000..0x9000].iter().all(|&b| b == 0x5a));
        assert_eq!(memory.bytes()[0x9000], 0);
        let status = disks.status(DriveId::D1);
        assert!(!status.busy);
        assert!(!status.modified);
        assert_eq!(status.idle_time, 0);
        assert_eq!(disks.cycles_until_completion(), None);
    }

    #[test]
    fn write_marks_modified_on_completion() {
        let mut disks = controller();
        let mut memory = memory();
        memory.bytes_mut()[0x10] = 0xaa;
        disks.insert(DriveId::D0, Access::ReadWrite).unwrap();
        disks.start(DriveId::D0, Direction::Write, 0x10, 1).unwrap();
        assert!(!disks.status(DriveId::D0).modified);
        disks.elapse(CYCLES, memory.bytes_mut());
        assert!(disks.status(DriveId::D0).modified);
        assert_eq!(disks.image(DriveId::D0)[16], 0xaa);
    }

    #[test]
    fn transfers_wrap_memory_and_disk() {
        let mut disks = controller();
        let mut memory = memory();
        memory.bytes_mut()[0xffff] = 1;
        memory.bytes_mut()[0x0000] = 2;
        disks.insert(DriveId::D0, Access::ReadWrite).unwrap();
        // disk address 0xffff * 16 = 0xffff0, so the block wraps to the start of the image
        disks.start(DriveId::D0, Direction::Write, 0xfff0, 0xffff).unwrap();
        disks.elapse(CYCLES, memory.bytes_mut());
        assert_eq!(disks.image(DriveId::D0)[0xfffff], 1);
        assert_eq!(disks.image(DriveId::D0)[0x00000], 2);
    }

    #[test]
    fn idle_time_counts_and_saturates() {
        let mut disks = controller();
        let mut memory = memory();
        disks.insert(DriveId::D0, Access::ReadWrite).unwrap();
        assert_eq!(disks.status(DriveId::D0).idle_time, u64::max_value());
        assert!(!disks.status(DriveId::D0).is_active(1000));

        disks.start(DriveId::D0, Direction::Read, 0, 0).unwrap();
        assert!(disks.status(DriveId::D0).is_active(1000));
        assert_eq!(disks.status(DriveId::D0).idle_time, 0);
        disks.elapse(CYCLES - 1, memory.bytes_mut());
        assert_eq!(disks.status(DriveId::D0).idle_time, 0);
        disks.elapse(1, memory.bytes_mut());
        disks.elapse(999, memory.bytes_mut());
        assert!(disks.status(DriveId::D0).is_active(1000));
        disks.elapse(1, memory.bytes_mut());
        assert_eq!(disks.status(DriveId::D0).idle_time, 1000);
        assert!(!disks.status(DriveId::D0).is_active(1000));
    }

    #[test]
    fn busy_drive_cannot_be_rebound() {
        let mut disks = controller();
        disks.insert(DriveId::D0, Access::ReadWrite).unwrap();
        disks.start(DriveId::D0, Direction::Read, 0, 0).unwrap();
        assert_eq!(disks.remove(DriveId::D0), Err(HostError::DriveBusy(DriveId::D0)));
        assert_eq!(disks.insert(DriveId::D0, Access::ReadOnly), Err(HostError::DriveBusy(DriveId::D0)));
        assert!(disks.status(DriveId::D0).busy);

        disks.cancel_all();
        assert_eq!(disks.remove(DriveId::D0), Ok(()));
        assert_eq!(disks.status(DriveId::D0), DriveStatus::ABSENT);
        assert_eq!(disks.remove(DriveId::D0), Ok(()));
    }

    #[test]
    fn boot_copies_first_block_of_drive_zero() {
        let mut disks = controller();
        let mut memory = memory();
        assert!(!disks.boot(memory.bytes_mut()));
        disks.image_mut(DriveId::D0)[..TRANSFER_SIZE + 1].copy_from_slice(&[7; TRANSFER_SIZE + 1]);
        disks.insert(DriveId::D0, Access::ReadOnly).unwrap();
        assert!(disks.boot(memory.bytes_mut()));
        assert!(memory.bytes()[..TRANSFER_SIZE].iter().all(|&b| b == 7));
        assert_eq!(memory.bytes()[TRANSFER_SIZE], 0);
        assert_eq!(disks.status(DriveId::D0).idle_time, 0);
    }
}
