use core::cmp::{self, Ordering};

use crate::config::Config;
use crate::disk::{Access, Direction, DiskController, DriveId, DriveStatus, DISK_SIZE};
use crate::display::Frame;
use crate::error::{ConfigError, DecodeError, HostError};
use crate::event::{Event, EventQueue, KeyState};
use crate::instruction::{self, Decoded, Instruction};
use crate::memory::{AddressSpace, Storage, MEMORY_SIZE};
use crate::operand::{Address, Operand};
use crate::palette::Palette;
use crate::registers::{Register, Registers};
use crate::tracer::{NoopTracer, Tracer};

#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone)]
pub enum CpuState {
    Running,
    /// Blocked in `wait` until an event arrives.
    Waiting,
    /// Stopped by `halt` or an illegal instruction; only `reset` resumes.
    Halted,
}

/// Record of the illegal instruction that halted the machine.
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone)]
pub struct Fault {
    pub address: u16,
    pub error: DecodeError,
}

pub struct Emulator<SM, SD, T = NoopTracer> {
    tracer: T,
    config: Config,
    palette: Palette,
    memory: SM,
    frame: Frame,
    registers: Registers,
    instruction_pointer: u16,
    events: EventQueue,
    keys: KeyState,
    disks: DiskController<SD>,
    cycles: u64,
    time_to_refresh: u64,
    state: CpuState,
    fault: Option<Fault>,
}

impl<SM, SD> Emulator<SM, SD, NoopTracer>
where
    SM: Storage<MEMORY_SIZE> + Default,
    SD: Storage<DISK_SIZE> + Default,
{
    pub fn new() -> Self {
        Self::assemble(Default::default(), Default::default(), NoopTracer, Config::default())
    }

    pub fn with_config(config: Config) -> Result<Self, ConfigError> {
        Self::with_parts(Default::default(), Default::default(), NoopTracer, config)
    }
}

impl<SM, SD> Default for Emulator<SM, SD, NoopTracer>
where
    SM: Storage<MEMORY_SIZE> + Default,
    SD: Storage<DISK_SIZE> + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<SM, SD, T> Emulator<SM, SD, T>
where
    SM: Storage<MEMORY_SIZE>,
    SD: Storage<DISK_SIZE>,
    T: Tracer,
{
    pub fn with_parts(memory: SM, disks: [SD; 2], tracer: T, config: Config) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::assemble(memory, disks, tracer, config))
    }

    fn assemble(memory: SM, disks: [SD; 2], tracer: T, config: Config) -> Self {
        Emulator {
            tracer,
            palette: Palette::new(config.palette),
            memory,
            frame: Frame::blank(),
            registers: Registers::new(),
            instruction_pointer: 0,
            events: EventQueue::new(config.event_buffering),
            keys: KeyState::new(),
            disks: DiskController::new(disks, config.transfer_cycles()),
            cycles: 0,
            time_to_refresh: config.refresh_period(),
            state: CpuState::Running,
            fault: None,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn tracer(&self) -> &T {
        &self.tracer
    }

    /// The picture captured at the most recent refresh tick.
    pub fn screen(&self) -> &Frame {
        &self.frame
    }

    pub fn memory(&self) -> &[u8; MEMORY_SIZE] {
        self.memory.bytes()
    }

    pub fn memory_mut(&mut self) -> &mut [u8; MEMORY_SIZE] {
        self.memory.bytes_mut()
    }

    pub fn registers(&self) -> &Registers {
        &self.registers
    }

    pub fn registers_mut(&mut self) -> &mut Registers {
        &mut self.registers
    }

    pub fn instruction_pointer(&self) -> u16 {
        self.instruction_pointer
    }

    pub fn set_instruction_pointer(&mut self, address: u16) {
        self.instruction_pointer = address;
    }

    pub fn state(&self) -> CpuState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state != CpuState::Halted
    }

    pub fn fault(&self) -> Option<Fault> {
        self.fault
    }

    /// Total cycles since construction or the last reset.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// The image buffer of a drive. Available whether or not a disk is inserted.
    pub fn disk_image(&self, id: DriveId) -> &[u8; DISK_SIZE] {
        self.disks.image(id)
    }

    pub fn disk_image_mut(&mut self, id: DriveId) -> &mut [u8; DISK_SIZE] {
        self.disks.image_mut(id)
    }

    pub fn insert_disk(&mut self, id: DriveId, access: Access) -> Result<(), HostError> {
        self.disks.insert(id, access)
    }

    pub fn remove_disk(&mut self, id: DriveId) -> Result<(), HostError> {
        self.disks.remove(id)
    }

    pub fn drive_status(&self, id: DriveId) -> DriveStatus {
        self.disks.status(id)
    }

    /// Activity light, lit while busy and for half a nominal second afterwards.
    pub fn drive_active(&self, id: DriveId) -> bool {
        self.disks.status(id).is_active(self.config.activity_threshold())
    }

    /// Reports a key press. Returns whether an event was posted, which only
    /// happens if the key was not already held.
    pub fn key_down(&mut self, key: u16) -> bool {
        if !self.keys.press(key) {
            return false;
        }
        log::trace!("key {} down", key);
        self.events.push(Event::key_down(key));
        true
    }

    pub fn key_up(&mut self, key: u16) -> bool {
        if !self.keys.release(key) {
            return false;
        }
        log::trace!("key {} up", key);
        self.events.push(Event::key_up(key));
        true
    }

    pub fn key_held(&self, key: u16) -> bool {
        self.keys.is_pressed(key)
    }

    /// Whether an event is waiting to be picked up by `wait` or `poll`.
    pub fn event_pending(&self) -> bool {
        self.events.is_pending()
    }

    /// Restores power-on state, then boots from drive 0 if a disk is present.
    ///
    /// Transfers in flight are dropped, inserted disks and held keys are kept.
    pub fn reset(&mut self) {
        self.disks.cancel_all();
        for byte in self.memory.bytes_mut().iter_mut() {
            *byte = 0;
        }
        self.frame = Frame::blank();
        self.registers = Registers::new();
        self.instruction_pointer = 0;
        self.events.clear();
        self.cycles = 0;
        self.time_to_refresh = self.config.refresh_period();
        self.state = CpuState::Running;
        self.fault = None;
        if self.disks.boot(self.memory.bytes_mut()) {
            log::debug!("booted from drive 0");
        }
    }

    /// Advances the machine by exactly `cycles` cycles.
    ///
    /// Each executed instruction costs one cycle. While waiting or halted the
    /// clock skips ahead to the next refresh tick or disk completion.
    pub fn run(&mut self, cycles: u64) {
        let mut remaining = cycles;
        while remaining > 0 {
            if self.state == CpuState::Waiting {
                if let Some(event) = self.events.pop() {
                    self.deliver(event);
                    self.state = CpuState::Running;
                }
            }

            if self.state == CpuState::Running {
                self.advance_time(1);
                remaining -= 1;
                self.execute_next();
            } else {
                let span = cmp::min(remaining, self.cycles_until_timer());
                self.advance_time(span);
                remaining -= span;
            }
        }
    }

    pub fn cycle(&mut self) {
        self.run(1);
    }

    fn cycles_until_timer(&self) -> u64 {
        let disk = self.disks.cycles_until_completion().unwrap_or(u64::max_value());
        cmp::min(self.time_to_refresh, disk)
    }

    /// Must not step past the next timer, see `cycles_until_timer`.
    fn advance_time(&mut self, cycles: u64) {
        self.cycles = self.cycles.wrapping_add(cycles);
        self.time_to_refresh -= cycles;
        if self.time_to_refresh == 0 {
            self.time_to_refresh = self.config.refresh_period();
            self.frame.capture(self.memory.bytes());
            self.tracer.on_screen_refresh(&self.frame);
            self.events.push(Event::screen_refresh());
        }

        let finished = self.disks.elapse(cycles, self.memory.bytes_mut());
        for &id in finished.iter().flatten() {
            self.events.push(Event::disk_finished(id, Ok(())));
        }
    }

    fn deliver(&mut self, event: Event) {
        let (a, b) = event.registers();
        self.registers.a = a;
        self.registers.b = b;
        self.tracer.on_event(event);
    }

    fn execute_next(&mut self) {
        let address = self.instruction_pointer;
        self.tracer.register_values(self.registers);
        match instruction::decode(self.memory.bytes(), address) {
            Ok(Decoded { instruction, next }) => {
                self.tracer.on_instruction(address, instruction);
                self.instruction_pointer = next;
                self.execute(instruction);
            }
            Err(error) => {
                log::warn!("illegal instruction at {:#06x}: {} ({})", address, error, self.registers);
                self.tracer.on_fault(address, error);
                self.fault = Some(Fault { address, error });
                self.state = CpuState::Halted;
            }
        }
    }

    fn load(&self, address: u16) -> u8 {
        self.memory.bytes().load(address)
    }

    fn load_word(&self, address: u16) -> u16 {
        self.memory.bytes().load_word(address)
    }

    fn store(&mut self, address: u16, value: u8) {
        self.memory.bytes_mut().store(address, value);
    }

    fn store_word(&mut self, address: u16, value: u16) {
        self.memory.bytes_mut().store_word(address, value);
    }

    fn push_word(&mut self, value: u16) {
        self.store_word(self.registers.s, value);
        self.registers.s = self.registers.s.wrapping_sub(2);
    }

    fn pop_word(&mut self) -> u16 {
        self.registers.s = self.registers.s.wrapping_add(2);
        self.load_word(self.registers.s)
    }

    fn jump_if(&mut self, condition: bool, target: Operand) {
        if condition {
            self.instruction_pointer = self.eval(target);
        }
    }

    fn execute(&mut self, instruction: Instruction) {
        match instruction {
            Instruction::Nop => {}
            Instruction::Ret => self.instruction_pointer = self.pop_word(),
            Instruction::Wait => match self.events.pop() {
                Some(event) => self.deliver(event),
                None => self.state = CpuState::Waiting,
            },
            Instruction::Poll => match self.events.pop() {
                Some(event) => self.deliver(event),
                None => {
                    self.registers.a = 0;
                    self.registers.b = 0;
                }
            },
            Instruction::Halt => self.state = CpuState::Halted,
            Instruction::Not(a) => self.registers.set(a, !self.eval(a)),
            Instruction::Neg(a) => self.registers.set(a, self.eval(a).wrapping_neg()),
            Instruction::Pop(a) => {
                let value = self.pop_word();
                self.registers.set(a, value);
            }
            Instruction::Push(a) => self.push_word(self.eval(a)),
            Instruction::Jmp(a) => self.instruction_pointer = self.eval(a),
            Instruction::Call(a) => {
                let target = self.eval(a);
                self.push_word(self.instruction_pointer);
                self.instruction_pointer = target;
            }
            Instruction::Mov(a, b) => self.registers.set(a, self.eval(b)),
            Instruction::Add(a, b) => self.registers.set(a, self.eval(a).wrapping_add(self.eval(b))),
            Instruction::Sub(a, b) => self.registers.set(a, self.eval(a).wrapping_sub(self.eval(b))),
            Instruction::Xor(a, b) => self.registers.set(a, self.eval(a) ^ self.eval(b)),
            Instruction::And(a, b) => self.registers.set(a, self.eval(a) & self.eval(b)),
            Instruction::Or(a, b) => self.registers.set(a, self.eval(a) | self.eval(b)),
            Instruction::Shl(a, b) => {
                let shifted = self.eval(a).checked_shl(u32::from(self.eval(b))).unwrap_or(0);
                self.registers.set(a, shifted);
            }
            Instruction::Shr(a, b) => {
                let shifted = self.eval(a).checked_shr(u32::from(self.eval(b))).unwrap_or(0);
                self.registers.set(a, shifted);
            }
            Instruction::Cmp(a, b) => {
                // both sides are compared as two's complement
                let ordering = (self.eval(a) as i16).cmp(&(self.eval(b) as i16));
                self.registers.set(a, match ordering {
                    Ordering::Greater => 1,
                    Ordering::Equal => 0,
                    Ordering::Less => 0xffff,
                });
            }
            Instruction::Load(a, b) => {
                let address = self.eval(b);
                let value = u16::from(self.load(address));
                self.tracer.on_load(address, value, false);
                self.registers.set(a, value);
            }
            Instruction::Loadw(a, b) => {
                let address = self.eval(b);
                let value = self.load_word(address);
                self.tracer.on_load(address, value, true);
                self.registers.set(a, value);
            }
            Instruction::Store(a, b) => {
                let address = self.eval(b);
                let [value, _] = self.eval(a).to_le_bytes();
                self.tracer.on_store(address, u16::from(value), false);
                self.store(address, value);
            }
            Instruction::Storew(a, b) => {
                let address = self.eval(b);
                let value = self.eval(a);
                self.tracer.on_store(address, value, true);
                self.store_word(address, value);
            }
            Instruction::Jez(a, d) => self.jump_if(self.eval(a) == 0, d),
            Instruction::Jnz(a, d) => self.jump_if(self.eval(a) != 0, d),
            Instruction::Jl(a, d) => self.jump_if(self.eval(a) == 0xffff, d),
            Instruction::Jg(a, d) => self.jump_if(self.eval(a) == 1, d),
            Instruction::Jle(a, d) => self.jump_if(self.eval(a) != 1, d),
            Instruction::Jge(a, d) => self.jump_if(self.eval(a) != 0xffff, d),
            Instruction::Read(drive, memory, sector) => self.start_transfer(drive, Direction::Read, memory, sector),
            Instruction::Write(drive, memory, sector) => self.start_transfer(drive, Direction::Write, memory, sector),
        }
    }

    /// Rejections are reported right away through the event channel.
    fn start_transfer(&mut self, drive: DriveId, direction: Direction, memory: Operand, sector: Operand) {
        let memory_address = self.eval(memory);
        let disk_address = self.eval(sector);
        match self.disks.start(drive, direction, memory_address, disk_address) {
            Ok(()) => log::debug!(
                "{:?} started {:?} of memory {:#06x}, sector {:#06x}",
                drive,
                direction,
                memory_address,
                disk_address,
            ),
            Err(error) => {
                log::debug!("{:?} rejected {:?}: {}", drive, direction, error);
                self.events.push(Event::disk_finished(drive, Err(error)));
            }
        }
    }
}

trait Eval<T> {
    fn eval(&self, expr: T) -> u16;
}

impl<SM, SD, T> Eval<Register> for Emulator<SM, SD, T> {
    fn eval(&self, register: Register) -> u16 {
        self.registers.get(register)
    }
}

impl<SM, SD, T> Eval<Operand> for Emulator<SM, SD, T> {
    fn eval(&self, operand: Operand) -> u16 {
        match operand {
            Operand::Register(r) => self.eval(r),
            Operand::Word(w) => w,
        }
    }
}

impl<SM, SD, T> Eval<Address> for Emulator<SM, SD, T> {
    fn eval(&self, address: Address) -> u16 {
        self.eval(address.operand).wrapping_add(address.offset)
    }
}
