use crate::display::Frame;
use crate::error::DecodeError;
use crate::event::Event;
use crate::instruction::Instruction;
use crate::registers::Registers;

/// Hooks for observing execution. All methods default to doing nothing.
pub trait Tracer {
    fn on_screen_refresh(&self, _frame: &Frame) {}
    fn register_values(&self, _values: Registers) {}
    fn on_instruction(&self, _address: u16, _instruction: Instruction) {}
    fn on_fault(&self, _address: u16, _error: DecodeError) {}
    fn on_event(&self, _event: Event) {}
    fn on_load(&self, _address: u16, _value: u16, _wide: bool) {}
    fn on_store(&self, _address: u16, _value: u16, _wide: bool) {}
}

pub struct NoopTracer;

impl Tracer for NoopTracer {}
