//! Host registers consulted by the heap
//!
//! The heap base (HR), high-water mark (HP) and fault register (FR)
//! belong to the host VM. They are read and written through
//! [`Registers`], addressed relative to the same buffer as the heap.

use bitflags::bitflags;

use crate::error::Fault;

use super::codec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    /// Heap region base offset
    HeapBase,
    /// Heap high-water mark, entries below it are live
    HeapPointer,
    /// Fault register, non-zero once the script has faulted
    Fault,
}

/// Register accessors supplied by the host
pub trait Registers {
    fn get(&self, buffer: &[u8], register: Register) -> i32;

    fn set(&self, buffer: &mut [u8], register: Register, value: i32);
}

/// Size of the register block at the start of script memory in the
/// default layout
pub const REGISTER_BLOCK_SIZE: usize = 12;

/// Registers stored as big-endian words at fixed buffer offsets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferRegisters {
    pub heap_base: usize,
    pub heap_pointer: usize,
    pub fault: usize,
}

impl Default for BufferRegisters {
    fn default() -> Self {
        BufferRegisters {
            heap_base: 0,
            heap_pointer: 4,
            fault: 8,
        }
    }
}

impl BufferRegisters {
    fn address(&self, register: Register) -> usize {
        match register {
            Register::HeapBase => self.heap_base,
            Register::HeapPointer => self.heap_pointer,
            Register::Fault => self.fault,
        }
    }
}

impl Registers for BufferRegisters {
    /// Registers outside the buffer read as zero
    fn get(&self, buffer: &[u8], register: Register) -> i32 {
        let mut offset = self.address(register);
        codec::read_i32(buffer, &mut offset).unwrap_or(0)
    }

    fn set(&self, buffer: &mut [u8], register: Register, value: i32) {
        let mut offset = self.address(register);
        if codec::write_i32(buffer, &mut offset, value).is_err() {
            log::error!("register {:?} lies outside script memory", register);
        }
    }
}

bitflags! {
    /// Bits recorded in the fault register
    pub struct FaultBits: i32 {
        const BOUND_CHECK_ERROR = 0x0001;
        const HEAP_ERROR = 0x0002;
        const STACK_HEAP_COLLISION = 0x0004;
        const NESTING_LISTS = 0x0008;
    }
}

impl From<&Fault> for FaultBits {
    fn from(fault: &Fault) -> Self {
        match fault {
            Fault::BoundCheck(_) => FaultBits::BOUND_CHECK_ERROR,
            Fault::StackHeapCollision(_) => FaultBits::STACK_HEAP_COLLISION,
            Fault::Heap(_) => FaultBits::HEAP_ERROR,
            Fault::NestingLists => FaultBits::NESTING_LISTS,
        }
    }
}

impl FaultBits {
    /// Whether this fault leaves the high-water mark untrustworthy
    pub fn resets_heap_pointer(self) -> bool {
        self.intersects(
            FaultBits::BOUND_CHECK_ERROR | FaultBits::HEAP_ERROR | FaultBits::STACK_HEAP_COLLISION,
        )
    }
}

/// Whether the heap is usable
///
/// A heap is poisoned by its first fault and stays that way for the
/// rest of the buffer's life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeapState {
    Live,
    /// Holds the fault register bits. Faults raised by the host
    /// itself are kept even if they are not heap faults.
    Poisoned(FaultBits),
}

impl HeapState {
    pub fn from_register(fr: i32) -> Self {
        if fr == 0 {
            HeapState::Live
        } else {
            HeapState::Poisoned(FaultBits::from_bits_truncate(fr))
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, HeapState::Live)
    }
}
