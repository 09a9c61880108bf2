//! Owned script memory
//!
//! The host normally owns the buffer and hands the heap a borrow for
//! each call. `ScriptMemory` is a simple owner with the default
//! register layout for tools, tests and benchmarks.
use std::convert::TryFrom;
use std::fs;
use std::path::Path;

use super::{
    alloc::ScriptHeap,
    header::EntryHeader,
    registers::{BufferRegisters, Register, Registers, REGISTER_BLOCK_SIZE},
    settings::HeapSettings,
};
use crate::error::ConfigError;

#[derive(Debug, Clone)]
pub struct ScriptMemory {
    bytes: Vec<u8>,
    registers: BufferRegisters,
    heap_size: usize,
}

impl ScriptMemory {
    /// Allocate zeroed memory and create an empty heap in it
    pub fn new(settings: &HeapSettings) -> Result<Self, ConfigError> {
        settings.validate()?;

        let registers = BufferRegisters::default();
        let mut bytes = vec![0; settings.memory_size];
        let base = i32::try_from(settings.heap_base)
            .map_err(|_| ConfigError::HeapOverlapsRegisters(settings.heap_base))?;
        registers.set(&mut bytes, Register::HeapBase, base);
        registers.set(&mut bytes, Register::HeapPointer, base);
        registers.set(&mut bytes, Register::Fault, 0);

        let mut memory = ScriptMemory {
            bytes,
            registers,
            heap_size: settings.heap_size(),
        };

        if !memory.heap().create_heap() {
            return Err(ConfigError::MemoryTooSmall {
                memory: settings.memory_size,
                base: settings.heap_base,
                reserve: settings.stack_reserve,
            });
        }

        Ok(memory)
    }

    /// Adopt an existing memory image
    ///
    /// The heap base is taken from the image's own register block,
    /// only the stack reserve is used from `settings`.
    pub fn from_image(bytes: Vec<u8>, settings: &HeapSettings) -> Result<Self, ConfigError> {
        let registers = BufferRegisters::default();
        if bytes.len() < REGISTER_BLOCK_SIZE {
            return Err(ConfigError::MemoryTooSmall {
                memory: bytes.len(),
                base: 0,
                reserve: settings.stack_reserve,
            });
        }

        let hr = registers.get(&bytes, Register::HeapBase);
        let base = usize::try_from(hr)
            .ok()
            .filter(|base| {
                *base >= REGISTER_BLOCK_SIZE && base + EntryHeader::SIZE <= bytes.len()
            })
            .ok_or(ConfigError::BadHeapBase(hr))?;

        let heap_size = bytes
            .len()
            .saturating_sub(base)
            .saturating_sub(settings.stack_reserve);

        Ok(ScriptMemory {
            bytes,
            registers,
            heap_size,
        })
    }

    pub fn load<P: AsRef<Path>>(path: P, settings: &HeapSettings) -> Result<Self, ConfigError> {
        let bytes = fs::read(path)?;
        Self::from_image(bytes, settings)
    }

    /// Borrow the heap for a sequence of operations
    pub fn heap(&mut self) -> ScriptHeap<'_, BufferRegisters> {
        ScriptHeap::new(&mut self.bytes, self.registers, self.heap_size)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn heap_size(&self) -> usize {
        self.heap_size
    }

    /// Offset of the heap base as recorded in the register block
    pub fn heap_base(&self) -> usize {
        usize::try_from(self.registers.get(&self.bytes, Register::HeapBase)).unwrap_or(0)
    }

    /// The bytes making up the heap region
    pub fn heap_region(&self) -> &[u8] {
        let base = self.heap_base().min(self.bytes.len());
        let end = (base + self.heap_size).min(self.bytes.len());
        &self.bytes[base..end]
    }
}
