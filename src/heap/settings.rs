//! Layout of script memory
use structopt::StructOpt;

use super::{header::EntryHeader, registers::REGISTER_BLOCK_SIZE};
use crate::error::ConfigError;

/// Settings describing where the heap sits in script memory
#[derive(StructOpt, Debug, Clone, PartialEq, Eq)]
pub struct HeapSettings {
    /// Total bytes of script memory
    #[structopt(long = "memory-size", default_value = "16384")]
    pub memory_size: usize,
    /// Byte offset of the heap base (HR)
    #[structopt(long = "heap-base", default_value = "16")]
    pub heap_base: usize,
    /// Bytes at the top of memory kept free for the stack
    #[structopt(long = "stack-reserve", default_value = "1024")]
    pub stack_reserve: usize,
}

impl Default for HeapSettings {
    fn default() -> Self {
        HeapSettings {
            memory_size: 16384,
            heap_base: 16,
            stack_reserve: 1024,
        }
    }
}

impl HeapSettings {
    /// Bytes available to the heap region
    pub fn heap_size(&self) -> usize {
        self.memory_size
            .saturating_sub(self.heap_base)
            .saturating_sub(self.stack_reserve)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.heap_base < REGISTER_BLOCK_SIZE {
            return Err(ConfigError::HeapOverlapsRegisters(self.heap_base));
        }

        // the heap must hold at least one header
        let used = self.heap_base + self.stack_reserve;
        if used >= self.memory_size || self.heap_size() < EntryHeader::SIZE {
            return Err(ConfigError::MemoryTooSmall {
                memory: self.memory_size,
                base: self.heap_base,
                reserve: self.stack_reserve,
            });
        }

        Ok(())
    }
}
