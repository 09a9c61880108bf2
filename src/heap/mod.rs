//! The script heap
//!
//! Entries of header and payload packed into a host-owned buffer,
//! addressed by 1-based offsets from the heap base.
pub mod address;
pub mod alloc;
pub mod block;
pub mod codec;
pub mod header;
pub mod marshal;
pub mod memory;
pub mod registers;
pub mod settings;
pub mod walk;

pub use address::HeapAddress;
pub use alloc::ScriptHeap;
pub use block::{create_detached_block, create_free_block};
pub use header::EntryHeader;
pub use memory::ScriptMemory;
pub use registers::{BufferRegisters, FaultBits, HeapState, Register, Registers};
pub use settings::HeapSettings;
pub use walk::{EntryRecord, HeapSnapshot, HeapStats, Payload};
