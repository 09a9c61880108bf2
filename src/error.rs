//! Heap faults and configuration errors
use thiserror::Error;

use crate::value::ValueType;

/// Detail for the catch-all heap error fault
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HeapFault {
    #[error("entry at offset {0} has already been freed")]
    FreedEntry(usize),
    #[error("reference count underflow at offset {0}")]
    RefCountUnderflow(usize),
    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        expected: ValueType,
        found: ValueType,
    },
    #[error("corrupt entry header at offset {0}")]
    CorruptEntry(usize),
    #[error("text contains a nul byte at index {0}")]
    EmbeddedNul(usize),
}

/// A runtime fault raised while operating on a script heap
///
/// Faults never propagate to the host as errors. The first one is
/// recorded in the fault register and the heap goes inert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Fault {
    #[error("bound check error at offset {0}")]
    BoundCheck(i64),
    #[error("stack-heap collision allocating {0} bytes")]
    StackHeapCollision(usize),
    #[error("heap error: {0}")]
    Heap(#[from] HeapFault),
    #[error("lists may not contain lists")]
    NestingLists,
}

/// Problems with the shape of script memory, reported to the host
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("memory of {memory} bytes cannot hold a heap at {base} with {reserve} bytes of stack")]
    MemoryTooSmall {
        memory: usize,
        base: usize,
        reserve: usize,
    },
    #[error("heap base {0} overlaps the register block")]
    HeapOverlapsRegisters(usize),
    #[error("heap base register holds {0}, outside the image")]
    BadHeapBase(i32),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
