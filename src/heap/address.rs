//! Heap addresses as the host sees them
//!
//! An address is a 1-based byte offset from the heap base so that
//! zero can stand for "no entry".

use std::convert::TryFrom;
use std::fmt;

use crate::error::Fault;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct HeapAddress(i32);

impl HeapAddress {
    /// Failure sentinel returned by operations that could not
    /// produce an entry
    pub const NULL: HeapAddress = HeapAddress(0);

    pub fn from_raw(raw: i32) -> Self {
        HeapAddress(raw)
    }

    pub fn raw(self) -> i32 {
        self.0
    }

    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Address of the entry at absolute buffer `offset`
    pub fn for_offset(offset: usize, heap_base: usize) -> Result<Self, Fault> {
        offset
            .checked_sub(heap_base)
            .and_then(|rel| i32::try_from(rel + 1).ok())
            .map(HeapAddress)
            .ok_or(Fault::BoundCheck(offset as i64))
    }

    /// Absolute buffer offset, unchecked against the high-water mark
    pub fn offset(self, heap_base: usize) -> i64 {
        heap_base as i64 + i64::from(self.0) - 1
    }
}

impl fmt::Display for HeapAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}
