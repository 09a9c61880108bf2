//! Walking the packed entries of a heap
//!
//! None of this is guarded. Inspection works on poisoned heaps too
//! and never raises faults.
use std::fmt::{self, Display};

use super::{
    address::HeapAddress,
    alloc::ScriptHeap,
    header::EntryHeader,
    registers::{Register, Registers},
};
use crate::error::Fault;
use crate::value::{Value, ValueType};

/// Iterator over `(offset, header)` pairs from the heap base
///
/// Stops at the heap limit or at the first header that can't be read.
pub struct Entries<'a> {
    buffer: &'a [u8],
    next: usize,
    limit: usize,
}

impl Iterator for Entries<'_> {
    type Item = (usize, EntryHeader);

    fn next(&mut self) -> Option<Self::Item> {
        if self.next + EntryHeader::SIZE > self.limit {
            return None;
        }

        let offset = self.next;
        match EntryHeader::read(self.buffer, offset) {
            Ok(header) => {
                self.next = offset + header.extent();
                Some((offset, header))
            }
            Err(_) => {
                self.next = self.limit;
                None
            }
        }
    }
}

/// Decoded content of an entry
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Free,
    Scalar(Value),
    /// Child addresses, not dereferenced
    List(Vec<HeapAddress>),
}

/// An entry as seen by heap dumps
#[derive(Debug, Clone, PartialEq)]
pub struct EntryRecord {
    pub offset: usize,
    pub address: HeapAddress,
    pub header: EntryHeader,
    pub payload: Result<Payload, Fault>,
}

/// Every entry in a heap along with its registers
#[derive(Debug, Clone, PartialEq)]
pub struct HeapSnapshot {
    pub heap_base: usize,
    pub heap_pointer: usize,
    pub fault_register: i32,
    pub entries: Vec<EntryRecord>,
}

/// Occupancy summary for a heap
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeapStats {
    pub used_entries: usize,
    pub used_bytes: usize,
    pub free_entries: usize,
    pub free_bytes: usize,
    pub largest_free: usize,
}

impl HeapStats {
    fn record(&mut self, header: &EntryHeader) {
        if header.is_free() {
            self.free_entries += 1;
            self.free_bytes += header.extent();
            self.largest_free = self.largest_free.max(header.size);
        } else {
            self.used_entries += 1;
            self.used_bytes += header.extent();
        }
    }

    pub fn total_bytes(&self) -> usize {
        self.used_bytes + self.free_bytes
    }
}

impl Display for HeapStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Used Entries  : {:10}", self.used_entries)?;
        writeln!(f, "Used Bytes    : {:10}", self.used_bytes)?;
        writeln!(f, "Free Entries  : {:10}", self.free_entries)?;
        writeln!(f, "Free Bytes    : {:10}", self.free_bytes)?;
        writeln!(f, "Largest Free  : {:10}", self.largest_free)
    }
}

impl<'buf, R: Registers> ScriptHeap<'buf, R> {
    pub fn entries(&self) -> Entries<'_> {
        let next = self.heap_base().unwrap_or(self.buffer.len());
        let limit = self.heap_limit().unwrap_or(0);
        Entries {
            buffer: self.buffer,
            next,
            limit,
        }
    }

    pub fn stats(&self) -> HeapStats {
        let mut stats = HeapStats::default();
        for (_, header) in self.entries() {
            stats.record(&header);
        }
        stats
    }

    /// Extent of the packed entries, relative to the heap base, that
    /// reach `max_top`
    ///
    /// Walks whole entries, so the result may overshoot `max_top` by
    /// up to one entry. An unreadable header ends the walk.
    pub fn heap_top(&self, max_top: usize) -> usize {
        let base = match self.heap_base() {
            Ok(base) => base,
            Err(_) => return 0,
        };

        let limit = self.heap_limit().unwrap_or(base);
        let mut top = 0;
        while base + top + EntryHeader::SIZE <= limit {
            match EntryHeader::read(self.buffer, base + top) {
                Ok(header) => top += header.extent(),
                Err(_) => break,
            }
            if top >= max_top {
                break;
            }
        }
        top
    }

    /// Decode an entry for display without following list children
    pub fn payload(&self, offset: usize, header: &EntryHeader) -> Result<Payload, Fault> {
        match header.tag {
            ValueType::Free => Ok(Payload::Free),
            ValueType::List => self.list_addresses(offset, header).map(Payload::List),
            _ => self.decode_scalar(offset, header).map(Payload::Scalar),
        }
    }

    pub fn snapshot(&self) -> HeapSnapshot {
        let heap_base = self.heap_base().unwrap_or(0);
        let entries = self
            .entries()
            .map(|(offset, header)| EntryRecord {
                offset,
                address: HeapAddress::for_offset(offset, heap_base).unwrap_or_default(),
                header,
                payload: self.payload(offset, &header),
            })
            .collect();

        HeapSnapshot {
            heap_base,
            heap_pointer: self.heap_pointer(),
            fault_register: self.register(Register::Fault),
            entries,
        }
    }
}

impl Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Free => Ok(()),
            Payload::Scalar(value) => write!(f, "{value}"),
            Payload::List(children) => write!(f, "{}", children.len()),
        }
    }
}

impl Display for EntryRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[0x{:X}] {} Ref Count: {} Size: {} = ",
            self.offset, self.header.tag, self.header.ref_count, self.header.size
        )?;
        match &self.payload {
            Ok(payload) => write!(f, "{payload}"),
            Err(fault) => write!(f, "<{fault}>"),
        }
    }
}

impl Display for HeapSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "HP: [0x{:X}]", self.heap_pointer)?;
        writeln!(f, "==========")?;
        for entry in &self.entries {
            writeln!(f, "{entry}")?;
        }
        Ok(())
    }
}
