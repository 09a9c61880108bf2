//! The script heap allocator
//!
//! First-fit allocation over a borrowed byte buffer. Entries are
//! packed back to back from the heap base so the heap can be walked
//! by summing extents. Free entries are split when there is room to
//! spare and merged with free neighbours only when an allocation scan
//! walks across them.

use std::convert::TryFrom;

use log::{debug, trace, warn};

use super::{
    address::HeapAddress,
    header::EntryHeader,
    registers::{BufferRegisters, FaultBits, HeapState, Register, Registers},
};
use crate::error::{Fault, HeapFault};
use crate::value::{Value, ValueType};

/// Minimum payload left in the remainder when a free entry is split
pub const SPLIT_SLACK: usize = 4;

/// A view onto a script heap for the duration of a host call
///
/// The view borrows script memory and the host's register accessors;
/// it never owns or resizes the buffer. `heap_size` bounds the heap
/// region, space above `HR + heap_size` belongs to the stack.
pub struct ScriptHeap<'buf, R: Registers = BufferRegisters> {
    pub(crate) buffer: &'buf mut [u8],
    registers: R,
    heap_size: usize,
}

impl<'buf, R: Registers> ScriptHeap<'buf, R> {
    pub fn new(buffer: &'buf mut [u8], registers: R, heap_size: usize) -> Self {
        ScriptHeap {
            buffer,
            registers,
            heap_size,
        }
    }

    /// The underlying script memory
    pub fn buffer(&self) -> &[u8] {
        self.buffer
    }

    pub fn heap_size(&self) -> usize {
        self.heap_size
    }

    pub fn register(&self, register: Register) -> i32 {
        self.registers.get(self.buffer, register)
    }

    fn set_register(&mut self, register: Register, value: i32) {
        self.registers.set(self.buffer, register, value)
    }

    /// Absolute offset of the heap base
    pub(crate) fn heap_base(&self) -> Result<usize, Fault> {
        let hr = self.register(Register::HeapBase);
        usize::try_from(hr).map_err(|_| Fault::BoundCheck(i64::from(hr)))
    }

    /// Absolute offset of the high-water mark
    pub(crate) fn heap_pointer(&self) -> usize {
        usize::try_from(self.register(Register::HeapPointer)).unwrap_or(0)
    }

    /// Absolute offset of the end of the heap region
    pub(crate) fn heap_limit(&self) -> Result<usize, Fault> {
        Ok((self.heap_base()? + self.heap_size).min(self.buffer.len()))
    }

    fn raise_heap_pointer(&mut self, offset: usize) {
        if offset > self.heap_pointer() {
            self.set_register(Register::HeapPointer, i32::try_from(offset).unwrap_or(i32::MAX));
        }
    }

    /// Known-good value for HP once the heap can no longer be trusted
    fn reset_hp_to_safe_spot(&mut self) {
        let top = i32::try_from(self.buffer.len()).unwrap_or(i32::MAX);
        self.set_register(Register::HeapPointer, top);
    }

    pub fn state(&self) -> HeapState {
        HeapState::from_register(self.register(Register::Fault))
    }

    pub fn is_poisoned(&self) -> bool {
        !self.state().is_live()
    }

    /// Record a fault and poison the heap
    ///
    /// Only the first fault is recorded, later ones are ignored.
    pub fn signal_fault(&mut self, fault: Fault) {
        if self.is_poisoned() {
            debug!("ignoring {fault} on poisoned heap");
            return;
        }

        warn!("script heap fault: {fault}");
        let bits = FaultBits::from(&fault);
        if bits.resets_heap_pointer() {
            self.reset_hp_to_safe_spot();
        }
        self.set_register(Register::Fault, bits.bits());
    }

    /// Run `op` unless poisoned, converting any fault into the
    /// poisoned state and a neutral result
    pub(crate) fn guarded<T, F>(&mut self, neutral: T, op: F) -> T
    where
        F: FnOnce(&mut Self) -> Result<T, Fault>,
    {
        if self.is_poisoned() {
            return neutral;
        }

        match op(self) {
            Ok(result) => result,
            Err(fault) => {
                self.signal_fault(fault);
                neutral
            }
        }
    }

    /// Buffer offset of the entry at `address`, which must lie in
    /// `[HR, HP)`
    pub(crate) fn resolve(&self, address: HeapAddress) -> Result<usize, Fault> {
        let hr = self.heap_base()?;
        let offset = address.offset(hr);
        if offset < hr as i64 || offset >= self.heap_pointer() as i64 {
            Err(Fault::BoundCheck(offset))
        } else {
            Ok(offset as usize)
        }
    }

    pub(crate) fn address_of(&self, offset: usize) -> Result<HeapAddress, Fault> {
        HeapAddress::for_offset(offset, self.heap_base()?)
    }

    /// Header of the entry at `address` without raising any fault
    pub fn entry(&self, address: HeapAddress) -> Option<EntryHeader> {
        self.resolve(address)
            .and_then(|offset| EntryHeader::read(self.buffer, offset))
            .ok()
    }

    /// Initialise the whole heap region as a single free entry
    pub fn create_heap(&mut self) -> bool {
        self.guarded(false, |heap| {
            let hr = heap.heap_base()?;
            let size = heap
                .heap_limit()?
                .checked_sub(hr + EntryHeader::SIZE)
                .ok_or(Fault::StackHeapCollision(0))?;
            EntryHeader::free(size).write(heap.buffer, hr)?;
            heap.set_register(Register::HeapPointer, i32::try_from(hr).unwrap_or(i32::MAX));
            Ok(true)
        })
    }

    /// Insert a copy of `value` into the heap, returning its address
    /// with a reference count of one, or null on failure
    pub fn allocate(&mut self, value: &Value) -> HeapAddress {
        self.guarded(HeapAddress::NULL, |heap| heap.insert(value))
    }

    pub(crate) fn insert(&mut self, value: &Value) -> Result<HeapAddress, Fault> {
        value.check_flat()?;
        value.check_text()?;

        let need = value.payload_size();
        let limit = self.heap_limit()?;
        let mut current = self.heap_base()?;
        let mut entry = EntryHeader::read(self.buffer, current)?;

        loop {
            if entry.is_free() {
                if entry.size >= need + EntryHeader::SIZE + SPLIT_SLACK {
                    let shrunk = self.split(current, need, entry)?;
                    return self.commit(current, shrunk, value, current + need + 2 * EntryHeader::SIZE);
                } else if entry.size >= need {
                    return self.commit(current, entry, value, current + entry.extent());
                }
            }

            let next = current + entry.extent();
            if next + EntryHeader::SIZE > limit {
                break;
            }

            let next_entry = EntryHeader::read(self.buffer, next)?;
            if entry.is_free() && next_entry.is_free() {
                trace!("merging free entry at {next} into {current}");
                entry.size += next_entry.extent();
                entry.write(self.buffer, current)?;
            } else {
                current = next;
                entry = next_entry;
            }

            // the high-water mark follows the scan so it always covers
            // the candidate entry and the header after it
            let new_hp = current + need + 2 * EntryHeader::SIZE;
            if new_hp >= limit {
                break;
            }
            self.raise_heap_pointer(new_hp);
        }

        debug!("no room for {need} byte payload below {limit}");
        Err(Fault::StackHeapCollision(need))
    }

    /// Claim the free entry at `offset` for `value`
    fn commit(
        &mut self,
        offset: usize,
        entry: EntryHeader,
        value: &Value,
        end: usize,
    ) -> Result<HeapAddress, Fault> {
        let header = EntryHeader::new(entry.size, value.value_type());
        header.write(self.buffer, offset)?;
        self.raise_heap_pointer(end);
        self.serialize(offset + EntryHeader::SIZE, value)?;
        self.address_of(offset)
    }

    /// Shrink the free entry at `offset` to `size` payload bytes and
    /// write a free header for the remainder after it
    pub(crate) fn split(
        &mut self,
        offset: usize,
        size: usize,
        entry: EntryHeader,
    ) -> Result<EntryHeader, Fault> {
        let remainder = entry
            .size
            .checked_sub(size + EntryHeader::SIZE)
            .filter(|r| *r > 0)
            .ok_or(HeapFault::CorruptEntry(offset))?;

        trace!("splitting {} byte entry at {offset} for {size}", entry.size);
        EntryHeader::free(remainder).write(self.buffer, offset + EntryHeader::SIZE + size)?;
        let shrunk = EntryHeader { size, ..entry };
        shrunk.write(self.buffer, offset)?;
        Ok(shrunk)
    }

    pub fn increase_ref_count(&mut self, address: HeapAddress) {
        self.guarded((), |heap| {
            let offset = heap.resolve(address)?;
            let mut header = EntryHeader::read(heap.buffer, offset)?;
            if header.is_free() {
                return Err(HeapFault::FreedEntry(offset).into());
            }
            header.ref_count = header.ref_count.saturating_add(1);
            header.write(heap.buffer, offset)
        })
    }

    pub fn decrease_ref_count(&mut self, address: HeapAddress) {
        self.guarded((), |heap| heap.release(address))
    }

    /// Drop one reference, freeing the entry (and releasing list
    /// children) when the count reaches zero
    ///
    /// An underflow is clamped to zero and reported after the whole
    /// cascade has been processed.
    pub(crate) fn release(&mut self, address: HeapAddress) -> Result<(), Fault> {
        let mut pending = vec![address];
        let mut underflow = None;

        while let Some(address) = pending.pop() {
            let offset = self.resolve(address)?;
            let mut header = EntryHeader::read(self.buffer, offset)?;

            match header.ref_count.checked_sub(1) {
                Some(count) => header.ref_count = count,
                None => {
                    underflow.get_or_insert(Fault::Heap(HeapFault::RefCountUnderflow(offset)));
                }
            }

            if header.ref_count == 0 {
                // children must be read while the header is still valid
                if header.tag == ValueType::List {
                    pending.extend(self.list_addresses(offset, &header)?);
                }
                header.tag = ValueType::Free;
            }

            header.write(self.buffer, offset)?;
        }

        underflow.map_or(Ok(()), Err)
    }
}
