//! Encoding values into heap entries and decoding them back out
//!
//! Lists are stored as a count followed by the addresses of children
//! allocated as entries in their own right. Decoding only ever
//! descends one level since lists are flat.

use std::convert::TryFrom;

use super::{
    address::HeapAddress,
    alloc::ScriptHeap,
    codec,
    header::EntryHeader,
    registers::Registers,
};
use crate::error::{Fault, HeapFault};
use crate::value::{Value, ValueType, LIST_COUNT_SIZE, LIST_SLOT_SIZE};

impl<'buf, R: Registers> ScriptHeap<'buf, R> {
    /// Write the payload for `value` at `offset`, allocating list
    /// elements as separate entries
    pub(crate) fn serialize(&mut self, offset: usize, value: &Value) -> Result<(), Fault> {
        let mut cursor = offset;
        match value {
            Value::Integer(i) => codec::write_i32(self.buffer, &mut cursor, *i),
            Value::Float(x) => codec::write_f32(self.buffer, &mut cursor, *x),
            Value::String(s) | Value::Key(s) => codec::write_text(self.buffer, &mut cursor, s),
            Value::Vector(v) => codec::write_vector(self.buffer, &mut cursor, v),
            Value::Quaternion(q) => codec::write_quaternion(self.buffer, &mut cursor, q),
            Value::List(items) => {
                let count = i32::try_from(items.len())
                    .map_err(|_| Fault::StackHeapCollision(value.payload_size()))?;
                codec::write_i32(self.buffer, &mut cursor, count)?;
                for item in items {
                    let address = self.insert(item)?;
                    codec::write_i32(self.buffer, &mut cursor, address.raw())?;
                }
                Ok(())
            }
        }
    }

    /// Child addresses held by the list entry at `offset`
    pub(crate) fn list_addresses(
        &self,
        offset: usize,
        header: &EntryHeader,
    ) -> Result<Vec<HeapAddress>, Fault> {
        let mut cursor = offset + EntryHeader::SIZE;
        let count = codec::read_i32(self.buffer, &mut cursor)?;
        let count = usize::try_from(count)
            .ok()
            .filter(|n| LIST_COUNT_SIZE + n * LIST_SLOT_SIZE <= header.size)
            .ok_or(HeapFault::CorruptEntry(offset))?;

        (0..count)
            .map(|_| codec::read_i32(self.buffer, &mut cursor).map(HeapAddress::from_raw))
            .collect()
    }

    pub(crate) fn decode_scalar(&self, offset: usize, header: &EntryHeader) -> Result<Value, Fault> {
        let mut cursor = offset + EntryHeader::SIZE;
        let end = cursor + header.size;
        let buffer: &[u8] = self.buffer;

        let value = match header.tag {
            ValueType::Integer => Value::Integer(codec::read_i32(buffer, &mut cursor)?),
            ValueType::Float => Value::Float(codec::read_f32(buffer, &mut cursor)?),
            ValueType::String => Value::String(codec::read_text(buffer, &mut cursor, end)?),
            ValueType::Key => Value::Key(codec::read_text(buffer, &mut cursor, end)?),
            ValueType::Vector => Value::Vector(codec::read_vector(buffer, &mut cursor)?),
            ValueType::Quaternion => {
                Value::Quaternion(codec::read_quaternion(buffer, &mut cursor)?)
            }
            ValueType::Free => return Err(HeapFault::FreedEntry(offset).into()),
            ValueType::List => return Err(Fault::NestingLists),
        };

        Ok(value)
    }

    /// Decode the entry at `address` without touching reference counts
    pub(crate) fn decode(&self, address: HeapAddress) -> Result<Value, Fault> {
        let offset = self.resolve(address)?;
        let header = EntryHeader::read(self.buffer, offset)?;

        let value = match header.tag {
            ValueType::List => {
                let children = self.list_addresses(offset, &header)?;
                let mut items = Vec::with_capacity(children.len());
                for child in children {
                    let child_offset = self.resolve(child)?;
                    let child_header = EntryHeader::read(self.buffer, child_offset)?;
                    items.push(self.decode_scalar(child_offset, &child_header)?);
                }
                Value::List(items)
            }
            _ => self.decode_scalar(offset, &header)?,
        };

        value.check_flat()?;
        Ok(value)
    }

    /// Read the value at `address`, leaving its reference count alone
    pub fn read(&mut self, address: HeapAddress) -> Option<Value> {
        self.guarded(None, |heap| heap.decode(address).map(Some))
    }

    /// Read the value at `address` and release one reference to it
    ///
    /// Only the entry read is released. List children lose a
    /// reference only if the list itself is freed.
    pub fn consume(&mut self, address: HeapAddress) -> Option<Value> {
        self.guarded(None, |heap| heap.take(address).map(Some))
    }

    pub(crate) fn take(&mut self, address: HeapAddress) -> Result<Value, Fault> {
        let value = self.decode(address)?;
        self.release(address)?;
        Ok(value)
    }

    /// Elements of the list at `address`
    ///
    /// Entries that are not lists yield `None` without faulting.
    pub fn list_elements(&mut self, address: HeapAddress, consuming: bool) -> Option<Vec<Value>> {
        self.guarded(None, |heap| {
            let offset = heap.resolve(address)?;
            let header = EntryHeader::read(heap.buffer, offset)?;
            match header.tag {
                ValueType::Free => Err(HeapFault::FreedEntry(offset).into()),
                ValueType::List => {
                    let items = heap.decode(address)?.into_list();
                    if consuming {
                        heap.release(address)?;
                    }
                    Ok(items)
                }
                _ => Ok(None),
            }
        })
    }
}
