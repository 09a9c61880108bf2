//! Standalone entry blocks
//!
//! A block is the byte image a value would occupy in a heap, built
//! without one. Loaders use these to lay out initial heap contents.
use std::convert::TryFrom;

use super::{codec, header::EntryHeader};
use crate::error::Fault;
use crate::value::Value;

/// Encode `value` as an entry, followed by its children for a list
///
/// Child addresses assume the block will be copied to `base_offset`
/// bytes past the heap base.
pub fn create_detached_block(value: &Value, base_offset: usize) -> Result<Vec<u8>, Fault> {
    value.check_flat()?;
    value.check_text()?;

    let children = value.as_list().unwrap_or(&[]);
    let total = EntryHeader::SIZE
        + value.payload_size()
        + children
            .iter()
            .map(|child| EntryHeader::SIZE + child.payload_size())
            .sum::<usize>();

    let mut block = vec![0; total];
    let mut cursor = write_entry(&mut block, 0, value)?;

    if let Value::List(items) = value {
        let mut slot = EntryHeader::SIZE;
        codec::write_i32(&mut block, &mut slot, count(items.len(), total)?)?;
        for item in items {
            let address = count(cursor + base_offset + 1, total)?;
            codec::write_i32(&mut block, &mut slot, address)?;
            cursor = write_entry(&mut block, cursor, item)?;
        }
    }

    Ok(block)
}

/// A bare free header declaring `size` payload bytes
///
/// Loaders place this after their last entry so the heap ends in a
/// free entry covering the rest of the region. The payload bytes are
/// not part of the block.
pub fn create_free_block(size: usize) -> Result<Vec<u8>, Fault> {
    let mut block = vec![0; EntryHeader::SIZE];
    EntryHeader::free(size).write(&mut block, 0)?;
    Ok(block)
}

fn count(n: usize, total: usize) -> Result<i32, Fault> {
    i32::try_from(n).map_err(|_| Fault::StackHeapCollision(total))
}

/// Write the header and scalar payload of `value` at `offset`,
/// returning the offset after the entry
fn write_entry(block: &mut [u8], offset: usize, value: &Value) -> Result<usize, Fault> {
    EntryHeader::new(value.payload_size(), value.value_type()).write(block, offset)?;

    let mut cursor = offset + EntryHeader::SIZE;
    match value {
        Value::Integer(i) => codec::write_i32(block, &mut cursor, *i)?,
        Value::Float(x) => codec::write_f32(block, &mut cursor, *x)?,
        Value::String(s) | Value::Key(s) => codec::write_text(block, &mut cursor, s)?,
        Value::Vector(v) => codec::write_vector(block, &mut cursor, v)?,
        Value::Quaternion(q) => codec::write_quaternion(block, &mut cursor, q)?,
        // slots are filled in by the caller
        Value::List(_) => {}
    }

    Ok(offset + EntryHeader::SIZE + value.payload_size())
}
