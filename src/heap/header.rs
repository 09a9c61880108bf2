//! Header for all heap entries
//!
//! Seven bytes, big-endian: payload size (4), type tag (1),
//! reference count (2). The payload follows immediately.

use std::convert::TryFrom;

use super::codec;
use crate::error::{Fault, HeapFault};
use crate::value::ValueType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryHeader {
    /// Payload bytes, excluding this header
    pub size: usize,
    /// Type of the stored value, `Free` for unused space
    pub tag: ValueType,
    pub ref_count: u16,
}

impl EntryHeader {
    /// Encoded size of a header in bytes
    pub const SIZE: usize = 7;

    pub fn new(size: usize, tag: ValueType) -> Self {
        EntryHeader {
            size,
            tag,
            ref_count: 1,
        }
    }

    /// Header for unused space of `size` payload bytes
    pub fn free(size: usize) -> Self {
        EntryHeader {
            size,
            tag: ValueType::Free,
            ref_count: 0,
        }
    }

    pub fn is_free(&self) -> bool {
        self.tag == ValueType::Free
    }

    /// Bytes occupied by header and payload together
    pub fn extent(&self) -> usize {
        Self::SIZE + self.size
    }

    /// Decode the header at `offset`
    pub fn read(buffer: &[u8], offset: usize) -> Result<Self, Fault> {
        let mut cursor = offset;
        let size = codec::read_i32(buffer, &mut cursor)?;
        let tag = codec::read_u8(buffer, &mut cursor)?;
        let ref_count = codec::read_u16(buffer, &mut cursor)?;

        let size = usize::try_from(size).map_err(|_| HeapFault::CorruptEntry(offset))?;
        let tag = ValueType::try_from(tag).map_err(|_| HeapFault::CorruptEntry(offset))?;

        Ok(EntryHeader {
            size,
            tag,
            ref_count,
        })
    }

    /// Encode the header at `offset`
    pub fn write(&self, buffer: &mut [u8], offset: usize) -> Result<(), Fault> {
        let size = i32::try_from(self.size).map_err(|_| HeapFault::CorruptEntry(offset))?;
        let mut cursor = offset;
        codec::write_i32(buffer, &mut cursor, size)?;
        codec::write_u8(buffer, &mut cursor, self.tag.tag())?;
        codec::write_u16(buffer, &mut cursor, self.ref_count)
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    #[test]
    pub fn test_header_layout() {
        let mut buf = [0u8; EntryHeader::SIZE];
        let header = EntryHeader {
            size: 0x0102,
            tag: ValueType::String,
            ref_count: 0x0304,
        };
        header.write(&mut buf, 0).unwrap();
        assert_eq!(buf, [0, 0, 1, 2, 3, 3, 4]);
        assert_eq!(EntryHeader::read(&buf, 0).unwrap(), header);
    }

    #[test]
    pub fn test_corrupt_tag() {
        let buf = [0, 0, 0, 4, 99, 0, 1];
        assert_eq!(
            EntryHeader::read(&buf, 0),
            Err(Fault::Heap(HeapFault::CorruptEntry(0)))
        );
    }

    #[test]
    pub fn test_negative_size_is_corrupt() {
        let buf = [0xff, 0xff, 0xff, 0xff, 1, 0, 1];
        assert!(EntryHeader::read(&buf, 0).is_err());
    }
}
