//! Big-endian byte codec for heap payloads
//!
//! Every read and write advances `offset` and fails with a bound
//! check fault instead of indexing past the end of the buffer.

use std::convert::TryInto;

use crate::error::Fault;
use crate::value::{Quaternion, Vector3};

fn span(offset: usize, len: usize) -> std::ops::Range<usize> {
    offset..offset.saturating_add(len)
}

fn take<const N: usize>(buffer: &[u8], offset: &mut usize) -> Result<[u8; N], Fault> {
    let bytes: [u8; N] = buffer
        .get(span(*offset, N))
        .and_then(|s| s.try_into().ok())
        .ok_or(Fault::BoundCheck(*offset as i64))?;
    *offset += N;
    Ok(bytes)
}

fn put(buffer: &mut [u8], offset: &mut usize, bytes: &[u8]) -> Result<(), Fault> {
    let dest = buffer
        .get_mut(span(*offset, bytes.len()))
        .ok_or(Fault::BoundCheck(*offset as i64))?;
    dest.copy_from_slice(bytes);
    *offset += bytes.len();
    Ok(())
}

pub fn read_u8(buffer: &[u8], offset: &mut usize) -> Result<u8, Fault> {
    take::<1>(buffer, offset).map(|b| b[0])
}

pub fn write_u8(buffer: &mut [u8], offset: &mut usize, value: u8) -> Result<(), Fault> {
    put(buffer, offset, &[value])
}

pub fn read_u16(buffer: &[u8], offset: &mut usize) -> Result<u16, Fault> {
    take(buffer, offset).map(u16::from_be_bytes)
}

pub fn write_u16(buffer: &mut [u8], offset: &mut usize, value: u16) -> Result<(), Fault> {
    put(buffer, offset, &value.to_be_bytes())
}

pub fn read_i32(buffer: &[u8], offset: &mut usize) -> Result<i32, Fault> {
    take(buffer, offset).map(i32::from_be_bytes)
}

pub fn write_i32(buffer: &mut [u8], offset: &mut usize, value: i32) -> Result<(), Fault> {
    put(buffer, offset, &value.to_be_bytes())
}

/// Floats travel as their bit pattern so every value, finite or
/// not, survives a round trip
pub fn read_f32(buffer: &[u8], offset: &mut usize) -> Result<f32, Fault> {
    take(buffer, offset).map(|b| f32::from_bits(u32::from_be_bytes(b)))
}

pub fn write_f32(buffer: &mut [u8], offset: &mut usize, value: f32) -> Result<(), Fault> {
    put(buffer, offset, &value.to_bits().to_be_bytes())
}

/// Vectors are stored z first
pub fn read_vector(buffer: &[u8], offset: &mut usize) -> Result<Vector3, Fault> {
    let z = read_f32(buffer, offset)?;
    let y = read_f32(buffer, offset)?;
    let x = read_f32(buffer, offset)?;
    Ok(Vector3 { x, y, z })
}

pub fn write_vector(buffer: &mut [u8], offset: &mut usize, v: &Vector3) -> Result<(), Fault> {
    write_f32(buffer, offset, v.z)?;
    write_f32(buffer, offset, v.y)?;
    write_f32(buffer, offset, v.x)
}

/// Quaternions are stored s, z, y, x
pub fn read_quaternion(buffer: &[u8], offset: &mut usize) -> Result<Quaternion, Fault> {
    let s = read_f32(buffer, offset)?;
    let z = read_f32(buffer, offset)?;
    let y = read_f32(buffer, offset)?;
    let x = read_f32(buffer, offset)?;
    Ok(Quaternion { x, y, z, s })
}

pub fn write_quaternion(
    buffer: &mut [u8],
    offset: &mut usize,
    q: &Quaternion,
) -> Result<(), Fault> {
    write_f32(buffer, offset, q.s)?;
    write_f32(buffer, offset, q.z)?;
    write_f32(buffer, offset, q.y)?;
    write_f32(buffer, offset, q.x)
}

/// Read nul-terminated text, never looking beyond `limit`
///
/// A missing terminator ends the text at `limit`. The offset moves
/// past the terminator (or to `limit`).
pub fn read_text(buffer: &[u8], offset: &mut usize, limit: usize) -> Result<String, Fault> {
    let bytes = buffer
        .get(*offset..limit.min(buffer.len()))
        .ok_or(Fault::BoundCheck(*offset as i64))?;
    let len = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
    let text = String::from_utf8_lossy(&bytes[..len]).into_owned();
    *offset = (*offset + len + 1).min(limit);
    Ok(text)
}

pub fn write_text(buffer: &mut [u8], offset: &mut usize, text: &str) -> Result<(), Fault> {
    put(buffer, offset, text.as_bytes())?;
    write_u8(buffer, offset, 0)
}
