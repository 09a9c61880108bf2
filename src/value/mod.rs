//! Script values
//!
//! The tagged representation of script data as the interpreter sees
//! it. A value knows how large its heap payload is but nothing else
//! about the heap.
use std::convert::TryFrom;
use std::fmt;

use itertools::Itertools;

use crate::error::{Fault, HeapFault};

/// Type tag stored in each heap entry header
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// Unused space
    Free = 0,
    Integer = 1,
    Float = 2,
    String = 3,
    Key = 4,
    Vector = 5,
    Quaternion = 6,
    List = 7,
}

impl ValueType {
    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            ValueType::Free => "free",
            ValueType::Integer => "integer",
            ValueType::Float => "float",
            ValueType::String => "string",
            ValueType::Key => "key",
            ValueType::Vector => "vector",
            ValueType::Quaternion => "quaternion",
            ValueType::List => "list",
        }
    }
}

impl TryFrom<u8> for ValueType {
    type Error = ();

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            0 => Ok(ValueType::Free),
            1 => Ok(ValueType::Integer),
            2 => Ok(ValueType::Float),
            3 => Ok(ValueType::String),
            4 => Ok(ValueType::Key),
            5 => Ok(ValueType::Vector),
            6 => Ok(ValueType::Quaternion),
            7 => Ok(ValueType::List),
            _ => Err(()),
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Three component vector
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Vector3 { x, y, z }
    }
}

/// Rotation quaternion, `s` is the scalar part
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quaternion {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub s: f32,
}

impl Quaternion {
    pub fn new(x: f32, y: f32, z: f32, s: f32) -> Self {
        Quaternion { x, y, z, s }
    }
}

impl Default for Quaternion {
    /// The identity rotation
    fn default() -> Self {
        Quaternion::new(0.0, 0.0, 0.0, 1.0)
    }
}

/// A script datum
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i32),
    Float(f32),
    String(String),
    /// Opaque identifier text
    Key(String),
    Vector(Vector3),
    Quaternion(Quaternion),
    /// Flat list, elements may not themselves be lists
    List(Vec<Value>),
}

/// Bytes in the count field at the start of a list payload
pub const LIST_COUNT_SIZE: usize = 4;
/// Bytes per child address in a list payload
pub const LIST_SLOT_SIZE: usize = 4;

impl Value {
    pub fn str<T: AsRef<str>>(s: T) -> Self {
        Value::String(s.as_ref().to_string())
    }

    pub fn key<T: AsRef<str>>(s: T) -> Self {
        Value::Key(s.as_ref().to_string())
    }

    pub fn vector(x: f32, y: f32, z: f32) -> Self {
        Value::Vector(Vector3::new(x, y, z))
    }

    pub fn quaternion(x: f32, y: f32, z: f32, s: f32) -> Self {
        Value::Quaternion(Quaternion::new(x, y, z, s))
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Integer(_) => ValueType::Integer,
            Value::Float(_) => ValueType::Float,
            Value::String(_) => ValueType::String,
            Value::Key(_) => ValueType::Key,
            Value::Vector(_) => ValueType::Vector,
            Value::Quaternion(_) => ValueType::Quaternion,
            Value::List(_) => ValueType::List,
        }
    }

    /// Bytes of heap payload needed to store this value (excluding
    /// the entry header)
    ///
    /// Lists hold addresses of separately allocated children so list
    /// payloads don't include the size of their elements.
    pub fn payload_size(&self) -> usize {
        match self {
            Value::Integer(_) | Value::Float(_) => 4,
            Value::String(s) | Value::Key(s) => s.len() + 1,
            Value::Vector(_) => 12,
            Value::Quaternion(_) => 16,
            Value::List(items) => LIST_COUNT_SIZE + LIST_SLOT_SIZE * items.len(),
        }
    }

    /// Text of a string or key
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::Key(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn into_list(self) -> Option<Vec<Value>> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// True unless this is a list directly containing a list
    pub fn is_flat(&self) -> bool {
        match self {
            Value::List(items) => !items.iter().any(|v| matches!(v, Value::List(_))),
            _ => true,
        }
    }

    pub fn check_flat(&self) -> Result<(), Fault> {
        if self.is_flat() {
            Ok(())
        } else {
            Err(Fault::NestingLists)
        }
    }

    /// Reject text (here or in list items) that a nul terminator
    /// would cut short
    pub fn check_text(&self) -> Result<(), Fault> {
        let nul = |s: &str| s.bytes().position(|b| b == 0);
        let found = match self {
            Value::String(s) | Value::Key(s) => nul(s),
            Value::List(items) => items.iter().find_map(|item| match item {
                Value::String(s) | Value::Key(s) => nul(s),
                _ => None,
            }),
            _ => None,
        };
        match found {
            Some(index) => Err(HeapFault::EmbeddedNul(index).into()),
            None => Ok(()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x:.6}"),
            Value::String(s) | Value::Key(s) => write!(f, "{s}"),
            Value::Vector(v) => write!(f, "<{:.6}, {:.6}, {:.6}>", v.x, v.y, v.z),
            Value::Quaternion(q) => {
                write!(f, "<{:.6}, {:.6}, {:.6}, {:.6}>", q.x, q.y, q.z, q.s)
            }
            Value::List(items) => write!(f, "[{}]", items.iter().join(", ")),
        }
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i)
    }
}

impl From<f32> for Value {
    fn from(x: f32) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::str(s)
    }
}

impl From<Vector3> for Value {
    fn from(v: Vector3) -> Self {
        Value::Vector(v)
    }
}

impl From<Quaternion> for Value {
    fn from(q: Quaternion) -> Self {
        Value::Quaternion(q)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    #[test]
    pub fn test_payload_sizes() {
        assert_eq!(Value::Integer(7).payload_size(), 4);
        assert_eq!(Value::Float(1.5).payload_size(), 4);
        assert_eq!(Value::str("").payload_size(), 1);
        assert_eq!(Value::key("abc").payload_size(), 4);
        assert_eq!(Value::vector(1.0, 2.0, 3.0).payload_size(), 12);
        assert_eq!(Value::Quaternion(Quaternion::default()).payload_size(), 16);
        let list = Value::List(vec![1.into(), "foo".into(), Value::Float(2.0)]);
        assert_eq!(list.payload_size(), 16);
    }

    #[test]
    pub fn test_flatness() {
        assert!(Value::Integer(1).is_flat());
        assert!(Value::List(vec![]).is_flat());
        assert!(Value::List(vec![1.into(), "x".into()]).is_flat());
        let nested = Value::List(vec![1.into(), Value::List(vec![])]);
        assert!(!nested.is_flat());
        assert_eq!(nested.check_flat(), Err(Fault::NestingLists));
    }

    #[test]
    pub fn test_embedded_nul_rejected() {
        assert!(Value::str("plain").check_text().is_ok());
        assert!(Value::Integer(0).check_text().is_ok());
        assert_eq!(
            Value::str("ab\0cd").check_text(),
            Err(Fault::Heap(HeapFault::EmbeddedNul(2)))
        );
        let list = Value::List(vec![1.into(), Value::key("\0")]);
        assert_eq!(list.check_text(), Err(Fault::Heap(HeapFault::EmbeddedNul(0))));
    }

    #[test]
    pub fn test_tags_round_trip() {
        for tag in 0u8..8 {
            let ty = ValueType::try_from(tag).unwrap();
            assert_eq!(ty.tag(), tag);
        }
        assert!(ValueType::try_from(8).is_err());
    }

    #[test]
    pub fn test_display() {
        let list = Value::List(vec![1.into(), "foo".into(), Value::vector(1.0, 2.0, 3.0)]);
        assert_eq!(
            format!("{list}"),
            "[1, foo, <1.000000, 2.000000, 3.000000>]"
        );
    }
}
