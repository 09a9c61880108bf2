//! String concatenation and comparison on heap operands
use std::cmp::Ordering;

use crate::error::{Fault, HeapFault};
use crate::heap::{HeapAddress, Registers, ScriptHeap};
use crate::value::{Value, ValueType};

fn text(value: Value) -> Result<String, Fault> {
    match value {
        Value::String(s) | Value::Key(s) => Ok(s),
        other => Err(HeapFault::TypeMismatch {
            expected: ValueType::String,
            found: other.value_type(),
        }
        .into()),
    }
}

/// Consume two strings (or keys) and allocate their concatenation
pub fn concat_strings<R: Registers>(
    heap: &mut ScriptHeap<'_, R>,
    a: HeapAddress,
    b: HeapAddress,
) -> HeapAddress {
    heap.guarded(HeapAddress::NULL, |heap| {
        let mut joined = text(heap.take(a)?)?;
        joined.push_str(&text(heap.take(b)?)?);
        heap.insert(&Value::String(joined))
    })
}

/// Consume two strings (or keys) and compare them bytewise
///
/// Returns -1, 0 or 1.
pub fn compare_strings<R: Registers>(
    heap: &mut ScriptHeap<'_, R>,
    a: HeapAddress,
    b: HeapAddress,
) -> i32 {
    heap.guarded(0, |heap| {
        let left = text(heap.take(a)?)?;
        let right = text(heap.take(b)?)?;
        Ok(match left.as_bytes().cmp(right.as_bytes()) {
            Ordering::Less => -1,
            Ordering::Equal => 0,
            Ordering::Greater => 1,
        })
    })
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::heap::{FaultBits, HeapSettings, HeapState, ScriptMemory};

    #[test]
    pub fn test_concat_frees_operands() {
        let mut mem = ScriptMemory::new(&HeapSettings::default()).unwrap();
        let mut heap = mem.heap();
        // live entries either side keep the operand slots from merging
        let a = heap.allocate(&Value::str("abc"));
        heap.allocate(&Value::Integer(0));
        let b = heap.allocate(&Value::key("def"));
        heap.allocate(&Value::Integer(0));

        let c = concat_strings(&mut heap, a, b);
        assert_eq!(heap.read(c), Some(Value::str("abcdef")));
        assert!(heap.entry(a).unwrap().is_free());
        assert!(heap.entry(b).unwrap().is_free());
        assert_eq!(heap.stats().used_entries, 3);
    }

    #[test]
    pub fn test_concat_reuses_merged_operand_slots() {
        let mut mem = ScriptMemory::new(&HeapSettings::default()).unwrap();
        let mut heap = mem.heap();
        let a = heap.allocate(&Value::str("abc"));
        let b = heap.allocate(&Value::str("def"));

        // the freed neighbours merge into one 15 byte slot, too small
        // to split for 7 so the result takes all of it
        let c = concat_strings(&mut heap, a, b);
        assert_eq!(c, a);
        assert_eq!(heap.entry(c).unwrap().size, 15);
        assert_eq!(heap.read(c), Some(Value::str("abcdef")));
        assert_eq!(heap.stats().used_entries, 1);
    }

    #[test]
    pub fn test_compare() {
        let mut mem = ScriptMemory::new(&HeapSettings::default()).unwrap();
        let mut heap = mem.heap();
        let cases = [("a", "b", -1), ("b", "a", 1), ("same", "same", 0), ("", "x", -1)];
        for (left, right, expected) in cases {
            let a = heap.allocate(&Value::str(left));
            let b = heap.allocate(&Value::str(right));
            assert_eq!(compare_strings(&mut heap, a, b), expected);
        }
        assert!(!heap.is_poisoned());
    }

    #[test]
    pub fn test_type_mismatch_is_heap_error() {
        let mut mem = ScriptMemory::new(&HeapSettings::default()).unwrap();
        let mut heap = mem.heap();
        let a = heap.allocate(&Value::str("abc"));
        let b = heap.allocate(&Value::Integer(4));
        assert!(concat_strings(&mut heap, a, b).is_null());
        assert_eq!(heap.state(), HeapState::Poisoned(FaultBits::HEAP_ERROR));
        assert_eq!(compare_strings(&mut heap, a, b), 0);
    }
}
