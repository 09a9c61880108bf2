//! List operations on heap operands
//!
//! Each operation decodes its list operands with consuming reads and
//! allocates the result as a fresh entry.
use crate::error::{Fault, HeapFault};
use crate::heap::{HeapAddress, Registers, ScriptHeap};
use crate::value::{Value, ValueType};

use super::prng::RandomIndex;

fn elements(value: Value) -> Result<Vec<Value>, Fault> {
    match value {
        Value::List(items) => Ok(items),
        other => Err(HeapFault::TypeMismatch {
            expected: ValueType::List,
            found: other.value_type(),
        }
        .into()),
    }
}

/// Consume two lists and allocate the second appended to the first
pub fn concat_lists<R: Registers>(
    heap: &mut ScriptHeap<'_, R>,
    a: HeapAddress,
    b: HeapAddress,
) -> HeapAddress {
    heap.guarded(HeapAddress::NULL, |heap| {
        let mut items = elements(heap.take(a)?)?;
        items.extend(elements(heap.take(b)?)?);
        heap.insert(&Value::List(items))
    })
}

/// Consume two lists and return the difference in their lengths
///
/// Comparing a list with itself releases it only once.
pub fn compare_lists<R: Registers>(
    heap: &mut ScriptHeap<'_, R>,
    a: HeapAddress,
    b: HeapAddress,
) -> i32 {
    heap.guarded(0, |heap| {
        let left = if a == b { heap.decode(a)? } else { heap.take(a)? };
        let left = elements(left)?;
        let right = elements(heap.take(b)?)?;
        Ok(left.len() as i32 - right.len() as i32)
    })
}

/// Consume `list` and allocate it with `values` in front
pub fn prepend_to_list<R: Registers>(
    heap: &mut ScriptHeap<'_, R>,
    values: &[Value],
    list: HeapAddress,
) -> HeapAddress {
    heap.guarded(HeapAddress::NULL, |heap| {
        let tail = elements(heap.take(list)?)?;
        let items: Vec<Value> = values.iter().cloned().chain(tail).collect();
        heap.insert(&Value::List(items))
    })
}

/// Consume `list` and allocate it with `values` after it
pub fn append_to_list<R: Registers>(
    heap: &mut ScriptHeap<'_, R>,
    list: HeapAddress,
    values: &[Value],
) -> HeapAddress {
    heap.guarded(HeapAddress::NULL, |heap| {
        let mut items = elements(heap.take(list)?)?;
        items.extend_from_slice(values);
        heap.insert(&Value::List(items))
    })
}

/// Shuffle `values` as consecutive tuples of `stride` elements
///
/// Tuples are never split. A list whose length is not a multiple of
/// the stride comes back unchanged and a stride below one counts as
/// one.
pub fn shuffle<G: RandomIndex>(mut values: Vec<Value>, stride: i32, rng: &mut G) -> Vec<Value> {
    let stride = usize::try_from(stride).unwrap_or(0).max(1);
    if values.is_empty() || values.len() % stride != 0 {
        return values;
    }

    let buckets = values.len() / stride;
    for i in (1..buckets).rev() {
        let j = rng.index(i + 1);
        if i != j {
            for k in 0..stride {
                values.swap(i * stride + k, j * stride + k);
            }
        }
    }
    values
}
