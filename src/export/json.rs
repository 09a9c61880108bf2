//! JSON export of heap snapshots

use std::io::{self, Write};

use serde_json::{json, Number};

use super::Dumper;
use crate::heap::{EntryRecord, HeapSnapshot, Payload};
use crate::value::Value;

fn float(x: f32) -> serde_json::Value {
    Number::from_f64(f64::from(x))
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}

/// JSON form of a single value
pub fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Integer(i) => json!(i),
        Value::Float(x) => float(*x),
        Value::String(s) => json!(s),
        Value::Key(k) => json!({ "key": k }),
        Value::Vector(v) => json!([float(v.x), float(v.y), float(v.z)]),
        Value::Quaternion(q) => json!([float(q.x), float(q.y), float(q.z), float(q.s)]),
        Value::List(items) => serde_json::Value::Array(items.iter().map(value_to_json).collect()),
    }
}

fn entry_to_json(entry: &EntryRecord) -> serde_json::Value {
    let value = match &entry.payload {
        Ok(Payload::Free) => serde_json::Value::Null,
        Ok(Payload::Scalar(value)) => value_to_json(value),
        Ok(Payload::List(children)) => children.iter().map(|a| a.raw()).collect(),
        Err(fault) => json!({ "error": fault.to_string() }),
    };

    json!({
        "offset": entry.offset,
        "address": entry.address.raw(),
        "type": entry.header.tag.name(),
        "ref_count": entry.header.ref_count,
        "size": entry.header.size,
        "value": value,
    })
}

pub fn snapshot_to_json(snapshot: &HeapSnapshot) -> serde_json::Value {
    json!({
        "heap_base": snapshot.heap_base,
        "heap_pointer": snapshot.heap_pointer,
        "fault": snapshot.fault_register,
        "entries": snapshot.entries.iter().map(entry_to_json).collect::<Vec<_>>(),
    })
}

pub struct JsonDumper<'a> {
    out: &'a mut (dyn Write + 'a),
}

impl<'a> JsonDumper<'a> {
    pub fn new(out: &'a mut (dyn Write + 'a)) -> Self {
        JsonDumper { out }
    }
}

impl Dumper for JsonDumper<'_> {
    fn dump(&mut self, snapshot: &HeapSnapshot) -> io::Result<()> {
        let text = serde_json::to_string_pretty(&snapshot_to_json(snapshot))?;
        writeln!(self.out, "{text}")
    }
}
