//! Dumping heap contents for inspection
pub mod json;
pub mod text;

use std::io::{self, Write};

use crate::heap::HeapSnapshot;
use json::JsonDumper;
use text::TextDumper;

/// Writes a heap snapshot in some format
pub trait Dumper {
    fn dump(&mut self, snapshot: &HeapSnapshot) -> io::Result<()>;
}

/// Create a dumper for the format specified
///
/// Return None if the format is not recognised.
pub fn create_dumper<'a, S: AsRef<str>>(
    format: S,
    output: &'a mut (dyn Write + 'a),
) -> Option<Box<dyn Dumper + 'a>> {
    match format.as_ref() {
        "json" => Some(Box::new(JsonDumper::new(output))),
        "text" => Some(Box::new(TextDumper::new(output))),
        _ => None,
    }
}
