//! Plain text heap listing
use std::io::{self, Write};

use super::Dumper;
use crate::heap::HeapSnapshot;

/// Writes one line per entry after the high-water mark
pub struct TextDumper<'a> {
    out: &'a mut (dyn Write + 'a),
}

impl<'a> TextDumper<'a> {
    pub fn new(out: &'a mut (dyn Write + 'a)) -> Self {
        TextDumper { out }
    }
}

impl Dumper for TextDumper<'_> {
    fn dump(&mut self, snapshot: &HeapSnapshot) -> io::Result<()> {
        write!(self.out, "{snapshot}")
    }
}
