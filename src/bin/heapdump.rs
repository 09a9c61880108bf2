extern crate scriptheap;

use std::io::{self, Write};
use std::path::PathBuf;
use std::process;

use pretty_hex::pretty_hex;
use structopt::StructOpt;

use scriptheap::export::create_dumper;
use scriptheap::heap::{HeapSettings, ScriptMemory};

/// Inspect the heap in a script memory image
#[derive(StructOpt, Debug)]
#[structopt(name = "heapdump")]
struct Opt {
    #[structopt(flatten)]
    settings: HeapSettings,

    /// Output JSON rather than a text listing
    #[structopt(long = "json")]
    json: bool,

    /// Hex dump the heap region after the listing
    #[structopt(long = "hex")]
    hex: bool,

    /// Print occupancy statistics to stderr before exiting
    #[structopt(short = "S", long = "statistics")]
    statistics: bool,

    /// Memory image to read
    #[structopt(parse(from_os_str))]
    image: PathBuf,
}

pub fn main() {
    let opt = Opt::from_args();

    let mut memory = match ScriptMemory::load(&opt.image, &opt.settings) {
        Ok(memory) => memory,
        Err(e) => {
            eprintln!("{}: {e}", opt.image.display());
            process::exit(2)
        }
    };

    let heap = memory.heap();
    let snapshot = heap.snapshot();
    let stats = heap.stats();
    let poisoned = heap.is_poisoned();

    let format = if opt.json { "json" } else { "text" };
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut result = match create_dumper(format, &mut out) {
        Some(mut dumper) => dumper.dump(&snapshot),
        None => Ok(()),
    };
    if result.is_ok() && opt.hex {
        result = writeln!(out, "{}", pretty_hex(&memory.heap_region()));
    }

    if let Err(e) = result {
        eprintln!("{e}");
        process::exit(2)
    }

    if opt.statistics {
        eprintln!();
        eprintln!("~~~~~~~~~~");
        eprintln!("STATISTICS");
        eprintln!("~~~~~~~~~~");
        eprintln!();
        eprintln!("{stats}");
    }

    process::exit(if poisoned { 1 } else { 0 })
}
