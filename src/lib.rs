extern crate bitflags;
extern crate itertools;
extern crate log;
extern crate serde_json;
extern crate structopt;
extern crate thiserror;

pub mod error;
pub mod export;
pub mod heap;
pub mod ops;
pub mod value;

pub use error::{ConfigError, Fault, HeapFault};
pub use heap::{HeapAddress, HeapSettings, ScriptHeap, ScriptMemory};
pub use value::{Quaternion, Value, ValueType, Vector3};
