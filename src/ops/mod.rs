//! Composite operations built on allocate, read and release
pub mod list;
pub mod prng;
pub mod string;

pub use list::{append_to_list, compare_lists, concat_lists, prepend_to_list, shuffle};
pub use prng::{RandomIndex, SplitMix64};
pub use string::{compare_strings, concat_strings};
