// Path helpers shared by the matcher, topology and config loader.

pub mod resolve;

pub use resolve::{expand_home, lexical_normalize, relative_slash, resolve_lossy};
