//! Message parsing: header-block location, decoding, and lookup.

pub mod header;
