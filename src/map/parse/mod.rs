//! Structs defined here mirror those in [`crate::map`].
//! The main difference is that they're mostly a 1:1 mapping of the tsx format
//! and keep tiles as they appear in the document, duplicates included.
mod tileset;

pub use tileset::*;
