//! Tile descriptor tables read from Tiled tileset (.tsx) files.
//! [`parse`] mirrors the document, [`Tileset`] is the id → [`Tile`] table built from it.
mod error;
mod tile;
mod tile_type;
mod property;
mod tileset;
pub mod parse;

pub use error::*;
pub use tile::*;
pub use tile_type::*;
pub use property::*;
pub use tileset::*;
pub use parse::Image;

use crate::AssetManager;

/// Registers the loaders of this module.
pub fn install(manager: &mut AssetManager) {
    manager.add_loader(TsxLoader);
}
