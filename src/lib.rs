mod asset;
mod util;
mod config;
mod validate;
pub mod map;
pub mod diff;

pub use asset::*;
pub use util::*;
pub use config::*;
pub use validate::*;
pub use tile_macros::load;

/// Asset manager reading from the file system, with every loader of this crate installed.
pub fn file_manager(path_prefix: Option<&str>) -> AssetManager {
    let mut manager = AssetManager::builder()
        .default_protocol(FileProtocol)
        .path_prefix(path_prefix)
        .build();
    map::install(&mut manager);
    manager
}
