use std::any::Any;

/**
 * Shareable resource loaded from a file, like a tileset.
 */
pub trait Asset: Any + Send + Sync + 'static {
    /**
     * Paths of other files this asset refers to, if any.
     * Paths are already resolved against the directory of the asset itself.
     */
    fn dependencies(&self) -> Vec<String> {
        Vec::new()
    }
}
