use std::any::{Any, TypeId};
use std::sync::Arc;
use crate::{Asset, AssetPath};

/// Takes the contents of a file, and converts them into an asset.
pub trait AssetLoader: Send + Sync + 'static {
    type AssetType: Asset;
    fn load(&self, bytes: &[u8], path: &AssetPath) -> AssetResult<Self::AssetType>;
    fn extensions(&self) -> &[&str];
}

impl<L: AssetLoader> DynLoader for L {

    fn dyn_load(&self, bytes: &[u8], path: &AssetPath) -> anyhow::Result<DynAsset> {
        let asset = self.load(bytes, path)?;
        Ok(Arc::new(asset))
    }

    fn asset_type(&self) -> TypeId {
        TypeId::of::<L::AssetType>()
    }
}

/// Dynamic trait variant of [`AssetLoader`].
pub(crate) trait DynLoader: Send + Sync + 'static {
    fn dyn_load(&self, bytes: &[u8], path: &AssetPath) -> anyhow::Result<DynAsset>;
    fn asset_type(&self) -> TypeId;
}

/// Type-erased asset as stored in the cache of an [`AssetManager`](crate::AssetManager).
pub(crate) type DynAsset = Arc<dyn Any + Send + Sync + 'static>;

pub type AssetResult<A> = anyhow::Result<A>;
