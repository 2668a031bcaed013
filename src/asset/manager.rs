use derive_more::*;
use rayon::prelude::*;
use std::any::TypeId;
use std::sync::Arc;
use tracing::instrument;
use crate::{Asset, AssetLoader, AssetPath, DynAsset, DynLoader, HashMap, PathHash, Protocol};

/// Responsible for loading assets and caching them by path.
/// Loaded assets are immutable and shared with [`Arc`].
pub struct AssetManager {
    path_prefix: Option<String>,
    protocols: HashMap<String, Arc<dyn Protocol>>,
    default_protocol: Option<String>,
    loaders: Vec<Arc<dyn DynLoader>>,
    extension_to_loader: HashMap<String, usize>,
    path_to_asset: HashMap<PathHash, CachedAsset>,
}

impl AssetManager {

    pub fn new() -> Self {
        Self {
            path_prefix: None,
            protocols: HashMap::default(),
            default_protocol: None,
            loaders: Vec::default(),
            extension_to_loader: HashMap::default(),
            path_to_asset: HashMap::default(),
        }
    }

    pub fn builder() -> AssetManagerBuilder {
        AssetManagerBuilder { manager: Self::new() }
    }

    /// Directory prepended to the body of every path loaded from now on.
    pub fn set_path_prefix<S: Into<String>>(&mut self, prefix: Option<S>) {
        self.path_prefix = prefix.map(|s| s.into());
    }

    /// Adds a protocol for use in loading bytes for asset loaders.
    pub fn add_protocol(&mut self, protocol: impl Protocol, is_default: bool) {
        let name = String::from(protocol.name());
        self.protocols.insert(name.clone(), Arc::new(protocol));
        if is_default {
            self.default_protocol = Some(name);
        }
    }

    /// Adds a loader for transforming file bytes into assets.
    /// Panics if one of its extensions is already handled by another loader.
    pub fn add_loader(&mut self, loader: impl AssetLoader) {
        if let Err(err) = self.try_add_loader(loader) {
            panic!("{err}");
        }
    }

    /// Adds a loader for transforming file bytes into assets.
    pub fn try_add_loader(&mut self, loader: impl AssetLoader) -> Result<(), LoadError> {
        for extension in loader.extensions() {
            if self.extension_to_loader.contains_key(*extension) {
                return Err(LoadError::ExtensionOverlaps);
            }
        }
        let loader_index = self.loaders.len();
        for extension in loader.extensions() {
            self.extension_to_loader.insert(String::from(*extension), loader_index);
        }
        self.loaders.push(Arc::new(loader));
        Ok(())
    }

    /// Inserts an asset manually under the path specified, replacing whatever was cached there.
    pub fn insert<A: Asset>(&mut self, path: impl AsRef<str>, asset: A) -> Arc<A> {
        let asset = Arc::new(asset);
        let path_hash = PathHash::of(path.as_ref());
        self.path_to_asset.insert(path_hash, CachedAsset {
            asset_type: TypeId::of::<A>(),
            asset: asset.clone(),
        });
        asset
    }

    /// Gets an asset that was already loaded or inserted.
    pub fn get<A: Asset>(&self, path: impl AsRef<str>) -> Option<Arc<A>> {
        let cached = self.path_to_asset.get(&PathHash::of(path.as_ref()))?;
        cached.downcast().ok()
    }

    /// True if an asset is cached at the path specified.
    pub fn contains(&self, path: impl AsRef<str>) -> bool {
        self.path_to_asset.contains_key(&PathHash::of(path.as_ref()))
    }

    /// Removes an asset from the cache.
    /// Outstanding [`Arc`]s stay valid.
    pub fn remove(&mut self, path: impl AsRef<str>) -> bool {
        self.path_to_asset.remove(&PathHash::of(path.as_ref())).is_some()
    }

    /// Number of cached assets.
    pub fn len(&self) -> usize {
        self.path_to_asset.len()
    }

    pub fn is_empty(&self) -> bool {
        self.path_to_asset.is_empty()
    }

    /// Loads an asset, or returns the cached one.
    pub fn load<A, P>(&mut self, path: P) -> Result<Arc<A>, LoadError>
    where
        A: Asset,
        P: AsRef<str>,
    {
        let path = path.as_ref();
        let path_hash = PathHash::of(path);
        self.fast_load(path, path_hash)
    }

    /// Loads an asset, or returns the cached one.
    /// Assumes that path_hash is the hash of path.
    /// Usually invoked through the [`load!`](crate::load) macro, which hashes the path at compile time.
    pub fn fast_load<A: Asset>(&mut self, path: &str, path_hash: PathHash) -> Result<Arc<A>, LoadError> {

        // Returns cloned asset if already stored.
        if let Some(cached) = self.path_to_asset.get(&path_hash) {
            log::debug!("Cache hit for '{path}'");
            return cached.downcast();
        }

        let asset = self.read_and_decode::<A>(path)?;
        let cached = CachedAsset { asset_type: TypeId::of::<A>(), asset };
        let result = cached.downcast();
        self.path_to_asset.insert(path_hash, cached);
        result
    }

    /// Loads many assets of the same type.
    /// Reading and decoding happens in parallel. Results are cached afterwards, in order.
    /// Output is parallel to the input paths.
    #[instrument(skip_all)]
    pub fn load_all<A, P>(&mut self, paths: &[P]) -> Vec<Result<Arc<A>, LoadError>>
    where
        A: Asset,
        P: AsRef<str> + Sync,
    {
        let decoded: Vec<(PathHash, Result<DynAsset, LoadError>)> = paths
            .par_iter()
            .map(|path| {
                let path = path.as_ref();
                let path_hash = PathHash::of(path);
                match self.path_to_asset.get(&path_hash) {
                    Some(cached) => (path_hash, Ok(cached.asset.clone())),
                    None => (path_hash, self.read_and_decode::<A>(path)),
                }
            })
            .collect();

        // Paths repeated within the batch resolve to the first cached copy.
        decoded
            .into_iter()
            .map(|(path_hash, result)| {
                if let Some(cached) = self.path_to_asset.get(&path_hash) {
                    return cached.downcast();
                }
                let cached = CachedAsset { asset_type: TypeId::of::<A>(), asset: result? };
                let downcast = cached.downcast();
                self.path_to_asset.insert(path_hash, cached);
                downcast
            })
            .collect()
    }

    /// Parses path, fetches protocol and loader, then reads and decodes the file.
    fn read_and_decode<A: Asset>(&self, path: &str) -> Result<DynAsset, LoadError> {
        let mut asset_path = AssetPath::parse(path, self.default_protocol.as_deref())?;
        asset_path.prefix = self.path_prefix.clone();
        let protocol = match self.protocols.get(&asset_path.protocol) {
            Some(protocol) => protocol.clone(),
            None => return Err(LoadError::NoSuchProtocol),
        };
        let loader = match self.extension_to_loader.get(&asset_path.extension) {
            Some(loader_idx) => self.loaders[*loader_idx].clone(),
            None => return Err(LoadError::NoSuchLoader),
        };
        if loader.asset_type() != TypeId::of::<A>() {
            return Err(LoadError::IncorrectAssetType);
        }

        log::debug!("Loading '{asset_path}'");
        let bytes = protocol.read(&asset_path).map_err(|err| {
            log::error!("{err}");
            LoadError::Failed { path: asset_path.to_string(), reason: err.to_string() }
        })?;
        loader.dyn_load(&bytes, &asset_path).map_err(|err| {
            log::error!("{asset_path}: {err}");
            LoadError::Failed { path: asset_path.to_string(), reason: format!("{err:#}") }
        })
    }
}

impl Default for AssetManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Fluent construction of an [`AssetManager`].
pub struct AssetManagerBuilder {
    manager: AssetManager,
}

impl AssetManagerBuilder {

    pub fn default_protocol(mut self, protocol: impl Protocol) -> Self {
        self.manager.add_protocol(protocol, true);
        self
    }

    pub fn protocol(mut self, protocol: impl Protocol) -> Self {
        self.manager.add_protocol(protocol, false);
        self
    }

    /// Panics if one of the loader's extensions overlaps with a loader added earlier.
    pub fn loader(mut self, loader: impl AssetLoader) -> Self {
        self.manager.add_loader(loader);
        self
    }

    pub fn path_prefix<S: Into<String>>(mut self, prefix: Option<S>) -> Self {
        self.manager.set_path_prefix(prefix);
        self
    }

    pub fn build(self) -> AssetManager {
        self.manager
    }
}

#[derive(Clone)]
struct CachedAsset {
    asset_type: TypeId,
    asset: DynAsset,
}

impl CachedAsset {
    fn downcast<A: Asset>(&self) -> Result<Arc<A>, LoadError> {
        if self.asset_type != TypeId::of::<A>() {
            return Err(LoadError::IncorrectAssetType);
        }
        self.asset.clone().downcast::<A>().map_err(|_| LoadError::IncorrectAssetType)
    }
}

#[derive(Error, Debug, Display, Clone, Eq, PartialEq)]
pub enum LoadError {
    #[display(fmt="Incorrect asset type")]
    IncorrectAssetType,
    #[display(fmt="No default protocol")]
    NoDefaultProtocol,
    #[display(fmt="No such protocol")]
    NoSuchProtocol,
    #[display(fmt="No loader matching extension")]
    NoSuchLoader,
    #[display(fmt="Path missing extension")]
    PathMissingExtension,
    #[display(fmt="Supported extension of one loader overlaps with another")]
    ExtensionOverlaps,
    #[display(fmt="Failed to load '{path}': {reason}")]
    Failed { path: String, reason: String },
}

#[cfg(test)]
mod test {
    use std::sync::Arc;
    use crate::{AssetLoader, AssetManager, AssetPath, AssetResult, LoadError, MemoryProtocol, RawProtocol};

    #[derive(Debug, PartialEq)]
    struct Text(String);
    impl crate::Asset for Text {}

    struct TextLoader;
    impl AssetLoader for TextLoader {
        type AssetType = Text;
        fn load(&self, bytes: &[u8], _path: &AssetPath) -> AssetResult<Text> {
            Ok(Text(String::from_utf8(bytes.to_vec())?))
        }
        fn extensions(&self) -> &[&str] { &["txt"] }
    }

    struct OtherLoader;
    impl AssetLoader for OtherLoader {
        type AssetType = u32;
        fn load(&self, _bytes: &[u8], _path: &AssetPath) -> AssetResult<u32> { Ok(0) }
        fn extensions(&self) -> &[&str] { &["bin", "txt"] }
    }
    impl crate::Asset for u32 {}

    fn manager() -> AssetManager {
        AssetManager::builder()
            .default_protocol(MemoryProtocol::new()
                .with_file("a.txt", "alpha")
                .with_file("b.txt", "beta")
                .with_file("bad.txt", vec![0xFF, 0xFE])
            )
            .protocol(RawProtocol::from("raw text"))
            .loader(TextLoader)
            .build()
    }

    #[test]
    fn load_and_cache() {
        let mut manager = manager();
        let first: Arc<Text> = manager.load("a.txt").unwrap();
        let second: Arc<Text> = manager.load("a.txt").unwrap();
        assert_eq!(Text(String::from("alpha")), *first);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(1, manager.len());

        let raw: Arc<Text> = manager.load("raw://anything.txt").unwrap();
        assert_eq!("raw text", raw.0);
    }

    #[test]
    fn load_failures() {
        let mut manager = manager();
        assert_eq!(Err(LoadError::NoSuchLoader), manager.load::<Text, _>("a.png").map(|_| ()));
        assert_eq!(Err(LoadError::NoSuchProtocol), manager.load::<Text, _>("ftp://a.txt").map(|_| ()));
        assert_eq!(Err(LoadError::IncorrectAssetType), manager.load::<u32, _>("a.txt").map(|_| ()));
        assert!(matches!(manager.load::<Text, _>("missing.txt"), Err(LoadError::Failed { .. })));
        assert!(matches!(manager.load::<Text, _>("bad.txt"), Err(LoadError::Failed { .. })));
        assert!(manager.is_empty());
    }

    #[test]
    fn overlapping_extensions() {
        let mut manager = manager();
        assert_eq!(Err(LoadError::ExtensionOverlaps), manager.try_add_loader(OtherLoader));
    }

    #[test]
    fn load_all_in_parallel() {
        let mut manager = manager();
        let cached: Arc<Text> = manager.load("b.txt").unwrap();
        let results = manager.load_all::<Text, _>(&["a.txt", "b.txt", "missing.txt", "a.txt"]);
        assert_eq!(4, results.len());
        assert_eq!("alpha", results[0].as_ref().unwrap().0);
        assert!(Arc::ptr_eq(&cached, results[1].as_ref().unwrap()));
        assert!(results[2].is_err());
        assert!(Arc::ptr_eq(results[0].as_ref().unwrap(), results[3].as_ref().unwrap()));
        assert_eq!(2, manager.len());
    }

    #[test]
    fn insert_get_remove() {
        let mut manager = manager();
        manager.insert("virtual.txt", Text(String::from("inserted")));
        assert_eq!("inserted", manager.get::<Text>("virtual.txt").unwrap().0);
        assert!(manager.get::<u32>("virtual.txt").is_none());
        assert!(manager.remove("virtual.txt"));
        assert!(!manager.contains("virtual.txt"));
    }
}
