use roxmltree::Node;
use serde::{Serialize, Serializer};
use crate::map::{parse, GridPos, Image, Properties, Tile, TileFlags, TileType, TsxParseError};
use crate::{Asset, AssetLoader, AssetPath, AssetResult, IntMap, URect};

/// Loader for a .tsx file.
/// Outputs a [`Tileset`].
pub struct TsxLoader;
impl AssetLoader for TsxLoader {
    type AssetType = Tileset;

    fn load(&self, bytes: &[u8], path: &AssetPath) -> AssetResult<Tileset> {
        let xml_source = std::str::from_utf8(bytes)?;
        let parsed_tileset = parse::Tileset::parse_str(xml_source, path.parent().as_deref())?;
        let mut tileset = Tileset::from_parsed(parsed_tileset);
        tileset.path = Some(path.without_protocol());
        log::debug!("Loaded tileset '{}' with {} described tiles", tileset.name, tileset.len());
        Ok(tileset)
    }

    fn extensions(&self) -> &[&str] {
        &["tsx"]
    }
}

/// Table of tile descriptors keyed by tile id.
/// Built from a [`parse::Tileset`]. The first <tile> with a given id wins, later ones are kept in `shadowed`.
#[derive(Clone, Default, Debug, Serialize)]
pub struct Tileset {
    /// Where the tileset was loaded from, if it came from a file.
    #[serde(skip)]
    pub path: Option<String>,
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub class: String,
    pub version: String,
    pub tiled_version: String,
    pub tile_width: u32,
    pub tile_height: u32,
    pub spacing: u32,
    pub margin: u32,
    pub tile_count: u32,
    pub columns: u32,
    pub object_alignment: ObjectAlignment,
    pub tile_render_size: TileRenderSize,
    pub fill_mode: FillMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tile_offset: Option<TileOffset>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grid: Option<Grid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<Image>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export: Option<ExportSettings>,
    #[serde(skip_serializing_if = "Properties::is_empty")]
    pub properties: Properties,
    #[serde(serialize_with = "serialize_tiles")]
    tiles: IntMap<u32, Tile>,
    /// Sorted ids of `tiles`.
    #[serde(skip)]
    ids: Vec<u32>,
    /// Tiles whose id was already described earlier in the document.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub shadowed: Vec<Tile>,
}

impl Tileset {

    pub fn from_parsed(parsed_tileset: parse::Tileset) -> Self {
        let mut tiles = IntMap::default();
        let mut shadowed = Vec::new();
        for tile in parsed_tileset.tiles {
            if tiles.contains_key(&tile.id) {
                log::warn!(
                    "Tileset '{}': tile {} on line {} redefines an earlier tile and is ignored",
                    parsed_tileset.name, tile.id, tile.line,
                );
                shadowed.push(tile);
            }
            else {
                tiles.insert(tile.id, tile);
            }
        }
        let mut ids: Vec<u32> = tiles.keys().copied().collect();
        ids.sort_unstable();
        Self {
            path: None,
            name: parsed_tileset.name,
            class: parsed_tileset.class,
            version: parsed_tileset.version,
            tiled_version: parsed_tileset.tiled_version,
            tile_width: parsed_tileset.tile_width,
            tile_height: parsed_tileset.tile_height,
            spacing: parsed_tileset.spacing,
            margin: parsed_tileset.margin,
            tile_count: parsed_tileset.tile_count,
            columns: parsed_tileset.columns,
            object_alignment: parsed_tileset.object_alignment,
            tile_render_size: parsed_tileset.tile_render_size,
            fill_mode: parsed_tileset.fill_mode,
            tile_offset: parsed_tileset.tile_offset,
            grid: parsed_tileset.grid,
            image: parsed_tileset.image,
            export: parsed_tileset.export,
            properties: parsed_tileset.properties,
            tiles,
            ids,
            shadowed,
        }
    }

    /// Parses a .tsx document held in memory.
    pub fn parse_str(source: &str, parent_path: Option<&str>) -> Result<Self, TsxParseError> {
        parse::Tileset::parse_str(source, parent_path).map(Self::from_parsed)
    }

    /// Descriptor of the tile with the id specified.
    /// None for ids that carry no metadata.
    pub fn get(&self, id: u32) -> Option<&Tile> {
        self.tiles.get(&id)
    }

    pub fn tile_type(&self, id: u32) -> Option<&TileType> {
        self.get(id)?.tile_type.as_ref()
    }

    /// True if id addresses a tile of this tileset, described or not.
    pub fn contains_id(&self, id: u32) -> bool {
        id < self.tile_count
    }

    /// Number of described tiles.
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Described tiles in ascending id order.
    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.ids.iter().filter_map(|id| self.tiles.get(id))
    }

    /// Tiles whose type lies within the prefix specified, like `ground` or `npc_librarian::book`.
    pub fn tiles_within<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a Tile> {
        self.tiles().filter(move |tile| match &tile.tile_type {
            Some(tile_type) => tile_type.is_within(prefix),
            None => false,
        })
    }

    /// Tiles that have all of the flags specified.
    pub fn tiles_with(&self, flags: TileFlags) -> impl Iterator<Item = &Tile> {
        self.tiles().filter(move |tile| tile.flags().contains(flags))
    }

    /// True if the tileset is one image sliced into a grid.
    /// False for image collections, where every tile has its own image.
    pub fn is_atlas(&self) -> bool {
        self.columns > 0
    }

    pub fn rows(&self) -> u32 {
        match self.columns {
            0 => 0,
            columns => self.tile_count.div_ceil(columns),
        }
    }

    /// Position of a tile in the atlas.
    /// None for image collections and for ids beyond the tile count.
    pub fn grid_pos(&self, id: u32) -> Option<GridPos> {
        if !self.contains_id(id) {
            return None;
        }
        GridPos::of(id, self.columns)
    }

    /// Id of the tile at a position in the atlas.
    pub fn id_at(&self, column: u32, row: u32) -> Option<u32> {
        if column >= self.columns {
            return None;
        }
        let id = GridPos { column, row }.to_id(self.columns)?;
        self.contains_id(id).then_some(id)
    }

    /// Pixel rectangle of a tile within the image it is drawn from.
    /// None if the rectangle lies beyond what u32 coordinates can address.
    pub fn region(&self, id: u32) -> Option<URect> {
        if !self.is_atlas() {
            let image = self.get(id)?.image.as_ref()?;
            let width = image.width.unwrap_or(self.tile_width);
            let height = image.height.unwrap_or(self.tile_height);
            return Some(URect::new(0, 0, width, height));
        }
        let pos = self.grid_pos(id)?;
        let offset = |index: u32, size: u32| {
            let step = size as u64 + self.spacing as u64;
            let pixels = (index as u64).checked_mul(step)?.checked_add(self.margin as u64)?;
            u32::try_from(pixels).ok()
        };
        let x = offset(pos.column, self.tile_width)?;
        let y = offset(pos.row, self.tile_height)?;
        Some(URect::new(x, y, self.tile_width, self.tile_height))
    }

    /// Columns and rows of whole tiles an image of the size specified holds, given margin and spacing.
    pub fn grid_fit(&self, width: u32, height: u32) -> (u32, u32) {
        let fit = |extent: u32, size: u32| {
            let step = size as u64 + self.spacing as u64;
            if step == 0 {
                return 0;
            }
            let usable = (extent as u64 + self.spacing as u64).saturating_sub(2 * self.margin as u64);
            u32::try_from(usable / step).unwrap_or(u32::MAX)
        };
        (fit(width, self.tile_width), fit(height, self.tile_height))
    }
}

impl Asset for Tileset {
    fn dependencies(&self) -> Vec<String> {
        let mut dependencies: Vec<String> = Vec::new();
        let images = self.image.iter().chain(self.tiles().filter_map(|tile| tile.image.as_ref()));
        for image in images {
            if !dependencies.contains(&image.source) {
                dependencies.push(image.source.clone());
            }
        }
        dependencies
    }
}

fn serialize_tiles<S: Serializer>(tiles: &IntMap<u32, Tile>, serializer: S) -> Result<S::Ok, S::Error> {
    let mut sorted: Vec<&Tile> = tiles.values().collect();
    sorted.sort_by_key(|tile| tile.id);
    serializer.collect_seq(sorted)
}

#[derive(Copy, Clone, Eq, PartialEq, Default, Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectAlignment {
    #[default]
    Unspecified,
    TopLeft,
    Top,
    TopRight,
    Left,
    Center,
    Right,
    BottomLeft,
    Bottom,
    BottomRight,
}

impl ObjectAlignment {
    pub fn parse(str: &str) -> Result<Self, TsxParseError> {
        match str {
            "unspecified" => Ok(Self::Unspecified),
            "topleft" => Ok(Self::TopLeft),
            "top" => Ok(Self::Top),
            "topright" => Ok(Self::TopRight),
            "left" => Ok(Self::Left),
            "center" => Ok(Self::Center),
            "right" => Ok(Self::Right),
            "bottomleft" => Ok(Self::BottomLeft),
            "bottom" => Ok(Self::Bottom),
            "bottomright" => Ok(Self::BottomRight),
            _ => Err(TsxParseError::InvalidAttributeValue { value: String::from(str) })
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Default, Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FillMode {
    #[default]
    Stretch,
    PreserveAspectFit,
}

impl FillMode {
    pub fn parse(str: &str) -> Result<Self, TsxParseError> {
        match str {
            "stretch" => Ok(Self::Stretch),
            "preserve-aspect-fit" => Ok(Self::PreserveAspectFit),
            _ => Err(TsxParseError::InvalidAttributeValue { value: String::from(str) })
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Default, Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TileRenderSize {
    #[default]
    Tile,
    Grid,
}

impl TileRenderSize {
    pub fn parse(str: &str) -> Result<Self, TsxParseError> {
        match str {
            "tile" => Ok(Self::Tile),
            "grid" => Ok(Self::Grid),
            _ => Err(TsxParseError::InvalidAttributeValue { value: String::from(str) })
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Default, Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Orthogonal,
    Isometric,
}

impl Orientation {
    pub fn parse(str: &str) -> Result<Self, TsxParseError> {
        match str {
            "orthogonal" => Ok(Self::Orthogonal),
            "isometric" => Ok(Self::Isometric),
            _ => Err(TsxParseError::InvalidAttributeValue { value: String::from(str) })
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Default, Debug, Serialize)]
pub struct TileOffset { pub x: i32, pub y: i32 }

impl TileOffset {
    pub fn parse(offset_node: Node) -> Result<Self, TsxParseError> {
        let mut offset = Self::default();
        if let Some(x) = offset_node.attribute("x") {
            offset.x = x.parse()?;
        }
        if let Some(y) = offset_node.attribute("y") {
            offset.y = y.parse()?;
        }
        Ok(offset)
    }
}

/// Grid used when rendering tiles of an image collection in the editor.
#[derive(Copy, Clone, Eq, PartialEq, Default, Debug, Serialize)]
pub struct Grid {
    pub orientation: Orientation,
    pub width: u32,
    pub height: u32,
}

impl Grid {
    pub fn parse(grid_node: Node) -> Result<Self, TsxParseError> {
        let mut grid = Self::default();
        for attribute in grid_node.attributes() {
            let value = attribute.value();
            match attribute.name() {
                "orientation" => grid.orientation = Orientation::parse(value)?,
                "width" => grid.width = value.parse()?,
                "height" => grid.height = value.parse()?,
                _ => {}
            }
        }
        Ok(grid)
    }
}

/// Export target remembered by the editor, like `fetch-tileset.lua` in format `lua`.
#[derive(Clone, Eq, PartialEq, Default, Debug, Serialize)]
pub struct ExportSettings {
    pub target: String,
    pub format: String,
}

impl ExportSettings {
    /// Reads the <export> child of an <editorsettings> element, if there is one.
    pub fn parse(settings_node: Node) -> Result<Option<Self>, TsxParseError> {
        let Some(export_node) = settings_node.children().find(|child| child.has_tag_name("export")) else {
            return Ok(None)
        };
        let attribute = |name: &str| {
            export_node
                .attribute(name)
                .map(String::from)
                .ok_or_else(|| TsxParseError::MissingAttribute {
                    tag_name: String::from("export"),
                    attribute: String::from(name),
                })
        };
        Ok(Some(Self {
            target: attribute("target")?,
            format: attribute("format")?,
        }))
    }
}

#[cfg(test)]
mod test {
    use crate::map::{GridPos, TileFlags};
    use crate::{Asset, AssetManager, MemoryProtocol, URect};
    use super::{Tileset, TsxLoader};

    const SOURCE: &str = r#"<tileset name="sample" tilewidth="16" tileheight="16" spacing="1" margin="2" tilecount="6" columns="3">
 <image source="sample.png" width="54" height="37"/>
 <tile id="0" type="ground::grass"/>
 <tile id="1" type="ground::clay"/>
 <tile id="4" type="wall">
  <properties>
   <property name="collides" type="bool" value="true"/>
   <property name="height" type="float" value="1"/>
  </properties>
 </tile>
 <tile id="0" type="ground::water"/>
 <tile id="5"/>
</tileset>"#;

    fn sample() -> Tileset {
        Tileset::parse_str(SOURCE, None).unwrap()
    }

    #[test]
    fn lookup() {
        let tileset = sample();
        assert_eq!(4, tileset.len());
        assert_eq!("ground::grass", tileset.tile_type(0).unwrap().as_str());
        assert!(tileset.get(4).unwrap().collides());
        assert_eq!(Some(1.0), tileset.get(4).unwrap().height());
        assert!(tileset.get(2).is_none());
        assert!(tileset.tile_type(5).is_none());
        assert!(tileset.contains_id(2));
        assert!(!tileset.contains_id(6));
    }

    #[test]
    fn first_definition_wins() {
        let tileset = sample();
        assert_eq!("ground::grass", tileset.tile_type(0).unwrap().as_str());
        assert_eq!(1, tileset.shadowed.len());
        assert_eq!(0, tileset.shadowed[0].id);
    }

    #[test]
    fn queries() {
        let tileset = sample();
        let ids: Vec<u32> = tileset.tiles().map(|tile| tile.id).collect();
        assert_eq!(vec![0, 1, 4, 5], ids);

        let ground: Vec<u32> = tileset.tiles_within("ground").map(|tile| tile.id).collect();
        assert_eq!(vec![0, 1], ground);

        let solid: Vec<u32> = tileset.tiles_with(TileFlags::COLLIDES | TileFlags::HAS_HEIGHT).map(|tile| tile.id).collect();
        assert_eq!(vec![4], solid);
    }

    #[test]
    fn grid_geometry() {
        let tileset = sample();
        assert!(tileset.is_atlas());
        assert_eq!(2, tileset.rows());
        assert_eq!(Some(GridPos { column: 1, row: 1 }), tileset.grid_pos(4));
        assert_eq!(None, tileset.grid_pos(6));
        assert_eq!(Some(5), tileset.id_at(2, 1));
        assert_eq!(None, tileset.id_at(3, 0));
        assert_eq!(None, tileset.id_at(0, 2));
        assert_eq!(Some(URect::new(19, 19, 16, 16)), tileset.region(4));
        assert_eq!((3, 2), tileset.grid_fit(54, 37));
        assert_eq!((3, 2), tileset.grid_fit(55, 38));
        assert_eq!((0, 0), tileset.grid_fit(3, 3));
    }

    #[test]
    fn huge_geometry_does_not_wrap() {
        let source = r#"<tileset name="wide" tilewidth="100000" tileheight="16" tilecount="200000" columns="100000"/>"#;
        let tileset = Tileset::parse_str(source, None).unwrap();
        assert_eq!(Some(GridPos { column: 99999, row: 0 }), tileset.grid_pos(99999));
        assert_eq!(None, tileset.region(99999));
        assert_eq!(Some(URect::new(0, 0, 100000, 16)), tileset.region(0));

        let sample = sample();
        assert_eq!(None, sample.id_at(0, u32::MAX / 10));
        assert_eq!(None, sample.id_at(2, u32::MAX));

        let source = r#"<tileset name="spaced" tilewidth="16" tileheight="16" spacing="4294967295" margin="4294967295" tilecount="4" columns="2"/>"#;
        let tileset = Tileset::parse_str(source, None).unwrap();
        assert_eq!((0, 0), tileset.grid_fit(32, 32));
        assert_eq!(None, tileset.region(3));

        let source = r#"<tileset name="vast" tilewidth="4294967295" tileheight="4294967295" spacing="4294967295" tilecount="4294967295" columns="4294967295"/>"#;
        let tileset = Tileset::parse_str(source, None).unwrap();
        assert_eq!(None, tileset.region(u32::MAX - 1));
        assert_eq!(Some(URect::new(0, 0, u32::MAX, u32::MAX)), tileset.region(0));
    }

    #[test]
    fn image_collection_regions() {
        let source = r#"<tileset name="tiles" tilewidth="16" tileheight="16" tilecount="2" columns="0">
 <tile id="0"><image source="green.png" width="32" height="16"/></tile>
 <tile id="1"><image source="green.png"/></tile>
</tileset>"#;
        let tileset = Tileset::parse_str(source, None).unwrap();
        assert!(!tileset.is_atlas());
        assert_eq!(0, tileset.rows());
        assert_eq!(None, tileset.grid_pos(0));
        assert_eq!(Some(URect::new(0, 0, 32, 16)), tileset.region(0));
        assert_eq!(Some(URect::new(0, 0, 16, 16)), tileset.region(1));
        assert_eq!(vec![String::from("green.png")], tileset.dependencies());
    }

    #[test]
    fn loads_through_manager() {
        let mut manager = AssetManager::builder()
            .default_protocol(MemoryProtocol::new().with_file("tiled/sample.tsx", SOURCE))
            .loader(TsxLoader)
            .build();
        let tileset = manager.load::<Tileset, _>("tiled/sample.tsx").unwrap();
        assert_eq!(Some("tiled/sample.tsx"), tileset.path.as_deref());
        assert_eq!(vec![String::from("tiled/sample.png")], tileset.dependencies());
    }

    #[test]
    fn dumps_tiles_in_order() {
        let yaml = serde_yaml::to_string(&sample()).unwrap();
        let grass = yaml.find("ground::grass").unwrap();
        let wall = yaml.find("type: wall").unwrap();
        assert!(grass < wall);
        assert!(yaml.contains("collides: true"));
        assert!(yaml.contains("object_alignment: unspecified"));
    }
}
