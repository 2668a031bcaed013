use bitflags::bitflags;
use serde::Serialize;
use super::{Image, Properties, TileType};

/// Name of the bool property that marks a tile as solid.
pub const COLLIDES: &str = "collides";
/// Name of the float property holding the render height of a tile.
pub const HEIGHT: &str = "height";
/// Name of the bool property that marks a tile as water.
pub const IS_WATER: &str = "is_water";

#[derive(Clone, Default, Debug, Serialize)]
pub struct Tile {
    /// ID of tile local to its tileset
    pub id: u32,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub tile_type: Option<TileType>,
    #[serde(skip_serializing_if = "Properties::is_empty")]
    pub properties: Properties,
    /// Own image, only in image collection tilesets.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<Image>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probability: Option<f32>,
    /// Line of the <tile> element in its document.
    #[serde(skip)]
    pub line: u32,
}

impl Tile {

    pub fn new(id: u32) -> Self {
        Self { id, ..Default::default() }
    }

    /// A tile without a type is purely visual.
    pub fn is_typed(&self) -> bool {
        self.tile_type.is_some()
    }

    pub fn collides(&self) -> bool {
        self.properties.get_bool(COLLIDES).unwrap_or(false)
    }

    pub fn height(&self) -> Option<f32> {
        self.properties.get_float(HEIGHT)
    }

    pub fn is_water(&self) -> bool {
        self.properties.get_bool(IS_WATER).unwrap_or(false)
    }

    pub fn flags(&self) -> TileFlags {
        let mut flags = TileFlags::empty();
        flags.set(TileFlags::COLLIDES, self.collides());
        flags.set(TileFlags::WATER, self.is_water());
        flags.set(TileFlags::TYPED, self.is_typed());
        flags.set(TileFlags::HAS_HEIGHT, self.height().is_some());
        flags
    }
}

bitflags! {
    /// Summary of the well-known properties of a [`Tile`].
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct TileFlags: u8 {
        const COLLIDES      = 0b0001;
        const WATER         = 0b0010;
        const TYPED         = 0b0100;
        const HAS_HEIGHT    = 0b1000;
    }
}

/// Column and row of a tile in an atlas.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Default, Debug, Serialize)]
pub struct GridPos {
    pub column: u32,
    pub row: u32,
}

impl GridPos {
    /// Position of id in a grid with the number of columns specified.
    /// None if columns is 0.
    pub fn of(id: u32, columns: u32) -> Option<Self> {
        if columns == 0 {
            return None;
        }
        Some(Self { column: id % columns, row: id / columns })
    }

    /// Id at this position in a grid with the number of columns specified.
    /// None if it does not fit in a u32.
    pub fn to_id(self, columns: u32) -> Option<u32> {
        self.row.checked_mul(columns)?.checked_add(self.column)
    }
}

#[cfg(test)]
mod test {
    use crate::map::{GridPos, Properties, Property, PropertyValue, Tile, TileFlags, TileType};

    #[test]
    fn well_known_properties() {
        let mut tile = Tile::new(0);
        tile.tile_type = Some(TileType::parse("water").unwrap());
        tile.properties = Properties::from_iter([
            Property::new("collides", PropertyValue::Bool(true)),
            Property::new("height", PropertyValue::Float(-0.1)),
            Property::new("is_water", PropertyValue::Bool(true)),
        ]);
        assert!(tile.collides());
        assert!(tile.is_water());
        assert_eq!(Some(-0.1), tile.height());
        assert_eq!(TileFlags::all(), tile.flags());
    }

    #[test]
    fn untyped_tile_defaults() {
        let tile = Tile::new(7);
        assert!(!tile.collides());
        assert!(!tile.is_water());
        assert_eq!(None, tile.height());
        assert_eq!(TileFlags::empty(), tile.flags());
    }

    #[test]
    fn mistyped_property_is_not_read() {
        let mut tile = Tile::new(1);
        tile.properties.push(Property::new("collides", PropertyValue::String(String::from("true"))));
        assert!(!tile.collides());
    }

    #[test]
    fn grid_pos() {
        assert_eq!(Some(GridPos { column: 10, row: 5 }), GridPos::of(110, 20));
        assert_eq!(Some(GridPos { column: 19, row: 19 }), GridPos::of(399, 20));
        assert_eq!(None, GridPos::of(3, 0));
        assert_eq!(Some(247), GridPos { column: 7, row: 12 }.to_id(20));
        assert_eq!(None, GridPos { column: 0, row: u32::MAX / 10 }.to_id(20));
        assert_eq!(None, GridPos { column: 1, row: 1 }.to_id(u32::MAX));
    }
}
