use roxmltree::{Document, Node};
use serde::Serialize;
use crate::map::{ExportSettings, FillMode, Grid, ObjectAlignment, Properties, Tile, TileOffset, TileRenderSize, TileType, TsxParseError};

/// A mostly 1:1 mapping of the TSX <tileset> element.
/// Tiles are kept in document order, duplicates included.
#[derive(Clone, Default, Debug)]
pub struct Tileset {
    pub version: String,
    pub tiled_version: String,
    pub name: String,
    pub class: String,
    pub tile_width: u32,
    pub tile_height: u32,
    pub spacing: u32,
    pub margin: u32,
    pub tile_count: u32,
    pub columns: u32,
    pub object_alignment: ObjectAlignment,
    pub tile_render_size: TileRenderSize,
    pub fill_mode: FillMode,
    pub tile_offset: Option<TileOffset>,
    pub grid: Option<Grid>,
    pub image: Option<Image>,
    pub export: Option<ExportSettings>,
    pub properties: Properties,
    pub tiles: Vec<Tile>,
}

impl Tileset {

    /// Parses a whole .tsx document.
    /// Image sources are prefixed with parent_path when present.
    pub fn parse_str(source: &str, parent_path: Option<&str>) -> Result<Self, TsxParseError> {
        let doc = Document::parse(source)?;
        Self::parse_doc(doc, parent_path)
    }

    pub fn parse_doc(doc: Document, parent_path: Option<&str>) -> Result<Self, TsxParseError> {
        let mut tileset = Tileset::default();
        let root = doc.root_element();
        match root.tag_name().name() {
            "tileset" => tileset.parse(root, parent_path)?,
            tag_name => return Err(TsxParseError::UnexpectedTagError { tag_name: String::from(tag_name) }),
        }
        Ok(tileset)
    }

    pub fn parse(&mut self, tileset_node: Node, parent_path: Option<&str>) -> Result<(), TsxParseError> {

        // Parses attributes
        for attribute in tileset_node.attributes() {
            let name = attribute.name();
            let value = attribute.value();
            match name {
                "version" => self.version = String::from(value),
                "tiledversion" => self.tiled_version = String::from(value),
                "name" => self.name = String::from(value),
                "class" => self.class = String::from(value),
                "tilewidth" => self.tile_width = value.parse()?,
                "tileheight" => self.tile_height = value.parse()?,
                "spacing" => self.spacing = value.parse()?,
                "margin" => self.margin = value.parse()?,
                "tilecount" => self.tile_count = value.parse()?,
                "columns" => self.columns = value.parse()?,
                "objectalignment" => self.object_alignment = ObjectAlignment::parse(value)?,
                "tilerendersize" => self.tile_render_size = TileRenderSize::parse(value)?,
                "fillmode" => self.fill_mode = FillMode::parse(value)?,
                _ => {}
            }
        }

        // Parses children
        for child in tileset_node.children().filter(Node::is_element) {
            let line = line_of(child);
            let result = match child.tag_name().name() {
                "image" => Image::parse(child, parent_path).map(|image| self.image = Some(image)),
                "grid" => Grid::parse(child).map(|grid| self.grid = Some(grid)),
                "tileoffset" => TileOffset::parse(child).map(|offset| self.tile_offset = Some(offset)),
                "editorsettings" => ExportSettings::parse(child).map(|export| self.export = export),
                "properties" => Properties::parse(child).map(|properties| self.properties = properties),
                "tile" => parse_tile(child, parent_path).map(|tile| self.tiles.push(tile)),
                _ => Ok(()),
            };
            result.map_err(|err| err.at_line(line))?;
        }
        Ok(())
    }
}

/// Parses a <tile> element and its children.
fn parse_tile(tile_node: Node, parent_path: Option<&str>) -> Result<Tile, TsxParseError> {
    let id = tile_node
        .attribute("id")
        .ok_or_else(|| TsxParseError::MissingAttribute {
            tag_name: String::from("tile"),
            attribute: String::from("id"),
        })?
        .parse()?;
    let mut tile = Tile::new(id);
    tile.line = line_of(tile_node);

    // Tiled 1.9 renamed "type" to "class"
    let tag = tile_node
        .attribute("type")
        .or_else(|| tile_node.attribute("class"))
        .filter(|tag| !tag.is_empty());
    if let Some(tag) = tag {
        tile.tile_type = Some(TileType::parse(tag)?);
    }
    if let Some(probability) = tile_node.attribute("probability") {
        tile.probability = Some(probability.parse()?);
    }

    for child in tile_node.children().filter(Node::is_element) {
        match child.tag_name().name() {
            "properties" => tile.properties = Properties::parse(child)?,
            "image" => tile.image = Some(Image::parse(child, parent_path)?),
            _ => {}
        }
    }
    Ok(tile)
}

fn line_of(node: Node) -> u32 {
    node.document().text_pos_at(node.range().start).row
}

#[derive(Clone, Eq, PartialEq, Default, Debug, Serialize)]
pub struct Image {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub format: String,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trans: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

impl Image {
    pub fn parse(image_node: Node, parent_path: Option<&str>) -> Result<Image, TsxParseError> {
        let mut image = Image::default();
        for attribute in image_node.attributes() {
            let name = attribute.name();
            let value = attribute.value();
            match name {
                "format" => image.format = String::from(value),
                "source" => {
                    let source = match parent_path {
                        Some(parent) => format!("{parent}/{value}"),
                        None => String::from(value),
                    };
                    image.source = source;
                },
                "trans" => image.trans = Some(String::from(value)),
                "width" => image.width = Some(value.parse()?),
                "height" => image.height = Some(value.parse()?),
                _ => {}
            }
        }
        Ok(image)
    }
}
