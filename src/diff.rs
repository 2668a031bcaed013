//! Differences between two exports of the same tileset.
use std::fmt;
use crate::map::{PropertyValue, Tile, TileType, Tileset};

/// Change of a single header attribute, rendered as text.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct FieldChange {
    pub field: &'static str,
    pub before: String,
    pub after: String,
}

#[derive(Clone, PartialEq, Debug)]
pub enum PropertyChange {
    Added { name: String, value: PropertyValue },
    Removed { name: String, value: PropertyValue },
    Changed { name: String, before: PropertyValue, after: PropertyValue },
}

/// Everything that differs between two descriptors of the same tile id.
#[derive(Clone, PartialEq, Default, Debug)]
pub struct TileChange {
    pub id: u32,
    /// Old and new type, if the type changed.
    pub tile_type: Option<(Option<TileType>, Option<TileType>)>,
    /// Old and new image source, if it changed.
    pub image: Option<(Option<String>, Option<String>)>,
    pub properties: Vec<PropertyChange>,
}

impl TileChange {
    fn is_empty(&self) -> bool {
        self.tile_type.is_none() && self.image.is_none() && self.properties.is_empty()
    }
}

#[derive(Clone, PartialEq, Default, Debug)]
pub struct TilesetDiff {
    pub header: Vec<FieldChange>,
    pub added: Vec<u32>,
    pub removed: Vec<u32>,
    pub changed: Vec<TileChange>,
}

impl TilesetDiff {
    pub fn is_empty(&self) -> bool {
        self.header.is_empty() && self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

/// Compares an older tileset with a newer one.
/// Ids are reported in ascending order.
pub fn diff(before: &Tileset, after: &Tileset) -> TilesetDiff {
    let mut diff = TilesetDiff {
        header: diff_header(before, after),
        ..Default::default()
    };
    for tile in before.tiles() {
        match after.get(tile.id) {
            Some(new_tile) => {
                let change = diff_tile(tile, new_tile);
                if !change.is_empty() {
                    diff.changed.push(change);
                }
            },
            None => diff.removed.push(tile.id),
        }
    }
    diff.added = after
        .tiles()
        .filter(|tile| before.get(tile.id).is_none())
        .map(|tile| tile.id)
        .collect();
    diff
}

fn diff_header(before: &Tileset, after: &Tileset) -> Vec<FieldChange> {
    let image_source = |tileset: &Tileset| tileset.image
        .as_ref()
        .map(|image| image.source.clone())
        .unwrap_or_default();
    let fields: [(&'static str, String, String); 8] = [
        ("name", before.name.clone(), after.name.clone()),
        ("tiledversion", before.tiled_version.clone(), after.tiled_version.clone()),
        ("tilewidth", before.tile_width.to_string(), after.tile_width.to_string()),
        ("tileheight", before.tile_height.to_string(), after.tile_height.to_string()),
        ("tilecount", before.tile_count.to_string(), after.tile_count.to_string()),
        ("columns", before.columns.to_string(), after.columns.to_string()),
        ("spacing/margin", format!("{}/{}", before.spacing, before.margin), format!("{}/{}", after.spacing, after.margin)),
        ("image", image_source(before), image_source(after)),
    ];
    fields
        .into_iter()
        .filter(|(_, before, after)| before != after)
        .map(|(field, before, after)| FieldChange { field, before, after })
        .collect()
}

fn diff_tile(before: &Tile, after: &Tile) -> TileChange {
    let mut change = TileChange { id: before.id, ..Default::default() };
    if before.tile_type != after.tile_type {
        change.tile_type = Some((before.tile_type.clone(), after.tile_type.clone()));
    }
    let before_image = before.image.as_ref().map(|image| image.source.clone());
    let after_image = after.image.as_ref().map(|image| image.source.clone());
    if before_image != after_image {
        change.image = Some((before_image, after_image));
    }

    for property in before.properties.iter() {
        let name = property.name.clone();
        match after.properties.get(&property.name) {
            Some(value) if *value == property.value => {},
            Some(value) => change.properties.push(PropertyChange::Changed {
                name,
                before: property.value.clone(),
                after: value.clone(),
            }),
            None => change.properties.push(PropertyChange::Removed { name, value: property.value.clone() }),
        }
    }
    for property in after.properties.iter() {
        if !before.properties.contains(&property.name) {
            change.properties.push(PropertyChange::Added {
                name: property.name.clone(),
                value: property.value.clone(),
            });
        }
    }
    change
}

impl fmt::Display for TilesetDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let type_name = |tile_type: &Option<TileType>| match tile_type {
            Some(tile_type) => tile_type.to_string(),
            None => String::from("(untyped)"),
        };
        for change in &self.header {
            writeln!(f, "~ {}: {} -> {}", change.field, change.before, change.after)?;
        }
        for id in &self.removed {
            writeln!(f, "- tile {id}")?;
        }
        for id in &self.added {
            writeln!(f, "+ tile {id}")?;
        }
        for change in &self.changed {
            writeln!(f, "~ tile {}", change.id)?;
            if let Some((before, after)) = &change.tile_type {
                writeln!(f, "    type: {} -> {}", type_name(before), type_name(after))?;
            }
            if let Some((before, after)) = &change.image {
                let before = before.as_deref().unwrap_or("(none)");
                let after = after.as_deref().unwrap_or("(none)");
                writeln!(f, "    image: {before} -> {after}")?;
            }
            for property in &change.properties {
                match property {
                    PropertyChange::Added { name, value } => writeln!(f, "    + {name} = {value}")?,
                    PropertyChange::Removed { name, value } => writeln!(f, "    - {name} = {value}")?,
                    PropertyChange::Changed { name, before, after } => writeln!(f, "    ~ {name}: {before} -> {after}")?,
                }
            }
        }
        Ok(())
    }
}
