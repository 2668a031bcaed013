//! Data-integrity checks over a loaded [`Tileset`].
//! Validation never fails. It reports [`Issue`]s, which the caller decides what to do with.
use std::fmt;
use std::path::Path;
use derive_more::*;
use tracing::instrument;
use crate::map::{PropertyType, PropertyValue, Tile, Tileset};
use crate::{HashSet, ValidationConfig};

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => f.write_str("warning"),
            Self::Error => f.write_str("error"),
        }
    }
}

#[derive(Clone, PartialEq, Debug, Display)]
pub enum IssueKind {
    #[display(fmt="tile {id} was already defined, this definition is ignored")]
    DuplicateTileId { id: u32 },
    #[display(fmt="tile id {id} is outside of the {tile_count} tiles of the atlas")]
    IdOutOfRange { id: u32, tile_count: u32 },
    #[display(fmt="property '{name}' is {value}, which is not a finite number")]
    NonFiniteFloat { name: String, value: f32 },
    #[display(fmt="property '{name}' should be {expected} but is {found}")]
    WrongPropertyType { name: String, expected: PropertyType, found: PropertyType },
    #[display(fmt="property '{name}' is defined more than once")]
    DuplicateProperty { name: String },
    #[display(fmt="property '{name}' is not a known property")]
    UnknownProperty { name: String },
    #[display(fmt="tile has properties but no type")]
    UntypedWithProperties,
    #[display(fmt="tile size {width}x{height} is empty")]
    EmptyTileSize { width: u32, height: u32 },
    #[display(fmt="atlas has no image")]
    MissingAtlasImage,
    #[display(fmt="image {width}x{height} holds {derived_columns}x{derived_rows} tiles, but the tileset declares {columns} columns and {tile_count} tiles")]
    AtlasGridMismatch {
        width: u32,
        height: u32,
        columns: u32,
        tile_count: u32,
        derived_columns: u32,
        derived_rows: u32,
    },
    #[display(fmt="tile has no image in an image collection")]
    MissingTileImage,
    #[display(fmt="image collection declares {declared} tiles but has {actual}")]
    TileCountMismatch { declared: u32, actual: u32 },
    #[display(fmt="image '{source}' could not be read: {reason}")]
    ImageUnreadable { source: String, reason: String },
    #[display(fmt="image '{source}' is declared {declared_width}x{declared_height} but is {width}x{height}")]
    ImageSizeMismatch {
        source: String,
        declared_width: u32,
        declared_height: u32,
        width: u32,
        height: u32,
    },
}

impl IssueKind {
    pub fn severity(&self) -> Severity {
        match self {
            Self::DuplicateTileId { .. } => Severity::Error,
            Self::IdOutOfRange { .. } => Severity::Error,
            Self::NonFiniteFloat { .. } => Severity::Error,
            Self::WrongPropertyType { .. } => Severity::Error,
            Self::DuplicateProperty { .. } => Severity::Error,
            Self::EmptyTileSize { .. } => Severity::Error,
            Self::ImageUnreadable { .. } => Severity::Error,
            Self::UnknownProperty { .. } => Severity::Warning,
            Self::UntypedWithProperties => Severity::Warning,
            Self::MissingAtlasImage => Severity::Warning,
            Self::AtlasGridMismatch { .. } => Severity::Warning,
            Self::MissingTileImage => Severity::Warning,
            Self::TileCountMismatch { .. } => Severity::Warning,
            Self::ImageSizeMismatch { .. } => Severity::Warning,
        }
    }
}

/// Single problem found in a tileset.
#[derive(Clone, PartialEq, Debug)]
pub struct Issue {
    pub severity: Severity,
    /// Tile the issue is about, if any.
    pub tile: Option<u32>,
    /// Line of the offending element, if known.
    pub line: Option<u32>,
    pub kind: IssueKind,
}

impl Issue {
    pub fn new(kind: IssueKind) -> Self {
        Self { severity: kind.severity(), tile: None, line: None, kind }
    }

    fn on_tile(kind: IssueKind, tile: &Tile) -> Self {
        Self {
            severity: kind.severity(),
            tile: Some(tile.id),
            line: (tile.line > 0).then_some(tile.line),
            kind,
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.severity)?;
        if let Some(line) = self.line {
            write!(f, " (line {line})")?;
        }
        if let Some(tile) = self.tile {
            write!(f, " tile {tile}")?;
        }
        write!(f, ": {}", self.kind)
    }
}

/// All issues found in one tileset, ordered by tile id then line.
#[derive(Clone, PartialEq, Default, Debug)]
pub struct Report {
    pub issues: Vec<Issue>,
}

impl Report {

    pub fn errors(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(|issue| issue.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(|issue| issue.severity == Severity::Warning)
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// True if the report should fail a check.
    pub fn fails(&self, deny_warnings: bool) -> bool {
        self.has_errors() || (deny_warnings && !self.issues.is_empty())
    }

    /// Adds issues, keeping the report ordered.
    pub fn extend(&mut self, issues: impl IntoIterator<Item = Issue>) {
        self.issues.extend(issues);
        self.sort();
    }

    fn sort(&mut self) {
        self.issues.sort_by_key(|issue| (issue.tile.is_some(), issue.tile, issue.line));
    }
}

/// Checks tilesets against a [`ValidationConfig`].
#[derive(Clone, Default, Debug)]
pub struct Validator {
    config: ValidationConfig,
}

impl Validator {

    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Runs every check, including the image check when enabled in the config.
    #[instrument(skip_all, fields(tileset = %tileset.name))]
    pub fn validate(&self, tileset: &Tileset) -> Report {
        let mut issues = self.check_layout(tileset);
        for tile in tileset.tiles() {
            issues.extend(self.check_tile(tileset, tile));
        }
        for tile in &tileset.shadowed {
            issues.push(Issue::on_tile(IssueKind::DuplicateTileId { id: tile.id }, tile));
        }
        let mut report = Report::default();
        report.extend(issues);
        if self.config.check_images {
            report.extend(check_images(tileset));
        }
        report
    }

    /// Checks tile size, and the atlas grid or image collection against the tiles declared.
    fn check_layout(&self, tileset: &Tileset) -> Vec<Issue> {
        let mut issues = Vec::new();
        if tileset.tile_width == 0 || tileset.tile_height == 0 {
            issues.push(Issue::new(IssueKind::EmptyTileSize {
                width: tileset.tile_width,
                height: tileset.tile_height,
            }));
            return issues;
        }

        if !tileset.is_atlas() {
            let with_image = tileset.tiles().filter(|tile| tile.image.is_some()).count() as u32;
            if with_image != tileset.tile_count {
                issues.push(Issue::new(IssueKind::TileCountMismatch {
                    declared: tileset.tile_count,
                    actual: with_image,
                }));
            }
            return issues;
        }

        let Some(image) = &tileset.image else {
            issues.push(Issue::new(IssueKind::MissingAtlasImage));
            return issues;
        };
        if let (Some(width), Some(height)) = (image.width, image.height) {
            let (derived_columns, derived_rows) = tileset.grid_fit(width, height);
            let derived_count = derived_columns as u64 * derived_rows as u64;
            if derived_columns != tileset.columns || derived_count != tileset.tile_count as u64 {
                issues.push(Issue::new(IssueKind::AtlasGridMismatch {
                    width,
                    height,
                    columns: tileset.columns,
                    tile_count: tileset.tile_count,
                    derived_columns,
                    derived_rows,
                }));
            }
        }
        issues
    }

    fn check_tile(&self, tileset: &Tileset, tile: &Tile) -> Vec<Issue> {
        let mut issues = Vec::new();
        let mut push = |kind: IssueKind| issues.push(Issue::on_tile(kind, tile));

        if tileset.is_atlas() && !tileset.contains_id(tile.id) {
            push(IssueKind::IdOutOfRange { id: tile.id, tile_count: tileset.tile_count });
        }
        if !tileset.is_atlas() && tile.image.is_none() {
            push(IssueKind::MissingTileImage);
        }
        if self.config.require_type_with_properties && !tile.is_typed() && !tile.properties.is_empty() {
            push(IssueKind::UntypedWithProperties);
        }

        let mut seen = HashSet::default();
        for property in tile.properties.iter() {
            let name = &property.name;
            if !seen.insert(name.as_str()) {
                push(IssueKind::DuplicateProperty { name: name.clone() });
            }
            if let PropertyValue::Float(value) = property.value {
                if !value.is_finite() {
                    push(IssueKind::NonFiniteFloat { name: name.clone(), value });
                }
            }
            match self.config.known_properties.get(name) {
                Some(expected) if *expected != property.value.property_type() => {
                    push(IssueKind::WrongPropertyType {
                        name: name.clone(),
                        expected: *expected,
                        found: property.value.property_type(),
                    });
                },
                Some(_) => {},
                None if self.config.warn_unknown_properties => {
                    push(IssueKind::UnknownProperty { name: name.clone() });
                },
                None => {},
            }
        }
        issues
    }
}

/// Opens every image the tileset references and compares its real size with the declared one.
/// Image paths are resolved the same way the tileset resolved them when it was loaded.
#[instrument(skip_all, fields(tileset = %tileset.name))]
pub fn check_images(tileset: &Tileset) -> Vec<Issue> {
    let mut issues = Vec::new();
    let atlas = tileset.image.iter().map(|image| (None, image));
    let per_tile = tileset.tiles().filter_map(|tile| Some((Some(tile), tile.image.as_ref()?)));
    for (tile, image) in atlas.chain(per_tile) {
        let kind = match image::image_dimensions(Path::new(&image.source)) {
            Ok((width, height)) => {
                let declared_width = image.width.unwrap_or(width);
                let declared_height = image.height.unwrap_or(height);
                if (declared_width, declared_height) == (width, height) {
                    continue;
                }
                IssueKind::ImageSizeMismatch {
                    source: image.source.clone(),
                    declared_width,
                    declared_height,
                    width,
                    height,
                }
            },
            Err(err) => IssueKind::ImageUnreadable {
                source: image.source.clone(),
                reason: err.to_string(),
            },
        };
        let issue = match tile {
            Some(tile) => Issue::on_tile(kind, tile),
            None => Issue::new(kind),
        };
        issues.push(issue);
    }
    issues
}

#[cfg(test)]
mod test {
    use crate::map::{PropertyType, Tileset};
    use crate::ValidationConfig;
    use super::{IssueKind, Severity, Validator};

    fn validate(source: &str, config: ValidationConfig) -> super::Report {
        let tileset = Tileset::parse_str(source, None).unwrap();
        Validator::new(config).validate(&tileset)
    }

    #[test]
    fn clean_atlas() {
        let report = validate(r#"<tileset name="clean" tilewidth="16" tileheight="16" tilecount="4" columns="2">
 <image source="clean.png" width="32" height="32"/>
 <tile id="3" type="wall">
  <properties>
   <property name="collides" type="bool" value="true"/>
   <property name="height" type="float" value="1"/>
  </properties>
 </tile>
</tileset>"#, ValidationConfig::default());
        assert!(report.is_clean(), "{:?}", report.issues);
        assert!(!report.fails(true));
    }

    #[test]
    fn tile_errors() {
        let report = validate(r#"<tileset name="broken" tilewidth="16" tileheight="16" tilecount="4" columns="2">
 <image source="broken.png" width="32" height="32"/>
 <tile id="1" type="pond">
  <properties>
   <property name="height" type="float" value="NaN"/>
   <property name="is_water" type="string" value="true"/>
   <property name="height" type="float" value="1"/>
  </properties>
 </tile>
 <tile id="1" type="pond"/>
 <tile id="9" type="rock"/>
</tileset>"#, ValidationConfig::default());

        let kinds: Vec<&IssueKind> = report.issues.iter().map(|issue| &issue.kind).collect();
        assert!(matches!(kinds[0], IssueKind::NonFiniteFloat { .. }), "{kinds:?}");
        assert!(kinds.contains(&&IssueKind::WrongPropertyType {
            name: String::from("is_water"),
            expected: PropertyType::Bool,
            found: PropertyType::String,
        }));
        assert!(kinds.contains(&&IssueKind::DuplicateProperty { name: String::from("height") }));
        assert!(kinds.contains(&&IssueKind::DuplicateTileId { id: 1 }));
        assert!(kinds.contains(&&IssueKind::IdOutOfRange { id: 9, tile_count: 4 }));
        assert_eq!(5, report.errors().count());
        assert_eq!(0, report.warnings().count());
        assert!(report.fails(false));

        let duplicate = report.issues.iter().find(|issue| issue.kind == IssueKind::DuplicateTileId { id: 1 }).unwrap();
        assert_eq!(Some(10), duplicate.line);
        assert_eq!(Some(1), duplicate.tile);
    }

    #[test]
    fn warnings_follow_config() {
        let source = r#"<tileset name="warn" tilewidth="16" tileheight="16" tilecount="4" columns="2">
 <image source="warn.png" width="48" height="32"/>
 <tile id="0">
  <properties>
   <property name="speed" type="int" value="3"/>
  </properties>
 </tile>
</tileset>"#;
        let report = validate(source, ValidationConfig::default());
        assert_eq!(2, report.warnings().count(), "{:?}", report.issues);
        assert!(!report.has_errors());
        assert!(!report.fails(false));
        assert!(report.fails(true));
        assert!(matches!(report.issues[0].kind, IssueKind::AtlasGridMismatch { derived_columns: 3, derived_rows: 2, .. }));
        assert_eq!(Severity::Warning, report.issues[1].severity);

        let config = ValidationConfig {
            warn_unknown_properties: false,
            require_type_with_properties: true,
            ..Default::default()
        };
        let report = validate(source, config);
        let kinds: Vec<&IssueKind> = report.issues.iter().map(|issue| &issue.kind).collect();
        assert!(kinds.contains(&&IssueKind::UntypedWithProperties));
        assert!(!kinds.iter().any(|kind| matches!(kind, IssueKind::UnknownProperty { .. })));
    }

    #[test]
    fn image_collection() {
        let report = validate(r#"<tileset name="tiles" tilewidth="16" tileheight="16" tilecount="3" columns="0">
 <tile id="0"><image source="green.png" width="16" height="16"/></tile>
 <tile id="7"/>
</tileset>"#, ValidationConfig::default());
        let kinds: Vec<&IssueKind> = report.issues.iter().map(|issue| &issue.kind).collect();
        assert_eq!(vec![
            &IssueKind::TileCountMismatch { declared: 3, actual: 1 },
            &IssueKind::MissingTileImage,
        ], kinds);
    }

    #[test]
    fn missing_images_are_reported() {
        let config = ValidationConfig { check_images: true, ..Default::default() };
        let report = validate(r#"<tileset name="tiles" tilewidth="16" tileheight="16" tilecount="4" columns="2">
 <image source="does/not/exist.png" width="32" height="32"/>
</tileset>"#, config);
        assert_eq!(1, report.issues.len());
        assert!(matches!(report.issues[0].kind, IssueKind::ImageUnreadable { .. }));
        assert!(report.issues[0].to_string().starts_with("error: image 'does/not/exist.png'"));
    }

    #[test]
    fn atlas_without_image() {
        let report = validate(r#"<tileset name="bare" tilewidth="16" tileheight="16" tilecount="4" columns="2">
 <tile id="0" type="wall"/>
</tileset>"#, ValidationConfig::default());
        assert_eq!(1, report.issues.len());
        assert_eq!(IssueKind::MissingAtlasImage, report.issues[0].kind);
        assert_eq!(Severity::Warning, report.issues[0].severity);
        assert_eq!(None, report.issues[0].tile);
    }

    #[test]
    fn huge_spacing_and_margin() {
        let report = validate(r#"<tileset name="spaced" tilewidth="16" tileheight="16" spacing="4294967295" margin="4294967295" tilecount="4" columns="2">
 <image source="spaced.png" width="32" height="32"/>
 <tile id="3" type="wall"/>
</tileset>"#, ValidationConfig::default());
        assert_eq!(1, report.issues.len(), "{:?}", report.issues);
        assert!(matches!(report.issues[0].kind, IssueKind::AtlasGridMismatch { derived_columns: 0, derived_rows: 0, .. }));

        let report = validate(r#"<tileset name="wide" tilewidth="1" tileheight="1" tilecount="4294967295" columns="4294967295">
 <image source="wide.png" width="4294967295" height="4294967295"/>
</tileset>"#, ValidationConfig::default());
        assert_eq!(1, report.issues.len(), "{:?}", report.issues);
        assert!(matches!(report.issues[0].kind, IssueKind::AtlasGridMismatch { derived_rows: 4294967295, .. }));
    }

    #[test]
    fn image_sizes_are_compared() {
        let dir = tempfile::TempDir::new().unwrap();
        image::RgbaImage::new(32, 16).save(dir.path().join("atlas.png")).unwrap();
        let parent = dir.path().to_str().unwrap();
        let config = ValidationConfig { check_images: true, ..Default::default() };

        let matching = Tileset::parse_str(r#"<tileset name="atlas" tilewidth="16" tileheight="16" tilecount="2" columns="2">
 <image source="atlas.png" width="32" height="16"/>
</tileset>"#, Some(parent)).unwrap();
        let report = Validator::new(config.clone()).validate(&matching);
        assert!(report.is_clean(), "{:?}", report.issues);

        let stale = Tileset::parse_str(r#"<tileset name="atlas" tilewidth="16" tileheight="16" tilecount="4" columns="2">
 <image source="atlas.png" width="32" height="32"/>
</tileset>"#, Some(parent)).unwrap();
        let report = Validator::new(config).validate(&stale);
        assert_eq!(1, report.issues.len(), "{:?}", report.issues);
        assert_eq!(Severity::Warning, report.issues[0].severity);
        assert!(matches!(
            report.issues[0].kind,
            IssueKind::ImageSizeMismatch { declared_width: 32, declared_height: 32, width: 32, height: 16, .. },
        ));
    }

    #[test]
    fn empty_tile_size() {
        let report = validate(r#"<tileset name="zero" tilewidth="0" tileheight="16" tilecount="0" columns="0"/>"#, ValidationConfig::default());
        assert_eq!(1, report.issues.len());
        assert!(report.has_errors());
    }
}
