use std::fmt;
use serde::{Serialize, Serializer};
use crate::map::TsxParseError;

/// Hierarchical type tag of a tile, like `ground::grass` or `npc_librarian::book`.
/// Segments are separated by `::`, are never empty, and never contain `:`.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct TileType(String);

impl TileType {

    pub const SEPARATOR: &'static str = "::";

    pub fn parse(tag: &str) -> Result<Self, TsxParseError> {
        let valid = tag
            .split(Self::SEPARATOR)
            .all(|segment| !segment.is_empty() && !segment.contains(':') && segment.trim() == segment);
        if !valid {
            return Err(TsxParseError::InvalidTileType { tag: String::from(tag) });
        }
        Ok(Self(String::from(tag)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First segment. `ground` for `ground::grass`.
    pub fn category(&self) -> &str {
        match self.0.split_once(Self::SEPARATOR) {
            Some((category, _)) => category,
            None => &self.0,
        }
    }

    /// Everything after the first segment. `grass` for `ground::grass`.
    pub fn variant(&self) -> Option<&str> {
        self.0
            .split_once(Self::SEPARATOR)
            .map(|(_, variant)| variant)
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(Self::SEPARATOR)
    }

    /// True if the leading segments of this tag equal those of prefix.
    /// `ground` contains `ground::grass`, but not `groundhog`.
    pub fn is_within(&self, prefix: &str) -> bool {
        if prefix.is_empty() {
            return true;
        }
        let mut segments = self.segments();
        prefix
            .split(Self::SEPARATOR)
            .all(|prefix_segment| segments.next() == Some(prefix_segment))
    }
}

impl fmt::Display for TileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for TileType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

#[cfg(test)]
mod test {
    use super::TileType;

    #[test]
    fn category_and_variant() {
        let tile_type = TileType::parse("npc_librarian::no_book").unwrap();
        assert_eq!("npc_librarian", tile_type.category());
        assert_eq!(Some("no_book"), tile_type.variant());

        let tile_type = TileType::parse("wall").unwrap();
        assert_eq!("wall", tile_type.category());
        assert_eq!(None, tile_type.variant());

        let tile_type = TileType::parse("a::b::c").unwrap();
        assert_eq!(Some("b::c"), tile_type.variant());
        assert_eq!(vec!["a", "b", "c"], tile_type.segments().collect::<Vec<_>>());
    }

    #[test]
    fn within() {
        let tile_type = TileType::parse("ground::grass").unwrap();
        assert!(tile_type.is_within("ground"));
        assert!(tile_type.is_within("ground::grass"));
        assert!(tile_type.is_within(""));
        assert!(!tile_type.is_within("ground::grass::tall"));
        assert!(!tile_type.is_within("ground::gr"));
        assert!(!TileType::parse("groundhog").unwrap().is_within("ground"));
    }

    #[test]
    fn malformed() {
        for tag in ["", "::", "ground::", "::grass", "a:::b", "a:b", " wall", "a:: b"] {
            assert!(TileType::parse(tag).is_err(), "'{tag}' should be rejected");
        }
    }
}
