use std::collections::BTreeMap;
use std::path::Path;
use anyhow::Context;
use serde::Deserialize;
use crate::map::{PropertyType, COLLIDES, HEIGHT, IS_WATER};

/// Settings read from a YAML file. Every field is optional.
#[derive(Clone, PartialEq, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory prepended to every tileset path.
    pub path_prefix: Option<String>,
    pub validation: ValidationConfig,
}

impl Config {

    pub fn from_yaml(source: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(source)?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config '{}'", path.display()))?;
        Self::from_yaml(&source)
            .with_context(|| format!("Invalid config '{}'", path.display()))
    }
}

/// Rules applied by a [`Validator`](crate::Validator).
#[derive(Clone, PartialEq, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidationConfig {
    /// Property names the game understands, and the type each must have.
    pub known_properties: BTreeMap<String, PropertyType>,
    /// Warns about properties missing from known_properties.
    pub warn_unknown_properties: bool,
    /// Warns about tiles that carry properties but no type.
    pub require_type_with_properties: bool,
    /// Opens every referenced image to compare its real size with the declared one.
    pub check_images: bool,
    /// Treats warnings as failures.
    pub deny_warnings: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        let known_properties = [
            (COLLIDES, PropertyType::Bool),
            (HEIGHT, PropertyType::Float),
            (IS_WATER, PropertyType::Bool),
        ];
        Self {
            known_properties: known_properties
                .into_iter()
                .map(|(name, property_type)| (String::from(name), property_type))
                .collect(),
            warn_unknown_properties: true,
            require_type_with_properties: false,
            check_images: false,
            deny_warnings: false,
        }
    }
}

#[cfg(test)]
mod test {
    use crate::map::PropertyType;
    use super::{Config, ValidationConfig};

    #[test]
    fn empty_is_default() {
        assert_eq!(Config::default(), Config::from_yaml("{}").unwrap());
        let defaults = ValidationConfig::default();
        assert_eq!(Some(&PropertyType::Float), defaults.known_properties.get("height"));
        assert!(defaults.warn_unknown_properties);
        assert!(!defaults.check_images);
    }

    #[test]
    fn partial_override() {
        let config = Config::from_yaml("
path_prefix: assets
validation:
  known_properties:
    collides: bool
    speed: int
  check_images: true
").unwrap();
        assert_eq!(Some("assets"), config.path_prefix.as_deref());
        assert_eq!(2, config.validation.known_properties.len());
        assert_eq!(Some(&PropertyType::Int), config.validation.known_properties.get("speed"));
        assert!(config.validation.check_images);
        assert!(config.validation.warn_unknown_properties);
    }

    #[test]
    fn rejects_unknown_fields_and_types() {
        assert!(Config::from_yaml("validaton: {}").is_err());
        assert!(Config::from_yaml("validation: { known_properties: { height: double } }").is_err());
    }
}
