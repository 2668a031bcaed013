use std::fmt;
use roxmltree::Node;
use serde::{Deserialize, Serialize};
use crate::map::TsxParseError;

/// Declared type of a property, as written in the `type` attribute.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Default, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    Bool,
    Int,
    Float,
    #[default]
    String,
    Color,
    File,
    Object,
}

impl PropertyType {
    pub fn parse(str: &str) -> Option<Self> {
        match str {
            "bool" => Some(Self::Bool),
            "int" => Some(Self::Int),
            "float" => Some(Self::Float),
            "string" => Some(Self::String),
            "color" => Some(Self::Color),
            "file" => Some(Self::File),
            "object" => Some(Self::Object),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::String => "string",
            Self::Color => "color",
            Self::File => "file",
            Self::Object => "object",
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// ARGB color as written by Tiled, either `#AARRGGBB` or `#RRGGBB`.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct Color {
    pub a: u8,
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub fn parse(str: &str) -> Option<Self> {
        let hex = str.strip_prefix('#').unwrap_or(str);
        if !hex.is_ascii() {
            return None;
        }
        let channel = |idx: usize| u8::from_str_radix(hex.get(idx..idx + 2)?, 16).ok();
        match hex.len() {
            6 => Some(Self { a: 0xFF, r: channel(0)?, g: channel(2)?, b: channel(4)? }),
            8 => Some(Self { a: channel(0)?, r: channel(2)?, g: channel(4)?, b: channel(6)? }),
            _ => None,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}{:02x}", self.a, self.r, self.g, self.b)
    }
}

/// Typed value of a tile property.
#[derive(Clone, PartialEq, Debug)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Float(f32),
    String(String),
    Color(Color),
    File(String),
    /// Id of an object, 0 meaning none.
    Object(u32),
}

impl PropertyValue {

    pub fn parse(name: &str, property_type: PropertyType, value: &str) -> Result<Self, TsxParseError> {
        let invalid = || TsxParseError::InvalidPropertyValue {
            name: String::from(name),
            type_name: String::from(property_type.name()),
            value: String::from(value),
        };
        let value = match property_type {
            PropertyType::Bool => match value {
                "true" => Self::Bool(true),
                "false" => Self::Bool(false),
                _ => return Err(invalid()),
            },
            PropertyType::Int => Self::Int(value.parse().map_err(|_| invalid())?),
            PropertyType::Float => Self::Float(value.parse().map_err(|_| invalid())?),
            PropertyType::String => Self::String(String::from(value)),
            PropertyType::Color => Self::Color(Color::parse(value).ok_or_else(invalid)?),
            PropertyType::File => Self::File(String::from(value)),
            PropertyType::Object => Self::Object(value.parse().map_err(|_| invalid())?),
        };
        Ok(value)
    }

    pub fn property_type(&self) -> PropertyType {
        match self {
            Self::Bool(_) => PropertyType::Bool,
            Self::Int(_) => PropertyType::Int,
            Self::Float(_) => PropertyType::Float,
            Self::String(_) => PropertyType::String,
            Self::Color(_) => PropertyType::Color,
            Self::File(_) => PropertyType::File,
            Self::Object(_) => PropertyType::Object,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            Self::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) | Self::File(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::String(value) => write!(f, "{value:?}"),
            Self::Color(value) => write!(f, "{value}"),
            Self::File(value) => write!(f, "file({value})"),
            Self::Object(value) => write!(f, "object({value})"),
        }
    }
}

impl Serialize for PropertyValue {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Bool(value) => serializer.serialize_bool(*value),
            Self::Int(value) => serializer.serialize_i64(*value),
            Self::Float(value) => serializer.serialize_f32(*value),
            Self::String(value) | Self::File(value) => serializer.serialize_str(value),
            Self::Color(value) => serializer.collect_str(value),
            Self::Object(value) => serializer.serialize_u32(*value),
        }
    }
}

#[derive(Clone, PartialEq, Debug)]
pub struct Property {
    pub name: String,
    pub value: PropertyValue,
}

impl Property {
    pub fn new(name: impl Into<String>, value: PropertyValue) -> Self {
        Self { name: name.into(), value }
    }

    /// Parses a single `<property name type value>` element.
    pub fn parse(property_node: Node) -> Result<Self, TsxParseError> {
        let name = property_node
            .attribute("name")
            .ok_or_else(|| TsxParseError::MissingAttribute {
                tag_name: String::from("property"),
                attribute: String::from("name"),
            })?;
        let property_type = match property_node.attribute("type") {
            Some(type_name) => PropertyType::parse(type_name).ok_or_else(|| TsxParseError::UnknownPropertyType {
                name: String::from(name),
                type_name: String::from(type_name),
            })?,
            None => PropertyType::String,
        };

        // Multi-line strings are stored as text instead of in the value attribute
        let value = match property_node.attribute("value") {
            Some(value) => value,
            None => property_node.text().unwrap_or(""),
        };
        let value = PropertyValue::parse(name, property_type, value)?;
        Ok(Self { name: String::from(name), value })
    }
}

/// Properties of a tile, in document order.
/// Duplicated names are kept. Lookups return the first match.
#[derive(Clone, PartialEq, Default, Debug)]
pub struct Properties(Vec<Property>);

impl Properties {

    pub fn new() -> Self {
        Self::default()
    }

    /// Parses the children of a `<properties>` element.
    pub fn parse(properties_node: Node) -> Result<Self, TsxParseError> {
        let mut properties = Self::new();
        for child in properties_node.children().filter(|child| child.has_tag_name("property")) {
            properties.push(Property::parse(child)?);
        }
        Ok(properties)
    }

    pub fn push(&mut self, property: Property) {
        self.0.push(property);
    }

    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.0
            .iter()
            .find(|property| property.name == name)
            .map(|property| &property.value)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name)?.as_bool()
    }

    pub fn get_float(&self, name: &str) -> Option<f32> {
        self.get(name)?.as_float()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Property> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for Properties {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|property| (&property.name, &property.value)))
    }
}

impl FromIterator<Property> for Properties {
    fn from_iter<T: IntoIterator<Item = Property>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
