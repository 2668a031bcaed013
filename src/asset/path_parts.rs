use std::fmt;
use crate::LoadError;

/**
 * Deconstructed path to a file.
 */
#[derive(Clone, Eq, PartialEq, Default, Debug, Hash)]
pub struct AssetPath {
    pub protocol: String,
    pub prefix: Option<String>,
    pub body: String,
    pub extension: String,
}

impl AssetPath {

    pub fn parse(path: &str, default_protocol: Option<&str>) -> Result<Self, LoadError> {
        let protocol: Option<&str>;
        let body: &str;
        let extension: &str;
        let mut remainder = path;

        // Reads protocol
        match remainder.split_once("://") {
            Some((left, right)) => {
                protocol = Some(left);
                remainder = right;
            },
            None => protocol = None,
        };
        let Some(protocol) = protocol.or(default_protocol) else {
            return Err(LoadError::NoDefaultProtocol)
        };

        // Reads body and extension.
        // Only the last path segment may hold the extension, so "../a.b/c" has none.
        let file_start = remainder.rfind('/').map(|idx| idx + 1).unwrap_or(0);
        match remainder[file_start..].rsplit_once('.') {
            Some((left, right)) if !left.is_empty() && !right.is_empty() => {
                body = &remainder[..file_start + left.len()];
                extension = right;
            },
            _ => return Err(LoadError::PathMissingExtension),
        };

        Ok(Self {
            protocol: protocol.into(),
            prefix: None,
            body: body.into(),
            extension: extension.into()
        })
    }

    /// Body and extension. No protocol.
    pub fn without_protocol(&self) -> String {
        match self.prefix.as_deref() {
            Some(prefix) => format!("{}/{}.{}", prefix, self.body, self.extension),
            None => format!("{}.{}", self.body, self.extension),
        }
    }

    /// Parent directory of this file, prefix included.
    /// None if it's at the root.
    pub fn parent(&self) -> Option<String> {
        let body_parent = self.body
            .rsplit_once('/')
            .map(|(parent, _)| parent);
        match (self.prefix.as_deref(), body_parent) {
            (Some(prefix), Some(parent)) => Some(format!("{prefix}/{parent}")),
            (Some(prefix), None) => Some(String::from(prefix)),
            (None, Some(parent)) => Some(String::from(parent)),
            (None, None) => None,
        }
    }

    /// Name of the file without directories or extension.
    pub fn file_stem(&self) -> &str {
        match self.body.rsplit_once('/') {
            Some((_, stem)) => stem,
            None => &self.body,
        }
    }
}

impl fmt::Display for AssetPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.prefix.as_deref() {
            Some(prefix) => write!(f, "{}://{}/{}.{}", self.protocol, prefix, self.body, self.extension),
            None => write!(f, "{}://{}.{}", self.protocol, self.body, self.extension),
        }
    }
}

/**
 * Wrapper for the hash of a path.
 */
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub struct PathHash(pub u64);
impl PathHash {
    pub fn of(path: &str) -> Self {
        Self(fxhash::hash64(path))
    }
}
