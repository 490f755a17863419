use std::fmt;
use std::hash::{Hash, Hasher};

/// Key identifying one atlas: a font resource at one point size.
///
/// Sizes compare by bit pattern, so `12.0` and `12.000001` are distinct atlases
/// and `NaN` sizes still behave as a proper map key.
#[derive(Debug, Clone)]
pub struct FontDescriptor {
    resource: String,
    size: f32,
}

impl FontDescriptor {
    pub fn new(resource: impl Into<String>, size: f32) -> Self {
        Self {
            resource: resource.into(),
            size,
        }
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn size(&self) -> f32 {
        self.size
    }
}

impl PartialEq for FontDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.resource == other.resource && self.size.to_bits() == other.size.to_bits()
    }
}

impl Eq for FontDescriptor {}

impl Hash for FontDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.resource.hash(state);
        self.size.to_bits().hash(state);
    }
}

impl fmt::Display for FontDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}pt", self.resource, self.size)
    }
}
