//! Vertex attribute masks.
//!
//! A mask selects which per-corner attributes take part in an operation:
//! which attributes a mesh carries, which ones drive the quadric, and which
//! ones are interpolated after a collapse.

use std::ops::{BitAnd, BitOr, Not, Sub};

use serde::{Deserialize, Serialize};

/// A single vertex attribute channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    Position,
    Normal,
    Uv0,
}

impl Attribute {
    /// All channels in the order their components are laid out in an attribute vector.
    pub const ALL: [Attribute; 3] = [Attribute::Position, Attribute::Normal, Attribute::Uv0];

    /// Number of scalar components of this channel.
    pub const fn components(self) -> usize {
        match self {
            Attribute::Position | Attribute::Normal => 3,
            Attribute::Uv0 => 2,
        }
    }

    const fn bit(self) -> u8 {
        match self {
            Attribute::Position => 1 << 0,
            Attribute::Normal => 1 << 1,
            Attribute::Uv0 => 1 << 2,
        }
    }
}

/// Set of vertex attribute channels.
///
/// Serialized as a list of channel names, e.g. `["normal", "uv0"]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Attribute>", into = "Vec<Attribute>")]
pub struct AttributeMask(u8);

impl AttributeMask {
    pub const NONE: AttributeMask = AttributeMask(0);
    pub const POSITION: AttributeMask = AttributeMask(Attribute::Position.bit());
    pub const NORMAL: AttributeMask = AttributeMask(Attribute::Normal.bit());
    pub const UV0: AttributeMask = AttributeMask(Attribute::Uv0.bit());

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True when every channel of `other` is in `self` (and `other` is not empty).
    pub const fn contains(self, other: AttributeMask) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    pub const fn has(self, attribute: Attribute) -> bool {
        self.0 & attribute.bit() != 0
    }

    pub fn insert(&mut self, attribute: Attribute) {
        self.0 |= attribute.bit();
    }

    /// Channels in this mask, in attribute-vector layout order.
    pub fn iter(self) -> impl Iterator<Item = Attribute> {
        Attribute::ALL.into_iter().filter(move |a| self.has(*a))
    }

    /// Total number of scalar components carried by the channels in this mask.
    pub fn component_count(self) -> usize {
        self.iter().map(Attribute::components).sum()
    }

    /// Offset of `attribute` inside an attribute vector laid out by this mask.
    pub fn offset_of(self, attribute: Attribute) -> Option<usize> {
        if !self.has(attribute) {
            return None;
        }
        Some(
            self.iter()
                .take_while(|a| *a != attribute)
                .map(Attribute::components)
                .sum(),
        )
    }
}

impl From<Attribute> for AttributeMask {
    fn from(attribute: Attribute) -> Self {
        AttributeMask(attribute.bit())
    }
}

impl From<Vec<Attribute>> for AttributeMask {
    fn from(list: Vec<Attribute>) -> Self {
        let mut mask = AttributeMask::NONE;
        for attribute in list {
            mask.insert(attribute);
        }
        mask
    }
}

impl From<AttributeMask> for Vec<Attribute> {
    fn from(mask: AttributeMask) -> Self {
        mask.iter().collect()
    }
}

impl BitOr for AttributeMask {
    type Output = AttributeMask;

    fn bitor(self, rhs: Self) -> Self::Output {
        AttributeMask(self.0 | rhs.0)
    }
}

impl BitAnd for AttributeMask {
    type Output = AttributeMask;

    fn bitand(self, rhs: Self) -> Self::Output {
        AttributeMask(self.0 & rhs.0)
    }
}

impl Sub for AttributeMask {
    type Output = AttributeMask;

    fn sub(self, rhs: Self) -> Self::Output {
        AttributeMask(self.0 & !rhs.0)
    }
}

impl Not for AttributeMask {
    type Output = AttributeMask;

    fn not(self) -> Self::Output {
        AttributeMask(!self.0 & (Self::POSITION | Self::NORMAL | Self::UV0).0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_layout() {
        let mask = AttributeMask::NORMAL | AttributeMask::UV0;
        assert_eq!(mask.component_count(), 5);
        assert_eq!(mask.offset_of(Attribute::Normal), Some(0));
        assert_eq!(mask.offset_of(Attribute::Uv0), Some(3));
        assert_eq!(mask.offset_of(Attribute::Position), None);

        let full = mask | AttributeMask::POSITION;
        assert_eq!(full.offset_of(Attribute::Uv0), Some(6));
    }

    #[test]
    fn test_set_operations() {
        let mask = AttributeMask::POSITION | AttributeMask::UV0;
        assert!(mask.contains(AttributeMask::UV0));
        assert!(!mask.contains(AttributeMask::NORMAL));
        assert!(!mask.contains(AttributeMask::NONE));
        assert_eq!(mask - AttributeMask::POSITION, AttributeMask::UV0);
        assert_eq!(!mask, AttributeMask::NORMAL);
        assert!((mask & AttributeMask::NORMAL).is_empty());
    }

    #[test]
    fn test_serializes_as_names() {
        let mask = AttributeMask::NORMAL | AttributeMask::UV0;
        let json = serde_json::to_string(&mask).unwrap();
        assert_eq!(json, r#"["normal","uv0"]"#);
        let back: AttributeMask = serde_json::from_str(&json).unwrap();
        assert_eq!(back, mask);
    }
}
