//! Entity keys and insertion-ordered weight tables.

use std::{
    fmt,
    hash::{Hash, Hasher},
    marker::PhantomData,
};

use serde::{
    de::{MapAccess, Visitor},
    ser::SerializeMap,
    Deserialize, Deserializer, Serialize, Serializer,
};

use crate::ArchetypeId;

/// Identifies what to spawn or score: a plain host archetype or a named
/// custom definition.
///
/// Text that parses as an integer names an archetype; anything else names a
/// definition. Definition names compare case-insensitively.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EntityKey {
    /// Plain host archetype.
    Archetype(ArchetypeId),
    /// Custom definition referenced by name.
    Definition(String),
}

impl EntityKey {
    /// Parses a key from its textual form.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        let trimmed = value.trim();
        match trimmed.parse::<ArchetypeId>() {
            Ok(archetype) => Self::Archetype(archetype),
            Err(_) => Self::Definition(trimmed.to_owned()),
        }
    }

    /// Definition name referenced by the key, if any.
    #[must_use]
    pub fn definition_name(&self) -> Option<&str> {
        match self {
            Self::Archetype(_) => None,
            Self::Definition(name) => Some(name),
        }
    }
}

impl PartialEq for EntityKey {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Archetype(left), Self::Archetype(right)) => left == right,
            (Self::Definition(left), Self::Definition(right)) => left.eq_ignore_ascii_case(right),
            _ => false,
        }
    }
}

impl Eq for EntityKey {}

impl Hash for EntityKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Self::Archetype(archetype) => {
                0_u8.hash(state);
                archetype.hash(state);
            }
            Self::Definition(name) => {
                1_u8.hash(state);
                for byte in name.bytes() {
                    byte.to_ascii_lowercase().hash(state);
                }
            }
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Archetype(archetype) => write!(f, "{archetype}"),
            Self::Definition(name) => f.write_str(name),
        }
    }
}

impl From<String> for EntityKey {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<&str> for EntityKey {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl From<EntityKey> for String {
    fn from(key: EntityKey) -> Self {
        key.to_string()
    }
}

/// Weighted table that remembers the order its entries were inserted in.
///
/// Serialised as a map so definition files read naturally; deserialisation
/// keeps the document order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WeightTable<K> {
    entries: Vec<(K, u32)>,
}

impl<K> WeightTable<K> {
    /// Creates an empty table.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Creates a table holding the provided entries in order.
    #[must_use]
    pub fn from_entries(entries: Vec<(K, u32)>) -> Self {
        Self { entries }
    }

    /// Appends an entry to the end of the table.
    pub fn push(&mut self, key: K, weight: u32) {
        self.entries.push((key, weight));
    }

    /// Entries in insertion order.
    #[must_use]
    pub fn entries(&self) -> &[(K, u32)] {
        &self.entries
    }

    /// Iterator over keys and weights in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, u32)> {
        self.entries.iter().map(|(key, weight)| (key, *weight))
    }

    /// Number of entries stored in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Reports whether the table holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of every weight in the table.
    #[must_use]
    pub fn total_weight(&self) -> u64 {
        self.entries
            .iter()
            .map(|(_, weight)| u64::from(*weight))
            .sum()
    }
}

impl<K> Default for WeightTable<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> FromIterator<(K, u32)> for WeightTable<K> {
    fn from_iter<I: IntoIterator<Item = (K, u32)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<K: Serialize> Serialize for WeightTable<K> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, weight) in &self.entries {
            map.serialize_entry(key, weight)?;
        }
        map.end()
    }
}

impl<'de, K: Deserialize<'de>> Deserialize<'de> for WeightTable<K> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(WeightTableVisitor {
            marker: PhantomData,
        })
    }
}

struct WeightTableVisitor<K> {
    marker: PhantomData<fn() -> K>,
}

impl<'de, K: Deserialize<'de>> Visitor<'de> for WeightTableVisitor<K> {
    type Value = WeightTable<K>;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a map of keys to non-negative integer weights")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((key, weight)) = access.next_entry::<K, u32>()? {
            entries.push((key, weight));
        }
        Ok(WeightTable { entries })
    }
}
