use super::SchemaError;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

/// Number of assignable tags (`1..=255`).
pub const MAX_TYPES: usize = u8::MAX as usize;

/// Type ↔ tag mapping.
///
/// Automatic tags are the lowest free tag starting at 1, so a registry filled in
/// declaration order without explicit tags is dense: 1, 2, 3, ...
/// Registering a key twice is a no-op that returns the existing tag.
#[derive(Debug, Clone)]
pub struct TypeRegistry<K> {
    by_key: HashMap<K, u8>,
    by_tag: Vec<Option<K>>,
    names: Vec<Option<String>>,
}

impl<K> Default for TypeRegistry<K> {
    fn default() -> Self {
        TypeRegistry {
            by_key: HashMap::new(),
            by_tag: Vec::new(),
            names: Vec::new(),
        }
    }
}

impl<K: Eq + Hash + Clone + Debug> TypeRegistry<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `key` with the next free tag.
    ///
    /// `name` is only used in error messages.
    pub fn register(&mut self, key: K, name: &str) -> Result<u8, SchemaError> {
        if let Some(&tag) = self.by_key.get(&key) {
            return Ok(tag);
        }
        let tag = (1..=u8::MAX)
            .find(|&tag| self.key_of(tag).is_none())
            .ok_or_else(|| SchemaError::TooManyTypes {
                type_name: name.to_owned(),
            })?;
        self.insert(key, tag, name);
        Ok(tag)
    }

    /// Registers `key` with an explicit tag.
    pub fn register_with_tag(&mut self, key: K, tag: u8, name: &str) -> Result<u8, SchemaError> {
        if tag == 0 {
            return Err(SchemaError::ReservedTag {
                type_name: name.to_owned(),
            });
        }
        if let Some(&existing) = self.by_key.get(&key) {
            if existing == tag {
                return Ok(tag);
            }
            return Err(SchemaError::ConflictingTag {
                type_name: name.to_owned(),
                existing,
                requested: tag,
            });
        }
        if self.key_of(tag).is_some() {
            return Err(SchemaError::DuplicateTag {
                tag,
                type_name: name.to_owned(),
                existing: self.name_of(tag).unwrap_or_default().to_owned(),
            });
        }
        self.insert(key, tag, name);
        Ok(tag)
    }

    fn insert(&mut self, key: K, tag: u8, name: &str) {
        let index = usize::from(tag);
        if self.by_tag.len() <= index {
            self.by_tag.resize(index + 1, None);
            self.names.resize(index + 1, None);
        }
        self.by_tag[index] = Some(key.clone());
        self.names[index] = Some(name.to_owned());
        self.by_key.insert(key, tag);
    }

    pub fn tag_of(&self, key: &K) -> Option<u8> {
        self.by_key.get(key).copied()
    }

    pub fn key_of(&self, tag: u8) -> Option<&K> {
        self.by_tag.get(usize::from(tag))?.as_ref()
    }

    pub fn name_of(&self, tag: u8) -> Option<&str> {
        self.names.get(usize::from(tag))?.as_deref()
    }

    /// Registered `(tag, key)` pairs in tag order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, &K)> + '_ {
        self.by_tag
            .iter()
            .enumerate()
            .filter_map(|(tag, key)| Some((tag as u8, key.as_ref()?)))
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    /// Forgets every registration.
    pub fn clear(&mut self) {
        self.by_key.clear();
        self.by_tag.clear();
        self.names.clear();
    }
}
