//! Ordered collection of items addressed by id.
//!
//! Insertion order is preserved and is meaningful: routes are matched in
//! registration order and responses are selected from their list order.
//! Lookups are linear, which is fine for the handful of items a mock holds.

use serde::{Serialize, Serializer};
use std::sync::Arc;

/// An item that carries its own identifier.
pub trait Identified {
    /// Identifier type
    type Id: PartialEq + Clone + std::fmt::Display;

    /// The item's identifier.
    fn id(&self) -> &Self::Id;
}

impl<T: Identified> Identified for Arc<T> {
    type Id = T::Id;

    fn id(&self) -> &Self::Id {
        (**self).id()
    }
}

/// Error returned by [`IdList::add`] and [`IdList::replace`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdListError<I> {
    /// An item with this id is already present.
    Duplicate(I),
    /// No item with this id is present.
    Missing(I),
}

/// Insertion-ordered list with unique ids.
#[derive(Debug, Clone)]
pub struct IdList<T> {
    items: Vec<T>,
}

impl<T> Default for IdList<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Identified> IdList<T> {
    /// Create an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a list from items, failing on the first duplicate id.
    pub fn try_from_iter<I>(items: I) -> Result<Self, IdListError<T::Id>>
    where
        I: IntoIterator<Item = T>,
    {
        let mut list = Self::new();
        for item in items {
            list.add(item)?;
        }
        Ok(list)
    }

    /// Get the item with the given id.
    pub fn get(&self, id: &T::Id) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }

    /// Position of the item with the given id.
    pub fn index_of(&self, id: &T::Id) -> Option<usize> {
        self.items.iter().position(|item| item.id() == id)
    }

    /// Whether an item with the given id is present.
    pub fn contains(&self, id: &T::Id) -> bool {
        self.index_of(id).is_some()
    }

    /// Append an item. Fails if the id already exists.
    pub fn add(&mut self, item: T) -> Result<(), IdListError<T::Id>> {
        if self.contains(item.id()) {
            return Err(IdListError::Duplicate(item.id().clone()));
        }
        self.items.push(item);
        Ok(())
    }

    /// Remove the item with the given id. No-op if absent.
    pub fn remove(&mut self, id: &T::Id) -> Option<T> {
        self.index_of(id).map(|index| self.items.remove(index))
    }

    /// Substitute the item with the given id in place, keeping its position.
    ///
    /// The new item may carry a different id as long as no *other* item
    /// already uses it.
    pub fn replace(&mut self, id: &T::Id, item: T) -> Result<T, IdListError<T::Id>> {
        let index = self
            .index_of(id)
            .ok_or_else(|| IdListError::Missing(id.clone()))?;
        if item.id() != id && self.contains(item.id()) {
            return Err(IdListError::Duplicate(item.id().clone()));
        }
        Ok(std::mem::replace(&mut self.items[index], item))
    }
}

impl<T> IdList<T> {
    /// Number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// Items as a slice in insertion order.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Drop every item.
    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl<'a, T> IntoIterator for &'a IdList<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T: Serialize> Serialize for IdList<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.items.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        id: String,
        value: u32,
    }

    impl Identified for Item {
        type Id = String;
        fn id(&self) -> &String {
            &self.id
        }
    }

    fn item(id: &str, value: u32) -> Item {
        Item {
            id: id.to_string(),
            value,
        }
    }

    #[test]
    fn test_add_rejects_duplicate_id() {
        let mut list = IdList::new();
        list.add(item("a", 1)).unwrap();
        assert_eq!(
            list.add(item("a", 2)),
            Err(IdListError::Duplicate("a".to_string()))
        );
        assert_eq!(list.len(), 1);
        assert_eq!(list.get(&"a".to_string()).unwrap().value, 1);
    }

    #[test]
    fn test_replace_preserves_position() {
        let mut list = IdList::try_from_iter([item("a", 1), item("b", 2), item("c", 3)]).unwrap();
        let old = list.replace(&"b".to_string(), item("x", 9)).unwrap();
        assert_eq!(old.value, 2);
        let ids: Vec<&str> = list.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "x", "c"]);
        assert_eq!(list.index_of(&"x".to_string()), Some(1));
    }

    #[test]
    fn test_replace_missing_and_colliding() {
        let mut list = IdList::try_from_iter([item("a", 1), item("b", 2)]).unwrap();
        assert_eq!(
            list.replace(&"zz".to_string(), item("zz", 0)),
            Err(IdListError::Missing("zz".to_string()))
        );
        assert_eq!(
            list.replace(&"a".to_string(), item("b", 0)),
            Err(IdListError::Duplicate("b".to_string()))
        );
        // same id replacement is fine
        assert!(list.replace(&"a".to_string(), item("a", 7)).is_ok());
        assert_eq!(list.as_slice()[0].value, 7);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut list = IdList::try_from_iter([item("a", 1)]).unwrap();
        assert!(list.remove(&"missing".to_string()).is_none());
        assert_eq!(list.len(), 1);
        assert!(list.remove(&"a".to_string()).is_some());
        assert!(list.is_empty());
    }
}
