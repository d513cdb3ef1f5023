use crate::flight::{Flight, FlightId};
use crate::passenger::{Passenger, PassportNumber};
use std::slice;

/// A record that can live in an [`OrderedList`].
pub trait Keyed {
    type Id: PartialEq;
    type SortKey: Ord;

    fn id(&self) -> &Self::Id;
    fn sort_key(&self) -> Self::SortKey;
}

impl Keyed for Flight {
    type Id = FlightId;
    type SortKey = (crate::time::DateTime, String, String);

    fn id(&self) -> &FlightId {
        &self.id
    }

    fn sort_key(&self) -> Self::SortKey {
        Flight::sort_key(self)
    }
}

impl Keyed for Passenger {
    type Id = PassportNumber;
    type SortKey = (String, String);

    fn id(&self) -> &PassportNumber {
        &self.passport
    }

    fn sort_key(&self) -> Self::SortKey {
        Passenger::sort_key(self)
    }
}

/// Records kept sorted by their sort key. Equal keys keep insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderedList<T> {
    items: Vec<T>,
}

impl<T> Default for OrderedList<T> {
    fn default() -> Self {
        OrderedList { items: Vec::new() }
    }
}

impl<T: Keyed> OrderedList<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts after every record whose key is not greater, returns the position.
    pub fn insert(&mut self, item: T) -> usize {
        let key = item.sort_key();
        let idx = self.items.partition_point(|x| x.sort_key() <= key);
        self.items.insert(idx, item);
        idx
    }

    pub fn position(&self, id: &T::Id) -> Option<usize> {
        self.items.iter().position(|x| x.id() == id)
    }

    pub fn get(&self, id: &T::Id) -> Option<&T> {
        self.items.iter().find(|x| x.id() == id)
    }

    pub fn contains(&self, id: &T::Id) -> bool {
        self.position(id).is_some()
    }

    pub fn remove(&mut self, id: &T::Id) -> Option<T> {
        self.position(id).map(|idx| self.items.remove(idx))
    }

    /// Applies `f` to the record and moves it to wherever its key now belongs.
    pub fn update<R>(&mut self, id: &T::Id, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let idx = self.position(id)?;
        let result = f(&mut self.items[idx]);
        let moved = self.items.remove(idx);
        let new_idx = self.insert(moved);
        if new_idx != idx {
            tracing::trace!(from = idx, to = new_idx, "repositioned record");
        }
        Some(result)
    }

    /// Applies `f` to a record without repositioning. `f` must leave the key alone.
    pub fn update_in_place<R>(&mut self, id: &T::Id, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let idx = self.position(id)?;
        let item = &mut self.items[idx];
        let result = f(item);
        debug_assert!(self.is_sorted(), "update_in_place changed a sort key");
        Some(result)
    }

    pub fn is_sorted(&self) -> bool {
        self.items
            .windows(2)
            .all(|pair| pair[0].sort_key() <= pair[1].sort_key())
    }

    pub fn iter(&self) -> slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<'a, T> IntoIterator for &'a OrderedList<T> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
