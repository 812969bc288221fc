//! Sequence builder state for list and dict backing storage.
//!
//! A container is created with a capacity hint. The first `hint` pushes
//! land in storage reserved up front; after that the container grows
//! according to its tree's [`Growth`] policy.

use crate::error::Result;

/// How list/dict storage grows once the capacity hint is used up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Growth {
    /// Grow by exactly one slot per push.
    ///
    /// Keeps memory tight, but every push past the hint may reallocate, so
    /// building a long sequence without an accurate hint costs O(n²).
    #[default]
    Exact,
    /// Geometric growth (amortized O(1) per push).
    Amortized,
}

#[derive(Debug)]
pub(crate) struct Sequence<T> {
    items: Vec<T>,
    hint: usize,
}

impl<T> Sequence<T> {
    /// Reserve storage for `hint` items.
    pub(crate) fn with_hint(hint: usize) -> Result<Self> {
        let mut items = Vec::new();
        items.try_reserve_exact(hint)?;
        Ok(Self { items, hint })
    }

    /// Append an item, returning its index.
    ///
    /// On allocation failure the sequence is left unchanged: storage is
    /// reserved before the hint is touched or the item is stored.
    pub(crate) fn push(&mut self, item: T, growth: Growth) -> Result<usize> {
        if self.items.len() == self.items.capacity() {
            match growth {
                Growth::Exact => self.items.try_reserve_exact(1)?,
                Growth::Amortized => self.items.try_reserve(1)?,
            }
        }
        self.hint = self.hint.saturating_sub(1);
        let index = self.items.len();
        self.items.push(item);
        Ok(index)
    }

    pub(crate) fn pop(&mut self) -> Option<T> {
        self.items.pop()
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub(crate) fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Pushes left before the growth policy takes over.
    #[inline]
    pub(crate) fn remaining_hint(&self) -> usize {
        self.hint
    }
}
