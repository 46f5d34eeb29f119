use core::{fmt, mem};
use core::slice::SliceIndex;

/// A sort of `Vec` with an inline, fixed capacity.
///
/// The list refers to a logically initialized prefix of a backing array. Elements outside the
/// prefix hold some unspecified (default) value. Order of insertion is preserved by all
/// operations.
///
/// ```
/// # use igmp_host::managed::List;
/// let mut list = List::<u8, 4>::new();
/// for el in 0..4 {
///     list.push(el).unwrap();
/// }
/// assert_eq!(list.push(4), Err(4));
/// assert_eq!(list.remove_at(1), Some(1));
/// assert_eq!(list.as_slice(), &[0, 2, 3]);
/// ```
#[derive(Clone)]
pub struct List<T, const N: usize> {
    inner: [T; N],
    end: usize,
}

impl<T: Default, const N: usize> List<T, N> {
    /// Create an empty list.
    pub fn new() -> Self {
        List {
            inner: core::array::from_fn(|_| T::default()),
            end: 0,
        }
    }

    /// Remove the element at a position, shifting all later elements.
    pub fn remove_at(&mut self, pos: usize) -> Option<T> {
        if pos >= self.end {
            return None;
        }

        // Popped element is moved over all remaining elements.
        self.inner[pos..self.end].rotate_left(1);
        self.end -= 1;
        Some(mem::take(&mut self.inner[self.end]))
    }

    /// Remove the last element.
    pub fn pop(&mut self) -> Option<T> {
        self.remove_at(self.end.wrapping_sub(1))
    }

    /// Only keep elements for which the predicate holds.
    pub fn retain(&mut self, mut f: impl FnMut(&T) -> bool) {
        let mut idx = 0;
        while idx < self.end {
            if f(&self.inner[idx]) {
                idx += 1;
            } else {
                self.remove_at(idx);
            }
        }
    }

    /// Remove all elements.
    pub fn clear(&mut self) {
        for el in &mut self.inner[..self.end] {
            *el = T::default();
        }
        self.end = 0;
    }
}

impl<T, const N: usize> List<T, N> {
    /// Insert behind the last element.
    ///
    /// Hands the value back if the list is full.
    pub fn push(&mut self, value: T) -> Result<&mut T, T> {
        match self.inner.get_mut(self.end) {
            Some(slot) => {
                *slot = value;
                self.end += 1;
                Ok(slot)
            },
            None => Err(value),
        }
    }

    /// The maximum number of elements.
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Get the number of logically initialized elements.
    pub fn len(&self) -> usize {
        self.end
    }

    /// Check if the list is empty.
    pub fn is_empty(&self) -> bool {
        self.end == 0
    }

    /// Check if another element could be pushed.
    pub fn is_full(&self) -> bool {
        self.end == N
    }

    /// Get the logically active elements as a slice.
    pub fn as_slice(&self) -> &[T] {
        &self.inner[..self.end]
    }

    /// Get the logically active elements as a mutable slice.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.inner[..self.end]
    }

    /// Non-panicking index access.
    pub fn get<I>(&self, idx: I) -> Option<&I::Output>
        where I: SliceIndex<[T]>,
    {
        self.as_slice().get(idx)
    }

    /// Non-panicking mutable index access.
    pub fn get_mut<I>(&mut self, idx: I) -> Option<&mut I::Output>
        where I: SliceIndex<[T]>,
    {
        self.as_mut_slice().get_mut(idx)
    }

    /// Iterate over the active elements.
    pub fn iter(&self) -> core::slice::Iter<'_, T> {
        self.as_slice().iter()
    }

    /// Iterate mutably over the active elements.
    pub fn iter_mut(&mut self) -> core::slice::IterMut<'_, T> {
        self.as_mut_slice().iter_mut()
    }
}

impl<T: Default, const N: usize> Default for List<T, N> {
    fn default() -> Self {
        List::new()
    }
}

impl<T: PartialEq, const N: usize> PartialEq for List<T, N> {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: Eq, const N: usize> Eq for List<T, N> { }

impl<T: fmt::Debug, const N: usize> fmt::Debug for List<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}

impl<'a, T, const N: usize> IntoIterator for &'a List<T, N> {
    type Item = &'a T;
    type IntoIter = core::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
