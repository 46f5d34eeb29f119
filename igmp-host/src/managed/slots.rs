use core::fmt;

/// A fixed number of slots, each either vacant or occupied.
///
/// In contrast to a [`List`] an element keeps its index for as long as it is stored. The index
/// of a removed element may be reused by a later insertion.
///
/// ```
/// # use igmp_host::managed::Slots;
/// let mut slots = Slots::<&str, 2>::new();
/// let first = slots.insert("a").unwrap();
/// let second = slots.insert("b").unwrap();
/// assert!(slots.insert("c").is_err());
/// assert_eq!(slots.remove(first), Some("a"));
/// assert_eq!(slots.get(second), Some(&"b"));
/// ```
///
/// [`List`]: struct.List.html
#[derive(Clone)]
pub struct Slots<T, const N: usize> {
    elements: [Option<T>; N],
}

impl<T, const N: usize> Slots<T, N> {
    /// Create storage with all slots vacant.
    pub fn new() -> Self {
        Slots {
            elements: core::array::from_fn(|_| None),
        }
    }

    /// Store a value in the first vacant slot.
    ///
    /// Hands the value back if all slots are occupied.
    pub fn insert(&mut self, value: T) -> Result<usize, T> {
        match self.elements.iter().position(Option::is_none) {
            Some(idx) => {
                self.elements[idx] = Some(value);
                Ok(idx)
            },
            None => Err(value),
        }
    }

    /// Retrieve a value by index.
    pub fn get(&self, idx: usize) -> Option<&T> {
        self.elements.get(idx)?.as_ref()
    }

    /// Retrieve a mutable value by index.
    pub fn get_mut(&mut self, idx: usize) -> Option<&mut T> {
        self.elements.get_mut(idx)?.as_mut()
    }

    /// Vacate a slot, returning its value.
    pub fn remove(&mut self, idx: usize) -> Option<T> {
        self.elements.get_mut(idx)?.take()
    }

    /// Find the index of the first element matching a predicate.
    pub fn position(&self, mut f: impl FnMut(&T) -> bool) -> Option<usize> {
        self.iter()
            .find(|(_, el)| f(el))
            .map(|(idx, _)| idx)
    }

    /// Find the first element matching a predicate.
    pub fn find(&self, mut f: impl FnMut(&T) -> bool) -> Option<&T> {
        self.elements.iter()
            .flatten()
            .find(|el| f(el))
    }

    /// Find the first element matching a predicate, mutably.
    pub fn find_mut(&mut self, mut f: impl FnMut(&T) -> bool) -> Option<&mut T> {
        self.elements.iter_mut()
            .flatten()
            .find(|el| f(el))
    }

    /// Vacate all slots whose element does not fulfill the predicate.
    pub fn retain(&mut self, mut f: impl FnMut(&mut T) -> bool) {
        for slot in self.elements.iter_mut() {
            if let Some(el) = slot {
                if !f(el) {
                    *slot = None;
                }
            }
        }
    }

    /// Iterate over occupied slots and their indices.
    pub fn iter(&self) -> impl Iterator<Item=(usize, &T)> + '_ {
        self.elements.iter()
            .enumerate()
            .filter_map(|(idx, el)| Some((idx, el.as_ref()?)))
    }

    /// Iterate mutably over occupied slots.
    pub fn values_mut(&mut self) -> impl Iterator<Item=&mut T> + '_ {
        self.elements.iter_mut().flatten()
    }

    /// The number of occupied slots.
    pub fn len(&self) -> usize {
        self.elements.iter().filter(|el| el.is_some()).count()
    }

    /// Check if no slot is occupied.
    pub fn is_empty(&self) -> bool {
        self.elements.iter().all(Option::is_none)
    }

    /// The total number of slots.
    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<T, const N: usize> Default for Slots<T, N> {
    fn default() -> Self {
        Slots::new()
    }
}

impl<T: fmt::Debug, const N: usize> fmt::Debug for Slots<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
