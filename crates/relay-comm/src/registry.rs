//! Slot arena for the server's remote connections.
//!
//! Each insert returns a [`ConnectionHandle`] of slot index plus generation.
//! Removing a value bumps the slot's generation, so a stale handle held by
//! a worker thread can never remove the slot's next occupant.  Iteration
//! follows registration order.

/// Stable reference to one registry slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionHandle {
    index: usize,
    generation: u64,
}

#[derive(Debug)]
struct Slot<T> {
    generation: u64,
    value: Option<T>,
}

#[derive(Debug)]
pub struct ConnectionRegistry<T> {
    slots: Vec<Slot<T>>,
    free: Vec<usize>,
    /// Occupied slot indices in registration order.
    order: Vec<usize>,
}

impl<T> ConnectionRegistry<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            order: Vec::new(),
        }
    }

    pub fn insert(&mut self, value: T) -> ConnectionHandle {
        let index = match self.free.pop() {
            Some(index) => {
                self.slots[index].value = Some(value);
                index
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    value: Some(value),
                });
                self.slots.len() - 1
            }
        };
        self.order.push(index);
        ConnectionHandle {
            index,
            generation: self.slots[index].generation,
        }
    }

    /// Removes and returns the value behind `handle`, or `None` if the
    /// handle is stale.
    pub fn remove(&mut self, handle: ConnectionHandle) -> Option<T> {
        let slot = self.slots.get_mut(handle.index)?;
        if slot.generation != handle.generation {
            return None;
        }
        let value = slot.value.take()?;
        slot.generation += 1;
        self.free.push(handle.index);
        self.order.retain(|&i| i != handle.index);
        Some(value)
    }

    pub fn get(&self, handle: ConnectionHandle) -> Option<&T> {
        self.slots
            .get(handle.index)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.value.as_ref())
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Live entries in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (ConnectionHandle, &T)> {
        self.order.iter().filter_map(move |&index| {
            let slot = &self.slots[index];
            slot.value.as_ref().map(|value| {
                (
                    ConnectionHandle {
                        index,
                        generation: slot.generation,
                    },
                    value,
                )
            })
        })
    }

    /// Removes every entry, returning them in registration order.
    pub fn drain(&mut self) -> Vec<T> {
        let order = std::mem::take(&mut self.order);
        let mut out = Vec::with_capacity(order.len());
        for index in order {
            let slot = &mut self.slots[index];
            if let Some(value) = slot.value.take() {
                slot.generation += 1;
                self.free.push(index);
                out.push(value);
            }
        }
        out
    }
}

impl<T> Default for ConnectionRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iteration_follows_registration_order() {
        // Arrange
        let mut reg = ConnectionRegistry::new();
        let a = reg.insert("a");
        reg.insert("b");
        reg.remove(a);
        reg.insert("c");

        // Act
        let values: Vec<&str> = reg.iter().map(|(_, v)| *v).collect();

        // Assert – "c" reuses a's slot but still comes after "b"
        assert_eq!(values, vec!["b", "c"]);
    }

    #[test]
    fn test_stale_handle_cannot_remove_new_occupant() {
        // Arrange
        let mut reg = ConnectionRegistry::new();
        let old = reg.insert(1);
        assert_eq!(reg.remove(old), Some(1));
        let new = reg.insert(2);

        // Act
        let stale = reg.remove(old);

        // Assert
        assert_eq!(stale, None);
        assert_eq!(reg.get(new), Some(&2));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_double_remove_returns_none() {
        let mut reg = ConnectionRegistry::new();
        let h = reg.insert("x");
        assert_eq!(reg.remove(h), Some("x"));
        assert_eq!(reg.remove(h), None);
        assert!(reg.is_empty());
    }

    #[test]
    fn test_drain_empties_and_invalidates_handles() {
        let mut reg = ConnectionRegistry::new();
        let a = reg.insert('a');
        reg.insert('b');
        assert_eq!(reg.drain(), vec!['a', 'b']);
        assert!(reg.is_empty());
        assert_eq!(reg.get(a), None);
    }
}
