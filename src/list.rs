use crate::{config::GrowthConfig, error::Result, growable::Growable};

/// Stable position of a node inside the slot table of a [`List`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct NodeId(usize);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }

    #[cfg(test)]
    pub fn from_index(index: usize) -> Self {
        Self(index)
    }
}

/// Link to another node of the list, `None` at either end of the chain.
pub(crate) type Link = Option<NodeId>;

pub(crate) struct Node<T> {
    /// Next node of the list
    pub next: Link,
    /// Previous node of the list
    pub prev: Link,
    /// Element of the node
    pub data: T,
}

/// A slot of the table is either a live node or part of the chain of
/// vacant slots waiting to be reused.
enum Slot<T> {
    Occupied(Node<T>),
    Vacant { next_vacant: Option<usize> },
}

/// Doubly linked list whose nodes live in a [`Growable`] slot table.
///
/// Links are slot indices instead of pointers, so the table can reallocate
/// while it grows without invalidating anything. Removed nodes leave a vacant
/// slot behind which is threaded into an intrusive stack and handed out
/// again by the next insertion.
///
/// ```text
///  slots:  [ 0: A ] [ 1: vacant ] [ 2: C ] [ 3: B ]
///
///  chain:   head -> 0 (A) -> 3 (B) -> 2 (C) <- tail
///  vacant:  1
/// ```
pub(crate) struct List<T> {
    slots: Growable<Slot<T>>,
    vacant: Option<usize>,
    head: Link,
    tail: Link,
    len: usize,
}

pub(crate) struct Iter<'a, T> {
    list: &'a List<T>,
    current: Link,
    remaining: usize,
}

impl<T> List<T> {
    pub fn new(growth: GrowthConfig) -> Result<Self> {
        Ok(Self {
            slots: Growable::new(growth)?,
            vacant: None,
            head: None,
            tail: None,
            len: 0,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn first(&self) -> Link {
        self.head
    }

    pub fn node(&self, id: NodeId) -> Option<&Node<T>> {
        match self.slots.get(id.0)? {
            Slot::Occupied(node) => Some(node),
            Slot::Vacant { .. } => None,
        }
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node<T>> {
        match self.slots.get_mut(id.0)? {
            Slot::Occupied(node) => Some(node),
            Slot::Vacant { .. } => None,
        }
    }

    #[inline]
    pub fn get(&self, id: NodeId) -> Option<&T> {
        self.node(id).map(|node| &node.data)
    }

    #[inline]
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut T> {
        self.node_mut(id).map(|node| &mut node.data)
    }

    #[inline]
    pub fn next(&self, id: NodeId) -> Link {
        self.node(id).and_then(|node| node.next)
    }

    #[inline]
    pub fn prev(&self, id: NodeId) -> Link {
        self.node(id).and_then(|node| node.prev)
    }

    /// Makes sure the next insertion can not fail.
    pub fn reserve(&mut self) -> Result<()> {
        if self.vacant.is_some() {
            return Ok(());
        }

        self.slots.reserve()
    }

    /// Places `node` in a vacant slot, or a new one at the end of the table.
    fn occupy(&mut self, node: Node<T>) -> Result<NodeId> {
        match self.vacant {
            Some(index) => {
                let slot = &mut self.slots.as_mut_slice()[index];
                if let Slot::Vacant { next_vacant } = slot {
                    self.vacant = *next_vacant;
                }
                *slot = Slot::Occupied(node);

                Ok(NodeId(index))
            }
            None => self.slots.push(Slot::Occupied(node)).map(NodeId),
        }
    }

    /// Appends a new node at the end of the list.
    pub fn push_back(&mut self, data: T) -> Result<NodeId> {
        let id = self.occupy(Node {
            next: None,
            prev: self.tail,
            data,
        })?;

        match self.tail.and_then(|tail| self.node_mut(tail)) {
            Some(tail) => tail.next = Some(id),
            None => self.head = Some(id),
        }

        self.tail = Some(id);
        self.len += 1;

        Ok(id)
    }

    /// Inserts a new node right after `at`. Returns `None` inside the result
    /// if `at` is not a live node.
    pub fn insert_after(&mut self, at: NodeId, data: T) -> Result<Option<NodeId>> {
        let Some(next) = self.node(at).map(|node| node.next) else {
            return Ok(None);
        };

        let id = self.occupy(Node {
            next,
            prev: Some(at),
            data,
        })?;

        if let Some(node) = self.node_mut(at) {
            node.next = Some(id);
        }

        match next.and_then(|next| self.node_mut(next)) {
            Some(next) => next.prev = Some(id),
            None => self.tail = Some(id),
        }

        self.len += 1;

        Ok(Some(id))
    }

    /// Unlinks `id` from the list and frees its slot for reuse.
    pub fn remove(&mut self, id: NodeId) -> Option<T> {
        let (prev, next) = {
            let node = self.node(id)?;
            (node.prev, node.next)
        };

        match prev.and_then(|prev| self.node_mut(prev)) {
            Some(prev) => prev.next = next,
            None => self.head = next,
        }

        match next.and_then(|next| self.node_mut(next)) {
            Some(next) => next.prev = prev,
            None => self.tail = prev,
        }

        let slot = std::mem::replace(
            &mut self.slots.as_mut_slice()[id.0],
            Slot::Vacant {
                next_vacant: self.vacant,
            },
        );
        self.vacant = Some(id.0);
        self.len -= 1;

        match slot {
            Slot::Occupied(node) => Some(node.data),
            Slot::Vacant { .. } => None,
        }
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.head, |id| self.next(*id))
    }

    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            list: self,
            current: self.head,
            remaining: self.len,
        }
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.list.node(self.current?)?;

        self.current = node.next;
        self.remaining -= 1;

        Some(&node.data)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list() -> List<char> {
        List::new(GrowthConfig::new(2, 0.75, 2)).unwrap()
    }

    fn contents(list: &List<char>) -> String {
        list.iter().collect()
    }

    #[test]
    fn new_list_is_empty() {
        let list = list();

        assert_eq!(list.len(), 0);
        assert!(list.first().is_none());
        assert!(list.iter().next().is_none());
    }

    #[test]
    fn insert_after_splices_in_place() {
        let mut list = list();
        let a = list.push_back('a').unwrap();
        let c = list.push_back('c').unwrap();
        let b = list.insert_after(a, 'b').unwrap().unwrap();
        let d = list.insert_after(c, 'd').unwrap().unwrap();

        assert_eq!(contents(&list), "abcd");
        assert_eq!(list.prev(b), Some(a));
        assert_eq!(list.next(b), Some(c));
        assert_eq!(list.prev(c), Some(b));
        assert_eq!(list.ids().last(), Some(d));
    }

    #[test]
    fn remove_relinks_neighbours_and_reuses_slot() {
        let mut list = list();
        let a = list.push_back('a').unwrap();
        let b = list.push_back('b').unwrap();
        let c = list.push_back('c').unwrap();

        assert_eq!(list.remove(b), Some('b'));
        assert_eq!(list.remove(b), None);
        assert_eq!(list.next(a), Some(c));
        assert_eq!(list.prev(c), Some(a));
        assert!(list.get(b).is_none());

        let x = list.insert_after(a, 'x').unwrap().unwrap();
        assert_eq!(x, b);
        assert_eq!(contents(&list), "axc");
    }

    #[test]
    fn removing_ends_moves_head_and_tail() {
        let mut list = list();
        let a = list.push_back('a').unwrap();
        let b = list.push_back('b').unwrap();
        let c = list.push_back('c').unwrap();

        list.remove(a);
        assert_eq!(list.first(), Some(b));
        assert_eq!(list.prev(b), None);

        list.remove(c);
        assert_eq!(list.ids().last(), Some(b));
        assert_eq!(list.next(b), None);

        list.remove(b);
        assert_eq!(list.len(), 0);
        assert!(list.first().is_none());
        assert_eq!(list.ids().count(), 0);
    }
}
