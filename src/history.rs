use std::collections::VecDeque;

/// fixed-capacity fifo: pushing into a full queue evicts the oldest item
#[derive(Debug, Clone)]
pub struct BoundedHistory<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> BoundedHistory<T> {
    /// a capacity of zero is treated as one
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// builds a queue from items already in chronological order.
    /// returns the queue and whatever did not fit, oldest first.
    pub fn from_existing<I>(capacity: usize, existing: I) -> (Self, Vec<T>)
    where
        I: IntoIterator<Item = T>,
    {
        let mut history = Self::new(capacity);
        let evicted = existing
            .into_iter()
            .filter_map(|item| history.push(item))
            .collect();
        (history, evicted)
    }

    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.items.len() == self.capacity {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(item);
        evicted
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_below_capacity_keeps_everything() {
        let mut history = BoundedHistory::new(3);
        assert_eq!(history.push(1), None);
        assert_eq!(history.push(2), None);
        assert_eq!(history.len(), 2);
        assert!(!history.is_empty());
    }

    #[test]
    fn full_queue_evicts_oldest_first() {
        let mut history = BoundedHistory::new(3);
        for i in 0..3 {
            history.push(i);
        }
        assert_eq!(history.push(3), Some(0));
        assert_eq!(history.push(4), Some(1));
        assert_eq!(history.push(5), Some(2));
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn length_never_exceeds_capacity() {
        let mut history = BoundedHistory::new(7);
        for i in 0..1000 {
            history.push(i);
            assert!(history.len() <= history.capacity());
        }
        assert_eq!(history.len(), 7);
        assert_eq!(history.push(1000), Some(993));
    }

    #[test]
    fn from_existing_reports_surplus_oldest_first() {
        let (mut history, evicted) = BoundedHistory::from_existing(2, ["a", "b", "c", "d"]);
        assert_eq!(evicted, vec!["a", "b"]);
        assert_eq!(history.len(), 2);
        assert_eq!(history.push("e"), Some("c"));
        assert_eq!(history.push("f"), Some("d"));
    }

    #[test]
    fn zero_capacity_holds_one() {
        let mut history = BoundedHistory::new(0);
        assert_eq!(history.capacity(), 1);
        history.push('x');
        assert_eq!(history.push('y'), Some('x'));
    }
}
