/// Handle returned by [`Listeners::subscribe`]; the only way to unsubscribe.
#[derive(Debug, PartialEq, Eq)]
pub struct Subscription(u64);

type Callback<E> = Box<dyn FnMut(&E)>;

/// Callbacks notified, in subscription order, of every emitted event.
pub struct Listeners<E> {
    next_id: u64,
    entries: Vec<(u64, Callback<E>)>,
}

impl<E> Listeners<E> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
        }
    }

    pub fn subscribe<F>(&mut self, callback: F) -> Subscription
    where
        F: FnMut(&E) + 'static,
    {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push((id, Box::new(callback)));
        Subscription(id)
    }

    /// Removes exactly the listener behind `subscription`. Returns false if it was already gone.
    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(id, _)| *id != subscription.0);
        self.entries.len() != before
    }

    pub fn emit(&mut self, event: &E) {
        for (_, callback) in &mut self.entries {
            callback(event);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<E> Default for Listeners<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn unsubscribe_only_removes_its_own_listener() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut listeners = Listeners::new();

        let first = {
            let seen = Rc::clone(&seen);
            listeners.subscribe(move |n: &u32| seen.borrow_mut().push(("first", *n)))
        };
        let _second = {
            let seen = Rc::clone(&seen);
            listeners.subscribe(move |n: &u32| seen.borrow_mut().push(("second", *n)))
        };

        listeners.emit(&1);
        assert!(listeners.unsubscribe(first));
        listeners.emit(&2);

        assert_eq!(
            *seen.borrow(),
            vec![("first", 1), ("second", 1), ("second", 2)]
        );
        assert_eq!(listeners.len(), 1);
    }

    #[test]
    fn stale_handle_is_reported() {
        let mut listeners: Listeners<()> = Listeners::new();
        let handle = listeners.subscribe(|_| {});
        let copy = Subscription(handle.0);
        assert!(listeners.unsubscribe(handle));
        assert!(!listeners.unsubscribe(copy));
        assert!(listeners.is_empty());
    }
}
