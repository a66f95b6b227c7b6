//! Latest-value containers that presentation code observes.

use std::sync::Arc;

use tokio::sync::watch;

use crate::core::view::{CombinedField, DashboardViewModel, FieldCrop, FieldDetail, UpcomingTask};

/// Holds the current value of one view.
///
/// Subscribers see the value current at subscription time first, then every
/// later write. Clones share the same underlying value.
#[derive(Debug)]
pub struct Store<T> {
    tx: Arc<watch::Sender<T>>,
}

impl<T> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            tx: Arc::clone(&self.tx),
        }
    }
}

impl<T: Clone> Store<T> {
    pub fn new(initial: T) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    /// Snapshot of the current value.
    pub fn get(&self) -> T {
        self.tx.borrow().clone()
    }

    /// Replace the value and notify subscribers. Works with no subscribers.
    pub fn set(&self, value: T) {
        let _ = self.tx.send_replace(value);
    }

    /// Mutate in place and notify subscribers.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        self.tx.send_modify(f);
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl<T: Clone + Default> Default for Store<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// One store per view.
#[derive(Debug, Clone, Default)]
pub struct ViewModels {
    pub dashboard: Store<DashboardViewModel>,
    pub fields: Store<Vec<CombinedField>>,
    pub tasks: Store<Vec<UpcomingTask>>,
    pub crops: Store<Vec<FieldCrop>>,
    pub field_detail: Store<Option<FieldDetail>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn late_subscriber_sees_latest_value() {
        let store = Store::new(1);
        store.set(2);
        store.set(3);

        let mut rx = store.subscribe();
        assert_eq!(*rx.borrow_and_update(), 3);

        store.update(|v| *v += 1);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), 4);
    }

    #[test]
    fn clones_share_state() {
        let a = Store::new(vec![1, 2]);
        let b = a.clone();
        b.update(|v| v.push(3));
        assert_eq!(a.get(), vec![1, 2, 3]);
        assert_eq!(a.subscriber_count(), 0);
    }
}
