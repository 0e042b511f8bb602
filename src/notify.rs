// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::sync::{Mutex, PoisonError};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Deleted,
}

/// Published after a mutation has committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerChanged {
    pub entry_id: String,
    pub kind: ChangeKind,
    pub order_id: i64,
}

/// Observer list for one ledger instance.
#[derive(Debug, Default)]
pub struct ChangeNotifier {
    subscribers: Mutex<Vec<UnboundedSender<LedgerChanged>>>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> UnboundedReceiver<LedgerChanged> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    /// Sends to every live subscriber and forgets the ones whose receiver was
    /// dropped. Returns how many received the event.
    pub fn publish(&self, event: LedgerChanged) -> usize {
        let mut subs = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subs.retain(|tx| tx.send(event.clone()).is_ok());
        subs.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn clear(&self) {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ev(id: i64) -> LedgerChanged {
        LedgerChanged {
            entry_id: "home".into(),
            kind: ChangeKind::Added,
            order_id: id,
        }
    }

    #[test]
    fn fan_out_and_prune() {
        let n = ChangeNotifier::new();
        let mut a = n.subscribe();
        let b = n.subscribe();
        drop(b);
        assert_eq!(n.publish(ev(1)), 1);
        assert_eq!(n.subscriber_count(), 1);
        assert_eq!(a.try_recv().unwrap(), ev(1));
        assert!(a.try_recv().is_err());
    }
}
