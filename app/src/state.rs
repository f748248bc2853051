// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::watch;

/// UI state shared between a coordinator and its background jobs.
///
/// Once [`shut_down`](Self::shut_down) returns, no job can publish again:
/// publishing holds the read side of the liveness lock, shutting down takes
/// the write side.
pub struct SharedState<T> {
    sender: watch::Sender<T>,
    live: RwLock<bool>,
}

impl<T: Clone> SharedState<T> {
    pub fn new(initial: T) -> Arc<Self> {
        let (sender, _) = watch::channel(initial);
        Arc::new(Self {
            sender,
            live: RwLock::new(true),
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.sender.subscribe()
    }

    pub fn get(&self) -> T {
        self.sender.borrow().clone()
    }

    pub fn is_live(&self) -> bool {
        *self.live.read()
    }

    /// Edits the state in place and notifies subscribers.
    pub fn modify<F>(&self, edit: F)
    where
        F: FnOnce(&mut T),
    {
        let live = self.live.read();
        if *live {
            self.sender.send_modify(edit);
        }
    }

    /// Like [`modify`](Self::modify), but only notifies when `edit` returns true.
    pub fn modify_if<F>(&self, edit: F)
    where
        F: FnOnce(&mut T) -> bool,
    {
        let live = self.live.read();
        if *live {
            self.sender.send_if_modified(edit);
        }
    }

    pub fn replace(&self, value: T) {
        self.modify(|current| *current = value);
    }

    /// Waits out any publish in progress, then drops all later ones.
    pub fn shut_down(&self) {
        *self.live.write() = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publishes_while_live() {
        let state = SharedState::new(1);
        let mut updates = state.subscribe();

        state.modify(|n| *n += 1);
        assert!(updates.has_changed().unwrap());
        assert_eq!(*updates.borrow_and_update(), 2);

        state.modify_if(|_| false);
        assert!(!updates.has_changed().unwrap());

        state.replace(5);
        assert_eq!(state.get(), 5);
    }

    #[test]
    fn test_nothing_is_published_after_shut_down() {
        let state = SharedState::new("loading");
        let mut updates = state.subscribe();
        updates.borrow_and_update();

        state.shut_down();
        state.replace("late result");
        state.modify(|s| *s = "late edit");
        state.modify_if(|s| {
            *s = "late conditional edit";
            true
        });

        assert!(!state.is_live());
        assert!(!updates.has_changed().unwrap());
        assert_eq!(state.get(), "loading");
    }
}
