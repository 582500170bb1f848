//! # Listener Management
//!
//! Live subscriptions are handed out as channel-backed handles and
//! tracked in an id-indexed registry so they can be torn down
//! individually or all at once.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// A live subscription handle.
///
/// Messages are pushed on every relevant remote change until the
/// subscription is stopped or the owning access layer is destroyed,
/// after which `recv` returns `None`.
pub struct Listener<T> {
    id: String,
    rx: mpsc::UnboundedReceiver<T>,
}

impl<T> Listener<T> {
    pub(crate) fn new(id: String, rx: mpsc::UnboundedReceiver<T>) -> Self {
        Self { id, rx }
    }

    /// Unique id, usable with `DataAccess::stop_listening`
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Wait for the next pushed value; `None` once the subscription ends
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Non-blocking poll for a pushed value
    pub fn try_recv(&mut self) -> Option<T> {
        self.rx.try_recv().ok()
    }
}

/// Registry of running listener forward tasks
pub(crate) struct ListenerRegistry {
    active: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl ListenerRegistry {
    pub(crate) fn new() -> Self {
        Self {
            active: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn register(&self, id: String, task: JoinHandle<()>) {
        let mut active = self.active.lock().expect("listener lock poisoned");
        active.insert(id, task);
    }

    /// Stop one listener; returns whether it was still registered
    pub(crate) fn stop(&self, id: &str) -> bool {
        let task = {
            let mut active = self.active.lock().expect("listener lock poisoned");
            active.remove(id)
        };
        match task {
            Some(task) => {
                task.abort();
                true
            }
            None => false,
        }
    }

    /// Stop every listener
    pub(crate) fn stop_all(&self) {
        let tasks: Vec<JoinHandle<()>> = {
            let mut active = self.active.lock().expect("listener lock poisoned");
            active.drain().map(|(_, task)| task).collect()
        };
        for task in tasks {
            task.abort();
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.active.lock().expect("listener lock poisoned").len()
    }
}
