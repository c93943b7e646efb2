//! Load lifecycle of one mounted screen.
//!
//! Every fetch is stamped with the mount it belongs to and a generation
//! number. Only the response to the most recent request of the currently
//! mounted screen is applied; anything else is dropped on arrival.

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

use crate::domain::DeskError;

static MOUNTS: AtomicU64 = AtomicU64::new(1);

/// A fresh id for a screen being mounted.
pub fn next_mount_id() -> u64 {
    MOUNTS.fetch_add(1, Ordering::Relaxed)
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadState {
    Idle,
    Loading,
    Loaded,
    LoadError(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub mount: u64,
    pub generation: u64,
}

#[derive(Debug)]
pub enum Applied<T> {
    /// Superseded by a later request or by unmounting.
    Stale,
    Loaded(T),
    Failed(DeskError),
}

#[derive(Debug)]
pub struct FetchTracker {
    mount: u64,
    generation: u64,
    state: LoadState,
}

impl FetchTracker {
    pub fn new(mount: u64) -> Self {
        Self {
            mount,
            generation: 0,
            state: LoadState::Idle,
        }
    }

    pub fn mount(&self) -> u64 {
        self.mount
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    #[cfg(test)]
    pub fn is_loading(&self) -> bool {
        self.state == LoadState::Loading
    }

    /// Starts a new request. Earlier tickets become stale.
    pub fn begin(&mut self) -> Ticket {
        self.generation += 1;
        self.state = LoadState::Loading;
        Ticket {
            mount: self.mount,
            generation: self.generation,
        }
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        ticket.mount == self.mount && ticket.generation == self.generation
    }

    pub fn finish<T>(&mut self, ticket: Ticket, result: Result<T, DeskError>) -> Applied<T> {
        if !self.is_current(ticket) {
            debug!(
                "Dropping stale response {:?}, current is {}/{}",
                ticket, self.mount, self.generation
            );
            return Applied::Stale;
        }
        match result {
            Ok(value) => {
                self.state = LoadState::Loaded;
                Applied::Loaded(value)
            }
            Err(e) => {
                self.state = LoadState::LoadError(e.to_string());
                Applied::Failed(e)
            }
        }
    }
}
