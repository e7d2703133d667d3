//! Room membership bookkeeping for the realtime channel.
//!
//! The socket task itself never remembers rooms; this registry is the
//! single source of truth for which rooms the application should be in, and
//! the bridge replays it on every `Ready` transition so membership survives
//! reconnects. [`RoomGuard`] ties a membership to a scope: dropping the
//! guard leaves the room, which makes "both are left on unmount" the
//! default rather than something each view has to remember.
//!
//! Join/leave sends are best-effort through a [`CommandOutlet`], which may
//! be unbound while no socket is running. A guard created while
//! disconnected still registers its room, so the replay joins it once a
//! connection exists.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;
use tracing::debug;

use zaika_net::SocketCommand;
use zaika_shared::RoomKey;

/// Set of rooms the application currently wants to be in.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    inner: Mutex<HashSet<RoomKey>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a room. Returns `true` if it was not registered before.
    pub fn register(&self, room: RoomKey) -> bool {
        self.lock().insert(room)
    }

    /// Deregister a room. Returns `true` if it was registered.
    pub fn deregister(&self, room: &RoomKey) -> bool {
        self.lock().remove(room)
    }

    /// Snapshot of all registered rooms, for replay on reconnect.
    pub fn snapshot(&self) -> Vec<RoomKey> {
        self.lock().iter().cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<RoomKey>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle to the command channel of whichever socket task is currently
/// running, if any. Everything sent through it is best-effort: sends while
/// unbound (or into a dead task) are silently dropped.
#[derive(Debug, Clone, Default)]
pub struct CommandOutlet {
    inner: Arc<Mutex<Option<mpsc::Sender<SocketCommand>>>>,
}

impl CommandOutlet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point the outlet at a live socket task.
    pub fn bind(&self, cmd_tx: mpsc::Sender<SocketCommand>) {
        *self.lock() = Some(cmd_tx);
    }

    /// Detach the current socket task, returning its sender.
    pub fn unbind(&self) -> Option<mpsc::Sender<SocketCommand>> {
        self.lock().take()
    }

    pub fn is_bound(&self) -> bool {
        self.lock().is_some()
    }

    /// Best-effort send. Returns `true` if the command was handed to a
    /// socket task.
    pub fn try_send(&self, cmd: SocketCommand) -> bool {
        match &*self.lock() {
            Some(cmd_tx) => match cmd_tx.try_send(cmd) {
                Ok(()) => true,
                Err(e) => {
                    debug!(error = %e, "command dropped");
                    false
                }
            },
            None => {
                debug!("command dropped, no socket running");
                false
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<mpsc::Sender<SocketCommand>>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// RAII membership in one room.
///
/// Creating the guard registers the room and sends a best-effort join;
/// dropping it deregisters and sends a best-effort leave. While no socket
/// is running both sends are skipped, and the bridge re-joins everything
/// still registered when a connection comes up.
#[derive(Debug)]
pub struct RoomGuard {
    registry: Arc<RoomRegistry>,
    outlet: CommandOutlet,
    room: RoomKey,
}

impl RoomGuard {
    pub fn new(registry: Arc<RoomRegistry>, outlet: CommandOutlet, room: RoomKey) -> Self {
        if registry.register(room.clone()) {
            outlet.try_send(SocketCommand::Join(room.clone()));
        }
        Self {
            registry,
            outlet,
            room,
        }
    }

    pub fn room(&self) -> &RoomKey {
        &self.room
    }
}

impl Drop for RoomGuard {
    fn drop(&mut self) {
        if self.registry.deregister(&self.room) {
            self.outlet.try_send(SocketCommand::Leave(self.room.clone()));
        }
    }
}
