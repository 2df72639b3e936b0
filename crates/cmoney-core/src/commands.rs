//! Application commands passed between views.
//!
//! Views publish [`AppCommand`]s on a [`CommandBus`]; whoever renders the
//! target view subscribes and reacts (e.g. opening the add-transaction form).

use tokio::sync::broadcast;

use crate::router::Route;

const COMMAND_CAPACITY: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    /// The active view changed.
    Navigate(Route),
    /// Open the add-transaction form in the transactions view.
    QuickAdd,
}

/// Broadcast channel of [`AppCommand`]s. Clones share the channel.
#[derive(Debug, Clone)]
pub struct CommandBus {
    sender: broadcast::Sender<AppCommand>,
}

impl Default for CommandBus {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(COMMAND_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppCommand> {
        self.sender.subscribe()
    }

    /// Publishes `command`, returning how many subscribers received it.
    pub fn publish(&self, command: AppCommand) -> usize {
        tracing::debug!(?command, "publishing command");
        self.sender.send(command).unwrap_or(0)
    }
}
