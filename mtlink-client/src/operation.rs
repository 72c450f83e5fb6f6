//! Handles for asynchronous connection attempts.

use tokio::sync::watch;

use crate::errors::ErrorDetails;

/// Where an operation stands.
#[derive(Clone, Debug, PartialEq)]
pub enum OperationState {
    Pending,
    Succeeded,
    Failed(ErrorDetails),
}

/// Handle returned by [`Connection::connect_to_dc`](crate::Connection::connect_to_dc).
///
/// Resolves to success exactly when the connection becomes authenticated, or
/// to failure with the transport's error details. Dropping the handle does
/// not cancel the attempt.
#[derive(Clone, Debug)]
pub struct ConnectOperation {
    state: watch::Receiver<OperationState>,
}

/// The connection's side of a pending [`ConnectOperation`].
#[derive(Debug)]
pub(crate) struct ConnectResolver {
    state: watch::Sender<OperationState>,
}

impl ConnectOperation {
    pub(crate) fn pending() -> (Self, ConnectResolver) {
        let (tx, rx) = watch::channel(OperationState::Pending);
        (Self { state: rx }, ConnectResolver { state: tx })
    }

    /// An operation that has already failed.
    pub fn failed(details: ErrorDetails) -> Self {
        let (_tx, rx) = watch::channel(OperationState::Failed(details));
        Self { state: rx }
    }

    pub fn state(&self) -> OperationState {
        self.state.borrow().clone()
    }

    pub fn is_finished(&self) -> bool {
        !matches!(*self.state.borrow(), OperationState::Pending)
    }

    pub fn is_succeeded(&self) -> bool {
        matches!(*self.state.borrow(), OperationState::Succeeded)
    }

    pub fn error_details(&self) -> Option<ErrorDetails> {
        match &*self.state.borrow() {
            OperationState::Failed(details) => Some(details.clone()),
            _ => None,
        }
    }

    /// Wait for the outcome.
    ///
    /// The connection's events must keep being processed for this to resolve.
    pub async fn wait(&self) -> Result<(), ErrorDetails> {
        let mut rx = self.state.clone();
        let state = match rx.wait_for(|s| *s != OperationState::Pending).await {
            Ok(state) => (*state).clone(),
            Err(_)    => return Err(ErrorDetails::text("Connection was dropped")),
        };
        match state {
            OperationState::Failed(details) => Err(details),
            _ => Ok(()),
        }
    }
}

impl ConnectResolver {
    pub(crate) fn succeed(self) {
        self.state.send_replace(OperationState::Succeeded);
    }

    pub(crate) fn fail(self, details: ErrorDetails) {
        self.state.send_replace(OperationState::Failed(details));
    }
}
