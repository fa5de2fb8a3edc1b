//! Outbound notifications.
//!
//! Lifecycle transitions produce [`Notification`] values after the state
//! write commits. Delivery is somebody else's problem: the engine hands the
//! value to a [`Notifier`] and moves on. A failed send is logged and
//! swallowed, never surfaced to the caller of the transition.
//!
//! The default production wiring is [`ChannelNotifier`], which pushes onto
//! an unbounded channel drained by [`run_notification_relay`] so that
//! delivery latency never sits on the request path.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::types::{Ride, RideEventKind, RiderEmail};

/// Something the outside world should hear about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    /// A ride changed state.
    RideUpdate {
        event: RideEventKind,
        ride: Box<Ride>,
    },

    /// A no-show was recorded against a rider.
    StrikeAlert {
        email: RiderEmail,
        strikes: u32,
        /// True once the strike count has reached the termination threshold.
        terminated: bool,
    },
}

impl Notification {
    /// Short label for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::RideUpdate { .. } => "ride_update",
            Notification::StrikeAlert { .. } => "strike_alert",
        }
    }
}

/// Error from a notification sink. Always logged-and-dropped by the engine.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The relay channel is gone (shutdown in progress).
    #[error("notification channel closed")]
    ChannelClosed,
}

/// Where notifications go.
///
/// Implementations must not block for long and must not panic; the engine
/// calls this synchronously after each effectful transition.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification) -> Result<(), NotifyError>;
}

/// Sink that forwards onto an unbounded channel for asynchronous delivery.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelNotifier {
    /// Returns the notifier plus the receiving end for the relay task.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ChannelNotifier { tx }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, notification: Notification) -> Result<(), NotifyError> {
        self.tx
            .send(notification)
            .map_err(|_| NotifyError::ChannelClosed)
    }
}

/// Drains the notification channel until shutdown.
///
/// This stands in for the real email/in-app delivery integration: each
/// notification is logged at info level. Runs as its own tokio task.
pub async fn run_notification_relay(
    mut rx: mpsc::UnboundedReceiver<Notification>,
    shutdown: CancellationToken,
) {
    info!("notification relay started");
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                debug!("notification relay shutting down");
                break;
            }
            maybe = rx.recv() => {
                match maybe {
                    Some(notification) => deliver(notification),
                    None => {
                        debug!("notification channel closed");
                        break;
                    }
                }
            }
        }
    }
    info!("notification relay stopped");
}

fn deliver(notification: Notification) {
    match &notification {
        Notification::RideUpdate { event, ride } => {
            info!(
                ride = %ride.id,
                event = %event,
                status = %ride.status,
                rider = %ride.rider.email,
                "delivering ride notification"
            );
        }
        Notification::StrikeAlert {
            email,
            strikes,
            terminated,
        } => {
            if *terminated {
                warn!(%email, strikes, "rider reached the termination threshold");
            } else {
                info!(%email, strikes, "delivering strike notification");
            }
        }
    }
}
