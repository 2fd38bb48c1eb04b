//! Observer that forwards notifications into a channel.

use tokio::sync::mpsc;

use bulb_domain::session::Notification;

use crate::ports::SessionObserver;

/// [`SessionObserver`] that pushes every [`Notification`] into an unbounded
/// channel, for consumers that prefer a message loop over callbacks.
///
/// Sending never blocks the session task. Notifications are dropped once the
/// receiver is gone.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    sender: mpsc::UnboundedSender<Notification>,
}

impl ChannelObserver {
    /// Create an observer and the receiving end of its channel.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl SessionObserver for ChannelObserver {
    fn notify(&self, notification: Notification) {
        if self.sender.send(notification).is_err() {
            tracing::trace!("notification receiver dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn should_forward_notifications_in_order() {
        let (observer, mut rx) = ChannelObserver::new();
        observer.notify(Notification::Connected);
        observer.notify(Notification::BulbFound);

        assert!(matches!(rx.recv().await, Some(Notification::Connected)));
        assert!(matches!(rx.recv().await, Some(Notification::BulbFound)));
    }

    #[test]
    fn should_not_panic_when_receiver_dropped() {
        let (observer, rx) = ChannelObserver::new();
        drop(rx);
        observer.notify(Notification::BulbNotFound);
    }
}
