//! Lifecycle event notification
//!
//! Subscribers run synchronously, in subscription order, on the calling
//! task. A slow subscriber delays the triggering call; this is the
//! documented tradeoff of keeping dispatch in-process instead of behind
//! an event bus.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::RwLock;

use tracing::warn;

use super::entity::User;

/// Account lifecycle events that fire after a successful mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserEvent {
    Created,
    Updated,
    /// Fired only on a real active -> inactive transition
    Deactivated,
}

impl UserEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deactivated => "deactivated",
        }
    }
}

type EventHandler = Box<dyn Fn(UserEvent, &User) + Send + Sync>;

/// Registry of lifecycle subscribers
#[derive(Default)]
pub struct EventNotifier {
    handlers: RwLock<Vec<EventHandler>>,
}

impl EventNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber. Subscribers are invoked in registration
    /// order.
    pub fn subscribe(&self, handler: impl Fn(UserEvent, &User) + Send + Sync + 'static) {
        let mut handlers = match self.handlers.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        handlers.push(Box::new(handler));
    }

    /// Invoke every subscriber with the event. A panicking subscriber is
    /// isolated and logged; it never unwinds into the triggering call and
    /// later subscribers still run.
    pub fn notify(&self, event: UserEvent, user: &User) {
        let handlers = match self.handlers.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        for (index, handler) in handlers.iter().enumerate() {
            if catch_unwind(AssertUnwindSafe(|| handler(event, user))).is_err() {
                warn!(
                    event = event.as_str(),
                    user_id = user.id(),
                    subscriber = index,
                    "event subscriber panicked"
                );
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        match self.handlers.read() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }
}

impl std::fmt::Debug for EventNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventNotifier")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn test_user() -> User {
        User::restore(
            1,
            "a@x.com",
            "A",
            None,
            crate::domain::user::UserRole::Guest,
            true,
        )
    }

    #[test]
    fn test_subscribers_run_in_registration_order() {
        let notifier = EventNotifier::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for label in ["first", "second", "third"] {
            let seen = Arc::clone(&seen);
            notifier.subscribe(move |_, _| seen.lock().unwrap().push(label));
        }

        notifier.notify(UserEvent::Created, &test_user());

        assert_eq!(*seen.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_subscriber_receives_event_and_user() {
        let notifier = EventNotifier::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&seen);
        notifier.subscribe(move |event, user| {
            sink.lock().unwrap().push((event, user.id()));
        });

        let user = test_user();
        notifier.notify(UserEvent::Updated, &user);
        notifier.notify(UserEvent::Deactivated, &user);

        assert_eq!(
            *seen.lock().unwrap(),
            vec![(UserEvent::Updated, 1), (UserEvent::Deactivated, 1)]
        );
    }

    #[test]
    fn test_panicking_subscriber_is_isolated() {
        let notifier = EventNotifier::new();
        let seen = Arc::new(Mutex::new(0));

        notifier.subscribe(|_, _| panic!("subscriber failure"));

        let sink = Arc::clone(&seen);
        notifier.subscribe(move |_, _| *sink.lock().unwrap() += 1);

        // Must not propagate the panic, and the second subscriber still runs
        notifier.notify(UserEvent::Created, &test_user());

        assert_eq!(*seen.lock().unwrap(), 1);
    }

    #[test]
    fn test_subscriber_count() {
        let notifier = EventNotifier::new();
        assert_eq!(notifier.subscriber_count(), 0);

        notifier.subscribe(|_, _| {});
        notifier.subscribe(|_, _| {});
        assert_eq!(notifier.subscriber_count(), 2);
    }
}
