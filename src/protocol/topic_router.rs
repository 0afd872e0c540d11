// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! MQTT topic routing for message handlers.
//!
//! The [`TopicRouter`] maps topic filters to the handlers registered for
//! them and delivers each incoming message to every matching handler.
//!
//! # Architecture
//!
//! ```text
//! MQTT Message: living_room/thermostat/state → ON
//!                     ↓
//!             TopicRouter.route()
//!                     ↓
//!     Collect handlers whose filter matches
//!                     ↓
//!          Release the router lock
//!                     ↓
//!           handler("ON") for each match
//! ```

use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::ProtocolError;
use crate::protocol::MessageHandler;

/// A registered filter and its handler.
struct Route {
    filter: String,
    handler: MessageHandler,
}

/// Routes MQTT messages to registered handlers.
///
/// Filters may use the MQTT wildcards `+` (one level) and `#` (any number of
/// trailing levels). Handlers are called outside the router lock, so a
/// handler may register further routes.
#[derive(Default)]
pub struct TopicRouter {
    routes: RwLock<Vec<Route>>,
}

impl TopicRouter {
    /// Creates a new empty topic router.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for the given topic filter.
    ///
    /// Several handlers may share a filter; each is called.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::InvalidTopic` if the filter is malformed.
    pub fn register(
        &self,
        filter: impl Into<String>,
        handler: MessageHandler,
    ) -> Result<(), ProtocolError> {
        let filter = filter.into();
        validate_filter(&filter)?;
        tracing::debug!(filter = %filter, "Registering topic handler");
        self.routes.write().push(Route { filter, handler });
        Ok(())
    }

    /// Removes the most recent route registering `handler` for `filter`.
    ///
    /// Other handlers on the same filter are kept. Returns `true` if a route
    /// was removed.
    pub fn remove_handler(&self, filter: &str, handler: &MessageHandler) -> bool {
        let mut routes = self.routes.write();
        let Some(index) = routes
            .iter()
            .rposition(|route| route.filter == filter && Arc::ptr_eq(&route.handler, handler))
        else {
            return false;
        };
        routes.remove(index);
        tracing::debug!(filter = %filter, "Removed topic handler");
        true
    }

    /// Routes a message to every handler whose filter matches `topic`.
    ///
    /// Returns the number of handlers that were called.
    pub fn route(&self, topic: &str, payload: &str) -> usize {
        let handlers: Vec<MessageHandler> = self
            .routes
            .read()
            .iter()
            .filter(|route| topic_matches(&route.filter, topic))
            .map(|route| MessageHandler::clone(&route.handler))
            .collect();

        if handlers.is_empty() {
            tracing::trace!(topic = %topic, "No handler for topic");
            return 0;
        }

        tracing::debug!(
            topic = %topic,
            payload = %payload,
            handlers = handlers.len(),
            "Dispatching message"
        );
        for handler in &handlers {
            handler(payload);
        }
        handlers.len()
    }

    /// Returns the distinct filters currently registered.
    #[must_use]
    pub fn filters(&self) -> Vec<String> {
        let mut filters: Vec<String> = self
            .routes
            .read()
            .iter()
            .map(|route| route.filter.clone())
            .collect();
        filters.sort();
        filters.dedup();
        filters
    }

    /// Returns the number of registered handlers.
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.routes.read().len()
    }
}

impl std::fmt::Debug for TopicRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TopicRouter")
            .field("filters", &self.filters())
            .field("handler_count", &self.handler_count())
            .finish()
    }
}

/// Returns `true` if `topic` matches the MQTT topic `filter`.
///
/// # Examples
///
/// ```
/// use mqtt_thermostat::protocol::topic_matches;
///
/// assert!(topic_matches("home/+/temperature", "home/kitchen/temperature"));
/// assert!(topic_matches("home/#", "home/kitchen/temperature"));
/// assert!(topic_matches("home/#", "home"));
/// assert!(!topic_matches("home/+", "home/kitchen/temperature"));
/// ```
#[must_use]
pub fn topic_matches(filter: &str, topic: &str) -> bool {
    // Wildcards at the first level never match topics starting with `$`
    if topic.starts_with('$') && (filter.starts_with('+') || filter.starts_with('#')) {
        return false;
    }

    let mut filter_levels = filter.split('/');
    let mut topic_levels = topic.split('/');

    loop {
        match (filter_levels.next(), topic_levels.next()) {
            (Some("#"), _) => return true,
            (Some("+"), Some(_)) => {}
            (Some(f), Some(t)) if f == t => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}

/// Validates a topic filter used for subscriptions.
///
/// # Errors
///
/// Returns `ProtocolError::InvalidTopic` if the filter is empty, contains a
/// NUL character, or uses a wildcard anywhere other than a whole level
/// (with `#` only as the last level).
pub fn validate_filter(filter: &str) -> Result<(), ProtocolError> {
    if filter.is_empty() || filter.contains('\0') {
        return Err(ProtocolError::InvalidTopic(filter.to_string()));
    }

    let levels: Vec<&str> = filter.split('/').collect();
    let last = levels.len() - 1;
    for (i, level) in levels.iter().enumerate() {
        let valid = match *level {
            "+" => true,
            "#" => i == last,
            other => !other.contains('+') && !other.contains('#'),
        };
        if !valid {
            return Err(ProtocolError::InvalidTopic(filter.to_string()));
        }
    }
    Ok(())
}

/// Validates a topic used for publishing.
///
/// # Errors
///
/// Returns `ProtocolError::InvalidTopic` if the topic is empty, contains a
/// NUL character, or contains a wildcard.
pub fn validate_topic(topic: &str) -> Result<(), ProtocolError> {
    if topic.is_empty() || topic.contains(['\0', '+', '#']) {
        return Err(ProtocolError::InvalidTopic(topic.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;

    use super::*;

    fn recording_handler(sink: &Arc<Mutex<Vec<String>>>) -> MessageHandler {
        let sink = Arc::clone(sink);
        Arc::new(move |payload: &str| sink.lock().push(payload.to_string()))
    }

    #[test]
    fn exact_match() {
        assert!(topic_matches("a/b/c", "a/b/c"));
        assert!(!topic_matches("a/b/c", "a/b"));
        assert!(!topic_matches("a/b", "a/b/c"));
        assert!(!topic_matches("a/b/c", "a/b/d"));
    }

    #[test]
    fn single_level_wildcard() {
        assert!(topic_matches("a/+/c", "a/b/c"));
        assert!(topic_matches("+/+", "a/b"));
        assert!(topic_matches("a/+", "a/"));
        assert!(!topic_matches("a/+", "a/b/c"));
    }

    #[test]
    fn multi_level_wildcard() {
        assert!(topic_matches("#", "a/b/c"));
        assert!(topic_matches("a/#", "a"));
        assert!(topic_matches("a/#", "a/b/c"));
        assert!(!topic_matches("a/#", "b/c"));
    }

    #[test]
    fn dollar_topics_skip_leading_wildcards() {
        assert!(!topic_matches("#", "$SYS/broker/uptime"));
        assert!(!topic_matches("+/broker/uptime", "$SYS/broker/uptime"));
        assert!(topic_matches("$SYS/#", "$SYS/broker/uptime"));
    }

    #[test]
    fn filter_validation() {
        assert!(validate_filter("a/b").is_ok());
        assert!(validate_filter("a/+/c").is_ok());
        assert!(validate_filter("a/#").is_ok());
        assert!(validate_filter("#").is_ok());

        assert!(validate_filter("").is_err());
        assert!(validate_filter("a/#/c").is_err());
        assert!(validate_filter("a/b+").is_err());
        assert!(validate_filter("a#").is_err());
    }

    #[test]
    fn publish_topic_validation() {
        assert!(validate_topic("home/thermostat/set").is_ok());
        assert!(validate_topic("").is_err());
        assert!(validate_topic("home/+/set").is_err());
        assert!(validate_topic("home/#").is_err());
    }

    #[test]
    fn route_to_matching_handlers() {
        let router = TopicRouter::new();
        let exact = Arc::new(Mutex::new(Vec::new()));
        let wildcard = Arc::new(Mutex::new(Vec::new()));

        router
            .register("home/thermostat/state", recording_handler(&exact))
            .unwrap();
        router
            .register("home/+/state", recording_handler(&wildcard))
            .unwrap();

        assert_eq!(router.route("home/thermostat/state", "ON"), 2);
        assert_eq!(router.route("home/heater/state", "OFF"), 1);
        assert_eq!(router.route("home/thermostat/target", "21"), 0);

        assert_eq!(*exact.lock(), vec!["ON"]);
        assert_eq!(*wildcard.lock(), vec!["ON", "OFF"]);
    }

    #[test]
    fn register_rejects_invalid_filter() {
        let router = TopicRouter::new();
        let handler: MessageHandler = Arc::new(|_: &str| {});
        assert!(matches!(
            router.register("a/#/b", handler),
            Err(ProtocolError::InvalidTopic(_))
        ));
        assert_eq!(router.handler_count(), 0);
    }

    #[test]
    fn remove_handler_keeps_other_handlers_on_filter() {
        let router = TopicRouter::new();
        let first = Arc::new(Mutex::new(Vec::new()));
        let second = Arc::new(Mutex::new(Vec::new()));
        let first_handler = recording_handler(&first);
        let second_handler = recording_handler(&second);

        router.register("hvac/state", first_handler).unwrap();
        router
            .register("hvac/state", MessageHandler::clone(&second_handler))
            .unwrap();

        assert!(router.remove_handler("hvac/state", &second_handler));
        assert!(!router.remove_handler("hvac/state", &second_handler));

        assert_eq!(router.route("hvac/state", "ON"), 1);
        assert_eq!(*first.lock(), vec!["ON"]);
        assert!(second.lock().is_empty());
        assert_eq!(router.filters(), vec!["hvac/state".to_string()]);
    }

    #[test]
    fn remove_handler_matches_filter_too() {
        let router = TopicRouter::new();
        let handler: MessageHandler = Arc::new(|_: &str| {});
        router.register("a/b", MessageHandler::clone(&handler)).unwrap();

        assert!(!router.remove_handler("a/c", &handler));
        assert_eq!(router.handler_count(), 1);
    }

    #[test]
    fn handler_may_register_while_routing() {
        let router = Arc::new(TopicRouter::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let weak = Arc::downgrade(&router);
        let counter = Arc::clone(&calls);
        router
            .register(
                "a/b",
                Arc::new(move |_: &str| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    if let Some(router) = weak.upgrade() {
                        let _ = router.register("a/c", Arc::new(|_: &str| {}));
                    }
                }),
            )
            .unwrap();

        router.route("a/b", "x");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(router.handler_count(), 2);
    }

    #[test]
    fn debug_lists_filters() {
        let router = TopicRouter::new();
        router.register("a/b", Arc::new(|_: &str| {})).unwrap();
        let debug = format!("{router:?}");
        assert!(debug.contains("TopicRouter"));
        assert!(debug.contains("a/b"));
    }
}
