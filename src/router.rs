//! Message routing boundary.
//!
//! The connection forwards every application frame to a [`MessageRouter`]
//! (typically a channel manager) together with its event name. Payload
//! interpretation belongs to the router.

// ============================================================================
// MessageRouter
// ============================================================================

/// Receives application events.
///
/// Never called for `pusher:connection_established`, `pusher:error` or
/// `pusher:ping`, which the connection handles itself. Other `pusher:*`
/// events are routed like application events.
pub trait MessageRouter: Send + Sync {
    /// Handles one application frame.
    ///
    /// `raw_frame` is the complete frame text as received.
    fn on_message(&self, event_name: &str, raw_frame: &str);
}

impl<F> MessageRouter for F
where
    F: Fn(&str, &str) + Send + Sync,
{
    #[inline]
    fn on_message(&self, event_name: &str, raw_frame: &str) {
        self(event_name, raw_frame);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use parking_lot::Mutex;

    #[test]
    fn test_closure_router() {
        let seen = Mutex::new(Vec::new());
        let router = |event: &str, raw: &str| seen.lock().push((event.to_string(), raw.len()));

        router.on_message("my-event", "{}");
        assert_eq!(seen.lock().as_slice(), &[("my-event".to_string(), 2)]);
    }
}
