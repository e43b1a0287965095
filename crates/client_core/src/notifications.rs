//! Toast-style outcome notices, decoupled from whatever raised them.

use std::time::{Duration, Instant};

/// How long success and error notices stay up.
pub const TRANSIENT_DISPLAY: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
    /// Stays until the raiser dismisses it.
    Loading,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NotificationId(u64);

#[derive(Debug, Clone)]
pub struct Notification {
    pub id: NotificationId,
    pub kind: NotificationKind,
    pub message: String,
    pub raised_at: Instant,
}

impl Notification {
    pub fn is_expired(&self, now: Instant) -> bool {
        self.kind != NotificationKind::Loading
            && now.saturating_duration_since(self.raised_at) >= TRANSIENT_DISPLAY
    }
}

#[derive(Debug, Default)]
pub struct NotificationCenter {
    next_id: u64,
    items: Vec<Notification>,
}

impl NotificationCenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(
        &mut self,
        kind: NotificationKind,
        message: impl Into<String>,
        now: Instant,
    ) -> NotificationId {
        self.next_id += 1;
        let id = NotificationId(self.next_id);
        self.items.push(Notification {
            id,
            kind,
            message: message.into(),
            raised_at: now,
        });
        id
    }

    pub fn success(&mut self, message: impl Into<String>, now: Instant) -> NotificationId {
        self.push(NotificationKind::Success, message, now)
    }

    pub fn error(&mut self, message: impl Into<String>, now: Instant) -> NotificationId {
        self.push(NotificationKind::Error, message, now)
    }

    pub fn loading(&mut self, message: impl Into<String>, now: Instant) -> NotificationId {
        self.push(NotificationKind::Loading, message, now)
    }

    pub fn dismiss(&mut self, id: NotificationId) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id != id);
        self.items.len() != before
    }

    /// Drops transient notices whose display window has passed.
    pub fn expire(&mut self, now: Instant) {
        self.items.retain(|item| !item.is_expired(now));
    }

    /// Time until the next transient notice expires, for scheduling repaints.
    pub fn next_expiry(&self, now: Instant) -> Option<Duration> {
        self.items
            .iter()
            .filter(|item| item.kind != NotificationKind::Loading)
            .map(|item| TRANSIENT_DISPLAY.saturating_sub(now.saturating_duration_since(item.raised_at)))
            .min()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Removes and returns everything currently shown.
    pub fn drain(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_notices_expire_after_display_window() {
        let start = Instant::now();
        let mut center = NotificationCenter::new();
        center.success("Created 'envA'", start);
        center.error("Failed to delete environment", start);

        center.expire(start + Duration::from_millis(2_999));
        assert_eq!(center.len(), 2);

        center.expire(start + TRANSIENT_DISPLAY);
        assert!(center.is_empty());
    }

    #[test]
    fn loading_notices_wait_for_explicit_dismissal() {
        let start = Instant::now();
        let mut center = NotificationCenter::new();
        let id = center.loading("Installing...", start);

        center.expire(start + Duration::from_secs(60));
        assert_eq!(center.len(), 1);

        assert!(center.dismiss(id));
        assert!(center.is_empty());
        assert!(!center.dismiss(id));
    }

    #[test]
    fn dismissing_one_leaves_other_timers_alone() {
        let start = Instant::now();
        let mut center = NotificationCenter::new();
        let first = center.success("first", start);
        center.success("second", start + Duration::from_secs(2));

        center.dismiss(first);
        center.expire(start + Duration::from_secs(4));

        let remaining: Vec<_> = center.iter().map(|n| n.message.as_str()).collect();
        assert_eq!(remaining, vec!["second"]);
        assert_eq!(
            center.next_expiry(start + Duration::from_secs(4)),
            Some(Duration::from_secs(1))
        );
    }
}
