//! Authoritative event routing table.
//!
//! One event may fan out to several queues; the audit queue receives every
//! event unconditionally. Both the publisher (to pick destinations) and the
//! consumers (to know which kinds they are responsible for) read this table —
//! there is deliberately no second copy anywhere else.

use crate::EventKind;

/// Purpose-named destination queues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueName {
    Audit,
    RankingUpdate,
    Notification,
    SearchIndex,
    Email,
}

impl QueueName {
    pub const ALL: [QueueName; 5] = [
        QueueName::Audit,
        QueueName::RankingUpdate,
        QueueName::Notification,
        QueueName::SearchIndex,
        QueueName::Email,
    ];

    /// Durable queue name on the broker.
    pub fn queue(&self) -> &'static str {
        match self {
            QueueName::Audit => "ripple.audit",
            QueueName::RankingUpdate => "ripple.ranking.update",
            QueueName::Notification => "ripple.notification",
            QueueName::SearchIndex => "ripple.search.index",
            QueueName::Email => "ripple.email",
        }
    }

    /// Dead-letter queue paired with this queue.
    pub fn dead_letter_queue(&self) -> &'static str {
        match self {
            QueueName::Audit => "ripple.audit.dlq",
            QueueName::RankingUpdate => "ripple.ranking.update.dlq",
            QueueName::Notification => "ripple.notification.dlq",
            QueueName::SearchIndex => "ripple.search.index.dlq",
            QueueName::Email => "ripple.email.dlq",
        }
    }

    /// Routing key binding this queue to the main exchange.
    pub fn routing_key(&self) -> &'static str {
        match self {
            QueueName::Audit => "audit",
            QueueName::RankingUpdate => "ranking",
            QueueName::Notification => "notification",
            QueueName::SearchIndex => "search",
            QueueName::Email => "email",
        }
    }

    /// Routing key for the paired dead-letter queue on the DLX.
    pub fn dead_letter_routing_key(&self) -> &'static str {
        match self {
            QueueName::Audit => "audit.dlq",
            QueueName::RankingUpdate => "ranking.dlq",
            QueueName::Notification => "notification.dlq",
            QueueName::SearchIndex => "search.dlq",
            QueueName::Email => "email.dlq",
        }
    }

    /// Whether events of `kind` are routed to this queue.
    pub fn accepts(&self, kind: EventKind) -> bool {
        destinations(kind).contains(self)
    }
}

/// Main direct exchange all events are published to.
pub const EXCHANGE: &str = "ripple.events";
/// Dead-letter exchange; each queue's rejected messages land on its DLQ here.
pub const DLX_EXCHANGE: &str = "ripple.events.dlx";
/// Delay exchange; messages published here sit in the delay queue until their
/// per-message TTL expires, then dead-letter back into the main exchange.
pub const DELAY_EXCHANGE: &str = "ripple.events.delay";
/// Holding queue for delayed events.
pub const DELAY_QUEUE: &str = "ripple.delay";

/// Destination queues for an event kind.
///
/// Every kind routes to the audit queue. Interaction events that feed
/// popularity additionally route to ranking; events a user should hear about
/// route to notification; discoverability changes route to the search index;
/// account and moderation outcomes route to email forwarding.
pub fn destinations(kind: EventKind) -> &'static [QueueName] {
    use EventKind::*;
    use QueueName::*;

    match kind {
        ContentPlay | ContentUnlike | ContentShare => &[Audit, RankingUpdate],
        ContentLike | ContentFavorite => &[Audit, RankingUpdate, Notification],
        CommentCreated | UserFollowed => &[Audit, Notification],
        ContentApproved => &[Audit, Notification, SearchIndex, Email],
        ContentRejected => &[Audit, Notification, Email],
        ContentUploaded | ContentDeleted => &[Audit, SearchIndex],
        UserRegistered => &[Audit, Email],
        CommentDeleted | UserUnfollowed => &[Audit],
    }
}
