//! Ranking consumer group.
//!
//! For every interaction event: apply the per-user interest delta where one
//! qualifies, then unconditionally recompute the content's popularity score.
//! The recompute runs even when the interest update is skipped (short play,
//! non-qualifying kind) so the stored score always reflects current
//! aggregate truth.

use async_trait::async_trait;
use event_bus::{ConsumeError, EventHandler};
use event_schema::{EventEnvelope, EventKind, QueueName};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::config::RankingConfig;
use crate::metrics;
use crate::services::interest::InterestStore;
use crate::services::score::ScoreEngine;

pub const CONSUMER_GROUP: &str = "ranking-consumer";

/// Interest delta for an event, or `None` when the interaction does not
/// qualify (short play, kinds outside this group's responsibility).
pub fn interest_delta(cfg: &RankingConfig, envelope: &EventEnvelope) -> Option<f64> {
    match envelope.event_type {
        EventKind::ContentPlay => {
            let watched = envelope.watch_secs()?;
            (watched >= cfg.min_watch_secs).then_some(cfg.interest_play_delta)
        }
        EventKind::ContentLike => Some(cfg.interest_like_delta),
        EventKind::ContentUnlike => Some(-cfg.interest_like_delta),
        EventKind::ContentFavorite => Some(cfg.interest_favorite_delta),
        EventKind::ContentShare => Some(cfg.interest_share_delta),
        _ => None,
    }
}

pub struct RankingEventHandler {
    engine: Arc<ScoreEngine>,
    interest: Arc<InterestStore>,
    cfg: RankingConfig,
}

impl RankingEventHandler {
    pub fn new(engine: Arc<ScoreEngine>, interest: Arc<InterestStore>, cfg: RankingConfig) -> Self {
        Self {
            engine,
            interest,
            cfg,
        }
    }

    async fn update_interest(
        &self,
        envelope: &EventEnvelope,
        content_id: Uuid,
    ) -> Result<(), ConsumeError> {
        if envelope.event_type == EventKind::ContentPlay {
            self.interest
                .record_watch(envelope.actor_user_id, content_id, envelope.timestamp)
                .await
                .map_err(ConsumeError::failed)?;
        }

        match interest_delta(&self.cfg, envelope) {
            Some(delta) => self
                .interest
                .apply_delta(envelope.actor_user_id, content_id, delta)
                .await
                .map_err(ConsumeError::failed),
            None => {
                debug!(
                    event_type = %envelope.event_type,
                    "no interest delta for event"
                );
                Ok(())
            }
        }
    }
}

#[async_trait]
impl EventHandler for RankingEventHandler {
    fn queue(&self) -> QueueName {
        QueueName::RankingUpdate
    }

    fn consumer_group(&self) -> &'static str {
        CONSUMER_GROUP
    }

    async fn handle(&self, envelope: &EventEnvelope) -> Result<(), ConsumeError> {
        if !self.queue().accepts(envelope.event_type) {
            // The routing table says this kind never lands here; tolerate it
            // anyway since queue contents are outside our control.
            debug!(event_type = %envelope.event_type, "ignoring non-ranking event");
            return Ok(());
        }

        let content_id = envelope
            .content_id()
            .ok_or_else(|| ConsumeError::malformed("interaction event without content_id"))?;

        self.update_interest(envelope, content_id).await?;

        // Always recompute, regardless of the interest outcome: the score
        // must reflect the counters even when no delta applied.
        self.engine
            .recompute_score(content_id)
            .await
            .map_err(ConsumeError::failed)?;

        metrics::inc_event_processed(envelope.event_type.as_str());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use event_schema::content_payload;

    fn cfg() -> RankingConfig {
        RankingConfig::default()
    }

    #[test]
    fn qualified_play_earns_one_point() {
        let mut payload = content_payload(Uuid::new_v4());
        payload.insert("watch_duration_secs".into(), serde_json::json!(45));
        let envelope = EventEnvelope::new(EventKind::ContentPlay, Uuid::new_v4(), payload);

        assert_eq!(interest_delta(&cfg(), &envelope), Some(1.0));
    }

    #[test]
    fn short_or_unreported_play_earns_nothing() {
        let mut payload = content_payload(Uuid::new_v4());
        payload.insert("watch_duration_secs".into(), serde_json::json!(10));
        let short = EventEnvelope::new(EventKind::ContentPlay, Uuid::new_v4(), payload);
        let unreported = EventEnvelope::new(
            EventKind::ContentPlay,
            Uuid::new_v4(),
            content_payload(Uuid::new_v4()),
        );

        assert_eq!(interest_delta(&cfg(), &short), None);
        assert_eq!(interest_delta(&cfg(), &unreported), None);
    }

    #[test]
    fn like_and_unlike_are_symmetric() {
        let payload = content_payload(Uuid::new_v4());
        let like = EventEnvelope::new(EventKind::ContentLike, Uuid::new_v4(), payload.clone());
        let unlike = EventEnvelope::new(EventKind::ContentUnlike, Uuid::new_v4(), payload);

        assert_eq!(interest_delta(&cfg(), &like), Some(3.0));
        assert_eq!(interest_delta(&cfg(), &unlike), Some(-3.0));
    }

    #[test]
    fn favorite_and_share_deltas() {
        let payload = content_payload(Uuid::new_v4());
        let favorite =
            EventEnvelope::new(EventKind::ContentFavorite, Uuid::new_v4(), payload.clone());
        let share = EventEnvelope::new(EventKind::ContentShare, Uuid::new_v4(), payload);

        assert_eq!(interest_delta(&cfg(), &favorite), Some(5.0));
        assert_eq!(interest_delta(&cfg(), &share), Some(2.0));
    }

    #[test]
    fn lifecycle_events_never_earn_interest() {
        let payload = content_payload(Uuid::new_v4());
        for kind in [
            EventKind::CommentCreated,
            EventKind::UserFollowed,
            EventKind::ContentApproved,
            EventKind::UserRegistered,
        ] {
            let envelope = EventEnvelope::new(kind, Uuid::new_v4(), payload.clone());
            assert_eq!(interest_delta(&cfg(), &envelope), None, "{kind}");
        }
    }
}
