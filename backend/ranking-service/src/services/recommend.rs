//! Recommendation read service.
//!
//! Serves ranked pages out of the ranking store. When the store has nothing
//! for the requested page — freshly started process, no events recomputed
//! yet — the read degrades to recency order from the counters store. The
//! read path never errors: worst case is an empty page.

use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::db::CounterSource;
use crate::services::ranking_store::RankingStore;

pub struct RecommendService {
    store: Arc<dyn RankingStore>,
    counters: Arc<dyn CounterSource>,
    max_page_size: usize,
}

impl RecommendService {
    pub fn new(
        store: Arc<dyn RankingStore>,
        counters: Arc<dyn CounterSource>,
        max_page_size: usize,
    ) -> Self {
        Self {
            store,
            counters,
            max_page_size,
        }
    }

    /// Globally trending content, best first. 1-based pages; size is clamped
    /// to the configured maximum.
    pub async fn get_trending(&self, page: usize, size: usize) -> Vec<Uuid> {
        let size = size.clamp(1, self.max_page_size);
        let page = page.max(1);
        let start = (page - 1) * size;
        let stop = start + size - 1;

        match self.store.page_desc(start, stop).await {
            Ok(items) if !items.is_empty() => items,
            Ok(_) => {
                debug!(page, size, "ranking store cold, falling back to recency order");
                self.recency_fallback(start, size).await
            }
            Err(e) => {
                warn!(page, size, "ranking store read failed, falling back: {e}");
                self.recency_fallback(start, size).await
            }
        }
    }

    /// Personalized listing. Interest weights are captured by the ranking
    /// consumer but not consumed here yet; until they are, every user sees
    /// the global trending ranking.
    pub async fn get_recommended(&self, user_id: Uuid, page: usize, size: usize) -> Vec<Uuid> {
        debug!(%user_id, "serving global ranking for personalized request");
        self.get_trending(page, size).await
    }

    async fn recency_fallback(&self, offset: usize, limit: usize) -> Vec<Uuid> {
        match self
            .counters
            .list_recently_published(offset as i64, limit as i64)
            .await
        {
            Ok(items) => items,
            Err(e) => {
                // The read path must always return a list.
                warn!("recency fallback failed, returning empty page: {e}");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result as AppResult;
    use crate::models::ContentCounters;
    use crate::services::ranking_store::test_support::InMemoryRankingStore;
    use async_trait::async_trait;

    struct RecentList {
        recent: Vec<Uuid>,
        fail: bool,
    }

    #[async_trait]
    impl CounterSource for RecentList {
        async fn get_counters(&self, _content_id: Uuid) -> AppResult<Option<ContentCounters>> {
            Ok(None)
        }

        async fn list_recently_published(&self, offset: i64, limit: i64) -> AppResult<Vec<Uuid>> {
            if self.fail {
                return Err(crate::error::AppError::Internal("db down".into()));
            }
            let offset = offset as usize;
            if offset >= self.recent.len() {
                return Ok(Vec::new());
            }
            let end = (offset + limit as usize).min(self.recent.len());
            Ok(self.recent[offset..end].to_vec())
        }
    }

    fn service(
        store: Arc<InMemoryRankingStore>,
        recent: Vec<Uuid>,
        fail: bool,
    ) -> RecommendService {
        RecommendService::new(store, Arc::new(RecentList { recent, fail }), 100)
    }

    #[tokio::test]
    async fn trending_returns_descending_score_order() {
        let store = Arc::new(InMemoryRankingStore::default());
        let low = Uuid::new_v4();
        let mid = Uuid::new_v4();
        let high = Uuid::new_v4();
        store.set_score(low, 1.0).await.unwrap();
        store.set_score(high, 30.0).await.unwrap();
        store.set_score(mid, 10.0).await.unwrap();

        let svc = service(store, Vec::new(), false);
        assert_eq!(svc.get_trending(1, 10).await, vec![high, mid, low]);
    }

    #[tokio::test]
    async fn trending_pages_do_not_overlap() {
        let store = Arc::new(InMemoryRankingStore::default());
        for score in 1..=10 {
            store.set_score(Uuid::new_v4(), score as f64).await.unwrap();
        }

        let svc = service(store, Vec::new(), false);
        let first = svc.get_trending(1, 4).await;
        let second = svc.get_trending(2, 4).await;

        assert_eq!(first.len(), 4);
        assert_eq!(second.len(), 4);
        assert!(first.iter().all(|id| !second.contains(id)));
    }

    #[tokio::test]
    async fn cold_store_falls_back_to_recency_order() {
        let recent: Vec<Uuid> = (0..10).map(|_| Uuid::new_v4()).collect();
        let svc = service(
            Arc::new(InMemoryRankingStore::default()),
            recent.clone(),
            false,
        );

        let page = svc.get_trending(1, 10).await;
        assert_eq!(page, recent, "fallback must preserve recency order");
    }

    #[tokio::test]
    async fn read_path_never_errors_even_when_everything_is_down() {
        let svc = service(Arc::new(InMemoryRankingStore::default()), Vec::new(), true);
        assert!(svc.get_trending(1, 10).await.is_empty());
    }

    #[tokio::test]
    async fn size_is_clamped_and_page_floored() {
        let store = Arc::new(InMemoryRankingStore::default());
        for score in 0..150 {
            store.set_score(Uuid::new_v4(), score as f64).await.unwrap();
        }

        let svc = service(store, Vec::new(), false);
        assert_eq!(svc.get_trending(1, 10_000).await.len(), 100);
        assert_eq!(svc.get_trending(0, 10).await.len(), 10);
    }

    #[tokio::test]
    async fn recommended_delegates_to_trending() {
        let store = Arc::new(InMemoryRankingStore::default());
        let top = Uuid::new_v4();
        store.set_score(top, 50.0).await.unwrap();

        let svc = service(store, Vec::new(), false);
        let user = Uuid::new_v4();
        assert_eq!(
            svc.get_recommended(user, 1, 10).await,
            svc.get_trending(1, 10).await
        );
    }
}
