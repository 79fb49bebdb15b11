use std::num::NonZeroU32;
use std::sync::Arc;

use governor::{clock::DefaultClock, state::{InMemoryState, NotKeyed}, Quota, RateLimiter};
use nonzero_ext::nonzero;

use crate::services::cache::SnapshotCache;

pub type RefreshLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<SnapshotCache>,
    pub refresh_limiter: Arc<RefreshLimiter>,
    pub insights_enabled: bool,
}

impl AppState {
    pub fn new(cache: Arc<SnapshotCache>, refreshes_per_minute: u32, insights_enabled: bool) -> Self {
        let per_minute = NonZeroU32::new(refreshes_per_minute).unwrap_or(nonzero!(6u32));

        Self {
            cache,
            refresh_limiter: Arc::new(RateLimiter::direct(Quota::per_minute(per_minute))),
            insights_enabled,
        }
    }
}
