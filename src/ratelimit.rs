use governor::{
    Quota, RateLimiter as GovernorRateLimiter,
    clock::{QuantaClock, QuantaInstant},
    middleware::NoOpMiddleware,
    state::{InMemoryState, NotKeyed},
};
use nonzero_ext::nonzero;
use std::{num::NonZeroU32, time::Duration};

// Both sites are crawled one page at a time at a low, steady rate.
const REQ_PER_MIN: NonZeroU32 = nonzero!(40u32);
const MS_BETWEEN_REQ: Duration = Duration::from_millis(750);

type SpecificGovernorRateLimiter =
    GovernorRateLimiter<NotKeyed, InMemoryState, QuantaClock, NoOpMiddleware<QuantaInstant>>;

pub struct RateLimiter {
    req_per_min: SpecificGovernorRateLimiter,
    ms_between_req: SpecificGovernorRateLimiter,
}

impl RateLimiter {
    pub fn new() -> Self {
        // Limit to X total req/min on average.
        let req_per_min = GovernorRateLimiter::direct(Quota::per_minute(REQ_PER_MIN));

        // No two requests closer than Y ms.
        let gap = Quota::with_period(MS_BETWEEN_REQ).unwrap_or(Quota::per_second(nonzero!(1u32)));
        let ms_between_req = GovernorRateLimiter::direct(gap);

        RateLimiter {
            req_per_min,
            ms_between_req,
        }
    }

    pub async fn wait_until_ready(&self) {
        // Average ceiling first, then the spacing check, so a burst that
        // clears the per-minute ceiling still leaves one request per gap.
        self.req_per_min.until_ready().await;
        self.ms_between_req.until_ready().await;
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
