//! Service context over in-memory backends for unit tests

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use depot_common::auth::{OsRandom, TokenIssuer, TotpVerifier};
use depot_common::JwtConfig;
use depot_core::entities::ActivityEntry;
use depot_core::traits::{ActivityRepository, AttemptLimiter, SessionRepository, TokenBlacklist};
use depot_core::UserId;

use super::context::{ServiceContext, ServiceContextBuilder};
use crate::memory::{
    InMemoryActivityRepository, InMemoryAttemptLimiter, InMemoryBlacklist,
    InMemorySessionRepository, InMemoryUserRepository, ManualClock, RecordingEventSink,
    UnavailableBlacklist, UnavailableLimiter,
};

pub(crate) const ISSUER: &str = "Depot";

pub(crate) struct Harness {
    pub ctx: ServiceContext,
    pub clock: Arc<ManualClock>,
    pub users: Arc<InMemoryUserRepository>,
    pub sessions: Arc<InMemorySessionRepository>,
    pub activity: Arc<InMemoryActivityRepository>,
    pub blacklist: Arc<InMemoryBlacklist>,
    pub events: Arc<RecordingEventSink>,
    pub otp: TotpVerifier,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_session_repo(|inner| inner as Arc<dyn SessionRepository>)
    }

    /// Build with the session store wrapped, e.g. to freeze token reads
    pub fn with_session_repo<F>(wrap: F) -> Self
    where
        F: FnOnce(Arc<InMemorySessionRepository>) -> Arc<dyn SessionRepository>,
    {
        Self::build(wrap, false)
    }

    /// Build with a blacklist and attempt limiter that fail every call
    pub fn with_cache_down() -> Self {
        Self::build(|inner| inner as Arc<dyn SessionRepository>, true)
    }

    fn build<F>(wrap: F, cache_down: bool) -> Self
    where
        F: FnOnce(Arc<InMemorySessionRepository>) -> Arc<dyn SessionRepository>,
    {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
        ));
        let users = Arc::new(InMemoryUserRepository::new());
        let sessions = Arc::new(InMemorySessionRepository::new());
        let activity = Arc::new(InMemoryActivityRepository::new());
        let blacklist = Arc::new(InMemoryBlacklist::new(clock.clone()));
        let events = Arc::new(RecordingEventSink::new());
        let otp = TotpVerifier::new(ISSUER);

        let jwt = JwtConfig {
            secret: "unit-test-secret".to_string(),
            ..JwtConfig::default()
        };
        let issuer = TokenIssuer::new(&jwt, clock.clone(), Arc::new(OsRandom)).unwrap();

        let (token_blacklist, limiter): (Arc<dyn TokenBlacklist>, Arc<dyn AttemptLimiter>) =
            if cache_down {
                (
                    Arc::new(UnavailableBlacklist) as Arc<dyn TokenBlacklist>,
                    Arc::new(UnavailableLimiter) as Arc<dyn AttemptLimiter>,
                )
            } else {
                (
                    blacklist.clone() as Arc<dyn TokenBlacklist>,
                    Arc::new(InMemoryAttemptLimiter::new(clock.clone())) as Arc<dyn AttemptLimiter>,
                )
            };

        let ctx = ServiceContextBuilder::new()
            .user_repo(users.clone())
            .session_repo(wrap(sessions.clone()))
            .activity_repo(activity.clone())
            .blacklist(token_blacklist)
            .limiter(limiter)
            .token_issuer(Arc::new(issuer))
            .otp(Arc::new(otp.clone()))
            .clock(clock.clone())
            .events(events.clone())
            .build()
            .unwrap();

        Self {
            ctx,
            clock,
            users,
            sessions,
            activity,
            blacklist,
            events,
            otp,
        }
    }

    /// Code the authenticator app would show right now
    pub fn code_for(&self, secret: &str) -> String {
        self.otp.code_at(secret, self.ctx.now()).unwrap()
    }

    pub async fn activity_for(&self, user_id: UserId) -> Vec<ActivityEntry> {
        self.activity.recent(user_id, 100).await.unwrap()
    }
}
