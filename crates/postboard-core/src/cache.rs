//! Client side cache of remote lists.
//!
//! Every cached list or count lives in a slot addressed by a [`QueryKey`].
//! A slot remembers the last value, when it was written, whether a related
//! mutation invalidated it, and a generation counter. Each fetch carries the
//! generation it started with, so a response that arrives after a newer
//! fetch, an invalidation or a local write for the same key is dropped
//! instead of overwriting fresher data. Responses only ever write to the
//! slot of the key they were fetched for.

use std::{
    collections::HashMap,
    fmt::{Display, Formatter},
    time::{Duration, Instant},
};
use tracing::debug;

use crate::{
    constant::DEFAULT_USERS_STALE_SECS, post::Post, user::User, ApiError,
};

/// Identifies one cached list or count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKey {
    /// One page of users; `page` is 1 based.
    Users { page: u32, page_size: u32 },
    /// Total number of users, shared by every page size.
    UserCount,
    /// All posts of one user.
    Posts { user_id: i64 },
}

impl QueryKey {
    pub fn users(page: u32, page_size: u32) -> Self {
        Self::Users { page, page_size }
    }

    pub fn posts(user_id: i64) -> Self {
        Self::Posts { user_id }
    }

    pub fn entity(&self) -> &'static str {
        match self {
            Self::Users { .. } | Self::UserCount => "users",
            Self::Posts { .. } => "posts",
        }
    }
}

impl Display for QueryKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Users { page, page_size } => write!(f, "users/{page}/{page_size}"),
            Self::UserCount => write!(f, "users/count"),
            Self::Posts { user_id } => write!(f, "posts/{user_id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheValue {
    Users(Vec<User>),
    Count(u64),
    Posts(Vec<Post>),
}

impl CacheValue {
    pub fn as_users(&self) -> Option<&[User]> {
        match self {
            Self::Users(users) => Some(users),
            _ => None,
        }
    }

    pub fn as_posts(&self) -> Option<&[Post]> {
        match self {
            Self::Posts(posts) => Some(posts),
            _ => None,
        }
    }

    pub fn as_count(&self) -> Option<u64> {
        match self {
            Self::Count(count) => Some(*count),
            _ => None,
        }
    }

    pub fn into_users(self) -> Option<Vec<User>> {
        match self {
            Self::Users(users) => Some(users),
            _ => None,
        }
    }

    pub fn into_posts(self) -> Option<Vec<Post>> {
        match self {
            Self::Posts(posts) => Some(posts),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub value: CacheValue,
    pub updated_at: Instant,
    pub invalidated: bool,
}

/// Handed out when a fetch starts and given back when it completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    pub key: QueryKey,
    generation: u64,
}

/// How long each kind of entry is served before a read asks for a refetch.
/// Post lists are always stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub users_stale_time: Duration,
    pub count_stale_time: Duration,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            users_stale_time: Duration::from_secs(DEFAULT_USERS_STALE_SECS),
            count_stale_time: Duration::from_secs(DEFAULT_USERS_STALE_SECS),
        }
    }
}

impl CachePolicy {
    pub fn with_users_stale_time(stale_time: Duration) -> Self {
        Self {
            users_stale_time: stale_time,
            count_stale_time: stale_time,
        }
    }

    pub fn stale_time(&self, key: &QueryKey) -> Duration {
        match key {
            QueryKey::Users { .. } => self.users_stale_time,
            QueryKey::UserCount => self.count_stale_time,
            QueryKey::Posts { .. } => Duration::ZERO,
        }
    }
}

/// What a reader sees for one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheRead {
    pub key: QueryKey,
    pub value: Option<CacheValue>,
    pub is_stale: bool,
    pub is_fetching: bool,
    pub error: Option<ApiError>,
}

impl CacheRead {
    /// True when nobody is fetching this key and the cached value is
    /// missing or stale.
    pub fn should_fetch(&self) -> bool {
        !self.is_fetching && (self.value.is_none() || self.is_stale)
    }
}

#[derive(Debug, Default)]
struct Slot {
    entry: Option<CacheEntry>,
    generation: u64,
    fetching: bool,
    last_error: Option<ApiError>,
}

#[derive(Debug, Default)]
pub struct ListCache {
    slots: HashMap<QueryKey, Slot>,
    policy: CachePolicy,
}

impl ListCache {
    pub fn new(policy: CachePolicy) -> Self {
        Self {
            slots: HashMap::new(),
            policy,
        }
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    pub fn entry(&self, key: &QueryKey) -> Option<&CacheEntry> {
        self.slots.get(key).and_then(|slot| slot.entry.as_ref())
    }

    pub fn len(&self) -> usize {
        self.slots.values().filter(|slot| slot.entry.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn read(&self, key: QueryKey, now: Instant) -> CacheRead {
        let Some(slot) = self.slots.get(&key) else {
            return CacheRead {
                key,
                value: None,
                is_stale: true,
                is_fetching: false,
                error: None,
            };
        };
        let is_stale = match &slot.entry {
            Some(entry) => {
                entry.invalidated
                    || now.saturating_duration_since(entry.updated_at) >= self.policy.stale_time(&key)
            }
            None => true,
        };
        CacheRead {
            key,
            value: slot.entry.as_ref().map(|entry| entry.value.clone()),
            is_stale,
            is_fetching: slot.fetching,
            error: slot.last_error.clone(),
        }
    }

    /// Start a fetch for `key`. Any fetch already running for it is superseded.
    pub fn begin_fetch(&mut self, key: QueryKey) -> FetchTicket {
        let slot = self.slots.entry(key).or_default();
        slot.generation += 1;
        slot.fetching = true;
        FetchTicket {
            key,
            generation: slot.generation,
        }
    }

    /// Store the result of a fetch. Returns false when the ticket was
    /// superseded and the result dropped.
    pub fn complete_fetch(
        &mut self,
        ticket: FetchTicket,
        result: Result<CacheValue, ApiError>,
        now: Instant,
    ) -> bool {
        let slot = self.slots.entry(ticket.key).or_default();
        if slot.generation != ticket.generation {
            debug!(key = %ticket.key, "Dropping superseded fetch result");
            return false;
        }
        slot.fetching = false;
        match result {
            Ok(value) => {
                slot.entry = Some(CacheEntry {
                    value,
                    updated_at: now,
                    invalidated: false,
                });
                slot.last_error = None;
            }
            Err(err) => {
                debug!(key = %ticket.key, %err, "Fetch failed");
                slot.last_error = Some(err);
            }
        }
        true
    }

    /// Replace the value of `key` through `updater` and return the value it
    /// replaced. Running fetches for the key are cancelled so they cannot
    /// overwrite the local write. Returning `None` from the updater leaves
    /// the key without a value.
    pub fn update<F>(&mut self, key: QueryKey, updater: F, now: Instant) -> Option<CacheValue>
    where
        F: FnOnce(Option<&CacheValue>) -> Option<CacheValue>,
    {
        let slot = self.slots.entry(key).or_default();
        let previous = slot.entry.take().map(|entry| entry.value);
        let next = updater(previous.as_ref());
        Self::write(slot, next, now);
        previous
    }

    /// Put a previously taken snapshot back, verbatim.
    pub fn restore(&mut self, key: QueryKey, snapshot: Option<CacheValue>, now: Instant) {
        let slot = self.slots.entry(key).or_default();
        Self::write(slot, snapshot, now);
    }

    /// Mark `key` stale so the next read refetches it. Returns false when
    /// nothing was cached under the key.
    pub fn invalidate(&mut self, key: &QueryKey) -> bool {
        let Some(slot) = self.slots.get_mut(key) else {
            return false;
        };
        // A fetch that started before the invalidation may carry old data.
        slot.generation += 1;
        slot.fetching = false;
        match slot.entry.as_mut() {
            Some(entry) => {
                entry.invalidated = true;
                true
            }
            None => false,
        }
    }

    fn write(slot: &mut Slot, value: Option<CacheValue>, now: Instant) {
        slot.generation += 1;
        slot.fetching = false;
        slot.last_error = None;
        slot.entry = value.map(|value| CacheEntry {
            value,
            updated_at: now,
            invalidated: false,
        });
    }
}
