use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::time::{Duration, Instant};
use tracing::debug;

use crate::config::LimiterConfig;
use crate::metrics::{EVICTED_CLIENTS, TRACKED_CLIENTS};

// Slack for nanosecond rounding: waiting the closest Duration to 1/rate
// must still refill a whole token
const TOKEN_EPSILON: f64 = 1e-6;

/// Identity of a rate limited caller: the peer IP with the port stripped.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientId(String);

impl From<IpAddr> for ClientId {
    fn from(ip: IpAddr) -> Self {
        Self(ip.to_string())
    }
}

impl From<SocketAddr> for ClientId {
    fn from(addr: SocketAddr) -> Self {
        Self::from(addr.ip())
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Token bucket refilled lazily on every `allow` call.
///
/// Tokens accumulate at `refill_rate` per second up to `capacity`; each
/// admitted request takes one whole token.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    capacity: u32,
    refill_rate: f64,
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    // New buckets start full
    pub fn new(capacity: u32, refill_rate: f64, now: Instant) -> Self {
        Self {
            capacity,
            refill_rate,
            tokens: f64::from(capacity),
            last_refill: now,
        }
    }

    pub fn allow(&mut self, now: Instant) -> bool {
        self.refill(now);

        if self.tokens + TOKEN_EPSILON >= 1.0 {
            self.tokens = (self.tokens - 1.0).max(0.0);
            return true;
        }

        false
    }

    fn refill(&mut self, now: Instant) {
        // saturating: a `now` older than the last refill adds nothing
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(f64::from(self.capacity));
        if now > self.last_refill {
            self.last_refill = now;
        }
    }
}

// Per-client state, only ever touched under the visitor's lock
#[derive(Debug)]
struct VisitorEntry {
    bucket: TokenBucket,
    last_seen: Instant,
}

/// Shared handle to one client's entry in the [`Registry`].
#[derive(Debug)]
pub struct Visitor {
    entry: Mutex<VisitorEntry>,
}

impl Visitor {
    fn new(bucket: TokenBucket, now: Instant) -> Self {
        Self {
            entry: Mutex::new(VisitorEntry {
                bucket,
                last_seen: now,
            }),
        }
    }

    pub fn allow(&self, now: Instant) -> bool {
        self.entry.lock().bucket.allow(now)
    }

    fn touch(&self, now: Instant) {
        let mut entry = self.entry.lock();
        if now > entry.last_seen {
            entry.last_seen = now;
        }
    }

    pub fn last_seen(&self) -> Instant {
        self.entry.lock().last_seen
    }
}

/// Concurrent map of client id to visitor state.
///
/// Lookups and creation go through the DashMap entry API, so a client seen
/// for the first time by several requests at once still ends up with a
/// single visitor. Locking is per shard, then per visitor.
pub struct Registry {
    visitors: DashMap<ClientId, Arc<Visitor>>,
    config: LimiterConfig,
}

impl Registry {
    pub fn new(config: LimiterConfig) -> Self {
        Self {
            visitors: DashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &LimiterConfig {
        &self.config
    }

    // Lookup or install the visitor for `client_id` and bump its last_seen
    pub fn get_or_create(&self, client_id: &ClientId, now: Instant) -> Arc<Visitor> {
        // the shard stays locked until the match ends, so sweep() cannot
        // evict between the lookup and the touch
        match self.visitors.entry(client_id.clone()) {
            Entry::Occupied(occupied) => {
                let visitor = occupied.get();
                visitor.touch(now);
                Arc::clone(visitor)
            }
            Entry::Vacant(vacant) => {
                debug!(client = %client_id, "new visitor");
                let bucket = TokenBucket::new(self.config.burst, self.config.rate, now);
                let visitor = Arc::new(Visitor::new(bucket, now));
                vacant.insert(Arc::clone(&visitor));
                TRACKED_CLIENTS.inc();
                visitor
            }
        }
    }

    /// Admit or reject one request from `client_id` at `now`.
    pub fn check(&self, client_id: &ClientId, now: Instant) -> bool {
        self.get_or_create(client_id, now).allow(now)
    }

    /// Remove every visitor idle for longer than `idle_threshold`, returning
    /// how many were evicted.
    pub fn sweep(&self, now: Instant, idle_threshold: Duration) -> usize {
        let mut evicted = 0;
        self.visitors.retain(|client_id, visitor| {
            let idle = now.saturating_duration_since(visitor.last_seen());
            if idle > idle_threshold {
                debug!(client = %client_id, idle_secs = idle.as_secs(), "evicting idle visitor");
                evicted += 1;
                return false;
            }
            true
        });

        if evicted > 0 {
            TRACKED_CLIENTS.sub(evicted as f64);
            EVICTED_CLIENTS.inc_by(evicted as f64);
        }
        evicted
    }

    pub fn get(&self, client_id: &ClientId) -> Option<Arc<Visitor>> {
        self.visitors.get(client_id).map(|v| Arc::clone(v.value()))
    }

    pub fn len(&self) -> usize {
        self.visitors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visitors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    fn limiter(rate: f64, burst: u32) -> Registry {
        Registry::new(LimiterConfig {
            rate,
            burst,
            ..LimiterConfig::default()
        })
    }

    fn client(ip: &str) -> ClientId {
        ClientId::from(ip.parse::<IpAddr>().unwrap())
    }

    #[test]
    fn test_bucket_admits_burst_then_rejects() {
        let now = Instant::now();
        let mut bucket = TokenBucket::new(5, 1.0, now);

        for _ in 0..5 {
            assert!(bucket.allow(now));
        }
        assert!(!bucket.allow(now));
        assert_eq!(bucket.tokens, 0.0);
    }

    #[test]
    fn test_bucket_refills_one_token_per_interval() {
        let start = Instant::now();
        let mut bucket = TokenBucket::new(2, 2.0, start);
        assert!(bucket.allow(start));
        assert!(bucket.allow(start));
        assert!(!bucket.allow(start));

        // 1/rate later exactly one more request fits
        let later = start + Duration::from_millis(500);
        assert!(bucket.allow(later));
        assert!(!bucket.allow(later));
    }

    #[test]
    fn test_bucket_refill_with_inexact_interval() {
        let start = Instant::now();
        let mut bucket = TokenBucket::new(1, 3.0, start);
        assert!(bucket.allow(start));
        assert!(!bucket.allow(start));

        // 1/3 s is 333_333_333ns, a hair short of a whole token
        let later = start + Duration::from_secs_f64(1.0 / 3.0);
        assert!(bucket.allow(later));
        assert!(!bucket.allow(later));
        assert_eq!(bucket.tokens, 0.0);

        let mut bucket = TokenBucket::new(1, 7.0, start);
        assert!(bucket.allow(start));
        let mut now = start;
        for _ in 0..50 {
            now += Duration::from_secs_f64(1.0 / 7.0);
            assert!(bucket.allow(now));
            assert!(!bucket.allow(now));
        }
    }

    #[test]
    fn test_bucket_refill_is_capped_at_capacity() {
        let start = Instant::now();
        let mut bucket = TokenBucket::new(3, 10.0, start);
        assert!(bucket.allow(start));

        let much_later = start + Duration::from_secs(3600);
        bucket.refill(much_later);
        assert_eq!(bucket.tokens, 3.0);
    }

    #[test]
    fn test_rejection_leaves_tokens_unchanged() {
        let start = Instant::now();
        let mut bucket = TokenBucket::new(1, 1.0, start);
        assert!(bucket.allow(start));

        let half = start + Duration::from_millis(500);
        assert!(!bucket.allow(half));
        assert!((bucket.tokens - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_bucket_ignores_time_going_backwards() {
        let start = Instant::now() + Duration::from_secs(10);
        let mut bucket = TokenBucket::new(1, 1.0, start);
        assert!(bucket.allow(start));
        assert!(!bucket.allow(start - Duration::from_secs(5)));
        assert!(bucket.allow(start + Duration::from_secs(1)));
    }

    #[test]
    fn test_client_id_strips_port() {
        let id = ClientId::from("203.0.113.7:51234".parse::<SocketAddr>().unwrap());
        assert_eq!(id.to_string(), "203.0.113.7");
        assert_eq!(id, client("203.0.113.7"));

        let v6 = ClientId::from("[2001:db8::1]:443".parse::<SocketAddr>().unwrap());
        assert_eq!(v6.to_string(), "2001:db8::1");
    }

    #[test]
    fn test_get_or_create_returns_same_visitor() {
        let registry = limiter(1.0, 3);
        let now = Instant::now();
        let a = registry.get_or_create(&client("10.0.0.1"), now);
        let b = registry.get_or_create(&client("10.0.0.1"), now);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_get_or_create_bumps_last_seen() {
        let registry = limiter(1.0, 3);
        let start = Instant::now();
        let id = client("10.0.0.1");
        registry.get_or_create(&id, start);

        let later = start + Duration::from_secs(42);
        let visitor = registry.get_or_create(&id, later);
        assert_eq!(visitor.last_seen(), later);
    }

    #[test]
    fn test_rejected_request_still_counts_as_seen() {
        let registry = limiter(1.0, 1);
        let start = Instant::now();
        let id = client("10.0.0.1");
        assert!(registry.check(&id, start));

        let later = start + Duration::from_millis(100);
        assert!(!registry.check(&id, later));
        assert_eq!(registry.get(&id).unwrap().last_seen(), later);
    }

    #[test]
    fn test_clients_are_isolated() {
        let registry = limiter(1.0, 2);
        let now = Instant::now();
        let a = client("198.51.100.1");
        let b = client("198.51.100.2");

        assert!(registry.check(&a, now));
        assert!(registry.check(&a, now));
        assert!(!registry.check(&a, now));

        assert!(registry.check(&b, now));
        assert!(registry.check(&b, now));
        assert!(!registry.check(&b, now));
    }

    #[test]
    fn test_sweep_evicts_only_idle_visitors() {
        let registry = limiter(1.0, 3);
        let start = Instant::now();
        let idle = client("10.0.0.1");
        let busy = client("10.0.0.2");
        registry.get_or_create(&idle, start);
        registry.get_or_create(&busy, start + Duration::from_secs(150));

        let evicted = registry.sweep(start + Duration::from_secs(200), Duration::from_secs(180));
        assert_eq!(evicted, 1);
        assert!(registry.get(&idle).is_none());
        assert!(registry.get(&busy).is_some());
    }

    #[test]
    fn test_sweep_keeps_visitor_at_exact_threshold() {
        let registry = limiter(1.0, 3);
        let start = Instant::now();
        registry.get_or_create(&client("10.0.0.1"), start);

        let evicted = registry.sweep(start + Duration::from_secs(180), Duration::from_secs(180));
        assert_eq!(evicted, 0);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_evicted_client_returns_with_full_burst() {
        let registry = limiter(0.001, 2);
        let start = Instant::now();
        let id = client("10.0.0.1");
        assert!(registry.check(&id, start));
        assert!(registry.check(&id, start));
        assert!(!registry.check(&id, start));

        let later = start + Duration::from_secs(300);
        registry.sweep(later, Duration::from_secs(180));
        assert!(registry.is_empty());

        assert!(registry.check(&id, later));
        assert!(registry.check(&id, later));
        assert!(!registry.check(&id, later));
    }

    #[test]
    fn test_stale_handle_after_eviction_does_not_block_client() {
        let registry = limiter(0.001, 1);
        let start = Instant::now();
        let id = client("10.0.0.1");

        // a request holding the handle while the sweeper removes the entry
        let stale = registry.get_or_create(&id, start);
        registry.sweep(start + Duration::from_secs(200), Duration::from_secs(180));
        assert!(stale.allow(start));

        // the next request gets a fresh visitor
        assert!(registry.check(&id, start + Duration::from_secs(200)));
    }

    #[test]
    fn test_concurrent_first_sight_creates_one_visitor() {
        let registry = Arc::new(limiter(1.0, 3));
        let now = Instant::now();
        let barrier = Arc::new(Barrier::new(16));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    registry.get_or_create(&client("192.0.2.10"), now)
                })
            })
            .collect();

        let visitors: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(registry.len(), 1);
        assert!(visitors.iter().all(|v| Arc::ptr_eq(v, &visitors[0])));
    }

    #[test]
    fn test_concurrent_requests_never_exceed_burst() {
        let burst = 5;
        let registry = Arc::new(limiter(0.001, burst));
        let now = Instant::now();
        let admitted = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(64));

        let handles: Vec<_> = (0..64)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let admitted = Arc::clone(&admitted);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    if registry.check(&client("192.0.2.20"), now) {
                        admitted.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(admitted.load(Ordering::SeqCst), burst as usize);
    }
}
