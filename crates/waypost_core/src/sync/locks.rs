//! # Named Partition Locks
//!
//! Session state is split into a fixed set of partitions. Each partition is
//! an owned structure behind a reentrant mutex, and that mutex is the
//! partition's named lock.
//!
//! ## Ordering
//!
//! Domains are totally ordered:
//!
//! ```text
//! inventory < appearance < assets < groups < network < objects < self < parcels
//! ```
//!
//! A thread may only block on a domain greater than every other domain it
//! already holds. [`LockSet`] sorts its requests so callers never have to
//! think about it. Re-acquiring a domain the thread already holds never
//! blocks and is always allowed.
//!
//! A per-thread ledger of held domains catches violations: a debug build
//! panics, a release build logs at `error` and carries on.

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use std::cell::RefCell;
use std::fmt;

/// A named lock domain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Domain {
    /// Inventory tree
    Inventory = 0,
    /// Worn items
    Appearance = 1,
    /// Asset cache
    Assets = 2,
    /// Group memberships
    Groups = 3,
    /// Simulators and the current region
    Network = 4,
    /// In-world primitives
    Objects = 5,
    /// The agent itself
    SelfAgent = 6,
    /// Land parcels
    Parcels = 7,
}

impl Domain {
    /// Every domain in acquisition order.
    pub const ALL: [Self; 8] = [
        Self::Inventory,
        Self::Appearance,
        Self::Assets,
        Self::Groups,
        Self::Network,
        Self::Objects,
        Self::SelfAgent,
        Self::Parcels,
    ];

    /// Lower-case name used in logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Inventory => "inventory",
            Self::Appearance => "appearance",
            Self::Assets => "assets",
            Self::Groups => "groups",
            Self::Network => "network",
            Self::Objects => "objects",
            Self::SelfAgent => "self",
            Self::Parcels => "parcels",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

thread_local! {
    static HELD: RefCell<Vec<Domain>> = const { RefCell::new(Vec::new()) };
}

/// Domains currently held by the calling thread, in acquisition order.
#[must_use]
pub fn held_domains() -> Vec<Domain> {
    HELD.with(|held| held.borrow().clone())
}

/// Records `domain` in the ledger and checks it against the global order.
fn enter(domain: Domain) -> LedgerEntry {
    HELD.with(|held| {
        let mut held = held.borrow_mut();
        let reentrant = held.contains(&domain);
        if !reentrant {
            if let Some(&highest) = held.iter().max() {
                if highest > domain {
                    tracing::error!(
                        requested = %domain,
                        held = %highest,
                        "lock order violation"
                    );
                    debug_assert!(
                        false,
                        "lock order violation: {domain} requested while holding {highest}"
                    );
                }
            }
        }
        held.push(domain);
    });
    LedgerEntry { domain }
}

/// Removes one ledger record when dropped.
struct LedgerEntry {
    domain: Domain,
}

impl Drop for LedgerEntry {
    fn drop(&mut self) {
        HELD.with(|held| {
            let mut held = held.borrow_mut();
            if let Some(pos) = held.iter().rposition(|d| *d == self.domain) {
                held.remove(pos);
            }
        });
    }
}

/// Type-erased lock guard.
trait Held {}
impl<T: ?Sized> Held for T {}

/// Proof that the calling thread holds one named lock.
pub struct LockToken<'a> {
    // Field order matters: the mutex guard is released before the ledger
    // entry is removed.
    _guard: Box<dyn Held + 'a>,
    _entry: LedgerEntry,
}

/// Anything that can be acquired as part of a [`LockSet`].
pub trait NamedLock {
    /// Domain this lock guards.
    fn domain(&self) -> Domain;

    /// Blocks until the lock is held by the calling thread.
    fn acquire(&self) -> LockToken<'_>;
}

/// One partition of session state behind its named lock.
///
/// Access is closure-scoped. The closure must not call `write` on the same
/// partition while a `read` or `write` borrow of it is live; other
/// partitions may be locked freely as long as the global order is kept.
pub struct Partition<T> {
    domain: Domain,
    inner: ReentrantMutex<RefCell<T>>,
}

impl<T> Partition<T> {
    /// Wraps `value` in the named lock for `domain`.
    #[must_use]
    pub fn new(domain: Domain, value: T) -> Self {
        Self {
            domain,
            inner: ReentrantMutex::new(RefCell::new(value)),
        }
    }

    fn guard(&self) -> (LedgerEntry, ReentrantMutexGuard<'_, RefCell<T>>) {
        let entry = enter(self.domain);
        (entry, self.inner.lock())
    }

    /// Runs `f` with shared access to the partition.
    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let (_entry, guard) = self.guard();
        let value = guard.borrow();
        f(&value)
    }

    /// Runs `f` with exclusive access to the partition.
    pub fn write<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let (_entry, guard) = self.guard();
        let mut value = guard.borrow_mut();
        f(&mut value)
    }

    /// Clones the partition's current contents under its lock.
    #[must_use]
    pub fn snapshot(&self) -> T
    where
        T: Clone,
    {
        self.read(T::clone)
    }
}

impl<T> NamedLock for Partition<T> {
    #[inline]
    fn domain(&self) -> Domain {
        self.domain
    }

    fn acquire(&self) -> LockToken<'_> {
        let entry = enter(self.domain);
        let guard = self.inner.lock();
        LockToken {
            _guard: Box::new(guard),
            _entry: entry,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Partition<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Partition")
            .field("domain", &self.domain)
            .finish_non_exhaustive()
    }
}

/// Several named locks held together, acquired in canonical order.
pub struct LockSet<'a> {
    domains: Vec<Domain>,
    tokens: Vec<LockToken<'a>>,
}

impl<'a> LockSet<'a> {
    /// Acquires every lock in `locks`, sorted by domain, duplicates ignored.
    #[must_use]
    pub fn acquire(locks: &[&'a dyn NamedLock]) -> Self {
        let mut ordered: Vec<&'a dyn NamedLock> = locks.to_vec();
        ordered.sort_by_key(|lock| lock.domain());
        ordered.dedup_by_key(|lock| lock.domain());

        let domains = ordered.iter().map(|lock| lock.domain()).collect();
        let tokens = ordered.iter().map(|lock| lock.acquire()).collect();
        Self { domains, tokens }
    }

    /// Domains held by this set, in acquisition order.
    #[must_use]
    pub fn domains(&self) -> &[Domain] {
        &self.domains
    }
}

impl Drop for LockSet<'_> {
    fn drop(&mut self) {
        // Release in reverse acquisition order.
        while self.tokens.pop().is_some() {}
    }
}

impl fmt::Debug for LockSet<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockSet")
            .field("domains", &self.domains)
            .finish()
    }
}
