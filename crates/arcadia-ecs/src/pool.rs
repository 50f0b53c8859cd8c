//! Reusable-instance pools.
//!
//! [`ObjectPool`] hands out instances from a free list and takes them back
//! after resetting them. When the free list runs dry it grows in batches that
//! double the pool's total size (never less than [`MIN_BATCH`]), so steady
//! state spawning does not allocate. The free list is capped: a release that
//! would push it past the cap drops the instance instead.

use tracing::debug;

use crate::component::{Component, ComponentData, ComponentKind};

/// Smallest number of instances created by one growth step.
pub const MIN_BATCH: usize = 16;

/// Default ceiling on idle instances held by one pool.
pub const MAX_FREE: usize = 1024;

type FactoryFn<T> = Box<dyn Fn() -> T + Send + Sync>;

/// A generic pool of reusable `T`s.
pub struct ObjectPool<T> {
    free: Vec<T>,
    factory: FactoryFn<T>,
    reset: fn(&mut T),
    min_batch: usize,
    max_free: usize,
    total_created: usize,
    grow_count: usize,
    discarded: usize,
}

impl<T> std::fmt::Debug for ObjectPool<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectPool")
            .field("available", &self.free.len())
            .field("total_created", &self.total_created)
            .field("grow_count", &self.grow_count)
            .field("discarded", &self.discarded)
            .finish()
    }
}

impl<T> ObjectPool<T> {
    /// Create an empty pool. Nothing is allocated until the first acquire.
    pub fn new(factory: impl Fn() -> T + Send + Sync + 'static, reset: fn(&mut T)) -> Self {
        Self {
            free: Vec::new(),
            factory: Box::new(factory),
            reset,
            min_batch: MIN_BATCH,
            max_free: MAX_FREE,
            total_created: 0,
            grow_count: 0,
            discarded: 0,
        }
    }

    /// Override the growth floor. Values below 1 are treated as 1.
    pub fn with_min_batch(mut self, min_batch: usize) -> Self {
        self.min_batch = min_batch.max(1);
        self
    }

    /// Override the free-list ceiling.
    pub fn with_max_free(mut self, max_free: usize) -> Self {
        self.max_free = max_free;
        self.free.truncate(max_free);
        self
    }

    /// Take an instance, growing the pool if none are free.
    pub fn acquire(&mut self) -> T {
        if let Some(item) = self.free.pop() {
            return item;
        }
        self.grow();
        self.free.pop().unwrap_or_else(|| (self.factory)())
    }

    /// Reset `item` and make it available again. Dropped instead when the
    /// free list is already at its ceiling.
    pub fn release(&mut self, mut item: T) {
        if self.free.len() >= self.max_free {
            self.discarded += 1;
            return;
        }
        (self.reset)(&mut item);
        self.free.push(item);
    }

    fn grow(&mut self) {
        let batch = self.total_created.max(self.min_batch).min(self.max_free.max(1));
        self.free.reserve(batch);
        for _ in 0..batch {
            self.free.push((self.factory)());
        }
        self.total_created += batch;
        self.grow_count += 1;
        debug!(batch, total = self.total_created, "object pool grew");
    }

    /// Instances currently sitting in the free list.
    pub fn available(&self) -> usize {
        self.free.len()
    }

    /// Instances ever created by this pool.
    pub fn total_created(&self) -> usize {
        self.total_created
    }

    /// How many times the pool has had to grow.
    pub fn grow_count(&self) -> usize {
        self.grow_count
    }

    /// Released instances dropped because the free list was full.
    pub fn discarded(&self) -> usize {
        self.discarded
    }
}

// ---------------------------------------------------------------------------
// ComponentPool
// ---------------------------------------------------------------------------

/// One [`ObjectPool`] per component kind.
#[derive(Debug)]
pub struct ComponentPool {
    pools: Vec<ObjectPool<Component>>,
}

impl ComponentPool {
    pub fn new() -> Self {
        let pools = ComponentKind::ALL
            .iter()
            .map(|&kind| ObjectPool::new(move || Component::default_for(kind), Component::reset))
            .collect();
        Self { pools }
    }

    /// A reset instance of `kind`.
    pub fn acquire_kind(&mut self, kind: ComponentKind) -> Component {
        self.pools[kind.index()].acquire()
    }

    /// A reset, typed instance.
    pub fn acquire<T: ComponentData>(&mut self) -> T {
        T::try_from_component(self.acquire_kind(T::KIND)).unwrap_or_default()
    }

    /// Storage for `value`: a pooled instance of its kind, overwritten.
    ///
    /// Every component attached to an entity passes through here, so the
    /// free list only ever holds instances that a destroy or remove gave back.
    pub fn fill(&mut self, value: Component) -> Component {
        let mut slot = self.acquire_kind(value.kind());
        slot.overwrite(value);
        slot
    }

    pub fn release(&mut self, component: Component) {
        let kind = component.kind();
        self.pools[kind.index()].release(component);
    }

    pub fn available(&self, kind: ComponentKind) -> usize {
        self.pools[kind.index()].available()
    }

    /// Free instances across every kind.
    pub fn total_available(&self) -> usize {
        self.pools.iter().map(ObjectPool::available).sum()
    }

    /// Instances ever created across every kind.
    pub fn total_created(&self) -> usize {
        self.pools.iter().map(ObjectPool::total_created).sum()
    }
}

impl Default for ComponentPool {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
