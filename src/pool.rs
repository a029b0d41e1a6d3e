//! Object and buffer pools.
//!
//! Pools are owned values, not globals: create one per pooled type (or per buffer
//! workload) and share it by reference or `Arc`. Free lists are bounded lock-free
//! queues; releasing into a full pool simply drops the instance.

use crate::*;
use bytes::BytesMut;
use crossbeam::queue::ArrayQueue;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Soft maximum of idle instances held by [`ObjectPool::new`].
pub const DEFAULT_POOL_CAPACITY: usize = 64;

/// Counters describing how a pool has been used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Instances built by the factory.
    pub created: usize,
    /// Acquisitions served from the free list.
    pub reused: usize,
    /// Releases dropped because the pool was full.
    pub dropped: usize,
}

#[derive(Default)]
struct Counters {
    created: AtomicUsize,
    reused: AtomicUsize,
    dropped: AtomicUsize,
}

impl Counters {
    fn snapshot(&self) -> PoolStats {
        PoolStats {
            created: self.created.load(Ordering::Relaxed),
            reused: self.reused.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

/// A bounded, thread-safe pool of reusable instances.
pub struct ObjectPool<T> {
    free: Option<ArrayQueue<T>>,
    factory: Box<dyn Fn() -> T + Send + Sync>,
    counters: Counters,
}

impl<T> ObjectPool<T> {
    /// A pool holding at most [`DEFAULT_POOL_CAPACITY`] idle instances.
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::with_capacity(DEFAULT_POOL_CAPACITY, factory)
    }

    /// A pool holding at most `capacity` idle instances.
    ///
    /// A capacity of `0` disables reuse: every acquire builds a fresh instance.
    pub fn with_capacity<F>(capacity: usize, factory: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        ObjectPool {
            free: (capacity > 0).then(|| ArrayQueue::new(capacity)),
            factory: Box::new(factory),
            counters: Counters::default(),
        }
    }

    /// Takes an idle instance, or builds one with the factory.
    pub fn acquire(&self) -> T {
        if let Some(item) = self.free.as_ref().and_then(ArrayQueue::pop) {
            self.counters.reused.fetch_add(1, Ordering::Relaxed);
            return item;
        }
        self.counters.created.fetch_add(1, Ordering::Relaxed);
        (self.factory)()
    }

    /// Holds `item` for reuse unless the pool is already full.
    pub fn release(&self, item: T) {
        let rejected = match &self.free {
            Some(free) => free.push(item).is_err(),
            None => true,
        };
        if rejected {
            self.counters.dropped.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(
                type_name = std::any::type_name::<T>(),
                "pool full, dropping released instance"
            );
        }
    }

    /// Acquires an instance that returns itself to the pool when dropped.
    pub fn get(&self) -> PoolGuard<'_, T> {
        PoolGuard {
            pool: self,
            item: Some(self.acquire()),
        }
    }

    /// Idle instances currently held.
    pub fn len(&self) -> usize {
        self.free.as_ref().map_or(0, ArrayQueue::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Soft maximum of idle instances.
    pub fn capacity(&self) -> usize {
        self.free.as_ref().map_or(0, ArrayQueue::capacity)
    }

    pub fn stats(&self) -> PoolStats {
        self.counters.snapshot()
    }
}

impl<T: Default + 'static> Default for ObjectPool<T> {
    fn default() -> Self {
        Self::new(T::default)
    }
}

impl<T> fmt::Debug for ObjectPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectPool")
            .field("type", &std::any::type_name::<T>())
            .field("idle", &self.len())
            .field("capacity", &self.capacity())
            .field("stats", &self.stats())
            .finish()
    }
}

impl<T: Decoder> ObjectPool<T> {
    /// Decodes into a pooled instance: acquire, then populate in place.
    pub fn decode(&self, buf: &[u8], cursor: &mut usize) -> Result<PoolGuard<'_, T>> {
        let mut guard = self.get();
        guard.deserialize_in_place(buf, cursor)?;
        Ok(guard)
    }
}

/// A pooled instance that goes back to its pool on drop.
pub struct PoolGuard<'a, T> {
    pool: &'a ObjectPool<T>,
    item: Option<T>,
}

impl<T> PoolGuard<'_, T> {
    /// Detaches the instance from the pool.
    pub fn into_inner(mut self) -> T {
        // Always Some until drop
        self.item.take().expect("pool guard already released")
    }
}

impl<T> Deref for PoolGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.item.as_ref().expect("pool guard already released")
    }
}

impl<T> DerefMut for PoolGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.item.as_mut().expect("pool guard already released")
    }
}

impl<T> Drop for PoolGuard<'_, T> {
    fn drop(&mut self) {
        if let Some(item) = self.item.take() {
            self.pool.release(item);
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for PoolGuard<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PoolGuard").field(&self.item).finish()
    }
}

/// One size class of a [`BufferPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketSpec {
    /// Length of every buffer in the bucket.
    pub size: usize,
    /// Maximum idle buffers kept.
    pub capacity: usize,
}

/// Small / medium / large size classes used by `BufferPool::default()`.
pub const DEFAULT_BUCKETS: [BucketSpec; 3] = [
    BucketSpec {
        size: 256,
        capacity: 64,
    }, // 16 KB
    BucketSpec {
        size: 4096,
        capacity: 32,
    }, // 128 KB
    BucketSpec {
        size: 65536,
        capacity: 8,
    }, // 512 KB
];

struct Bucket {
    size: usize,
    free: ArrayQueue<BytesMut>,
}

/// Reusable byte buffers bucketed by size class.
pub struct BufferPool {
    buckets: Vec<Bucket>,
}

impl BufferPool {
    /// Builds a pool from size classes; classes with zero capacity are ignored.
    pub fn new(specs: &[BucketSpec]) -> Self {
        let mut buckets: Vec<Bucket> = specs
            .iter()
            .filter(|spec| spec.capacity > 0)
            .map(|spec| Bucket {
                size: spec.size,
                free: ArrayQueue::new(spec.capacity),
            })
            .collect();
        buckets.sort_by_key(|bucket| bucket.size);
        buckets.dedup_by_key(|bucket| bucket.size);
        BufferPool { buckets }
    }

    /// Returns a buffer of at least `min_size` bytes.
    ///
    /// The buffer comes from the smallest bucket that fits; when that bucket is empty
    /// or no bucket is large enough, a zeroed buffer is allocated. Reused buffers keep
    /// whatever they held unless they were released with `clear`.
    pub fn rent(&self, min_size: usize) -> BytesMut {
        match self.buckets.iter().find(|bucket| bucket.size >= min_size) {
            Some(bucket) => bucket
                .free
                .pop()
                .unwrap_or_else(|| BytesMut::zeroed(bucket.size)),
            None => BytesMut::zeroed(min_size),
        }
    }

    /// Puts `buf` back into the bucket matching its exact length, optionally zeroing it.
    ///
    /// Buffers of other lengths, or released into a full bucket, are dropped.
    pub fn release(&self, mut buf: BytesMut, clear: bool) {
        let Some(bucket) = self.buckets.iter().find(|bucket| bucket.size == buf.len()) else {
            return;
        };
        if clear {
            buf.fill(0);
        }
        if bucket.free.push(buf).is_err() {
            tracing::trace!(size = bucket.size, "buffer bucket full, dropping buffer");
        }
    }

    /// Idle buffers held per size class.
    pub fn idle(&self) -> Vec<(usize, usize)> {
        self.buckets
            .iter()
            .map(|bucket| (bucket.size, bucket.free.len()))
            .collect()
    }

    /// Serializes `value` into a rented buffer truncated to the written length.
    ///
    /// The returned buffer is no longer a bucket size; release the result of
    /// [`BufferPool::rent`] instead when reuse matters.
    pub fn encode<T: Encoder>(&self, value: &T) -> Result<BytesMut> {
        let size = value.size();
        let mut buf = self.rent(size);
        let mut cursor = 0;
        value.serialize(&mut buf, &mut cursor)?;
        buf.truncate(cursor);
        Ok(buf)
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(&DEFAULT_BUCKETS)
    }
}

impl fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferPool")
            .field("idle", &self.idle())
            .finish()
    }
}
