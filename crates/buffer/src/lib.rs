//! Pinning page cache and the table heap built on top of it.
//!
//! [`pool::BufferPool`] is the cache: it keeps a bounded set of frames
//! per table file, pins pages while a caller holds them, and evicts
//! from the unpinned tail of an LRU list. [`heap::TableHeap`] is a
//! table's row store, expressed purely in terms of a buffer pool.

pub mod heap;
pub mod pool;

pub use heap::TableHeap;
pub use pool::BufferPool;
