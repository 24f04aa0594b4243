//! A fixed pool of frames caching pages from one table file, with
//! pin-count reference counting and LRU eviction restricted to frames
//! nobody currently holds pinned.

use std::collections::{HashMap, VecDeque};

use common::{DbError, DbResult};
use storage::{Page, PageManager, PageType};

struct Frame {
    page: Page,
    pin_count: u32,
    is_dirty: bool,
}

/// Caching layer over a [`PageManager`]. Every `get`/`new_page` call
/// pins the returned page; callers must pair it with exactly one
/// `unpin`.
pub struct BufferPool {
    manager: PageManager,
    capacity: usize,
    frames: HashMap<u32, Frame>,
    /// Recency order, most-recently-used at the front. Mirrors the
    /// source's `std::list` + splice-to-front pattern.
    recency: VecDeque<u32>,
}

impl BufferPool {
    pub fn new(manager: PageManager, capacity: usize) -> Self {
        BufferPool {
            manager,
            capacity: capacity.max(1),
            frames: HashMap::new(),
            recency: VecDeque::new(),
        }
    }

    pub fn get(&mut self, page_id: u32) -> DbResult<&Page> {
        if self.frames.contains_key(&page_id) {
            self.touch(page_id);
            self.frames.get_mut(&page_id).unwrap().pin_count += 1;
            return Ok(&self.frames.get(&page_id).unwrap().page);
        }

        let page = self.manager.read(page_id)?;
        self.install(page_id, page, false)?;
        Ok(&self.frames.get(&page_id).unwrap().page)
    }

    pub fn new_page(&mut self, page_type: PageType) -> DbResult<u32> {
        let page_id = self.manager.allocate(page_type)?;
        let page = Page::init(page_id, page_type);
        self.install(page_id, page, true)?;
        Ok(page_id)
    }

    /// Decrements the pin count; errors if the page isn't cached or is
    /// already fully unpinned (a programmer error, not a structural
    /// "not found").
    pub fn unpin(&mut self, page_id: u32, mark_dirty: bool) -> DbResult<()> {
        let frame = self
            .frames
            .get_mut(&page_id)
            .ok_or_else(|| DbError::Storage(format!("unpin: page {page_id} not cached")))?;
        if frame.pin_count == 0 {
            return Err(DbError::Storage(format!(
                "unpin: page {page_id} was not pinned"
            )));
        }
        frame.pin_count -= 1;
        if mark_dirty {
            frame.is_dirty = true;
            frame.page.mark_dirty();
        }
        Ok(())
    }

    pub fn flush(&mut self, page_id: u32) -> DbResult<()> {
        let Some(frame) = self.frames.get_mut(&page_id) else {
            return Ok(());
        };
        if frame.is_dirty || frame.page.is_dirty() {
            self.manager.write(&frame.page)?;
            frame.is_dirty = false;
            frame.page.clear_dirty();
        }
        Ok(())
    }

    pub fn flush_all(&mut self) -> DbResult<()> {
        let ids: Vec<u32> = self.frames.keys().copied().collect();
        for id in ids {
            self.flush(id)?;
        }
        self.manager.flush()
    }

    /// Fails if the page is currently pinned. Evicts the cached copy (if
    /// any) without writing it back, then delegates to the page manager.
    pub fn delete_page(&mut self, page_id: u32) -> DbResult<()> {
        if let Some(frame) = self.frames.get(&page_id) {
            if frame.pin_count > 0 {
                return Err(DbError::Storage(format!(
                    "cannot delete pinned page {page_id}"
                )));
            }
            self.frames.remove(&page_id);
            self.recency.retain(|&id| id != page_id);
        }
        self.manager.deallocate(page_id);
        Ok(())
    }

    pub fn page_manager(&self) -> &PageManager {
        &self.manager
    }

    pub fn page_manager_mut(&mut self) -> &mut PageManager {
        &mut self.manager
    }

    /// Mutable access to a cached page without changing its pin count.
    /// Callers must already hold a pin on `page_id`.
    pub fn get_mut(&mut self, page_id: u32) -> DbResult<&mut Page> {
        self.frames
            .get_mut(&page_id)
            .map(|f| &mut f.page)
            .ok_or_else(|| DbError::Storage(format!("page {page_id} not cached")))
    }

    fn touch(&mut self, page_id: u32) {
        self.recency.retain(|&id| id != page_id);
        self.recency.push_front(page_id);
    }

    fn install(&mut self, page_id: u32, page: Page, dirty: bool) -> DbResult<()> {
        if self.frames.len() >= self.capacity && !self.frames.contains_key(&page_id) {
            self.evict_one()?;
        }
        self.frames.insert(
            page_id,
            Frame {
                page,
                pin_count: 1,
                is_dirty: dirty,
            },
        );
        self.touch(page_id);
        Ok(())
    }

    /// LRU over unpinned frames: scan recency order from the tail.
    fn evict_one(&mut self) -> DbResult<()> {
        let victim = self
            .recency
            .iter()
            .rev()
            .find(|id| self.frames.get(id).is_some_and(|f| f.pin_count == 0))
            .copied()
            .ok_or(DbError::PoolExhausted)?;

        tracing::debug!(page_id = victim, "evicting frame");
        self.flush(victim)?;
        self.frames.remove(&victim);
        self.recency.retain(|&id| id != victim);
        Ok(())
    }
}
