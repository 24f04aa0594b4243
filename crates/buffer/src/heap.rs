//! A table is the set of DATA pages in its file. Pages are not linked;
//! the heap enumerates by page id, skipping anything that isn't a DATA
//! page (the file may interleave B+Tree pages for the table's index).

use common::{DbError, DbResult, RecordId};
use storage::record;
use storage::{PageManager, PageType};
use types::Value;

use crate::BufferPool;

pub struct TableHeap {
    pool: BufferPool,
    /// First-fit insertion hint: the page we last found space in.
    rover: u32,
}

impl TableHeap {
    /// Opens (or creates) the backing file and, if new, allocates the
    /// first DATA page.
    pub fn open(manager: PageManager, pool_capacity: usize) -> DbResult<Self> {
        let mut pool = BufferPool::new(manager, pool_capacity);
        let first_data_page = if pool.page_manager().page_count() <= 1 {
            let id = pool.new_page(PageType::Data)?;
            pool.unpin(id, true)?;
            id
        } else {
            1
        };
        Ok(TableHeap {
            pool,
            rover: first_data_page,
        })
    }

    pub fn pool_mut(&mut self) -> &mut BufferPool {
        &mut self.pool
    }

    pub fn insert(&mut self, values: &[Value]) -> DbResult<RecordId> {
        let serialized = record::encode(values);
        let max_record_size = storage::PAGE_SIZE - storage::page::HEADER_SIZE - storage::page::SLOT_SIZE;
        if serialized.len() > max_record_size {
            return Err(DbError::Storage("RecordTooLarge".into()));
        }

        let page_id = self.find_page_with_space(serialized.len())?;
        let page = self.pool.get_mut(page_id)?;
        let slot = match page.insert_record(&serialized) {
            Ok(slot) => slot,
            Err(e) => {
                self.pool.unpin(page_id, false)?;
                return Err(e);
            }
        };
        self.pool.unpin(page_id, true)?;

        Ok(RecordId {
            page_id,
            slot,
        })
    }

    pub fn get(&mut self, rid: RecordId) -> DbResult<Option<Vec<Value>>> {
        if !rid.is_valid() {
            return Ok(None);
        }
        let page = self.pool.get(rid.page_id)?;
        let record = page.get_record(rid.slot).map(|bytes| record::decode(bytes));
        self.pool.unpin(rid.page_id, false)?;
        record.transpose()
    }

    /// May relocate the record within the same page; never changes the RID.
    pub fn update(&mut self, rid: RecordId, values: &[Value]) -> DbResult<bool> {
        if !rid.is_valid() {
            return Ok(false);
        }
        let serialized = record::encode(values);
        let page = self.pool.get_mut(rid.page_id)?;
        let result = page.update_record(rid.slot, &serialized);
        self.pool.unpin(rid.page_id, result.is_ok())?;
        Ok(result.is_ok())
    }

    pub fn delete(&mut self, rid: RecordId) -> DbResult<bool> {
        if !rid.is_valid() {
            return Ok(false);
        }
        let page = self.pool.get_mut(rid.page_id)?;
        let deleted = page.delete_record(rid.slot);
        self.pool.unpin(rid.page_id, deleted)?;
        Ok(deleted)
    }

    pub fn scan(&mut self) -> HeapIter<'_> {
        HeapIter {
            heap: self,
            current_page: None,
            next_page_id: 1,
            next_slot: 0,
        }
    }

    pub fn flush_all(&mut self) -> DbResult<()> {
        self.pool.flush_all()
    }

    fn find_page_with_space(&mut self, needed: usize) -> DbResult<u32> {
        let page_count = self.pool.page_manager().page_count();
        if self.rover == 0 || self.rover >= page_count {
            self.rover = 1;
        }

        let mut page_id = self.rover;
        while page_id < page_count {
            let page = self.pool.get(page_id)?;
            let fits = page.page_type()? == PageType::Data
                && page.free_space() as usize >= needed + storage::page::SLOT_SIZE;
            self.pool.unpin(page_id, false)?;
            if fits {
                self.rover = page_id;
                return Ok(page_id);
            }
            page_id += 1;
        }

        let new_page = self.pool.new_page(PageType::Data)?;
        self.pool.unpin(new_page, true)?;
        self.rover = new_page;
        Ok(new_page)
    }
}

/// Single-pass scan iterator. Holds at most one pinned page at a time
/// and releases it before moving to the next.
pub struct HeapIter<'a> {
    heap: &'a mut TableHeap,
    current_page: Option<u32>,
    next_page_id: u32,
    next_slot: u16,
}

impl<'a> HeapIter<'a> {
    pub fn next_row(&mut self) -> DbResult<Option<(RecordId, Vec<Value>)>> {
        loop {
            if self.current_page.is_none() {
                let page_count = self.heap.pool.page_manager().page_count();
                if self.next_page_id >= page_count {
                    return Ok(None);
                }
                let page = self.heap.pool.get(self.next_page_id)?;
                if page.page_type()? != PageType::Data {
                    self.heap.pool.unpin(self.next_page_id, false)?;
                    self.next_page_id += 1;
                    continue;
                }
                self.current_page = Some(self.next_page_id);
                self.next_slot = 0;
            }

            let page_id = self.current_page.unwrap();
            let page = self.heap.pool.get_mut(page_id)?;
            // We only peeked `get` above for the type check; pin count
            // from that call is still held, so use get_mut without an
            // extra pin here.
            if self.next_slot < page.slot_count() {
                let slot = self.next_slot;
                self.next_slot += 1;
                if let Some(bytes) = page.get_record(slot) {
                    let values = record::decode(bytes)?;
                    return Ok(Some((
                        RecordId {
                            page_id,
                            slot,
                        },
                        values,
                    )));
                }
                continue;
            } else {
                self.heap.pool.unpin(page_id, false)?;
                self.current_page = None;
                self.next_page_id += 1;
            }
        }
    }
}

impl<'a> Drop for HeapIter<'a> {
    fn drop(&mut self) {
        if let Some(page_id) = self.current_page.take() {
            let _ = self.heap.pool.unpin(page_id, false);
        }
    }
}
