//! Slotted page layout: a fixed header, records growing forward from it,
//! and a slot directory growing backward from the end of the page.

use common::{DbError, DbResult};

use crate::PAGE_SIZE;

pub const MAGIC: [u8; 4] = *b"ADB1";
pub const FORMAT_VERSION: u8 = 1;

/// `[magic:4][version:1]` ahead of every `PageHeader`.
const PREAMBLE_SIZE: usize = MAGIC.len() + 1;
const PAGE_HEADER_SIZE: usize = 4 + 1 + 2 + 2 + 2; // page_id, page_type, free_ptr, slot_count, free_size
pub const HEADER_SIZE: usize = PREAMBLE_SIZE + PAGE_HEADER_SIZE;
/// `offset:u2 + length:u2 + is_deleted:u1`, padded to 16-bit alignment.
pub const SLOT_SIZE: usize = 6;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum PageType {
    Invalid = 0,
    Data = 1,
    Header = 2,
    Free = 3,
    BTreeInternal = 4,
    BTreeLeaf = 5,
}

impl PageType {
    fn from_u8(v: u8) -> DbResult<Self> {
        Ok(match v {
            0 => PageType::Invalid,
            1 => PageType::Data,
            2 => PageType::Header,
            3 => PageType::Free,
            4 => PageType::BTreeInternal,
            5 => PageType::BTreeLeaf,
            other => {
                return Err(DbError::Storage(format!("unknown page type tag {other}")));
            }
        })
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct PageHeader {
    page_id: u32,
    page_type: u8,
    free_ptr: u16,
    slot_count: u16,
    free_size: u16,
}

#[derive(Clone, Copy, Debug)]
struct Slot {
    offset: u16,
    length: u16,
    is_deleted: bool,
}

/// One 8 KiB page, held in memory as an owned buffer. The buffer is what
/// gets read from and written to the table file verbatim.
#[derive(Clone, Debug)]
pub struct Page {
    data: Vec<u8>,
    dirty: bool,
}

impl Page {
    /// A page-sized buffer of zero bytes, not yet initialised with a
    /// header. Used as a scratch destination for `PageManager::read`.
    pub fn zeroed() -> Self {
        Page {
            data: vec![0u8; PAGE_SIZE],
            dirty: false,
        }
    }

    pub fn init(page_id: u32, page_type: PageType) -> Self {
        let mut page = Self::zeroed();
        let header = PageHeader {
            page_id,
            page_type: page_type as u8,
            free_ptr: HEADER_SIZE as u16,
            slot_count: 0,
            free_size: (PAGE_SIZE - HEADER_SIZE) as u16,
        };
        page.write_preamble();
        page.write_header(&header);
        page.dirty = true;
        page
    }

    pub fn from_bytes(data: Vec<u8>) -> DbResult<Self> {
        if data.len() != PAGE_SIZE {
            return Err(DbError::Storage(format!(
                "page buffer has {} bytes, expected {PAGE_SIZE}",
                data.len()
            )));
        }
        let page = Page { data, dirty: false };
        if &page.data[..MAGIC.len()] != &MAGIC {
            return Err(DbError::Storage("bad page magic".into()));
        }
        if page.data[MAGIC.len()] != FORMAT_VERSION {
            return Err(DbError::Storage(format!(
                "unsupported page format version {}",
                page.data[MAGIC.len()]
            )));
        }
        Ok(page)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    pub fn page_id(&self) -> u32 {
        self.header().page_id
    }

    pub fn page_type(&self) -> DbResult<PageType> {
        PageType::from_u8(self.header().page_type)
    }

    pub fn slot_count(&self) -> u16 {
        self.header().slot_count
    }

    pub fn free_space(&self) -> u16 {
        self.header().free_size
    }

    /// Raw byte range `[HEADER_SIZE..)` available to a component layered
    /// on top of the generic slotted layout (the B+Tree header and
    /// entries, for instance).
    pub fn payload_mut(&mut self) -> &mut [u8] {
        self.dirty = true;
        &mut self.data[HEADER_SIZE..]
    }

    pub fn payload(&self) -> &[u8] {
        &self.data[HEADER_SIZE..]
    }

    /// Insert a record, reusing the lowest tombstoned slot if one exists,
    /// else appending a new slot. Fails with `NoSpace` (as `DbError::Storage`)
    /// if there isn't room for the payload plus a new slot entry.
    pub fn insert_record(&mut self, record: &[u8]) -> DbResult<u16> {
        if record.len() > u16::MAX as usize {
            return Err(DbError::Storage("record exceeds 64KiB".into()));
        }
        let record_len = record.len() as u16;
        let mut header = self.header();

        let reused = (0..header.slot_count).find(|&i| self.read_slot(i).is_deleted);

        let space_needed = record_len as usize
            + if reused.is_none() { SLOT_SIZE } else { 0 };
        if (header.free_size as usize) < space_needed {
            return Err(DbError::Storage("NoSpace".into()));
        }

        let slot_id = match reused {
            Some(id) => id,
            None => {
                let id = header.slot_count;
                header.slot_count += 1;
                id
            }
        };

        let offset = header.free_ptr;
        self.data[offset as usize..offset as usize + record.len()].copy_from_slice(record);
        self.write_slot(
            slot_id,
            &Slot {
                offset,
                length: record_len,
                is_deleted: false,
            },
        );

        header.free_ptr += record_len;
        self.write_header(&header);
        self.recompute_free_space();
        self.dirty = true;
        Ok(slot_id)
    }

    pub fn get_record(&self, slot_id: u16) -> Option<&[u8]> {
        let header = self.header();
        if slot_id >= header.slot_count {
            return None;
        }
        let slot = self.read_slot(slot_id);
        if slot.is_deleted {
            return None;
        }
        Some(&self.data[slot.offset as usize..(slot.offset + slot.length) as usize])
    }

    /// In place if the new payload is no larger than the old one.
    /// Otherwise tombstones, compacts, and re-appends under the same slot
    /// id, so the RID never changes.
    pub fn update_record(&mut self, slot_id: u16, record: &[u8]) -> DbResult<()> {
        let header = self.header();
        if slot_id >= header.slot_count {
            return Err(DbError::Storage("slot out of range".into()));
        }
        let slot = self.read_slot(slot_id);
        if slot.is_deleted {
            return Err(DbError::Storage("slot already deleted".into()));
        }

        if record.len() <= slot.length as usize {
            self.data[slot.offset as usize..slot.offset as usize + record.len()]
                .copy_from_slice(record);
            self.write_slot(
                slot_id,
                &Slot {
                    offset: slot.offset,
                    length: record.len() as u16,
                    is_deleted: false,
                },
            );
            self.recompute_free_space();
            self.dirty = true;
            return Ok(());
        }

        // Grows: tombstone, compact to reclaim space, then append back
        // under the same slot so the RID is preserved.
        self.write_slot(
            slot_id,
            &Slot {
                offset: slot.offset,
                length: slot.length,
                is_deleted: true,
            },
        );
        self.recompute_free_space();
        self.compact();

        let header = self.header();
        let space_needed = record.len();
        if (header.free_size as usize) < space_needed {
            return Err(DbError::Storage("NoSpace".into()));
        }
        let offset = header.free_ptr;
        self.data[offset as usize..offset as usize + record.len()].copy_from_slice(record);
        self.write_slot(
            slot_id,
            &Slot {
                offset,
                length: record.len() as u16,
                is_deleted: false,
            },
        );
        let mut header = header;
        header.free_ptr += record.len() as u16;
        self.write_header(&header);
        self.recompute_free_space();
        self.dirty = true;
        Ok(())
    }

    pub fn delete_record(&mut self, slot_id: u16) -> bool {
        let header = self.header();
        if slot_id >= header.slot_count {
            return false;
        }
        let mut slot = self.read_slot(slot_id);
        if slot.is_deleted {
            return false;
        }
        slot.is_deleted = true;
        self.write_slot(slot_id, &slot);
        self.recompute_free_space();
        self.dirty = true;
        true
    }

    /// Live slots that have not been tombstoned, in slot-id order.
    pub fn live_slots(&self) -> Vec<u16> {
        let header = self.header();
        (0..header.slot_count)
            .filter(|&i| !self.read_slot(i).is_deleted)
            .collect()
    }

    /// Rewrite live records contiguously from `HEADER_SIZE`, in slot
    /// order, and reset `free_ptr`. Tombstoned slots keep their index so
    /// later inserts can still reuse them.
    pub fn compact(&mut self) {
        let header = self.header();
        if header.slot_count == 0 {
            return;
        }

        let mut write_offset = HEADER_SIZE as u16;
        let mut temp = vec![0u8; PAGE_SIZE];
        for slot_id in 0..header.slot_count {
            let slot = self.read_slot(slot_id);
            if slot.is_deleted {
                continue;
            }
            let src = slot.offset as usize..(slot.offset + slot.length) as usize;
            let len = slot.length as usize;
            temp[write_offset as usize..write_offset as usize + len]
                .copy_from_slice(&self.data[src]);
            self.write_slot(
                slot_id,
                &Slot {
                    offset: write_offset,
                    length: slot.length,
                    is_deleted: false,
                },
            );
            write_offset += slot.length;
        }
        self.data[HEADER_SIZE..write_offset as usize]
            .copy_from_slice(&temp[HEADER_SIZE..write_offset as usize]);

        let mut header = header;
        header.free_ptr = write_offset;
        self.write_header(&header);
        self.recompute_free_space();
        self.dirty = true;
    }

    fn recompute_free_space(&mut self) {
        let mut header = self.header();
        let records_end = header.free_ptr as usize;
        let slots_start = PAGE_SIZE - header.slot_count as usize * SLOT_SIZE;
        header.free_size = slots_start.saturating_sub(records_end) as u16;
        self.write_header(&header);
    }

    fn write_preamble(&mut self) {
        self.data[..MAGIC.len()].copy_from_slice(&MAGIC);
        self.data[MAGIC.len()] = FORMAT_VERSION;
    }

    fn header(&self) -> PageHeader {
        let b = &self.data[PREAMBLE_SIZE..HEADER_SIZE];
        PageHeader {
            page_id: u32::from_le_bytes(b[0..4].try_into().unwrap()),
            page_type: b[4],
            free_ptr: u16::from_le_bytes(b[5..7].try_into().unwrap()),
            slot_count: u16::from_le_bytes(b[7..9].try_into().unwrap()),
            free_size: u16::from_le_bytes(b[9..11].try_into().unwrap()),
        }
    }

    fn write_header(&mut self, header: &PageHeader) {
        let b = &mut self.data[PREAMBLE_SIZE..HEADER_SIZE];
        b[0..4].copy_from_slice(&header.page_id.to_le_bytes());
        b[4] = header.page_type;
        b[5..7].copy_from_slice(&header.free_ptr.to_le_bytes());
        b[7..9].copy_from_slice(&header.slot_count.to_le_bytes());
        b[9..11].copy_from_slice(&header.free_size.to_le_bytes());
    }

    fn slot_at(&self, slot_id: u16) -> std::ops::Range<usize> {
        let end = PAGE_SIZE - slot_id as usize * SLOT_SIZE;
        end - SLOT_SIZE..end
    }

    fn read_slot(&self, slot_id: u16) -> Slot {
        let range = self.slot_at(slot_id);
        let b = &self.data[range];
        Slot {
            offset: u16::from_le_bytes(b[0..2].try_into().unwrap()),
            length: u16::from_le_bytes(b[2..4].try_into().unwrap()),
            is_deleted: b[4] != 0,
        }
    }

    fn write_slot(&mut self, slot_id: u16, slot: &Slot) {
        let range = self.slot_at(slot_id);
        let b = &mut self.data[range];
        b[0..2].copy_from_slice(&slot.offset.to_le_bytes());
        b[2..4].copy_from_slice(&slot.length.to_le_bytes());
        b[4] = slot.is_deleted as u8;
        b[5] = 0;
    }
}
