use std::sync::Arc;

use crate::common::{PageId, RecordId, Result, SlotId, StrataError, TransactionId, PAGE_SIZE};
use crate::tuple::{Schema, Tuple};

/// Heap page layout:
///
/// +------------------+
/// | Header bitmap    |  (ceil(num_slots / 8) bytes)
/// +------------------+
/// | [slot 0]         |  (tuple_size bytes each)
/// | [slot 1]         |
/// | ...              |
/// +------------------+
/// | Zero padding     |
/// +------------------+
///
/// Bit `i` of the header (LSB first within each byte) is set when slot `i`
/// holds a tuple. Every slot has the same width because every column type
/// is fixed width, so a page of `PAGE_SIZE` bytes holds
/// `floor(PAGE_SIZE * 8 / (tuple_size * 8 + 1))` tuples: each tuple costs
/// its bytes plus one header bit.
#[derive(Debug, Clone)]
pub struct HeapPage {
    page_id: PageId,
    schema: Arc<Schema>,
    /// Decoded slots; `None` marks a free slot
    slots: Vec<Option<Tuple>>,
    /// Transaction that last dirtied this page, if any
    dirtied_by: Option<TransactionId>,
}

impl HeapPage {
    /// Returns how many tuples of the given schema fit on one page.
    pub fn slots_per_page(schema: &Schema) -> usize {
        (PAGE_SIZE * 8) / (schema.tuple_size() * 8 + 1)
    }

    /// Returns the size of the header bitmap in bytes.
    pub fn header_size(schema: &Schema) -> usize {
        Self::slots_per_page(schema).div_ceil(8)
    }

    /// Returns the bytes of a page with every slot free.
    pub fn empty_page_data() -> Vec<u8> {
        vec![0u8; PAGE_SIZE]
    }

    /// Creates an empty in-memory page.
    pub fn empty(page_id: PageId, schema: Arc<Schema>) -> Self {
        let num_slots = Self::slots_per_page(&schema);
        Self {
            page_id,
            schema,
            slots: vec![None; num_slots],
            dirtied_by: None,
        }
    }

    /// Decodes a page from exactly `PAGE_SIZE` bytes.
    pub fn from_bytes(page_id: PageId, schema: Arc<Schema>, data: &[u8]) -> Result<Self> {
        if data.len() != PAGE_SIZE {
            return Err(StrataError::Corrupted(format!(
                "page {} has {} bytes, expected {}",
                page_id,
                data.len(),
                PAGE_SIZE
            )));
        }

        let num_slots = Self::slots_per_page(&schema);
        let header_size = Self::header_size(&schema);
        let tuple_size = schema.tuple_size();
        let (header, body) = data.split_at(header_size);

        let mut slots = Vec::with_capacity(num_slots);
        for i in 0..num_slots {
            if header[i / 8] & (1 << (i % 8)) == 0 {
                slots.push(None);
                continue;
            }
            let start = i * tuple_size;
            let mut tuple = Tuple::from_bytes(schema.clone(), &body[start..start + tuple_size])?;
            tuple.set_record_id(Some(RecordId::new(page_id, SlotId::new(i as u16))));
            slots.push(Some(tuple));
        }

        Ok(Self {
            page_id,
            schema,
            slots,
            dirtied_by: None,
        })
    }

    /// Encodes the page into exactly `PAGE_SIZE` bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let header_size = Self::header_size(&self.schema);
        let tuple_size = self.schema.tuple_size();
        let mut data = Self::empty_page_data();

        for (i, slot) in self.slots.iter().enumerate() {
            if let Some(tuple) = slot {
                data[i / 8] |= 1 << (i % 8);
                let start = header_size + i * tuple_size;
                data[start..start + tuple_size].copy_from_slice(&tuple.to_bytes()?);
            }
        }

        Ok(data)
    }

    /// Returns the page ID.
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Returns the schema of the tuples stored on this page.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Returns the total number of slots.
    pub fn num_slots(&self) -> usize {
        self.slots.len()
    }

    /// Returns the number of free slots.
    pub fn free_slots(&self) -> usize {
        self.slots.iter().filter(|s| s.is_none()).count()
    }

    /// Returns whether the given slot holds a tuple.
    pub fn is_slot_used(&self, slot_id: SlotId) -> bool {
        matches!(self.slots.get(slot_id.as_usize()), Some(Some(_)))
    }

    /// Stores `tuple` in the first free slot and stamps its record ID.
    pub fn insert_tuple(&mut self, tuple: &mut Tuple) -> Result<RecordId> {
        if !tuple.schema().same_types(&self.schema) {
            return Err(StrataError::SchemaMismatch(format!(
                "tuple does not match the schema of page {}",
                self.page_id
            )));
        }

        let index = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(StrataError::PageFull(self.page_id))?;

        let record_id = RecordId::new(self.page_id, SlotId::new(index as u16));
        tuple.set_record_id(Some(record_id));

        let mut stored = tuple.clone().with_schema(self.schema.clone());
        stored.set_record_id(Some(record_id));
        self.slots[index] = Some(stored);

        Ok(record_id)
    }

    /// Frees the slot the tuple's record ID points at.
    pub fn delete_tuple(&mut self, tuple: &Tuple) -> Result<()> {
        let record_id = tuple.record_id().ok_or(StrataError::MissingRecordId)?;
        if record_id.page_id != self.page_id {
            return Err(StrataError::PageNotFound(record_id.page_id));
        }

        let slot = record_id.slot_id;
        match self.slots.get_mut(slot.as_usize()) {
            None => Err(StrataError::InvalidSlotId(slot.as_u16())),
            Some(entry @ Some(_)) => {
                *entry = None;
                Ok(())
            }
            Some(None) => Err(StrataError::EmptySlot(slot.as_u16())),
        }
    }

    /// Returns an iterator over stored tuples in slot order.
    pub fn tuples(&self) -> impl Iterator<Item = &Tuple> + '_ {
        self.slots.iter().filter_map(Option::as_ref)
    }

    /// Returns the number of stored tuples.
    pub fn tuple_count(&self) -> usize {
        self.tuples().count()
    }

    /// Marks the page dirty on behalf of `txn`, or clean when `None`.
    pub fn mark_dirty(&mut self, txn: Option<TransactionId>) {
        self.dirtied_by = txn;
    }

    /// Returns the transaction that dirtied this page, if it is dirty.
    pub fn dirtied_by(&self) -> Option<TransactionId> {
        self.dirtied_by
    }

    pub fn is_dirty(&self) -> bool {
        self.dirtied_by.is_some()
    }
}
