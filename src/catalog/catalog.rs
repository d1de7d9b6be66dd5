use std::collections::HashMap;
use std::sync::Arc;
use log::debug;
use parking_lot::RwLock;

use crate::common::types::TableId;
use crate::storage::store::PageStore;

/// Registry of the tables known to a buffer pool and the stores backing them
#[derive(Default)]
pub struct Catalog {
    tables: RwLock<HashMap<TableId, Arc<dyn PageStore>>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `store` under its table id, returning any store it replaces
    pub fn add_table(&self, store: Arc<dyn PageStore>) -> Option<Arc<dyn PageStore>> {
        let table_id = store.table_id();
        debug!("Registering table {}", table_id);
        self.tables.write().insert(table_id, store)
    }

    /// The store backing `table_id`
    pub fn page_store(&self, table_id: TableId) -> Option<Arc<dyn PageStore>> {
        self.tables.read().get(&table_id).cloned()
    }

    pub fn remove_table(&self, table_id: TableId) -> Option<Arc<dyn PageStore>> {
        self.tables.write().remove(&table_id)
    }

    pub fn table_exists(&self, table_id: TableId) -> bool {
        self.tables.read().contains_key(&table_id)
    }

    /// Registered table ids in ascending order
    pub fn table_ids(&self) -> Vec<TableId> {
        let mut ids: Vec<TableId> = self.tables.read().keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}
