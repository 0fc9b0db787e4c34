//! In-memory request table

use std::collections::HashMap;

use crate::models::Request;

/// Insertion-ordered request rows keyed by id.
///
/// Upserting an existing id replaces the row in place, keeping its position.
#[derive(Debug, Clone, Default)]
pub struct RequestTable {
    rows: Vec<Request>,
    index: HashMap<String, usize>,
}

impl RequestTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from saved rows; later duplicates replace earlier ones.
    pub fn from_records(records: Vec<Request>) -> Self {
        let mut table = Self::new();
        for record in records {
            table.upsert(record);
        }
        table
    }

    pub fn upsert(&mut self, record: Request) {
        match self.index.get(&record.id) {
            Some(&pos) => self.rows[pos] = record,
            None => {
                self.index.insert(record.id.clone(), self.rows.len());
                self.rows.push(record);
            }
        }
    }

    pub fn get_by_id(&self, id: &str) -> Option<&Request> {
        self.index.get(id).map(|&pos| &self.rows[pos])
    }

    pub fn clear(&mut self) {
        let cleared = self.rows.len();
        self.rows.clear();
        self.index.clear();
        tracing::info!("Cleared {} requests", cleared);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Request> {
        self.rows.iter()
    }

    /// Mutable access for bulk updates; ids must not be changed.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Request> {
        self.rows.iter_mut()
    }

    pub fn to_vec(&self) -> Vec<Request> {
        self.rows.clone()
    }
}
