use dashmap::DashMap;

use crate::error::ApiError;

// Anything keyed by a string id
pub trait Document: Clone {
    fn id(&self) -> &str;
}

/// In-memory document table, one per collection.
pub struct Store<T> {
    name: &'static str,
    documents: DashMap<String, T>,
}

impl<T: Document> Store<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            documents: DashMap::new(),
        }
    }

    pub fn save(&self, document: T) -> T {
        self.documents.insert(document.id().to_string(), document.clone());
        document
    }

    // Only replaces an existing document
    pub fn update(&self, document: T) -> Result<T, ApiError> {
        match self.documents.get_mut(document.id()) {
            Some(mut existing) => {
                *existing = document.clone();
                Ok(document)
            }
            None => Err(self.not_found()),
        }
    }

    pub fn delete(&self, id: &str) -> Result<T, ApiError> {
        self.documents
            .remove(id)
            .map(|(_, document)| document)
            .ok_or_else(|| self.not_found())
    }

    pub fn find_by_id(&self, id: &str) -> Result<T, ApiError> {
        self.documents
            .get(id)
            .map(|document| document.value().clone())
            .ok_or_else(|| self.not_found())
    }

    pub fn find_where<F>(&self, predicate: F) -> Vec<T>
    where
        F: Fn(&T) -> bool,
    {
        self.documents
            .iter()
            .filter(|entry| predicate(entry.value()))
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    fn not_found(&self) -> ApiError {
        ApiError::NotFound(self.name.to_string())
    }
}
