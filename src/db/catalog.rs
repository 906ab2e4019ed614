use tokio::sync::{Mutex, MutexGuard, RwLock};

use crate::{
    error::{AppError, AppResult},
    models::Event,
};

/// In-memory, insertion-ordered event catalog
///
/// Mutations are serialised behind a single writer mutex; readers only take
/// the inner read lock long enough to clone. A multi-step mutation holds a
/// [`CatalogUpdate`] so that nothing can be appended between its snapshot and
/// its write-back.
#[derive(Debug, Default)]
pub struct EventCatalog {
    events: RwLock<Vec<Event>>,
    writer: Mutex<()>,
}

/// Exclusive mutation handle on an [`EventCatalog`]
///
/// While this guard is alive every other mutation waits. Reads are not
/// blocked.
pub struct CatalogUpdate<'a> {
    catalog: &'a EventCatalog,
    _writer: MutexGuard<'a, ()>,
}

impl EventCatalog {
    /// Creates an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires exclusive mutation rights
    pub async fn begin_update(&self) -> CatalogUpdate<'_> {
        let writer = self.writer.lock().await;
        CatalogUpdate {
            catalog: self,
            _writer: writer,
        }
    }

    /// Appends events to the end of the catalog
    pub async fn append(&self, events: Vec<Event>) {
        self.begin_update().await.append(events).await;
    }

    /// Swaps the catalog contents for a same-length sequence
    pub async fn replace_all(&self, events: Vec<Event>) -> AppResult<()> {
        self.begin_update().await.replace_all(events).await
    }

    /// Finds the first event whose name matches ignoring case
    pub async fn find_by_name(&self, name: &str) -> Option<Event> {
        let events = self.events.read().await;
        events.iter().find(|event| event.matches_name(name)).cloned()
    }

    /// Returns a consistent copy of the current contents
    pub async fn snapshot(&self) -> Vec<Event> {
        self.events.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.events.read().await.is_empty()
    }
}

impl CatalogUpdate<'_> {
    /// Copy of the contents as seen by this update
    pub async fn snapshot(&self) -> Vec<Event> {
        self.catalog.snapshot().await
    }

    pub async fn append(&mut self, events: Vec<Event>) {
        let mut current = self.catalog.events.write().await;
        current.extend(events);
    }

    /// Replaces every event, rejecting sequences whose length differs from
    /// the current catalog
    pub async fn replace_all(&mut self, events: Vec<Event>) -> AppResult<()> {
        let mut current = self.catalog.events.write().await;
        if events.len() != current.len() {
            return Err(AppError::InvalidInput(format!(
                "Replacement has {} events but the catalog holds {}",
                events.len(),
                current.len()
            )));
        }
        *current = events;
        Ok(())
    }
}
