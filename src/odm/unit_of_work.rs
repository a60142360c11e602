//! Per-request unit of work: tracks new and loaded documents and writes them on flush.

use crate::config::IdStrategy;
use crate::error::StoreError;
use crate::odm::document::{identity_key, Document};
use crate::odm::manager::DocumentManager;
use serde_json::{Map, Value};

/// Position of a tracked document. Stays valid after other documents are detached.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DocumentHandle(usize);

enum EntryState {
    New,
    Managed { original: Map<String, Value> },
}

struct Entry {
    state: EntryState,
    document: Document,
}

pub struct UnitOfWork<'a> {
    dm: &'a DocumentManager,
    entries: Vec<Option<Entry>>,
}

impl<'a> UnitOfWork<'a> {
    pub(crate) fn new(dm: &'a DocumentManager) -> Self {
        UnitOfWork {
            dm,
            entries: Vec::new(),
        }
    }

    fn track(&mut self, entry: Entry) -> DocumentHandle {
        self.entries.push(Some(entry));
        DocumentHandle(self.entries.len() - 1)
    }

    /// Load a document by identifier and start tracking it. A document already tracked is returned as is.
    pub async fn find(&mut self, class: &str, id: &Value) -> Result<Option<DocumentHandle>, StoreError> {
        let meta = self.dm.class_metadata(class)?;
        let key = identity_key(id);
        let tracked = self.entries.iter().position(|e| {
            e.as_ref()
                .map(|e| e.document.class() == class && e.document.identifier(&meta).map(identity_key) == Some(key.clone()))
                .unwrap_or(false)
        });
        if let Some(i) = tracked {
            return Ok(Some(DocumentHandle(i)));
        }
        let found = self
            .dm
            .create_query_builder(class)?
            .equals(meta.identifier.clone(), id.clone())
            .single_result()
            .await?;
        Ok(found.map(|document| {
            self.track(Entry {
                state: EntryState::Managed {
                    original: document.fields().clone(),
                },
                document,
            })
        }))
    }

    /// Schedule a new document for insertion on the next flush.
    pub fn persist(&mut self, document: Document) -> DocumentHandle {
        self.track(Entry {
            state: EntryState::New,
            document,
        })
    }

    pub fn get(&self, handle: DocumentHandle) -> Option<&Document> {
        self.entries.get(handle.0).and_then(|e| e.as_ref()).map(|e| &e.document)
    }

    pub fn get_mut(&mut self, handle: DocumentHandle) -> Option<&mut Document> {
        self.entries
            .get_mut(handle.0)
            .and_then(|e| e.as_mut())
            .map(|e| &mut e.document)
    }

    pub fn document(&self, handle: DocumentHandle) -> Result<&Document, StoreError> {
        self.get(handle).ok_or(StoreError::NotTracked)
    }

    pub fn document_mut(&mut self, handle: DocumentHandle) -> Result<&mut Document, StoreError> {
        self.get_mut(handle).ok_or(StoreError::NotTracked)
    }

    pub fn is_tracked(&self, handle: DocumentHandle) -> bool {
        self.get(handle).is_some()
    }

    /// Stop tracking a document; its in-memory changes are never written.
    pub fn detach(&mut self, handle: DocumentHandle) -> Option<Document> {
        self.entries
            .get_mut(handle.0)
            .and_then(Option::take)
            .map(|e| e.document)
    }

    /// Insert new documents and write changed managed ones, in tracking order.
    pub async fn flush(&mut self) -> Result<(), StoreError> {
        let dm = self.dm;
        for entry in self.entries.iter_mut().flatten() {
            let meta = dm.class_metadata(entry.document.class())?;
            match &entry.state {
                EntryState::New => {
                    if entry.document.identifier(&meta).is_none() {
                        match meta.id_strategy {
                            IdStrategy::Auto => entry
                                .document
                                .put(&meta.identifier, Value::String(uuid::Uuid::new_v4().to_string())),
                            IdStrategy::None => {
                                return Err(StoreError::MissingIdentifier {
                                    class: meta.class.clone(),
                                })
                            }
                        }
                    }
                    dm.event_manager().dispatch_pre_persist(&mut entry.document, &meta);
                    let id = entry
                        .document
                        .identifier(&meta)
                        .cloned()
                        .ok_or_else(|| StoreError::MissingIdentifier {
                            class: meta.class.clone(),
                        })?;
                    tracing::debug!(class = %meta.class, id = %identity_key(&id), "insert");
                    dm.store().insert(&meta, &id, entry.document.fields()).await?;
                }
                EntryState::Managed { original } => {
                    if entry.document.fields() == original {
                        continue;
                    }
                    dm.event_manager().dispatch_pre_update(&mut entry.document, &meta);
                    let id = entry
                        .document
                        .identifier(&meta)
                        .cloned()
                        .ok_or_else(|| StoreError::MissingIdentifier {
                            class: meta.class.clone(),
                        })?;
                    tracing::debug!(class = %meta.class, id = %identity_key(&id), "replace");
                    dm.store().replace(&meta, &id, entry.document.fields()).await?;
                }
            }
            entry.state = EntryState::Managed {
                original: entry.document.fields().clone(),
            };
        }
        Ok(())
    }
}
