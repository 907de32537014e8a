//! In-memory test double for the document store.
//!
//! Mirrors the store's optimistic-concurrency behavior: every document
//! carries a revision token, mutations with a stale token fail with a
//! conflict, and successful mutations bump the revision. Faults can be
//! injected to drive the reconciler's recovery paths deterministically.

use std::collections::HashMap;
use std::sync::Mutex;

use bytes::Bytes;

use crate::storage::error::StorageError;

use super::client::{AttachmentMeta, DocumentApi, DocumentHead};

#[derive(Debug, Default)]
struct FakeDoc {
    rev: String,
    attachments: HashMap<String, (String, Bytes)>,
}

#[derive(Debug, Default)]
struct State {
    docs: HashMap<String, FakeDoc>,
    rev_counter: u64,
    database_ready: bool,
    connection_down: bool,
    miss_next_fetch: bool,
    stale_next_put: bool,
    conflict_all_puts: bool,
    put_attempts: u64,
}

/// In-memory MVCC fake of [`DocumentApi`].
#[derive(Debug, Default)]
pub(crate) struct FakeCouch {
    state: Mutex<State>,
}

impl FakeCouch {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().expect("fake store lock poisoned")
    }

    /// Simulate an unreachable store for every subsequent call.
    pub(crate) fn set_connection_down(&self, down: bool) {
        self.lock().connection_down = down;
    }

    /// Make the next `fetch` report "not found" regardless of state,
    /// simulating the window where two savers both observe a missing
    /// document.
    pub(crate) fn miss_next_fetch(&self) {
        self.lock().miss_next_fetch = true;
    }

    /// Make the next attachment put fail with a conflict, simulating a
    /// revision that went stale between fetch and attach.
    pub(crate) fn stale_next_attachment_put(&self) {
        self.lock().stale_next_put = true;
    }

    /// Make every attachment put conflict, to exercise retry exhaustion.
    pub(crate) fn always_conflict_attachment_puts(&self) {
        self.lock().conflict_all_puts = true;
    }

    pub(crate) fn attachment_put_attempts(&self) -> u64 {
        self.lock().put_attempts
    }

    pub(crate) fn document_count(&self) -> usize {
        self.lock().docs.len()
    }

    pub(crate) fn attachment_count(&self, id: &str) -> usize {
        self.lock().docs.get(id).map_or(0, |d| d.attachments.len())
    }

    pub(crate) fn database_ready(&self) -> bool {
        self.lock().database_ready
    }

    fn check_connection(state: &State) -> Result<(), StorageError> {
        if state.connection_down {
            Err(StorageError::connection("store unreachable (simulated)"))
        } else {
            Ok(())
        }
    }

    fn next_rev(state: &mut State) -> String {
        state.rev_counter += 1;
        format!("{}-fake", state.rev_counter)
    }
}

impl DocumentApi for FakeCouch {
    async fn ensure_database(&self) -> Result<(), StorageError> {
        let mut state = self.lock();
        Self::check_connection(&state)?;
        state.database_ready = true;
        Ok(())
    }

    async fn fetch(&self, id: &str) -> Result<DocumentHead, StorageError> {
        let mut state = self.lock();
        Self::check_connection(&state)?;

        if state.miss_next_fetch {
            state.miss_next_fetch = false;
            return Err(StorageError::not_found(format!("document '{id}'")));
        }

        state.docs.get(id).map_or_else(
            || Err(StorageError::not_found(format!("document '{id}'"))),
            |doc| {
                Ok(DocumentHead {
                    id: id.to_string(),
                    rev: doc.rev.clone(),
                })
            },
        )
    }

    async fn create(&self, id: &str) -> Result<String, StorageError> {
        let mut state = self.lock();
        Self::check_connection(&state)?;

        if state.docs.contains_key(id) {
            return Err(StorageError::conflict(id));
        }

        let rev = Self::next_rev(&mut state);
        state.docs.insert(
            id.to_string(),
            FakeDoc {
                rev: rev.clone(),
                attachments: HashMap::new(),
            },
        );
        Ok(rev)
    }

    async fn put_attachment(
        &self,
        id: &str,
        name: &str,
        rev: &str,
        content_type: &str,
        body: Bytes,
    ) -> Result<String, StorageError> {
        let mut state = self.lock();
        Self::check_connection(&state)?;
        state.put_attempts += 1;

        if state.conflict_all_puts {
            return Err(StorageError::conflict(id));
        }
        if state.stale_next_put {
            state.stale_next_put = false;
            return Err(StorageError::conflict(id));
        }

        let current_rev = state
            .docs
            .get(id)
            .map(|d| d.rev.clone())
            .ok_or_else(|| StorageError::not_found(format!("document '{id}'")))?;
        if current_rev != rev {
            return Err(StorageError::conflict(id));
        }

        let new_rev = Self::next_rev(&mut state);
        let doc = state.docs.get_mut(id).expect("document checked above");
        doc.rev = new_rev.clone();
        doc.attachments
            .insert(name.to_string(), (content_type.to_string(), body));
        Ok(new_rev)
    }

    async fn attachment_meta(&self, id: &str, name: &str) -> Result<AttachmentMeta, StorageError> {
        let state = self.lock();
        Self::check_connection(&state)?;

        state
            .docs
            .get(id)
            .and_then(|d| d.attachments.get(name))
            .map_or_else(
                || {
                    Err(StorageError::not_found(format!(
                        "attachment '{name}' on document '{id}'"
                    )))
                },
                |(content_type, body)| {
                    Ok(AttachmentMeta {
                        content_type: Some(content_type.clone()),
                        content_length: body.len() as u64,
                    })
                },
            )
    }

    async fn fetch_attachment(&self, id: &str, name: &str) -> Result<(Bytes, String), StorageError> {
        let state = self.lock();
        Self::check_connection(&state)?;

        state
            .docs
            .get(id)
            .and_then(|d| d.attachments.get(name))
            .map_or_else(
                || {
                    Err(StorageError::not_found(format!(
                        "attachment '{name}' on document '{id}'"
                    )))
                },
                |(content_type, body)| Ok((body.clone(), content_type.clone())),
            )
    }
}
