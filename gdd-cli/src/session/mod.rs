//! Editing session for one section of one game.
//!
//! Holds the section being edited together with a snapshot of every other
//! section (used as generation context), tracks unsaved changes and drives
//! saves. All state sits behind one async mutex that is never held across
//! network calls, so edits keep landing while a save or an AI stream is in
//! flight.

mod autosave;
mod backend;

pub use autosave::{AutosaveTimer, run_autosave};
pub use backend::{ChunkStream, SessionBackend};

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use gdd_core::text::{paragraph_to_html, split_paragraphs, strip_html};
use gdd_core::{
    AllSectionsContent, EditorSettings, EnhanceRequest, EnhancementAction, GameContext,
    GenerateRequest, ModelOption, SaveSectionRequest, SaveSectionResponse, SectionContent,
    SectionDefinition, SectionPayload, find_section,
};
use tokio::sync::futures::Notified;
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Loading,
    Idle { has_unsaved_changes: bool },
    Saving,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            SessionState::Loading => "loading",
            SessionState::Idle {
                has_unsaved_changes: true,
            } => "unsaved changes",
            SessionState::Idle {
                has_unsaved_changes: false,
            } => "saved",
            SessionState::Saving => "saving",
        };
        f.write_str(label)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Unknown section '{0}'")]
    UnknownSection(String),

    #[error("Section '{section}' has no subsection '{sub_section}'")]
    UnknownSubSection { section: String, sub_section: String },

    #[error("The section is still loading")]
    Loading,

    #[error("Another save or load is in progress")]
    Busy,

    #[error("Save rejected: {0}")]
    Conflict(String),

    #[error("There is no draft to accept")]
    NoDraft,

    #[error("The section has no text to enhance")]
    EmptySection,

    #[error(transparent)]
    Backend(#[from] ClientError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveReport {
    Saved { version: i64 },
    NothingToSave,
}

/// How an AI stream ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamOutcome {
    Completed(String),
    Cancelled { partial: String },
}

/// What [`EditingSession::begin_save`] captured for the save request.
#[derive(Debug, Clone)]
pub struct PendingSave {
    pub section_slug: &'static str,
    pub content: SectionContent,
    pub revision: u64,
    pub expected_version: Option<i64>,
}

struct SessionInner {
    state: SessionState,
    section: &'static SectionDefinition,
    content: SectionContent,
    all_content: AllSectionsContent,
    version: i64,
    last_edited_by: Option<String>,
    /// Bumped on every edit; a save is clean only if no edit landed after its snapshot
    revision: u64,
    draft: String,
    /// Subsections whose text went out with the last enhance request, in order
    rewrite_targets: Vec<&'static str>,
    models: Vec<ModelOption>,
    autosave: AutosaveTimer,
}

impl SessionInner {
    fn apply_loaded(
        &mut self,
        section: &'static SectionDefinition,
        payload: SectionPayload,
        mut all_content: AllSectionsContent,
    ) {
        if payload.content.is_empty() {
            all_content.remove(section.slug);
        } else {
            all_content.insert(section.slug.to_string(), payload.content.clone());
        }
        self.section = section;
        self.content = payload.content;
        self.all_content = all_content;
        self.version = payload.version;
        self.last_edited_by = payload.last_edited_by;
        self.draft.clear();
        self.rewrite_targets.clear();
        self.state = SessionState::Idle {
            has_unsaved_changes: false,
        };
        self.autosave.cancel();
    }

    fn ensure_editable(&self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Loading => Err(SessionError::Loading),
            _ => Ok(()),
        }
    }

    fn sub_section_id(&self, id: &str) -> Result<&'static str, SessionError> {
        self.section
            .sub_section(id)
            .map(|sub| sub.id)
            .ok_or_else(|| SessionError::UnknownSubSection {
                section: self.section.slug.to_string(),
                sub_section: id.to_string(),
            })
    }

    /// Update the section map and the cross-section snapshot together.
    fn set_field(&mut self, id: &'static str, html: String) {
        let slug = self.section.slug;
        self.all_content
            .entry(slug.to_string())
            .or_default()
            .insert(id.to_string(), html.clone());
        self.content.insert(id.to_string(), html);
    }

    fn mark_edited(&mut self) {
        self.revision += 1;
        if let SessionState::Idle { .. } = self.state {
            self.state = SessionState::Idle {
                has_unsaved_changes: true,
            };
        }
        self.autosave.record_edit(Instant::now());
    }

    /// Plain text of the section, one paragraph per filled subsection,
    /// along with the ids of those subsections.
    fn section_plain_text(&self) -> (Vec<&'static str>, String) {
        let (ids, paragraphs): (Vec<&'static str>, Vec<String>) = self
            .section
            .sub_sections
            .iter()
            .filter_map(|sub| {
                let html = self.content.get(sub.id)?;
                let text = strip_html(html)
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .collect::<Vec<_>>()
                    .join("\n");
                (!text.is_empty()).then_some((sub.id, text))
            })
            .unzip();
        (ids, paragraphs.join("\n\n"))
    }
}

pub struct EditingSession {
    backend: Arc<dyn SessionBackend>,
    game_id: String,
    game: GameContext,
    settings: EditorSettings,
    inner: Mutex<SessionInner>,
    /// Serializes saves and section switches
    save_lock: Mutex<()>,
    edits: Notify,
}

impl EditingSession {
    /// Open `section_slug` of a game, loading its content, the rest of the
    /// document and the model list concurrently.
    pub async fn open(
        backend: Arc<dyn SessionBackend>,
        game_id: impl Into<String>,
        game: GameContext,
        section_slug: &str,
        settings: EditorSettings,
    ) -> Result<Arc<Self>, SessionError> {
        let section = find_section(section_slug)
            .ok_or_else(|| SessionError::UnknownSection(section_slug.to_string()))?;
        let autosave = AutosaveTimer::new(Duration::from_secs(settings.autosave_seconds));

        let session = Arc::new(Self {
            backend,
            game_id: game_id.into(),
            game,
            settings,
            inner: Mutex::new(SessionInner {
                state: SessionState::Loading,
                section,
                content: SectionContent::new(),
                all_content: AllSectionsContent::new(),
                version: 0,
                last_edited_by: None,
                revision: 0,
                draft: String::new(),
                rewrite_targets: Vec::new(),
                models: Vec::new(),
                autosave,
            }),
            save_lock: Mutex::new(()),
            edits: Notify::new(),
        });

        let (payload, all_content, models) = tokio::try_join!(
            session.backend.load_section(&session.game_id, section.slug),
            session.backend.load_all_sections(&session.game_id),
            session.backend.list_models(),
        )?;

        {
            let mut inner = session.inner.lock().await;
            inner.models = models;
            inner.apply_loaded(section, payload, all_content);
            info!(
                game_id = %session.game_id,
                section = section.slug,
                version = inner.version,
                "Opened section"
            );
        }
        Ok(session)
    }

    pub fn game_id(&self) -> &str {
        &self.game_id
    }

    pub fn game(&self) -> &GameContext {
        &self.game
    }

    pub async fn state(&self) -> SessionState {
        self.inner.lock().await.state
    }

    pub async fn has_unsaved_changes(&self) -> bool {
        matches!(
            self.state().await,
            SessionState::Idle {
                has_unsaved_changes: true
            }
        )
    }

    pub async fn section(&self) -> &'static SectionDefinition {
        self.inner.lock().await.section
    }

    pub async fn content(&self) -> SectionContent {
        self.inner.lock().await.content.clone()
    }

    pub async fn all_content(&self) -> AllSectionsContent {
        self.inner.lock().await.all_content.clone()
    }

    pub async fn version(&self) -> i64 {
        self.inner.lock().await.version
    }

    pub async fn last_edited_by(&self) -> Option<String> {
        self.inner.lock().await.last_edited_by.clone()
    }

    pub async fn draft(&self) -> String {
        self.inner.lock().await.draft.clone()
    }

    pub async fn models(&self) -> Vec<ModelOption> {
        self.inner.lock().await.models.clone()
    }

    pub async fn autosave_deadline(&self) -> Option<Instant> {
        self.inner.lock().await.autosave.next_deadline()
    }

    pub async fn autosave_due(&self) -> bool {
        self.inner.lock().await.autosave.due(Instant::now())
    }

    /// Resolves after the next edit (or save that left edits pending).
    pub fn edited(&self) -> Notified<'_> {
        self.edits.notified()
    }

    /// Replace one subsection's HTML.
    pub async fn edit(&self, sub_section_id: &str, html: impl Into<String>) -> Result<(), SessionError> {
        {
            let mut inner = self.inner.lock().await;
            inner.ensure_editable()?;
            let id = inner.sub_section_id(sub_section_id)?;
            inner.set_field(id, html.into());
            inner.mark_edited();
        }
        self.edits.notify_one();
        Ok(())
    }

    /// Split `text` into paragraphs and assign them in order to the
    /// subsections the last enhance request was built from, or to every
    /// subsection in declared order when there was none. Paragraphs beyond
    /// the last target are appended to it; targets without a paragraph keep
    /// their content.
    ///
    /// Returns the number of subsections written.
    pub async fn set_all_content(&self, text: &str) -> Result<usize, SessionError> {
        let paragraphs = split_paragraphs(text);
        if paragraphs.is_empty() {
            return Ok(0);
        }

        let written = {
            let mut inner = self.inner.lock().await;
            inner.ensure_editable()?;
            let targets: Vec<&'static str> = if inner.rewrite_targets.is_empty() {
                inner.section.sub_sections.iter().map(|sub| sub.id).collect()
            } else {
                inner.rewrite_targets.clone()
            };
            let Some(last) = targets.len().checked_sub(1) else {
                return Ok(0);
            };

            let mut assigned: Vec<(&'static str, String)> = Vec::with_capacity(targets.len());
            for (index, paragraph) in paragraphs.iter().enumerate() {
                let html = paragraph_to_html(paragraph);
                match assigned.get_mut(last).filter(|_| index > last) {
                    Some((_, existing)) => existing.push_str(&html),
                    None => assigned.push((targets[index], html)),
                }
            }

            let written = assigned.len();
            for (id, html) in assigned {
                inner.set_field(id, html);
            }
            inner.mark_edited();
            written
        };
        self.edits.notify_one();
        Ok(written)
    }

    /// Snapshot the section for saving and enter `Saving`.
    ///
    /// `None` when there is nothing to save or a save is already in flight.
    /// `check_version` makes the save fail if someone else saved meanwhile.
    pub async fn begin_save(&self, check_version: bool) -> Option<PendingSave> {
        let mut inner = self.inner.lock().await;
        if inner.state
            != (SessionState::Idle {
                has_unsaved_changes: true,
            })
        {
            return None;
        }
        inner.state = SessionState::Saving;
        inner.autosave.begin_save();
        Some(PendingSave {
            section_slug: inner.section.slug,
            content: inner.content.clone(),
            revision: inner.revision,
            expected_version: check_version.then_some(inner.version),
        })
    }

    /// Apply the result of a save started with [`Self::begin_save`].
    ///
    /// Edits made while the save was in flight stay unsaved. A failed save
    /// keeps everything unsaved.
    pub async fn complete_save(
        &self,
        pending: PendingSave,
        result: Result<SaveSectionResponse, ClientError>,
    ) -> Result<SaveReport, SessionError> {
        let now = Instant::now();
        let mut inner = self.inner.lock().await;
        if inner.section.slug != pending.section_slug {
            warn!(
                section = pending.section_slug,
                "Ignoring save result for a section that is no longer open"
            );
            return result
                .map(|response| SaveReport::Saved {
                    version: response.version,
                })
                .map_err(SessionError::from);
        }

        match result {
            Ok(response) => {
                let has_pending = inner.revision != pending.revision;
                inner.version = response.version;
                inner.last_edited_by = Some(self.settings.user_id.clone());
                inner.state = SessionState::Idle {
                    has_unsaved_changes: has_pending,
                };
                inner.autosave.finish_save(now, has_pending);
                drop(inner);
                if has_pending {
                    self.edits.notify_one();
                }
                info!(
                    section = pending.section_slug,
                    version = response.version,
                    has_pending,
                    "Saved section"
                );
                Ok(SaveReport::Saved {
                    version: response.version,
                })
            }
            Err(ClientError::Conflict(message)) => {
                inner.state = SessionState::Idle {
                    has_unsaved_changes: true,
                };
                // Retrying would conflict again; wait for the next edit or an overwrite.
                inner.autosave.finish_save(now, false);
                Err(SessionError::Conflict(message))
            }
            Err(e) => {
                inner.state = SessionState::Idle {
                    has_unsaved_changes: true,
                };
                inner.autosave.finish_save(now, true);
                drop(inner);
                self.edits.notify_one();
                Err(e.into())
            }
        }
    }

    /// Save unsaved edits, failing on a concurrent save by someone else.
    pub async fn save(&self) -> Result<SaveReport, SessionError> {
        let _guard = self.save_lock.lock().await;
        self.save_locked(true).await
    }

    /// Save unsaved edits over whatever is stored.
    pub async fn save_overwrite(&self) -> Result<SaveReport, SessionError> {
        let _guard = self.save_lock.lock().await;
        self.save_locked(false).await
    }

    async fn save_locked(&self, check_version: bool) -> Result<SaveReport, SessionError> {
        let Some(pending) = self.begin_save(check_version).await else {
            return Ok(SaveReport::NothingToSave);
        };
        let request = SaveSectionRequest {
            content: pending.content.clone(),
            editor_user_id: self.settings.user_id.clone(),
            expected_version: pending.expected_version,
        };
        let result = self
            .backend
            .save_section(&self.game_id, pending.section_slug, &request)
            .await;
        self.complete_save(pending, result).await
    }

    /// Stream a generated draft for one subsection into the draft buffer.
    pub async fn generate_draft<F>(
        &self,
        sub_section_id: &str,
        model_id: Option<String>,
        cancel: &CancellationToken,
        on_chunk: F,
    ) -> Result<StreamOutcome, SessionError>
    where
        F: FnMut(&str) + Send,
    {
        let request = {
            let mut inner = self.inner.lock().await;
            inner.ensure_editable()?;
            let id = inner.sub_section_id(sub_section_id)?;
            inner.draft.clear();
            inner.rewrite_targets.clear();
            GenerateRequest {
                section_type: inner.section.slug.to_string(),
                sub_section_type: id.to_string(),
                game_context: self.game.clone(),
                all_content: inner.all_content.clone(),
                model_id,
            }
        };
        debug!(
            section = %request.section_type,
            sub_section = %request.sub_section_type,
            "Requesting generation"
        );

        let stream = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Ok(StreamOutcome::Cancelled { partial: String::new() });
            }
            opened = self.backend.generate(&request) => opened?,
        };
        self.consume_stream(stream, cancel, on_chunk).await
    }

    /// Stream a rewrite of the whole section into the draft buffer.
    ///
    /// Apply the result with [`Self::set_all_content`].
    pub async fn enhance_section_draft<F>(
        &self,
        action: EnhancementAction,
        cancel: &CancellationToken,
        on_chunk: F,
    ) -> Result<StreamOutcome, SessionError>
    where
        F: FnMut(&str) + Send,
    {
        let request = {
            let mut inner = self.inner.lock().await;
            inner.ensure_editable()?;
            let (targets, text) = inner.section_plain_text();
            if text.is_empty() {
                return Err(SessionError::EmptySection);
            }
            inner.draft.clear();
            inner.rewrite_targets = targets;
            EnhanceRequest {
                action,
                text,
                section_type: inner.section.slug.to_string(),
                game_context: self.game.clone(),
            }
        };

        let stream = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Ok(StreamOutcome::Cancelled { partial: String::new() });
            }
            opened = self.backend.enhance(&request) => opened?,
        };
        self.consume_stream(stream, cancel, on_chunk).await
    }

    async fn consume_stream<F>(
        &self,
        mut stream: ChunkStream,
        cancel: &CancellationToken,
        mut on_chunk: F,
    ) -> Result<StreamOutcome, SessionError>
    where
        F: FnMut(&str) + Send,
    {
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                next = stream.next() => Some(next),
            };
            let Some(next) = next else {
                // Dropping the stream closes the connection.
                drop(stream);
                let partial = self.draft().await;
                debug!(chars = partial.len(), "AI stream cancelled");
                return Ok(StreamOutcome::Cancelled { partial });
            };

            match next {
                Some(Ok(chunk)) => {
                    self.inner.lock().await.draft.push_str(&chunk);
                    on_chunk(&chunk);
                }
                Some(Err(e)) => return Err(e.into()),
                None => break,
            }
        }
        Ok(StreamOutcome::Completed(self.draft().await))
    }

    /// Accept the current draft into a subsection as a normal edit.
    pub async fn accept_draft(&self, sub_section_id: &str) -> Result<(), SessionError> {
        let draft = {
            let mut inner = self.inner.lock().await;
            inner.sub_section_id(sub_section_id)?;
            if inner.draft.trim().is_empty() {
                return Err(SessionError::NoDraft);
            }
            std::mem::take(&mut inner.draft)
        };
        self.accept_generated(sub_section_id, &draft).await
    }

    /// Accept generated text into a subsection as a normal edit.
    pub async fn accept_generated(&self, sub_section_id: &str, text: &str) -> Result<(), SessionError> {
        self.edit(sub_section_id, text.trim()).await?;
        if self.settings.auto_save_on_accept {
            self.save().await?;
        }
        Ok(())
    }

    /// Open another section of the same game.
    ///
    /// Unsaved edits are saved first; if that fails the current section stays open.
    pub async fn switch_section(&self, section_slug: &str) -> Result<(), SessionError> {
        let section = find_section(section_slug)
            .ok_or_else(|| SessionError::UnknownSection(section_slug.to_string()))?;
        let _guard = self.save_lock.lock().await;

        loop {
            self.save_locked(true).await?;
            let mut inner = self.inner.lock().await;
            match inner.state {
                SessionState::Idle {
                    has_unsaved_changes: false,
                } => {
                    inner.autosave.cancel();
                    inner.state = SessionState::Loading;
                    break;
                }
                // An edit landed while the flush was in flight.
                SessionState::Idle {
                    has_unsaved_changes: true,
                } => {}
                SessionState::Saving | SessionState::Loading => return Err(SessionError::Busy),
            }
        }

        self.load_into(section, SessionState::Idle {
            has_unsaved_changes: false,
        })
        .await
    }

    /// Drop local edits and load the stored version of the current section.
    pub async fn reload(&self) -> Result<(), SessionError> {
        let _guard = self.save_lock.lock().await;
        let (section, previous) = {
            let mut inner = self.inner.lock().await;
            let previous = inner.state;
            inner.autosave.cancel();
            inner.state = SessionState::Loading;
            (inner.section, previous)
        };
        self.load_into(section, previous).await
    }

    /// Load `section` while in `Loading`, restoring `fallback` on failure.
    async fn load_into(
        &self,
        section: &'static SectionDefinition,
        fallback: SessionState,
    ) -> Result<(), SessionError> {
        let loaded = tokio::try_join!(
            self.backend.load_section(&self.game_id, section.slug),
            self.backend.load_all_sections(&self.game_id),
        );

        let mut inner = self.inner.lock().await;
        match loaded {
            Ok((payload, all_content)) => {
                inner.apply_loaded(section, payload, all_content);
                info!(section = section.slug, version = inner.version, "Loaded section");
                Ok(())
            }
            Err(e) => {
                inner.state = fallback;
                if fallback
                    == (SessionState::Idle {
                        has_unsaved_changes: true,
                    })
                {
                    inner.autosave.record_edit(Instant::now());
                }
                Err(e.into())
            }
        }
    }

    /// Stop autosaving. Returns whether unsaved edits remain.
    pub async fn close(&self) -> bool {
        let mut inner = self.inner.lock().await;
        inner.autosave.cancel();
        matches!(
            inner.state,
            SessionState::Idle {
                has_unsaved_changes: true
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use chrono::Utc;
    use futures::stream;
    use gdd_core::ProviderType;
    use tokio::sync::Semaphore;

    const GAME: &str = "game-1";

    #[derive(Default)]
    struct FakeBackend {
        sections: StdMutex<HashMap<String, (SectionContent, i64)>>,
        saves: StdMutex<Vec<(String, SaveSectionRequest)>>,
        save_attempts: AtomicUsize,
        generate_requests: StdMutex<Vec<GenerateRequest>>,
        enhance_requests: StdMutex<Vec<EnhanceRequest>>,
        chunks: Vec<&'static str>,
        endless: bool,
        fail_saves: AtomicBool,
        fail_loads: AtomicBool,
        save_gate: Option<Arc<Semaphore>>,
    }

    impl FakeBackend {
        fn with_section(self, slug: &str, pairs: &[(&str, &str)], version: i64) -> Self {
            self.put(slug, pairs, version);
            self
        }

        fn put(&self, slug: &str, pairs: &[(&str, &str)], version: i64) {
            self.sections
                .lock()
                .unwrap()
                .insert(slug.to_string(), (content(pairs), version));
        }

        fn stored(&self, slug: &str) -> Option<(SectionContent, i64)> {
            self.sections.lock().unwrap().get(slug).cloned()
        }

        fn save_count(&self) -> usize {
            self.saves.lock().unwrap().len()
        }

        fn chunk_stream(&self) -> ChunkStream {
            let items: Vec<Result<String, ClientError>> =
                self.chunks.iter().map(|c| Ok(c.to_string())).collect();
            let head = stream::iter(items);
            if self.endless {
                Box::pin(head.chain(stream::pending()))
            } else {
                Box::pin(head)
            }
        }
    }

    fn server_error() -> ClientError {
        ClientError::Api {
            status: 500,
            code: Some("PERSISTENCE_ERROR".to_string()),
            message: "database is locked".to_string(),
        }
    }

    #[async_trait::async_trait]
    impl SessionBackend for FakeBackend {
        async fn load_section(&self, _game_id: &str, slug: &str) -> Result<SectionPayload, ClientError> {
            if self.fail_loads.load(Ordering::SeqCst) {
                return Err(server_error());
            }
            let (content, version) = self.stored(slug).unwrap_or_default();
            Ok(SectionPayload {
                content,
                version,
                updated_at: None,
                last_edited_by: None,
            })
        }

        async fn load_all_sections(&self, _game_id: &str) -> Result<AllSectionsContent, ClientError> {
            if self.fail_loads.load(Ordering::SeqCst) {
                return Err(server_error());
            }
            Ok(self
                .sections
                .lock()
                .unwrap()
                .iter()
                .filter(|(_, (content, _))| !content.is_empty())
                .map(|(slug, (content, _))| (slug.clone(), content.clone()))
                .collect())
        }

        async fn list_models(&self) -> Result<Vec<ModelOption>, ClientError> {
            Ok(vec![ModelOption {
                id: "claude-sonnet".to_string(),
                name: "Claude Sonnet".to_string(),
                provider: ProviderType::Anthropic,
                description: "Balanced".to_string(),
                available: true,
            }])
        }

        async fn save_section(
            &self,
            _game_id: &str,
            slug: &str,
            request: &SaveSectionRequest,
        ) -> Result<SaveSectionResponse, ClientError> {
            self.save_attempts.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.save_gate {
                gate.acquire().await.unwrap().forget();
            }
            if self.fail_saves.load(Ordering::SeqCst) {
                return Err(server_error());
            }

            let version = {
                let mut sections = self.sections.lock().unwrap();
                let current = sections.get(slug).map(|(_, v)| *v).unwrap_or(0);
                if let Some(expected) = request.expected_version
                    && expected != current
                {
                    return Err(ClientError::Conflict(format!(
                        "expected version {expected}, found {current}"
                    )));
                }
                sections.insert(slug.to_string(), (request.content.clone(), current + 1));
                current + 1
            };
            self.saves
                .lock()
                .unwrap()
                .push((slug.to_string(), request.clone()));
            Ok(SaveSectionResponse {
                version,
                updated_at: Utc::now(),
            })
        }

        async fn generate(&self, request: &GenerateRequest) -> Result<ChunkStream, ClientError> {
            self.generate_requests.lock().unwrap().push(request.clone());
            Ok(self.chunk_stream())
        }

        async fn enhance(&self, request: &EnhanceRequest) -> Result<ChunkStream, ClientError> {
            self.enhance_requests.lock().unwrap().push(request.clone());
            Ok(self.chunk_stream())
        }
    }

    fn content(pairs: &[(&str, &str)]) -> SectionContent {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn settings() -> EditorSettings {
        EditorSettings {
            autosave_seconds: 30,
            auto_save_on_accept: false,
            user_id: "alice".to_string(),
        }
    }

    fn game() -> GameContext {
        GameContext {
            name: "Star Forge".to_string(),
            concept: "Build and fly salvaged starships.".to_string(),
            ..Default::default()
        }
    }

    async fn open(backend: &Arc<FakeBackend>, slug: &str) -> Arc<EditingSession> {
        EditingSession::open(backend.clone(), GAME, game(), slug, settings())
            .await
            .unwrap()
    }

    const CLEAN: SessionState = SessionState::Idle {
        has_unsaved_changes: false,
    };
    const DIRTY: SessionState = SessionState::Idle {
        has_unsaved_changes: true,
    };

    #[tokio::test]
    async fn test_open_loads_section_context_and_models() {
        let backend = Arc::new(
            FakeBackend::default()
                .with_section("overview", &[("brief-introduction", "<p>Ships</p>")], 3)
                .with_section("story", &[("synopsis", "<p>Lost fleet</p>")], 1),
        );
        let session = open(&backend, "overview").await;

        assert_eq!(session.state().await, CLEAN);
        assert_eq!(session.version().await, 3);
        assert_eq!(session.content().await["brief-introduction"], "<p>Ships</p>");
        let all = session.all_content().await;
        assert_eq!(all.len(), 2);
        assert_eq!(all["story"]["synopsis"], "<p>Lost fleet</p>");
        assert_eq!(session.models().await.len(), 1);
    }

    #[tokio::test]
    async fn test_open_unknown_section() {
        let backend: Arc<dyn SessionBackend> = Arc::new(FakeBackend::default());
        let err = EditingSession::open(backend, GAME, game(), "credits", settings())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, SessionError::UnknownSection(slug) if slug == "credits"));
    }

    #[tokio::test]
    async fn test_edit_marks_unsaved_and_updates_context() {
        let backend = Arc::new(FakeBackend::default());
        let session = open(&backend, "overview").await;

        session
            .edit("target-audience", "<p>Tinkerers</p>")
            .await
            .unwrap();
        assert_eq!(session.state().await, DIRTY);
        assert_eq!(
            session.all_content().await["overview"]["target-audience"],
            "<p>Tinkerers</p>"
        );
        assert!(session.autosave_deadline().await.is_some());

        let err = session.edit("synopsis", "x").await.unwrap_err();
        assert!(matches!(err, SessionError::UnknownSubSection { .. }));
    }

    #[tokio::test]
    async fn test_save_clears_unsaved_and_bumps_version() {
        let backend = Arc::new(FakeBackend::default());
        let session = open(&backend, "overview").await;
        assert_eq!(session.save().await.unwrap(), SaveReport::NothingToSave);

        session.edit("brief-introduction", "<p>One</p>").await.unwrap();
        assert_eq!(
            session.save().await.unwrap(),
            SaveReport::Saved { version: 1 }
        );
        assert_eq!(session.state().await, CLEAN);
        assert_eq!(session.version().await, 1);
        assert_eq!(session.last_edited_by().await.as_deref(), Some("alice"));
        assert!(session.autosave_deadline().await.is_none());

        let saves = backend.saves.lock().unwrap().clone();
        assert_eq!(saves[0].0, "overview");
        assert_eq!(saves[0].1.editor_user_id, "alice");
        assert_eq!(saves[0].1.expected_version, Some(0));
    }

    #[tokio::test]
    async fn test_edit_during_save_stays_unsaved() {
        let gate = Arc::new(Semaphore::new(0));
        let backend = Arc::new(FakeBackend {
            save_gate: Some(gate.clone()),
            ..Default::default()
        });
        let session = open(&backend, "overview").await;
        session.edit("brief-introduction", "<p>one</p>").await.unwrap();

        let saving = tokio::spawn({
            let session = session.clone();
            async move { session.save().await }
        });
        while session.state().await != SessionState::Saving {
            tokio::task::yield_now().await;
        }
        session.edit("brief-introduction", "<p>two</p>").await.unwrap();
        gate.add_permits(1);

        let report = saving.await.unwrap().unwrap();
        assert_eq!(report, SaveReport::Saved { version: 1 });
        assert_eq!(session.state().await, DIRTY);
        assert_eq!(
            backend.stored("overview").unwrap().0["brief-introduction"],
            "<p>one</p>"
        );
        assert_eq!(session.content().await["brief-introduction"], "<p>two</p>");
        assert!(session.autosave_deadline().await.is_some());
    }

    #[tokio::test]
    async fn test_failed_save_keeps_edits() {
        let backend = Arc::new(FakeBackend::default());
        let session = open(&backend, "overview").await;
        session.edit("brief-introduction", "<p>keep</p>").await.unwrap();

        backend.fail_saves.store(true, Ordering::SeqCst);
        let err = session.save().await.unwrap_err();
        assert!(matches!(err, SessionError::Backend(ClientError::Api { status: 500, .. })));
        assert_eq!(session.state().await, DIRTY);
        assert_eq!(session.content().await["brief-introduction"], "<p>keep</p>");
        assert!(session.autosave_deadline().await.is_some());

        backend.fail_saves.store(false, Ordering::SeqCst);
        assert_eq!(
            session.save().await.unwrap(),
            SaveReport::Saved { version: 1 }
        );
    }

    #[tokio::test]
    async fn test_conflict_is_not_retried_until_overwrite() {
        let backend = Arc::new(
            FakeBackend::default().with_section("overview", &[("brief-introduction", "<p>v1</p>")], 1),
        );
        let session = open(&backend, "overview").await;
        backend.put("overview", &[("brief-introduction", "<p>theirs</p>")], 2);

        session.edit("brief-introduction", "<p>mine</p>").await.unwrap();
        let err = session.save().await.unwrap_err();
        assert!(matches!(err, SessionError::Conflict(_)));
        assert_eq!(session.state().await, DIRTY);
        assert!(session.autosave_deadline().await.is_none());

        assert_eq!(
            session.save_overwrite().await.unwrap(),
            SaveReport::Saved { version: 3 }
        );
        assert_eq!(
            backend.stored("overview").unwrap().0["brief-introduction"],
            "<p>mine</p>"
        );
    }

    #[tokio::test]
    async fn test_set_all_content_assigns_paragraphs_in_order() {
        let backend = Arc::new(
            FakeBackend::default()
                .with_section("overview", &[("genre-and-inspirations", "<p>Sim</p>")], 1),
        );
        let session = open(&backend, "overview").await;

        let written = session
            .set_all_content("A <b>bold</b> pitch.\n\nFor tinkerers\nand pilots.\n\n")
            .await
            .unwrap();
        assert_eq!(written, 2);

        let content = session.content().await;
        assert_eq!(content["brief-introduction"], "<p>A &lt;b&gt;bold&lt;/b&gt; pitch.</p>");
        assert_eq!(content["target-audience"], "<p>For tinkerers<br>and pilots.</p>");
        assert!(!content.contains_key("unique-selling-points"));
        assert_eq!(content["genre-and-inspirations"], "<p>Sim</p>");
        assert_eq!(session.state().await, DIRTY);
    }

    #[tokio::test]
    async fn test_set_all_content_merges_overflow_into_last_subsection() {
        let backend = Arc::new(FakeBackend::default());
        let session = open(&backend, "overview").await;

        let written = session
            .set_all_content("one\n\ntwo\n\nthree\n\nfour\n\nfive")
            .await
            .unwrap();
        assert_eq!(written, 4);
        assert_eq!(
            session.content().await["genre-and-inspirations"],
            "<p>four</p><p>five</p>"
        );

        assert_eq!(session.set_all_content("  \n\n ").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_switch_section_saves_first() {
        let backend = Arc::new(
            FakeBackend::default().with_section("story", &[("synopsis", "<p>Lost fleet</p>")], 4),
        );
        let session = open(&backend, "overview").await;
        session.edit("brief-introduction", "<p>Ships</p>").await.unwrap();

        session.switch_section("story").await.unwrap();
        assert_eq!(backend.save_count(), 1);
        assert_eq!(session.section().await.slug, "story");
        assert_eq!(session.version().await, 4);
        assert_eq!(session.state().await, CLEAN);
        assert_eq!(
            session.all_content().await["overview"]["brief-introduction"],
            "<p>Ships</p>"
        );
    }

    #[tokio::test]
    async fn test_switch_section_stays_when_save_fails() {
        let backend = Arc::new(FakeBackend::default());
        let session = open(&backend, "overview").await;
        session.edit("brief-introduction", "<p>Ships</p>").await.unwrap();
        backend.fail_saves.store(true, Ordering::SeqCst);

        assert!(session.switch_section("story").await.is_err());
        assert_eq!(session.section().await.slug, "overview");
        assert_eq!(session.state().await, DIRTY);
        assert_eq!(session.content().await["brief-introduction"], "<p>Ships</p>");
    }

    #[tokio::test]
    async fn test_switch_section_stays_when_load_fails() {
        let backend = Arc::new(FakeBackend::default());
        let session = open(&backend, "overview").await;
        backend.fail_loads.store(true, Ordering::SeqCst);

        assert!(session.switch_section("story").await.is_err());
        assert_eq!(session.section().await.slug, "overview");
        assert_eq!(session.state().await, CLEAN);

        let err = session.switch_section("credits").await.unwrap_err();
        assert!(matches!(err, SessionError::UnknownSection(_)));
    }

    #[tokio::test]
    async fn test_reload_discards_local_edits_after_conflict() {
        let backend = Arc::new(FakeBackend::default());
        let session = open(&backend, "overview").await;
        backend.put("overview", &[("brief-introduction", "<p>theirs</p>")], 2);

        session.edit("brief-introduction", "<p>mine</p>").await.unwrap();
        assert!(matches!(
            session.save().await.unwrap_err(),
            SessionError::Conflict(_)
        ));

        session.reload().await.unwrap();
        assert_eq!(session.state().await, CLEAN);
        assert_eq!(session.version().await, 2);
        assert_eq!(session.content().await["brief-introduction"], "<p>theirs</p>");
        assert_eq!(session.save().await.unwrap(), SaveReport::NothingToSave);
    }

    #[tokio::test]
    async fn test_generate_then_accept_draft() {
        let backend = Arc::new(
            FakeBackend {
                chunks: vec!["Salvage", " crews"],
                ..Default::default()
            }
            .with_section("story", &[("synopsis", "<p>Lost fleet</p>")], 1),
        );
        let session = open(&backend, "overview").await;
        let cancel = CancellationToken::new();

        let mut seen = Vec::new();
        let outcome = session
            .generate_draft("target-audience", Some("claude-sonnet".to_string()), &cancel, |chunk| {
                seen.push(chunk.to_string())
            })
            .await
            .unwrap();
        assert_eq!(outcome, StreamOutcome::Completed("Salvage crews".to_string()));
        assert_eq!(seen, vec!["Salvage", " crews"]);

        let request = backend.generate_requests.lock().unwrap()[0].clone();
        assert_eq!(request.section_type, "overview");
        assert_eq!(request.sub_section_type, "target-audience");
        assert_eq!(request.model_id.as_deref(), Some("claude-sonnet"));
        assert!(request.all_content.contains_key("story"));

        session.accept_draft("target-audience").await.unwrap();
        assert_eq!(session.content().await["target-audience"], "Salvage crews");
        assert_eq!(session.state().await, DIRTY);
        assert!(session.draft().await.is_empty());

        let err = session.accept_draft("target-audience").await.unwrap_err();
        assert!(matches!(err, SessionError::NoDraft));
    }

    #[tokio::test]
    async fn test_accept_saves_immediately_when_configured() {
        let backend = Arc::new(FakeBackend::default());
        let settings = EditorSettings {
            auto_save_on_accept: true,
            ..settings()
        };
        let session = EditingSession::open(backend.clone(), GAME, game(), "overview", settings)
            .await
            .unwrap();

        session
            .accept_generated("brief-introduction", "  <p>Generated</p>\n")
            .await
            .unwrap();
        assert_eq!(backend.save_count(), 1);
        assert_eq!(session.state().await, CLEAN);
        assert_eq!(
            backend.stored("overview").unwrap().0["brief-introduction"],
            "<p>Generated</p>"
        );
    }

    #[tokio::test]
    async fn test_cancel_keeps_partial_draft() {
        let backend = Arc::new(FakeBackend {
            chunks: vec!["Half a sent"],
            endless: true,
            ..Default::default()
        });
        let session = open(&backend, "overview").await;
        let cancel = CancellationToken::new();

        let token = cancel.clone();
        let outcome = session
            .generate_draft("brief-introduction", None, &cancel, move |_| token.cancel())
            .await
            .unwrap();
        assert_eq!(
            outcome,
            StreamOutcome::Cancelled {
                partial: "Half a sent".to_string()
            }
        );
        assert_eq!(session.state().await, CLEAN);
    }

    #[tokio::test]
    async fn test_enhance_sends_section_as_paragraphs() {
        let backend = Arc::new(FakeBackend {
            chunks: vec!["Sharper pitch.\n\nSharper audience."],
            ..Default::default()
        });
        let session = open(&backend, "overview").await;
        let cancel = CancellationToken::new();

        let err = session
            .enhance_section_draft(EnhancementAction::Improve, &cancel, |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::EmptySection));

        session
            .edit("brief-introduction", "<p>Pitch line one</p><p>line two</p>")
            .await
            .unwrap();
        session
            .edit("target-audience", "<p>Tinkerers &amp; pilots</p>")
            .await
            .unwrap();
        let outcome = session
            .enhance_section_draft(EnhancementAction::Improve, &cancel, |_| {})
            .await
            .unwrap();

        let request = backend.enhance_requests.lock().unwrap()[0].clone();
        assert_eq!(request.text, "Pitch line one\nline two\n\nTinkerers & pilots");
        assert_eq!(request.section_type, "overview");

        let StreamOutcome::Completed(text) = outcome else {
            panic!("stream was not cancelled");
        };
        session.set_all_content(&text).await.unwrap();
        assert_eq!(session.content().await["target-audience"], "<p>Sharper audience.</p>");
    }

    #[tokio::test]
    async fn test_enhanced_text_maps_back_across_empty_subsections() {
        let backend = Arc::new(
            FakeBackend {
                chunks: vec!["Intro rewritten.\n\nUSP rewritten."],
                ..Default::default()
            }
            .with_section(
                "overview",
                &[
                    ("brief-introduction", "<p>Intro</p>"),
                    ("unique-selling-points", "<p>USP</p>"),
                ],
                1,
            ),
        );
        let session = open(&backend, "overview").await;
        let cancel = CancellationToken::new();

        let outcome = session
            .enhance_section_draft(EnhancementAction::Improve, &cancel, |_| {})
            .await
            .unwrap();
        assert_eq!(
            backend.enhance_requests.lock().unwrap()[0].text,
            "Intro\n\nUSP"
        );
        let StreamOutcome::Completed(text) = outcome else {
            panic!("stream was not cancelled");
        };

        assert_eq!(session.set_all_content(&text).await.unwrap(), 2);
        let content = session.content().await;
        assert_eq!(content["brief-introduction"], "<p>Intro rewritten.</p>");
        assert_eq!(content["unique-selling-points"], "<p>USP rewritten.</p>");
        assert!(!content.contains_key("target-audience"));

        // Extra paragraphs stay with the last rewritten subsection
        session
            .set_all_content("Intro.\n\nUSP.\n\nMore USP.")
            .await
            .unwrap();
        let content = session.content().await;
        assert_eq!(content["unique-selling-points"], "<p>USP.</p><p>More USP.</p>");
        assert!(!content.contains_key("target-audience"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_autosave_waits_for_quiet_window() {
        let backend = Arc::new(FakeBackend::default());
        let session = open(&backend, "overview").await;
        let cancel = CancellationToken::new();
        let driver = tokio::spawn(run_autosave(session.clone(), cancel.clone()));

        session.edit("brief-introduction", "<p>one</p>").await.unwrap();
        tokio::time::sleep(Duration::from_secs(20)).await;
        session.edit("brief-introduction", "<p>two</p>").await.unwrap();

        tokio::time::sleep(Duration::from_secs(29)).await;
        assert_eq!(backend.save_count(), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(backend.save_count(), 1);
        assert_eq!(session.state().await, CLEAN);
        assert_eq!(
            backend.stored("overview").unwrap().0["brief-introduction"],
            "<p>two</p>"
        );

        cancel.cancel();
        driver.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_autosave_stops_after_conflict() {
        let backend = Arc::new(FakeBackend::default());
        let session = open(&backend, "overview").await;
        backend.put("overview", &[("brief-introduction", "<p>theirs</p>")], 5);
        let cancel = CancellationToken::new();
        let driver = tokio::spawn(run_autosave(session.clone(), cancel.clone()));

        session.edit("brief-introduction", "<p>mine</p>").await.unwrap();
        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(backend.save_attempts.load(Ordering::SeqCst), 1);
        assert_eq!(session.state().await, DIRTY);

        assert!(session.close().await);
        cancel.cancel();
        driver.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_autosave_retries_after_failure() {
        let backend = Arc::new(FakeBackend::default());
        backend.fail_saves.store(true, Ordering::SeqCst);
        let session = open(&backend, "overview").await;
        let cancel = CancellationToken::new();
        let driver = tokio::spawn(run_autosave(session.clone(), cancel.clone()));

        session.edit("brief-introduction", "<p>retry</p>").await.unwrap();
        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(backend.save_attempts.load(Ordering::SeqCst), 1);

        backend.fail_saves.store(false, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(backend.save_count(), 1);
        assert!(!session.close().await);

        cancel.cancel();
        driver.await.unwrap();
    }
}
