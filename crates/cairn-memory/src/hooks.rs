// SPDX-FileCopyrightText: 2026 Cairn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Host turn hooks.
//!
//! The host calls [`ConversationHooks::on_user_input`] once per user
//! message and [`ConversationHooks::on_assistant_output`] once per reply.
//! The input hook blocks on recall; everything else (persistence,
//! extraction, auto-promotion) is handed to background tasks.

use std::collections::HashMap;
use std::sync::Arc;

use cairn_core::{Channel, Role};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::archivist::{Archivist, TurnBuffer, WindowOutcome};
use crate::fingerprint::record_id;
use crate::promote::{PromoteOptions, Promoter};
use crate::recall::{RecallOrchestrator, RecallQuery};
use crate::writer::{PersistJob, PersistenceQueue};
use crate::types::Turn;

/// Switches the hooks read from configuration.
#[derive(Debug, Clone)]
pub struct HookSettings {
    pub record_user_turns: bool,
    pub record_assistant_turns: bool,
    pub archivist_enabled: bool,
    pub window_turns: usize,
    pub min_new_turns: usize,
    pub auto_promote: bool,
    pub promote_min_confidence: f32,
    pub log_episodic_store: bool,
}

#[derive(Debug)]
struct Session {
    last_user: Option<String>,
    buffer: TurnBuffer,
}

/// Per-process hook state shared by every conversation.
pub struct ConversationHooks {
    recall: Arc<RecallOrchestrator>,
    recall_template: RecallQuery,
    queue: PersistenceQueue,
    archivist: Arc<Archivist>,
    promoter: Arc<Promoter>,
    settings: HookSettings,
    sessions: Mutex<HashMap<String, Session>>,
    background: Mutex<JoinSet<()>>,
}

impl ConversationHooks {
    pub fn new(
        recall: Arc<RecallOrchestrator>,
        recall_template: RecallQuery,
        queue: PersistenceQueue,
        archivist: Arc<Archivist>,
        promoter: Arc<Promoter>,
        settings: HookSettings,
    ) -> Self {
        Self {
            recall,
            recall_template,
            queue,
            archivist,
            promoter,
            settings,
            sessions: Mutex::new(HashMap::new()),
            background: Mutex::new(JoinSet::new()),
        }
    }

    /// Recall for `text` and return it with the injection block prepended.
    ///
    /// Returns `text` unchanged when nothing is recalled.
    pub async fn on_user_input(&self, session: &str, text: &str) -> String {
        self.with_session(session, |s| {
            s.last_user = Some(text.to_string());
            s.buffer.push(Turn::new(Role::User, text));
        })
        .await;

        let mut query = RecallQuery {
            text: text.to_string(),
            ..self.recall_template.clone()
        };
        query.exclude_ids.insert(record_id(Channel::Episodic, text));
        let result = self.recall.recall(&query).await;
        if self.settings.record_user_turns {
            self.enqueue(text, Role::User, None);
        }
        if let Some(snapshot) = &result.debug_snapshot {
            info!(session, "{snapshot}");
        }
        if result.injection_block.is_empty() {
            text.to_string()
        } else {
            format!("{}\n\n{text}", result.injection_block)
        }
    }

    /// Persist `reply` in the background and return it unchanged.
    pub async fn on_assistant_output(&self, session: &str, reply: &str) -> String {
        let (counterpart, window) = self
            .with_session(session, |s| {
                s.buffer.push(Turn::new(Role::Assistant, reply));
                let window = (self.settings.archivist_enabled
                    && s.buffer.new_turns() >= self.settings.min_new_turns)
                    .then(|| s.buffer.take_window());
                (s.last_user.clone(), window)
            })
            .await;

        if self.settings.record_assistant_turns {
            self.enqueue(reply, Role::Assistant, counterpart);
        }
        if let Some(window) = window {
            self.spawn_extraction(session, window).await;
        }
        reply.to_string()
    }

    /// Forget a finished conversation's turn buffer.
    ///
    /// Turns not yet extracted are dropped. Returns false for an unknown session.
    pub async fn end_session(&self, session: &str) -> bool {
        let removed = self.sessions.lock().await.remove(session).is_some();
        if removed {
            debug!(session, "session ended");
        }
        removed
    }

    /// Number of conversations with buffered state.
    pub async fn active_sessions(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Drain the persistence queue and wait for background extractions.
    pub async fn shutdown(self) -> usize {
        let mut background = self.background.into_inner();
        while background.join_next().await.is_some() {}
        self.queue.shutdown().await
    }

    fn enqueue(&self, text: &str, role: Role, counterpart: Option<String>) {
        if self.settings.log_episodic_store {
            info!(role = %role, "queueing episodic write");
        }
        self.queue.enqueue(PersistJob {
            text: text.to_string(),
            role,
            channel: Channel::Episodic,
            counterpart,
        });
    }

    async fn with_session<R>(&self, session: &str, f: impl FnOnce(&mut Session) -> R) -> R {
        let mut sessions = self.sessions.lock().await;
        let entry = sessions
            .entry(session.to_string())
            .or_insert_with(|| Session {
                last_user: None,
                buffer: TurnBuffer::new(self.settings.window_turns),
            });
        f(entry)
    }

    async fn spawn_extraction(&self, session: &str, window: Vec<Turn>) {
        let archivist = self.archivist.clone();
        let promoter = self.promoter.clone();
        let auto_promote = self.settings.auto_promote;
        let min_confidence = self.settings.promote_min_confidence;
        let session = session.to_string();

        let mut background = self.background.lock().await;
        while background.try_join_next().is_some() {}
        background.spawn(async move {
            let report = archivist.extract(&window).await;
            debug!(session = %session, outcome = ?report.outcome, staged = report.staged.len(), "extraction finished");
            if !auto_promote || report.outcome != WindowOutcome::Relevant {
                return;
            }
            let options = PromoteOptions {
                min_confidence,
                ..PromoteOptions::default()
            };
            if let Err(e) = promoter.promote_ids(&report.staged, &options).await {
                warn!(session = %session, error = %e, "auto-promotion failed");
            }
        });
    }
}
