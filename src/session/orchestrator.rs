use anyhow::Result;
use futures::StreamExt;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::state::{SessionPhase, SessionSnapshot, SessionState};
use crate::app::ChatConfig;
use crate::constants::MODEL_LOAD_FAILED;
use crate::engine::Engine;
use crate::models::{
    find_model, list_models, ChatMessage, CloudConnector, LocalEngineLoader, MessageRole,
    ModelDescriptor, ProgressCallback,
};
use crate::utils::DeepSearchError;

/// What became of a call to [`ChatSession::handle_submit`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Guard rejected the call; the transcript is unchanged
    Skipped,
    /// The assistant reply streamed to completion
    Completed,
    /// An error entry was appended to the transcript
    Failed(String),
}

/// State shared with progress callbacks
struct Shared {
    state: Mutex<SessionState>,
    updates: watch::Sender<SessionSnapshot>,
}

impl Shared {
    /// Mutate state and republish in one step
    fn update<R>(&self, f: impl FnOnce(&mut SessionState) -> R) -> R {
        let mut state = self.state.lock();
        let result = f(&mut state);
        self.updates.send_replace(state.snapshot());
        result
    }
}

/// One conversation against one active model at a time.
///
/// Owns the transcript, the input buffer and the local engine handle. Every
/// change is republished as a [`SessionSnapshot`] on a watch channel, so a
/// view can render while a submission is streaming.
pub struct ChatSession {
    shared: Arc<Shared>,
    cloud: Arc<dyn CloudConnector>,
    loader: Arc<dyn LocalEngineLoader>,
}

impl ChatSession {
    pub fn new(
        config: &ChatConfig,
        cloud: Arc<dyn CloudConnector>,
        loader: Arc<dyn LocalEngineLoader>,
    ) -> Result<Self, DeepSearchError> {
        let model = find_model(&config.default_model)
            .ok_or_else(|| DeepSearchError::UnknownModel(config.default_model.clone()))?;

        let mut messages = Vec::new();
        if !config.system_prompt.is_empty() {
            messages.push(ChatMessage::system(config.system_prompt.clone()));
        }

        let state = SessionState::new(messages, model);
        let (updates, _) = watch::channel(state.snapshot());

        Ok(Self {
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                updates,
            }),
            cloud,
            loader,
        })
    }

    /// Receive a snapshot after every state change
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.shared.updates.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.shared.state.lock().snapshot()
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.shared.state.lock().messages.clone()
    }

    pub fn selected_model(&self) -> &'static ModelDescriptor {
        self.shared.state.lock().selected_model
    }

    pub fn available_models(&self) -> &'static [ModelDescriptor] {
        list_models()
    }

    /// Replace the input buffer
    pub fn set_input(&self, input: impl Into<String>) {
        let input = input.into();
        self.shared.update(|s| s.input = input);
    }

    /// Prepare the active model.
    ///
    /// Cloud models are ready immediately. Local models are loaded through
    /// the loader with progress republished into the snapshot; on failure
    /// the session returns to `Idle` and the user has to retry.
    pub async fn initialize_engine(&self) {
        let start = self.shared.update(|s| {
            if !s.selected_model.is_local() {
                s.is_engine_loading = false;
                if !s.is_submitting {
                    s.phase = SessionPhase::Ready;
                }
                return None;
            }
            if s.engine.is_some() || s.is_engine_loading {
                return None;
            }
            s.is_engine_loading = true;
            s.phase = SessionPhase::EngineLoading;
            Some((s.selected_model, s.load_generation))
        });
        let Some((model, generation)) = start else {
            return;
        };

        let shared = Arc::clone(&self.shared);
        let progress: ProgressCallback = Arc::new(move |text: &str| {
            let text = text.to_string();
            shared.update(|s| {
                if s.load_generation == generation {
                    s.load_progress = text;
                }
            });
        });

        match self.loader.load(model.id, progress).await {
            Ok(engine) => {
                let stale = self.shared.update(|s| {
                    if s.load_generation != generation {
                        return Some(engine);
                    }
                    s.engine = Some(engine);
                    s.is_engine_loading = false;
                    s.phase = SessionPhase::Ready;
                    None
                });
                match stale {
                    Some(engine) => {
                        debug!("Discarding {} loaded after a model switch", model.id);
                        if let Err(e) = engine.unload().await {
                            warn!("Failed to unload stale engine {}: {}", model.id, e);
                        }
                    }
                    None => info!("Local model {} ready", model.id),
                }
            }
            Err(e) => {
                error!("Failed to load model {}: {:#}", model.id, e);
                self.shared.update(|s| {
                    if s.load_generation == generation {
                        s.is_engine_loading = false;
                        s.load_progress = format!("{}: {}", MODEL_LOAD_FAILED, e);
                        s.phase = SessionPhase::Idle;
                    }
                });
            }
        }
    }

    /// Switch the active model, unloading any local engine first.
    ///
    /// Refused while a submission or another switch is in flight, and for
    /// ids not in the registry; state is unchanged in both cases.
    pub async fn select_model(&self, model_id: &str) -> Result<(), DeepSearchError> {
        let model =
            find_model(model_id).ok_or_else(|| DeepSearchError::UnknownModel(model_id.to_string()))?;

        let engine = self.shared.update(|s| {
            if s.is_submitting || s.is_switching_model {
                return Err(DeepSearchError::Busy);
            }
            s.is_switching_model = true;
            // Any load still running belongs to the old model
            s.load_generation += 1;
            s.is_engine_loading = false;
            Ok(s.engine.clone())
        })?;

        if let Some(engine) = engine {
            if let Err(e) = engine.unload().await {
                warn!("Failed to unload {}: {:#}", engine.name(), e);
            }
        }

        self.shared.update(|s| {
            s.engine = None;
            s.selected_model = model;
            s.phase = SessionPhase::Idle;
            s.is_switching_model = false;
        });
        info!("Active model: {}", model.id);
        Ok(())
    }

    /// Send the input buffer to the active model.
    ///
    /// No-op when the trimmed input is empty, a submission is already
    /// running, a model switch is pending, or a local model has no engine.
    /// Otherwise appends the user turn and an assistant placeholder that is
    /// rewritten with the running total after every fragment. Cloud models
    /// get the placeholder before the request, local models once their
    /// stream has opened. A failure appends an `Error: ...` entry and leaves
    /// the placeholder as it was.
    pub async fn handle_submit(&self) -> SubmitOutcome {
        let prepared = self.shared.update(|s| {
            if s.input.trim().is_empty() || s.is_submitting || s.is_switching_model {
                return None;
            }

            let engine = if s.selected_model.is_local() {
                // No auto-initialization here: the caller loads explicitly
                Engine::Local(s.engine.clone()?)
            } else {
                Engine::Cloud(self.cloud.connect(s.selected_model.id))
            };

            s.messages.push(ChatMessage::user(std::mem::take(&mut s.input)));
            let history = s.messages.clone();
            // Cloud replies get their placeholder before the request goes out
            if !engine.is_local() {
                s.messages.push(ChatMessage::assistant(""));
            }
            s.is_submitting = true;
            s.phase = SessionPhase::Submitting;
            Some((engine, history))
        });
        let Some((engine, history)) = prepared else {
            debug!("Submission skipped");
            return SubmitOutcome::Skipped;
        };

        let _guard = SubmitGuard {
            shared: &self.shared,
        };

        match self.stream_reply(&engine, &history).await {
            Ok(()) => SubmitOutcome::Completed,
            Err(e) => {
                error!("Chat error ({}): {:#}", engine.name(), e);
                let message = format!("Error: {}.", e);
                // Whatever the placeholder holds stays; the error is a new entry
                self.shared
                    .update(|s| s.messages.push(ChatMessage::assistant(message.clone())));
                SubmitOutcome::Failed(message)
            }
        }
    }

    async fn stream_reply(&self, engine: &Engine, history: &[ChatMessage]) -> Result<()> {
        let mut fragments = engine.stream_completion(history).await?;
        if engine.is_local() {
            self.shared
                .update(|s| s.messages.push(ChatMessage::assistant("")));
        }

        let mut reply = String::new();
        while let Some(fragment) = fragments.next().await {
            reply.push_str(&fragment?);
            let total = reply.clone();
            self.shared.update(|s| {
                if let Some(last) = s.messages.last_mut() {
                    if last.role == MessageRole::Assistant {
                        last.content = total;
                    }
                }
            });
        }
        Ok(())
    }
}

/// Clears the in-flight flag however the submission ends, including when the
/// submitting future is dropped.
struct SubmitGuard<'a> {
    shared: &'a Shared,
}

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) {
        self.shared.update(|s| {
            s.is_submitting = false;
            s.phase = SessionPhase::Ready;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChatEngine, FragmentStream, LocalEngine};
    use async_trait::async_trait;
    use futures::stream;
    use pretty_assertions::assert_eq;
    use tokio::sync::Notify;

    type CallLog = Arc<Mutex<Vec<String>>>;

    /// Scripted reply: fragments, then optionally an error
    #[derive(Clone, Default)]
    struct Script {
        fragments: Vec<&'static str>,
        fail_setup: Option<&'static str>,
        fail_after: Option<&'static str>,
        /// Never finish after the fragments
        hang: bool,
        /// Wait for a notification after the fragments
        release: Option<Arc<Notify>>,
    }

    fn scripted_stream(script: &Script) -> Result<FragmentStream> {
        if let Some(msg) = script.fail_setup {
            anyhow::bail!(msg);
        }
        let mut items: Vec<Result<String>> =
            script.fragments.iter().map(|f| Ok(f.to_string())).collect();
        if let Some(msg) = script.fail_after {
            items.push(Err(anyhow::anyhow!(msg)));
        }
        if script.hang {
            return Ok(Box::pin(stream::iter(items).chain(stream::pending())));
        }
        if let Some(release) = script.release.clone() {
            let wait = stream::once(async move { release.notified().await })
                .filter_map(|()| async { None::<Result<String>> });
            return Ok(Box::pin(stream::iter(items).chain(wait)));
        }
        Ok(Box::pin(stream::iter(items)))
    }

    struct FakeCloud {
        script: Script,
        calls: Arc<Mutex<Vec<(String, Vec<ChatMessage>)>>>,
    }

    struct FakeCloudEngine {
        model: String,
        script: Script,
        calls: Arc<Mutex<Vec<(String, Vec<ChatMessage>)>>>,
    }

    impl CloudConnector for FakeCloud {
        fn connect(&self, model_id: &str) -> Arc<dyn ChatEngine> {
            Arc::new(FakeCloudEngine {
                model: model_id.to_string(),
                script: self.script.clone(),
                calls: self.calls.clone(),
            })
        }
    }

    #[async_trait]
    impl ChatEngine for FakeCloudEngine {
        async fn stream_completion(&self, history: &[ChatMessage]) -> Result<FragmentStream> {
            self.calls.lock().push((self.model.clone(), history.to_vec()));
            scripted_stream(&self.script)
        }

        fn name(&self) -> &str {
            &self.model
        }
    }

    struct FakeLocal {
        model: String,
        script: Script,
        log: CallLog,
        /// Lets unload observe the session at the moment it is called
        observer: Arc<Mutex<Option<watch::Receiver<SessionSnapshot>>>>,
    }

    #[async_trait]
    impl ChatEngine for FakeLocal {
        async fn stream_completion(&self, _history: &[ChatMessage]) -> Result<FragmentStream> {
            self.log.lock().push(format!("complete {}", self.model));
            scripted_stream(&self.script)
        }

        fn name(&self) -> &str {
            &self.model
        }
    }

    #[async_trait]
    impl LocalEngine for FakeLocal {
        async fn unload(&self) -> Result<()> {
            let has_engine = self
                .observer
                .lock()
                .as_ref()
                .map(|rx| rx.borrow().has_engine);
            self.log
                .lock()
                .push(format!("unload {} has_engine={:?}", self.model, has_engine));
            Ok(())
        }
    }

    struct FakeLoader {
        script: Script,
        fail: bool,
        log: CallLog,
        observer: Arc<Mutex<Option<watch::Receiver<SessionSnapshot>>>>,
        /// When set, load waits until notified
        gate: Option<Arc<Notify>>,
    }

    #[async_trait]
    impl LocalEngineLoader for FakeLoader {
        async fn load(
            &self,
            model_id: &str,
            progress: ProgressCallback,
        ) -> Result<Arc<dyn LocalEngine>> {
            self.log.lock().push(format!("load {}", model_id));
            progress("Fetching param cache[1/10]");
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            if self.fail {
                anyhow::bail!("WebGPU adapter unavailable");
            }
            progress("Finish loading");
            Ok(Arc::new(FakeLocal {
                model: model_id.to_string(),
                script: self.script.clone(),
                log: self.log.clone(),
                observer: self.observer.clone(),
            }))
        }
    }

    struct Harness {
        session: ChatSession,
        cloud_calls: Arc<Mutex<Vec<(String, Vec<ChatMessage>)>>>,
        log: CallLog,
    }

    fn harness_with(default_model: &str, script: Script, loader_fails: bool, gate: Option<Arc<Notify>>) -> Harness {
        let cloud_calls = Arc::new(Mutex::new(Vec::new()));
        let log: CallLog = Arc::new(Mutex::new(Vec::new()));
        let observer = Arc::new(Mutex::new(None));

        let config = ChatConfig {
            default_model: default_model.to_string(),
            system_prompt: "S".to_string(),
        };
        let session = ChatSession::new(
            &config,
            Arc::new(FakeCloud {
                script: script.clone(),
                calls: cloud_calls.clone(),
            }),
            Arc::new(FakeLoader {
                script,
                fail: loader_fails,
                log: log.clone(),
                observer: observer.clone(),
                gate,
            }),
        )
        .unwrap();
        *observer.lock() = Some(session.subscribe());

        Harness {
            session,
            cloud_calls,
            log,
        }
    }

    fn harness(default_model: &str, script: Script) -> Harness {
        harness_with(default_model, script, false, None)
    }

    fn hello() -> Script {
        Script {
            fragments: vec!["Hel", "lo"],
            ..Script::default()
        }
    }

    const CLOUD: &str = "gemini-flash-lite-latest";
    const LOCAL: &str = "smollm2:135m";

    #[test]
    fn test_new_rejects_unknown_default() {
        let config = ChatConfig {
            default_model: "nope".to_string(),
            system_prompt: String::new(),
        };
        let h = harness(CLOUD, Script::default());
        let result = ChatSession::new(&config, h.session.cloud.clone(), h.session.loader.clone());
        assert!(matches!(result, Err(DeepSearchError::UnknownModel(_))));
    }

    #[tokio::test]
    async fn test_cloud_submit_streams_running_total() {
        let h = harness(CLOUD, hello());
        h.session.set_input("hi");

        assert_eq!(h.session.handle_submit().await, SubmitOutcome::Completed);

        assert_eq!(
            h.session.messages(),
            vec![
                ChatMessage::system("S"),
                ChatMessage::user("hi"),
                ChatMessage::assistant("Hello"),
            ]
        );
        let calls = h.cloud_calls.lock();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, CLOUD);
        assert_eq!(
            calls[0].1,
            vec![ChatMessage::system("S"), ChatMessage::user("hi")]
        );

        let snapshot = h.session.snapshot();
        assert!(snapshot.input.is_empty());
        assert!(!snapshot.is_submitting);
        assert_eq!(snapshot.phase, SessionPhase::Ready);
    }

    #[tokio::test]
    async fn test_snapshots_carry_accumulated_content() {
        let h = harness(CLOUD, hello());
        let mut rx = h.session.subscribe();
        h.session.set_input("hi");

        let submit = h.session.handle_submit();
        let watch = async {
            let mut seen = Vec::new();
            while rx.changed().await.is_ok() {
                let snap = rx.borrow_and_update().clone();
                if let Some(m) = snap.streaming_message() {
                    seen.push(m.content.clone());
                }
                if !snap.is_submitting && snap.messages.len() == 3 {
                    break;
                }
            }
            seen
        };
        let (outcome, seen) = tokio::join!(submit, watch);

        assert_eq!(outcome, SubmitOutcome::Completed);
        // Full running totals, never bare deltas
        assert!(seen.iter().all(|c| "Hello".starts_with(c.as_str())));
        assert_eq!(h.session.messages().last().unwrap().content, "Hello");
    }

    #[tokio::test]
    async fn test_blank_input_is_noop() {
        let h = harness(CLOUD, hello());
        for input in ["", "   ", "\n\t"] {
            h.session.set_input(input);
            assert_eq!(h.session.handle_submit().await, SubmitOutcome::Skipped);
        }
        assert_eq!(h.session.messages().len(), 1);
        assert!(h.cloud_calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_submit_while_submitting_is_noop() {
        let h = harness(CLOUD, hello());
        h.session.set_input("hi");
        h.session.shared.update(|s| s.is_submitting = true);

        assert_eq!(h.session.handle_submit().await, SubmitOutcome::Skipped);
        assert_eq!(h.session.messages().len(), 1);
        assert_eq!(h.session.snapshot().input, "hi");
    }

    #[tokio::test]
    async fn test_concurrent_submits_start_one_stream() {
        let release = Arc::new(Notify::new());
        let h = harness(
            CLOUD,
            Script {
                fragments: vec!["Hel", "lo"],
                release: Some(release.clone()),
                ..Script::default()
            },
        );
        h.session.set_input("first");

        let first = h.session.handle_submit();
        let second = async {
            // The first submission is now parked mid-stream
            tokio::task::yield_now().await;
            h.session.set_input("second");
            let outcome = h.session.handle_submit().await;
            release.notify_one();
            outcome
        };
        let (first, second) = tokio::join!(first, second);

        assert_eq!(first, SubmitOutcome::Completed);
        assert_eq!(second, SubmitOutcome::Skipped);
        assert_eq!(h.cloud_calls.lock().len(), 1);
        assert_eq!(
            h.session.messages(),
            vec![
                ChatMessage::system("S"),
                ChatMessage::user("first"),
                ChatMessage::assistant("Hello"),
            ]
        );
        assert_eq!(h.session.snapshot().input, "second");
    }

    #[tokio::test]
    async fn test_submit_grows_transcript_by_two() {
        let h = harness(CLOUD, hello());
        for turn in ["one", "two"] {
            let before = h.session.messages().len();
            h.session.set_input(turn);
            h.session.handle_submit().await;
            assert_eq!(h.session.messages().len(), before + 2);
        }
    }

    #[tokio::test]
    async fn test_local_without_engine_is_noop() {
        let h = harness(LOCAL, hello());
        h.session.set_input("hi");

        assert_eq!(h.session.handle_submit().await, SubmitOutcome::Skipped);
        assert_eq!(h.session.messages(), vec![ChatMessage::system("S")]);
        assert!(h.log.lock().is_empty());
    }

    #[tokio::test]
    async fn test_local_initialize_then_submit() {
        let h = harness(LOCAL, hello());
        let mut rx = h.session.subscribe();

        h.session.initialize_engine().await;

        let snapshot = h.session.snapshot();
        assert!(snapshot.has_engine);
        assert!(!snapshot.is_engine_loading);
        assert_eq!(snapshot.phase, SessionPhase::Ready);
        assert_eq!(snapshot.load_progress, "Finish loading");
        assert!(rx.has_changed().unwrap());
        let _ = rx.borrow_and_update();

        h.session.set_input("hi");
        assert_eq!(h.session.handle_submit().await, SubmitOutcome::Completed);
        assert_eq!(h.session.messages().last().unwrap(), &ChatMessage::assistant("Hello"));
        assert_eq!(*h.log.lock(), vec!["load smollm2:135m", "complete smollm2:135m"]);
    }

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let h = harness(LOCAL, hello());
        h.session.initialize_engine().await;
        h.session.initialize_engine().await;
        assert_eq!(h.log.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_initialize_cloud_is_immediately_ready() {
        let h = harness(CLOUD, hello());
        h.session.initialize_engine().await;
        let snapshot = h.session.snapshot();
        assert_eq!(snapshot.phase, SessionPhase::Ready);
        assert!(!snapshot.has_engine);
        assert!(h.log.lock().is_empty());
    }

    #[tokio::test]
    async fn test_load_failure_returns_to_idle() {
        let h = harness_with(LOCAL, hello(), true, None);
        h.session.initialize_engine().await;

        let snapshot = h.session.snapshot();
        assert_eq!(snapshot.phase, SessionPhase::Idle);
        assert!(!snapshot.has_engine);
        assert!(!snapshot.is_engine_loading);
        assert!(snapshot.load_progress.starts_with(MODEL_LOAD_FAILED));
        assert!(snapshot.load_progress.contains("WebGPU adapter unavailable"));
    }

    #[tokio::test]
    async fn test_switch_unloads_before_clearing() {
        let h = harness(LOCAL, hello());
        h.session.initialize_engine().await;

        h.session.select_model(CLOUD).await.unwrap();

        assert_eq!(
            h.log.lock().last().unwrap(),
            "unload smollm2:135m has_engine=Some(true)"
        );
        let snapshot = h.session.snapshot();
        assert!(!snapshot.has_engine);
        assert_eq!(snapshot.selected_model.id, CLOUD);
        assert_eq!(snapshot.phase, SessionPhase::Idle);
        assert!(!snapshot.is_switching_model);
    }

    #[tokio::test]
    async fn test_switch_to_unknown_model_rejected() {
        let h = harness(CLOUD, hello());
        let err = h.session.select_model("foo").await.unwrap_err();
        assert!(matches!(err, DeepSearchError::UnknownModel(id) if id == "foo"));
        assert_eq!(h.session.selected_model().id, CLOUD);
    }

    #[tokio::test]
    async fn test_switch_refused_while_submitting() {
        let h = harness(CLOUD, hello());
        h.session.shared.update(|s| s.is_submitting = true);
        assert!(matches!(
            h.session.select_model(LOCAL).await,
            Err(DeepSearchError::Busy)
        ));
        assert_eq!(h.session.selected_model().id, CLOUD);
    }

    #[tokio::test]
    async fn test_submit_refused_while_switching() {
        let h = harness(CLOUD, hello());
        h.session.set_input("hi");
        h.session.shared.update(|s| s.is_switching_model = true);
        assert_eq!(h.session.handle_submit().await, SubmitOutcome::Skipped);
        assert_eq!(h.session.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_load_finishing_after_switch_is_discarded() {
        let gate = Arc::new(Notify::new());
        let h = harness_with(LOCAL, hello(), false, Some(gate.clone()));

        let init = h.session.initialize_engine();
        let switch = async {
            tokio::task::yield_now().await;
            h.session.select_model(CLOUD).await.unwrap();
            gate.notify_one();
        };
        tokio::join!(init, switch);

        let snapshot = h.session.snapshot();
        assert_eq!(snapshot.selected_model.id, CLOUD);
        assert!(!snapshot.has_engine);
        assert!(!snapshot.is_engine_loading);
        let log = h.log.lock();
        assert!(log.iter().any(|l| l.starts_with("unload smollm2:135m")));
    }

    #[tokio::test]
    async fn test_setup_error_appends_error_entry() {
        let h = harness(
            CLOUD,
            Script {
                fail_setup: Some("API request failed with status 500"),
                ..Script::default()
            },
        );
        h.session.set_input("hi");

        let outcome = h.session.handle_submit().await;

        assert_eq!(
            outcome,
            SubmitOutcome::Failed("Error: API request failed with status 500.".to_string())
        );
        assert_eq!(
            h.session.messages(),
            vec![
                ChatMessage::system("S"),
                ChatMessage::user("hi"),
                ChatMessage::assistant(""),
                ChatMessage::assistant("Error: API request failed with status 500."),
            ]
        );
        assert!(!h.session.snapshot().is_submitting);
    }

    #[tokio::test]
    async fn test_local_setup_error_has_no_placeholder() {
        let h = harness(
            LOCAL,
            Script {
                fail_setup: Some("engine crashed"),
                ..Script::default()
            },
        );
        h.session.initialize_engine().await;
        h.session.set_input("hi");

        let outcome = h.session.handle_submit().await;

        assert_eq!(outcome, SubmitOutcome::Failed("Error: engine crashed.".to_string()));
        assert_eq!(
            h.session.messages(),
            vec![
                ChatMessage::system("S"),
                ChatMessage::user("hi"),
                ChatMessage::assistant("Error: engine crashed."),
            ]
        );
        assert_eq!(h.session.snapshot().phase, SessionPhase::Ready);
    }

    #[tokio::test]
    async fn test_error_before_first_fragment_keeps_empty_placeholder() {
        let h = harness(
            CLOUD,
            Script {
                fail_after: Some("connection reset"),
                ..Script::default()
            },
        );
        h.session.set_input("hi");

        assert!(matches!(h.session.handle_submit().await, SubmitOutcome::Failed(_)));
        let messages = h.session.messages();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[2], ChatMessage::assistant(""));
        assert_eq!(messages[3], ChatMessage::assistant("Error: connection reset."));
    }

    #[tokio::test]
    async fn test_mid_stream_error_keeps_partial_reply() {
        let h = harness(
            CLOUD,
            Script {
                fragments: vec!["Hel"],
                fail_after: Some("connection reset"),
                ..Script::default()
            },
        );
        h.session.set_input("hi");

        assert!(matches!(h.session.handle_submit().await, SubmitOutcome::Failed(_)));
        let messages = h.session.messages();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[2], ChatMessage::assistant("Hel"));
        assert_eq!(messages[3], ChatMessage::assistant("Error: connection reset."));
        assert_eq!(h.session.snapshot().phase, SessionPhase::Ready);
    }

    #[tokio::test]
    async fn test_dropped_submission_clears_flag() {
        let h = harness(
            CLOUD,
            Script {
                fragments: vec!["Hel"],
                hang: true,
                ..Script::default()
            },
        );
        h.session.set_input("hi");
        {
            let submit = h.session.handle_submit();
            futures::pin_mut!(submit);
            // Poll once so the guard is installed, then drop mid-flight
            assert!(futures::poll!(submit.as_mut()).is_pending());
            assert!(h.session.snapshot().is_submitting);
        }
        let snapshot = h.session.snapshot();
        assert!(!snapshot.is_submitting);
        assert_eq!(snapshot.phase, SessionPhase::Ready);
        assert_eq!(snapshot.messages.last().unwrap(), &ChatMessage::assistant("Hel"));
    }
}
