//! Card submission: validate the draft, create the card, attach its cover
//! and link in order, then reset the local cache.

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;

use crate::capture::draft::DraftStore;
use crate::core::card::{Attachment, Spinner, SpinnerKind};
use crate::error::{CacheError, SubmitError};

use super::cache::CacheData;
use super::ordered::OrderedTasks;
use super::trello::RemoteService;

/// How long the "done" indicator stays up before the cache is reset.
pub const DEFAULT_DONE_DELAY: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SubmitState {
    #[default]
    Idle,
    Validating,
    Submitting,
    AttachingSequential,
    Success,
    /// Card creation failed; submitting again retries from scratch.
    Failed(String),
}

/// What started a submission. Both take the same path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitTrigger {
    Button,
    KeyChord,
}

/// A key release as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyChord {
    pub ctrl: bool,
    pub key: String,
}

impl KeyChord {
    pub fn is_submit(&self) -> bool {
        self.ctrl && self.key == "Enter"
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitReport {
    pub card_id: String,
    pub attached: usize,
    /// Attachment failures. They never undo the created card.
    pub attachment_errors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The draft lacks a title or list; nothing was sent.
    Blocked,
    /// The card exists and the cache was reset; the caller closes the
    /// capture surface.
    Submitted(SubmitReport),
}

pub struct SubmissionPipeline<R: ?Sized> {
    remote: Arc<R>,
    store: Arc<DraftStore>,
    done_delay: Duration,
    state: SubmitState,
}

impl<R: RemoteService + ?Sized> SubmissionPipeline<R> {
    pub fn new(remote: Arc<R>, store: Arc<DraftStore>) -> Self {
        Self {
            remote,
            store,
            done_delay: DEFAULT_DONE_DELAY,
            state: SubmitState::Idle,
        }
    }

    pub fn with_done_delay(mut self, delay: Duration) -> Self {
        self.done_delay = delay;
        self
    }

    pub fn state(&self) -> &SubmitState {
        &self.state
    }

    /// Submit when `chord` is the submit shortcut (Ctrl+Enter).
    pub async fn handle_key(&mut self, chord: &KeyChord) -> Option<Result<SubmitOutcome, SubmitError>> {
        if !chord.is_submit() {
            return None;
        }
        Some(self.submit(SubmitTrigger::KeyChord).await)
    }

    pub async fn submit(&mut self, trigger: SubmitTrigger) -> Result<SubmitOutcome, SubmitError> {
        self.state = SubmitState::Validating;
        let draft = self.store.draft().await;
        if !draft.is_submittable() {
            log::debug!("Submit ({:?}) withheld: draft needs a title and a list", trigger);
            self.state = SubmitState::Idle;
            return Ok(SubmitOutcome::Blocked);
        }

        self.state = SubmitState::Submitting;
        log::info!("Submitting '{}' to list {} ({:?})", draft.title, draft.list_id, trigger);
        self.show_spinner(SpinnerKind::Loading, true).await;
        self.store.bookmark_last_location(&draft.path()).await;

        let card = match self.remote.create_card(&draft.submit_params(&Local)).await {
            Ok(card) => card,
            Err(e) => {
                log::error!("Card creation failed: {}", e);
                self.show_spinner(SpinnerKind::Loading, false).await;
                self.state = SubmitState::Failed(e.to_string());
                return Err(SubmitError::CardCreation(e));
            }
        };
        log::info!("Created card {}", card.id);

        self.state = SubmitState::AttachingSequential;
        let attachments = draft.attachments();
        let total = attachments.len();
        let attachment_errors = self.attach_all(&card.id, attachments).await;
        let attached = total - attachment_errors.len();

        self.state = SubmitState::Success;
        self.reset_after_success().await?;

        Ok(SubmitOutcome::Submitted(SubmitReport {
            card_id: card.id,
            attached,
            attachment_errors,
        }))
    }

    /// Attach in order, one call at a time. Failures are logged and
    /// collected; the remaining attachments still go out.
    async fn attach_all(&self, card_id: &str, attachments: Vec<Attachment>) -> Vec<String> {
        let remote = &*self.remote;
        let results = OrderedTasks::new(attachments)
            .run(move |attachment| async move {
                let result = remote.create_attachment(card_id, &attachment).await;
                (attachment, result)
            })
            .await;

        let mut errors = Vec::new();
        for (attachment, result) in results {
            match result {
                Ok(()) => log::debug!("Attached {} to card {}", attachment.kind(), card_id),
                Err(e) => {
                    log::error!("Failed to attach {} to card {}: {}", attachment.kind(), card_id, e);
                    errors.push(format!("{}: {}", attachment.kind(), e));
                }
            }
        }
        errors
    }

    /// Show "done", then clear the cache and reseed it with defaults,
    /// carrying the remembered locations over, and persist.
    async fn reset_after_success(&self) -> Result<(), CacheError> {
        self.show_spinner(SpinnerKind::Done, true).await;
        tokio::time::sleep(self.done_delay).await;
        self.show_spinner(SpinnerKind::Loading, false).await;

        let cache = self.store.cache();
        let locations = cache.read().await.locations;
        cache.clear().await;
        cache
            .write(CacheData {
                locations: Some(locations),
                ..CacheData::defaults()
            })
            .await;
        cache.persist().await?;
        log::info!("Draft reset after submission");
        Ok(())
    }

    async fn show_spinner(&self, kind: SpinnerKind, visible: bool) {
        self.store
            .cache()
            .write(CacheData::spinner(Spinner { kind, visible }))
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::card::Draft;
    use crate::core::location::{LocationPath, SiteTag, find_location};
    use crate::error::RemoteError;
    use crate::sync::cache::{LocalCache, MemoryStorage, SNAPSHOT_KEY};
    use crate::sync::trello::CreatedCard;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Default)]
    struct RecordingRemote {
        events: Mutex<Vec<String>>,
        fail_card: AtomicBool,
        fail_attachment: Option<&'static str>,
    }

    impl RecordingRemote {
        fn record(&self, event: String) {
            self.events.lock().unwrap().push(event);
        }

        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RemoteService for RecordingRemote {
        async fn create_card(&self, params: &[(&'static str, String)]) -> Result<CreatedCard, RemoteError> {
            let name = params.iter().find(|(k, _)| *k == "name").map(|(_, v)| v.clone());
            self.record(format!("card {}", name.unwrap_or_default()));
            if self.fail_card.load(Ordering::SeqCst) {
                return Err(RemoteError::Rejected("service unavailable".into()));
            }
            Ok(CreatedCard { id: "card-1".into() })
        }

        async fn create_attachment(&self, card_id: &str, attachment: &Attachment) -> Result<(), RemoteError> {
            self.record(format!("start {} {}", attachment.kind(), card_id));
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.record(format!("end {}", attachment.kind()));
            if self.fail_attachment == Some(attachment.kind()) {
                return Err(RemoteError::Rejected("too large".into()));
            }
            Ok(())
        }
    }

    struct Fixture {
        remote: Arc<RecordingRemote>,
        store: Arc<DraftStore>,
        storage: Arc<MemoryStorage>,
    }

    async fn fixture(remote: RecordingRemote) -> Fixture {
        let storage = Arc::new(MemoryStorage::new());
        let cache = Arc::new(LocalCache::new(storage.clone(), SNAPSHOT_KEY));
        let store = Arc::new(DraftStore::new(cache));
        store.seed_defaults().await.unwrap();
        Fixture {
            remote: Arc::new(remote),
            store,
            storage,
        }
    }

    impl Fixture {
        fn pipeline(&self) -> SubmissionPipeline<RecordingRemote> {
            SubmissionPipeline::new(self.remote.clone(), self.store.clone())
                .with_done_delay(Duration::ZERO)
        }

        async fn fill_draft(&self) {
            self.store
                .edit_draft(|d| {
                    d.title = "Interesting article".into();
                    d.link = "https://site.com/a".into();
                    d.cover = "https://site.com/cover.png".into();
                    d.set_path(LocationPath::new(Some("T1"), "B1", "L1"));
                })
                .await;
        }
    }

    #[tokio::test]
    async fn missing_title_makes_no_calls() {
        let fx = fixture(RecordingRemote::default()).await;
        fx.store.edit_draft(|d| d.list_id = "L1".into()).await;

        let mut pipeline = fx.pipeline();
        let outcome = pipeline.submit(SubmitTrigger::Button).await.unwrap();

        assert_eq!(outcome, SubmitOutcome::Blocked);
        assert_eq!(pipeline.state(), &SubmitState::Idle);
        assert!(fx.remote.events().is_empty());
    }

    #[tokio::test]
    async fn cover_attachment_finishes_before_link_starts() {
        let fx = fixture(RecordingRemote::default()).await;
        fx.fill_draft().await;

        let outcome = fx.pipeline().submit(SubmitTrigger::Button).await.unwrap();

        assert_eq!(
            fx.remote.events(),
            vec![
                "card Interesting article",
                "start cover card-1",
                "end cover",
                "start url card-1",
                "end url",
            ]
        );
        assert_eq!(
            outcome,
            SubmitOutcome::Submitted(SubmitReport {
                card_id: "card-1".into(),
                attached: 2,
                attachment_errors: Vec::new(),
            })
        );
    }

    #[tokio::test]
    async fn success_resets_draft_and_keeps_locations() {
        let fx = fixture(RecordingRemote::default()).await;
        fx.store
            .remember_site_location("site.com", &LocationPath::new(Some("T2"), "B2", "L2"))
            .await;
        fx.fill_draft().await;

        let mut pipeline = fx.pipeline();
        pipeline.submit(SubmitTrigger::Button).await.unwrap();
        assert_eq!(pipeline.state(), &SubmitState::Success);

        let view = fx.store.cache().read().await;
        assert_eq!(view.draft, Draft::default());
        assert_eq!(view.locations.len(), 3);
        let last = find_location(&view.locations, &SiteTag::LastLocation).unwrap();
        assert_eq!(last.path_str, "T1/B1/L1");
        let site = find_location(&view.locations, &SiteTag::Site("site.com".into())).unwrap();
        assert_eq!(site.path_str, "T2/B2/L2");

        let settings = fx.store.cache().settings().await;
        assert!(!settings.spinner.visible);

        let persisted = fx.storage.get(SNAPSHOT_KEY).await.unwrap();
        assert!(persisted.contains("T1/B1/L1"));
    }

    #[tokio::test]
    async fn card_failure_is_reported_and_retryable() {
        let fx = fixture(RecordingRemote::default()).await;
        fx.remote.fail_card.store(true, Ordering::SeqCst);
        fx.fill_draft().await;

        let mut pipeline = fx.pipeline();
        let err = pipeline.submit(SubmitTrigger::Button).await.unwrap_err();
        assert!(matches!(err, SubmitError::CardCreation(_)));
        assert!(matches!(pipeline.state(), SubmitState::Failed(msg) if msg.contains("service unavailable")));

        // Input is usable again and the draft is untouched.
        assert!(!fx.store.cache().settings().await.spinner.visible);
        assert_eq!(fx.store.draft().await.title, "Interesting article");

        fx.remote.fail_card.store(false, Ordering::SeqCst);
        let outcome = pipeline.submit(SubmitTrigger::Button).await.unwrap();
        assert!(matches!(outcome, SubmitOutcome::Submitted(_)));
        assert_eq!(pipeline.state(), &SubmitState::Success);
    }

    #[tokio::test]
    async fn attachment_failure_does_not_abort_the_rest() {
        let fx = fixture(RecordingRemote {
            fail_attachment: Some("cover"),
            ..RecordingRemote::default()
        })
        .await;
        fx.fill_draft().await;

        let outcome = fx.pipeline().submit(SubmitTrigger::Button).await.unwrap();
        let SubmitOutcome::Submitted(report) = outcome else {
            panic!("expected a submitted card");
        };
        assert_eq!(report.attached, 1);
        assert_eq!(report.attachment_errors.len(), 1);
        assert!(report.attachment_errors[0].starts_with("cover"));
        assert!(fx.remote.events().contains(&"end url".to_string()));
        assert_eq!(fx.store.draft().await, Draft::default());
    }

    #[tokio::test]
    async fn ctrl_enter_submits_like_the_button() {
        let fx = fixture(RecordingRemote::default()).await;
        fx.fill_draft().await;
        let mut pipeline = fx.pipeline();

        let plain = KeyChord { ctrl: false, key: "Enter".into() };
        assert!(pipeline.handle_key(&plain).await.is_none());
        assert!(fx.remote.events().is_empty());

        let chord = KeyChord { ctrl: true, key: "Enter".into() };
        let outcome = pipeline.handle_key(&chord).await.unwrap().unwrap();
        assert!(matches!(outcome, SubmitOutcome::Submitted(_)));
        assert_eq!(fx.remote.events().len(), 5);
    }
}
