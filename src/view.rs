//! Result view coordination
//!
//! [`select_presentation`] maps the job state to exactly one of three
//! presentation modes. [`ResultView`] is the mounted view: it wires the
//! poller, the action gate and the reset flow to one [`JobStore`] and holds
//! none of their logic itself.

use crate::actions::{Action, ActionOutcome, ActionSet, ResultActionGate};
use crate::config::Config;
use crate::error::Result;
use crate::notify::{EventNotifier, Navigator, Notifier};
use crate::poller::{PollerHandle, TaskStatusPoller};
use crate::remote::{DocumentApi, HttpDocumentApi};
use crate::reset::{ResetConfirmationFlow, ResetPhase};
use crate::state::{JobError, JobState, JobStore, ResultSummary};
use crate::types::{Destination, Event};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::debug;

/// Capacity of the event broadcast channel
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// What the result view shows
#[derive(Debug, Clone, PartialEq)]
pub enum Presentation {
    /// The submission is still in progress; no actions
    Loading,
    /// The job failed; no actions, only a reset from the error view
    Error(JobError),
    /// The result with its actions and the reset overlay
    Result {
        /// Result metric, if the server produced one
        summary: Option<ResultSummary>,
        /// Enabled actions
        actions: ActionSet,
        /// Phase of the reset confirmation overlay
        reset: ResetPhase,
    },
}

impl Presentation {
    /// Whether actions are rendered in this mode
    pub fn shows_actions(&self) -> bool {
        matches!(self, Presentation::Result { .. })
    }
}

/// Select the presentation for `state`
///
/// Loading wins over error, error wins over result; every state maps to
/// exactly one mode.
pub fn select_presentation(state: &JobState, reset: ResetPhase) -> Presentation {
    if state.is_loading() {
        return Presentation::Loading;
    }
    if let Some(error) = state.error() {
        return Presentation::Error(error.clone());
    }
    Presentation::Result {
        summary: state.result_summary(),
        actions: ActionSet::for_state(state),
        reset,
    }
}

/// External collaborators of a [`ResultView`]
pub struct Collaborators {
    /// Remote task/document API
    pub api: Arc<dyn DocumentApi>,
    /// Receiver of the "return to submission" signal
    pub navigator: Arc<dyn Navigator>,
    /// Notifier for action outcomes; defaults to [`EventNotifier`]
    pub notifier: Option<Arc<dyn Notifier>>,
}

/// A mounted result view
///
/// Mounting starts the task status poller; [`teardown`](ResultView::teardown)
/// or dropping the view stops it.
pub struct ResultView {
    store: JobStore,
    gate: ResultActionGate,
    reset: ResetConfirmationFlow,
    navigator: Arc<dyn Navigator>,
    event_tx: broadcast::Sender<Event>,
    poller: PollerHandle,
}

impl ResultView {
    /// Mount a view over `store`
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn mount(config: &Config, store: JobStore, collaborators: Collaborators) -> Result<Self> {
        config.validate()?;

        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let Collaborators {
            api,
            navigator,
            notifier,
        } = collaborators;
        let notifier = notifier.unwrap_or_else(|| {
            Arc::new(EventNotifier::new(event_tx.clone())) as Arc<dyn Notifier>
        });

        let gate = ResultActionGate::new(
            store.clone(),
            api.clone(),
            notifier,
            config.download.download_dir.clone(),
        );
        let poller =
            TaskStatusPoller::new(store.clone(), api, &config.polling, event_tx.clone()).spawn();

        debug!("result view mounted");
        Ok(Self {
            store,
            gate,
            reset: ResetConfirmationFlow::new(),
            navigator,
            event_tx,
            poller,
        })
    }

    /// Mount a view talking to the server configured in `config.api`
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be built.
    pub fn mount_http(
        config: &Config,
        store: JobStore,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self> {
        let api = Arc::new(HttpDocumentApi::new(&config.api)?);
        Self::mount(
            config,
            store,
            Collaborators {
                api,
                navigator,
                notifier: None,
            },
        )
    }

    /// The job state this view presents
    pub fn store(&self) -> &JobStore {
        &self.store
    }

    /// Subscribe to view events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// What to show right now
    pub fn present(&self) -> Presentation {
        self.store
            .read(|state| select_presentation(state, self.reset.phase()))
    }

    /// Trigger a user action
    ///
    /// Download and publish run in the background and are independent of
    /// each other; the returned handle can be awaited or ignored. `None`
    /// means nothing was spawned: either the action is disabled, or it was
    /// [`Action::Reset`], which only opens the confirmation.
    pub fn trigger(&mut self, action: Action) -> Option<JoinHandle<ActionOutcome>> {
        if !self.gate.permitted().allows(action) {
            debug!(?action, "action not permitted");
            return None;
        }

        let gate = self.gate.clone();
        match action {
            Action::Download => Some(tokio::spawn(async move { gate.download().await })),
            Action::Publish(destination) => {
                Some(tokio::spawn(async move { gate.publish(destination).await }))
            }
            Action::Reset => {
                self.request_reset();
                None
            }
        }
    }

    /// Download the artifact and wait for the outcome
    pub async fn download(&self) -> ActionOutcome {
        self.gate.download().await
    }

    /// Publish the artifact and wait for the outcome
    pub async fn publish(&self, destination: Destination) -> ActionOutcome {
        self.gate.publish(destination).await
    }

    /// Open the reset confirmation
    pub fn request_reset(&mut self) -> bool {
        self.reset.request()
    }

    /// Close the reset confirmation without resetting
    pub fn cancel_reset(&mut self) -> bool {
        self.reset.cancel()
    }

    /// Confirm the reset: clear the job and return to submission
    pub fn confirm_reset(&mut self) -> bool {
        let confirmed = self.reset.confirm(&self.store, self.navigator.as_ref());
        if confirmed {
            self.event_tx.send(Event::ResetConfirmed).ok();
        }
        confirmed
    }

    /// Unmount the view and wait for the poller to stop
    pub async fn teardown(self) {
        self.poller.shutdown().await;
        debug!("result view torn down");
    }
}
