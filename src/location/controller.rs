//! Search/selection controller for one location picker.
//!
//! The controller owns the picker's working state and is driven by events:
//! UI events arrive through a [`PickerHandle`], while the debounce timer and
//! provider calls run as spawned tasks that post their results back on the
//! same channel. Every autocomplete request and every resolution carries a
//! sequence number, and responses whose number is no longer current are
//! dropped.
//!
//! ```text
//! Idle ──type──▶ Querying ──response──▶ ShowingCandidates ──select──▶ Resolving ──▶ Confirmed
//!   ▲                ▲                                                   ▲               │
//!   │                └──────────────────────── edit ─────────────────────┼───────────────┘
//!   └── clear (from any state)                     map click (from any state)
//! ```

use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

use super::resolver::{LocationResolver, MapClick};
use super::types::{LocationSelection, PlaceCandidate, ResolvedLocation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PickerPhase {
    Idle,
    Querying,
    ShowingCandidates,
    Resolving,
    Confirmed,
    /// A map click resolved to nothing.
    NoResult,
    /// The provider is misconfigured; only typed text can be confirmed.
    Unavailable,
}

/// Everything the UI needs to render the picker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PickerState {
    pub phase: PickerPhase,
    pub text: String,
    pub candidates: Vec<PlaceCandidate>,
    pub hovered: Option<usize>,
    /// Hovering a row previews it on the map. Off after an explicit choice.
    pub hover_preview: bool,
    pub loading: bool,
    /// The single source of truth for the picker's location.
    pub current: Option<LocationSelection>,
}

impl PickerState {
    fn new(phase: PickerPhase) -> Self {
        Self {
            phase,
            text: String::new(),
            candidates: vec![],
            hovered: None,
            hover_preview: true,
            loading: false,
            current: None,
        }
    }
}

/// Events raised by the user interface.
#[derive(Debug, Clone, PartialEq)]
pub enum PickerEvent {
    TextChanged(String),
    Cleared,
    CandidateHovered(usize),
    CandidateSelected(usize),
    MapClicked(MapClick),
    /// Confirm whatever text is in the box, without a coordinate.
    TextCommitted,
    /// The picker is being unmounted.
    Closed,
}

#[derive(Debug)]
enum Message {
    Ui(PickerEvent),
    DebounceElapsed { seq: u64 },
    CandidatesLoaded { seq: u64, candidates: Vec<PlaceCandidate> },
    SelectionResolved { seq: u64, selection: LocationSelection },
    ClickResolved { seq: u64, location: Option<ResolvedLocation> },
}

/// Cloneable sender for UI events.
#[derive(Clone)]
pub struct PickerHandle {
    tx: mpsc::UnboundedSender<Message>,
}

impl PickerHandle {
    /// Returns `false` once the controller is gone.
    pub fn send(&self, event: PickerEvent) -> bool {
        self.tx.send(Message::Ui(event)).is_ok()
    }
}

type ResolvedCallback = Box<dyn FnMut(&LocationSelection) + Send>;

pub struct SearchController {
    resolver: LocationResolver,
    debounce: Duration,
    state: PickerState,
    query_seq: u64,
    resolve_seq: u64,
    pending_debounce: Option<JoinHandle<()>>,
    tx: mpsc::UnboundedSender<Message>,
    rx: mpsc::UnboundedReceiver<Message>,
    watchers: watch::Sender<PickerState>,
    on_resolved: Option<ResolvedCallback>,
}

impl SearchController {
    pub fn new(resolver: LocationResolver, debounce: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let phase = if resolver.is_available() {
            PickerPhase::Idle
        } else {
            PickerPhase::Unavailable
        };
        let state = PickerState::new(phase);
        let (watchers, _) = watch::channel(state.clone());
        Self {
            resolver,
            debounce,
            state,
            query_seq: 0,
            resolve_seq: 0,
            pending_debounce: None,
            tx,
            rx,
            watchers,
            on_resolved: None,
        }
    }

    /// Register the callback invoked once per confirmation.
    pub fn on_location_resolved<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&LocationSelection) + Send + 'static,
    {
        self.on_resolved = Some(Box::new(callback));
        self
    }

    pub fn handle(&self) -> PickerHandle {
        PickerHandle { tx: self.tx.clone() }
    }

    /// Receive a snapshot after every state change.
    pub fn subscribe(&self) -> watch::Receiver<PickerState> {
        self.watchers.subscribe()
    }

    pub fn state(&self) -> &PickerState {
        &self.state
    }

    /// Process events until the picker is closed.
    pub async fn run(mut self) {
        while self.step().await {}
        debug!("picker closed");
    }

    /// Wait for one message and apply it. Returns `false` after `Closed`.
    pub async fn step(&mut self) -> bool {
        match self.rx.recv().await {
            Some(msg) => self.apply(msg),
            None => false,
        }
    }

    /// Apply a UI event immediately, bypassing the channel.
    pub fn dispatch(&mut self, event: PickerEvent) -> bool {
        self.apply(Message::Ui(event))
    }

    fn apply(&mut self, msg: Message) -> bool {
        let keep_running = match msg {
            Message::Ui(event) => self.apply_ui(event),
            Message::DebounceElapsed { seq } => {
                self.on_debounce_elapsed(seq);
                true
            }
            Message::CandidatesLoaded { seq, candidates } => {
                self.on_candidates(seq, candidates);
                true
            }
            Message::SelectionResolved { seq, selection } => {
                if seq == self.resolve_seq {
                    self.confirm(selection);
                } else {
                    debug!(seq, current = self.resolve_seq, "dropping stale selection");
                }
                true
            }
            Message::ClickResolved { seq, location } => {
                self.on_click_resolved(seq, location);
                true
            }
        };
        self.publish();
        keep_running
    }

    fn apply_ui(&mut self, event: PickerEvent) -> bool {
        match event {
            PickerEvent::TextChanged(text) => self.on_text_changed(text),
            PickerEvent::Cleared => self.reset(),
            PickerEvent::CandidateHovered(index) => {
                if self.state.hover_preview && index < self.state.candidates.len() {
                    self.state.hovered = Some(index);
                }
            }
            PickerEvent::CandidateSelected(index) => self.on_candidate_selected(index),
            PickerEvent::MapClicked(click) => self.on_map_clicked(click),
            PickerEvent::TextCommitted => self.on_text_committed(),
            PickerEvent::Closed => {
                self.cancel_debounce();
                return false;
            }
        }
        true
    }

    fn idle_phase(&self) -> PickerPhase {
        if self.resolver.is_available() {
            PickerPhase::Idle
        } else {
            PickerPhase::Unavailable
        }
    }

    fn on_text_changed(&mut self, text: String) {
        if text.trim().is_empty() {
            self.reset();
            return;
        }

        // Any in-flight query or resolution is now stale.
        self.query_seq += 1;
        self.resolve_seq += 1;
        self.state.text = text;
        self.state.hover_preview = true;
        self.state.hovered = None;

        if !self.resolver.is_available() {
            self.cancel_debounce();
            self.state.phase = PickerPhase::Unavailable;
            self.state.loading = false;
            return;
        }

        self.state.phase = PickerPhase::Querying;
        self.state.loading = true;
        self.restart_debounce();
    }

    fn restart_debounce(&mut self) {
        self.cancel_debounce();
        // Deadline is fixed at the keystroke, not when the task first runs.
        let deadline = Instant::now() + self.debounce;
        let seq = self.query_seq;
        let tx = self.tx.clone();
        self.pending_debounce = Some(tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            let _ = tx.send(Message::DebounceElapsed { seq });
        }));
    }

    fn cancel_debounce(&mut self) {
        if let Some(handle) = self.pending_debounce.take() {
            handle.abort();
        }
    }

    fn on_debounce_elapsed(&mut self, seq: u64) {
        if seq != self.query_seq || self.state.phase != PickerPhase::Querying {
            return;
        }
        self.pending_debounce = None;

        let text = self.state.text.clone();
        let resolver = self.resolver.clone();
        let tx = self.tx.clone();
        debug!(seq, query = %text, "issuing autocomplete");
        tokio::spawn(async move {
            let candidates = resolver.autocomplete(&text).await;
            let _ = tx.send(Message::CandidatesLoaded { seq, candidates });
        });
    }

    fn on_candidates(&mut self, seq: u64, candidates: Vec<PlaceCandidate>) {
        if seq != self.query_seq || self.state.phase != PickerPhase::Querying {
            debug!(seq, current = self.query_seq, "dropping stale autocomplete response");
            return;
        }
        self.state.phase = PickerPhase::ShowingCandidates;
        self.state.candidates = candidates;
        self.state.hovered = None;
        self.state.loading = false;
    }

    fn on_candidate_selected(&mut self, index: usize) {
        if self.state.phase != PickerPhase::ShowingCandidates {
            return;
        }
        let Some(candidate) = self.state.candidates.get(index).cloned() else {
            return;
        };

        self.cancel_debounce();
        self.query_seq += 1;
        self.resolve_seq += 1;
        self.state.phase = PickerPhase::Resolving;
        self.state.text = candidate.description.clone();
        self.state.hover_preview = false;
        self.state.hovered = None;
        self.state.loading = true;

        let seq = self.resolve_seq;
        let resolver = self.resolver.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let selection = resolver.select_candidate(&candidate).await;
            let _ = tx.send(Message::SelectionResolved { seq, selection });
        });
    }

    fn on_map_clicked(&mut self, click: MapClick) {
        self.cancel_debounce();
        self.query_seq += 1;
        self.resolve_seq += 1;
        self.state.phase = PickerPhase::Resolving;
        self.state.hover_preview = false;
        self.state.hovered = None;
        self.state.loading = true;

        let seq = self.resolve_seq;
        let resolver = self.resolver.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let location = resolver.resolve_click(&click).await.ok();
            let _ = tx.send(Message::ClickResolved { seq, location });
        });
    }

    fn on_click_resolved(&mut self, seq: u64, location: Option<ResolvedLocation>) {
        if seq != self.resolve_seq {
            debug!(seq, current = self.resolve_seq, "dropping stale click resolution");
            return;
        }
        match location {
            Some(loc) => self.confirm(loc.into()),
            None => {
                self.state.phase = PickerPhase::NoResult;
                self.state.loading = false;
            }
        }
    }

    fn on_text_committed(&mut self) {
        let Some(selection) = self.resolver.resolve_typed(&self.state.text) else {
            return;
        };
        self.cancel_debounce();
        self.query_seq += 1;
        self.resolve_seq += 1;
        self.confirm(selection);
    }

    fn confirm(&mut self, selection: LocationSelection) {
        info!(
            name = %selection.display_name,
            timezone = selection.timezone.as_deref().unwrap_or("-"),
            has_coordinate = selection.coordinate.is_some(),
            "location confirmed"
        );
        self.state.phase = PickerPhase::Confirmed;
        self.state.text = selection.display_name.clone();
        self.state.candidates.clear();
        self.state.hovered = None;
        self.state.hover_preview = false;
        self.state.loading = false;
        self.state.current = Some(selection.clone());
        if let Some(callback) = self.on_resolved.as_mut() {
            callback(&selection);
        }
    }

    fn reset(&mut self) {
        self.cancel_debounce();
        self.query_seq += 1;
        self.resolve_seq += 1;
        self.state = PickerState::new(self.idle_phase());
    }

    fn publish(&self) {
        self.watchers.send_replace(self.state.clone());
    }
}

impl Drop for SearchController {
    fn drop(&mut self) {
        self.cancel_debounce();
    }
}
