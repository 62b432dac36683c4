//! Session lifecycle controller
//!
//! A single task owns the accumulated state and drives everything through
//! one `select!` loop: feed events, the flush timer, and the discovery
//! poll. No locks, no shared mutability.
//!
//! The phase machine is Idle -> Discovering -> Live -> Draining -> Idle.
//! Discovering polls until a live session appears. Live pumps feed events
//! into the accumulator and flushes on a timer. Draining runs once the
//! feed is gone for good: a grace sleep for stragglers, a forced final
//! flush, then the post-session ingest fires in the background.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Datelike, Utc};
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, MissedTickBehavior};

use crate::config::Config;
use crate::discovery::{DiscoveredSession, DiscoverySource};
use crate::feed::{FeedConnector, FeedEvent, FeedHandle};
use crate::ingest_job::run_post_session_ingest;
use crate::retry::ExponentialBackoff;
use crate::sink::SnapshotWriter;
use crate::state::AccumulatedState;

const FEED_CHANNEL_CAPACITY: usize = 256;
const RECONNECT_INITIAL_SECS: u64 = 5;
const RECONNECT_MAX_SECS: u64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Discovering,
    Live,
    Draining,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::Discovering => "discovering",
            Phase::Live => "live",
            Phase::Draining => "draining",
        };
        f.write_str(name)
    }
}

pub struct Controller {
    discovery: Arc<dyn DiscoverySource>,
    connector: Arc<dyn FeedConnector>,
    writer: SnapshotWriter,
    config: Config,
    state: AccumulatedState,
    phase: Phase,
    transitions: Vec<Phase>,
}

impl Controller {
    pub fn new(
        discovery: Arc<dyn DiscoverySource>,
        connector: Arc<dyn FeedConnector>,
        writer: SnapshotWriter,
        config: Config,
    ) -> Self {
        Self {
            discovery,
            connector,
            writer,
            config,
            state: AccumulatedState::new(),
            phase: Phase::Idle,
            transitions: vec![Phase::Idle],
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Every phase entered since construction, in order
    pub fn transitions(&self) -> &[Phase] {
        &self.transitions
    }

    fn enter(&mut self, phase: Phase) {
        log::info!("Phase {} -> {}", self.phase, phase);
        self.phase = phase;
        self.transitions.push(phase);
    }

    /// Drive the phase machine until the deadline passes or shutdown fires
    ///
    /// Handles any number of sessions back to back; each completed session
    /// goes through the full drain before discovery resumes.
    pub async fn run(
        &mut self,
        deadline: Option<DateTime<Utc>>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        loop {
            if *shutdown.borrow() {
                return;
            }
            if let Some(d) = deadline {
                if Utc::now() >= d {
                    return;
                }
            }

            self.enter(Phase::Discovering);
            let Some(session) = self.await_session(deadline, &mut shutdown).await else {
                self.enter(Phase::Idle);
                return;
            };

            self.enter(Phase::Live);
            let archive_complete = self.run_live(&session, deadline, &mut shutdown).await;

            self.enter(Phase::Draining);
            self.drain(&session, archive_complete).await;
            self.enter(Phase::Idle);
        }
    }

    /// Poll discovery until a non-complete session shows up
    async fn await_session(
        &mut self,
        deadline: Option<DateTime<Utc>>,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Option<DiscoveredSession> {
        let mut poll = interval(Duration::from_millis(self.config.discovery_poll_ms));
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = poll.tick() => {
                    if let Some(session) = self.discovery.discover().await {
                        if session.is_complete {
                            log::debug!(
                                "Session {} ({}) already complete, waiting for the next one",
                                session.session_key, session.name
                            );
                            continue;
                        }
                        log::info!(
                            "Session {} live: {} {} ({})",
                            session.session_key, session.name,
                            session.session_type, session.start_date
                        );
                        return Some(session);
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        return None;
                    }
                }
                _ = deadline_sleep(deadline) => return None,
            }
        }
    }

    /// Pump feed events until the session ends one way or another
    ///
    /// Returns true only when discovery confirmed the archive is complete;
    /// every other exit (reconnect budget gone, shutdown, deadline, session
    /// vanished) must not trigger the archival ingest.
    async fn run_live(
        &mut self,
        session: &DiscoveredSession,
        deadline: Option<DateTime<Utc>>,
        shutdown: &mut watch::Receiver<bool>,
    ) -> bool {
        let session_key = session.session_key;
        let mut archive_complete = false;

        // One channel per live phase. The controller keeps its own sender
        // clone alive, so reconnects reuse the same receiver.
        let (tx, mut rx) = mpsc::channel(FEED_CHANNEL_CAPACITY);
        let mut backoff = ExponentialBackoff::new(
            RECONNECT_INITIAL_SECS,
            RECONNECT_MAX_SECS,
            self.config.feed_max_reconnect_attempts,
        );

        let mut handle = self.connect_with_backoff(&tx, &mut backoff).await;
        if handle.is_none() {
            return false;
        }

        let mut flush_timer = interval(Duration::from_millis(self.config.flush_interval_ms));
        flush_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut discovery_timer = interval(Duration::from_millis(self.config.discovery_poll_ms));
        discovery_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the session was just discovered, skip the immediate first poll
        discovery_timer.tick().await;

        loop {
            tokio::select! {
                event = rx.recv() => match event {
                    Some(FeedEvent::Connected) => {
                        backoff.reset();
                        log::info!("Feed subscribed for session {}", session_key);
                    }
                    Some(FeedEvent::Message { topic, payload }) => {
                        self.state.apply(&topic, &payload);
                    }
                    Some(FeedEvent::Disconnected { reason }) => {
                        log::warn!("Feed dropped: {}", reason);
                        if let Some(h) = handle.take() {
                            h.stop().await;
                        }
                        self.absorb_pending(&mut rx);

                        // The drop may mean the session ended. Ask discovery
                        // before burning reconnect budget.
                        match self.discovery.discover().await {
                            Some(s) if s.session_key == session_key && !s.is_complete => {
                                handle = self.connect_with_backoff(&tx, &mut backoff).await;
                                if handle.is_none() {
                                    break;
                                }
                            }
                            Some(s) if s.session_key == session_key && s.is_complete => {
                                log::info!("Session {} archive complete", session_key);
                                archive_complete = true;
                                break;
                            }
                            other => {
                                log::info!(
                                    "Session {} no longer live after disconnect ({:?})",
                                    session_key,
                                    other.map(|s| s.session_key)
                                );
                                break;
                            }
                        }
                    }
                    // we hold a sender clone, so the channel cannot close
                    None => break,
                },
                _ = flush_timer.tick() => {
                    if let Err(e) = self.writer.flush(&mut self.state, session_key, false) {
                        log::error!("Flush failed, will retry next tick: {}", e);
                    }
                }
                _ = discovery_timer.tick() => {
                    match self.discovery.discover().await {
                        Some(s) if s.session_key == session_key && s.is_complete => {
                            log::info!("Session {} archive complete", session_key);
                            archive_complete = true;
                            break;
                        }
                        Some(s) if s.session_key != session_key => {
                            log::info!(
                                "Discovery now advertises session {}, finalizing {}",
                                s.session_key, session_key
                            );
                            break;
                        }
                        _ => {}
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = deadline_sleep(deadline) => {
                    log::info!("Weekend window closed, finalizing session {}", session_key);
                    break;
                }
            }
        }

        if let Some(h) = handle.take() {
            h.stop().await;
        }
        self.absorb_pending(&mut rx);
        archive_complete
    }

    /// Apply whatever is still buffered after the reader task stopped
    fn absorb_pending(&mut self, rx: &mut mpsc::Receiver<FeedEvent>) {
        while let Ok(event) = rx.try_recv() {
            if let FeedEvent::Message { topic, payload } = event {
                self.state.apply(&topic, &payload);
            }
        }
    }

    async fn connect_with_backoff(
        &self,
        tx: &mpsc::Sender<FeedEvent>,
        backoff: &mut ExponentialBackoff,
    ) -> Option<FeedHandle> {
        loop {
            match self.connector.open(tx.clone()).await {
                Ok(handle) => return Some(handle),
                Err(e) => {
                    log::warn!("Feed connect failed: {}", e);
                    if backoff.sleep().await.is_err() {
                        log::error!("Reconnect attempts exhausted, finalizing session");
                        return None;
                    }
                }
            }
        }
    }

    /// Grace sleep, forced final flush, state reset
    ///
    /// The archival ingest fires only when discovery confirmed the session
    /// complete. An aborted live phase still flushes whatever arrived.
    async fn drain(&mut self, session: &DiscoveredSession, archive_complete: bool) {
        tokio::time::sleep(Duration::from_millis(self.config.session_end_grace_ms)).await;

        if let Err(e) = self.writer.flush(&mut self.state, session.session_key, true) {
            log::error!("Final flush for session {} failed: {}", session.session_key, e);
        }

        if archive_complete {
            let command = self.config.ingest_command.clone();
            let year = session.year().unwrap_or_else(|| Utc::now().year());
            let timeout = Duration::from_secs(self.config.ingest_timeout_secs);
            tokio::spawn(async move {
                run_post_session_ingest(&command, year, timeout).await;
            });
        }

        self.state = AccumulatedState::new();
        self.writer.reset_for_new_session();
    }
}

async fn deadline_sleep(deadline: Option<DateTime<Utc>>) {
    match deadline {
        Some(d) => {
            let wait = (d - Utc::now()).to_std().unwrap_or(Duration::ZERO);
            tokio::time::sleep(wait).await;
        }
        None => std::future::pending::<()>().await,
    }
}
