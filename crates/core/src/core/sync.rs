//! The sync loop: one immediate read, then back-to-back long-polls.
//!
//! ```text
//!   start ──► AwaitingResponse ──(1xx/2xx/3xx)──► Idle ──► AwaitingResponse ...
//!                    │
//!                    └──(≥400 | transport error | cancel)──► Stopped
//! ```
//!
//! Only a 200 carries a frame. The plugin answers a superseded long-poll with
//! 204, which just re-arms. Reads are strictly sequential: the next one is only
//! issued after the previous reply has been handled.
//!
//! Clicks go through [`Notifier`], which shares the transport but not the loop,
//! so a click can be posted while a long-poll is outstanding.

use std::fmt;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{ShapePolicy, SyncConfig};
use crate::error::Result;
use crate::grid::{ClickEvent, Group, GridState};
use crate::layout::GridSink;
use crate::transport::GridTransport;

/// Statuses that keep the loop alive. Everything else (including the
/// non-HTTP `0` some runtimes report for aborted requests) stops it.
pub fn is_continuable(status: u16) -> bool {
    (100..400).contains(&status)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    Cancelled,
    Status(u16),
    Transport(String),
    Malformed(String),
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Cancelled => write!(f, "cancelled"),
            StopReason::Status(s) => write!(f, "HTTP {s}"),
            StopReason::Transport(e) => write!(f, "transport error: {e}"),
            StopReason::Malformed(e) => write!(f, "malformed frame: {e}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncState {
    AwaitingResponse,
    Idle,
    Stopped(StopReason),
}

impl SyncState {
    pub fn label(&self) -> &'static str {
        match self {
            SyncState::AwaitingResponse => "waiting",
            SyncState::Idle => "idle",
            SyncState::Stopped(_) => "stopped",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A frame was painted.
    Applied,
    /// Nothing painted (no-content reply, redirect, skipped frame).
    Rearm,
    Stop(StopReason),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub polls: u64,
    pub frames_applied: u64,
    pub frames_skipped: u64,
}

/// Page-level sync context. Owns the transport, the config and the last frame.
pub struct SyncLoop<T> {
    transport: T,
    config: SyncConfig,
    snapshot: Option<GridState>,
    stats: SyncStats,
    state: watch::Sender<SyncState>,
}

impl<T: GridTransport> SyncLoop<T> {
    pub fn new(transport: T, config: SyncConfig) -> Self {
        let (state, _) = watch::channel(SyncState::Idle);
        Self {
            transport,
            config,
            snapshot: None,
            stats: SyncStats::default(),
            state,
        }
    }

    /// Last frame received, if any.
    pub fn snapshot(&self) -> Option<&GridState> {
        self.snapshot.as_ref()
    }

    pub fn stats(&self) -> SyncStats {
        self.stats
    }

    pub fn state(&self) -> SyncState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }

    pub fn notifier(&self) -> Notifier<T>
    where
        T: Clone,
    {
        Notifier {
            transport: self.transport.clone(),
            url: self.config.click_url(),
            content_type: self.config.click_content_type.clone(),
        }
    }

    /// One read. `immediate` selects the snapshot endpoint over the long-poll.
    pub async fn refresh<S: GridSink + ?Sized>(
        &mut self,
        immediate: bool,
        sink: &mut S,
    ) -> RefreshOutcome {
        let url = self.config.read_url(immediate);
        self.state.send_replace(SyncState::AwaitingResponse);
        self.stats.polls += 1;
        debug!("GET {}", url);

        let reply = match self.transport.get(&url).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!("GET {} failed: {}", url, e);
                return self.stop(StopReason::Transport(e.to_string()));
            }
        };

        if !is_continuable(reply.status) {
            warn!("GET {} returned {}", url, reply.status);
            return self.stop(StopReason::Status(reply.status));
        }

        if reply.status != 200 {
            debug!("GET {} returned {}; no frame", url, reply.status);
            self.state.send_replace(SyncState::Idle);
            return RefreshOutcome::Rearm;
        }

        match GridState::from_json(&reply.body) {
            Ok(frame) => {
                sink.apply(&frame);
                self.snapshot = Some(frame);
                self.stats.frames_applied += 1;
                self.state.send_replace(SyncState::Idle);
                RefreshOutcome::Applied
            }
            Err(e) => match self.config.shape_policy {
                ShapePolicy::Skip => {
                    warn!("Skipping frame from {}: {}", url, e);
                    self.stats.frames_skipped += 1;
                    self.state.send_replace(SyncState::Idle);
                    RefreshOutcome::Rearm
                }
                ShapePolicy::Stop => {
                    warn!("Bad frame from {}: {}", url, e);
                    self.stop(StopReason::Malformed(e.to_string()))
                }
            },
        }
    }

    /// Immediate read, then long-poll until a failure or `cancel` fires.
    ///
    /// Cancelling drops the outstanding request.
    pub async fn run<S: GridSink + ?Sized>(
        &mut self,
        sink: &mut S,
        cancel: &CancellationToken,
    ) -> StopReason {
        info!("Grid sync started ({})", self.config.read_url(true));
        let mut immediate = true;

        let reason = loop {
            if cancel.is_cancelled() {
                break StopReason::Cancelled;
            }
            match cancel
                .run_until_cancelled(self.refresh(immediate, &mut *sink))
                .await
            {
                None => break StopReason::Cancelled,
                Some(RefreshOutcome::Stop(reason)) => break reason,
                Some(RefreshOutcome::Applied | RefreshOutcome::Rearm) => immediate = false,
            }
        };

        self.state.send_replace(SyncState::Stopped(reason.clone()));
        info!(
            "Grid sync stopped: {} ({} polls, {} frames)",
            reason, self.stats.polls, self.stats.frames_applied
        );
        reason
    }

    fn stop(&mut self, reason: StopReason) -> RefreshOutcome {
        self.state.send_replace(SyncState::Stopped(reason.clone()));
        RefreshOutcome::Stop(reason)
    }
}

/// Posts clicks. Fire-and-forget: the reply body is never read and nothing is
/// retried.
#[derive(Clone)]
pub struct Notifier<T> {
    transport: T,
    url: String,
    content_type: String,
}

impl<T: GridTransport> Notifier<T> {
    pub fn new(transport: T, config: &SyncConfig) -> Self {
        Self {
            transport,
            url: config.click_url(),
            content_type: config.click_content_type.clone(),
        }
    }

    pub async fn notify(&self, group: Group, x: u32, y: u32) -> Result<()> {
        self.notify_click(ClickEvent::new(group, x, y)?).await
    }

    pub async fn notify_click(&self, click: ClickEvent) -> Result<()> {
        info!("Clicked group {} @ {},{}", u8::from(click.group), click.x, click.y);
        let body = click.to_body()?;
        let res = self
            .transport
            .post(&self.url, &self.content_type, body)
            .await;
        if let Err(e) = &res {
            warn!("POST {} failed: {}", self.url, e);
        }
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::grid::palette_colour;
    use crate::layout::GridView;
    use crate::transport::HttpReply;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Sent {
        Get(String),
        Post {
            url: String,
            content_type: String,
            body: String,
        },
    }

    /// Replays canned replies. Once the script runs dry the next read cancels
    /// `cancel_when_dry` (if set) and then never completes, like a long-poll
    /// the server is sitting on.
    #[derive(Default)]
    struct ScriptedTransport {
        replies: RefCell<VecDeque<Result<HttpReply>>>,
        sent: RefCell<Vec<Sent>>,
        cancel_when_dry: Option<CancellationToken>,
    }

    impl ScriptedTransport {
        fn new(replies: Vec<Result<HttpReply>>) -> Self {
            Self {
                replies: RefCell::new(replies.into()),
                ..Default::default()
            }
        }

        fn cancelling(mut self, token: &CancellationToken) -> Self {
            self.cancel_when_dry = Some(token.clone());
            self
        }

        fn gets(&self) -> Vec<String> {
            self.sent
                .borrow()
                .iter()
                .filter_map(|s| match s {
                    Sent::Get(url) => Some(url.clone()),
                    Sent::Post { .. } => None,
                })
                .collect()
        }

        /// Posted clicks, decoded the way the plugin reads them.
        fn clicks(&self) -> Vec<ClickEvent> {
            self.sent
                .borrow()
                .iter()
                .filter_map(|s| match s {
                    Sent::Post { body, .. } => Some(ClickEvent::from_body(body).unwrap()),
                    Sent::Get(_) => None,
                })
                .collect()
        }
    }

    impl GridTransport for ScriptedTransport {
        async fn get(&self, url: &str) -> Result<HttpReply> {
            self.sent.borrow_mut().push(Sent::Get(url.to_string()));
            let next = self.replies.borrow_mut().pop_front();
            match next {
                Some(reply) => reply,
                None => {
                    if let Some(token) = &self.cancel_when_dry {
                        token.cancel();
                    }
                    std::future::pending().await
                }
            }
        }

        async fn post(&self, url: &str, content_type: &str, body: String) -> Result<()> {
            self.sent.borrow_mut().push(Sent::Post {
                url: url.to_string(),
                content_type: content_type.to_string(),
                body,
            });
            Ok(())
        }
    }

    fn frame(colour: &str) -> HttpReply {
        HttpReply::new(200, GridState::filled(colour).to_json().unwrap())
    }

    #[tokio::test]
    async fn initial_load_paints_then_long_polls() {
        let cancel = CancellationToken::new();
        let transport =
            ScriptedTransport::new(vec![Ok(frame(&palette_colour(1.0, 1.0)))]).cancelling(&cancel);
        let mut sync = SyncLoop::new(&transport, SyncConfig::default());
        let mut view = GridView::new();

        let reason = sync.run(&mut view, &cancel).await;

        assert_eq!(reason, StopReason::Cancelled);
        assert_eq!(transport.gets(), ["/update", "/event"]);
        for y in 0..8 {
            for x in 0..8 {
                assert_eq!(view.background(x, y), Some("#F00"));
            }
        }
        assert_eq!(sync.snapshot(), Some(&GridState::filled("#F00")));
        assert_eq!(sync.state(), SyncState::Stopped(StopReason::Cancelled));
    }

    #[tokio::test]
    async fn continuable_statuses_rearm_exactly_once_each() {
        let transport = ScriptedTransport::new(vec![
            Ok(frame(&palette_colour(0.0, 1.0))),
            Ok(HttpReply::new(204, "")),
            Ok(HttpReply::new(302, "")),
            Ok(HttpReply::new(100, "")),
            Ok(frame(&palette_colour(1.0, 1.0))),
            Ok(HttpReply::new(404, "not found")),
        ]);
        let mut sync = SyncLoop::new(&transport, SyncConfig::default());
        let mut view = GridView::new();

        let reason = sync.run(&mut view, &CancellationToken::new()).await;

        assert_eq!(reason, StopReason::Status(404));
        assert_eq!(
            transport.gets(),
            ["/update", "/event", "/event", "/event", "/event", "/event"]
        );
        assert_eq!(view.background(3, 3), Some("#F00"));
        assert_eq!(view.frames(), 2);
        assert_eq!(
            sync.stats(),
            SyncStats {
                polls: 6,
                frames_applied: 2,
                frames_skipped: 0,
            }
        );
    }

    #[tokio::test]
    async fn failure_status_stops_without_another_read() {
        let transport = ScriptedTransport::new(vec![
            Ok(HttpReply::new(500, "")),
            Ok(frame(&palette_colour(1.0, 1.0))),
        ]);
        let mut sync = SyncLoop::new(&transport, SyncConfig::default());
        let mut view = GridView::new();
        let states = sync.subscribe();

        let reason = sync.run(&mut view, &CancellationToken::new()).await;

        assert_eq!(reason, StopReason::Status(500));
        assert_eq!(transport.gets(), ["/update"]);
        assert_eq!(view.frames(), 0);
        assert_eq!(
            *states.borrow(),
            SyncState::Stopped(StopReason::Status(500))
        );
    }

    #[tokio::test]
    async fn transport_error_stops_the_loop() {
        let transport = ScriptedTransport::new(vec![
            Ok(frame(&palette_colour(1.0, 1.0))),
            Err(Error::Transport("connection refused".into())),
        ]);
        let mut sync = SyncLoop::new(&transport, SyncConfig::default());
        let mut view = GridView::new();

        let reason = sync.run(&mut view, &CancellationToken::new()).await;

        assert!(matches!(reason, StopReason::Transport(ref e) if e.contains("connection refused")));
        assert_eq!(transport.gets(), ["/update", "/event"]);
        assert_eq!(view.frames(), 1);
    }

    #[tokio::test]
    async fn malformed_frame_is_skipped_by_default() {
        let transport = ScriptedTransport::new(vec![
            Ok(frame(&palette_colour(0.0, 1.0))),
            Ok(HttpReply::new(200, r##"[["#F00"]]"##)),
            Ok(HttpReply::new(200, "ok")),
            Ok(HttpReply::new(503, "")),
        ]);
        let mut sync = SyncLoop::new(&transport, SyncConfig::default());
        let mut view = GridView::new();

        let reason = sync.run(&mut view, &CancellationToken::new()).await;

        assert_eq!(reason, StopReason::Status(503));
        assert_eq!(view.background(0, 0), Some("#0F0"));
        assert_eq!(view.frames(), 1);
        assert_eq!(sync.stats().frames_skipped, 2);
    }

    #[tokio::test]
    async fn malformed_frame_stops_under_stop_policy() {
        let transport = ScriptedTransport::new(vec![
            Ok(HttpReply::new(200, "[]")),
            Ok(frame(&palette_colour(1.0, 1.0))),
        ]);
        let cfg = SyncConfig {
            shape_policy: ShapePolicy::Stop,
            ..SyncConfig::default()
        };
        let mut sync = SyncLoop::new(&transport, cfg);
        let mut view = GridView::new();

        let reason = sync.run(&mut view, &CancellationToken::new()).await;

        assert!(matches!(reason, StopReason::Malformed(_)));
        assert_eq!(transport.gets(), ["/update"]);
        assert_eq!(view.frames(), 0);
    }

    #[tokio::test]
    async fn single_refresh_selects_endpoint() {
        let transport = ScriptedTransport::new(vec![
            Ok(HttpReply::new(204, "")),
            Ok(frame(&palette_colour(0.5, 1.0))),
        ]);
        let cfg = SyncConfig {
            base_url: "http://plugin:12345".to_string(),
            ..SyncConfig::default()
        };
        let mut sync = SyncLoop::new(&transport, cfg);
        let mut view = GridView::new();

        assert_eq!(sync.refresh(false, &mut view).await, RefreshOutcome::Rearm);
        assert_eq!(sync.state(), SyncState::Idle);
        assert_eq!(sync.refresh(true, &mut view).await, RefreshOutcome::Applied);
        assert_eq!(
            transport.gets(),
            ["http://plugin:12345/event", "http://plugin:12345/update"]
        );
        assert_eq!(view.background(7, 7), Some("#FF0"));
    }

    #[tokio::test]
    async fn pre_cancelled_token_issues_no_reads() {
        let transport = ScriptedTransport::new(vec![Ok(frame(&palette_colour(1.0, 1.0)))]);
        let mut sync = SyncLoop::new(&transport, SyncConfig::default());
        let mut view = GridView::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert_eq!(sync.run(&mut view, &cancel).await, StopReason::Cancelled);
        assert!(transport.gets().is_empty());
    }

    #[tokio::test]
    async fn grid_click_posts_exactly_once() {
        let transport = Rc::new(ScriptedTransport::default());
        let sync = SyncLoop::new(Rc::clone(&transport), SyncConfig::default());
        let notifier = sync.notifier();

        notifier.notify(Group::Grid, 2, 5).await.unwrap();

        assert_eq!(
            *transport.sent.borrow(),
            [Sent::Post {
                url: "/update".to_string(),
                content_type: "application/json".to_string(),
                body: r#"{"selector":"click","group":0,"x":2,"y":5}"#.to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn top_and_side_clicks_carry_their_group() {
        let transport = ScriptedTransport::default();
        let cfg = SyncConfig {
            click_content_type: "application/javascript".to_string(),
            ..SyncConfig::default()
        };
        let notifier = Notifier::new(&transport, &cfg);

        notifier.notify_click(ClickEvent::top(3).unwrap()).await.unwrap();
        notifier.notify_click(ClickEvent::side(6).unwrap()).await.unwrap();

        let bodies: Vec<_> = transport
            .sent
            .borrow()
            .iter()
            .map(|s| match s {
                Sent::Post {
                    url,
                    content_type,
                    body,
                } => {
                    assert_eq!(url, "/update");
                    assert_eq!(content_type, "application/javascript");
                    body.clone()
                }
                Sent::Get(_) => panic!("unexpected read"),
            })
            .collect();
        assert_eq!(
            bodies,
            [
                r#"{"selector":"click","group":1,"x":3,"y":0}"#,
                r#"{"selector":"click","group":2,"x":0,"y":6}"#,
            ]
        );
        assert_eq!(
            transport.clicks(),
            [ClickEvent::top(3).unwrap(), ClickEvent::side(6).unwrap()]
        );
    }

    #[tokio::test]
    async fn click_posts_while_long_poll_is_outstanding() {
        let transport = ScriptedTransport::new(vec![Ok(frame(&palette_colour(0.0, 1.0)))]);
        let mut sync = SyncLoop::new(&transport, SyncConfig::default());
        let notifier = Notifier::new(&transport, &SyncConfig::default());
        let states = sync.subscribe();
        let mut view = GridView::new();
        let cancel = CancellationToken::new();

        let clicking = async {
            // Wait until the loop is parked on the long-poll.
            while transport.gets().len() < 2 {
                tokio::task::yield_now().await;
            }
            assert_eq!(*states.borrow(), SyncState::AwaitingResponse);

            notifier.notify(Group::Grid, 4, 1).await.unwrap();

            assert_eq!(*states.borrow(), SyncState::AwaitingResponse);
            cancel.cancel();
        };

        let (reason, ()) = tokio::join!(sync.run(&mut view, &cancel), clicking);

        assert_eq!(reason, StopReason::Cancelled);
        assert_eq!(
            *transport.sent.borrow(),
            [
                Sent::Get("/update".to_string()),
                Sent::Get("/event".to_string()),
                Sent::Post {
                    url: "/update".to_string(),
                    content_type: "application/json".to_string(),
                    body: r#"{"selector":"click","group":0,"x":4,"y":1}"#.to_string(),
                },
            ]
        );
        assert_eq!(transport.clicks(), [ClickEvent::grid(4, 1).unwrap()]);
        assert_eq!(view.background(4, 1), Some("#0F0"));
        assert_eq!(view.frames(), 1);
    }

    #[tokio::test]
    async fn out_of_range_click_is_not_sent() {
        let transport = ScriptedTransport::default();
        let notifier = Notifier::new(&transport, &SyncConfig::default());

        let err = notifier.notify(Group::Top, 8, 0).await.unwrap_err();
        assert!(matches!(err, Error::Coordinate { .. }));
        assert!(transport.sent.borrow().is_empty());
    }

    #[test]
    fn continuable_range_is_100_to_399() {
        assert!(!is_continuable(0));
        assert!(!is_continuable(99));
        assert!(is_continuable(100));
        assert!(is_continuable(200));
        assert!(is_continuable(399));
        assert!(!is_continuable(400));
        assert!(!is_continuable(500));
    }
}
