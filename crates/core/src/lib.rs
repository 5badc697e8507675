//! # dirg
//!
//! Client side of the dirg grid controller: an 8×8 pad grid plus a top row and
//! a side column of buttons, kept in step with the plugin's embedded web server
//! by long-polling.
//!
//! ## Quick Start
//!
//! ```no_run
//! use dirg::prelude::*;
//!
//! # async fn page<T: GridTransport + Clone>(transport: T) {
//! let layout = GridLayout::build();
//! let mut view = GridView::new();
//!
//! let mut sync = SyncLoop::new(transport, SyncConfig::default());
//! let notifier = sync.notifier();
//! let cancel = CancellationToken::new();
//!
//! // A click on a top-row button:
//! let click = layout.click_at(Group::Top, 3, 0).unwrap();
//! let _ = notifier.notify_click(click).await;
//!
//! // Runs until an HTTP failure or `cancel.cancel()`.
//! let reason = sync.run(&mut view, &cancel).await;
//! # let _ = reason;
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`grid`]: grid state, cell groups, click wire format
//! - [`layout`]: the three button tables and the painted colour model
//! - [`sync`]: long-poll loop and click notifier
//! - [`transport`]: the HTTP seam implemented by the browser crate
//! - [`config`]: endpoint paths and frame policy

#[path = "core/error.rs"]
pub mod error;

#[path = "core/grid.rs"]
pub mod grid;

#[path = "core/layout.rs"]
pub mod layout;

#[path = "core/config.rs"]
pub mod config;

#[path = "core/transport.rs"]
pub mod transport;

#[path = "core/sync.rs"]
pub mod sync;

pub use error::{Error, Result};

/// Prelude module for convenient imports.
///
/// ```
/// use dirg::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{ShapePolicy, SyncConfig};
    pub use crate::error::{Error, Result};
    pub use crate::grid::{palette_colour, ClickEvent, GridState, Group, GRID_H, GRID_W};
    pub use crate::layout::{CellSpec, GridLayout, GridSink, GridView, TableSpec};
    pub use crate::sync::{
        is_continuable, Notifier, RefreshOutcome, StopReason, SyncLoop, SyncState, SyncStats,
    };
    pub use crate::transport::{GridTransport, HttpReply};
    pub use tokio_util::sync::CancellationToken;
}
