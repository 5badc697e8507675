//! The grid controller page: an 8×8 button grid with a numbered top row and
//! side column, kept in step with the plugin by long-polling `/event` and
//! reporting presses as `POST /update`.
//!
//! Host builds only get [`placeholder`]; the page itself needs the `web`
//! feature on `wasm32`.

/// Keeps the library non-empty on host builds.
#[cfg(not(all(feature = "web", target_arch = "wasm32")))]
pub fn placeholder() {}

#[cfg(all(feature = "web", target_arch = "wasm32"))]
mod web;

#[cfg(all(feature = "web", target_arch = "wasm32"))]
pub use web::start;
