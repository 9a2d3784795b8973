//! Camera-driven gesture games streamed to the browser.
//!
//! One capture thread republishes the newest camera frame into a
//! [`pipeline::LatestFrameChannel`] per game; every viewer of a game runs its
//! own processing loop over that channel (see [`games::run_stream`]).

pub mod config;
pub mod games;
pub mod gesture;
#[cfg(feature = "landmarks-ort")]
pub mod model_download;
pub mod pipeline;
pub mod recognizer;
pub mod robot;
pub mod stroke;
pub mod types;
pub mod web;
