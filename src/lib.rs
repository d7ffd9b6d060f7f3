// -- Lint policy ---------------------------------------------------------
// This is the single source of truth for crate-wide lints.

// Broad lint groups
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::nursery)]
// Documentation
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::bare_urls)]
// No panicking in library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
// No debug/print artifacts
#![deny(clippy::dbg_macro)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
// Import hygiene
#![deny(clippy::wildcard_imports)]
// Complexity limits
#![deny(clippy::cognitive_complexity)]
#![deny(clippy::excessive_nesting)]
// Function signature hygiene
#![deny(clippy::fn_params_excessive_bools)]
// Clone / pass-by-value hygiene
#![deny(clippy::needless_pass_by_value)]
#![deny(clippy::implicit_clone)]
// String hygiene
#![deny(clippy::inefficient_to_string)]
#![deny(clippy::redundant_closure_for_method_calls)]
#![deny(clippy::manual_string_new)]
#![deny(clippy::str_to_string)]
// Cargo lints (warn, not deny since cargo lints can be noisy)
#![warn(clippy::cargo)]
// Unused / redundant code
#![deny(unused_results)]
#![deny(unused_qualifications)]
// Cast hygiene
#![deny(trivial_casts)]
#![deny(trivial_numeric_casts)]
// Tests may unwrap
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

//! Interactive 3D scene viewer built on wgpu.
//!
//! orbview frames a scene's bounding volume, lets the user orbit, pan and
//! zoom with a damped camera, and renders through a reconfigurable chain of
//! post effects (SSAO, bloom, FXAA) that can be switched off as a block.
//!
//! # Key entry points
//!
//! - [`session::ViewerSession`] - camera, controller, input, renderer and
//!   frame loop for one viewport
//! - [`pipeline::RenderPipeline`] - the ordered base + post-effect chain
//! - [`camera::frame_volume`] - fit-to-volume camera placement
//! - [`options::Options`] - runtime configuration with TOML presets
//!
//! # Architecture
//!
//! A [`scheduler::FrameScheduler`] receives display-refresh callbacks from
//! a [`scheduler::FrameSource`]. Each tick advances the orbit controller's
//! damping and renders only when the view changed. Rendering goes through a
//! [`session::FrameRenderer`]; the wgpu one is [`renderer::GpuRenderer`].

pub mod camera;
pub mod demo;
pub mod error;
pub mod gpu;
pub mod input;
pub mod options;
pub mod pipeline;
pub mod renderer;
pub mod scheduler;
pub mod session;
pub mod util;
#[cfg(feature = "viewer")]
pub mod viewer;

pub use error::ViewerError;
