//! The ephemeral-process side of the job protocol.
//!
//! A [`ViewController`] is created every time the interface opens. It never
//! assumes it saw any earlier event: it reconciles against whatever job,
//! history, and draft records survived in the store, then tracks changes as
//! they arrive. Rendering the resulting [`ViewState`] is the host's job.

pub mod controller;
pub mod draft;
pub mod models;
pub mod progress;

pub use controller::{ViewController, ViewPhase, ViewState, STALE_JOB_ERROR};
pub use draft::DraftManager;
pub use models::{group_models, provider_label, ModelGroup};
