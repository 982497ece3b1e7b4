//! # pulse_tick
//!
//! The leaf crate of the pulse workspace — defines what a tickable is, how
//! it is referenced without being owned, and the deferred-mutation updater
//! that drives a set of tickables once per external trigger.
//!
//! This crate provides:
//!
//! - [`Tickable`] trait — the contract all manually driven objects satisfy.
//! - [`TickHandle`] — non-owning, liveness-checked tickable references.
//! - [`GroupId`] / [`UpdateGroup`] — opaque update-group identity.
//! - [`Updater`] — single-instance updater with double-buffered add/remove.

pub mod group;
pub mod handle;
pub mod updater;

pub use group::{GroupId, UpdateGroup};
pub use handle::{TickHandle, Tickable};
pub use updater::Updater;
