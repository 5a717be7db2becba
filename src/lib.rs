//! # termpump
//!
//! Terminal input arrives as a raw, ambiguous stream of primitives:
//! escape sequences for modified keys trickle in one code at a time,
//! and mouse reports coalesce press+release pairs into "click" records.
//! This crate turns that stream into discrete, semantically typed input
//! events.
//!
//! Included functionality:
//!
//! * An [`input::Event`] model covering key presses with modifiers,
//!   mouse moves and button transitions, terminal resizes, and
//!   cross-thread delegated work.
//! * A chain of [`resolver::KeyResolver`]s that disambiguates buffered
//!   multi-code key sequences, with distinct speculative and forced
//!   resolution modes so that a partial escape sequence is neither
//!   resolved prematurely nor buffered forever.
//! * A [`mouse::MouseResolver`] that normalizes raw mouse records into
//!   an ordered move/press/release stream, expanding clicks and
//!   suppressing duplicate moves and spurious releases.
//! * An [`pump::EventPump`] that drives a bounded-timeout read loop
//!   against a native [`terminal::Driver`], merges in resize
//!   notifications and delegated work, and exposes the result as a
//!   single cancelable stream of events.
//!
//! The binding to the native terminal control library itself (raw mode,
//! rendering, terminfo) is out of scope; implement [`terminal::Driver`]
//! over whichever library decodes your key codes and mouse records.

pub mod error;
pub mod input;
pub mod mouse;
pub mod pump;
pub mod resolver;
pub mod terminal;

pub use error::{Error, Result};
pub use input::Event;
pub use pump::{CancelToken, Delegator, EventPump, Listen, PumpTuning};
