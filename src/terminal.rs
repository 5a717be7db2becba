//! The boundary to the native terminal control library.
//!
//! The pump does not read bytes; it consumes primitives the native
//! library has already decoded — literal character codes, functional
//! key codes, and mouse records.  Everything the pump needs from that
//! library is captured by the [`Driver`] trait, so the concrete binding
//! (curses, a console API, an in-process test double) stays out of this
//! crate.

use crate::error::Result;
use crate::input::{ButtonState, Modifiers, MouseButton};
#[cfg(unix)]
use signal_hook::SigId;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

/// Raw function-key codes shared between drivers and the pump's
/// classifier.  The values follow the curses `KEY_*` code space.
pub mod keycode {
    pub const DOWN: i32 = 0o402;
    pub const UP: i32 = 0o403;
    pub const LEFT: i32 = 0o404;
    pub const RIGHT: i32 = 0o405;
    pub const HOME: i32 = 0o406;
    pub const BACKSPACE: i32 = 0o407;
    /// Function keys are encoded as offsets from this base.
    pub const F0: i32 = 0o410;
    pub const DELETE: i32 = 0o512;
    pub const INSERT: i32 = 0o513;
    pub const PAGE_DOWN: i32 = 0o522;
    pub const PAGE_UP: i32 = 0o523;
    pub const ENTER: i32 = 0o527;
    pub const END: i32 = 0o550;
    /// Sentinel: a mouse record is ready to be decoded.
    pub const MOUSE: i32 = 0o631;
    /// Sentinel: the terminal changed size.
    pub const RESIZE: i32 = 0o632;
}

/// One primitive returned by the driver's bounded-timeout read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawInput {
    /// A literal character.
    Char(char),
    /// The native library's "functional key" indication plus its raw
    /// key code (see [`keycode`]).
    Function(i32),
    /// The read timed out with nothing to report.
    TimedOut,
}

/// A decoded mouse record, as split out by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseRecord {
    Move {
        x: u16,
        y: u16,
    },
    Action {
        x: u16,
        y: u16,
        button: MouseButton,
        state: ButtonState,
        modifiers: Modifiers,
    },
}

/// The terminal dimensions in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenSize {
    pub cols: usize,
    pub rows: usize,
}

/// The operations the pump requires from the native terminal control
/// library.
///
/// All methods take `&mut self`: the pump owns its driver and invokes
/// it only from its own thread of control.
pub trait Driver {
    /// Blocking read of the next primitive, bounded by `timeout`.
    ///
    /// Errors are protocol failures and are fatal to the current listen
    /// session; a quiet terminal is `Ok(RawInput::TimedOut)`.
    fn read_input(&mut self, timeout: Duration) -> Result<RawInput>;

    /// Decode the mouse record behind a [`keycode::MOUSE`] read into
    /// button/state/position primitives.
    fn decode_mouse(&mut self) -> Result<MouseRecord>;

    /// Optional human-readable name for a raw function-key code, used
    /// only for diagnostics.
    fn key_name(&self, code: i32) -> Option<String>;

    /// The current terminal dimensions.
    fn screen_size(&mut self) -> Result<ScreenSize>;

    /// Register `flag` to be set when a resize notification arrives
    /// out of band.  The notification path only ever sets the flag;
    /// the pump is the one that clears it.  Dropping the returned guard
    /// disposes of the subscription.
    fn watch_resize(&mut self, flag: Arc<AtomicBool>) -> Result<ResizeGuard>;

    /// Notice delivered once before a resize is applied, so the owning
    /// surface can prepare.
    fn begin_resize(&mut self) {}

    /// Invalidate and redraw the owning surface; called synchronously
    /// after a resize event has been yielded.
    fn refresh(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Disposable pending-resize subscription.  Unregisters any underlying
/// signal hook when dropped.
pub struct ResizeGuard {
    #[cfg(unix)]
    signal: Option<SigId>,
}

impl ResizeGuard {
    /// A guard with nothing to unregister, for drivers that own the
    /// notification path themselves (test doubles, in-process shims).
    pub fn detached() -> Self {
        Self {
            #[cfg(unix)]
            signal: None,
        }
    }
}

#[cfg(unix)]
impl Drop for ResizeGuard {
    fn drop(&mut self) {
        if let Some(id) = self.signal.take() {
            signal_hook::low_level::unregister(id);
        }
    }
}

/// Arrange for `flag` to be set on every SIGWINCH delivery.
///
/// Unix drivers can delegate their `watch_resize` implementation here;
/// the registration is torn down when the returned guard drops.
#[cfg(unix)]
pub fn watch_sigwinch(flag: Arc<AtomicBool>) -> Result<ResizeGuard> {
    let id = signal_hook::flag::register(signal_hook::consts::SIGWINCH, flag)?;
    Ok(ResizeGuard { signal: Some(id) })
}
