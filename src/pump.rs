//! The event pump: drives a blocking, cancelable read loop against the
//! native driver and yields a fully resolved [`Event`] stream.
//!
//! One pump instance owns one driver, one resolver chain and one mouse
//! state machine.  Every call to [`EventPump::listen`] opens an
//! independent session with a fresh escape buffer and a fresh resize
//! registration, while the resolver chain and the mouse resolver's
//! click/position history persist across sessions.
//!
//! The loop body is single-threaded; the only things touched from the
//! outside are the delegate queue (a thread-safe MPSC channel) and the
//! pending-resize flag (set by the notification path, cleared here).

use crate::error::Result;
use crate::input::{Delegated, Event, Key, KeyEvent, Modifiers};
use crate::mouse::MouseResolver;
use crate::resolver::{self, KeyResolver};
use crate::terminal::{keycode, Driver, RawInput, ResizeGuard};
use crossbeam::channel::{unbounded, Receiver, Sender, TryRecvError};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Poll timeouts used by the read loop.
///
/// The escape timeout keeps sequence assembly responsive: once a prefix
/// is buffered, a short poll lets a lone escape resolve quickly.  The
/// idle timeout bounds the latency of cancellation and delegated work
/// when the keyboard is quiet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PumpTuning {
    /// Read timeout while the escape buffer holds an unresolved prefix.
    pub escape_timeout: Duration,
    /// Read timeout while the loop is idle.
    pub idle_timeout: Duration,
}

impl Default for PumpTuning {
    fn default() -> Self {
        Self {
            escape_timeout: Duration::from_millis(10),
            idle_timeout: Duration::from_millis(50),
        }
    }
}

/// Cooperative cancellation flag.
///
/// Observed once per loop iteration, never mid-read and never
/// mid-resolution, so shutdown latency is bounded by the current read
/// timeout rather than being instantaneous.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Cloneable handle for enqueueing work onto the pump's thread of
/// control from any thread.
#[derive(Clone)]
pub struct Delegator {
    tx: Sender<Delegated>,
}

impl Delegator {
    /// Enqueue a payload.  The pump drains the queue ahead of its next
    /// blocking read, so delivery latency is bounded by one read
    /// timeout even under continuous keyboard input.
    pub fn delegate(&self, payload: Delegated) {
        // a send failure just means the pump is gone and the payload
        // has nowhere to land
        self.tx.send(payload).ok();
    }
}

pub struct EventPump<D: Driver> {
    driver: D,
    resolvers: Vec<Arc<dyn KeyResolver>>,
    mouse: MouseResolver,
    tuning: PumpTuning,
    delegate_tx: Sender<Delegated>,
    delegate_rx: Receiver<Delegated>,
}

impl<D: Driver> EventPump<D> {
    /// A pump with the canonical resolver chain and default timeouts.
    pub fn new(driver: D) -> Self {
        Self::with_tuning(driver, PumpTuning::default())
    }

    pub fn with_tuning(driver: D, tuning: PumpTuning) -> Self {
        let (delegate_tx, delegate_rx) = unbounded();
        let mut pump = Self {
            driver,
            resolvers: Vec::new(),
            mouse: MouseResolver::new(),
            tuning,
            delegate_tx,
            delegate_rx,
        };
        pump.use_resolver(Arc::new(resolver::special_chars));
        pump.use_resolver(Arc::new(resolver::control_keys));
        pump.use_resolver(Arc::new(resolver::alt_keys));
        pump.use_resolver(Arc::new(resolver::keypad_modifiers));
        pump
    }

    /// Append `resolver` to the chain unless this exact instance is
    /// already registered.  Identity is the `Arc` allocation, so
    /// registering a clone of an existing handle is a no-op.
    pub fn use_resolver(&mut self, resolver: Arc<dyn KeyResolver>) {
        if !self.uses_resolver(&resolver) {
            self.resolvers.push(resolver);
        }
    }

    /// Whether this exact resolver instance is registered.
    pub fn uses_resolver(&self, resolver: &Arc<dyn KeyResolver>) -> bool {
        self.resolvers.iter().any(|r| Arc::ptr_eq(r, resolver))
    }

    /// A handle other threads can use to marshal work onto this pump.
    pub fn delegator(&self) -> Delegator {
        Delegator {
            tx: self.delegate_tx.clone(),
        }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Open a listen session: a lazy, cancelable stream of events.
    ///
    /// The first item is always `Ok(Event::Start)`.  Cooperative
    /// cancellation drains the escape buffer best-effort and ends the
    /// stream with `Ok(Event::Stop)`; a driver failure ends it with a
    /// single `Err` and no `Stop`.
    pub fn listen(&mut self, cancel: &CancelToken) -> Listen<'_, D> {
        Listen::new(self, cancel.clone())
    }
}

/// One listen session.  See [`EventPump::listen`].
pub struct Listen<'a, D: Driver> {
    pump: &'a mut EventPump<D>,
    cancel: CancelToken,
    queue: VecDeque<Event>,
    escape_buffer: Vec<KeyEvent>,
    resize_pending: Arc<AtomicBool>,
    resize_announced: bool,
    needs_refresh: bool,
    _resize_watch: Option<ResizeGuard>,
    pending_err: Option<crate::error::Error>,
    started: bool,
    stopping: bool,
    done: bool,
}

impl<'a, D: Driver> Listen<'a, D> {
    fn new(pump: &'a mut EventPump<D>, cancel: CancelToken) -> Self {
        Self {
            pump,
            cancel,
            queue: VecDeque::new(),
            escape_buffer: Vec::new(),
            resize_pending: Arc::new(AtomicBool::new(false)),
            resize_announced: false,
            needs_refresh: false,
            _resize_watch: None,
            pending_err: None,
            started: false,
            stopping: false,
            done: false,
        }
    }

    /// One iteration of the read loop; fills `queue` with zero or more
    /// events.
    fn pump_once(&mut self) -> Result<()> {
        // delegated work wins over blocking reads so cross-thread
        // requests stay bounded even under continuous input
        match self.pump.delegate_rx.try_recv() {
            Ok(payload) => {
                self.queue.push_back(Event::Delegate(payload));
                return Ok(());
            }
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => {}
        }

        let timeout = if self.escape_buffer.is_empty() {
            self.pump.tuning.idle_timeout
        } else {
            self.pump.tuning.escape_timeout
        };
        let raw = self.pump.driver.read_input(timeout)?;

        // a resize notification can race the blocking read; note the
        // flag before interpreting whatever the read returned
        if self.resize_pending.swap(false, Ordering::SeqCst) && !self.resize_announced {
            self.pump.driver.begin_resize();
            self.resize_announced = true;
        }

        match raw {
            RawInput::TimedOut => {
                self.flush_forced();
                if self.resize_announced {
                    self.emit_resize()?;
                }
            }
            RawInput::Char(c) => {
                self.push_key(KeyEvent::new(Key::Char(c), Modifiers::NONE));
            }
            RawInput::Function(code) => self.classify_function(code)?,
        }
        Ok(())
    }

    fn classify_function(&mut self, code: i32) -> Result<()> {
        match code {
            keycode::RESIZE => {
                self.flush_forced();
                self.emit_resize()?;
            }
            keycode::MOUSE => {
                self.flush_forced();
                let record = self.pump.driver.decode_mouse()?;
                for event in self.pump.mouse.resolve(record) {
                    self.queue.push_back(event);
                }
            }
            _ => {
                let key = match function_key(code) {
                    Some(key) => key,
                    None => {
                        log::debug!("unrecognized function key code {:#o}", code);
                        Key::Unknown
                    }
                };
                let mut event = KeyEvent::new(key, Modifiers::NONE);
                if let Some(name) = self.pump.driver.key_name(code) {
                    event = event.with_name(name);
                }
                self.push_key(event);
            }
        }
        Ok(())
    }

    /// Append a key event to the escape buffer and attempt speculative
    /// resolution; a claimed prefix is flushed as one resolved event.
    fn push_key(&mut self, event: KeyEvent) {
        self.escape_buffer.push(event);
        if let Some((key, consumed)) =
            resolver::resolve_speculative(&self.pump.resolvers, &self.escape_buffer)
        {
            self.escape_buffer.drain(..consumed);
            self.queue.push_back(Event::Key(key));
        }
    }

    /// Drain the whole escape buffer through forced resolution, one
    /// claimed prefix per round.
    fn flush_forced(&mut self) {
        if !self.escape_buffer.is_empty() {
            log::trace!(
                "force-flushing {} buffered key events",
                self.escape_buffer.len()
            );
        }
        while !self.escape_buffer.is_empty() {
            let (key, consumed) =
                resolver::resolve_forced(&self.pump.resolvers, &self.escape_buffer);
            self.escape_buffer.drain(..consumed);
            self.queue.push_back(Event::Key(key));
        }
    }

    fn emit_resize(&mut self) -> Result<()> {
        if !self.resize_announced {
            self.pump.driver.begin_resize();
        }
        self.resize_announced = false;
        let size = self.pump.driver.screen_size()?;
        self.queue.push_back(Event::Resized {
            cols: size.cols,
            rows: size.rows,
        });
        // the surface redraw happens after the event has been yielded,
        // before the loop continues
        self.needs_refresh = true;
        Ok(())
    }
}

impl<'a, D: Driver> Iterator for Listen<'a, D> {
    type Item = Result<Event>;

    fn next(&mut self) -> Option<Result<Event>> {
        if self.done {
            return None;
        }
        if !self.started {
            self.started = true;
            match self.pump.driver.watch_resize(Arc::clone(&self.resize_pending)) {
                Ok(guard) => self._resize_watch = Some(guard),
                Err(err) => {
                    self.pending_err = Some(err.with_context("registering resize watch"))
                }
            }
            return Some(Ok(Event::Start));
        }
        if let Some(err) = self.pending_err.take() {
            self.done = true;
            return Some(Err(err));
        }
        loop {
            if let Some(event) = self.queue.pop_front() {
                return Some(Ok(event));
            }
            if self.needs_refresh {
                self.needs_refresh = false;
                if let Err(err) = self.pump.driver.refresh() {
                    self.done = true;
                    return Some(Err(err));
                }
            }
            if self.stopping {
                self.done = true;
                return None;
            }
            if self.cancel.is_cancelled() {
                self.flush_forced();
                self.queue.push_back(Event::Stop);
                self.stopping = true;
                continue;
            }
            if let Err(err) = self.pump_once() {
                self.done = true;
                return Some(Err(err));
            }
        }
    }
}

fn function_key(code: i32) -> Option<Key> {
    match code {
        keycode::DOWN => Some(Key::DownArrow),
        keycode::UP => Some(Key::UpArrow),
        keycode::LEFT => Some(Key::LeftArrow),
        keycode::RIGHT => Some(Key::RightArrow),
        keycode::HOME => Some(Key::Home),
        keycode::END => Some(Key::End),
        keycode::PAGE_UP => Some(Key::PageUp),
        keycode::PAGE_DOWN => Some(Key::PageDown),
        keycode::BACKSPACE => Some(Key::Backspace),
        keycode::DELETE => Some(Key::Delete),
        keycode::INSERT => Some(Key::Insert),
        keycode::ENTER => Some(Key::Enter),
        n if n > keycode::F0 && n <= keycode::F0 + 63 => {
            Some(Key::Function((n - keycode::F0) as u8))
        }
        _ => None,
    }
}
