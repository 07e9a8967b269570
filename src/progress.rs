//! The public face of the coordinator.

use crate::bar::{Bar, Format};
use crate::container::{BeforeRender, Container, OpKind, Operation, Request};
use crate::wait::Pending;
use crate::Error;
use crossbeam_channel::{bounded, never, Receiver, Sender, TryRecvError};
use parking_lot::Mutex;
use std::io::Write;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Default time between render cycles.
const REFRESH_RATE: Duration = Duration::from_millis(100);

/// Default width of a bar, in columns.
const WIDTH: usize = 70;

/// A progress bar "coordinator", which redraws every bar it knows about on a
/// fixed cadence from its own thread.
///
/// `Progress` is [`Send`] and [`Sync`], so it can be shared between threads
/// by reference or through an [`Arc`]. All of its methods take `&self`.
pub struct Progress {
    requests: Sender<Request>,
    /// Disconnected once the coordinating thread has exited.
    done: Receiver<()>,
    pending: Arc<Pending>,
    width: usize,
    format: Format,
    server: Mutex<Option<JoinHandle<()>>>,
}

impl Progress {
    /// Start a new coordinator with default settings, drawing to stdout.
    pub fn new() -> Progress {
        Builder::default().build()
    }

    /// Like [`Progress::new`] but accepts a size hint to avoid reallocation as
    /// bar count grows.
    pub fn with_capacity(capacity: usize) -> Progress {
        Builder::default().capacity(capacity).build()
    }

    /// Configure a coordinator before starting it.
    pub fn builder() -> Builder {
        Builder::default()
    }

    /// Create a new bar and start drawing it from the next render cycle on.
    ///
    /// # Panics
    ///
    /// If called after [`Progress::stop`].
    pub fn add_bar(&self, total: u64) -> Bar {
        self.add_bar_with_id(0, total)
    }

    /// Like [`Progress::add_bar`], but tag the bar with an identifier which
    /// decorators can see through [`crate::Statistics`].
    ///
    /// # Panics
    ///
    /// If called after [`Progress::stop`].
    pub fn add_bar_with_id(&self, id: usize, total: u64) -> Bar {
        let bar = Bar::new(id, total, self.width, self.format, Arc::clone(&self.pending));
        // Counted before the container sees it, in case it finishes immediately.
        self.pending.add();

        let (tx, rx) = bounded(1);
        let op = Operation {
            kind: OpKind::Add,
            bar: bar.clone(),
            result: tx,
        };

        self.send(Request::Op(op));
        if !Self::reply(&rx) {
            self.pending.done();
        }

        bar
    }

    /// Stop drawing a bar. Returns `false` if the bar wasn't being drawn.
    ///
    /// A removed bar no longer holds up [`Progress::stop`].
    ///
    /// # Panics
    ///
    /// If called after [`Progress::stop`].
    pub fn remove_bar(&self, bar: &Bar) -> bool {
        let (tx, rx) = bounded(1);
        let op = Operation {
            kind: OpKind::Remove,
            bar: bar.clone(),
            result: tx,
        };

        self.send(Request::Op(op));
        Self::reply(&rx)
    }

    /// The number of bars currently being drawn.
    ///
    /// # Panics
    ///
    /// If called after [`Progress::stop`].
    pub fn bar_count(&self) -> usize {
        let (tx, rx) = bounded(1);
        self.send(Request::Count(tx));
        Self::reply(&rx)
    }

    /// Redirect output to a different writer, from the next render cycle on.
    /// Anything buffered for the old writer is flushed into it first.
    ///
    /// # Panics
    ///
    /// If called after [`Progress::stop`].
    pub fn set_out<W: Write + Send + 'static>(&self, out: W) {
        self.send(Request::SetOutput(Box::new(out)));
    }

    /// Change the time between render cycles. The cycle in flight, if any, is
    /// unaffected.
    ///
    /// # Panics
    ///
    /// If called after [`Progress::stop`], or with a zero duration.
    pub fn set_refresh_rate(&self, rate: Duration) {
        if rate.is_zero() {
            panic!("{}", Error::ZeroRefreshRate);
        }

        self.send(Request::SetRefreshRate(rate));
    }

    /// Run a function over every bar just before each render cycle.
    ///
    /// # Panics
    ///
    /// If called after [`Progress::stop`].
    pub fn set_before_render<F>(&self, f: F)
    where
        F: FnMut(&[Bar]) + Send + 'static,
    {
        self.send(Request::SetBeforeRender(Box::new(f)));
    }

    /// Wait for every bar to complete, then shut the coordinator down.
    ///
    /// This is not for cancellation: it blocks until each bar has reached its
    /// total (or been removed). See [`Builder::cancel`] to abandon bars early.
    /// Any further method call, other than `stop` itself, will panic.
    pub fn stop(&self) {
        tracing::debug!("stopping, {} bars outstanding", self.pending.count());
        self.pending.wait();

        if !self.is_closed() {
            // The container may have shut down in the meantime.
            let _ = self.requests.send(Request::Shutdown);
        }

        if let Some(handle) = self.server.lock().take() {
            if handle.join().is_err() {
                tracing::error!("progress container thread panicked");
            }
        }
    }

    /// Has the coordinating thread exited?
    fn is_closed(&self) -> bool {
        matches!(self.done.try_recv(), Err(TryRecvError::Disconnected))
    }

    fn send(&self, req: Request) {
        if self.is_closed() || self.requests.send(req).is_err() {
            panic!("{}", Error::CallAfterStop);
        }
    }

    fn reply<T>(rx: &Receiver<T>) -> T {
        match rx.recv() {
            Ok(t) => t,
            // The container went away with our request in hand.
            Err(_) => panic!("{}", Error::CallAfterStop),
        }
    }
}

impl Default for Progress {
    fn default() -> Progress {
        Progress::new()
    }
}

/// Settings for a [`Progress`] that has yet to start.
///
/// ```
/// use rimbe::Progress;
/// use std::time::Duration;
///
/// let progress = Progress::builder()
///     .width(40)
///     .format("(#>.)")
///     .refresh_rate(Duration::from_millis(50))
///     .output(std::io::sink())
///     .build();
///
/// assert_eq!(progress.bar_count(), 0);
/// progress.stop();
/// ```
pub struct Builder {
    width: usize,
    format: Format,
    refresh_rate: Duration,
    out: Box<dyn Write + Send>,
    before_render: Option<BeforeRender>,
    cancel: Receiver<()>,
    capacity: usize,
}

impl Default for Builder {
    fn default() -> Builder {
        Builder {
            width: WIDTH,
            format: Format::default(),
            refresh_rate: REFRESH_RATE,
            out: Box::new(std::io::stdout()),
            before_render: None,
            cancel: never(),
            capacity: 0,
        }
    }
}

impl Builder {
    /// The width of new bars, in columns. Defaults to 70.
    pub fn width(mut self, width: usize) -> Builder {
        self.width = width;
        self
    }

    /// The glyphs of new bars, which must be exactly five characters: open,
    /// fill, cursor, empty and close. Defaults to `[=>-]`. Anything else is
    /// ignored.
    pub fn format(mut self, format: &str) -> Builder {
        match Format::parse(format) {
            Some(f) => self.format = f,
            None => tracing::debug!("ignoring bar format {:?}", format),
        }
        self
    }

    /// Time between render cycles. Defaults to 100ms.
    ///
    /// # Panics
    ///
    /// If given a zero duration.
    pub fn refresh_rate(mut self, rate: Duration) -> Builder {
        if rate.is_zero() {
            panic!("{}", Error::ZeroRefreshRate);
        }

        self.refresh_rate = rate;
        self
    }

    /// Where to draw. Defaults to stdout.
    pub fn output<W: Write + Send + 'static>(mut self, out: W) -> Builder {
        self.out = Box::new(out);
        self
    }

    /// See [`Progress::set_before_render`].
    pub fn before_render<F>(mut self, f: F) -> Builder
    where
        F: FnMut(&[Bar]) + Send + 'static,
    {
        self.before_render = Some(Box::new(f));
        self
    }

    /// Abandon all drawing as soon as this channel receives a message or its
    /// sender is dropped. Pending bars are not waited for.
    pub fn cancel(mut self, cancel: Receiver<()>) -> Builder {
        self.cancel = cancel;
        self
    }

    /// A size hint for the number of bars.
    pub fn capacity(mut self, capacity: usize) -> Builder {
        self.capacity = capacity;
        self
    }

    /// Spawn the coordinating thread.
    pub fn build(self) -> Progress {
        let (requests, inbox) = bounded(0);
        let (done_tx, done) = bounded(0);
        let pending = Arc::new(Pending::default());

        let container = Container::new(
            self.out,
            self.refresh_rate,
            self.before_render,
            self.capacity,
        );
        let cancel = self.cancel;
        let closer = pending.closer();

        let server = thread::Builder::new()
            .name("progress".to_string())
            .spawn(move || {
                // Nobody is left to finish the remaining bars once this thread
                // exits, however it exits.
                let _closer = closer;
                container.serve(inbox, cancel, done_tx);
            });

        let server = match server {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::error!("failed to spawn progress container: {e}");
                pending.close();
                None
            }
        };

        Progress {
            requests,
            done,
            pending,
            width: self.width,
            format: self.format,
            server: Mutex::new(server),
        }
    }
}
