//! Individual progress bars, and what the coordinator needs from them.

use crate::decor::Decorator;
use crate::wait::Pending;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// What the render cycle needs from anything it draws.
///
/// Implementations are shared by every drawer thread of a cycle, and so must
/// be [`Sync`]. `render` must not block indefinitely.
pub(crate) trait Drawable: Send + Sync {
    /// How many columns this bar draws before itself.
    fn prepend_columns(&self) -> usize {
        self.prepend_widths().len()
    }

    /// How many columns this bar draws after itself.
    fn append_columns(&self) -> usize {
        self.append_widths().len()
    }

    /// The locally measured width of each column drawn before the bar.
    fn prepend_widths(&self) -> Vec<usize>;

    /// The locally measured width of each column drawn after the bar.
    fn append_widths(&self) -> Vec<usize>;

    /// Produce one line of output, without its line terminator.
    ///
    /// The width slices hold the agreed width of each column, and have the
    /// same lengths as those returned by the measuring methods.
    fn render(&self, term_width: usize, prepend: &[usize], append: &[usize]) -> Vec<u8>;

    /// The bar was dropped from its container.
    fn on_removed(&self) {}

    /// The bar's latest line was committed to the output.
    fn on_flushed(&self) {}
}

/// The glyphs a bar is drawn with, such as `[=>-]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Format {
    open: char,
    fill: char,
    cursor: char,
    empty: char,
    close: char,
}

impl Format {
    /// Parse exactly five glyphs: open, fill, cursor, empty and close.
    pub fn parse(s: &str) -> Option<Format> {
        let mut cs = s.chars();
        let format = Format {
            open: cs.next()?,
            fill: cs.next()?,
            cursor: cs.next()?,
            empty: cs.next()?,
            close: cs.next()?,
        };

        match cs.next() {
            None => Some(format),
            Some(_) => None,
        }
    }
}

impl Default for Format {
    fn default() -> Format {
        Format {
            open: '[',
            fill: '=',
            cursor: '>',
            empty: '-',
            close: ']',
        }
    }
}

/// A snapshot of a bar's progress, as seen by decorators.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Statistics {
    /// The identifier given to [`crate::Progress::add_bar_with_id`].
    pub id: usize,
    /// Whether the bar has reached its total, or was forced to complete.
    pub completed: bool,
    /// The value at which the bar completes.
    pub total: u64,
    /// Progress so far, never more than `total`.
    pub current: u64,
    /// Time since the bar was created.
    pub elapsed: Duration,
}

impl Statistics {
    /// Progress as a whole percentage. An empty bar counts as 100%.
    pub fn percent(&self) -> u64 {
        match self.total {
            0 => 100,
            t => self.current.min(t) * 100 / t,
        }
    }

    /// Estimated time remaining, assuming the average pace holds.
    pub fn eta(&self) -> Duration {
        if self.current == 0 || self.current >= self.total {
            return Duration::ZERO;
        }

        let remaining = u128::from(self.total - self.current);
        let nanos = self.elapsed.as_nanos() * remaining / u128::from(self.current);
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }
}

/// A handle to a single progress bar.
///
/// Obtained from [`crate::Progress::add_bar`]. Cheap to clone, and can be
/// moved into whichever thread does the actual work:
///
/// ```
/// use rimbe::Progress;
///
/// let progress = Progress::builder().output(std::io::sink()).build();
/// let bar = progress.add_bar(10);
///
/// let worker = {
///     let bar = bar.clone();
///     std::thread::spawn(move || bar.incr(10))
/// };
///
/// worker.join().unwrap();
/// assert!(!bar.in_progress());
/// progress.stop();
/// ```
#[derive(Clone)]
pub struct Bar {
    inner: Arc<Inner>,
}

struct Inner {
    id: usize,
    width: usize,
    format: Format,
    started: Instant,
    state: Mutex<State>,
    pending: Arc<Pending>,
    /// Whether the most recently rendered line showed the bar finished.
    rendered_complete: AtomicBool,
    /// Whether `pending` has already been told about this bar finishing.
    signalled: AtomicBool,
}

struct State {
    total: u64,
    current: u64,
    completed: bool,
    prepend: Vec<Decorator>,
    append: Vec<Decorator>,
}

impl Bar {
    pub(crate) fn new(
        id: usize,
        total: u64,
        width: usize,
        format: Format,
        pending: Arc<Pending>,
    ) -> Bar {
        let state = State {
            total,
            current: 0,
            completed: total == 0,
            prepend: vec![],
            append: vec![],
        };

        let inner = Inner {
            id,
            width,
            format,
            started: Instant::now(),
            state: Mutex::new(state),
            pending,
            rendered_complete: AtomicBool::new(false),
            signalled: AtomicBool::new(false),
        };

        Bar {
            inner: Arc::new(inner),
        }
    }

    /// Add a column to the left of the bar.
    pub fn prepend_decorator(self, d: Decorator) -> Bar {
        self.inner.state.lock().prepend.push(d);
        self
    }

    /// Add a column to the right of the bar.
    pub fn append_decorator(self, d: Decorator) -> Bar {
        self.inner.state.lock().append.push(d);
        self
    }

    /// Advance the bar. Progress past the total is clamped.
    pub fn incr(&self, n: u64) {
        let mut state = self.inner.state.lock();
        let next = state.current.saturating_add(n);
        state.set(next);
    }

    /// Set the bar's progress directly. Progress past the total is clamped.
    pub fn set(&self, n: u64) {
        self.inner.state.lock().set(n);
    }

    /// Mark the bar as finished, regardless of its current value.
    pub fn complete(&self) {
        self.inner.state.lock().completed = true;
    }

    /// Progress so far.
    pub fn current(&self) -> u64 {
        self.inner.state.lock().current
    }

    /// The value at which this bar is complete.
    pub fn total(&self) -> u64 {
        self.inner.state.lock().total
    }

    /// The identifier this bar was created with, `0` by default.
    pub fn id(&self) -> usize {
        self.inner.id
    }

    /// Has this bar yet to reach its total?
    pub fn in_progress(&self) -> bool {
        !self.inner.state.lock().completed
    }

    /// A snapshot of this bar's progress, as decorators see it.
    pub fn statistics(&self) -> Statistics {
        self.inner.stats(&self.inner.state.lock())
    }

    /// Are these two handles to the same bar?
    pub(crate) fn same(&self, other: &Bar) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Tell the container's pending counter that this bar is finished, once.
    fn signal(&self) {
        if !self.inner.signalled.swap(true, Ordering::AcqRel) {
            self.inner.pending.done();
        }
    }
}

impl Inner {
    fn stats(&self, state: &State) -> Statistics {
        Statistics {
            id: self.id,
            completed: state.completed,
            total: state.total,
            current: state.current,
            elapsed: self.started.elapsed(),
        }
    }

    /// The bar itself, squeezed into `width` columns.
    fn body(&self, state: &State, width: usize) -> String {
        let f = &self.format;
        if width < 2 {
            return String::new();
        }

        let inner = width - 2;
        let mut body = String::with_capacity(width);
        body.push(f.open);

        if state.completed || inner == 0 {
            body.extend(std::iter::repeat(f.fill).take(inner));
        } else {
            let total = u128::from(state.total.max(1));
            let done = (inner as u128 * u128::from(state.current) / total) as usize;
            let done = done.min(inner - 1);
            body.extend(std::iter::repeat(f.fill).take(done));
            body.push(f.cursor);
            body.extend(std::iter::repeat(f.empty).take(inner - 1 - done));
        }

        body.push(f.close);
        body
    }
}

impl State {
    fn set(&mut self, n: u64) {
        self.current = n.min(self.total);
        if self.current >= self.total {
            self.completed = true;
        }
    }
}

impl Drawable for Bar {
    fn prepend_columns(&self) -> usize {
        self.inner.state.lock().prepend.len()
    }

    fn append_columns(&self) -> usize {
        self.inner.state.lock().append.len()
    }

    fn prepend_widths(&self) -> Vec<usize> {
        let state = self.inner.state.lock();
        let stats = self.inner.stats(&state);
        state.prepend.iter().map(|d| d.measure(&stats)).collect()
    }

    fn append_widths(&self) -> Vec<usize> {
        let state = self.inner.state.lock();
        let stats = self.inner.stats(&state);
        state.append.iter().map(|d| d.measure(&stats)).collect()
    }

    fn render(&self, term_width: usize, prepend: &[usize], append: &[usize]) -> Vec<u8> {
        let state = self.inner.state.lock();
        let stats = self.inner.stats(&state);

        let pre: Vec<String> = state
            .prepend
            .iter()
            .zip(prepend)
            .map(|(d, w)| d.draw(&stats, *w))
            .collect();
        let post: Vec<String> = state
            .append
            .iter()
            .zip(append)
            .map(|(d, w)| d.draw(&stats, *w))
            .collect();

        // Each column is separated from the bar by a single space.
        let decor: usize = pre
            .iter()
            .chain(post.iter())
            .map(|s| s.chars().count() + 1)
            .sum();
        let width = self.inner.width.min(term_width.saturating_sub(decor));

        let mut line = String::with_capacity(term_width);
        for p in &pre {
            line.push_str(p);
            line.push(' ');
        }
        line.push_str(&self.inner.body(&state, width));
        for p in &post {
            line.push(' ');
            line.push_str(p);
        }

        // Recorded only once the line exists, so a flush of this line is a flush
        // of exactly this state.
        self.inner
            .rendered_complete
            .store(state.completed, Ordering::Release);

        line.into_bytes()
    }

    fn on_removed(&self) {
        self.signal();
    }

    /// Finishing only counts once a finished line has actually been flushed.
    fn on_flushed(&self) {
        if self.inner.rendered_complete.load(Ordering::Acquire) {
            self.signal();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decor::{self, Flags};

    fn bar(total: u64, width: usize) -> (Bar, Arc<Pending>) {
        let pending = Arc::new(Pending::default());
        pending.add();
        let b = Bar::new(0, total, width, Format::default(), Arc::clone(&pending));
        (b, pending)
    }

    fn line(b: &Bar, term_width: usize) -> String {
        let pre = b.prepend_widths();
        let post = b.append_widths();
        String::from_utf8(b.render(term_width, &pre, &post)).unwrap()
    }

    #[test]
    fn formats() {
        assert_eq!(Format::parse("[=>-]"), Some(Format::default()));
        assert!(Format::parse("(#>.)").is_some());
        assert!(Format::parse("[=>]").is_none());
        assert!(Format::parse("[=>--]").is_none());
        assert!(Format::parse("").is_none());
        assert!(Format::parse("╢▌▌░╟").is_some());
    }

    #[test]
    fn body_progress() {
        let (b, _) = bar(100, 12);
        assert_eq!(line(&b, 80), "[>---------]");

        b.incr(50);
        assert_eq!(line(&b, 80), "[=====>----]");

        b.incr(1000);
        assert_eq!(b.current(), 100);
        assert_eq!(line(&b, 80), "[==========]");
    }

    #[test]
    fn custom_format() {
        let pending = Arc::new(Pending::default());
        let b = Bar::new(0, 4, 6, Format::parse("(#|.)").unwrap(), pending);
        b.set(2);
        assert_eq!(line(&b, 80), "(##|.)");
    }

    #[test]
    fn shrinks_to_terminal() {
        let (b, _) = bar(10, 70);
        let b = b.prepend_decorator(decor::name("abc", 0, Flags::empty()));
        assert_eq!(line(&b, 14).chars().count(), 14);
    }

    #[test]
    fn decorated_line() {
        let (b, _) = bar(10, 7);
        let b = b
            .prepend_decorator(decor::name("x", 0, Flags::DWIDTH_SYNC | Flags::DIDENT_RIGHT))
            .append_decorator(decor::counters(0, Flags::empty()));

        b.set(5);
        assert_eq!(b.prepend_widths(), vec![1]);
        let out = String::from_utf8(b.render(80, &[4], &[6])).unwrap();
        assert_eq!(out, "x    [==>--] 5 / 10");
    }

    #[test]
    fn zero_total_is_complete() {
        let (b, _) = bar(0, 6);
        assert!(!b.in_progress());
        assert_eq!(b.statistics().percent(), 100);
        assert_eq!(line(&b, 80), "[====]");
    }

    #[test]
    fn completion_signals_after_flush() {
        let (b, pending) = bar(3, 10);
        b.incr(3);
        assert!(!b.in_progress());
        assert_eq!(pending.count(), 1);

        line(&b, 80);
        b.on_flushed();
        assert_eq!(pending.count(), 0);

        // Only once.
        pending.add();
        b.on_flushed();
        b.on_removed();
        assert_eq!(pending.count(), 1);
    }

    #[test]
    fn finishing_after_render_waits_for_next_flush() {
        let (b, pending) = bar(3, 10);
        assert_eq!(line(&b, 80), "[>-------]");

        // Finishes while the unfinished line is still on its way out.
        b.incr(3);
        b.on_flushed();
        assert_eq!(pending.count(), 1);

        assert_eq!(line(&b, 80), "[========]");
        b.on_flushed();
        assert_eq!(pending.count(), 0);
    }

    #[test]
    fn removal_signals() {
        let (b, pending) = bar(3, 10);
        b.on_flushed();
        assert_eq!(pending.count(), 1);
        b.on_removed();
        assert_eq!(pending.count(), 0);
    }

    #[test]
    fn forced_completion() {
        let (b, _) = bar(10, 6);
        b.set(2);
        b.complete();
        assert!(!b.in_progress());
        assert_eq!(b.current(), 2);
        assert_eq!(line(&b, 80), "[====]");
    }

    #[test]
    fn eta() {
        let s = Statistics {
            id: 0,
            completed: false,
            total: 200,
            current: 50,
            elapsed: Duration::from_secs(10),
        };
        assert_eq!(s.eta(), Duration::from_secs(30));
        assert_eq!(s.percent(), 25);
    }

    #[test]
    fn identity() {
        let (a, _) = bar(1, 5);
        let (b, _) = bar(1, 5);
        assert!(a.same(&a.clone()));
        assert!(!a.same(&b));
    }
}
