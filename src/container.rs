//! The thread which owns the bar list and drives the render cycles.
//!
//! Nothing outside this thread ever touches the list of bars. Callers send a
//! [`Request`] and, where an answer is needed, wait on a one-shot reply
//! channel. Requests and render ticks are handled one at a time, so they can
//! never interleave.

use crate::bar::{Bar, Drawable};
use crate::render;
use crate::writer::Output;
use crate::Error;
use crossbeam_channel::{select, tick, Receiver, Sender};
use std::io::Write;
use std::time::{Duration, Instant};

/// Called with the current bars before each render cycle.
///
/// The hook may change what the bars display, but must not add or remove bars
/// through the owning [`crate::Progress`], since that would deadlock.
pub type BeforeRender = Box<dyn FnMut(&[Bar]) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OpKind {
    Add,
    Remove,
}

/// A change to the bar list, answered with whether it took effect.
pub(crate) struct Operation {
    pub(crate) kind: OpKind,
    pub(crate) bar: Bar,
    pub(crate) result: Sender<bool>,
}

pub(crate) enum Request {
    Op(Operation),
    Count(Sender<usize>),
    SetOutput(Box<dyn Write + Send>),
    SetRefreshRate(Duration),
    SetBeforeRender(BeforeRender),
    Shutdown,
}

enum Event {
    /// `None` once every sender has gone away.
    Request(Option<Request>),
    Tick,
    Cancel,
}

/// The state owned by the coordinating thread.
pub(crate) struct Container {
    bars: Vec<Bar>,
    out: Output,
    refresh_rate: Duration,
    before_render: Option<BeforeRender>,
}

impl Container {
    pub(crate) fn new(
        out: Box<dyn Write + Send>,
        refresh_rate: Duration,
        before_render: Option<BeforeRender>,
        capacity: usize,
    ) -> Container {
        Container {
            bars: Vec::with_capacity(capacity),
            out: Output::new(out),
            refresh_rate,
            before_render,
        }
    }

    /// Serve requests and render ticks until shut down or cancelled.
    ///
    /// `_done` is dropped on the way out, which is how callers learn that the
    /// container has stopped.
    pub(crate) fn serve(
        mut self,
        requests: Receiver<Request>,
        cancel: Receiver<()>,
        _done: Sender<()>,
    ) {
        let mut ticker = tick(self.refresh_rate);
        tracing::debug!("container started, refreshing every {:?}", self.refresh_rate);

        loop {
            let event = select! {
                recv(requests) -> req => Event::Request(req.ok()),
                recv(ticker) -> _ => Event::Tick,
                recv(cancel) -> _ => Event::Cancel,
            };

            match event {
                Event::Request(None) | Event::Request(Some(Request::Shutdown)) => break,
                Event::Request(Some(Request::SetRefreshRate(d))) => {
                    tracing::debug!("refresh rate changed to {:?}", d);
                    self.refresh_rate = d;
                    ticker = tick(d);
                }
                Event::Request(Some(req)) => self.handle(req),
                Event::Tick => self.render(),
                Event::Cancel => {
                    tracing::debug!("container cancelled");
                    break;
                }
            }
        }

        if let Err(e) = self.out.flush() {
            tracing::warn!("{}", Error::from(e));
        }
        tracing::debug!("container stopped with {} bars", self.bars.len());
    }

    fn handle(&mut self, req: Request) {
        match req {
            Request::Op(op) => {
                let ok = self.apply(op.kind, op.bar);
                let _ = op.result.send(ok);
            }
            Request::Count(reply) => {
                let _ = reply.send(self.bars.len());
            }
            Request::SetOutput(w) => {
                if let Err(e) = self.out.replace(w) {
                    tracing::warn!("{}", Error::from(e));
                }
            }
            Request::SetBeforeRender(f) => self.before_render = Some(f),
            Request::SetRefreshRate(_) | Request::Shutdown => {}
        }
    }

    fn apply(&mut self, kind: OpKind, bar: Bar) -> bool {
        match kind {
            OpKind::Add => {
                self.bars.push(bar);
                true
            }
            OpKind::Remove => match self.bars.iter().position(|b| b.same(&bar)) {
                Some(i) => {
                    let b = self.bars.remove(i);
                    b.on_removed();
                    true
                }
                None => false,
            },
        }
    }

    /// One full render cycle over a snapshot of the current bars.
    pub(crate) fn render(&mut self) {
        if self.bars.is_empty() {
            return;
        }

        if let Some(f) = self.before_render.as_mut() {
            f(self.bars.as_slice());
        }

        let start = Instant::now();
        let snapshot = self.bars.clone();
        let lines = render::cycle(&snapshot, Output::term_width(), start + self.refresh_rate);

        for line in lines.iter().flatten() {
            self.out.write(line);
        }

        if let Err(e) = self.out.flush() {
            tracing::warn!("{}", Error::from(e));
        }

        for b in &snapshot {
            b.on_flushed();
        }

        tracing::trace!("rendered {} bars in {:?}", snapshot.len(), start.elapsed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bar::Format;
    use crate::decor::{self, Flags};
    use crate::wait::Pending;
    use crate::writer::Capture;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn container(cap: &Capture) -> Container {
        Container::new(Box::new(cap.clone()), Duration::from_millis(100), None, 0)
    }

    fn bar(id: usize, total: u64, pending: &Arc<Pending>) -> Bar {
        pending.add();
        Bar::new(id, total, 20, Format::default(), Arc::clone(pending))
            .prepend_decorator(decor::name(
                format!("bar #{}", id),
                0,
                Flags::DWIDTH_SYNC | Flags::DIDENT_RIGHT,
            ))
    }

    fn add(c: &mut Container, b: &Bar) -> bool {
        c.apply(OpKind::Add, b.clone())
    }

    #[test]
    fn no_bars_no_output() {
        let cap = Capture::default();
        let mut c = container(&cap);
        c.render();
        assert_eq!(cap.contents(), "");
    }

    #[test]
    fn lines_in_insertion_order() {
        let cap = Capture::default();
        let pending = Arc::new(Pending::default());
        let mut c = container(&cap);

        let bars: Vec<Bar> = [100, 200, 50]
            .iter()
            .enumerate()
            .map(|(i, t)| bar(i, *t, &pending))
            .collect();
        for b in &bars {
            assert!(add(&mut c, b));
        }

        c.render();
        let frame = cap.last_frame();
        assert_eq!(frame.len(), 3);
        for (i, line) in frame.iter().enumerate() {
            assert!(line.starts_with(&format!("bar #{} ", i)), "{}", line);
        }
        assert!(cap.contents().ends_with('\n'));

        assert!(c.apply(OpKind::Remove, bars[1].clone()));
        assert_eq!(c.bars.len(), 2);
        c.render();
        let frame = cap.last_frame();
        assert_eq!(frame.len(), 2);
        assert!(frame[0].starts_with("bar #0"));
        assert!(frame[1].starts_with("bar #2"));
    }

    #[test]
    fn synced_labels_line_up() {
        let cap = Capture::default();
        let pending = Arc::new(Pending::default());
        let mut c = container(&cap);

        add(&mut c, &bar(1, 10, &pending));
        add(&mut c, &bar(100, 10, &pending));
        c.render();

        let frame = cap.last_frame();
        let col = |l: &str| l.find('[').unwrap();
        assert_eq!(col(&frame[0]), col(&frame[1]));
    }

    #[test]
    fn removing_unknown_bar() {
        let cap = Capture::default();
        let pending = Arc::new(Pending::default());
        let mut c = container(&cap);

        add(&mut c, &bar(0, 10, &pending));
        let stranger = bar(1, 10, &pending);
        assert!(!c.apply(OpKind::Remove, stranger));
        assert_eq!(c.bars.len(), 1);
        assert_eq!(pending.count(), 2);
    }

    #[test]
    fn removal_and_flush_notify_bars() {
        let cap = Capture::default();
        let pending = Arc::new(Pending::default());
        let mut c = container(&cap);

        let a = bar(0, 10, &pending);
        let b = bar(1, 10, &pending);
        add(&mut c, &a);
        add(&mut c, &b);

        a.incr(10);
        c.render();
        assert_eq!(pending.count(), 1);

        c.apply(OpKind::Remove, b);
        assert_eq!(pending.count(), 0);
    }

    #[test]
    fn hook_sees_bars_in_order() {
        let cap = Capture::default();
        let pending = Arc::new(Pending::default());
        let calls = Arc::new(AtomicUsize::new(0));

        let seen = Arc::clone(&calls);
        let hook: BeforeRender = Box::new(move |bars: &[Bar]| {
            let ids: Vec<usize> = bars.iter().map(|b| b.id()).collect();
            assert_eq!(ids, vec![3, 1]);
            bars[0].incr(1);
            seen.fetch_add(1, Ordering::SeqCst);
        });

        let rate = Duration::from_millis(100);
        let mut c = Container::new(Box::new(cap.clone()), rate, Some(hook), 2);

        // The hook is skipped along with the rest of an empty cycle.
        c.render();
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let first = bar(3, 10, &pending);
        add(&mut c, &first);
        add(&mut c, &bar(1, 10, &pending));
        c.render();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(first.current(), 1);
    }

    #[test]
    fn output_swap_takes_effect_next_cycle() {
        let old = Capture::default();
        let new = Capture::default();
        let pending = Arc::new(Pending::default());
        let mut c = container(&old);

        add(&mut c, &bar(0, 10, &pending));
        c.render();
        c.handle(Request::SetOutput(Box::new(new.clone())));
        c.render();

        assert_eq!(old.last_frame().len(), 1);
        assert_eq!(new.last_frame().len(), 1);
        assert!(!new.contents().contains('\x1B'));
    }

    #[test]
    fn count_replies_with_live_size() {
        let cap = Capture::default();
        let pending = Arc::new(Pending::default());
        let mut c = container(&cap);
        add(&mut c, &bar(0, 10, &pending));

        let (tx, rx) = crossbeam_channel::bounded(1);
        c.handle(Request::Count(tx));
        assert_eq!(rx.recv().unwrap(), 1);
    }
}
