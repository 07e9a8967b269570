//! A single render cycle: fan out one drawer per bar, fan the lines back in.

use crate::bar::Drawable;
use crate::error::Error;
use crate::sync::{Coordinator, Participant, Ticket, WidthSync};
use crossbeam_channel::{unbounded, Receiver};
use std::panic::{self, AssertUnwindSafe};
use std::thread;
use std::time::Instant;

/// A rendered line, tagged with its bar's position in the snapshot.
struct Fragment {
    index: usize,
    buf: Vec<u8>,
}

/// Render every bar of a snapshot concurrently.
///
/// Returns one entry per bar, in snapshot order. An entry is `None` if its
/// bar panicked while rendering. Every thread spawned here has finished by
/// the time this returns.
pub(crate) fn cycle<D: Drawable>(
    bars: &[D],
    term_width: usize,
    deadline: Instant,
) -> Vec<Option<Vec<u8>>> {
    let n = bars.len();
    let pre_cols = bars.iter().map(|b| b.prepend_columns()).max().unwrap_or(0);
    let post_cols = bars.iter().map(|b| b.append_columns()).max().unwrap_or(0);

    let (pre_coords, pre_seats) = columns(n, pre_cols, deadline);
    let (post_coords, post_seats) = columns(n, post_cols, deadline);

    let (tx, rx) = unbounded();

    thread::scope(|s| {
        for coord in pre_coords.into_iter().chain(post_coords) {
            s.spawn(move || coord.run());
        }

        let seats = pre_seats.into_iter().zip(post_seats);
        for (index, (bar, (pre, post))) in bars.iter().zip(seats).enumerate() {
            let tx = tx.clone();
            s.spawn(move || {
                match panic::catch_unwind(AssertUnwindSafe(|| draw(bar, term_width, pre, post))) {
                    Ok(buf) => {
                        let _ = tx.send(Fragment { index, buf });
                    }
                    // The panic hook has already reported where it happened.
                    Err(payload) => tracing::error!("{}", Error::render_panic(index, payload)),
                }
            });
        }
    });

    drop(tx);
    reassemble(rx, n)
}

/// One barrier per column, with each bar's seats gathered together.
fn columns(
    bars: usize,
    cols: usize,
    deadline: Instant,
) -> (Vec<Coordinator>, Vec<Vec<Participant>>) {
    let mut coords = Vec::with_capacity(cols);
    let mut seats: Vec<Vec<Participant>> = (0..bars).map(|_| Vec::with_capacity(cols)).collect();

    for _ in 0..cols {
        let (coord, slots) = WidthSync::new(bars, deadline);
        coords.push(coord);
        for (mine, slot) in seats.iter_mut().zip(slots) {
            mine.push(slot);
        }
    }

    (coords, seats)
}

/// Agree on column widths with the other bars, then render one line.
fn draw<D: Drawable>(
    bar: &D,
    term_width: usize,
    pre: Vec<Participant>,
    post: Vec<Participant>,
) -> Vec<u8> {
    // Submit every column before waiting on any of them.
    let pre = submit(bar.prepend_widths(), pre);
    let post = submit(bar.append_widths(), post);

    let pre: Vec<usize> = pre.into_iter().map(Agreement::wait).collect();
    let post: Vec<usize> = post.into_iter().map(Agreement::wait).collect();

    let mut buf = bar.render(term_width, &pre, &post);
    buf.push(b'\n');
    buf
}

enum Agreement {
    Synced(Ticket),
    /// A column nobody else has, or one beyond what the barrier expected.
    Local(usize),
}

impl Agreement {
    fn wait(self) -> usize {
        match self {
            Agreement::Synced(t) => t.wait(),
            Agreement::Local(w) => w,
        }
    }
}

/// Seats left over, for columns this bar doesn't have, are dropped here so
/// the barrier stops waiting on them.
fn submit(widths: Vec<usize>, seats: Vec<Participant>) -> Vec<Agreement> {
    let mut seats = seats.into_iter();
    widths
        .into_iter()
        .map(|w| match seats.next() {
            Some(seat) => Agreement::Synced(seat.submit(w)),
            None => Agreement::Local(w),
        })
        .collect()
}

/// Restore snapshot order, regardless of the order lines were finished in.
fn reassemble(rx: Receiver<Fragment>, n: usize) -> Vec<Option<Vec<u8>>> {
    let mut lines = vec![None; n];
    for frag in rx {
        if let Some(slot) = lines.get_mut(frag.index) {
            *slot = Some(frag.buf);
        }
    }
    lines
}
