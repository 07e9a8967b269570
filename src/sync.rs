//! Per-cycle agreement on the width of one decorator column.
//!
//! Every render cycle creates one [`WidthSync`] per column. Each bar is handed
//! a [`Participant`] slot, submits the width it measured locally, and receives
//! the widest submission. The [`Coordinator`] publishes as soon as every
//! participant has either submitted or dropped its slot, or when the cycle's
//! deadline passes, whichever happens first. A late deadline publishes the
//! maximum of whatever did arrive. If nothing arrived at all, nothing is
//! published and participants keep their own width.

use crossbeam_channel::{bounded, Receiver, Sender};
use std::time::Instant;

/// Constructor namespace for a single column's barrier.
pub(crate) struct WidthSync;

impl WidthSync {
    /// Allocate a fresh barrier for `participants` bars, expiring at `deadline`.
    pub(crate) fn new(participants: usize, deadline: Instant) -> (Coordinator, Vec<Participant>) {
        let (listen_tx, listen_rx) = bounded(participants.max(1));
        let (results, slots): (Vec<_>, Vec<_>) = (0..participants)
            .map(|_| {
                let (tx, rx) = bounded(1);
                let slot = Participant {
                    input: listen_tx.clone(),
                    output: rx,
                };
                (tx, slot)
            })
            .unzip();

        let coordinator = Coordinator {
            listen: listen_rx,
            results,
            deadline,
        };

        (coordinator, slots)
    }
}

/// Collects submitted widths and publishes their maximum.
pub(crate) struct Coordinator {
    listen: Receiver<usize>,
    results: Vec<Sender<usize>>,
    deadline: Instant,
}

impl Coordinator {
    /// Run the barrier to completion. Returns the published width, if any.
    pub(crate) fn run(self) -> Option<usize> {
        let quorum = self.results.len();
        let mut widths = Vec::with_capacity(quorum);

        while widths.len() < quorum {
            match self.listen.recv_deadline(self.deadline) {
                Ok(w) => widths.push(w),
                // Either the deadline passed, or every slot was used or dropped.
                Err(_) => break,
            }
        }

        let max = widths.iter().copied().max()?;

        if widths.len() < quorum {
            tracing::trace!("width sync published partial quorum {}/{quorum}", widths.len());
        }

        // Every slot gets the result, including the ones that haven't asked yet.
        for tx in &self.results {
            let _ = tx.try_send(max);
        }

        Some(max)
    }
}

/// One bar's seat at a column's barrier.
pub(crate) struct Participant {
    input: Sender<usize>,
    output: Receiver<usize>,
}

impl Participant {
    /// Submit a locally measured width. Each seat submits at most once.
    pub(crate) fn submit(self, width: usize) -> Ticket {
        let _ = self.input.try_send(width);

        Ticket {
            output: self.output,
            width,
        }
    }
}

/// A submitted width, waiting on the column's agreement.
pub(crate) struct Ticket {
    output: Receiver<usize>,
    width: usize,
}

impl Ticket {
    /// The agreed width, or our own if the barrier published nothing.
    ///
    /// Blocks until the coordinator has finished, which it always does by
    /// its deadline.
    pub(crate) fn wait(self) -> usize {
        self.output.recv().unwrap_or(self.width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    fn deadline(ms: u64) -> Instant {
        Instant::now() + Duration::from_millis(ms)
    }

    #[test]
    fn full_quorum_agrees_on_max() {
        let (coord, slots) = WidthSync::new(3, deadline(1000));

        thread::scope(|s| {
            let c = s.spawn(move || coord.run());
            let handles: Vec<_> = slots
                .into_iter()
                .zip([4, 11, 7])
                .map(|(slot, w)| s.spawn(move || slot.submit(w).wait()))
                .collect();

            let agreed: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
            assert_eq!(agreed, vec![11, 11, 11]);
            assert_eq!(c.join().unwrap(), Some(11));
        });
    }

    #[test]
    fn full_quorum_does_not_wait_for_deadline() {
        let start = Instant::now();
        let (coord, slots) = WidthSync::new(2, deadline(5_000));

        thread::scope(|s| {
            s.spawn(move || coord.run());
            for slot in slots {
                s.spawn(move || slot.submit(3).wait());
            }
        });

        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn partial_quorum_reaches_late_participants() {
        let (coord, mut slots) = WidthSync::new(3, deadline(30));
        let late = slots.pop().unwrap();

        thread::scope(|s| {
            let c = s.spawn(move || coord.run());
            let early: Vec<_> = slots
                .into_iter()
                .zip([5, 9])
                .map(|(slot, w)| s.spawn(move || slot.submit(w).wait()))
                .collect();

            for h in early {
                assert_eq!(h.join().unwrap(), 9);
            }
            assert_eq!(c.join().unwrap(), Some(9));
        });

        // Arrives after publication, and is told the subset's maximum even
        // though its own width is larger.
        assert_eq!(late.submit(20).wait(), 9);
    }

    #[test]
    fn dropped_slots_count_towards_quorum() {
        let start = Instant::now();
        let (coord, mut slots) = WidthSync::new(3, deadline(5_000));
        drop(slots.pop());

        thread::scope(|s| {
            let c = s.spawn(move || coord.run());
            for (slot, w) in slots.into_iter().zip([2, 6]) {
                s.spawn(move || assert_eq!(slot.submit(w).wait(), 6));
            }
            assert_eq!(c.join().unwrap(), Some(6));
        });

        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn no_submissions_publishes_nothing() {
        let (coord, slots) = WidthSync::new(2, deadline(10));
        assert_eq!(coord.run(), None);

        for (slot, w) in slots.into_iter().zip([3, 8]) {
            assert_eq!(slot.submit(w).wait(), w);
        }
    }

    #[test]
    fn zero_participants() {
        let (coord, slots) = WidthSync::new(0, deadline(10));
        assert!(slots.is_empty());
        assert_eq!(coord.run(), None);
    }
}
