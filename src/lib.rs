//! Concurrent, column-aligned multi progress bars.
//!
//! # Features
//!
//! - Bars are redrawn on a fixed cadence by a dedicated thread.
//! - Bars may be added and removed on-the-fly, from any thread.
//! - No locks around the bar list: every change is a message to its owner.
//! - Decorator columns (labels, counters, percentages) line up across bars.
//! - A panicking bar costs one line of one frame, not the whole display.
//!
//! # Usage
//!
//! `rimbe` is designed around the multi-bar case. A [`Progress`] is a "bar
//! coordinator" which owns the display, and [`Progress::add_bar`] hands back a
//! [`Bar`] which the actual worker advances.
//!
//! ## Multi Bars
//!
//! `Progress` is [`Send`] and [`Sync`], and every method takes `&self`, so it
//! can be shared with worker threads without any extra locking:
//!
//! ```
//! use rimbe::decor::{self, Flags};
//! use rimbe::Progress;
//! use rayon::prelude::*;
//!
//! # let progress = Progress::builder().output(std::io::sink()).build();
//! # /*
//! let progress = Progress::new();
//! # */
//!
//! // `into_par_iter()` is from `rayon`, and lets us parallelize some
//! // operation over a collection "for free".
//! (0..10).into_par_iter().for_each(|n| {
//!     let bar = progress
//!         .add_bar(50)
//!         .prepend_decorator(decor::name(
//!             format!("Downloading #{}", n),
//!             0,
//!             Flags::DIDENT_RIGHT | Flags::DWIDTH_SYNC,
//!         ))
//!         .append_decorator(decor::percentage(5, Flags::empty()));
//!
//!     // ... Your logic ...
//!
//!     // No drawing here. The coordinator picks up the new value on its
//!     // next render cycle.
//!     bar.incr(50);
//! });
//!
//! // Blocks until every bar has been drawn at 100%.
//! progress.stop();
//! ```
//!
//! Because the `Downloading #n` columns are flagged with
//! [`decor::Flags::DWIDTH_SYNC`], every bar is padded to the widest label
//! drawn in the same cycle, even though each line is rendered on its own
//! thread.
//!
//! ## Reconfiguring
//!
//! The output writer, refresh rate and pre-render hook can be changed while
//! bars are running. Changes take effect from the next render cycle on:
//!
//! ```
//! use rimbe::Progress;
//! use std::time::Duration;
//!
//! let progress = Progress::builder().output(std::io::sink()).build();
//! let bar = progress.add_bar(3);
//!
//! progress.set_refresh_rate(Duration::from_millis(10));
//! progress.set_out(std::io::sink());
//!
//! assert_eq!(progress.bar_count(), 1);
//! assert!(progress.remove_bar(&bar));
//! assert_eq!(progress.bar_count(), 0);
//! progress.stop();
//! ```
//!
//! ## Stopping and Cancelling
//!
//! [`Progress::stop`] waits for every bar to complete before shutting the
//! coordinator down. Calling anything else on a stopped `Progress` is a bug,
//! and panics. To abandon bars early instead, give the coordinator a cancel
//! channel through [`Builder::cancel`].
//!
//! # Caveats
//!
//! - Your terminal must support ANSI codes.
//! - Terminal width is read from stdout, even if drawing elsewhere.
//! - Output written to the same terminal by others will be overdrawn.
//!
//! # Trivia
//!
//! *Rimbë* is the Quenya word for "crowd" or "host".

mod bar;
mod container;
pub mod decor;
mod error;
mod progress;
mod render;
mod sync;
mod wait;
mod writer;

pub use bar::{Bar, Format, Statistics};
pub use container::BeforeRender;
pub use error::Error;
pub use progress::{Builder, Progress};
