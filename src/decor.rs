//! Text columns drawn before and after a bar.
//!
//! A [`Decorator`] turns a bar's [`Statistics`] into a short string. Columns
//! flagged with [`Flags::DWIDTH_SYNC`] are padded to the widest value of that
//! column across every bar in the same render cycle, so labels line up:
//!
//! ```
//! use rimbe::decor::{self, Flags};
//! use rimbe::Progress;
//!
//! let progress = Progress::builder().output(std::io::sink()).build();
//! let bar = progress
//!     .add_bar(100)
//!     .prepend_decorator(decor::name("Downloading", 0, Flags::DIDENT_RIGHT | Flags::DWIDTH_SYNC))
//!     .append_decorator(decor::percentage(5, Flags::empty()));
//!
//! bar.incr(100);
//! progress.stop();
//! ```

use crate::bar::Statistics;
use bitflags::bitflags;
use std::time::Duration;

bitflags! {
    /// Layout behaviour of a single decorator column.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct Flags: u8 {
        /// Left-align the text, padding on the right.
        const DIDENT_RIGHT = 1 << 0;
        /// Pad to the width agreed on by every bar in the render cycle.
        const DWIDTH_SYNC = 1 << 1;
    }
}

type DecoratorFn = Box<dyn Fn(&Statistics) -> String + Send + Sync>;

/// A single column of text attached to a bar.
pub struct Decorator {
    func: DecoratorFn,
    min_width: usize,
    flags: Flags,
}

impl Decorator {
    /// A custom decorator. The text is padded to at least `min_width` chars.
    pub fn new<F>(min_width: usize, flags: Flags, func: F) -> Decorator
    where
        F: Fn(&Statistics) -> String + Send + Sync + 'static,
    {
        Decorator {
            func: Box::new(func),
            min_width,
            flags,
        }
    }

    /// The width this column would like, before any agreement.
    pub(crate) fn measure(&self, stats: &Statistics) -> usize {
        (self.func)(stats).chars().count().max(self.min_width)
    }

    /// The final padded text, given the column width agreed for this cycle.
    pub(crate) fn draw(&self, stats: &Statistics, agreed: usize) -> String {
        let text = (self.func)(stats);
        let width = if self.flags.contains(Flags::DWIDTH_SYNC) {
            agreed.max(self.min_width)
        } else {
            self.min_width
        };

        let len = text.chars().count();
        if len >= width {
            return text;
        }

        let pad = " ".repeat(width - len);
        if self.flags.contains(Flags::DIDENT_RIGHT) {
            text + &pad
        } else {
            pad + &text
        }
    }
}

/// A fixed label.
pub fn name<S: Into<String>>(name: S, min_width: usize, flags: Flags) -> Decorator {
    let name = name.into();
    Decorator::new(min_width, flags, move |_| name.clone())
}

/// `current / total`.
pub fn counters(min_width: usize, flags: Flags) -> Decorator {
    Decorator::new(min_width, flags, |s| format!("{} / {}", s.current, s.total))
}

/// Completion percentage, like ` 42 %`.
pub fn percentage(min_width: usize, flags: Flags) -> Decorator {
    Decorator::new(min_width, flags, |s| format!("{:3} %", s.percent()))
}

/// Time since the bar was created.
pub fn elapsed(min_width: usize, flags: Flags) -> Decorator {
    Decorator::new(min_width, flags, |s| human(s.elapsed))
}

/// Estimated time remaining, based on the average time per unit so far.
pub fn eta(min_width: usize, flags: Flags) -> Decorator {
    Decorator::new(min_width, flags, |s| human(s.eta()))
}

/// `1h02m03s`, `2m03s` or `3s`.
fn human(d: Duration) -> String {
    let secs = d.as_secs();
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);

    if h > 0 {
        format!("{}h{:02}m{:02}s", h, m, s)
    } else if m > 0 {
        format!("{}m{:02}s", m, s)
    } else {
        format!("{}s", s)
    }
}
