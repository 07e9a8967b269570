//! An example of abandoning all bars part way through.
//!
//! See the `multi` example for details on overall usage of the library.

use rand::Rng;
use rayon::prelude::*;
use rimbe::decor::{self, Flags};
use rimbe::{Bar, Progress};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    println!("Starting bars...");

    let (cancel, cancelled) = crossbeam_channel::bounded(1);
    let progress = Progress::builder()
        .format("(#>.)")
        .refresh_rate(Duration::from_millis(50))
        .cancel(cancelled)
        .build();

    let bars: Vec<Bar> = (0..10)
        .map(|n| {
            progress
                .add_bar(50)
                .prepend_decorator(decor::name(
                    format!("Downloading #{}", n),
                    0,
                    Flags::DIDENT_RIGHT | Flags::DWIDTH_SYNC,
                ))
                .append_decorator(decor::percentage(5, Flags::empty()))
        })
        .collect();

    bars.par_iter().for_each(|bar| {
        let mut rng = rand::thread_rng();
        let wait = rng.gen_range(25..250);

        for _ in 0..50 {
            // Simulate one of our "downloads" failing, and giving up on all
            // of them.
            if rng.gen_range(0..=999) < 5 {
                let _ = cancel.try_send(());
                break;
            }

            bar.incr(1);
            std::thread::sleep(Duration::from_millis(wait));
        }
    });

    // Returns immediately if we cancelled, since nobody will finish the rest.
    progress.stop();
    println!("Complete!");
}
