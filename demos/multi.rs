use rand::Rng;
use rayon::prelude::*;
use rimbe::decor::{self, Flags};
use rimbe::Progress;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const BAR_MAX: u64 = 1234;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    println!("Starting bars...");

    // `Progress` is `Sync`, so rayon's closures can borrow it directly.
    let progress = Progress::new();

    (0..10).into_par_iter().for_each(|n| {
        // Names of different lengths, which the synced column lines up.
        let name = format!("Downloading {}", "#".repeat(n % 4 + 1));
        let bar = progress
            .add_bar_with_id(n, BAR_MAX)
            .prepend_decorator(decor::name(name, 0, Flags::DIDENT_RIGHT | Flags::DWIDTH_SYNC))
            .append_decorator(decor::counters(0, Flags::DWIDTH_SYNC))
            .append_decorator(decor::eta(6, Flags::empty()));

        // Determine how fast our thread progresses.
        let wait = rand::thread_rng().gen_range(1..10);

        for _ in 0..BAR_MAX {
            // No drawing here: the coordinator redraws every bar on its own.
            bar.incr(1);
            std::thread::sleep(Duration::from_millis(wait));
        }
    });

    progress.stop();
    println!("Complete!");
}
