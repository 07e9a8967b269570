use rimbe::decor::{self, Flags};
use rimbe::Progress;
use std::time::Duration;

fn main() {
    println!("Starting bar...");

    // `Progress` is not a bar, but a "bar coordinator".
    let progress = Progress::new();

    // An owned handle to a bar the coordinator draws.
    let bar = progress
        .add_bar(50)
        .append_decorator(decor::percentage(5, Flags::empty()))
        .append_decorator(decor::elapsed(4, Flags::empty()));

    for _ in 0..50 {
        bar.incr(1);
        std::thread::sleep(Duration::from_millis(60));
    }

    progress.stop();
    println!("Complete!");
}
