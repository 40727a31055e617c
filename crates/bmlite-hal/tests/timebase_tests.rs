mod common;

use std::rc::Rc;
use std::time::{Duration, Instant};

use bmlite_hal::{MonotonicClock, Tick, Timebase};
use common::{make_timebase, Shared};

/// Host clock, counting from construction.
struct StdClock(Instant);

impl MonotonicClock for StdClock {
    fn now_micros(&self) -> u64 {
        self.0.elapsed().as_micros() as u64
    }
}

/// Sleeps the calling thread, letting the OS run other work.
struct StdDelay;

impl embedded_hal::delay::DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(Duration::from_nanos(u64::from(ns)));
    }
}

#[test]
fn now_truncates_microseconds() {
    let shared = Rc::new(Shared::default());
    let timebase = make_timebase(&shared);

    shared.micros.set(1_999);
    assert_eq!(timebase.now(), Tick(1));

    shared.micros.set(2_000);
    assert_eq!(timebase.now(), Tick(2));

    shared.micros.set(999);
    assert_eq!(timebase.now(), Tick(0));
}

#[test]
fn init_leaves_clock_running() {
    let shared = Rc::new(Shared::default());
    let mut timebase = make_timebase(&shared);
    shared.micros.set(42_000);

    timebase.init();

    assert_eq!(timebase.now(), Tick(42));
}

#[test]
fn sleep_waits_requested_duration() {
    let shared = Rc::new(Shared::default());
    let mut timebase = make_timebase(&shared);

    timebase.sleep(25);

    assert_eq!(*shared.sleeps.borrow(), vec![25]);
    assert_eq!(timebase.now(), Tick(25));
}

#[futures_test::test]
async fn sleep_async_waits_requested_duration() {
    let shared = Rc::new(Shared::default());
    let mut timebase = make_timebase(&shared);

    timebase.sleep_async(7).await;

    assert_eq!(*shared.async_sleeps.borrow(), vec![7]);
    assert!(shared.sleeps.borrow().is_empty());
    assert_eq!(timebase.now(), Tick(7));
}

#[test]
fn tick_elapsed_wraps() {
    assert_eq!(Tick(150).elapsed_since(Tick(100)), 50);
    assert_eq!(Tick(2).elapsed_since(Tick(u64::MAX)), 3);
}

#[test]
fn real_clock_is_monotonic_and_keeps_up() {
    let clock = StdClock(Instant::now());
    let mut timebase = Timebase::new(clock, StdDelay);

    let first = timebase.now();
    let started = Instant::now();
    timebase.sleep(20);
    let waited = started.elapsed();
    let second = timebase.now();

    assert!(second >= first);
    assert!(waited >= Duration::from_millis(20));
    // Both ticks truncate, so the tick delta may trail by up to 1 ms.
    assert!(second.elapsed_since(first) + 1 >= waited.as_millis() as u64);
}
