use super::*;

use crate::clock::{ManualClock, SystemClock};

#[test]
fn idle_timer_reports_zero() {
    let clock = ManualClock::new();
    let timer = LatencyTimer::new();
    assert_eq!(timer.elapsed(clock.now()), Duration::ZERO);
    assert!(!timer.is_armed());
}

#[test]
fn frozen_value_survives_later_reads() {
    let clock = ManualClock::new();
    let mut timer = LatencyTimer::new();
    timer.arm(clock.now());
    clock.advance(Duration::from_millis(2_340));

    let frozen = timer.disarm(clock.now()).expect("armed");
    assert_eq!(frozen, Duration::from_millis(2_340));

    clock.advance(Duration::from_secs(30));
    assert_eq!(timer.elapsed(clock.now()), frozen);
    assert!(timer.disarm(clock.now()).is_none(), "freezes exactly once");
}

#[test]
fn rearming_starts_a_fresh_measurement() {
    let clock = ManualClock::new();
    let mut timer = LatencyTimer::new();
    timer.arm(clock.now());
    clock.advance(Duration::from_secs(5));
    timer.disarm(clock.now());

    clock.advance(Duration::from_secs(60));
    timer.arm(clock.now());
    clock.advance(Duration::from_secs(1));
    assert_eq!(timer.disarm(clock.now()), Some(Duration::from_secs(1)));
}

#[test]
fn elapsed_never_goes_negative() {
    let clock = ManualClock::new();
    let mut timer = LatencyTimer::new();
    let earlier = clock.now();
    clock.advance(Duration::from_secs(1));
    timer.arm(clock.now());
    assert_eq!(timer.elapsed(earlier), Duration::ZERO);
}

#[test]
fn noop_handle_tracks_cancellation() {
    let mut handle = NoopTickScheduler.schedule(Instant::now());
    assert!(handle.is_active());
    handle.cancel();
    handle.cancel();
    assert!(!handle.is_active());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn tokio_ticker_publishes_until_cancelled() {
    let scheduler = TokioTickScheduler::new(
        Handle::current(),
        Duration::from_millis(10),
        Arc::new(SystemClock),
    );
    let mut elapsed_rx = scheduler.subscribe();

    let mut handle = scheduler.schedule(Instant::now());
    tokio::time::sleep(Duration::from_millis(80)).await;
    assert!(elapsed_rx.has_changed().expect("sender alive"));
    let shown = *elapsed_rx.borrow_and_update();
    assert!(shown > 0.0, "ticker should have refreshed the display");

    handle.cancel();
    assert!(!handle.is_active());
    tokio::time::sleep(Duration::from_millis(30)).await;
    let frozen = *elapsed_rx.borrow_and_update();
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(*elapsed_rx.borrow(), frozen, "no ticks after cancel");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn new_schedule_resets_display_to_zero() {
    let clock = ManualClock::new();
    let scheduler = TokioTickScheduler::new(
        Handle::current(),
        Duration::from_secs(3600),
        Arc::new(clock.clone()),
    );
    let elapsed_rx = scheduler.subscribe();

    let started = clock.now();
    clock.advance(Duration::from_secs(4));
    let first = scheduler.schedule(started);
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(*elapsed_rx.borrow(), 4.0);
    drop(first);

    let _second = scheduler.schedule(clock.now());
    assert_eq!(*elapsed_rx.borrow(), 0.0);
}
