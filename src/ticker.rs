//! Periodic scheduler: a 5ms `tokio::time::interval` loop that advances the
//! packet counter and, every third tick, signals the controller to emit an
//! unsolicited input report. Grounded in the teacher's own periodic-task
//! pattern (`input/target/dualsense.rs::run`, `steam_deck_uhid.rs`) rather
//! than a signal-driven timer, per the sanctioned timer substitution.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

/// Default tick period: 5ms, 200Hz.
pub const TICK_PERIOD: Duration = Duration::from_millis(5);
/// Emit an input report every third tick: ~15ms, ~66.7Hz.
pub const EMIT_EVERY: u32 = 3;

/// Whether tick number `tick_count` (1-based, counting from the first tick
/// after start) is an emit tick.
fn is_emit_tick(tick_count: u32, emit_every: u32) -> bool {
    tick_count % emit_every == 0
}

/// Spawn the ticker task. On every fire, if `stop_counter` is clear the
/// shared counter is incremented (wrapping modulo 256 via `AtomicU8`'s
/// wrapping `fetch_add`); every `emit_every`th fire, if `stop_input` is
/// clear, the current counter value is sent on `emit_tx` for the controller
/// to turn into a framed report. The returned handle is aborted by
/// `Controller::close` -- there is no internal stop flag for the task
/// itself, matching spec's "stop ticker" step of the close sequence.
pub fn spawn(
    period: Duration,
    emit_every: u32,
    counter: Arc<AtomicU8>,
    stop_counter: Arc<AtomicBool>,
    stop_input: Arc<AtomicBool>,
    emit_tx: UnboundedSender<u8>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        let mut tick_count: u32 = 0;
        loop {
            interval.tick().await;

            if !stop_counter.load(Ordering::SeqCst) {
                counter.fetch_add(1, Ordering::SeqCst);
            }

            tick_count = tick_count.wrapping_add(1);
            if is_emit_tick(tick_count, emit_every) && !stop_input.load(Ordering::SeqCst) {
                let value = counter.load(Ordering::SeqCst);
                if emit_tx.send(value).is_err() {
                    // Controller side dropped: nothing left to emit into.
                    return;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emit_cadence_fires_every_third_tick() {
        let fires: Vec<u32> = (1..=9).filter(|&t| is_emit_tick(t, EMIT_EVERY)).collect();
        assert_eq!(fires, vec![3, 6, 9]);
    }

    #[test]
    fn counter_wraps_modulo_256() {
        let counter = AtomicU8::new(254);
        counter.fetch_add(1, Ordering::SeqCst);
        assert_eq!(counter.load(Ordering::SeqCst), 255);
        counter.fetch_add(1, Ordering::SeqCst);
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        counter.fetch_add(1, Ordering::SeqCst);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn ticker_increments_counter_and_emits_on_schedule() {
        let counter = Arc::new(AtomicU8::new(0));
        let stop_counter = Arc::new(AtomicBool::new(false));
        let stop_input = Arc::new(AtomicBool::new(false));
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        let handle = spawn(
            Duration::from_millis(5),
            EMIT_EVERY,
            counter.clone(),
            stop_counter,
            stop_input,
            tx,
        );

        tokio::time::advance(Duration::from_millis(16)).await;
        let emitted = rx.recv().await.unwrap();
        assert_eq!(emitted, 3);
        assert!(counter.load(Ordering::SeqCst) >= 3);

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn stop_counter_freezes_the_counter() {
        let counter = Arc::new(AtomicU8::new(0));
        let stop_counter = Arc::new(AtomicBool::new(true));
        let stop_input = Arc::new(AtomicBool::new(false));
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();

        let handle = spawn(
            Duration::from_millis(5),
            EMIT_EVERY,
            counter.clone(),
            stop_counter,
            stop_input,
            tx,
        );

        tokio::time::advance(Duration::from_millis(50)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn stop_input_suppresses_emits_without_stopping_counter() {
        let counter = Arc::new(AtomicU8::new(0));
        let stop_counter = Arc::new(AtomicBool::new(false));
        let stop_input = Arc::new(AtomicBool::new(true));
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        let handle = spawn(
            Duration::from_millis(5),
            EMIT_EVERY,
            counter.clone(),
            stop_counter,
            stop_input,
            tx,
        );

        tokio::time::advance(Duration::from_millis(50)).await;
        assert!(rx.try_recv().is_err());
        assert!(counter.load(Ordering::SeqCst) > 0);

        handle.abort();
    }
}
