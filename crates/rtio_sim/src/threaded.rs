//! # Threaded Runtime
//!
//! Runs each clock domain on its own OS thread, paced by its own interval.
//! The halves of a crossing share nothing but their wires, which makes this a
//! real concurrent test of the single-writer/single-reader discipline.
//!
//! ```text
//!   main ──stop──▶ [rtio thread]  ──wire──▶ [sys thread]
//!                   tick, sleep               tick, sleep
//! ```
//!
//! Pacing and shutdown both go through `crossbeam-channel`: a thread waits
//! out its interval in `recv_timeout` and exits when the sender is dropped.
//!
//! A wire here is one atomic word, so nothing is ever sampled half-written;
//! every edge uses [`Settle::Ideal`].

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use rtio_core::{width_mask, BlindTransfer, Edge, GrayCodeTransfer, Settle};

use crate::config::SimulationConfig;
use crate::error::{SimError, SimResult};
use crate::trace::{verify_value_transfer, Trace, ValueReport};

/// Source ticks allowed for the handshake to drain after the stop signal.
const DRAIN_TICKS: u64 = 10_000;

/// Outcome of [`run_threaded_gray`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ThreadedGrayReport {
    /// Property check of the observed values. Staleness is wall-clock and
    /// not bounded.
    pub transfer: ValueReport,
    /// Source thread edges.
    pub source_ticks: u64,
    /// Destination thread edges.
    pub destination_ticks: u64,
}

/// Outcome of [`run_threaded_handshake`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ThreadedHandshakeReport {
    /// Source edges with the request input high.
    pub requested: u64,
    /// Requests forwarded to the destination.
    pub admitted: u64,
    /// Requests dropped while an event was in flight.
    pub dropped: u64,
    /// Pulses emitted in the destination domain.
    pub delivered: u64,
    /// Most events in flight seen by the source thread.
    pub max_in_flight: u64,
    /// Whether the source was idle again when it exited.
    pub drained: bool,
}

impl ThreadedHandshakeReport {
    /// One event in flight at most and every admitted event delivered.
    #[must_use]
    pub fn is_sound(&self) -> bool {
        self.drained && self.max_in_flight <= 1 && self.admitted == self.delivered
    }
}

/// Counter in one thread, Gray-code decoder in another.
///
/// # Errors
///
/// Fails on an invalid config, if a thread cannot be spawned, or if one
/// panics.
pub fn run_threaded_gray(config: &SimulationConfig) -> SimResult<ThreadedGrayReport> {
    config.validate()?;
    let pacing = &config.threaded;
    let (mut encoder, mut decoder) =
        GrayCodeTransfer::with_stages(config.width, config.stages)?.split();
    let trace = Arc::new(Trace::new());
    let start = Instant::now();
    let (stop_tx, stop_rx) = bounded::<()>(0);
    let mask = width_mask(config.width);

    let source = {
        let trace = Arc::clone(&trace);
        let stop = stop_rx.clone();
        let interval = Duration::from_micros(pacing.source_tick_us);
        spawn_domain(&config.source.name, move || {
            let mut cycle = 0;
            loop {
                let value = cycle & mask;
                trace.produce(elapsed_nanos(start), value);
                encoder.tick(value, &mut Edge::new(cycle, Settle::Ideal, None));
                cycle += 1;
                if !wait(&stop, interval) {
                    return cycle;
                }
            }
        })?
    };

    let destination = {
        let trace = Arc::clone(&trace);
        let stop = stop_rx;
        let interval = Duration::from_micros(pacing.destination_tick_us);
        spawn_domain(&config.destination.name, move || {
            let mut cycle = 0;
            loop {
                let value = decoder.tick(&mut Edge::new(cycle, Settle::Ideal, None));
                trace.observe(elapsed_nanos(start), value);
                cycle += 1;
                if !wait(&stop, interval) {
                    return cycle;
                }
            }
        })?
    };

    thread::sleep(Duration::from_millis(pacing.duration_ms));
    drop(stop_tx);

    let source_ticks = join_domain(source, &config.source.name)?;
    let destination_ticks = join_domain(destination, &config.destination.name)?;

    let transfer = verify_value_transfer(&trace.produced(), &trace.observed(), 0);
    if transfer.is_clean() {
        tracing::info!(
            source_ticks,
            destination_ticks,
            observed = transfer.observed,
            "threaded gray transfer clean"
        );
    } else {
        tracing::warn!(
            invalid = transfer.invalid,
            regressions = transfer.regressions,
            "threaded gray transfer violated its guarantees"
        );
    }

    Ok(ThreadedGrayReport {
        transfer,
        source_ticks,
        destination_ticks,
    })
}

/// Blind transfer with the source and sink on separate threads.
///
/// The source requests every `request_every` ticks until stopped, then keeps
/// ticking without requests until its last event is acknowledged. The sink
/// runs until the source thread has exited.
///
/// # Errors
///
/// Fails on an invalid config, if a thread cannot be spawned, or if one
/// panics.
pub fn run_threaded_handshake(config: &SimulationConfig) -> SimResult<ThreadedHandshakeReport> {
    config.validate()?;
    let pacing = &config.threaded;
    let request_every = pacing.request_every;
    let transfer = BlindTransfer::with_stages(config.stages)?;
    let stats = transfer.stats();
    let (mut source, mut sink) = transfer.split();
    let (stop_tx, stop_rx) = bounded::<()>(0);
    let (source_done_tx, source_done_rx) = bounded::<()>(0);

    let source_thread = {
        let stats = Arc::clone(&stats);
        let interval = Duration::from_micros(pacing.source_tick_us);
        spawn_domain(&config.source.name, move || {
            let _done: Sender<()> = source_done_tx;
            let mut cycle = 0;
            let mut max_in_flight = 0;
            let mut stopped_at = None;
            loop {
                let request = stopped_at.is_none() && cycle % request_every == 0;
                source.tick(request, &mut Edge::new(cycle, Settle::Ideal, None));
                max_in_flight = max_in_flight.max(stats.in_flight());
                cycle += 1;

                match stopped_at {
                    None => {
                        if !wait(&stop_rx, interval) {
                            stopped_at = Some(cycle);
                        }
                    }
                    Some(at) => {
                        if source.is_ready() || cycle - at > DRAIN_TICKS {
                            return (max_in_flight, source.is_ready());
                        }
                        thread::sleep(interval);
                    }
                }
            }
        })?
    };

    let sink_thread = {
        let interval = Duration::from_micros(pacing.destination_tick_us);
        spawn_domain(&config.destination.name, move || {
            let mut cycle = 0;
            loop {
                sink.tick(&mut Edge::new(cycle, Settle::Ideal, None));
                cycle += 1;
                if !wait(&source_done_rx, interval) {
                    return cycle;
                }
            }
        })?
    };

    thread::sleep(Duration::from_millis(pacing.duration_ms));
    drop(stop_tx);

    let (max_in_flight, drained) = join_domain(source_thread, &config.source.name)?;
    join_domain(sink_thread, &config.destination.name)?;

    let report = ThreadedHandshakeReport {
        requested: stats.requested.get(),
        admitted: stats.admitted.get(),
        dropped: stats.dropped.get(),
        delivered: stats.delivered.get(),
        max_in_flight,
        drained,
    };
    if report.is_sound() {
        tracing::info!(
            admitted = report.admitted,
            dropped = report.dropped,
            "threaded handshake sound"
        );
    } else {
        tracing::warn!(?report, "threaded handshake broke its guarantees");
    }
    Ok(report)
}

fn spawn_domain<T, F>(name: &str, body: F) -> SimResult<JoinHandle<T>>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    tracing::debug!(domain = name, "spawning domain thread");
    thread::Builder::new()
        .name(format!("domain-{name}"))
        .spawn(body)
        .map_err(SimError::Spawn)
}

fn join_domain<T>(handle: JoinHandle<T>, name: &str) -> SimResult<T> {
    handle
        .join()
        .map_err(|_| SimError::ThreadPanicked(name.to_owned()))
}

/// Waits one interval. Returns `false` once the stop sender is gone.
fn wait(stop: &Receiver<()>, interval: Duration) -> bool {
    matches!(stop.recv_timeout(interval), Err(RecvTimeoutError::Timeout))
}

fn elapsed_nanos(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_nanos()).unwrap_or(u64::MAX)
}
