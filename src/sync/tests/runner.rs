use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::sync::{SyncRunner, SyncState, SyncTransport, TimingReply, shared_sync_clock};
use crate::testing::{ChannelTransport, ManualClock, SimulatedRelayTransport};
use crate::types::SyncConfig;

fn small_config() -> SyncConfig {
    SyncConfig::default().with_target_samples(5).with_window_size(5)
}

#[tokio::test]
async fn test_run_converges_to_relay_skew() {
    let clock = ManualClock::starting_at(1_000_000.0);
    let transport = SimulatedRelayTransport::new(Arc::clone(&clock), 5.0, 120.0);
    let config = small_config();
    let estimate = shared_sync_clock(config.clone());

    let mut runner = SyncRunner::new(
        transport,
        clock.clone() as Arc<dyn crate::clock::WallClock>,
        Arc::clone(&estimate),
        &config,
    );
    let offset = runner.run().await;

    assert!((offset - 120.0).abs() < 1e-6);
    let engine = estimate.read().await;
    assert!(engine.is_converged());
    assert_eq!(engine.sample_count(), 5);
    assert!((engine.last_rtt_ms().unwrap() - 10.0).abs() < 1e-6);
}

#[tokio::test]
async fn test_run_fails_open_when_disconnected() {
    let clock = ManualClock::starting_at(1_000_000.0);
    let transport = SimulatedRelayTransport::new(Arc::clone(&clock), 5.0, 120.0).disconnected();
    let config = small_config();
    let estimate = shared_sync_clock(config.clone());

    let mut runner = SyncRunner::new(
        transport,
        clock.clone() as Arc<dyn crate::clock::WallClock>,
        Arc::clone(&estimate),
        &config,
    );
    let offset = runner.run().await;

    // Resolves immediately with zero; no run was started.
    assert_eq!(offset, 0.0);
    assert_eq!(estimate.read().await.state(), SyncState::Idle);
}

#[tokio::test]
async fn test_run_resolves_with_last_mean_when_transport_drops() {
    let clock = ManualClock::starting_at(1_000_000.0);
    let transport =
        SimulatedRelayTransport::new(Arc::clone(&clock), 5.0, 80.0).closing_after(2);
    let config = small_config();
    let estimate = shared_sync_clock(config.clone());

    let mut runner = SyncRunner::new(
        transport,
        clock.clone() as Arc<dyn crate::clock::WallClock>,
        Arc::clone(&estimate),
        &config,
    );
    let offset = runner.run().await;

    // Two good samples before the drop; degrade to their mean, not zero.
    assert!((offset - 80.0).abs() < 1e-6);
    assert_eq!(estimate.read().await.sample_count(), 2);
}

#[tokio::test]
async fn test_runner_publishes_each_sample_through_channel_transport() {
    let clock = ManualClock::starting_at(0.0);
    let config = small_config();
    let estimate = shared_sync_clock(config.clone());

    let (transport, mut requests, replies) = ChannelTransport::pair();

    // Harness relay: echo each T0 with fixed relay-side timestamps that
    // encode a 30ms offset and no processing time.
    tokio::spawn(async move {
        while let Some(t0) = requests.recv().await {
            let t1 = t0 + 30.0;
            let reply = TimingReply { t0, t1, t2: t1 };
            if replies.send(reply).await.is_err() {
                break;
            }
        }
    });

    let mut runner = SyncRunner::new(
        transport,
        clock as Arc<dyn crate::clock::WallClock>,
        Arc::clone(&estimate),
        &config,
    );
    let offset = runner.run().await;

    assert!((offset - 30.0).abs() < 1e-6);
    assert_eq!(estimate.read().await.sample_count(), 5);
}

#[tokio::test]
async fn test_reply_left_over_from_an_earlier_run_is_discarded() {
    let clock = ManualClock::starting_at(50_000.0);
    let config = small_config();
    let estimate = shared_sync_clock(config.clone());
    let (transport, mut requests, replies) = ChannelTransport::pair();

    // A reply from a run that ended on a timeout 10 seconds ago is still
    // sitting in the queue when the new run starts.
    replies
        .send(TimingReply {
            t0: 40_000.0,
            t1: 40_030.0,
            t2: 40_030.0,
        })
        .await
        .unwrap();

    let echo = replies.clone();
    tokio::spawn(async move {
        while let Some(t0) = requests.recv().await {
            let t1 = t0 + 30.0;
            if echo.send(TimingReply { t0, t1, t2: t1 }).await.is_err() {
                break;
            }
        }
    });

    let mut runner = SyncRunner::new(
        transport,
        clock as Arc<dyn crate::clock::WallClock>,
        Arc::clone(&estimate),
        &config,
    );
    let offset = runner.run().await;

    // Pairing the stale reply's timestamps with a fresh T3 would have
    // pulled the mean thousands of milliseconds negative.
    assert!((offset - 30.0).abs() < 1e-6, "offset {offset}");
    assert_eq!(estimate.read().await.sample_count(), 5);
}

/// A transport whose replies never arrive.
struct SilentTransport;

#[async_trait]
impl SyncTransport for SilentTransport {
    fn is_connected(&self) -> bool {
        true
    }

    async fn send_request(&mut self, _t0: f64) -> Result<()> {
        Ok(())
    }

    async fn recv_reply(&mut self) -> Option<TimingReply> {
        std::future::pending().await
    }
}

#[tokio::test(start_paused = true)]
async fn test_run_times_out_instead_of_hanging() {
    let clock = ManualClock::starting_at(1_000_000.0);
    let config = small_config();
    let estimate = shared_sync_clock(config.clone());

    let mut runner = SyncRunner::new(
        SilentTransport,
        clock as Arc<dyn crate::clock::WallClock>,
        Arc::clone(&estimate),
        &config,
    );
    let offset = runner.run().await;

    assert_eq!(offset, 0.0);
    assert_eq!(estimate.read().await.sample_count(), 0);
}

#[tokio::test]
async fn test_new_run_discards_previous_accounting() {
    let clock = ManualClock::starting_at(1_000_000.0);
    let config = small_config();
    let estimate = shared_sync_clock(config.clone());

    let transport = SimulatedRelayTransport::new(Arc::clone(&clock), 5.0, 200.0);
    let mut runner = SyncRunner::new(
        transport,
        clock.clone() as Arc<dyn crate::clock::WallClock>,
        Arc::clone(&estimate),
        &config,
    );
    let first = runner.run().await;
    assert!((first - 200.0).abs() < 1e-6);

    // Second run against a relay with different skew: old samples are gone.
    let transport = SimulatedRelayTransport::new(Arc::clone(&clock), 5.0, -40.0);
    let mut runner = SyncRunner::new(
        transport,
        clock.clone() as Arc<dyn crate::clock::WallClock>,
        Arc::clone(&estimate),
        &config,
    );
    let second = runner.run().await;

    assert!((second + 40.0).abs() < 1e-6);
    assert_eq!(estimate.read().await.sample_count(), 5);
}
