use tracing_test::traced_test;

use super::stats;
use crate::{errno, Bus, BusConfig, BusError, ErrorKind};

#[tokio::test]
#[traced_test]
async fn round_trip_keeps_order() {
    let bus = Bus::new();
    let ch = bus.open(8).unwrap();
    for v in 1..=5 {
        bus.send(ch, v).await.unwrap();
    }
    for v in 1..=5 {
        assert_eq!(bus.recv(ch).await, Ok(v));
    }
    assert_eq!(bus.try_recv(ch), Err(BusError::WouldBlock));
}

#[tokio::test]
#[traced_test]
async fn capacity_two_scenario() {
    let bus = Bus::new();
    let ch = bus.open(2).unwrap();
    bus.send(ch, 10).await.unwrap();
    bus.send(ch, 20).await.unwrap();
    assert_eq!(bus.try_send(ch, 30), Err(BusError::WouldBlock));
    assert_eq!(bus.recv(ch).await, Ok(10));
    bus.try_send(ch, 30).unwrap();
    assert_eq!(bus.try_recv(ch), Ok(20));
    assert_eq!(bus.try_recv(ch), Ok(30));
    assert_eq!(bus.try_recv(ch), Err(BusError::WouldBlock));
}

#[tokio::test]
#[traced_test]
async fn try_send_on_full_channel_changes_nothing() {
    let bus = Bus::new();
    let ch = bus.open(3).unwrap();
    for v in 0..3 {
        bus.try_send(ch, v).unwrap();
    }
    assert_eq!(bus.try_send(ch, 99), Err(BusError::WouldBlock));
    assert_eq!(stats(&bus, ch).pending, 3);
    assert_eq!(bus.try_recv_many(ch, 10), Ok(vec![0, 1, 2]));
}

#[tokio::test]
#[traced_test]
async fn try_recv_on_empty_channel_changes_nothing() {
    let bus = Bus::new();
    let ch = bus.open(3).unwrap();
    assert_eq!(bus.try_recv(ch), Err(BusError::WouldBlock));
    let s = stats(&bus, ch);
    assert_eq!(s.pending, 0);
    assert_eq!(s.capacity, 3);
}

#[tokio::test]
#[traced_test]
async fn closed_slots_are_reused_but_old_handles_stay_dead() {
    let bus = Bus::new();
    let a = bus.open(1).unwrap();
    let b = bus.open(1).unwrap();
    let c = bus.open(1).unwrap();
    assert_eq!((a.index(), b.index(), c.index()), (0, 1, 2));

    bus.close(b).unwrap();
    assert_eq!(bus.channel_count(), 2);
    let d = bus.open(4).unwrap();
    assert_eq!(d.index(), b.index());
    assert_ne!(d, b);

    assert_eq!(bus.try_send(b, 1), Err(BusError::NoChannel));
    assert_eq!(bus.try_recv(b), Err(BusError::NoChannel));
    assert_eq!(bus.close(b), Err(BusError::NoChannel));
    assert_eq!(bus.stats(b), Err(BusError::NoChannel));
    bus.try_send(d, 1).unwrap();
    assert_eq!(stats(&bus, d).capacity, 4);

    // the next new slot comes after the reused one
    let e = bus.open(1).unwrap();
    assert_eq!(e.index(), 3);
}

#[tokio::test]
#[traced_test]
async fn operations_on_closed_channel_fail() {
    let bus = Bus::new();
    let ch = bus.open(2).unwrap();
    bus.try_send(ch, 5).unwrap();
    bus.close(ch).unwrap();
    assert_eq!(bus.send(ch, 1).await, Err(BusError::NoChannel));
    assert_eq!(bus.recv(ch).await, Err(BusError::NoChannel));
    assert_eq!(bus.send_many(ch, &[1, 2]).await, Err(BusError::NoChannel));
    assert_eq!(bus.recv_many(ch, 2).await, Err(BusError::NoChannel));
}

#[tokio::test]
#[traced_test]
async fn channel_limit_reports_allocation_failure() {
    let bus = Bus::with_config(BusConfig {
        max_channels: Some(2),
    });
    assert_eq!(bus.config().max_channels, Some(2));
    assert_eq!(Bus::new().config(), &BusConfig::default());
    let a = bus.open(1).unwrap();
    bus.open(1).unwrap();
    assert_eq!(bus.open(1), Err(BusError::Allocation));
    bus.close(a).unwrap();
    bus.open(1).expect("closing a channel should free up room under the limit");
}

#[tokio::test]
#[traced_test]
async fn last_error_follows_each_call() {
    errno::scope(async {
        let bus = Bus::new();
        assert_eq!(errno::last_error(), ErrorKind::None);
        let ch = bus.open(1).unwrap();
        assert!(bus.try_recv(ch).is_err());
        assert_eq!(errno::last_error(), ErrorKind::WouldBlock);
        bus.try_send(ch, 1).unwrap();
        assert_eq!(errno::last_error(), ErrorKind::None);
        bus.close(ch).unwrap();
        assert!(bus.try_send(ch, 1).is_err());
        assert_eq!(errno::last_error(), ErrorKind::NoChannel);
    })
    .await;
}

#[tokio::test]
#[traced_test]
async fn last_error_is_per_task() {
    let bus = Bus::new();
    let ch = bus.open(1).unwrap();
    errno::scope(async {
        assert!(bus.try_recv(ch).is_err());
        let other = {
            let bus = bus.clone();
            tokio::spawn(errno::scope(async move {
                bus.try_send(ch, 1).unwrap();
                errno::last_error()
            }))
        };
        assert_eq!(other.await.unwrap(), ErrorKind::None);
        assert_eq!(errno::last_error(), ErrorKind::WouldBlock);
    })
    .await;
    // outside of any scope the error is still tracked, per thread
    assert!(bus.try_send(ch, 2).is_err());
    assert_eq!(errno::last_error(), ErrorKind::WouldBlock);
    assert!(bus.try_recv(ch).is_ok());
    assert_eq!(errno::last_error(), ErrorKind::None);
}

#[test]
fn last_error_without_a_runtime() {
    let bus = Bus::new();
    assert_eq!(bus.open(1).map(|h| h.index()), Ok(0));
    assert_eq!(errno::last_error(), ErrorKind::None);
    let ch = bus.open(1).unwrap();
    bus.close(ch).unwrap();
    assert_eq!(bus.close(ch), Err(BusError::NoChannel));
    assert_eq!(errno::last_error(), ErrorKind::NoChannel);
}

#[tokio::test]
#[traced_test]
async fn shutdown_closes_everything() {
    let bus = Bus::new();
    let chans = (0..4).map(|_| bus.open(2).unwrap()).collect::<Vec<_>>();
    assert_eq!(bus.channel_count(), 4);
    assert_eq!(bus.shutdown(), 4);
    assert_eq!(bus.channel_count(), 0);
    for ch in chans {
        assert_eq!(bus.try_send(ch, 0), Err(BusError::NoChannel));
    }
}
