//! ControlLoop lifecycle on a paused tokio clock.

use std::time::Duration;

use gatelink::app::commands::OperatorCommand;
use gatelink::control_loop::ControlLoop;
use gatelink::gate::TargetState;

use crate::mocks::Harness;

const T0: f64 = 1_700_000_000.0;

#[tokio::test(start_paused = true)]
async fn loop_closes_expired_gate() {
    let h = Harness::at(T0);
    h.service.request(OperatorCommand::OpenTemporary).unwrap();

    let control = ControlLoop::start(h.service.clone(), Duration::from_secs(1));
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(h.storage.persisted().target_state, TargetState::OpenTemporary);

    h.clock.set(T0 + 10.0);
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(h.storage.persisted().target_state, TargetState::Closed);

    control.stop().await;
}

#[tokio::test(start_paused = true)]
async fn loop_keeps_ticking_through_store_failures() {
    let h = Harness::at(T0);
    h.service.request(OperatorCommand::OpenTemporary).unwrap();
    h.storage.fail_writes(true);
    h.clock.set(T0 + 10.0);

    let control = ControlLoop::start(h.service.clone(), Duration::from_secs(1));
    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert_eq!(h.storage.persisted().target_state, TargetState::OpenTemporary);

    h.storage.fail_writes(false);
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(h.storage.persisted().target_state, TargetState::Closed);

    control.stop().await;
}

#[tokio::test(start_paused = true)]
async fn stopped_loop_no_longer_ticks() {
    let h = Harness::at(T0);
    h.service.request(OperatorCommand::OpenTemporary).unwrap();

    let control = ControlLoop::start(h.service.clone(), Duration::from_secs(1));
    control.stop().await;

    h.clock.set(T0 + 60.0);
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(h.storage.persisted().target_state, TargetState::OpenTemporary);
}
