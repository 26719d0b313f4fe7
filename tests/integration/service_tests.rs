//! GateService: operator actions, Command API and control ticks against a
//! mock store and a manual clock.

use std::sync::Arc;
use std::thread;

use gatelink::app::commands::OperatorCommand;
use gatelink::app::events::GateEvent;
use gatelink::gate::{Actor, ActuationCommand, GateMachine, TargetState};

use crate::mocks::Harness;

const T0: f64 = 1_700_000_000.0;

// ── Auto-reversion ────────────────────────────────────────────

#[test]
fn open_temporary_reverts_after_window() {
    let h = Harness::at(T0);
    h.service.request(OperatorCommand::OpenTemporary).unwrap();

    h.clock.set(T0 + 5.0);
    assert_eq!(h.service.control_tick().unwrap(), None);
    assert_eq!(h.service.take_command("gate-pi").unwrap(), ActuationCommand::Open);

    h.clock.set(T0 + 10.0);
    let t = h.service.control_tick().unwrap().expect("window elapsed");
    assert_eq!(t.from, TargetState::OpenTemporary);
    assert_eq!(t.to, TargetState::Closed);
    assert_eq!(t.actor, Actor::Timeout);

    let r = h.storage.persisted();
    assert_eq!(r.target_state, TargetState::Closed);
    let history: Vec<_> = r.command_history.iter().map(|e| (e.target_state, e.actor)).collect();
    assert_eq!(
        history,
        vec![
            (TargetState::OpenTemporary, Actor::Operator),
            (TargetState::Closed, Actor::Timeout)
        ]
    );
    assert!(h.sink.events().contains(&GateEvent::AutoClosed {
        opened_at: T0,
        closed_at: T0 + 10.0
    }));
    assert_eq!(h.service.take_command("gate-pi").unwrap(), ActuationCommand::Closed);
}

#[test]
fn open_permanent_supersedes_pending_reversion() {
    let h = Harness::at(T0);
    h.service.request(OperatorCommand::OpenTemporary).unwrap();
    h.clock.set(T0 + 3.0);
    h.service.request(OperatorCommand::OpenPermanent).unwrap();

    h.clock.set(T0 + 3600.0);
    assert_eq!(h.service.control_tick().unwrap(), None);
    assert_eq!(h.storage.persisted().target_state, TargetState::OpenPermanent);
}

#[test]
fn repeated_ticks_after_expiry_close_once() {
    let h = Harness::at(T0);
    h.service.request(OperatorCommand::OpenTemporary).unwrap();
    h.clock.set(T0 + 12.0);
    assert!(h.service.control_tick().unwrap().is_some());
    let writes = h.storage.writes();

    h.clock.set(T0 + 13.0);
    assert_eq!(h.service.control_tick().unwrap(), None);
    assert_eq!(h.storage.persisted().command_history.len(), 2);
    assert_eq!(h.storage.writes(), writes);
}

#[test]
fn reopening_restarts_the_window() {
    let h = Harness::at(T0);
    h.service.request(OperatorCommand::OpenTemporary).unwrap();
    h.clock.set(T0 + 8.0);
    h.service.request(OperatorCommand::OpenTemporary).unwrap();

    h.clock.set(T0 + 12.0);
    assert_eq!(h.service.control_tick().unwrap(), None);
    h.clock.set(T0 + 18.0);
    assert!(h.service.control_tick().unwrap().is_some());
}

// ── Command API ───────────────────────────────────────────────

#[test]
fn poll_records_contact_without_changing_target() {
    let h = Harness::at(5.0);
    assert_eq!(h.service.take_command("gate-pi").unwrap(), ActuationCommand::Closed);

    let r = h.storage.persisted();
    assert_eq!(r.last_contact_with_gate, 5.0);
    assert_eq!(r.target_state, TargetState::Closed);
    assert!(r.command_history.is_empty());
    assert_eq!(
        h.sink.events(),
        vec![GateEvent::ContactRecorded {
            host: "gate-pi".into(),
            command: ActuationCommand::Closed
        }]
    );
}

#[test]
fn poll_keeps_refreshing_liveness() {
    let h = Harness::at(T0);
    h.service.request(OperatorCommand::OpenPermanent).unwrap();
    for i in 1..=3 {
        h.clock.set(T0 + f64::from(i));
        assert_eq!(h.service.take_command("gate-pi").unwrap(), ActuationCommand::Open);
        assert_eq!(h.storage.persisted().last_contact_with_gate, T0 + f64::from(i));
    }
}

// ── Persistence ───────────────────────────────────────────────

#[test]
fn state_survives_restart() {
    let h = Harness::at(T0);
    h.service.request(OperatorCommand::OpenTemporary).unwrap();
    h.service.take_command("gate-pi").unwrap();

    let restarted = h.restart();
    assert_eq!(restarted.snapshot().unwrap(), h.service.snapshot().unwrap());

    // The pending reversion is honoured by the new process.
    h.clock.set(T0 + 10.0);
    assert!(restarted.control_tick().unwrap().is_some());
}

#[test]
fn failed_write_aborts_request_and_reports() {
    let h = Harness::at(T0);
    h.storage.fail_writes(true);

    let err = h.service.request(OperatorCommand::OpenPermanent).unwrap_err();
    assert_eq!(err.category(), "persistence");

    let events = h.sink.events();
    assert_eq!(events.len(), 1);
    assert!(matches!(
        events[0],
        GateEvent::PersistFailed { operation: "open_permanent", .. }
    ));
    assert_eq!(h.storage.raw(), None);
}

#[test]
fn failed_tick_self_heals_on_next_tick() {
    let h = Harness::at(T0);
    h.service.request(OperatorCommand::OpenTemporary).unwrap();

    h.clock.set(T0 + 10.0);
    h.storage.fail_writes(true);
    assert!(h.service.control_tick().is_err());
    assert_eq!(h.storage.persisted().target_state, TargetState::OpenTemporary);

    h.storage.fail_writes(false);
    h.clock.set(T0 + 11.0);
    let t = h.service.control_tick().unwrap().expect("retried");
    assert_eq!(t.at, T0 + 11.0);
    assert_eq!(h.storage.persisted().target_state, TargetState::Closed);
}

#[test]
fn failed_read_aborts_poll() {
    let h = Harness::at(T0);
    h.storage.fail_reads(true);
    assert_eq!(h.service.take_command("gate-pi").unwrap_err().category(), "persistence");
    h.storage.fail_reads(false);
    assert!(h.service.take_command("gate-pi").is_ok());
}

#[test]
fn corrupt_store_serves_closed() {
    let h = Harness::at(T0);
    h.storage.put_raw(b"\x00\x01 definitely not json");
    assert_eq!(h.service.take_command("gate-pi").unwrap(), ActuationCommand::Closed);
    assert_eq!(h.storage.persisted().last_contact_with_gate, T0);
}

#[test]
fn history_respects_configured_bound() {
    let h = Harness::new(GateMachine::new(10.0, 3), T0);
    let commands = [
        OperatorCommand::OpenTemporary,
        OperatorCommand::Close,
        OperatorCommand::OpenPermanent,
        OperatorCommand::Close,
        OperatorCommand::OpenTemporary,
    ];
    for (i, c) in commands.into_iter().enumerate() {
        h.clock.set(T0 + i as f64);
        h.service.request(c).unwrap();
    }
    let stamps: Vec<f64> = h
        .storage
        .persisted()
        .command_history
        .iter()
        .map(|e| e.timestamp)
        .collect();
    assert_eq!(stamps, vec![T0 + 2.0, T0 + 3.0, T0 + 4.0]);
}

#[test]
fn stored_history_longer_than_bound_is_cut_on_load() {
    let h = Harness::new(GateMachine::new(10.0, 3), T0);
    h.storage.put_raw(
        br#"{"target_state":"closed","open_temporary_start":0,"last_contact_with_gate":0,
            "command_history":[
              {"timestamp":1,"target_state":"open_permanent"},
              {"timestamp":2,"target_state":"closed"},
              {"timestamp":3,"target_state":"open_temporary"},
              {"timestamp":4,"target_state":"closed","actor":"timeout"},
              {"timestamp":5,"target_state":"open_permanent"}]}"#,
    );

    let status = h.service.status().unwrap();
    let shown: Vec<f64> = status.history.iter().map(|e| e.timestamp).collect();
    assert_eq!(shown, vec![5.0, 4.0, 3.0]);

    h.service.take_command("gate-pi").unwrap();
    let stamps: Vec<f64> = h
        .storage
        .persisted()
        .command_history
        .iter()
        .map(|e| e.timestamp)
        .collect();
    assert_eq!(stamps, vec![3.0, 4.0, 5.0]);
}

// ── Concurrency ───────────────────────────────────────────────

#[test]
fn concurrent_callers_never_lose_updates() {
    const THREADS: usize = 8;
    const PER_THREAD: usize = 10;

    let h = Harness::at(T0);
    let workers: Vec<_> = (0..THREADS)
        .map(|n| {
            let service = Arc::clone(&h.service);
            thread::spawn(move || {
                for i in 0..PER_THREAD {
                    let command = if (n + i) % 2 == 0 {
                        OperatorCommand::OpenPermanent
                    } else {
                        OperatorCommand::Close
                    };
                    service.request(command).unwrap();
                    service.take_command(&format!("agent-{n}")).unwrap();
                    service.control_tick().unwrap();
                }
            })
        })
        .collect();
    for w in workers {
        w.join().unwrap();
    }

    let r = h.storage.persisted();
    assert_eq!(r.command_history.len(), THREADS * PER_THREAD);
    assert_eq!(r.last_contact_with_gate, T0);
    assert_eq!(h.service.snapshot().unwrap(), r);
    let last = r.command_history.last().unwrap();
    assert_eq!(last.target_state, r.target_state);
}
