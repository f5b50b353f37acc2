//! Fault manager: publication and list invariants

mod common;

use common::{prio, run_ticks, Probe};
use ecu_app::fault::{FAULT_LIST_LEN, FAULT_MSG_MAX_LEN};
use ecu_app::signals::FAULT_GENERATED;
use ecu_app::{EcuPools, EcuQf, FaultId, FaultManager, FaultType, MediumEvt};
use proptest::prelude::*;
use qp_qf::{QPayload, SizeClass};

#[test]
fn test_generate_publishes_record() {
    let qf = EcuQf::new(EcuPools::new());
    let faults = FaultManager::new(&qf);
    let mut probe = Probe::new(&qf, prio(1), &[FAULT_GENERATED]);
    qf.start(&mut probe, 8).unwrap();
    run_ticks(&qf, &mut [&mut probe], 7);

    faults.generate_fault("test", FaultId::PressureI2c, "bus stuck");
    run_ticks(&qf, &mut [&mut probe], 0);

    match &probe.machine().log[..] {
        [(_, QPayload::Medium(MediumEvt::Fault(r)))] => {
            assert_eq!(r.id, FaultId::PressureI2c);
            assert_eq!(r.code, 201);
            assert_eq!(r.fault_type, FaultType::Communication);
            assert_eq!(r.msg.as_str(), "bus stuck");
            assert_eq!(r.raised_at.raw(), 7);
            assert_eq!(r.count, 1);
        }
        other => panic!("unexpected events {:?}", other),
    }
    assert!(qf.pool_stats(SizeClass::Medium).is_idle());
}

#[test]
fn test_repeat_updates_in_place() {
    let qf = EcuQf::new(EcuPools::new());
    let faults = FaultManager::new(&qf);

    faults.generate_fault("test", FaultId::DisplayI2c, "first");
    faults.generate_fault("test", FaultId::PressureNoData, "stale");
    qf.tick();
    faults.generate_fault("test", FaultId::DisplayI2c, "second");

    let list = faults.active_fault_list();
    assert_eq!(list[0].id, FaultId::DisplayI2c);
    assert_eq!(list[0].count, 2);
    assert_eq!(list[0].msg.as_str(), "second");
    assert_eq!(list[1].id, FaultId::PressureNoData);
    assert!(list[2].is_none());
    assert_eq!(faults.latest().map(|r| r.id), Some(FaultId::DisplayI2c));
    assert_eq!(faults.description(FaultId::PressureNoData), FaultId::PressureNoData.description());
}

#[test]
fn test_none_is_ignored_and_clear_compacts() {
    let qf = EcuQf::new(EcuPools::new());
    let faults = FaultManager::new(&qf);

    faults.generate_fault("test", FaultId::None, "nothing");
    assert_eq!(faults.active_count(), 0);

    for id in FaultId::ALL {
        faults.generate_fault("test", id, "x");
    }
    assert_eq!(faults.active_count(), FaultId::ALL.len());
    assert!(faults.clear(FaultId::PressureStartup));
    assert!(!faults.clear(FaultId::PressureStartup));

    let ids: Vec<_> = faults.active_fault_list().iter().map(|r| r.id).collect();
    assert_eq!(
        ids,
        vec![
            FaultId::DisplayStartup,
            FaultId::DisplayI2c,
            FaultId::PressureI2c,
            FaultId::PressureNoData,
            FaultId::None,
            FaultId::None,
        ]
    );

    faults.clear_all();
    assert!(faults.active_fault_list()[0].is_none());
}

#[test]
fn test_long_message_is_truncated() {
    let qf = EcuQf::new(EcuPools::new());
    let faults = FaultManager::new(&qf);
    let long = "x".repeat(100);

    faults.generate_fault("test", FaultId::DisplayStartup, &long);

    assert_eq!(faults.active_fault_list()[0].msg.len(), FAULT_MSG_MAX_LEN);
}

#[derive(Debug, Clone)]
enum Op {
    Raise(usize),
    Clear(usize),
    ClearAll,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0..FaultId::ALL.len()).prop_map(Op::Raise),
        2 => (0..FaultId::ALL.len()).prop_map(Op::Clear),
        1 => Just(Op::ClearAll),
    ]
}

proptest! {
    #[test]
    fn prop_list_matches_model(ops in prop::collection::vec(op(), 0..40)) {
        let qf = EcuQf::new(EcuPools::new());
        let faults = FaultManager::new(&qf);
        let mut model: Vec<(FaultId, u16)> = Vec::new();

        for op in ops {
            match op {
                Op::Raise(i) => {
                    let id = FaultId::ALL[i];
                    faults.generate_fault("prop", id, "p");
                    match model.iter_mut().find(|(m, _)| *m == id) {
                        Some((_, n)) => *n += 1,
                        None => model.push((id, 1)),
                    }
                }
                Op::Clear(i) => {
                    let id = FaultId::ALL[i];
                    let was = model.iter().any(|(m, _)| *m == id);
                    prop_assert_eq!(faults.clear(id), was);
                    model.retain(|(m, _)| *m != id);
                }
                Op::ClearAll => {
                    faults.clear_all();
                    model.clear();
                }
            }

            let list = faults.active_fault_list();
            prop_assert_eq!(list.len(), FAULT_LIST_LEN);
            let active: Vec<_> = list.iter().take_while(|r| !r.is_none()).map(|r| (r.id, r.count)).collect();
            prop_assert_eq!(&active, &model);
            prop_assert!(list[active.len()..].iter().all(|r| r.is_none()));
        }
        prop_assert!(qf.pool_stats(SizeClass::Medium).is_idle());
    }
}

