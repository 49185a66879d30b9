//! Structural invariants: coupling construction and removal semantics.

use std::sync::Arc;
use std::time::Duration;

use pardevs::coupling::CouplingError;
use pardevs::model::{Atomic, ReportsState, StateField};
use pardevs::ports::{Message, PortId};
use pardevs::simulation::{ModelId, Simulation, StructureError};
use pardevs::time::TimeAdvance;

use crate::common::RecordingScheduler;

/// A minimal passive model.
struct Idle;

impl ReportsState for Idle {
    fn state_fields(&self) -> Vec<StateField> {
        Vec::new()
    }
}

impl Atomic for Idle {
    fn time_advance(&self) -> TimeAdvance {
        TimeAdvance::INFINITY
    }

    fn delta_internal(&mut self) {}

    fn delta_external(&mut self, _elapsed: Duration, _port: &str, _value: &dyn Message) {}
}

/// A passive model with a finite time advance, so that mounting schedules an
/// internal event.
struct Armed;

impl ReportsState for Armed {
    fn state_fields(&self) -> Vec<StateField> {
        Vec::new()
    }
}

impl Atomic for Armed {
    fn time_advance(&self) -> TimeAdvance {
        TimeAdvance::new(Duration::from_secs(1))
    }

    fn delta_internal(&mut self) {}

    fn delta_external(&mut self, _elapsed: Duration, _port: &str, _value: &dyn Message) {}
}

struct Bench {
    simu: Simulation,
    top: ModelId,
    a: ModelId,
    a_in: PortId,
    a_out: PortId,
    b: ModelId,
    b_in: PortId,
    b_out: PortId,
}

/// top { a, b } with one input and one output port each, plus top.in and
/// top.out.
fn bench() -> (Bench, PortId, PortId) {
    let mut simu = Simulation::new(Arc::new(RecordingScheduler::new()));
    let top = simu.add_coupled("top", None).unwrap();
    let top_in = simu.add_input_port::<u64>(top, "in").unwrap();
    let top_out = simu.add_output_port::<u64>(top, "out").unwrap();

    let a = simu.add_atomic(Idle, "a", Some(top)).unwrap();
    let a_in = simu.add_input_port::<u64>(a, "in").unwrap();
    let a_out = simu.add_output_port::<u64>(a, "out").unwrap();
    let b = simu.add_atomic(Idle, "b", Some(top)).unwrap();
    let b_in = simu.add_input_port::<u64>(b, "in").unwrap();
    let b_out = simu.add_output_port::<u64>(b, "out").unwrap();

    (
        Bench {
            simu,
            top,
            a,
            a_in,
            a_out,
            b,
            b_in,
            b_out,
        },
        top_in,
        top_out,
    )
}

#[test]
fn self_coupling_is_rejected_for_every_kind() {
    let (mut bench, top_in, top_out) = bench();
    let simu = &mut bench.simu;

    assert_eq!(
        simu.add_internal_coupling(bench.a_out, bench.a_in),
        Err(CouplingError::SelfCoupling)
    );
    assert_eq!(
        simu.add_external_input_coupling(top_in, top_in),
        Err(CouplingError::SelfCoupling)
    );
    assert_eq!(
        simu.add_external_output_coupling(top_out, top_out),
        Err(CouplingError::SelfCoupling)
    );

    // The coupling sets are left unchanged.
    assert!(simu.internal_couplings(bench.top).unwrap().is_empty());
    assert!(simu.external_input_couplings(bench.top).unwrap().is_empty());
    assert!(simu.external_output_couplings(bench.top).unwrap().is_empty());
}

#[test]
fn coupling_endpoints_are_validated() {
    let (mut bench, top_in, top_out) = bench();
    let simu = &mut bench.simu;

    // Direction: an internal coupling goes from an output to an input.
    assert_eq!(
        simu.add_internal_coupling(bench.a_in, bench.b_in),
        Err(CouplingError::DirectionMismatch)
    );

    // Payload types must match.
    let a_wide = simu.add_output_port::<u32>(bench.a, "wide").unwrap();
    assert_eq!(
        simu.add_internal_coupling(a_wide, bench.b_in),
        Err(CouplingError::TypeMismatch)
    );

    // Internal couplings only wire children of the same coupled model.
    let other = simu.add_coupled("other", None).unwrap();
    let c = simu.add_atomic(Idle, "c", Some(other)).unwrap();
    let c_in = simu.add_input_port::<u64>(c, "in").unwrap();
    assert_eq!(
        simu.add_internal_coupling(bench.a_out, c_in),
        Err(CouplingError::NotSiblings)
    );

    // External couplings only wire a coupled model to its own children.
    assert_eq!(
        simu.add_external_input_coupling(top_in, c_in),
        Err(CouplingError::NotParentChild)
    );
    assert_eq!(
        simu.add_external_output_coupling(bench.a_out, top_in),
        Err(CouplingError::DirectionMismatch)
    );

    assert!(simu.internal_couplings(bench.top).unwrap().is_empty());
    let _ = top_out;
}

#[test]
fn removing_a_model_purges_every_coupling_set() {
    let (mut bench, top_in, top_out) = bench();
    let simu = &mut bench.simu;

    simu.add_internal_coupling(bench.a_out, bench.b_in).unwrap();
    simu.add_internal_coupling(bench.b_out, bench.a_in).unwrap();
    simu.add_external_input_coupling(top_in, bench.a_in).unwrap();
    simu.add_external_input_coupling(top_in, bench.b_in).unwrap();
    simu.add_external_output_coupling(bench.a_out, top_out)
        .unwrap();

    simu.remove_model(bench.a).unwrap();

    // `a` is gone from the children and no coupling references one of its
    // ports, in any of the three sets.
    assert_eq!(simu.children(bench.top).unwrap(), vec![bench.b]);
    for coupling in simu
        .internal_couplings(bench.top)
        .unwrap()
        .into_iter()
        .chain(simu.external_input_couplings(bench.top).unwrap())
        .chain(simu.external_output_couplings(bench.top).unwrap())
    {
        assert_ne!(coupling.from_port(), bench.a_in);
        assert_ne!(coupling.from_port(), bench.a_out);
        assert_ne!(coupling.to_port(), bench.a_in);
        assert_ne!(coupling.to_port(), bench.a_out);
    }

    // Couplings between surviving models are preserved.
    assert_eq!(simu.external_input_couplings(bench.top).unwrap().len(), 1);
    assert!(simu.internal_couplings(bench.top).unwrap().is_empty());
    assert!(simu.external_output_couplings(bench.top).unwrap().is_empty());
}

#[test]
fn removing_a_model_cancels_its_pending_event() {
    let scheduler = Arc::new(RecordingScheduler::new());
    let mut simu = Simulation::new(scheduler.clone());

    let model = simu.add_atomic(Armed, "armed", None).unwrap();
    let scheduled = scheduler.scheduled_for(model);
    assert_eq!(scheduled.len(), 1);

    simu.remove_model(model).unwrap();
    assert!(scheduler.was_cancelled(scheduled[0].1));
    assert_eq!(
        simu.remove_model(model),
        Err(StructureError::ModelNotFound)
    );
}

#[test]
fn removing_a_coupled_model_removes_its_subtree() {
    let mut simu = Simulation::new(Arc::new(RecordingScheduler::new()));

    let top = simu.add_coupled("top", None).unwrap();
    let mid = simu.add_coupled("mid", Some(top)).unwrap();
    let leaf = simu.add_atomic(Idle, "leaf", Some(mid)).unwrap();
    let leaf_out = simu.add_output_port::<u64>(leaf, "out").unwrap();
    let mid_out = simu.add_output_port::<u64>(mid, "out").unwrap();
    simu.add_external_output_coupling(leaf_out, mid_out).unwrap();

    simu.remove_model(mid).unwrap();

    assert!(simu.children(top).unwrap().is_empty());
    assert_eq!(simu.name(mid), Err(StructureError::ModelNotFound));
    assert_eq!(simu.name(leaf), Err(StructureError::ModelNotFound));
    assert!(matches!(
        simu.port(leaf_out),
        Err(StructureError::PortNotFound)
    ));
}

#[test]
fn removing_a_port_purges_only_couplings_that_reference_it() {
    let (mut bench, top_in, _top_out) = bench();
    let simu = &mut bench.simu;

    simu.add_internal_coupling(bench.a_out, bench.b_in).unwrap();
    simu.add_internal_coupling(bench.b_out, bench.a_in).unwrap();
    simu.add_external_input_coupling(top_in, bench.b_in).unwrap();

    simu.remove_input_port(bench.b, "in").unwrap();

    let internal = simu.internal_couplings(bench.top).unwrap();
    assert_eq!(internal.len(), 1);
    assert_eq!(internal[0].to_port(), bench.a_in);
    assert!(simu.external_input_couplings(bench.top).unwrap().is_empty());

    // The port is gone from the model.
    assert_eq!(
        simu.find_port(bench.b, "in"),
        Err(StructureError::PortNotFound)
    );
    // Removing it again fails.
    assert_eq!(
        simu.remove_input_port(bench.b, "in"),
        Err(StructureError::PortNotFound)
    );
}

#[test]
fn removing_a_coupled_models_own_port_purges_its_external_couplings() {
    let (mut bench, top_in, top_out) = bench();
    let simu = &mut bench.simu;

    simu.add_external_input_coupling(top_in, bench.a_in).unwrap();
    simu.add_external_output_coupling(bench.a_out, top_out)
        .unwrap();

    simu.remove_input_port(bench.top, "in").unwrap();
    assert!(simu.external_input_couplings(bench.top).unwrap().is_empty());
    assert_eq!(simu.external_output_couplings(bench.top).unwrap().len(), 1);

    simu.remove_output_port(bench.top, "out").unwrap();
    assert!(simu.external_output_couplings(bench.top).unwrap().is_empty());
}

#[test]
fn full_names_are_dot_joined_and_unique() {
    let mut simu = Simulation::new(Arc::new(RecordingScheduler::new()));

    let top = simu.add_coupled("top", None).unwrap();
    let mid = simu.add_coupled("mid", Some(top)).unwrap();
    let leaf = simu.add_atomic(Idle, "leaf", Some(mid)).unwrap();

    assert_eq!(simu.full_name(leaf).unwrap(), "top.mid.leaf");
    assert_eq!(simu.name(leaf).unwrap(), "leaf");
    assert_eq!(simu.parent(leaf).unwrap(), Some(mid));
    assert_eq!(simu.parent(top).unwrap(), None);

    assert_eq!(
        simu.add_coupled("mid", Some(top)),
        Err(StructureError::DuplicateModelName)
    );
    assert_eq!(
        simu.add_coupled("top", None),
        Err(StructureError::DuplicateModelName)
    );
    assert_eq!(
        simu.add_coupled("bad.name", Some(top)),
        Err(StructureError::InvalidName)
    );
}

#[test]
fn models_can_only_be_mounted_under_coupled_models() {
    let mut simu = Simulation::new(Arc::new(RecordingScheduler::new()));

    let solo = simu.add_atomic(Idle, "solo", None).unwrap();
    assert_eq!(
        simu.add_atomic(Idle, "child", Some(solo)),
        Err(StructureError::NotACoupledModel)
    );
    assert_eq!(
        simu.children(solo),
        Err(StructureError::NotACoupledModel)
    );
}

#[test]
fn duplicate_port_names_are_rejected() {
    let mut simu = Simulation::new(Arc::new(RecordingScheduler::new()));

    let solo = simu.add_atomic(Idle, "solo", None).unwrap();
    simu.add_input_port::<u64>(solo, "in").unwrap();
    assert_eq!(
        simu.add_input_port::<u64>(solo, "in"),
        Err(StructureError::DuplicatePortName)
    );
    // The namespace is shared between input and output ports.
    assert_eq!(
        simu.add_output_port::<u64>(solo, "in"),
        Err(StructureError::DuplicatePortName)
    );
}
