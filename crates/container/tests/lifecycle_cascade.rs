//! Start/stop/dispose ordering, idempotent dispose, aggregate teardown
//! failures, and the structural-mutation guard.

use std::sync::Arc;

use common::test_utils::CallRecorder;
use container::{
    ComponentKey, ComponentSpec, Container, ContainerConfig, ContainerError, ContainerState,
    Lifecycle, Slot,
};

struct Worker {
    name: &'static str,
    recorder: CallRecorder,
}

impl Lifecycle for Worker {
    fn start(&self) -> Result<(), ContainerError> {
        self.recorder.record(format!("{}:start", self.name));
        Ok(())
    }

    fn stop(&self) -> Result<(), ContainerError> {
        self.recorder.record(format!("{}:stop", self.name));
        Ok(())
    }

    fn dispose(&self) -> Result<(), ContainerError> {
        self.recorder.record(format!("{}:dispose", self.name));
        Ok(())
    }
}

fn worker_spec(name: &'static str, recorder: &CallRecorder) -> ComponentSpec {
    let recorder = recorder.clone();
    ComponentSpec::of::<Worker>()
        .default_constructor(move || Worker {
            name,
            recorder: recorder.clone(),
        })
        .lifecycle()
        .build()
}

fn test_container() -> Arc<Container> {
    Container::with_config(ContainerConfig::test())
}

#[test]
fn independent_components_start_in_registration_order_and_stop_reversed() {
    let recorder = CallRecorder::new();
    let container = test_container();
    container
        .register("alpha", worker_spec("alpha", &recorder), vec![])
        .expect("alpha");
    container
        .register("beta", worker_spec("beta", &recorder), vec![])
        .expect("beta");

    container.start().expect("start");
    assert_eq!(recorder.calls(), vec!["alpha:start", "beta:start"]);

    container.stop().expect("stop");
    assert_eq!(
        recorder.calls(),
        vec!["alpha:start", "beta:start", "beta:stop", "alpha:stop"]
    );

    container.dispose().expect("dispose");
    assert_eq!(
        recorder.calls(),
        vec![
            "alpha:start",
            "beta:start",
            "beta:stop",
            "alpha:stop",
            "beta:dispose",
            "alpha:dispose",
        ]
    );
}

struct Dependent {
    name: &'static str,
    recorder: CallRecorder,
    _upstream: Arc<Worker>,
}

impl Lifecycle for Dependent {
    fn start(&self) -> Result<(), ContainerError> {
        self.recorder.record(format!("{}:start", self.name));
        Ok(())
    }

    fn stop(&self) -> Result<(), ContainerError> {
        self.recorder.record(format!("{}:stop", self.name));
        Ok(())
    }
}

#[test]
fn a_dependency_starts_before_its_dependent_regardless_of_registration_order() {
    let recorder = CallRecorder::new();
    let container = test_container();

    // the dependent is registered first
    let dep_recorder = recorder.clone();
    container
        .register(
            ComponentKey::of_type::<Dependent>(),
            ComponentSpec::of::<Dependent>()
                .constructor(vec![Slot::one::<Worker>()], move |args| {
                    Ok(Dependent {
                        name: "consumer",
                        recorder: dep_recorder.clone(),
                        _upstream: args.arc::<Worker>(0)?,
                    })
                })
                .lifecycle()
                .build(),
            vec![],
        )
        .expect("dependent");
    container
        .register(
            ComponentKey::of_type::<Worker>(),
            worker_spec("upstream", &recorder),
            vec![],
        )
        .expect("worker");

    container.start().expect("start");
    assert_eq!(recorder.calls(), vec!["upstream:start", "consumer:start"]);

    container.stop().expect("stop");
    assert_eq!(
        recorder.calls(),
        vec![
            "upstream:start",
            "consumer:start",
            "consumer:stop",
            "upstream:stop",
        ]
    );
}

#[test]
fn children_start_after_the_parent_and_tear_down_first() {
    let recorder = CallRecorder::new();
    let parent = test_container();
    parent
        .register("parent-svc", worker_spec("parent-svc", &recorder), vec![])
        .expect("parent component");

    let child = parent.make_child().expect("child");
    child
        .register("child-svc", worker_spec("child-svc", &recorder), vec![])
        .expect("child component");

    parent.start().expect("start cascade");
    assert_eq!(recorder.calls(), vec!["parent-svc:start", "child-svc:start"]);
    assert_eq!(child.state(), ContainerState::Started);

    parent.stop().expect("stop cascade");
    assert_eq!(
        recorder.calls(),
        vec![
            "parent-svc:start",
            "child-svc:start",
            "child-svc:stop",
            "parent-svc:stop",
        ]
    );
    assert_eq!(child.state(), ContainerState::Stopped);
}

#[test]
fn dispose_is_terminal_and_idempotent() {
    let recorder = CallRecorder::new();
    let container = test_container();
    container
        .register("svc", worker_spec("svc", &recorder), vec![])
        .expect("svc");

    container.start().expect("start");
    // dispose from started runs the stop cascade first
    container.dispose().expect("dispose");
    assert_eq!(
        recorder.calls(),
        vec!["svc:start", "svc:stop", "svc:dispose"]
    );

    // second dispose must not throw and must not re-run component disposal
    container.dispose().expect("second dispose is a no-op");
    assert_eq!(recorder.len(), 3);
    assert_eq!(container.state(), ContainerState::Disposed);

    // and the state machine is terminal
    let err = container.start().expect_err("no restart after dispose");
    assert_eq!(err.category(), "lifecycle");
}

#[test]
fn invalid_transitions_are_rejected() {
    let container = test_container();
    let err = container.stop().expect_err("stop before start");
    assert!(matches!(err, ContainerError::LifecycleViolation { .. }));

    container.start().expect("start");
    let err = container.start().expect_err("double start");
    assert_eq!(err.category(), "lifecycle");

    // stopped containers may be started again
    container.stop().expect("stop");
    container.start().expect("restart");
    container.stop().expect("stop again");
}

#[test]
fn structural_mutation_is_frozen_once_started() {
    let recorder = CallRecorder::new();
    let container = test_container();
    container
        .register("svc", worker_spec("svc", &recorder), vec![])
        .expect("svc");
    container.start().expect("start");

    let err = container
        .register("late", worker_spec("late", &recorder), vec![])
        .expect_err("register after start");
    assert_eq!(err.category(), "lifecycle");

    let err = container
        .unregister(&ComponentKey::named("svc"))
        .expect_err("unregister after start");
    assert_eq!(err.category(), "lifecycle");
}

struct FaultyWorker {
    recorder: CallRecorder,
}

impl Lifecycle for FaultyWorker {
    fn dispose(&self) -> Result<(), ContainerError> {
        self.recorder.record("faulty:dispose-attempt");
        Err(ContainerError::instantiation("FaultyWorker", "dispose blew up"))
    }
}

#[test]
fn dispose_failures_are_collected_not_short_circuited() {
    let recorder = CallRecorder::new();
    let container = test_container();

    let faulty_recorder = recorder.clone();
    container
        .register(
            "faulty",
            ComponentSpec::of::<FaultyWorker>()
                .default_constructor(move || FaultyWorker {
                    recorder: faulty_recorder.clone(),
                })
                .lifecycle()
                .build(),
            vec![],
        )
        .expect("faulty");
    container
        .register("healthy", worker_spec("healthy", &recorder), vec![])
        .expect("healthy");

    container.start().expect("start");
    let err = container.dispose().expect_err("aggregate failure");
    match err {
        ContainerError::Aggregate { operation, failures } => {
            assert_eq!(operation, "dispose");
            assert_eq!(failures.len(), 1);
            assert!(failures[0].to_string().contains("dispose blew up"));
        }
        other => panic!("expected aggregate, got {other}"),
    }

    // the healthy component was still disposed after the faulty one failed
    let calls = recorder.calls();
    assert!(calls.contains(&"faulty:dispose-attempt".to_string()));
    assert!(calls.contains(&"healthy:dispose".to_string()));
    assert_eq!(container.state(), ContainerState::Disposed);
}

struct StubbornWorker;

impl Lifecycle for StubbornWorker {
    fn start(&self) -> Result<(), ContainerError> {
        Err(ContainerError::instantiation("StubbornWorker", "refused to start"))
    }
}

#[test]
fn start_failures_propagate_immediately() {
    let container = test_container();
    container
        .register(
            "stubborn",
            ComponentSpec::of::<StubbornWorker>()
                .default_constructor(|| StubbornWorker)
                .lifecycle()
                .build(),
            vec![],
        )
        .expect("stubborn");

    let err = container.start().expect_err("start fails");
    assert!(err.to_string().contains("refused to start"));
}
