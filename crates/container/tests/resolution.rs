//! Resolution rules: hierarchy visibility, ambiguity, self-reference
//! exclusion, caching identity, collections, and the monitor fallback.

use std::sync::Arc;

use container::{
    ComponentKey, ComponentSpec, Container, ContainerConfig, ContainerError, Instance, Monitor,
    Parameter, Slot,
};

trait Engine: Send + Sync {
    fn power(&self) -> u32;
}

struct DieselEngine;

impl Engine for DieselEngine {
    fn power(&self) -> u32 {
        150
    }
}

struct ElectricEngine;

impl Engine for ElectricEngine {
    fn power(&self) -> u32 {
        300
    }
}

struct Truck {
    engine: Arc<dyn Engine>,
}

impl std::fmt::Debug for Truck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Truck").finish_non_exhaustive()
    }
}

struct Horn;

fn diesel_spec() -> ComponentSpec {
    ComponentSpec::of::<DieselEngine>()
        .default_constructor(|| DieselEngine)
        .provides::<dyn Engine>(|e| e)
        .build()
}

fn electric_spec() -> ComponentSpec {
    ComponentSpec::of::<ElectricEngine>()
        .default_constructor(|| ElectricEngine)
        .provides::<dyn Engine>(|e| e)
        .build()
}

fn truck_spec() -> ComponentSpec {
    ComponentSpec::of::<Truck>()
        .constructor(vec![Slot::one::<dyn Engine>()], |args| {
            Ok(Truck {
                engine: args.arc::<dyn Engine>(0)?,
            })
        })
        .build()
}

fn test_container() -> Arc<Container> {
    Container::with_config(ContainerConfig::test())
}

#[test]
fn truck_gets_the_single_engine_and_shares_the_cached_instance() {
    let container = test_container();
    container
        .register(ComponentKey::of_type::<DieselEngine>(), diesel_spec(), vec![])
        .expect("engine registered");
    container
        .register(ComponentKey::of_type::<Horn>(), horn_spec(), vec![])
        .expect("unrelated component registered");
    container
        .register(ComponentKey::of_type::<Truck>(), truck_spec(), vec![])
        .expect("truck registered");

    let truck = container.resolve::<Truck>().expect("truck resolves");
    assert_eq!(truck.engine.power(), 150);

    // caching is in the default chain: the truck's engine is the same
    // instance a direct lookup returns
    let engine = container.resolve::<dyn Engine>().expect("engine resolves");
    assert!(Arc::ptr_eq(&truck.engine, &engine));
}

fn horn_spec() -> ComponentSpec {
    ComponentSpec::of::<Horn>().default_constructor(|| Horn).build()
}

#[test]
fn two_candidates_fail_with_ordered_candidate_list() {
    let container = test_container();
    container
        .register(ComponentKey::of_type::<DieselEngine>(), diesel_spec(), vec![])
        .expect("diesel registered");
    container
        .register(
            ComponentKey::of_type::<ElectricEngine>(),
            electric_spec(),
            vec![],
        )
        .expect("electric registered");
    container
        .register(ComponentKey::of_type::<Truck>(), truck_spec(), vec![])
        .expect("truck registered");

    let err = container.resolve::<Truck>().expect_err("ambiguous engine");
    match err {
        ContainerError::AmbiguousResolution { candidates, .. } => {
            assert_eq!(candidates.len(), 2);
            assert!(candidates[0].contains("DieselEngine"));
            assert!(candidates[1].contains("ElectricEngine"));
        }
        other => panic!("expected ambiguity, got {other}"),
    }
}

/// Decorates an engine and also provides the engine view itself; it must
/// never be satisfied by its own registration.
struct EchoEngine {
    inner: Arc<dyn Engine>,
}

impl std::fmt::Debug for EchoEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EchoEngine").finish_non_exhaustive()
    }
}

impl Engine for EchoEngine {
    fn power(&self) -> u32 {
        self.inner.power()
    }
}

fn echo_spec() -> ComponentSpec {
    ComponentSpec::of::<EchoEngine>()
        .constructor(vec![Slot::one::<dyn Engine>()], |args| {
            Ok(EchoEngine {
                inner: args.arc::<dyn Engine>(0)?,
            })
        })
        .provides::<dyn Engine>(|e| e)
        .build()
}

#[test]
fn a_component_never_resolves_itself() {
    let container = test_container();
    container
        .register(ComponentKey::of_type::<EchoEngine>(), echo_spec(), vec![])
        .expect("echo registered");

    // the only literal match for `dyn Engine` is the requester itself
    let err = container
        .resolve::<EchoEngine>()
        .expect_err("self-dependency must be skipped");
    assert_eq!(err.category(), "unsatisfiable");
}

#[test]
fn self_exclusion_still_finds_a_parent_candidate() {
    let parent = test_container();
    parent
        .register(ComponentKey::of_type::<DieselEngine>(), diesel_spec(), vec![])
        .expect("parent engine");

    let child = parent.make_child().expect("child");
    child
        .register(ComponentKey::of_type::<EchoEngine>(), echo_spec(), vec![])
        .expect("echo in child");

    let echo = child.resolve::<EchoEngine>().expect("echo resolves upward");
    assert_eq!(echo.power(), 150);
}

#[derive(Debug)]
struct Billing;

#[derive(Debug)]
struct Frontend {
    billing: Arc<Billing>,
}

#[test]
fn parent_never_sees_child_registrations() {
    let parent = test_container();
    parent
        .register(ComponentKey::of_type::<Horn>(), horn_spec(), vec![])
        .expect("unrelated component in parent");

    let child = parent.make_child().expect("child");
    child
        .register(
            ComponentKey::of_type::<Billing>(),
            ComponentSpec::of::<Billing>()
                .default_constructor(|| Billing)
                .build(),
            vec![],
        )
        .expect("billing in child");
    child
        .register(
            ComponentKey::of_type::<Frontend>(),
            ComponentSpec::of::<Frontend>()
                .constructor(vec![Slot::one::<Billing>()], |args| {
                    Ok(Frontend {
                        billing: args.arc::<Billing>(0)?,
                    })
                })
                .build(),
            vec![],
        )
        .expect("frontend in child");

    // child resolves its own graph
    let frontend = child.resolve::<Frontend>().expect("child resolves");
    let billing = child.resolve::<Billing>().expect("billing resolves");
    assert!(Arc::ptr_eq(&frontend.billing, &billing));

    // upward visibility is forbidden: the parent must fail, not find the
    // child's registrations
    let err = parent
        .resolve::<Frontend>()
        .expect_err("parent must not see the child");
    assert_eq!(err.category(), "unsatisfiable");
    assert!(parent
        .resolve_key::<Billing>(ComponentKey::of_type::<Billing>())
        .is_err());
}

#[test]
fn uncached_registrations_may_return_distinct_instances() {
    let container = test_container();
    container
        .register_with(
            ComponentKey::of_type::<DieselEngine>(),
            diesel_spec(),
            vec![],
            container::InjectorKind::Constructor,
            Some(vec![]), // no behaviors at all
        )
        .expect("registered without caching");

    let first = container.resolve::<DieselEngine>().expect("first");
    let second = container.resolve::<DieselEngine>().expect("second");
    assert!(!Arc::ptr_eq(&first, &second));
}

struct Fleet {
    engines: Vec<Arc<dyn Engine>>,
}

impl std::fmt::Debug for Fleet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fleet").finish_non_exhaustive()
    }
}

fn fleet_spec() -> ComponentSpec {
    ComponentSpec::of::<Fleet>()
        .constructor(vec![Slot::many::<dyn Engine>()], |args| {
            Ok(Fleet {
                engines: args.list::<dyn Engine>(0)?,
            })
        })
        .build()
}

#[test]
fn collections_gather_all_candidates_in_registration_order() {
    let container = test_container();
    container
        .register(ComponentKey::of_type::<DieselEngine>(), diesel_spec(), vec![])
        .expect("diesel");
    container
        .register(
            ComponentKey::of_type::<ElectricEngine>(),
            electric_spec(),
            vec![],
        )
        .expect("electric");
    container
        .register(ComponentKey::of_type::<Fleet>(), fleet_spec(), vec![])
        .expect("fleet");

    let fleet = container.resolve::<Fleet>().expect("fleet resolves");
    let powers: Vec<u32> = fleet.engines.iter().map(|e| e.power()).collect();
    assert_eq!(powers, vec![150, 300]);
}

#[test]
fn empty_collection_needs_the_explicit_flag() {
    let strict = test_container();
    strict
        .register(ComponentKey::of_type::<Fleet>(), fleet_spec(), vec![])
        .expect("fleet");
    let err = strict.resolve::<Fleet>().expect_err("must find at least one");
    assert_eq!(err.category(), "unsatisfiable");

    let relaxed = test_container();
    relaxed
        .register(
            ComponentKey::of_type::<Fleet>(),
            fleet_spec(),
            vec![Parameter::all_empty_ok()],
        )
        .expect("fleet");
    let fleet = relaxed.resolve::<Fleet>().expect("empty fleet is fine");
    assert!(fleet.engines.is_empty());
}

#[test]
fn non_empty_collection_delegates_to_the_parent() {
    let parent = test_container();
    parent
        .register(ComponentKey::of_type::<DieselEngine>(), diesel_spec(), vec![])
        .expect("diesel in parent");
    parent
        .register(
            ComponentKey::of_type::<ElectricEngine>(),
            electric_spec(),
            vec![],
        )
        .expect("electric in parent");

    let child = parent.make_child().expect("child");
    child
        .register(ComponentKey::of_type::<Fleet>(), fleet_spec(), vec![])
        .expect("fleet in child");

    let fleet = child.resolve::<Fleet>().expect("parent candidates used");
    assert_eq!(fleet.engines.len(), 2);

    // local-only collection queries stay local
    assert!(child.resolve_all::<dyn Engine>().expect("local query").is_empty());
}

struct DefaultsMonitor;

impl Monitor for DefaultsMonitor {
    fn no_component_found(&self, key: &ComponentKey) -> Option<Instance> {
        if *key == ComponentKey::named("retries") {
            Some(container::pack(Arc::new(7_u32)))
        } else {
            None
        }
    }
}

struct Client {
    retries: u32,
}

#[test]
fn monitor_fallback_is_scoped_to_the_missing_key() {
    let container = test_container();
    container.swap_monitor(Arc::new(DefaultsMonitor));
    container
        .register(
            ComponentKey::of_type::<Client>(),
            ComponentSpec::of::<Client>()
                .constructor(vec![Slot::one::<u32>()], |args| {
                    Ok(Client {
                        retries: *args.arc::<u32>(0)?,
                    })
                })
                .build(),
            vec![Parameter::component_key("retries")],
        )
        .expect("client registered");

    // explicit-key miss goes through the fallback hook
    let client = container.resolve::<Client>().expect("fallback supplies value");
    assert_eq!(client.retries, 7);
    assert_eq!(*container.resolve_key::<u32>("retries").expect("direct"), 7);

    // the hook does not mask unrelated misses
    let err = container
        .resolve_key::<u32>("timeout")
        .expect_err("unrelated key still fails");
    assert!(matches!(err, ContainerError::NoSuchComponent { .. }));
}

#[test]
fn swapping_the_parent_monitor_does_not_propagate_to_children() {
    let parent = test_container();
    let child = parent.make_child().expect("child");

    parent.swap_monitor(Arc::new(DefaultsMonitor));

    // the child kept its creation-time snapshot
    assert!(parent.resolve_key::<u32>("retries").is_ok());
    assert!(child.resolve_key::<u32>("retries").is_err());
}
