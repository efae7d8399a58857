//! Behavior decoration: composition-time chain validation, caching
//! identity, implementation hiding, and locking under concurrency.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use container::{
    BehaviorKind, ComponentKey, ComponentSpec, Container, ContainerConfig, ContainerError,
    InjectorKind,
};

trait Cache: Send + Sync {
    fn capacity(&self) -> usize;
}

#[derive(Debug)]
struct LruCache {
    capacity: usize,
}

impl Cache for LruCache {
    fn capacity(&self) -> usize {
        self.capacity
    }
}

fn cache_spec() -> ComponentSpec {
    ComponentSpec::of::<LruCache>()
        .default_constructor(|| LruCache { capacity: 128 })
        .provides::<dyn Cache>(|c| c)
        .build()
}

fn test_container() -> Arc<Container> {
    Container::with_config(ContainerConfig::test())
}

#[rstest::rstest]
#[case::duplicate_caching(vec![BehaviorKind::Caching, BehaviorKind::Caching])]
#[case::lock_inside_cache(vec![BehaviorKind::Caching, BehaviorKind::Locking])]
#[case::sync_inside_cache(vec![BehaviorKind::Caching, BehaviorKind::Synchronizing])]
#[case::hiding_not_outermost(vec![BehaviorKind::Locking, BehaviorKind::Hiding, BehaviorKind::Caching])]
fn invalid_chains_are_composition_errors(#[case] chain: Vec<BehaviorKind>) {
    let container = test_container();
    let err = container
        .register_with(
            ComponentKey::of_type::<LruCache>(),
            cache_spec(),
            vec![],
            InjectorKind::Constructor,
            Some(chain),
        )
        .expect_err("chain must be rejected");
    assert!(err.is_composition());
}

#[test]
fn misordered_chain_fails_at_registration_not_first_use() {
    let container = test_container();
    let err = container
        .register_with(
            ComponentKey::of_type::<LruCache>(),
            cache_spec(),
            vec![],
            InjectorKind::Constructor,
            Some(vec![BehaviorKind::Caching, BehaviorKind::Locking]),
        )
        .expect_err("lock inside cache is invalid");
    assert!(matches!(err, ContainerError::InvalidChain { .. }));
    assert!(err.is_composition());

    // nothing was registered
    assert!(container.adapters().is_empty());
}

#[test]
fn duplicate_behavior_fails_at_registration() {
    let container = test_container();
    let err = container
        .register_with(
            ComponentKey::of_type::<LruCache>(),
            cache_spec(),
            vec![],
            InjectorKind::Constructor,
            Some(vec![BehaviorKind::Caching, BehaviorKind::Caching]),
        )
        .expect_err("duplicate behavior");
    assert!(err.to_string().contains("more than once"));
}

#[test]
fn adapter_reports_its_decorators() {
    let container = test_container();
    container
        .register_with(
            ComponentKey::of_type::<LruCache>(),
            cache_spec(),
            vec![],
            InjectorKind::Constructor,
            Some(vec![BehaviorKind::Locking, BehaviorKind::Caching]),
        )
        .expect("registered");

    let adapter = &container.adapters()[0];
    assert!(adapter.has_behavior(BehaviorKind::Locking));
    assert!(adapter.has_behavior(BehaviorKind::Caching));
    assert!(!adapter.has_behavior(BehaviorKind::Hiding));
    assert_eq!(
        adapter.behavior_kinds(),
        &[BehaviorKind::Locking, BehaviorKind::Caching]
    );
}

#[test]
fn caching_returns_the_identical_instance() {
    // development preset keeps metrics collection on
    let container = Container::with_config(ContainerConfig::development());
    container
        .register(ComponentKey::of_type::<LruCache>(), cache_spec(), vec![])
        .expect("registered");

    let first = container.resolve::<LruCache>().expect("first");
    let second = container.resolve::<LruCache>().expect("second");
    assert!(Arc::ptr_eq(&first, &second));

    let stats = container.stats();
    assert_eq!(stats.cache_misses, 1);
    assert_eq!(stats.cache_hits, 1);
}

#[test]
fn hiding_exposes_only_interface_views() {
    let container = test_container();
    container
        .register_with(
            ComponentKey::of_type::<LruCache>(),
            cache_spec(),
            vec![],
            InjectorKind::Constructor,
            Some(vec![BehaviorKind::Hiding, BehaviorKind::Caching]),
        )
        .expect("registered");

    let through_interface = container.resolve::<dyn Cache>().expect("interface works");
    assert_eq!(through_interface.capacity(), 128);

    let err = container
        .resolve::<LruCache>()
        .expect_err("concrete view is hidden");
    assert!(matches!(err, ContainerError::ViewDenied { .. }));
}

struct SlowService {
    constructions: &'static AtomicUsize,
}

static SLOW_CONSTRUCTIONS: AtomicUsize = AtomicUsize::new(0);

fn slow_spec() -> ComponentSpec {
    ComponentSpec::of::<SlowService>()
        .default_constructor(|| {
            thread::sleep(Duration::from_millis(20));
            SLOW_CONSTRUCTIONS.fetch_add(1, Ordering::SeqCst);
            SlowService {
                constructions: &SLOW_CONSTRUCTIONS,
            }
        })
        .build()
}

#[test]
fn locking_serializes_the_first_resolution() {
    let container = test_container();
    container
        .register_with(
            ComponentKey::of_type::<SlowService>(),
            slow_spec(),
            vec![],
            InjectorKind::Constructor,
            Some(vec![BehaviorKind::Locking, BehaviorKind::Caching]),
        )
        .expect("registered");

    let handles: Vec<Arc<SlowService>> = thread::scope(|scope| {
        let workers: Vec<_> = (0..8)
            .map(|_| {
                let container = Arc::clone(&container);
                scope.spawn(move || container.resolve::<SlowService>().expect("resolves"))
            })
            .collect();
        workers
            .into_iter()
            .map(|worker| worker.join().expect("thread joined"))
            .collect()
    });

    // exactly one caller constructed; everyone observes the same instance
    assert_eq!(handles[0].constructions.load(Ordering::SeqCst), 1);
    for handle in &handles[1..] {
        assert!(Arc::ptr_eq(&handles[0], handle));
    }
}

#[test]
fn synchronizing_chain_still_resolves() {
    let container = test_container();
    container
        .register_with(
            ComponentKey::of_type::<LruCache>(),
            cache_spec(),
            vec![],
            InjectorKind::Constructor,
            Some(vec![BehaviorKind::Synchronizing, BehaviorKind::Caching]),
        )
        .expect("registered");

    let first = container.resolve::<dyn Cache>().expect("first");
    let second = container.resolve::<dyn Cache>().expect("second");
    assert!(Arc::ptr_eq(&first, &second));
}
