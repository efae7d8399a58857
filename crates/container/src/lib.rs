//! Dependency-injection container engine.
//!
//! Components are registered under typed or named keys with an explicit
//! [`spec::ComponentSpec`] describing their constructors, injectable members
//! and provided views. Resolution walks the container hierarchy local-first
//! with self-reference exclusion and ambiguity detection, behaviors
//! (caching, locking, synchronizing, implementation hiding) compose around
//! the injection strategy with order validated at registration time, and the
//! start/stop/dispose cascade is derived from the instantiation order of the
//! same dependency graph.
//!
//! ```
//! use container::{Container, ComponentKey, ComponentSpec, ContainerConfig, Slot};
//!
//! struct Config { url: String }
//! struct Repo { config: std::sync::Arc<Config> }
//!
//! let container = Container::with_config(ContainerConfig::test());
//! container.register(
//!     ComponentKey::of_type::<Config>(),
//!     ComponentSpec::of::<Config>()
//!         .default_constructor(|| Config { url: "localhost".into() })
//!         .build(),
//!     vec![],
//! ).unwrap();
//! container.register(
//!     ComponentKey::of_type::<Repo>(),
//!     ComponentSpec::of::<Repo>()
//!         .constructor(vec![Slot::one::<Config>()], |args| {
//!             Ok(Repo { config: args.arc::<Config>(0)? })
//!         })
//!         .build(),
//!     vec![],
//! ).unwrap();
//!
//! let repo = container.resolve::<Repo>().unwrap();
//! assert_eq!(repo.config.url, "localhost");
//! ```

pub mod adapter;
pub mod behaviors;
pub mod builder;
pub mod config;
pub mod container;
pub mod errors;
pub mod graph;
pub mod injector;
pub mod injectors;
pub mod instance;
pub mod key;
pub mod lifecycle;
pub mod metrics;
pub mod monitor;
pub mod parameters;
pub mod spec;

pub use adapter::Adapter;
pub use behaviors::BehaviorKind;
pub use builder::ContainerBuilder;
pub use config::{ContainerConfig, ValidationReport};
pub use container::Container;
pub use errors::ContainerError;
pub use injector::InjectorKind;
pub use instance::{pack, unpack, Instance};
pub use key::{Arity, ComponentKey, Slot, TypeKey};
pub use lifecycle::{
    ContainerState, Lifecycle, LifecyclePhase, LifecyclePolicy, NullLifecycle, StartableLifecycle,
};
pub use metrics::ContainerStats;
pub use monitor::{Monitor, NullMonitor, TracingMonitor};
pub use parameters::Parameter;
pub use spec::{Args, ComponentSpec, MemberKind, SpecBuilder};
