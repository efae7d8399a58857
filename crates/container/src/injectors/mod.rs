//! Concrete injection strategies.

mod composite;
mod constructor;
mod member;

pub use composite::CompositeInjector;
pub use constructor::ConstructorInjector;
pub use member::MemberInjector;
