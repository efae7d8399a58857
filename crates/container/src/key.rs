//! Registration identities.
//!
//! A component is registered under a [`ComponentKey`]: either the type it is
//! looked up as, or an application-chosen name. [`TypeKey`] captures a
//! `TypeId` together with the type's name so diagnostics can print something
//! a human can act on.

use std::any::{type_name, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Identity of a type, including trait-object types.
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    pub fn of<I: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<I>(),
            name: type_name::<I>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeKey({})", self.name)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Key under which an adapter is registered. Unique within one container.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum ComponentKey {
    Type(TypeKey),
    Named(String),
}

impl ComponentKey {
    pub fn of_type<I: ?Sized + 'static>() -> Self {
        ComponentKey::Type(TypeKey::of::<I>())
    }

    pub fn named(name: impl Into<String>) -> Self {
        ComponentKey::Named(name.into())
    }
}

impl fmt::Display for ComponentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentKey::Type(t) => f.write_str(t.name()),
            ComponentKey::Named(n) => f.write_str(n),
        }
    }
}

impl From<&str> for ComponentKey {
    fn from(name: &str) -> Self {
        ComponentKey::named(name)
    }
}

impl From<String> for ComponentKey {
    fn from(name: String) -> Self {
        ComponentKey::Named(name)
    }
}

impl From<TypeKey> for ComponentKey {
    fn from(t: TypeKey) -> Self {
        ComponentKey::Type(t)
    }
}

/// How many matches a dependency slot expects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Arity {
    One,
    Many,
}

/// A typed argument slot of a constructor or injectable member.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Slot {
    expects: TypeKey,
    arity: Arity,
}

impl Slot {
    pub fn one<I: ?Sized + Send + Sync + 'static>() -> Self {
        Self {
            expects: TypeKey::of::<I>(),
            arity: Arity::One,
        }
    }

    pub fn many<I: ?Sized + Send + Sync + 'static>() -> Self {
        Self {
            expects: TypeKey::of::<I>(),
            arity: Arity::Many,
        }
    }

    pub fn expects(&self) -> TypeKey {
        self.expects
    }

    pub fn arity(&self) -> Arity {
        self.arity
    }
}
