//! Component specs: the declared member set of an implementation.
//!
//! There is no reflection to discover constructors or setters, so a
//! registration supplies them explicitly: each constructor is a list of
//! typed slots plus a build closure, each injectable member a typed slot
//! plus an apply closure. The spec also records which views (concrete type
//! and bound trait objects) the component provides, and optionally how to
//! obtain its lifecycle capability.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::errors::ContainerError;
use crate::instance::{pack, unpack, Instance};
use crate::key::{ComponentKey, Slot, TypeKey};
use crate::lifecycle::Lifecycle;

pub(crate) type BuildFn =
    Box<dyn Fn(&Args<'_>) -> Result<Box<dyn Any + Send + Sync>, ContainerError> + Send + Sync>;
pub(crate) type ApplyFn =
    Box<dyn Fn(&mut (dyn Any + Send + Sync), Instance) -> Result<(), ContainerError> + Send + Sync>;
type SealFn =
    Box<dyn Fn(Box<dyn Any + Send + Sync>) -> Result<Instance, ContainerError> + Send + Sync>;
type CastFn = Box<dyn Fn(&Instance) -> Option<Instance> + Send + Sync>;
type LifecycleCastFn = Box<dyn Fn(&Instance) -> Option<Arc<dyn Lifecycle>> + Send + Sync>;

/// Resolved arguments handed to a build closure, one per declared slot.
pub struct Args<'a> {
    slots: &'a [Slot],
    values: &'a [Instance],
}

impl<'a> Args<'a> {
    pub(crate) fn new(slots: &'a [Slot], values: &'a [Instance]) -> Self {
        Self { slots, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Shared handle for a scalar slot.
    pub fn arc<I: ?Sized + Send + Sync + 'static>(
        &self,
        index: usize,
    ) -> Result<Arc<I>, ContainerError> {
        let value = self.values.get(index).ok_or_else(|| {
            ContainerError::type_mismatch(
                format!("argument slot {index}"),
                std::any::type_name::<I>(),
            )
        })?;
        unpack::<I>(value).ok_or_else(|| {
            ContainerError::type_mismatch(
                format!("argument slot {index}"),
                std::any::type_name::<I>(),
            )
        })
    }

    /// Owned clone of a scalar constant slot.
    pub fn value<T: Clone + Send + Sync + 'static>(
        &self,
        index: usize,
    ) -> Result<T, ContainerError> {
        self.arc::<T>(index).map(|handle| (*handle).clone())
    }

    /// All handles of a collection slot, in registration order.
    pub fn list<I: ?Sized + Send + Sync + 'static>(
        &self,
        index: usize,
    ) -> Result<Vec<Arc<I>>, ContainerError> {
        let value = self.values.get(index).ok_or_else(|| {
            ContainerError::type_mismatch(format!("argument slot {index}"), "collection")
        })?;
        let items = unpack::<Vec<Instance>>(value).ok_or_else(|| {
            ContainerError::type_mismatch(format!("argument slot {index}"), "collection")
        })?;
        items
            .iter()
            .map(|item| {
                unpack::<I>(item).ok_or_else(|| {
                    ContainerError::type_mismatch(
                        format!("collection element in slot {index}"),
                        std::any::type_name::<I>(),
                    )
                })
            })
            .collect()
    }

    pub fn slot(&self, index: usize) -> Option<&Slot> {
        self.slots.get(index)
    }
}

/// One declared constructor: typed slots plus the build closure.
pub struct ConstructorSpec {
    slots: Vec<Slot>,
    build: BuildFn,
}

impl ConstructorSpec {
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub(crate) fn build(
        &self,
        args: &Args<'_>,
    ) -> Result<Box<dyn Any + Send + Sync>, ContainerError> {
        (self.build)(args)
    }
}

/// Kind of injectable member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Setter,
    Field,
}

/// One injectable member: a named setter or field with a typed slot and an
/// optional tag (the annotation-convention substitute).
pub struct MemberSpec {
    name: &'static str,
    kind: MemberKind,
    slot: Slot,
    tag: Option<&'static str>,
    apply: ApplyFn,
}

impl MemberSpec {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> MemberKind {
        self.kind
    }

    pub fn slot(&self) -> &Slot {
        &self.slot
    }

    pub fn tag(&self) -> Option<&'static str> {
        self.tag
    }

    pub(crate) fn apply(
        &self,
        target: &mut (dyn Any + Send + Sync),
        value: Instance,
    ) -> Result<(), ContainerError> {
        (self.apply)(target, value)
    }
}

enum Source {
    Constructors(Vec<ConstructorSpec>),
    Preset(Instance),
}

/// Fully described implementation: what it is, how to build it, which views
/// it provides, and whether it has lifecycle.
pub struct ComponentSpec {
    impl_type: TypeKey,
    source: Source,
    members: Vec<MemberSpec>,
    seal: SealFn,
    casts: HashMap<TypeId, CastFn>,
    provided: Vec<TypeKey>,
    lifecycle_cast: Option<LifecycleCastFn>,
}

impl ComponentSpec {
    /// Start describing an implementation built by constructors.
    pub fn of<T: Send + Sync + 'static>() -> SpecBuilder<T> {
        SpecBuilder::with_source(Source::Constructors(Vec::new()))
    }

    /// Start describing a registration backed by a pre-built value. The same
    /// value is handed out on every resolution.
    pub fn instance<T: Send + Sync + 'static>(value: T) -> SpecBuilder<T> {
        SpecBuilder::with_source(Source::Preset(pack(Arc::new(value))))
    }

    pub fn impl_type(&self) -> TypeKey {
        self.impl_type
    }

    pub fn provided(&self) -> &[TypeKey] {
        &self.provided
    }

    pub fn provides(&self, view: &TypeKey) -> bool {
        self.provided.contains(view)
    }

    pub fn declares_lifecycle(&self) -> bool {
        self.lifecycle_cast.is_some()
    }

    pub fn lifecycle_view(&self, instance: &Instance) -> Option<Arc<dyn Lifecycle>> {
        self.lifecycle_cast.as_ref().and_then(|cast| cast(instance))
    }

    pub(crate) fn cast(&self, view: &TypeKey, base: &Instance) -> Option<Instance> {
        self.casts.get(&view.id()).and_then(|cast| cast(base))
    }

    pub(crate) fn constructors(&self) -> &[ConstructorSpec] {
        match &self.source {
            Source::Constructors(ctors) => ctors,
            Source::Preset(_) => &[],
        }
    }

    pub(crate) fn preset(&self) -> Option<&Instance> {
        match &self.source {
            Source::Preset(instance) => Some(instance),
            Source::Constructors(_) => None,
        }
    }

    pub(crate) fn members(&self) -> &[MemberSpec] {
        &self.members
    }

    pub(crate) fn seal(
        &self,
        built: Box<dyn Any + Send + Sync>,
    ) -> Result<Instance, ContainerError> {
        (self.seal)(built)
    }

    /// Registration-time sanity checks, raised as composition errors.
    pub(crate) fn check(&self, key: &ComponentKey) -> Result<(), ContainerError> {
        match &self.source {
            Source::Preset(_) => {
                if !self.members.is_empty() {
                    return Err(ContainerError::composition(
                        key.clone(),
                        "a pre-built instance cannot take member injection",
                    ));
                }
            }
            Source::Constructors(ctors) => {
                if ctors.is_empty() {
                    return Err(ContainerError::composition(
                        key.clone(),
                        "no constructor declared and no instance supplied",
                    ));
                }
            }
        }
        Ok(())
    }
}

impl fmt::Debug for ComponentSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentSpec")
            .field("impl_type", &self.impl_type)
            .field("constructors", &self.constructors().len())
            .field("members", &self.members.len())
            .field("provided", &self.provided)
            .field("lifecycle", &self.declares_lifecycle())
            .finish()
    }
}

/// Fluent builder for [`ComponentSpec`], parameterized by the concrete type
/// so closures stay strongly typed until erased.
pub struct SpecBuilder<T: Send + Sync + 'static> {
    source: Source,
    members: Vec<MemberSpec>,
    casts: HashMap<TypeId, CastFn>,
    provided: Vec<TypeKey>,
    lifecycle_cast: Option<LifecycleCastFn>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> SpecBuilder<T> {
    fn with_source(source: Source) -> Self {
        let mut casts: HashMap<TypeId, CastFn> = HashMap::new();
        // identity view: the concrete type itself
        casts.insert(
            TypeId::of::<T>(),
            Box::new(|instance: &Instance| Some(instance.clone())),
        );
        Self {
            source,
            members: Vec::new(),
            casts,
            provided: vec![TypeKey::of::<T>()],
            lifecycle_cast: None,
            _marker: PhantomData,
        }
    }

    /// Declare a constructor with typed slots and a build closure.
    pub fn constructor<F>(mut self, slots: Vec<Slot>, build: F) -> Self
    where
        F: Fn(&Args<'_>) -> Result<T, ContainerError> + Send + Sync + 'static,
    {
        if let Source::Constructors(ctors) = &mut self.source {
            ctors.push(ConstructorSpec {
                slots,
                build: Box::new(move |args| {
                    let built = build(args)?;
                    Ok(Box::new(built))
                }),
            });
        }
        self
    }

    /// Declare the zero-argument constructor.
    pub fn default_constructor<F>(self, build: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.constructor(Vec::new(), move |_| Ok(build()))
    }

    fn member<I, F>(
        mut self,
        name: &'static str,
        kind: MemberKind,
        tag: Option<&'static str>,
        apply: F,
    ) -> Self
    where
        I: ?Sized + Send + Sync + 'static,
        F: Fn(&mut T, Arc<I>) + Send + Sync + 'static,
    {
        self.members.push(MemberSpec {
            name,
            kind,
            slot: Slot::one::<I>(),
            tag,
            apply: Box::new(move |target, value| {
                let target = target.downcast_mut::<T>().ok_or_else(|| {
                    ContainerError::type_mismatch(
                        format!("member '{name}'"),
                        std::any::type_name::<T>(),
                    )
                })?;
                let handle = unpack::<I>(&value).ok_or_else(|| {
                    ContainerError::type_mismatch(
                        format!("member '{name}'"),
                        std::any::type_name::<I>(),
                    )
                })?;
                apply(target, handle);
                Ok(())
            }),
        });
        self
    }

    /// Declare a setter-injected member.
    pub fn setter<I, F>(self, name: &'static str, apply: F) -> Self
    where
        I: ?Sized + Send + Sync + 'static,
        F: Fn(&mut T, Arc<I>) + Send + Sync + 'static,
    {
        self.member::<I, F>(name, MemberKind::Setter, None, apply)
    }

    /// Declare a field-injected member.
    pub fn field<I, F>(self, name: &'static str, apply: F) -> Self
    where
        I: ?Sized + Send + Sync + 'static,
        F: Fn(&mut T, Arc<I>) + Send + Sync + 'static,
    {
        self.member::<I, F>(name, MemberKind::Field, None, apply)
    }

    /// Declare a tagged setter, injected only by the tagged strategy.
    pub fn tagged_setter<I, F>(self, name: &'static str, tag: &'static str, apply: F) -> Self
    where
        I: ?Sized + Send + Sync + 'static,
        F: Fn(&mut T, Arc<I>) + Send + Sync + 'static,
    {
        self.member::<I, F>(name, MemberKind::Setter, Some(tag), apply)
    }

    /// Declare a tagged field, injected only by the tagged strategy.
    pub fn tagged_field<I, F>(self, name: &'static str, tag: &'static str, apply: F) -> Self
    where
        I: ?Sized + Send + Sync + 'static,
        F: Fn(&mut T, Arc<I>) + Send + Sync + 'static,
    {
        self.member::<I, F>(name, MemberKind::Field, Some(tag), apply)
    }

    /// Bind an interface view. The coercion is usually just `|a| a`.
    pub fn provides<I: ?Sized + Send + Sync + 'static>(
        mut self,
        cast: fn(Arc<T>) -> Arc<I>,
    ) -> Self {
        let view = TypeKey::of::<I>();
        if !self.provided.contains(&view) {
            self.provided.push(view);
        }
        self.casts.insert(
            TypeId::of::<I>(),
            Box::new(move |instance: &Instance| {
                unpack::<T>(instance).map(|handle| pack(cast(handle)))
            }),
        );
        self
    }

    /// Opt the component into start/stop/dispose handling.
    pub fn lifecycle(mut self) -> Self
    where
        T: Lifecycle,
    {
        self.lifecycle_cast = Some(Box::new(|instance: &Instance| {
            unpack::<T>(instance).map(|handle| {
                let view: Arc<dyn Lifecycle> = handle;
                view
            })
        }));
        self
    }

    pub fn build(self) -> ComponentSpec {
        ComponentSpec {
            impl_type: TypeKey::of::<T>(),
            source: self.source,
            members: self.members,
            seal: Box::new(|built| {
                let concrete = built.downcast::<T>().map_err(|_| {
                    ContainerError::type_mismatch("sealed instance", std::any::type_name::<T>())
                })?;
                Ok(pack::<T>(Arc::from(concrete)))
            }),
            casts: self.casts,
            provided: self.provided,
            lifecycle_cast: self.lifecycle_cast,
        }
    }
}
