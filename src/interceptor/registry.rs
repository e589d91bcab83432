use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::Interceptor;
use crate::error::ContainerLookupFailed;

type Factory = fn() -> Arc<dyn Interceptor>;

const FROM_NEW: &str = "from=new, by=class";
const FROM_CONTAINER_BY_ID: &str = "from=container, by=id";
const FROM_CONTAINER_BY_TYPE: &str = "from=container, by=class";

fn construct<I: Interceptor + Default>() -> Arc<dyn Interceptor> {
    Arc::new(I::default())
}

#[derive(Clone)]
enum Provision {
    Construct(Factory),
    Container { bean_id: Option<String> },
}

/// How a marker annotation obtains its interceptor.
///
/// A binding names the interceptor type and whether an instance is built
/// directly or fetched from a [`ComponentContainer`]. Interceptors are
/// shared across every operation that carries the marker, so they must not
/// hold per-request state.
///
/// ```
/// use interlock::{Interceptor, InterceptorBinding};
///
/// #[derive(Default)]
/// struct AccessLog;
/// impl Interceptor for AccessLog {}
///
/// let direct = InterceptorBinding::construct::<AccessLog>();
/// assert!(!direct.load_from_container());
///
/// let managed = InterceptorBinding::from_container_id::<AccessLog>("accessLog");
/// assert!(managed.load_from_container());
/// assert_eq!(managed.bean_id(), Some("accessLog"));
/// ```
#[derive(Clone)]
pub struct InterceptorBinding {
    marker: &'static str,
    class_type: TypeId,
    class_name: &'static str,
    provision: Provision,
}

impl InterceptorBinding {
    /// Builds a fresh `I::default()` the first time the marker is resolved.
    pub fn construct<I: Interceptor + Default>() -> Self {
        Self::with_provision::<I>(Provision::Construct(construct::<I>))
    }

    /// Fetches the `I` instance registered in the component container.
    pub fn from_container<I: Interceptor>() -> Self {
        Self::with_provision::<I>(Provision::Container { bean_id: None })
    }

    /// Fetches from the container by id first, then by type `I`.
    pub fn from_container_id<I: Interceptor>(bean_id: impl Into<String>) -> Self {
        let bean_id = bean_id.into();
        let bean_id = if bean_id.trim().is_empty() {
            None
        } else {
            Some(bean_id)
        };
        Self::with_provision::<I>(Provision::Container { bean_id })
    }

    fn with_provision<I: Interceptor>(provision: Provision) -> Self {
        Self {
            marker: "",
            class_type: TypeId::of::<I>(),
            class_name: std::any::type_name::<I>(),
            provision,
        }
    }

    /// Type name of the marker this binding is registered under.
    pub fn marker(&self) -> &'static str {
        self.marker
    }

    /// Type id of the interceptor.
    pub fn class_type(&self) -> TypeId {
        self.class_type
    }

    /// Type name of the interceptor.
    pub fn class_name(&self) -> &'static str {
        self.class_name
    }

    /// Whether the instance comes from a component container.
    pub fn load_from_container(&self) -> bool {
        matches!(self.provision, Provision::Container { .. })
    }

    /// Container lookup id, if one was given.
    pub fn bean_id(&self) -> Option<&str> {
        match &self.provision {
            Provision::Container { bean_id } => bean_id.as_deref(),
            Provision::Construct(_) => None,
        }
    }

    /// Produces an interceptor instance, paired with where it came from
    /// for the instantiation log line.
    ///
    /// Container lookup order is by id when one is set, then by type. There
    /// is no fallback to direct construction for container bindings.
    pub(crate) fn instantiate(
        &self,
        container: Option<&dyn ComponentContainer>,
    ) -> Result<(Arc<dyn Interceptor>, &'static str), ContainerLookupFailed> {
        let bean_id = match &self.provision {
            Provision::Construct(factory) => return Ok((factory(), FROM_NEW)),
            Provision::Container { bean_id } => bean_id,
        };
        container
            .and_then(|c| {
                let by_id = bean_id
                    .as_deref()
                    .and_then(|id| c.get_by_id(id))
                    .map(|i| (i, FROM_CONTAINER_BY_ID));
                by_id.or_else(|| {
                    c.get_by_type(self.class_type)
                        .map(|i| (i, FROM_CONTAINER_BY_TYPE))
                })
            })
            .ok_or_else(|| ContainerLookupFailed {
                marker: self.marker,
                class: self.class_name,
                bean_id: bean_id.clone(),
            })
    }
}

impl fmt::Debug for InterceptorBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptorBinding")
            .field("marker", &self.marker)
            .field("class", &self.class_name)
            .field("load_from_container", &self.load_from_container())
            .field("bean_id", &self.bean_id())
            .finish()
    }
}

/// A shared component container that can supply interceptor instances.
pub trait ComponentContainer: Send + Sync {
    /// Looks up an interceptor by component id.
    fn get_by_id(&self, id: &str) -> Option<Arc<dyn Interceptor>>;

    /// Looks up an interceptor by its concrete type.
    fn get_by_type(&self, class: TypeId) -> Option<Arc<dyn Interceptor>>;
}

/// A [`ComponentContainer`] filled once at startup.
#[derive(Default)]
pub struct StaticContainer {
    by_id: HashMap<String, Arc<dyn Interceptor>>,
    by_type: HashMap<TypeId, Arc<dyn Interceptor>>,
}

impl StaticContainer {
    /// Creates an empty container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an instance under its type and, optionally, an id.
    pub fn register<I: Interceptor>(mut self, id: Option<&str>, instance: I) -> Self {
        let instance: Arc<dyn Interceptor> = Arc::new(instance);
        if let Some(id) = id {
            self.by_id.insert(id.to_string(), Arc::clone(&instance));
        }
        self.by_type.insert(TypeId::of::<I>(), instance);
        self
    }
}

impl ComponentContainer for StaticContainer {
    fn get_by_id(&self, id: &str) -> Option<Arc<dyn Interceptor>> {
        self.by_id.get(id).cloned()
    }

    fn get_by_type(&self, class: TypeId) -> Option<Arc<dyn Interceptor>> {
        self.by_type.get(&class).cloned()
    }
}

/// Maps marker annotation types to their [`InterceptorBinding`].
///
/// Filled by explicit registration at startup and read-only afterwards.
///
/// ```
/// use interlock::{Interceptor, InterceptorBinding, MarkerRegistry};
///
/// struct Audited;
///
/// #[derive(Default)]
/// struct AuditInterceptor;
/// impl Interceptor for AuditInterceptor {}
///
/// let registry = MarkerRegistry::new()
///     .with::<Audited>(InterceptorBinding::construct::<AuditInterceptor>());
///
/// assert!(registry.is_marker::<Audited>());
/// ```
#[derive(Debug, Default)]
pub struct MarkerRegistry {
    bindings: HashMap<TypeId, Arc<InterceptorBinding>>,
}

impl MarkerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `M` as a marker. A later registration for the same marker
    /// replaces the earlier one.
    pub fn register<M: Any>(&mut self, mut binding: InterceptorBinding) {
        binding.marker = std::any::type_name::<M>();
        if let Some(prev) = self.bindings.insert(TypeId::of::<M>(), Arc::new(binding)) {
            tracing::warn!(marker = prev.marker, "marker registered twice; keeping the later binding");
        }
    }

    /// Builder-style [`register`](Self::register).
    pub fn with<M: Any>(mut self, binding: InterceptorBinding) -> Self {
        self.register::<M>(binding);
        self
    }

    /// Returns the binding for a marker type id.
    pub fn binding(&self, marker: TypeId) -> Option<&Arc<InterceptorBinding>> {
        self.bindings.get(&marker)
    }

    /// Returns `true` if `M` is a registered marker.
    pub fn is_marker<M: Any>(&self) -> bool {
        self.bindings.contains_key(&TypeId::of::<M>())
    }

    /// Number of registered markers.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Returns `true` if no markers are registered.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
