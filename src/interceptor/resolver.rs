use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::{Annotation, ComponentContainer, HandlerMethod, Interceptor, InterceptorBinding};
use super::{MarkerRegistry, OperationId};

/// The ordered interceptors for one operation, shared between requests.
pub type ResolvedInterceptors = Arc<[Arc<dyn Interceptor>]>;

/// Computes and memoizes the ordered interceptor list of each operation.
///
/// Resolution scans the declaring type's annotations, then the method's,
/// keeping every annotation registered as a marker. The list is
/// stable-sorted by [`Interceptor::order`] so equal orders keep discovery
/// order. Each marker's interceptor is instantiated once and shared by every
/// operation that carries the marker.
///
/// Both caches are read-mostly and safe under concurrent first resolution:
/// racing resolvers may compute the same list twice, and the first one stored
/// wins.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use interlock::{
///     HandlerMethod, HandlerType, Interceptor, InterceptorBinding, InterceptorResolver,
///     MarkerRegistry,
/// };
///
/// struct Audited;
/// struct Timed;
///
/// #[derive(Default)]
/// struct Audit;
/// impl Interceptor for Audit {
///     fn order(&self) -> i32 { 10 }
/// }
///
/// #[derive(Default)]
/// struct Timer;
/// impl Interceptor for Timer {
///     fn order(&self) -> i32 { 5 }
/// }
///
/// let registry = MarkerRegistry::new()
///     .with::<Audited>(InterceptorBinding::construct::<Audit>())
///     .with::<Timed>(InterceptorBinding::construct::<Timer>());
/// let resolver = InterceptorResolver::new(registry);
///
/// let orders = Arc::new(HandlerType::new("Orders").annotate(Audited));
/// let list = HandlerMethod::new(&orders, "list").annotate(Timed);
///
/// let resolved = resolver.resolve(&list);
/// let orders: Vec<i32> = resolved.iter().map(|i| i.order()).collect();
/// assert_eq!(orders, vec![5, 10]);
/// assert!(Arc::ptr_eq(&resolved, &resolver.resolve(&list)));
/// ```
pub struct InterceptorResolver {
    registry: MarkerRegistry,
    container: Option<Arc<dyn ComponentContainer>>,
    instances: RwLock<HashMap<TypeId, Arc<dyn Interceptor>>>,
    cache: RwLock<HashMap<OperationId, ResolvedInterceptors>>,
}

impl InterceptorResolver {
    /// Creates a resolver with no component container.
    pub fn new(registry: MarkerRegistry) -> Self {
        Self {
            registry,
            container: None,
            instances: RwLock::new(HashMap::new()),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Sets the container consulted by container-managed bindings.
    pub fn with_container(mut self, container: Arc<dyn ComponentContainer>) -> Self {
        self.container = Some(container);
        self
    }

    /// Returns the ordered interceptors for `handler`.
    ///
    /// The first call for an operation computes the list; later calls return
    /// the same `Arc`. Markers whose container lookup fails are logged and
    /// left out.
    pub fn resolve(&self, handler: &HandlerMethod) -> ResolvedInterceptors {
        if let Some(hit) = self.cache.read().get(&handler.id()) {
            return Arc::clone(hit);
        }

        let mut list = self.instantiate_all(handler.declaring_type().annotations());
        list.extend(self.instantiate_all(handler.annotations()));
        // sort_by_key is stable
        list.sort_by_key(|interceptor| interceptor.order());

        if !list.is_empty() {
            let names: Vec<&str> = list.iter().map(|i| i.name()).collect();
            tracing::info!(
                handler = %handler,
                operation = %handler.id(),
                interceptors = ?names,
                "sorted interceptors"
            );
        }

        let resolved: ResolvedInterceptors = list.into();
        let mut cache = self.cache.write();
        Arc::clone(cache.entry(handler.id()).or_insert(resolved))
    }

    /// Resolves every handler up front, typically at route registration.
    pub fn warm(&self, handlers: &[HandlerMethod]) {
        for handler in handlers {
            self.resolve(handler);
        }
    }

    /// Returns `true` if `handler` has been resolved.
    pub fn is_cached(&self, handler: &HandlerMethod) -> bool {
        self.cache.read().contains_key(&handler.id())
    }

    /// Number of resolved operations.
    pub fn cached_len(&self) -> usize {
        self.cache.read().len()
    }

    fn instantiate_all(&self, annotations: &[Annotation]) -> Vec<Arc<dyn Interceptor>> {
        annotations
            .iter()
            .filter_map(|annotation| {
                let marker = annotation.annotation_type();
                let binding = self.registry.binding(marker)?;
                self.instance(marker, binding)
            })
            .collect()
    }

    fn instance(
        &self,
        marker: TypeId,
        binding: &InterceptorBinding,
    ) -> Option<Arc<dyn Interceptor>> {
        if let Some(existing) = self.instances.read().get(&marker) {
            return Some(Arc::clone(existing));
        }

        match binding.instantiate(self.container.as_deref()) {
            Ok((made, source)) => {
                tracing::info!(
                    marker = binding.marker(),
                    interceptor = binding.class_name(),
                    "interceptor instantiated, {}",
                    source
                );
                let mut instances = self.instances.write();
                Some(Arc::clone(instances.entry(marker).or_insert(made)))
            }
            Err(e) => {
                tracing::warn!(error = %e, "interceptor skipped");
                None
            }
        }
    }
}

impl std::fmt::Debug for InterceptorResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterceptorResolver")
            .field("registry", &self.registry)
            .field("has_container", &self.container.is_some())
            .field("cached_operations", &self.cached_len())
            .finish()
    }
}
