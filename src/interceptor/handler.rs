use std::any::{Any, TypeId};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A declarative tag attached to a handler type or handler method.
///
/// Any `Send + Sync + 'static` value can serve as an annotation. Annotations
/// whose type is registered in a [`MarkerRegistry`](super::MarkerRegistry)
/// select interceptors; all others are plain metadata that interceptors may
/// read through [`HandlerMethod::find_annotation`].
#[derive(Clone)]
pub struct Annotation {
    type_id: TypeId,
    type_name: &'static str,
    value: Arc<dyn Any + Send + Sync>,
}

impl Annotation {
    /// Wraps a value as an annotation.
    pub fn new<A: Any + Send + Sync>(value: A) -> Self {
        Self {
            type_id: TypeId::of::<A>(),
            type_name: std::any::type_name::<A>(),
            value: Arc::new(value),
        }
    }

    /// Returns the annotation's type id.
    pub fn annotation_type(&self) -> TypeId {
        self.type_id
    }

    /// Returns the annotation value if it is of type `A`.
    pub fn downcast_ref<A: Any>(&self) -> Option<&A> {
        self.value.downcast_ref::<A>()
    }
}

impl fmt::Debug for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.type_name)
    }
}

/// The type that declares handler methods (a controller).
#[derive(Debug)]
pub struct HandlerType {
    name: &'static str,
    annotations: Vec<Annotation>,
}

impl HandlerType {
    /// Creates a handler type with no annotations.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            annotations: Vec::new(),
        }
    }

    /// Adds an annotation. Declaration order is preserved.
    pub fn annotate<A: Any + Send + Sync>(mut self, value: A) -> Self {
        self.annotations.push(Annotation::new(value));
        self
    }

    /// Returns the type name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the annotations in declaration order.
    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }
}

/// Identity of a handler method.
///
/// Every [`HandlerMethod::new`] call allocates a fresh id, so two methods are
/// never interchangeable even when their names and annotations match. Clones
/// of a `HandlerMethod` share its id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OperationId(u64);

impl OperationId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op-{}", self.0)
    }
}

/// The target operation a request is dispatched to: a method plus its
/// declaring type.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use interlock::{HandlerMethod, HandlerType};
///
/// struct RequireLogin;
/// struct RateLimit(u32);
///
/// let orders = Arc::new(HandlerType::new("OrderController").annotate(RequireLogin));
/// let create = HandlerMethod::new(&orders, "create").annotate(RateLimit(10));
///
/// assert!(create.find_annotation::<RequireLogin>().is_some());
/// assert_eq!(create.find_annotation::<RateLimit>().map(|r| r.0), Some(10));
/// ```
#[derive(Debug, Clone)]
pub struct HandlerMethod {
    id: OperationId,
    declaring: Arc<HandlerType>,
    name: &'static str,
    annotations: Vec<Annotation>,
}

impl HandlerMethod {
    /// Creates a method on the given declaring type, with a fresh identity.
    pub fn new(declaring: &Arc<HandlerType>, name: &'static str) -> Self {
        Self {
            id: OperationId::next(),
            declaring: Arc::clone(declaring),
            name,
            annotations: Vec::new(),
        }
    }

    /// Adds a method-level annotation. Declaration order is preserved.
    pub fn annotate<A: Any + Send + Sync>(mut self, value: A) -> Self {
        self.annotations.push(Annotation::new(value));
        self
    }

    /// Returns the operation identity.
    pub fn id(&self) -> OperationId {
        self.id
    }

    /// Returns the method name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the declaring type.
    pub fn declaring_type(&self) -> &HandlerType {
        &self.declaring
    }

    /// Returns the method-level annotations in declaration order.
    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    /// Finds an annotation of type `A` on the method, falling back to the
    /// declaring type. A method-level annotation wins.
    pub fn find_annotation<A: Any>(&self) -> Option<&A> {
        find_in::<A>(&self.annotations).or_else(|| find_in::<A>(&self.declaring.annotations))
    }
}

impl fmt::Display for HandlerMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.declaring.name, self.name)
    }
}

fn find_in<A: Any>(annotations: &[Annotation]) -> Option<&A> {
    annotations.iter().find_map(|a| a.downcast_ref::<A>())
}
