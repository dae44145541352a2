use crate::di::{ANY, Instance};
use crate::error::{Result, WeftError};
use crate::interceptor::NamedArguments;
use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Per-parameter injection metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamDescriptor {
    name: String,
    type_name: String,
    qualifier: Option<String>,
    inject: bool,
}

impl ParamDescriptor {
    /// A parameter declared with type `T`.
    pub fn new<T: ?Sized + 'static>(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name::<T>().to_string(),
            qualifier: None,
            inject: false,
        }
    }

    /// A parameter without a declared type. Injection resolves it as `""`.
    pub fn untyped(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: String::new(),
            qualifier: None,
            inject: false,
        }
    }

    /// Resolve this parameter from the container at call time.
    pub fn inject(mut self) -> Self {
        self.inject = true;
        self
    }

    pub fn named(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifier = Some(qualifier.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The explicit qualifier, or [`ANY`].
    pub fn qualifier(&self) -> &str {
        self.qualifier.as_deref().unwrap_or(ANY)
    }

    pub fn is_injected(&self) -> bool {
        self.inject
    }
}

/// A method's name and its declared parameters, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescriptor {
    name: String,
    params: Vec<ParamDescriptor>,
}

impl MethodDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
        }
    }

    pub fn param(mut self, param: ParamDescriptor) -> Self {
        self.params.push(param);
        self
    }

    /// Method-level form of [`ParamDescriptor::inject`]: marks every listed
    /// parameter as container-supplied. Names that match no parameter are ignored.
    pub fn assisted(mut self, names: &[&str]) -> Self {
        for param in &mut self.params {
            if names.contains(&param.name.as_str()) {
                param.inject = true;
            }
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[ParamDescriptor] {
        &self.params
    }

    pub fn has_injected_params(&self) -> bool {
        self.params.iter().any(ParamDescriptor::is_injected)
    }
}

pub type MethodBody = Arc<dyn Fn(&Instance, &NamedArguments) -> Result<Instance> + Send + Sync>;

/// A reflected method: descriptor plus the original body.
#[derive(Clone)]
pub struct Method {
    descriptor: MethodDescriptor,
    body: MethodBody,
}

impl Method {
    pub fn descriptor(&self) -> &MethodDescriptor {
        &self.descriptor
    }

    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    /// Run the original body, bypassing any interceptors.
    pub fn call(&self, this: &Instance, arguments: &NamedArguments) -> Result<Instance> {
        (self.body)(this, arguments)
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

/// The interceptable methods of one class, built once per class.
#[derive(Debug, Clone)]
pub struct MethodTable {
    class: String,
    methods: Vec<Method>,
}

impl MethodTable {
    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn method(&self, name: &str) -> Option<&Method> {
        self.methods.iter().find(|method| method.name() == name)
    }

    pub fn methods(&self) -> &[Method] {
        &self.methods
    }
}

/// Typed builder for a [`MethodTable`].
///
/// ```ignore
/// Methods::<Greeting>::new().method(
///     MethodDescriptor::new("greet")
///         .param(ParamDescriptor::new::<String>("name"))
///         .param(ParamDescriptor::new::<Helper>("helper").inject()),
///     |this, args| Ok(this.greet(&args.get::<String>("name")?, &args.get::<Helper>("helper")?)),
/// )
/// ```
pub struct Methods<T> {
    table: MethodTable,
    _marker: PhantomData<fn(&T)>,
}

impl<T: Send + Sync + 'static> Methods<T> {
    pub fn new() -> Self {
        Self {
            table: MethodTable {
                class: type_name::<T>().to_string(),
                methods: Vec::new(),
            },
            _marker: PhantomData,
        }
    }

    pub fn method<R, F>(mut self, descriptor: MethodDescriptor, body: F) -> Self
    where
        R: Send + Sync + 'static,
        F: Fn(&T, &NamedArguments) -> Result<R> + Send + Sync + 'static,
    {
        let body: MethodBody = Arc::new(move |this: &Instance, arguments: &NamedArguments| {
            let target = (**this)
                .downcast_ref::<T>()
                .ok_or_else(|| WeftError::downcast_failed(type_name::<T>()))?;
            Ok(Arc::new(body(target, arguments)?) as Instance)
        });
        self.table.methods.push(Method { descriptor, body });
        self
    }

    pub fn build(self) -> MethodTable {
        self.table
    }
}

impl<T: Send + Sync + 'static> Default for Methods<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A class whose methods can be woven with interceptors.
pub trait Interceptable: Send + Sync + Sized + 'static {
    fn methods() -> Methods<Self>;
}
