use crate::di::Instance;
use crate::error::Result;
use std::sync::Arc;

mod arguments;
mod assisted;
mod method;
mod provider;

pub use arguments::NamedArguments;
pub use assisted::AssistedInterceptor;
pub use method::{
    Interceptable, Method, MethodBody, MethodDescriptor, MethodTable, Methods, ParamDescriptor,
};
pub use provider::{CurrentInvocation, InvocationGuard, MethodInvocationProvider};

/// One intercepted call, owned by the interceptor chain until it returns.
///
/// Calling [`proceed`](Self::proceed) hands the invocation to the next
/// interceptor, or runs the original method once the chain is exhausted.
pub struct MethodInvocation<'a> {
    this: &'a Instance,
    class: &'a str,
    method: &'a Method,
    arguments: NamedArguments,
    chain: &'a [Arc<dyn MethodInterceptor>],
}

impl<'a> MethodInvocation<'a> {
    pub(crate) fn new(
        this: &'a Instance,
        class: &'a str,
        method: &'a Method,
        arguments: NamedArguments,
        chain: &'a [Arc<dyn MethodInterceptor>],
    ) -> Self {
        Self {
            this,
            class,
            method,
            arguments,
            chain,
        }
    }

    /// The target instance.
    pub fn this(&self) -> &Instance {
        self.this
    }

    pub fn class(&self) -> &str {
        self.class
    }

    pub fn method(&self) -> &MethodDescriptor {
        self.method.descriptor()
    }

    pub fn arguments(&self) -> &NamedArguments {
        &self.arguments
    }

    pub fn arguments_mut(&mut self) -> &mut NamedArguments {
        &mut self.arguments
    }

    /// Execute the next interceptor or, at the end of the chain, the original method
    pub fn proceed(self) -> Result<Instance> {
        let chain = self.chain;
        match chain.split_first() {
            Some((interceptor, rest)) => interceptor.invoke(MethodInvocation {
                chain: rest,
                ..self
            }),
            None => self.method.call(self.this, &self.arguments),
        }
    }
}

/// The MethodInterceptor trait
///
/// Interceptors can inspect or rewrite the arguments before the call proceeds,
/// and inspect or replace the result after it returns.
///
/// # Example
/// ```ignore
/// struct LoggingInterceptor;
///
/// impl MethodInterceptor for LoggingInterceptor {
///     fn invoke(&self, invocation: MethodInvocation<'_>) -> Result<Instance> {
///         tracing::info!(method = invocation.method().name(), "before");
///         let result = invocation.proceed()?;
///         tracing::info!("after");
///         Ok(result)
///     }
/// }
/// ```
pub trait MethodInterceptor: Send + Sync + 'static {
    fn invoke(&self, invocation: MethodInvocation<'_>) -> Result<Instance>;

    /// Name used in binding diagnostics.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
