use crate::di::{Instance, WeakInjector};
use crate::error::Result;
use crate::interceptor::{MethodInterceptor, MethodInvocation, MethodInvocationProvider};

/// Completes container-supplied ("assisted") parameters at call time.
///
/// For every parameter marked for injection, the value is resolved by the
/// parameter's declared type and qualifier and stored under its name,
/// replacing whatever the caller passed. If any resolution fails the error
/// propagates unchanged and the call does not proceed.
pub struct AssistedInterceptor {
    injector: WeakInjector,
    invocations: MethodInvocationProvider,
}

impl AssistedInterceptor {
    pub fn new(injector: WeakInjector, invocations: MethodInvocationProvider) -> Self {
        Self {
            injector,
            invocations,
        }
    }
}

impl MethodInterceptor for AssistedInterceptor {
    fn invoke(&self, mut invocation: MethodInvocation<'_>) -> Result<Instance> {
        let _current = self.invocations.set(&invocation);
        let injector = self.injector.upgrade()?;

        let mut arguments = invocation.arguments().clone();
        for param in invocation.method().params() {
            if !param.is_injected() {
                continue;
            }
            let value = injector.resolve(param.type_name(), param.qualifier())?;
            if arguments.insert_instance(param.name(), value).is_some() {
                tracing::trace!(param = param.name(), "caller argument replaced by injection");
            }
        }

        *invocation.arguments_mut() = arguments;
        invocation.proceed()
    }
}
