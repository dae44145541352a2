use crate::error::{Result, WeftError};
use crate::interceptor::{MethodDescriptor, MethodInvocation, NamedArguments};
use std::cell::RefCell;
use std::marker::PhantomData;

thread_local! {
    /// Invocations in flight on this thread, innermost last.
    static CURRENT: RefCell<Vec<CurrentInvocation>> = const { RefCell::new(Vec::new()) };
}

/// Snapshot of an in-flight intercepted call.
#[derive(Debug, Clone)]
pub struct CurrentInvocation {
    class: String,
    method: MethodDescriptor,
    arguments: NamedArguments,
}

impl CurrentInvocation {
    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn method(&self) -> &MethodDescriptor {
        &self.method
    }

    pub fn arguments(&self) -> &NamedArguments {
        &self.arguments
    }
}

/// Gives collaborators on the same call access to the current invocation.
///
/// The injector binds one of these as a singleton, so it can be injected
/// like any other dependency.
#[derive(Debug, Clone, Copy, Default)]
pub struct MethodInvocationProvider;

impl MethodInvocationProvider {
    /// Publish `invocation` until the returned guard is dropped.
    pub fn set(&self, invocation: &MethodInvocation<'_>) -> InvocationGuard {
        let current = CurrentInvocation {
            class: invocation.class().to_string(),
            method: invocation.method().clone(),
            arguments: invocation.arguments().clone(),
        };
        CURRENT.with(|stack| stack.borrow_mut().push(current));
        InvocationGuard {
            _thread_bound: PhantomData,
        }
    }

    pub fn current(&self) -> Result<CurrentInvocation> {
        CURRENT
            .with(|stack| stack.borrow().last().cloned())
            .ok_or(WeftError::NoInvocation)
    }
}

/// Removes the published invocation when the call finishes.
#[must_use = "the invocation is unpublished as soon as the guard is dropped"]
pub struct InvocationGuard {
    _thread_bound: PhantomData<*const ()>,
}

impl Drop for InvocationGuard {
    fn drop(&mut self) {
        CURRENT.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::di::Instance;
    use crate::interceptor::Methods;
    use std::sync::Arc;

    struct Probe;

    #[test]
    fn test_current_is_scoped_to_guard() {
        let table = Methods::<Probe>::new()
            .method(MethodDescriptor::new("run"), |_, _| Ok(()))
            .build();
        let this: Instance = Arc::new(Probe);
        let method = table.method("run").unwrap();
        let arguments = NamedArguments::new().with("x", 1_u8);
        let invocation = MethodInvocation::new(&this, table.class(), method, arguments, &[]);
        let provider = MethodInvocationProvider;

        assert!(matches!(provider.current(), Err(WeftError::NoInvocation)));
        {
            let _guard = provider.set(&invocation);
            let current = provider.current().unwrap();
            assert_eq!(current.method().name(), "run");
            assert!(current.arguments().contains("x"));
        }
        assert!(matches!(provider.current(), Err(WeftError::NoInvocation)));
    }
}
