//! Aspect weaving
//!
//! A [`Pointcut`] pairs a class matcher and a method matcher with an ordered
//! list of interceptors. Weaving a binding computes, for each method in the
//! class's [`MethodTable`], the concatenated interceptors of every matching
//! pointcut. Instances built from a woven binding are [`Intercepted`]: calls
//! made through [`Intercepted::invoke`] run the chain before the original body.

use crate::di::{Binding, Instance, downcast};
use crate::error::{Result, WeftError};
use crate::interceptor::{MethodDescriptor, MethodInterceptor, MethodInvocation, MethodTable, NamedArguments};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

type Chains = HashMap<String, Vec<Arc<dyn MethodInterceptor>>>;

/// Selects classes (by name) or methods (by descriptor).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Matcher {
    Any,
    Exact(String),
    StartsWith(String),
    /// Methods with at least one container-supplied parameter.
    /// Places no restriction on classes.
    Assisted,
    Not(Box<Matcher>),
    All(Vec<Matcher>),
}

impl Matcher {
    pub fn exact(name: impl Into<String>) -> Self {
        Self::Exact(name.into())
    }

    pub fn starts_with(prefix: impl Into<String>) -> Self {
        Self::StartsWith(prefix.into())
    }

    /// Matches the class `T`.
    pub fn class<T: ?Sized + 'static>() -> Self {
        Self::Exact(std::any::type_name::<T>().to_string())
    }

    pub fn negate(self) -> Self {
        Self::Not(Box::new(self))
    }

    pub fn matches_class(&self, class: &str) -> bool {
        match self {
            Matcher::Any | Matcher::Assisted => true,
            Matcher::Exact(name) => class == name,
            Matcher::StartsWith(prefix) => class.starts_with(prefix.as_str()),
            Matcher::Not(inner) => !inner.matches_class(class),
            Matcher::All(all) => all.iter().all(|m| m.matches_class(class)),
        }
    }

    pub fn matches_method(&self, method: &MethodDescriptor) -> bool {
        match self {
            Matcher::Any => true,
            Matcher::Exact(name) => method.name() == name,
            Matcher::StartsWith(prefix) => method.name().starts_with(prefix.as_str()),
            Matcher::Assisted => method.has_injected_params(),
            Matcher::Not(inner) => !inner.matches_method(method),
            Matcher::All(all) => all.iter().all(|m| m.matches_method(method)),
        }
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::Any => write!(f, "any"),
            Matcher::Exact(name) => write!(f, "{name}"),
            Matcher::StartsWith(prefix) => write!(f, "{prefix}*"),
            Matcher::Assisted => write!(f, "assisted"),
            Matcher::Not(inner) => write!(f, "not({inner})"),
            Matcher::All(all) => {
                let parts: Vec<_> = all.iter().map(ToString::to_string).collect();
                write!(f, "all({})", parts.join(", "))
            }
        }
    }
}

/// An interception rule.
#[derive(Clone)]
pub struct Pointcut {
    class_matcher: Matcher,
    method_matcher: Matcher,
    interceptors: Vec<Arc<dyn MethodInterceptor>>,
}

impl Pointcut {
    pub fn new(
        class_matcher: Matcher,
        method_matcher: Matcher,
        interceptors: Vec<Arc<dyn MethodInterceptor>>,
    ) -> Self {
        Self {
            class_matcher,
            method_matcher,
            interceptors,
        }
    }

    pub fn interceptors(&self) -> &[Arc<dyn MethodInterceptor>] {
        &self.interceptors
    }

    fn applies_to(&self, class: &str, method: &MethodDescriptor) -> bool {
        self.class_matcher.matches_class(class) && self.method_matcher.matches_method(method)
    }
}

impl fmt::Display for Pointcut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.interceptors.iter().map(|i| i.name()).collect();
        write!(
            f,
            "({}, {}) => [{}]",
            self.class_matcher,
            self.method_matcher,
            names.join(", ")
        )
    }
}

impl fmt::Debug for Pointcut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pointcut{self}")
    }
}

/// The woven form of a class: its method table and per-method chains.
#[derive(Clone)]
pub struct Interception {
    table: Arc<MethodTable>,
    chains: Arc<Chains>,
}

impl fmt::Display for Interception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut methods: Vec<_> = self.chains.keys().map(String::as_str).collect();
        methods.sort_unstable();
        write!(f, "intercepted: [{}]", methods.join(", "))
    }
}

/// Weave `pointcuts` into `binding`. Returns `None` when no method matches.
pub fn weave(binding: &Binding, table: &Arc<MethodTable>, pointcuts: &[Pointcut]) -> Option<Binding> {
    let chains: Chains = table
        .methods()
        .iter()
        .filter_map(|method| {
            let chain: Vec<_> = pointcuts
                .iter()
                .filter(|pointcut| pointcut.applies_to(table.class(), method.descriptor()))
                .flat_map(|pointcut| pointcut.interceptors().iter().cloned())
                .collect();
            (!chain.is_empty()).then(|| (method.name().to_string(), chain))
        })
        .collect();

    if chains.is_empty() {
        return None;
    }

    Some(binding.clone().with_interception(Interception {
        table: table.clone(),
        chains: Arc::new(chains),
    }))
}

/// An instance whose methods route through interceptor chains.
pub struct Intercepted {
    target: Instance,
    interception: Interception,
}

impl Intercepted {
    pub(crate) fn new(target: Instance, interception: Interception) -> Self {
        Self {
            target,
            interception,
        }
    }

    pub fn target(&self) -> &Instance {
        &self.target
    }

    pub fn class(&self) -> &str {
        self.interception.table.class()
    }

    /// Call `method` with `arguments`, running its interceptors first.
    /// Methods without interceptors run directly.
    pub fn invoke(&self, method: &str, arguments: NamedArguments) -> Result<Instance> {
        let table = &self.interception.table;
        let resolved = table
            .method(method)
            .ok_or_else(|| WeftError::MethodNotFound {
                class: table.class().to_string(),
                method: method.to_string(),
            })?;
        let chain = self
            .interception
            .chains
            .get(method)
            .map(Vec::as_slice)
            .unwrap_or_default();

        tracing::trace!(class = table.class(), method, interceptors = chain.len(), "invoke");
        MethodInvocation::new(&self.target, table.class(), resolved, arguments, chain).proceed()
    }

    /// [`invoke`](Self::invoke) and downcast the result.
    pub fn call<R: Send + Sync + 'static>(&self, method: &str, arguments: NamedArguments) -> Result<Arc<R>> {
        downcast(self.invoke(method, arguments)?)
    }
}

impl fmt::Debug for Intercepted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Intercepted")
            .field("class", &self.class())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::di::{Key, Recipe, Target};
    use crate::interceptor::{Methods, ParamDescriptor};
    use parking_lot::Mutex;

    struct Billing;

    impl Billing {
        fn charge(&self, amount: u32) -> u32 {
            amount
        }
    }

    fn table() -> Arc<MethodTable> {
        Arc::new(
            Methods::<Billing>::new()
                .method(
                    MethodDescriptor::new("charge").param(ParamDescriptor::new::<u32>("amount")),
                    |this, args| Ok(this.charge(*args.get::<u32>("amount")?)),
                )
                .method(MethodDescriptor::new("refund"), |_, _| Ok(0_u32))
                .build(),
        )
    }

    /// Records its tag, then doubles `amount` before proceeding.
    struct Doubling {
        tag: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl MethodInterceptor for Doubling {
        fn invoke(&self, mut invocation: MethodInvocation<'_>) -> Result<Instance> {
            self.log.lock().push(self.tag);
            let amount = *invocation.arguments().get::<u32>("amount")?;
            invocation.arguments_mut().insert("amount", amount * 2);
            invocation.proceed()
        }
    }

    fn doubling(tag: &'static str, log: &Arc<Mutex<Vec<&'static str>>>) -> Arc<dyn MethodInterceptor> {
        Arc::new(Doubling {
            tag,
            log: log.clone(),
        })
    }

    fn billing_binding() -> Binding {
        Binding::new(
            Key::of::<Billing>(),
            Target::Provider(Recipe::new(|_| Ok(Billing))),
        )
    }

    #[test]
    fn test_matchers() {
        let charge = MethodDescriptor::new("charge");
        let assisted = MethodDescriptor::new("greet")
            .param(ParamDescriptor::new::<u32>("h").inject());

        assert!(Matcher::starts_with("char").matches_method(&charge));
        assert!(!Matcher::Assisted.matches_method(&charge));
        assert!(Matcher::Assisted.matches_method(&assisted));
        assert!(Matcher::exact("charge").negate().matches_method(&assisted));
        assert!(Matcher::class::<Billing>().matches_class(std::any::type_name::<Billing>()));
        assert!(!Matcher::All(vec![Matcher::Any, Matcher::exact("x")]).matches_class("y"));
    }

    #[test]
    fn test_weave_skips_unmatched_binding() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let pointcut = Pointcut::new(
            Matcher::Any,
            Matcher::exact("nothing"),
            vec![doubling("a", &log)],
        );
        assert!(weave(&billing_binding(), &table(), &[pointcut]).is_none());
    }

    #[test]
    fn test_chain_runs_in_pointcut_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let first = Pointcut::new(
            Matcher::Any,
            Matcher::exact("charge"),
            vec![doubling("first", &log)],
        );
        let second = Pointcut::new(
            Matcher::class::<Billing>(),
            Matcher::Any,
            vec![doubling("second", &log)],
        );

        let woven = weave(&billing_binding(), &table(), &[first, second]).unwrap();
        assert!(woven.is_woven());
        assert!(woven.to_string().contains("intercepted: [charge, refund]"));

        let interception = woven.interception().cloned().unwrap();
        let intercepted = Intercepted::new(Arc::new(Billing), interception);
        let charged = intercepted
            .call::<u32>("charge", NamedArguments::new().with("amount", 5_u32))
            .unwrap();

        assert_eq!(*charged, 20);
        assert_eq!(*log.lock(), vec!["first", "second"]);
        assert!(matches!(
            intercepted.invoke("missing", NamedArguments::new()),
            Err(WeftError::MethodNotFound { .. })
        ));
    }
}
