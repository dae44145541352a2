use crate::di::Key;
use crate::error::{Result, WeftError};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::marker::PhantomData;

thread_local! {
    /// Chains in progress on this thread, one per injector.
    static CHAINS: RefCell<HashMap<usize, Chain>> = RefCell::new(HashMap::new());
}

/// The keys one injector is resolving, outermost first, plus the keys it
/// bound just in time since its outermost resolution started.
#[derive(Default)]
struct Chain {
    stack: Vec<Key>,
    implicit: HashSet<Key>,
}

/// One level of a nested resolution. Dropping it leaves the level.
///
/// `owner` identifies the injector, so resolutions nested across
/// different injectors never see each other's keys.
pub(crate) struct ChainFrame {
    owner: usize,
    _thread_bound: PhantomData<*const ()>,
}

impl ChainFrame {
    pub(crate) fn enter(owner: usize, key: &Key) -> Result<Self> {
        CHAINS.with(|chains| {
            let mut chains = chains.borrow_mut();
            let chain = chains.entry(owner).or_default();
            if let Some(start) = chain.stack.iter().position(|k| k == key) {
                let cycle = chain.stack[start..]
                    .iter()
                    .chain(std::iter::once(key))
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(" -> ");
                return Err(WeftError::CircularDependency { cycle });
            }
            chain.stack.push(key.clone());
            Ok(Self {
                owner,
                _thread_bound: PhantomData,
            })
        })
    }

    pub(crate) fn mark_implicit(&self, key: &Key) {
        CHAINS.with(|chains| {
            if let Some(chain) = chains.borrow_mut().get_mut(&self.owner) {
                chain.implicit.insert(key.clone());
            }
        });
    }

    pub(crate) fn is_implicit(&self, key: &Key) -> bool {
        CHAINS.with(|chains| {
            chains
                .borrow()
                .get(&self.owner)
                .is_some_and(|chain| chain.implicit.contains(key))
        })
    }
}

impl Drop for ChainFrame {
    fn drop(&mut self) {
        CHAINS.with(|chains| {
            let mut chains = chains.borrow_mut();
            let Some(chain) = chains.get_mut(&self.owner) else {
                return;
            };
            chain.stack.pop();
            if chain.stack.is_empty() {
                chains.remove(&self.owner);
            }
        });
    }
}
