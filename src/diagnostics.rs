//! Binding-table dump written when a key cannot be resolved

use crate::aspect::Pointcut;
use crate::di::{Binding, Key};
use std::fmt;
use std::sync::Arc;

/// File name of the dump, inside the script directory.
pub const MODULE_LOG: &str = "module.log";

/// A snapshot of the injector's configuration at the time `missing` failed.
pub struct BindingReport<'a> {
    missing: &'a Key,
    bindings: &'a [Arc<Binding>],
    pointcuts: &'a [Pointcut],
}

impl<'a> BindingReport<'a> {
    pub fn new(missing: &'a Key, bindings: &'a [Arc<Binding>], pointcuts: &'a [Pointcut]) -> Self {
        Self {
            missing,
            bindings,
            pointcuts,
        }
    }
}

impl fmt::Display for BindingReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Unbound: {}", self.missing)?;
        writeln!(f)?;
        writeln!(f, "Bindings ({}):", self.bindings.len())?;
        for binding in self.bindings {
            writeln!(f, "  {binding}")?;
        }
        writeln!(f)?;
        writeln!(f, "Pointcuts ({}):", self.pointcuts.len())?;
        for pointcut in self.pointcuts {
            writeln!(f, "  {pointcut}")?;
        }
        Ok(())
    }
}

pub fn render(missing: &Key, bindings: &[Arc<Binding>], pointcuts: &[Pointcut]) -> String {
    BindingReport::new(missing, bindings, pointcuts).to_string()
}
