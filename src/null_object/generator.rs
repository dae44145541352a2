use crate::error::{Result, WeftError};
use crate::null_object::null_class_name;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Identity and on-disk location of a generated null class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedType {
    name: String,
    path: PathBuf,
}

impl GeneratedType {
    /// Derive the identity for `interface` inside `out_dir`. Deterministic:
    /// the same interface always maps to the same name and file.
    pub fn for_interface(interface: &str, out_dir: &Path) -> Self {
        let name = null_class_name(interface);
        let path = out_dir.join(format!("{name}.json"));
        Self { name, path }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Emits a no-op class artifact for an interface.
pub trait NullObjectGenerator: Send + Sync {
    fn generate(&self, interface: &str, out_dir: &Path) -> Result<GeneratedType>;
}

/// Data-driven stub written by [`StubWriter`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StubDescriptor {
    pub interface: String,
    pub class: String,
}

/// Writes a JSON stub descriptor per interface, reusing an existing one.
#[derive(Debug, Clone, Copy, Default)]
pub struct StubWriter;

impl NullObjectGenerator for StubWriter {
    fn generate(&self, interface: &str, out_dir: &Path) -> Result<GeneratedType> {
        let generated = GeneratedType::for_interface(interface, out_dir);
        if generated.path().is_file() {
            tracing::debug!(class = generated.name(), "null object artifact cached");
            return Ok(generated);
        }

        let descriptor = StubDescriptor {
            interface: interface.to_string(),
            class: generated.name().to_string(),
        };
        let json = serde_json::to_vec_pretty(&descriptor)
            .map_err(|e| WeftError::materialization(interface, e.to_string()))?;

        // Racing writers produce identical bytes, so last-writer-wins is harmless.
        fs::write(generated.path(), json)
            .map_err(|e| WeftError::materialization(interface, e.to_string()))?;
        tracing::debug!(
            class = generated.name(),
            path = %generated.path().display(),
            "null object artifact written"
        );
        Ok(generated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let first = StubWriter.generate("dyn shop::Cart", dir.path()).unwrap();
        let second = StubWriter.generate("dyn shop::Cart", dir.path()).unwrap();

        assert_eq!(first, second);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);

        let stored: StubDescriptor =
            serde_json::from_slice(&fs::read(first.path()).unwrap()).unwrap();
        assert_eq!(stored.interface, "dyn shop::Cart");
        assert_eq!(stored.class, "dyn_shop_CartNull");
    }

    #[test]
    fn test_generate_into_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("gone");
        assert!(matches!(
            StubWriter.generate("dyn shop::Cart", &missing),
            Err(WeftError::Materialization { .. })
        ));
    }
}
