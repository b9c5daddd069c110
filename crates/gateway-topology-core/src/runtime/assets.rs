// crates/gateway-topology-core/src/runtime/assets.rs
// ============================================================================
// Module: Asset Inventories
// Description: Filesystem and declared implementations of AssetInventory.
// Purpose: Let composition check entry points without packaging anything.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! [`FsAssetInventory`] looks bundles up under an asset root directory and
//! refuses paths that escape it. [`DeclaredAssetInventory`] answers from an
//! explicit file list and is used when bundles are produced elsewhere.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use crate::core::package::BundleLocation;
use crate::interfaces::AssetError;
use crate::interfaces::AssetInventory;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;

// ============================================================================
// SECTION: Filesystem Inventory
// ============================================================================

/// Inventory backed by bundle directories under a root.
#[derive(Debug, Clone)]
pub struct FsAssetInventory {
    /// Canonical asset root.
    root: PathBuf,
}

impl FsAssetInventory {
    /// Creates an inventory rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError`] when the root is too long or cannot be resolved.
    pub fn new(root: &Path) -> Result<Self, AssetError> {
        validate_path(root)?;
        let root = root
            .canonicalize()
            .map_err(|err| AssetError::Io(format!("unable to resolve asset root: {err}")))?;
        Ok(Self {
            root,
        })
    }

    /// Returns the canonical root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AssetInventory for FsAssetInventory {
    fn contains(&self, bundle: &BundleLocation, relative_path: &str) -> Result<bool, AssetError> {
        let bundle_path = Path::new(bundle.as_str());
        let file_path = Path::new(relative_path);
        ensure_relative_path(bundle_path)?;
        ensure_relative_path(file_path)?;
        let joined = self.root.join(bundle_path).join(file_path);
        validate_path(&joined)?;
        if !joined.exists() {
            return Ok(false);
        }
        let resolved = joined
            .canonicalize()
            .map_err(|err| AssetError::Io(format!("unable to resolve {relative_path}: {err}")))?;
        if !resolved.starts_with(&self.root) {
            return Err(AssetError::Invalid(format!("{relative_path} escapes the asset root")));
        }
        Ok(resolved.is_file())
    }
}

// ============================================================================
// SECTION: Declared Inventory
// ============================================================================

/// Inventory answering from an explicit `(bundle, path)` list.
#[derive(Debug, Clone, Default)]
pub struct DeclaredAssetInventory {
    /// Declared files.
    files: BTreeSet<(String, String)>,
}

impl DeclaredAssetInventory {
    /// Creates an empty inventory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a file inside a bundle.
    #[must_use]
    pub fn with_file(mut self, bundle: &str, relative_path: &str) -> Self {
        self.files.insert((bundle.to_string(), relative_path.to_string()));
        self
    }
}

impl AssetInventory for DeclaredAssetInventory {
    fn contains(&self, bundle: &BundleLocation, relative_path: &str) -> Result<bool, AssetError> {
        ensure_relative_path(Path::new(relative_path))?;
        Ok(self.files.contains(&(bundle.as_str().to_string(), relative_path.to_string())))
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Rejects absolute paths and parent traversal.
fn ensure_relative_path(path: &Path) -> Result<(), AssetError> {
    let escapes = path.components().any(|component| {
        matches!(component, Component::ParentDir | Component::RootDir | Component::Prefix(_))
    });
    if escapes || path.as_os_str().is_empty() {
        return Err(AssetError::Invalid(format!(
            "{} must be a non-empty relative path",
            path.display()
        )));
    }
    Ok(())
}

/// Validates a path against length constraints.
fn validate_path(path: &Path) -> Result<(), AssetError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(AssetError::Invalid("asset path exceeds length limit".to_string()));
    }
    for component in path.components() {
        if component.as_os_str().to_string_lossy().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(AssetError::Invalid("asset path component too long".to_string()));
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic_in_result_fn,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test assertions may panic inside Result-returning tests."
    )]

    use std::fs;

    use super::*;

    #[test]
    fn fs_inventory_finds_bundle_files() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        fs::create_dir_all(dir.path().join("src"))?;
        fs::write(dir.path().join("src/app.py"), "handler = None\n")?;
        let inventory = FsAssetInventory::new(dir.path())?;
        let bundle = BundleLocation::new("src");
        assert!(inventory.contains(&bundle, "app.py")?);
        assert!(!inventory.contains(&bundle, "missing.py")?);
        assert!(inventory.contains(&bundle, "../src/app.py").is_err());
        Ok(())
    }

    #[test]
    fn declared_inventory_matches_exact_entries() -> Result<(), AssetError> {
        let inventory = DeclaredAssetInventory::new().with_file("src", "app.py");
        assert!(inventory.contains(&BundleLocation::new("src"), "app.py")?);
        assert!(!inventory.contains(&BundleLocation::new("lib"), "app.py")?);
        Ok(())
    }
}
