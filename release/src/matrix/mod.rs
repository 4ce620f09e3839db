//! Static release configuration: targets, components, and platform packages.
//!
//! These tables are built once at process start into a [`Registry`] and
//! passed explicitly to the pipelines.
//!
//! # Sub-modules
//!
//! - [`target`] - Target triple validation and npm `os`/`cpu` pairing.
//! - [`component`] - Binary components and their vendor-tree naming.
//! - [`platform`] - Platform package definitions.

pub mod component;
pub mod platform;
pub mod target;

use crate::error::Result;
use component::{BinaryComponent, ComponentRegistry};
use platform::PlatformPackage;
use target::TargetMatrix;

/// Immutable registries shared by the install and package pipelines.
#[derive(Debug, Clone)]
pub struct Registry {
    matrix: TargetMatrix,
    components: ComponentRegistry,
    packages: Vec<PlatformPackage>,
    package_component: BinaryComponent,
}

impl Registry {
    /// Build the registry CI publishes against.
    ///
    /// # Errors
    ///
    /// Returns an error if the built-in tables are inconsistent.
    pub fn standard() -> Result<Self> {
        let components = ComponentRegistry::standard()?;
        let package_component = components.get(component::DEFAULT_COMPONENT)?.clone();
        Ok(Self {
            matrix: TargetMatrix::standard(),
            components,
            packages: platform::standard_packages()?,
            package_component,
        })
    }

    /// Build a registry from explicit parts.
    #[must_use]
    pub fn new(
        matrix: TargetMatrix,
        components: ComponentRegistry,
        packages: Vec<PlatformPackage>,
        package_component: BinaryComponent,
    ) -> Self {
        Self {
            matrix,
            components,
            packages,
            package_component,
        }
    }

    /// The target matrix.
    #[must_use]
    pub fn matrix(&self) -> &TargetMatrix {
        &self.matrix
    }

    /// The component registry.
    #[must_use]
    pub fn components(&self) -> &ComponentRegistry {
        &self.components
    }

    /// Platform packages in publication order.
    #[must_use]
    pub fn packages(&self) -> &[PlatformPackage] {
        &self.packages
    }

    /// Component whose binary every platform package carries.
    #[must_use]
    pub fn package_component(&self) -> &BinaryComponent {
        &self.package_component
    }
}
