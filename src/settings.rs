//! Synchronization Settings & Shared Context
//!
//! [`SyncSettings`] carries the environment switches that change how units
//! synchronize (authoring mode, occlusion queries, instancing), and
//! [`SyncContext`] bundles them with the collaborators every unit shares: the
//! buffer allocator and the optional light-probe field.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::rc::Rc;
//! use myth_renderable::{SyncContext, SyncSettings, CpuBufferAllocator};
//!
//! let settings = SyncSettings {
//!     occlusion_query: true,
//!     ..Default::default()
//! };
//! let context = Rc::new(SyncContext::new(settings, Rc::new(CpuBufferAllocator::new())));
//! ```

use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::resources::buffer::BufferAllocator;
use crate::resources::light_probe::LightProbeField;

/// Environment switches for renderable synchronization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Authoring context: light-probe sampling bypasses its center cache and
    /// SH buffers are allocated even for units without probe participation.
    pub editor_mode: bool,
    /// When enabled, every shared-buffer upload also refreshes the world-bound buffer.
    pub occlusion_query: bool,
    /// Global switch for GPU instancing. When off no sub-unit takes the
    /// per-instance attribute path.
    pub instancing: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            editor_mode: false,
            occlusion_query: false,
            instancing: true,
        }
    }
}

impl SyncSettings {
    /// Parses settings from JSON. Missing fields fall back to their defaults.
    pub fn from_json(source: &str) -> Result<Self> {
        Ok(serde_json::from_str(source)?)
    }
}

/// Collaborators shared by every unit of a scene.
pub struct SyncContext {
    pub settings: SyncSettings,
    allocator: Rc<dyn BufferAllocator>,
    light_probes: Option<Rc<dyn LightProbeField>>,
}

impl SyncContext {
    #[must_use]
    pub fn new(settings: SyncSettings, allocator: Rc<dyn BufferAllocator>) -> Self {
        Self {
            settings,
            allocator,
            light_probes: None,
        }
    }

    /// Attaches the light-probe field units sample SH coefficients from.
    #[must_use]
    pub fn with_light_probes(mut self, field: Rc<dyn LightProbeField>) -> Self {
        self.light_probes = Some(field);
        self
    }

    #[inline]
    #[must_use]
    pub fn allocator(&self) -> &dyn BufferAllocator {
        self.allocator.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn light_probes(&self) -> Option<&dyn LightProbeField> {
        self.light_probes.as_deref()
    }
}

impl std::fmt::Debug for SyncContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncContext")
            .field("settings", &self.settings)
            .field("light_probes", &self.light_probes.is_some())
            .finish_non_exhaustive()
    }
}
