//! Device→patient association.
//!
//! The transformer resolves which patient a device's readings belong to
//! through this seam, so the static table can later be replaced with a
//! registry lookup without touching the fan-out.

use std::collections::HashMap;

use async_trait::async_trait;

/// Resolves a device id to the patient currently associated with it.
#[async_trait]
pub trait PatientResolver: Send + Sync {
    /// Returns `None` when no association exists.
    async fn resolve(&self, device_id: &str) -> Option<String>;
}

/// Fixed in-memory association table.
pub struct StaticPatientResolver {
    mapping: HashMap<String, String>,
}

impl StaticPatientResolver {
    pub fn new(mapping: HashMap<String, String>) -> Self {
        Self { mapping }
    }

    pub fn with_association(
        mut self,
        device_id: impl Into<String>,
        patient_id: impl Into<String>,
    ) -> Self {
        self.mapping.insert(device_id.into(), patient_id.into());
        self
    }
}

impl Default for StaticPatientResolver {
    fn default() -> Self {
        Self::new(HashMap::new())
    }
}

#[async_trait]
impl PatientResolver for StaticPatientResolver {
    async fn resolve(&self, device_id: &str) -> Option<String> {
        self.mapping.get(device_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_known_devices_only() {
        let resolver = StaticPatientResolver::default()
            .with_association("Device-001", "P001")
            .with_association("Device-002", "P002");

        assert_eq!(resolver.resolve("Device-001").await.as_deref(), Some("P001"));
        assert_eq!(resolver.resolve("Device-002").await.as_deref(), Some("P002"));
        assert_eq!(resolver.resolve("Device-099").await, None);
    }
}
