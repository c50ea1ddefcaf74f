//! Catalog of module types the host can place in the rack.
//!
//! The add-module menu lists what is registered here, and picking an entry
//! builds a fresh instance through its factory.

use std::collections::HashMap;

use super::module_trait::{Module, ModuleInfo};

/// Builds a fresh instance of one module type.
pub type ModuleFactory = fn() -> Box<dyn Module>;

/// Module types by type id, kept in the order they were registered.
///
/// ```ignore
/// let mut registry = ModuleRegistry::new();
/// registry.register::<Keyboard>();
/// registry.register::<Staff>();
///
/// let keyboard = registry.create("instrument.keyboard").map(|m| rack.add_boxed(m));
/// ```
pub struct ModuleRegistry {
    /// Metadata per type; `factories` shares its indices.
    infos: Vec<ModuleInfo>,
    factories: Vec<ModuleFactory>,
    by_id: HashMap<&'static str, usize>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self {
            infos: Vec::new(),
            factories: Vec::new(),
            by_id: HashMap::new(),
        }
    }

    /// Adds module type `M`, reading its ports and name from a default
    /// instance.
    ///
    /// Returns false, and keeps the earlier entry, when the type id is taken.
    pub fn register<M: Module + Default>(&mut self) -> bool {
        let info = M::default().info().clone();
        if self.by_id.contains_key(info.id) {
            log::warn!("module type '{}' is already registered", info.id);
            return false;
        }

        self.by_id.insert(info.id, self.infos.len());
        self.infos.push(info);
        self.factories
            .push(|| -> Box<dyn Module> { Box::new(M::default()) });
        true
    }

    /// Builds a new instance of the type registered as `id`.
    pub fn create(&self, id: &str) -> Option<Box<dyn Module>> {
        let index = *self.by_id.get(id)?;
        log::debug!("creating {}", self.infos[index].name);
        Some((self.factories[index])())
    }

    /// Metadata of every registered type, for the add-module menu.
    pub fn list_modules(&self) -> &[ModuleInfo] {
        &self.infos
    }

    pub fn len(&self) -> usize {
        self.infos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::{ModuleKind, PortSpec};
    use crate::patch::category;
    use std::any::Any;

    #[derive(Default)]
    struct TestSource;

    impl Module for TestSource {
        fn info(&self) -> &ModuleInfo {
            static PORTS: [PortSpec; 1] = [PortSpec::sender("out", "Out", category::MIDI)];
            static INFO: ModuleInfo = ModuleInfo {
                id: "test.source",
                name: "Test Source",
                kind: ModuleKind::Player,
                description: "Emits notes",
                ports: &PORTS,
            };
            &INFO
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    #[derive(Default)]
    struct TestSink;

    impl Module for TestSink {
        fn info(&self) -> &ModuleInfo {
            static PORTS: [PortSpec; 1] = [PortSpec::receiver("in", "In", category::MIDI)];
            static INFO: ModuleInfo = ModuleInfo {
                id: "test.sink",
                name: "Test Sink",
                kind: ModuleKind::Display,
                description: "Swallows notes",
                ports: &PORTS,
            };
            &INFO
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    #[test]
    fn test_registry_creation() {
        let registry = ModuleRegistry::default();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_register_multiple_modules() {
        let mut registry = ModuleRegistry::new();
        assert!(registry.register::<TestSource>());
        assert!(registry.register::<TestSink>());

        assert_eq!(registry.len(), 2);
        assert!(registry.contains("test.source"));
        assert!(registry.contains("test.sink"));
    }

    #[test]
    fn test_create_module() {
        let mut registry = ModuleRegistry::new();
        registry.register::<TestSource>();

        let module = registry.create("test.source").unwrap();
        assert_eq!(module.info().name, "Test Source");
        assert_eq!(module.info().kind, ModuleKind::Player);
        assert!(registry.create("unknown.module").is_none());
    }

    #[test]
    fn test_list_modules_keeps_registration_order() {
        let mut registry = ModuleRegistry::new();
        registry.register::<TestSink>();
        registry.register::<TestSource>();

        let ids: Vec<&str> = registry.list_modules().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec!["test.sink", "test.source"]);
    }

    #[test]
    fn test_duplicate_registration_is_ignored() {
        let mut registry = ModuleRegistry::new();
        assert!(registry.register::<TestSource>());
        assert!(!registry.register::<TestSource>());
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.list_modules().len(), 1);
    }
}
