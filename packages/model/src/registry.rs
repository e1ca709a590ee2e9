use crate::component::{Component, ComponentType, ExtensionId};
use crate::diagnostics::{ValidationWarning, WarningCode};
use std::collections::BTreeMap;

/// A plugin that knows how to render an extension component type.
///
/// The pipeline only asks whether a handler exists; rendering happens elsewhere.
pub trait ComponentHandler: Send + Sync {
    /// Element name used in source, e.g. `Chart`.
    fn name(&self) -> &str;
}

/// Capability registry mapping extension type tags to their handlers.
///
/// Owned by the caller and passed explicitly; there is no process-wide instance.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: BTreeMap<ExtensionId, Box<dyn ComponentHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler, returning the one it replaced.
    pub fn register(
        &mut self,
        id: ExtensionId,
        handler: Box<dyn ComponentHandler>,
    ) -> Option<Box<dyn ComponentHandler>> {
        self.handlers.insert(id, handler)
    }

    /// Built-in types are always handled; extensions only when registered.
    pub fn has_handler(&self, kind: ComponentType) -> bool {
        match kind {
            ComponentType::Extension(id) => self.handlers.contains_key(&id),
            _ => true,
        }
    }

    pub fn handler(&self, id: ExtensionId) -> Option<&dyn ComponentHandler> {
        self.handlers.get(&id).map(|h| h.as_ref())
    }

    /// Resolve a source element name to a registered extension type.
    pub fn lookup_name(&self, name: &str) -> Option<ComponentType> {
        self.handlers
            .iter()
            .find(|(_, handler)| handler.name() == name)
            .map(|(id, _)| ComponentType::Extension(*id))
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// One warning per extension-typed node that has no registered handler.
    pub fn unhandled_extensions(&self, root: &Component) -> Vec<ValidationWarning> {
        root.iter()
            .filter(|node| !self.has_handler(node.kind))
            .map(|node| {
                ValidationWarning::warning(
                    WarningCode::UnhandledExtension,
                    format!("no handler registered for component type {}", node.kind),
                )
                .with_component(node.id)
            })
            .collect()
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.handlers.iter().map(|(id, h)| (id.get(), h.name())))
            .finish()
    }
}
