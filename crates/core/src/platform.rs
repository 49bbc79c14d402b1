use std::any::Any;
use std::sync::Arc;

/// Whoever issued the command. The engine never inspects a sender beyond
/// passing it to requirement predicates and the permission check; the one
/// distinguished identity is the console, which is exempt from options
/// marked [`required_unless_console`].
///
/// [`required_unless_console`]: crate::node::CommandNode::required_unless_console
pub trait CommandSender: Any + Send + Sync {
    fn is_console(&self) -> bool {
        false
    }
}

/// The console identity.
pub struct ConsoleSender;

impl CommandSender for ConsoleSender {
    fn is_console(&self) -> bool {
        true
    }
}

/// The authorization collaborator. Must be side-effect-free and fast:
/// traversal probes it once per candidate node.
pub trait PermissionProvider: Send + Sync {
    fn has_permission(&self, sender: &dyn CommandSender, permission: &str) -> bool;
}

/// Grants every permission. The default when the platform supplies no
/// authorizer, and what tests that are not about gating use.
pub struct AllowAll;

impl PermissionProvider for AllowAll {
    fn has_permission(&self, _sender: &dyn CommandSender, _permission: &str) -> bool {
        true
    }
}

/// Host services threaded through parsing and completion.
///
/// Carries the permission collaborator plus an opaque service handle that
/// concrete argument types may downcast to reach game data. The engine
/// itself never looks inside the service slot.
#[derive(Clone)]
pub struct PluginContext {
    permissions: Arc<dyn PermissionProvider>,
    services: Option<Arc<dyn Any + Send + Sync>>,
}

impl PluginContext {
    pub fn new() -> Self {
        PluginContext {
            permissions: Arc::new(AllowAll),
            services: None,
        }
    }

    pub fn with_permissions(mut self, permissions: Arc<dyn PermissionProvider>) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn with_services(mut self, services: Arc<dyn Any + Send + Sync>) -> Self {
        self.services = Some(services);
        self
    }

    /// The host service handle, if it is a `T`.
    pub fn service<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.services.clone().and_then(|s| s.downcast::<T>().ok())
    }

    pub fn has_permission(&self, sender: &dyn CommandSender, permission: &str) -> bool {
        self.permissions.has_permission(sender, permission)
    }
}

impl Default for PluginContext {
    fn default() -> Self {
        Self::new()
    }
}
