//! Hook/observer bus for pipeline lifecycle events.
//!
//! Callbacks are keyed by `(owner, event)` pairs and fire at well-defined
//! pipeline points. The core emits events; it does not know what observers
//! do. Registration finishes before the transform phase begins; triggering
//! is read-only with respect to the registry itself.

use std::collections::HashMap;

use super::resource::Resource;

/// Pipeline events the core emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookEvent {
    PreRender,
    PostRender,
}

pub type HookFn = Box<dyn Fn(&mut Resource) + Send + Sync>;

struct RegisteredHook {
    priority: i32,
    order: usize,
    callback: HookFn,
}

/// Registry of prioritized, orderable callbacks keyed by owner + event.
#[derive(Default)]
pub struct HookRegistry {
    hooks: HashMap<(String, HookEvent), Vec<RegisteredHook>>,
    next_order: usize,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback for `(owner, event)` with a priority. Higher
    /// priorities fire first; equal priorities fire in registration order.
    pub fn register<F>(&mut self, owner: &str, event: HookEvent, priority: i32, callback: F)
    where
        F: Fn(&mut Resource) + Send + Sync + 'static,
    {
        let entry = self
            .hooks
            .entry((owner.to_string(), event))
            .or_default();
        entry.push(RegisteredHook {
            priority,
            order: self.next_order,
            callback: Box::new(callback),
        });
        self.next_order += 1;
        entry.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.order.cmp(&b.order)));
    }

    /// Fire all callbacks registered for `(owner, event)`.
    pub fn trigger(&self, owner: &str, event: HookEvent, resource: &mut Resource) {
        if let Some(hooks) = self.hooks.get(&(owner.to_string(), event)) {
            for hook in hooks {
                (hook.callback)(resource);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use serde_yaml::Mapping;
    use std::path::PathBuf;

    fn resource() -> Resource {
        Resource::from_raw(
            PathBuf::from("_posts/a.md"),
            "posts",
            "body",
            &Mapping::new(),
            &SiteConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_hooks_fire_in_priority_order() {
        let mut registry = HookRegistry::new();
        registry.register("resources", HookEvent::PreRender, 0, |r| {
            r.content.push_str(" low");
        });
        registry.register("resources", HookEvent::PreRender, 10, |r| {
            r.content.push_str(" high");
        });

        let mut r = resource();
        registry.trigger("resources", HookEvent::PreRender, &mut r);
        assert_eq!(r.content, "body high low");
    }

    #[test]
    fn test_equal_priority_fires_in_registration_order() {
        let mut registry = HookRegistry::new();
        registry.register("resources", HookEvent::PostRender, 5, |r| {
            r.content.push_str(" first");
        });
        registry.register("resources", HookEvent::PostRender, 5, |r| {
            r.content.push_str(" second");
        });

        let mut r = resource();
        registry.trigger("resources", HookEvent::PostRender, &mut r);
        assert_eq!(r.content, "body first second");
    }

    #[test]
    fn test_unmatched_owner_is_noop() {
        let mut registry = HookRegistry::new();
        registry.register("resources", HookEvent::PreRender, 0, |r| {
            r.content.push_str(" touched");
        });

        let mut r = resource();
        registry.trigger("layouts", HookEvent::PreRender, &mut r);
        assert_eq!(r.content, "body");
    }
}
