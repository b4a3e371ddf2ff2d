//! Ordered registry of tools keyed by name.

use indexmap::IndexMap;
use thiserror::Error;
use tracing::{debug, info};

use crate::tools::Tool;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("a tool named `{0}` is already registered")]
    DuplicateTool(String),

    #[error("no tool named `{0}` is registered")]
    UnknownTool(String),
}

/// Tools available to one [`AiApi`](crate::AiApi) instance, in registration
/// order.
///
/// Names are unique ignoring ASCII case, so a model that changes the
/// capitalization of a tool name still resolves to a single tool.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    tools: IndexMap<String, Tool>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool. Fails if the name is taken; use [`Registry::replace`] to
    /// overwrite on purpose.
    pub fn register(&mut self, tool: Tool) -> Result<&Tool, RegistryError> {
        if let Some(existing) = self.find_key(tool.name()) {
            return Err(RegistryError::DuplicateTool(existing.to_string()));
        }

        info!(tool = %tool.name(), parameters = tool.parameters().len(), "Registered tool");
        let (idx, _) = self.tools.insert_full(tool.name().to_string(), tool);
        Ok(&self.tools[idx])
    }

    /// Add a tool under an explicit name instead of its own.
    pub fn register_as(&mut self, tool: Tool, name: impl Into<String>) -> Result<&Tool, RegistryError> {
        self.register(tool.with_name(name))
    }

    /// Add or overwrite a tool, returning the one it replaced.
    ///
    /// A replaced tool keeps its position in registration order.
    pub fn replace(&mut self, tool: Tool) -> Option<Tool> {
        match self.find_key(tool.name()).map(str::to_string) {
            Some(key) => {
                debug!(tool = %tool.name(), "Replacing registered tool");
                let idx = self.tools.get_index_of(&key)?;
                let (_, old) = self.tools.shift_remove_index(idx)?;
                self.tools.shift_insert(idx, tool.name().to_string(), tool);
                Some(old)
            }
            None => {
                info!(tool = %tool.name(), "Registered tool");
                self.tools.insert(tool.name().to_string(), tool);
                None
            }
        }
    }

    /// Find a tool by exact name, falling back to an ASCII case-insensitive match.
    pub fn lookup(&self, name: &str) -> Result<&Tool, RegistryError> {
        let name = name.trim();
        self.tools
            .get(name)
            .or_else(|| self.find_key(name).and_then(|key| self.tools.get(key)))
            .ok_or_else(|| RegistryError::UnknownTool(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_ok()
    }

    /// Snapshot of all tools in registration order.
    pub fn list_tools(&self) -> Vec<&Tool> {
        self.tools.values().collect()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    fn find_key(&self, name: &str) -> Option<&str> {
        self.tools
            .keys()
            .find(|key| key.eq_ignore_ascii_case(name))
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{to_output, ParameterSpec};

    fn tool(name: &str, reply: &'static str) -> Tool {
        Tool::new(name, "test tool", vec![ParameterSpec::new("x", "int", "")], "", move |_| {
            to_output(reply)
        })
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut registry = Registry::new();
        registry.register(tool("echo", "first")).unwrap();

        let err = registry.register(tool("echo", "second")).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateTool("echo".to_string()));

        let err = registry.register(tool("ECHO", "third")).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateTool("echo".to_string()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn replace_overwrites_in_place() {
        let mut registry = Registry::new();
        registry.register(tool("a", "a")).unwrap();
        registry.register(tool("b", "old")).unwrap();
        registry.register(tool("c", "c")).unwrap();

        let old = registry.replace(tool("b", "new"));
        assert!(old.is_some());

        let names: Vec<_> = registry.names().collect();
        assert_eq!(names, ["a", "b", "c"]);
        let result = registry.lookup("b").unwrap().invoke(Default::default()).unwrap();
        assert_eq!(result, "new");
    }

    #[test]
    fn replace_adds_missing_tools() {
        let mut registry = Registry::new();
        assert!(registry.replace(tool("a", "a")).is_none());
        assert!(registry.contains("a"));
    }

    #[test]
    fn lookup_falls_back_to_case_insensitive() {
        let mut registry = Registry::new();
        registry.register(tool("get_weather", "sunny")).unwrap();

        assert_eq!(registry.lookup("Get_Weather").unwrap().name(), "get_weather");
        assert_eq!(
            registry.lookup("get_forecast").unwrap_err(),
            RegistryError::UnknownTool("get_forecast".to_string())
        );
    }

    #[test]
    fn register_as_uses_explicit_name() {
        let mut registry = Registry::new();
        registry.register_as(tool("internal", "x"), "public").unwrap();

        assert!(registry.contains("public"));
        assert!(!registry.contains("internal"));
    }

    #[test]
    fn list_preserves_registration_order() {
        let mut registry = Registry::new();
        for name in ["zeta", "alpha", "mid"] {
            registry.register(tool(name, "x")).unwrap();
        }

        let tools = registry.list_tools();
        let names: Vec<_> = tools.iter().map(|t| t.name()).collect();
        assert_eq!(names, ["zeta", "alpha", "mid"]);
    }
}
