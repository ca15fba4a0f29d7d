//! Static tool classification.
//!
//! The cacheable/write/diagnostic split is an explicit table supplied by the
//! server, never inferred from tool names. Inferring it risks silently
//! caching a mutating operation.

use std::collections::HashMap;

/// How the dispatcher treats a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolClass {
    /// Idempotent read; results may be cached and replayed within the TTL.
    Read,
    /// Mutating call; never served from or stored into the cache.
    Write,
    /// Answered from local governance state; never cached, never rate
    /// limited. Must always answer.
    Diagnostic,
}

#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    classes: HashMap<String, ToolClass>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: impl Into<String>, class: ToolClass) {
        self.classes.insert(tool.into(), class);
    }

    pub fn class_of(&self, tool: &str) -> Option<ToolClass> {
        self.classes.get(tool).copied()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Registered tool ids, sorted.
    pub fn tools(&self) -> Vec<&str> {
        let mut tools: Vec<&str> = self.classes.keys().map(String::as_str).collect();
        tools.sort_unstable();
        tools
    }
}

impl<S: Into<String>> FromIterator<(S, ToolClass)> for ToolRegistry {
    fn from_iter<I: IntoIterator<Item = (S, ToolClass)>>(iter: I) -> Self {
        let mut registry = Self::new();
        for (tool, class) in iter {
            registry.register(tool, class);
        }
        registry
    }
}
