//! Logging and debugging facilities for weft.
//!
//! weft uses the `tracing` crate for instrumentation. Install a subscriber in
//! the application to see output, and filter by the targets in [`targets`]:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("weft_core::notify=trace,weft_core::event_loop=debug")
//!     .init();
//! ```
//!
//! [`ObjectTreeDebug`] renders the object hierarchy of a registry:
//!
//! ```
//! use weft_core::{Class, SharedObjectRegistry};
//! use weft_core::logging::{ObjectTreeDebug, TreeFormatOptions};
//!
//! let registry = SharedObjectRegistry::new();
//! let class = Class::builder("Panel").default("Text", "hello").build();
//! let root = registry.create_named(&class, "root");
//!
//! let debug = ObjectTreeDebug::with_options(&registry, TreeFormatOptions::detailed());
//! let output = debug.format_subtree(root).unwrap();
//! assert!(output.contains("root (Panel)"));
//! assert!(output.contains(".Text = hello"));
//! ```

use std::fmt::{self, Write as FmtWrite};

use crate::object::{ObjectId, ObjectResult, SharedObjectRegistry};

/// Target names for log filtering.
pub mod targets {
    /// Core framework target.
    pub const CORE: &str = "weft_core";
    /// Object creation and destruction.
    pub const OBJECT: &str = "weft_core::object";
    /// Attribute notifications.
    pub const NOTIFY: &str = "weft_core::notify";
    /// Task scheduling.
    pub const TASK: &str = "weft_core::task";
    /// Main loop and display.
    pub const EVENT_LOOP: &str = "weft_core::event_loop";
    /// Message routing.
    pub const ROUTER: &str = "weft_core::router";
    /// Window interval timers.
    pub const TIMER: &str = "weft_core::timer";
    /// Window and element behavior in the `weft` crate.
    pub const WINDOW: &str = "weft::window";
}

/// Style options for object tree visualization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TreeStyle {
    /// ASCII characters for tree branches.
    Ascii,
    /// Unicode box-drawing characters.
    #[default]
    Unicode,
}

/// Configuration for object tree debug output.
#[derive(Debug, Clone)]
pub struct TreeFormatOptions {
    /// The style of tree visualization.
    pub style: TreeStyle,
    /// Whether to show object IDs.
    pub show_ids: bool,
    /// Whether to show class names.
    pub show_classes: bool,
    /// Whether to list attribute values.
    pub show_attributes: bool,
    /// Maximum depth to traverse (None for unlimited).
    pub max_depth: Option<usize>,
}

impl Default for TreeFormatOptions {
    fn default() -> Self {
        Self {
            style: TreeStyle::default(),
            show_ids: false,
            show_classes: true,
            show_attributes: false,
            max_depth: None,
        }
    }
}

impl TreeFormatOptions {
    /// Include attribute values.
    pub fn detailed() -> Self {
        Self {
            show_attributes: true,
            ..Default::default()
        }
    }

    /// Names only.
    pub fn minimal() -> Self {
        Self {
            show_ids: false,
            show_classes: false,
            show_attributes: false,
            ..Default::default()
        }
    }
}

/// Renders the object tree of a registry.
#[derive(Debug, Clone)]
pub struct ObjectTreeDebug<'a> {
    registry: &'a SharedObjectRegistry,
    options: TreeFormatOptions,
}

impl<'a> ObjectTreeDebug<'a> {
    /// Create a visualizer with default options.
    pub fn new(registry: &'a SharedObjectRegistry) -> Self {
        Self::with_options(registry, TreeFormatOptions::default())
    }

    /// Create a visualizer with custom options.
    pub fn with_options(registry: &'a SharedObjectRegistry, options: TreeFormatOptions) -> Self {
        Self { registry, options }
    }

    /// Format every root object and its descendants.
    pub fn format_all(&self) -> ObjectResult<String> {
        let roots = self.registry.root_objects();
        let mut output = String::new();
        let _ = writeln!(output, "Object Tree ({} total objects):", self.registry.object_count());
        if roots.is_empty() {
            output.push_str("  (empty)\n");
        }
        for root in roots {
            self.format_node(root, "", true, 0, &mut output)?;
        }
        Ok(output)
    }

    /// Format one subtree.
    pub fn format_subtree(&self, root: ObjectId) -> ObjectResult<String> {
        let mut output = String::new();
        self.format_node(root, "", true, 0, &mut output)?;
        Ok(output)
    }

    fn format_node(
        &self,
        id: ObjectId,
        indent: &str,
        is_last: bool,
        depth: usize,
        output: &mut String,
    ) -> ObjectResult<()> {
        if self.options.max_depth.is_some_and(|max| depth > max) {
            return Ok(());
        }

        let (tee, elbow, pipe) = match self.options.style {
            TreeStyle::Ascii => ("+-- ", "`-- ", "|   "),
            TreeStyle::Unicode => ("\u{251c}\u{2500}\u{2500} ", "\u{2514}\u{2500}\u{2500} ", "\u{2502}   "),
        };
        let (connector, child_indent) = if depth == 0 {
            ("", indent.to_string())
        } else if is_last {
            (elbow, format!("{indent}    "))
        } else {
            (tee, format!("{indent}{pipe}"))
        };

        let name = self.registry.object_name(id)?;
        output.push_str(indent);
        output.push_str(connector);
        output.push_str(if name.is_empty() { "(unnamed)" } else { &name });
        if self.options.show_classes {
            let _ = write!(output, " ({})", self.registry.class(id)?.name());
        }
        if self.options.show_ids {
            let _ = write!(output, " [{id:?}]");
        }
        output.push('\n');

        if self.options.show_attributes {
            let lines = self.registry.with_read(|r| -> ObjectResult<Vec<String>> {
                let mut lines = Vec::new();
                for attribute in r.attribute_names(id)? {
                    if let Some(value) = r.attribute(id, attribute)? {
                        lines.push(format!(".{attribute} = {value}"));
                    }
                }
                Ok(lines)
            })?;
            for line in lines {
                let _ = writeln!(output, "{child_indent}  {line}");
            }
        }

        let children = self.registry.children(id)?;
        let count = children.len();
        for (i, child) in children.into_iter().enumerate() {
            self.format_node(child, &child_indent, i + 1 == count, depth + 1, output)?;
        }
        Ok(())
    }
}

impl fmt::Display for ObjectTreeDebug<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.format_all() {
            Ok(output) => f.write_str(&output),
            Err(e) => write!(f, "Error formatting object tree: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Class;

    fn tree() -> (SharedObjectRegistry, ObjectId) {
        let registry = SharedObjectRegistry::new();
        let window = Class::builder("Window").build();
        let button = Class::builder("Button").default("Text", "OK").build();
        let root = registry.create_named(&window, "main");
        for name in ["ok", "cancel"] {
            let child = registry.create_named(&button, name);
            registry.set_parent(child, Some(root)).unwrap();
        }
        (registry, root)
    }

    #[test]
    fn test_format_hierarchy() {
        let (registry, root) = tree();
        let output = ObjectTreeDebug::new(&registry).format_subtree(root).unwrap();
        assert!(output.starts_with("main (Window)\n"));
        assert!(output.contains("\u{251c}\u{2500}\u{2500} ok (Button)"));
        assert!(output.contains("\u{2514}\u{2500}\u{2500} cancel (Button)"));
    }

    #[test]
    fn test_format_minimal_ascii() {
        let (registry, root) = tree();
        let options = TreeFormatOptions {
            style: TreeStyle::Ascii,
            ..TreeFormatOptions::minimal()
        };
        let output = ObjectTreeDebug::with_options(&registry, options)
            .format_subtree(root)
            .unwrap();
        assert_eq!(output, "main\n+-- ok\n`-- cancel\n");
    }

    #[test]
    fn test_format_all_counts_objects() {
        let (registry, _) = tree();
        let output = ObjectTreeDebug::new(&registry).to_string();
        assert!(output.starts_with("Object Tree (3 total objects):"));

        let empty = SharedObjectRegistry::new();
        assert!(ObjectTreeDebug::new(&empty).to_string().contains("(empty)"));
    }

    #[test]
    fn test_max_depth() {
        let (registry, root) = tree();
        let options = TreeFormatOptions {
            max_depth: Some(0),
            ..TreeFormatOptions::minimal()
        };
        let output = ObjectTreeDebug::with_options(&registry, options)
            .format_subtree(root)
            .unwrap();
        assert_eq!(output, "main\n");
    }
}
