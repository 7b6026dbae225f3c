// ABOUTME: Renders ProseMirror rich-text trees into Markdown
// ABOUTME: Unknown node types pass their children through unformatted

use crate::model::Node;
use serde_json::Value;

/// Renders a node and all of its descendants.
pub fn render(node: &Node) -> String {
    match node {
        Node::Heading { level, content } => {
            format!("{} {}\n\n", "#".repeat(*level), render_all(content))
        }
        Node::Paragraph { content } => format!("{}\n\n", render_all(content)),
        Node::BulletList { content } => {
            let items: Vec<String> = content
                .iter()
                .filter_map(|child| match child {
                    Node::ListItem { content } => {
                        Some(format!("- {}", render_all(content).trim()))
                    }
                    _ => None,
                })
                .collect();
            format!("{}\n\n", items.join("\n"))
        }
        Node::Text { text } => text.clone(),
        Node::ListItem { content } | Node::Other { content } => render_all(content),
    }
}

fn render_all(nodes: &[Node]) -> String {
    nodes.iter().map(render).collect()
}

/// Renders raw ProseMirror JSON. Anything other than a JSON object yields an
/// empty string.
pub fn render_value(value: &Value) -> String {
    if !value.is_object() {
        return String::new();
    }
    render(&Node::from_value(value))
}

/// Renders the summary document: a title heading followed by the notes.
pub fn render_summary(title: &str, content: &Value) -> String {
    format!("# {}\n\n{}", title, render_value(content))
}
