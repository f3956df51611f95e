use crate::graph::{Graph, Layout, Line, Rule};

/// Render the graph as a makefile fragment.
///
/// Output depends only on the graph, so identical input gives identical bytes.
pub fn render_make(graph: &Graph) -> String {
    let mut out = String::new();
    for line in &graph.lines {
        match line {
            Line::Comment { text } => out.push_str(text),
            Line::Rule(rule) => out.push_str(&render_rule(rule)),
            Line::Blank => {}
        }
        out.push('\n');
    }
    out
}

fn render_rule(rule: &Rule) -> String {
    if rule.prerequisites.is_empty() {
        return format!("{}:", rule.target);
    }
    let sep = match rule.layout {
        Layout::Inline => " ",
        Layout::Continued => " \\\n\t",
    };
    format!("{}: {}", rule.target, rule.prerequisites.join(sep))
}
