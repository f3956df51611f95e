use crate::Result;
use crate::graph::Graph;

/// Render the graph as pretty-printed JSON, one object per output line.
pub fn render_json(graph: &Graph) -> Result<String> {
    let mut out = serde_json::to_string_pretty(graph)?;
    out.push('\n');
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Line, Rule};
    use serde_json::{Value, json};

    #[test]
    fn lines_are_tagged_by_kind() {
        let graph = Graph {
            lines: vec![
                Line::Comment {
                    text: "# vim:ft=make:".to_string(),
                },
                Line::Rule(Rule::new("b.rpm", vec!["a.rpm".to_string()])),
                Line::Blank,
            ],
        };

        let value: Value = serde_json::from_str(&render_json(&graph).unwrap()).unwrap();

        assert_eq!(
            value,
            json!({
                "lines": [
                    { "kind": "comment", "text": "# vim:ft=make:" },
                    {
                        "kind": "rule",
                        "target": "b.rpm",
                        "prerequisites": ["a.rpm"],
                        "layout": "inline"
                    },
                    { "kind": "blank" }
                ]
            })
        );
    }
}
