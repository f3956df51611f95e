//! The build-dependency graph as an ordered list of make facts.
//!
//! The graph is built in one pass from the effective specs and the provides
//! index, then handed to a renderer. Nothing mutates it afterwards.

pub mod deps;
pub mod provides;

pub use provides::ProvidesIndex;

use crate::Result;
use crate::pins::EffectiveSpecs;
use crate::spec::Spec;

use serde::Serialize;

pub const HEADER: [&str; 2] = ["# -*- makefile -*-", "# vim:ft=make:"];

/// How a rule's prerequisites are laid out when rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    /// `target: a b c`
    Inline,
    /// One prerequisite per line, joined with backslash continuations.
    Continued,
}

/// One `target: prerequisites` fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rule {
    pub target: String,
    pub prerequisites: Vec<String>,
    pub layout: Layout,
}

impl Rule {
    pub fn new(target: impl Into<String>, prerequisites: Vec<String>) -> Self {
        Self {
            target: target.into(),
            prerequisites,
            layout: Layout::Inline,
        }
    }

    pub fn continued(target: impl Into<String>, prerequisites: Vec<String>) -> Self {
        Self {
            layout: Layout::Continued,
            ..Self::new(target, prerequisites)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Line {
    Comment { text: String },
    Rule(Rule),
    Blank,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Graph {
    pub lines: Vec<Line>,
}

impl Graph {
    fn comment(&mut self, text: impl Into<String>) {
        self.lines.push(Line::Comment { text: text.into() });
    }

    fn rule(&mut self, rule: Rule) {
        self.lines.push(Line::Rule(rule));
    }

    fn blank(&mut self) {
        self.lines.push(Line::Blank);
    }

    /// All rules, skipping comments and separators.
    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.lines.iter().filter_map(|line| match line {
            Line::Rule(rule) => Some(rule),
            _ => None,
        })
    }

    /// Every `(target, prerequisite)` edge in emission order.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str)> {
        self.rules().flat_map(|rule| {
            rule.prerequisites
                .iter()
                .map(move |p| (rule.target.as_str(), p.as_str()))
        })
    }
}

/// Build the whole graph.
///
/// `prelude` holds comment lines printed right after the fixed header
/// (deprecation warnings, pin notices).
pub fn build_graph<S: Spec>(
    prelude: &[String],
    specs: &EffectiveSpecs<S>,
    provides: &ProvidesIndex,
) -> Result<Graph> {
    let mut graph = Graph::default();

    for line in HEADER {
        graph.comment(line);
    }
    for line in prelude {
        graph.comment(line.as_str());
    }

    // Phase 1: per-spec rules, one blank line after each spec.
    for spec in specs.iter() {
        for rule in deps::spec_rules(spec, provides)? {
            graph.rule(rule);
        }
        graph.blank();
    }

    // Phase 2: name targets and the aggregate groups.
    let mut all_rpms = Vec::with_capacity(specs.len());
    let mut all_srpms = Vec::with_capacity(specs.len());
    for spec in specs.iter() {
        let rpm = provides::primary_binary(spec)?.to_string();
        let srpm = spec.source_package_path().to_string();
        graph.rule(Rule::new(spec.name(), vec![rpm.clone()]));
        graph.rule(Rule::new(format!("{}.srpm", spec.name()), vec![srpm.clone()]));
        all_rpms.push(rpm);
        all_srpms.push(srpm);
    }
    graph.blank();

    graph.rule(Rule::continued("rpms", all_rpms));
    graph.blank();
    graph.rule(Rule::continued("srpms", all_srpms));
    graph.blank();

    Ok(graph)
}
