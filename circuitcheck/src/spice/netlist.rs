//! SPICE netlist parser.
//!
//! Line-oriented state machine over SPICE text: comments and directives are
//! recognized and skipped (`.ac` is captured, `.end` stops parsing),
//! continuation lines are joined, and every element line is tokenized into a
//! reference designator, its terminal nodes and a value/model string.
//! Unknown reference prefixes are captured as [`ElementKind::Unknown`]
//! rather than rejected.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use petgraph::graph::{NodeIndex, UnGraph};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::units;

#[derive(Debug, Error)]
pub enum NetlistError {
    #[error("Netlist file not found: {0}")]
    NotFound(std::path::PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },
}

/// Element kind, determined by the reference designator's leading character.
///
/// A closed tagged union: kinds the analyzer understands, plus `Unknown`
/// carrying the raw prefix so unfamiliar element types survive parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Resistor,
    Capacitor,
    Inductor,
    Diode,
    Bjt,
    Mosfet,
    Jfet,
    VoltageSource,
    CurrentSource,
    /// E/F/G/H dependent sources.
    ControlledSource,
    /// X subcircuit instance.
    Subcircuit,
    Unknown(char),
}

impl ElementKind {
    /// Classify from the leading character of a reference designator.
    pub fn from_prefix(prefix: char) -> Self {
        match prefix.to_ascii_uppercase() {
            'R' => ElementKind::Resistor,
            'C' => ElementKind::Capacitor,
            'L' => ElementKind::Inductor,
            'D' => ElementKind::Diode,
            'Q' => ElementKind::Bjt,
            'M' => ElementKind::Mosfet,
            'J' => ElementKind::Jfet,
            'V' => ElementKind::VoltageSource,
            'I' => ElementKind::CurrentSource,
            'E' | 'F' | 'G' | 'H' => ElementKind::ControlledSource,
            'X' => ElementKind::Subcircuit,
            other => ElementKind::Unknown(other),
        }
    }

    /// Number of terminal nodes this kind declares, or `None` when the node
    /// count is not fixed (subcircuits, unknown kinds).
    pub fn node_count(&self) -> Option<usize> {
        match self {
            ElementKind::Resistor
            | ElementKind::Capacitor
            | ElementKind::Inductor
            | ElementKind::Diode
            | ElementKind::VoltageSource
            | ElementKind::CurrentSource => Some(2),
            ElementKind::Bjt | ElementKind::Jfet => Some(3),
            ElementKind::Mosfet | ElementKind::ControlledSource => Some(4),
            ElementKind::Subcircuit | ElementKind::Unknown(_) => None,
        }
    }
}

/// One parsed netlist element. Owned by the graph that parsed it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetElement {
    /// Reference designator, unique within a netlist ("R1", "M2").
    pub reference: String,
    pub kind: ElementKind,
    /// Terminal node names, in declaration order.
    pub nodes: Vec<String>,
    /// Trailing value or model text, verbatim.
    pub value: String,
    /// First value token parsed to base units, when numeric ("10k" = 1e4).
    pub numeric_value: Option<f64>,
}

/// Parsed `.ac` simulation directive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcDirective {
    /// Sweep variation keyword: "dec", "oct" or "lin".
    pub variation: String,
    pub points: usize,
    pub start_freq: f64,
    pub stop_freq: f64,
}

/// Structured netlist: declared nodes plus an ordered element sequence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetlistGraph {
    /// Title line, when the netlist starts with one.
    pub title: Option<String>,
    /// Every node name referenced by an element.
    pub nodes: BTreeSet<String>,
    pub elements: Vec<NetElement>,
    pub ac_directives: Vec<AcDirective>,
    /// Other directives, verbatim, for round-tripping.
    pub directives: Vec<String>,
}

impl NetlistGraph {
    pub fn has_node(&self, name: &str) -> bool {
        self.nodes.contains(name)
    }

    pub fn element(&self, reference: &str) -> Option<&NetElement> {
        self.elements.iter().find(|e| e.reference == reference)
    }

    /// Undirected connectivity graph: one vertex per node, one edge per
    /// adjacent terminal pair of each element.
    pub fn connectivity(&self) -> UnGraph<&str, ()> {
        self.build_connectivity().0
    }

    fn build_connectivity(&self) -> (UnGraph<&str, ()>, HashMap<&str, NodeIndex>) {
        let mut graph: UnGraph<&str, ()> = UnGraph::new_undirected();
        let mut indices: HashMap<&str, NodeIndex> = HashMap::new();
        for node in &self.nodes {
            indices.insert(node.as_str(), graph.add_node(node.as_str()));
        }
        for element in &self.elements {
            for pair in element.nodes.windows(2) {
                if let (Some(&i), Some(&j)) =
                    (indices.get(pair[0].as_str()), indices.get(pair[1].as_str()))
                {
                    graph.add_edge(i, j, ());
                }
            }
        }
        (graph, indices)
    }

    /// Whether two nodes are electrically reachable from each other through
    /// element terminals.
    pub fn are_connected(&self, a: &str, b: &str) -> bool {
        if a == b {
            return self.has_node(a);
        }
        let (graph, indices) = self.build_connectivity();
        match (indices.get(a), indices.get(b)) {
            (Some(&i), Some(&j)) => petgraph::algo::has_path_connecting(&graph, i, j, None),
            _ => false,
        }
    }

    /// Serialize back to SPICE text. `parse(to_spice(parse(text)))` yields a
    /// graph structurally equal to `parse(text)`.
    pub fn to_spice(&self) -> String {
        let mut out = String::new();
        if let Some(title) = &self.title {
            out.push_str("* ");
            out.push_str(title);
            out.push('\n');
        }
        for element in &self.elements {
            out.push_str(&element.reference);
            for node in &element.nodes {
                out.push(' ');
                out.push_str(node);
            }
            if !element.value.is_empty() {
                out.push(' ');
                out.push_str(&element.value);
            }
            out.push('\n');
        }
        for ac in &self.ac_directives {
            out.push_str(&format!(
                ".ac {} {} {} {}\n",
                ac.variation, ac.points, ac.start_freq, ac.stop_freq
            ));
        }
        for directive in &self.directives {
            out.push_str(directive);
            out.push('\n');
        }
        out.push_str(".end\n");
        out
    }
}

/// SPICE netlist parser.
///
/// Lenient by default: malformed element lines are skipped with a warning
/// and parsing continues. Strict mode turns them into errors.
#[derive(Debug, Clone, Default)]
pub struct NetlistParser {
    strict: bool,
}

impl NetlistParser {
    pub fn new() -> Self {
        Self { strict: false }
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Parse a netlist file. A missing path is a `NotFound` error, never
    /// swallowed.
    pub fn parse_file(&self, path: &Path) -> Result<NetlistGraph, NetlistError> {
        if !path.exists() {
            return Err(NetlistError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        self.parse_content(&content)
    }

    /// Parse netlist text. Idempotent: parsing the same text twice yields
    /// structurally equal graphs.
    pub fn parse_content(&self, content: &str) -> Result<NetlistGraph, NetlistError> {
        let mut graph = NetlistGraph::default();

        for (line_no, line) in join_continuations(content) {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            if let Some(comment) = trimmed.strip_prefix('*') {
                // The first comment line doubles as the netlist title.
                if graph.title.is_none() && graph.elements.is_empty() {
                    let text = comment.trim();
                    if !text.is_empty() {
                        graph.title = Some(text.to_string());
                    }
                }
                continue;
            }
            if trimmed.starts_with('.') {
                let lower = trimmed.to_lowercase();
                if lower.starts_with(".end") && !lower.starts_with(".ends") {
                    break;
                }
                if lower.starts_with(".ac") {
                    match parse_ac_directive(trimmed) {
                        Some(ac) => graph.ac_directives.push(ac),
                        None => {
                            tracing::warn!(line = line_no, "skipping malformed .ac directive")
                        }
                    }
                } else {
                    graph.directives.push(trimmed.to_string());
                }
                continue;
            }

            match parse_element_line(trimmed) {
                Ok(element) => {
                    for node in &element.nodes {
                        graph.nodes.insert(node.clone());
                    }
                    graph.elements.push(element);
                }
                Err(message) => {
                    if self.strict {
                        return Err(NetlistError::Parse {
                            line: line_no,
                            message,
                        });
                    }
                    tracing::warn!(line = line_no, message, "skipping malformed element line");
                }
            }
        }

        Ok(graph)
    }
}

/// Join `+` continuation lines onto their logical line, keeping the line
/// number of the first physical line.
fn join_continuations(content: &str) -> Vec<(usize, String)> {
    let mut lines: Vec<(usize, String)> = Vec::new();
    for (idx, raw) in content.lines().enumerate() {
        let trimmed = raw.trim_start();
        if let Some(rest) = trimmed.strip_prefix('+') {
            if let Some((_, last)) = lines.last_mut() {
                last.push(' ');
                last.push_str(rest.trim());
                continue;
            }
        }
        lines.push((idx + 1, raw.to_string()));
    }
    lines
}

fn parse_ac_directive(line: &str) -> Option<AcDirective> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < 5 {
        return None;
    }
    Some(AcDirective {
        variation: tokens[1].to_lowercase(),
        points: tokens[2].parse().ok()?,
        start_freq: units::parse_spice_value(tokens[3])?,
        stop_freq: units::parse_spice_value(tokens[4])?,
    })
}

fn parse_element_line(line: &str) -> Result<NetElement, String> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < 3 {
        return Err(format!("element line needs at least 3 tokens: '{}'", line));
    }

    let reference = tokens[0].to_string();
    let Some(prefix) = reference.chars().next() else {
        return Err("empty reference designator".to_string());
    };
    let kind = ElementKind::from_prefix(prefix);

    let (nodes, value_tokens): (&[&str], &[&str]) = match kind.node_count() {
        Some(n) => {
            if tokens.len() < 1 + n {
                return Err(format!(
                    "{} declares {} nodes but line has {} tokens",
                    reference,
                    n,
                    tokens.len()
                ));
            }
            (&tokens[1..1 + n], &tokens[1 + n..])
        }
        // Variable node count: everything between the reference and the
        // final token is a node, the last token is the value/model.
        None => (&tokens[1..tokens.len() - 1], &tokens[tokens.len() - 1..]),
    };

    let value = value_tokens.join(" ");
    let numeric_value = value_tokens.first().and_then(|t| units::parse_spice_value(t));

    Ok(NetElement {
        reference,
        kind,
        nodes: nodes.iter().map(|s| s.to_string()).collect(),
        value,
        numeric_value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_two_line_spec_example() {
        let graph = NetlistParser::new()
            .parse_content("R1 1 0 10k\nC1 1 0 100n")
            .unwrap();
        assert_eq!(graph.elements.len(), 2);
        assert_eq!(
            graph.nodes,
            ["1", "0"].iter().map(|s| s.to_string()).collect()
        );
        assert!((graph.elements[0].numeric_value.unwrap() - 10_000.0).abs() < 1e-6);
        assert!((graph.elements[1].numeric_value.unwrap() - 1e-7).abs() < 1e-13);
    }

    #[test]
    fn test_parse_is_idempotent() {
        let text = "* RC lowpass\nV1 in 0 AC 1\nR1 in out 1k\nC1 out 0 100n\n.ac dec 20 1 1e6\n.end";
        let parser = NetlistParser::new();
        let a = parser.parse_content(text).unwrap();
        let b = parser.parse_content(text).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_serializer_round_trip() {
        let text = "* RC lowpass\nV1 in 0 AC 1\nR1 in out 1k\nC1 out 0 100n\n.ac dec 20 1 1e6\n.end";
        let parser = NetlistParser::new();
        let first = parser.parse_content(text).unwrap();
        let second = parser.parse_content(&first.to_spice()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_comments_and_directives_skipped() {
        let text = "* comment line\n# hash comment\n.include models.lib\nR1 1 0 10k\n.end\nR2 2 0 1k";
        let graph = NetlistParser::new().parse_content(text).unwrap();
        // .end stops parsing, so R2 never appears.
        assert_eq!(graph.elements.len(), 1);
        assert_eq!(graph.directives, vec![".include models.lib".to_string()]);
    }

    #[test]
    fn test_ac_directive_captured() {
        let graph = NetlistParser::new()
            .parse_content("R1 1 0 1k\n.ac dec 50 1 1meg")
            .unwrap();
        assert_eq!(graph.ac_directives.len(), 1);
        let ac = &graph.ac_directives[0];
        assert_eq!(ac.variation, "dec");
        assert_eq!(ac.points, 50);
        assert!((ac.stop_freq - 1e6).abs() < 1e-3);
    }

    #[test]
    fn test_transistor_node_counts() {
        let text = "Q1 c b e 2N2222\nM1 d g s b IRF540";
        let graph = NetlistParser::new().parse_content(text).unwrap();
        assert_eq!(graph.elements[0].kind, ElementKind::Bjt);
        assert_eq!(graph.elements[0].nodes.len(), 3);
        assert_eq!(graph.elements[1].kind, ElementKind::Mosfet);
        assert_eq!(graph.elements[1].nodes.len(), 4);
    }

    #[test]
    fn test_unknown_prefix_captured_not_rejected() {
        let graph = NetlistParser::new()
            .parse_content("Z1 1 0 mystery")
            .unwrap();
        assert_eq!(graph.elements.len(), 1);
        assert_eq!(graph.elements[0].kind, ElementKind::Unknown('Z'));
        assert_eq!(graph.elements[0].nodes, vec!["1", "0"]);
        assert_eq!(graph.elements[0].value, "mystery");
    }

    #[test]
    fn test_continuation_lines_joined() {
        let text = "V1 in 0\n+ AC 1\nR1 in out 1k";
        let graph = NetlistParser::new().parse_content(text).unwrap();
        assert_eq!(graph.elements.len(), 2);
        assert_eq!(graph.elements[0].value, "AC 1");
    }

    #[test]
    fn test_lenient_skips_malformed_line() {
        let graph = NetlistParser::new()
            .parse_content("R1 1\nC1 1 0 100n")
            .unwrap();
        assert_eq!(graph.elements.len(), 1);
        assert_eq!(graph.elements[0].reference, "C1");
    }

    #[test]
    fn test_strict_rejects_malformed_line() {
        let err = NetlistParser::new()
            .strict(true)
            .parse_content("R1 1\nC1 1 0 100n")
            .unwrap_err();
        assert!(matches!(err, NetlistError::Parse { line: 1, .. }));
    }

    #[test]
    fn test_parse_file_missing_is_not_found() {
        let err = NetlistParser::new()
            .parse_file(Path::new("/nonexistent/filter.cir"))
            .unwrap_err();
        assert!(matches!(err, NetlistError::NotFound(_)));
    }

    #[test]
    fn test_connectivity() {
        let graph = NetlistParser::new()
            .parse_content("R1 in mid 1k\nC1 mid 0 100n\nR9 floatA floatB 1k")
            .unwrap();
        assert!(graph.are_connected("in", "0"));
        assert!(!graph.are_connected("in", "floatA"));
        assert_eq!(graph.connectivity().node_count(), graph.nodes.len());
    }

    #[test]
    fn test_title_from_leading_comment() {
        let graph = NetlistParser::new()
            .parse_content("* my filter\nR1 1 0 1k")
            .unwrap();
        assert_eq!(graph.title.as_deref(), Some("my filter"));
    }
}
