//! KiCad netlist import.
//!
//! Reads the two export formats KiCad produces for a schematic: the
//! s-expression `.net` netlist and the intermediate `.xml` netlist. Both are
//! reduced to a [`CircuitSummary`] of components and named nets. These files
//! carry connectivity and part metadata but no simulatable element values,
//! so they feed SOA analysis and reporting rather than frequency sweeps.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KicadError {
    #[error("Netlist file not found: {0}")]
    NotFound(std::path::PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unsupported netlist format: {0}")]
    UnsupportedFormat(String),
    #[error("Parse error: {0}")]
    Parse(String),
}

/// One schematic component.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KicadComponent {
    pub reference: String,
    pub value: String,
    pub footprint: Option<String>,
    pub datasheet: Option<String>,
}

/// One named net and the component pins on it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KicadNet {
    pub name: String,
    /// (component reference, pin) pairs.
    pub pins: Vec<(String, String)>,
}

/// Reduced view of a KiCad netlist.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CircuitSummary {
    pub components: Vec<KicadComponent>,
    pub nets: Vec<KicadNet>,
}

impl CircuitSummary {
    pub fn component(&self, reference: &str) -> Option<&KicadComponent> {
        self.components.iter().find(|c| c.reference == reference)
    }
}

/// Parse a KiCad netlist file, dispatching on extension.
pub fn read_netlist(path: &Path) -> Result<CircuitSummary, KicadError> {
    if !path.exists() {
        return Err(KicadError::NotFound(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path)?;
    match path.extension().and_then(|s| s.to_str()) {
        Some("net") => read_netlist_sexp(&content),
        Some("xml") => read_netlist_xml(&content),
        other => Err(KicadError::UnsupportedFormat(
            other.unwrap_or("<none>").to_string(),
        )),
    }
}

// ---------------------------------------------------------------------------
// S-expression format (.net)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Sexp {
    Atom(String),
    List(Vec<Sexp>),
}

impl Sexp {
    /// First atom of a list, used as the node's tag.
    fn tag(&self) -> Option<&str> {
        match self {
            Sexp::List(items) => match items.first() {
                Some(Sexp::Atom(s)) => Some(s.as_str()),
                _ => None,
            },
            Sexp::Atom(_) => None,
        }
    }

    fn children(&self) -> &[Sexp] {
        match self {
            Sexp::List(items) if !items.is_empty() => &items[1..],
            _ => &[],
        }
    }

    /// Child list tagged `tag`, when present.
    fn child(&self, tag: &str) -> Option<&Sexp> {
        self.children().iter().find(|c| c.tag() == Some(tag))
    }

    fn children_tagged<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Sexp> {
        self.children().iter().filter(move |c| c.tag() == Some(tag))
    }

    /// Atom value directly following the tag, e.g. `(ref "R1")` yields "R1".
    fn value(&self) -> Option<&str> {
        match self.children().first() {
            Some(Sexp::Atom(s)) => Some(s.as_str()),
            _ => None,
        }
    }
}

fn parse_sexp(input: &str) -> Result<Sexp, KicadError> {
    let chars: Vec<char> = input.chars().collect();
    let mut pos = 0;
    let expr = parse_sexp_at(&chars, &mut pos)?;
    Ok(expr)
}

fn parse_sexp_at(chars: &[char], pos: &mut usize) -> Result<Sexp, KicadError> {
    skip_whitespace(chars, pos);
    match chars.get(*pos) {
        Some('(') => {
            *pos += 1;
            let mut items = Vec::new();
            loop {
                skip_whitespace(chars, pos);
                match chars.get(*pos) {
                    Some(')') => {
                        *pos += 1;
                        return Ok(Sexp::List(items));
                    }
                    Some(_) => items.push(parse_sexp_at(chars, pos)?),
                    None => return Err(KicadError::Parse("unclosed list".to_string())),
                }
            }
        }
        Some('"') => {
            *pos += 1;
            let mut atom = String::new();
            while let Some(&c) = chars.get(*pos) {
                *pos += 1;
                match c {
                    '"' => return Ok(Sexp::Atom(atom)),
                    '\\' => {
                        if let Some(&next) = chars.get(*pos) {
                            *pos += 1;
                            atom.push(next);
                        }
                    }
                    _ => atom.push(c),
                }
            }
            Err(KicadError::Parse("unterminated string".to_string()))
        }
        Some(_) => {
            let mut atom = String::new();
            while let Some(&c) = chars.get(*pos) {
                if c.is_whitespace() || c == '(' || c == ')' {
                    break;
                }
                atom.push(c);
                *pos += 1;
            }
            Ok(Sexp::Atom(atom))
        }
        None => Err(KicadError::Parse("empty input".to_string())),
    }
}

fn skip_whitespace(chars: &[char], pos: &mut usize) {
    while chars.get(*pos).is_some_and(|c| c.is_whitespace()) {
        *pos += 1;
    }
}

/// Parse s-expression netlist text.
pub fn read_netlist_sexp(content: &str) -> Result<CircuitSummary, KicadError> {
    let root = parse_sexp(content)?;
    if root.tag() != Some("export") {
        return Err(KicadError::Parse(format!(
            "expected (export ...) document, found {:?}",
            root.tag()
        )));
    }

    let mut summary = CircuitSummary::default();

    if let Some(components) = root.child("components") {
        for comp in components.children_tagged("comp") {
            let reference = comp
                .child("ref")
                .and_then(Sexp::value)
                .unwrap_or_default()
                .to_string();
            if reference.is_empty() {
                continue;
            }
            summary.components.push(KicadComponent {
                reference,
                value: comp
                    .child("value")
                    .and_then(Sexp::value)
                    .unwrap_or_default()
                    .to_string(),
                footprint: comp
                    .child("footprint")
                    .and_then(Sexp::value)
                    .map(String::from),
                datasheet: comp
                    .child("datasheet")
                    .and_then(Sexp::value)
                    .filter(|s| !s.is_empty() && *s != "~")
                    .map(String::from),
            });
        }
    }

    if let Some(nets) = root.child("nets") {
        for net in nets.children_tagged("net") {
            let name = net
                .child("name")
                .and_then(Sexp::value)
                .unwrap_or_default()
                .to_string();
            let pins = net
                .children_tagged("node")
                .filter_map(|node| {
                    let reference = node.child("ref").and_then(Sexp::value)?;
                    let pin = node.child("pin").and_then(Sexp::value)?;
                    Some((reference.to_string(), pin.to_string()))
                })
                .collect();
            summary.nets.push(KicadNet { name, pins });
        }
    }

    Ok(summary)
}

// ---------------------------------------------------------------------------
// XML intermediate format (.xml)
// ---------------------------------------------------------------------------

/// Minimal scan of the KiCad intermediate XML netlist. Only the elements
/// and attributes the summary needs are recognized. The same `<comp>`
/// blocks appear in XML BOM exports, which reuse this parser.
pub fn read_netlist_xml(content: &str) -> Result<CircuitSummary, KicadError> {
    let mut summary = CircuitSummary::default();

    let mut rest = content;
    while let Some(start) = rest.find("<comp ") {
        let after = &rest[start..];
        let Some(end) = after.find("</comp>") else {
            break;
        };
        let block = &after[..end];
        if let Some(reference) = xml_attr(block, "ref") {
            summary.components.push(KicadComponent {
                reference,
                value: xml_tag_text(block, "value").unwrap_or_default(),
                footprint: xml_tag_text(block, "footprint"),
                datasheet: xml_tag_text(block, "datasheet").filter(|s| !s.is_empty() && s != "~"),
            });
        }
        rest = &after[end + "</comp>".len()..];
    }

    let mut rest = content;
    while let Some(start) = rest.find("<net ") {
        let after = &rest[start..];
        let (block, consumed) = match after.find("</net>") {
            Some(end) => (&after[..end], end + "</net>".len()),
            // Self-closing net with no nodes.
            None => match after.find("/>") {
                Some(end) => (&after[..end], end + 2),
                None => break,
            },
        };
        if let Some(name) = xml_attr(block, "name") {
            let mut pins = Vec::new();
            let mut node_rest = block;
            while let Some(node_start) = node_rest.find("<node ") {
                let node_after = &node_rest[node_start..];
                let Some(node_end) = node_after.find("/>") else {
                    break;
                };
                let node = &node_after[..node_end];
                if let (Some(reference), Some(pin)) =
                    (xml_attr(node, "ref"), xml_attr(node, "pin"))
                {
                    pins.push((reference, pin));
                }
                node_rest = &node_after[node_end + 2..];
            }
            summary.nets.push(KicadNet { name, pins });
        }
        rest = &after[consumed..];
    }

    if summary.components.is_empty() && summary.nets.is_empty() {
        return Err(KicadError::Parse(
            "no <comp> or <net> elements found".to_string(),
        ));
    }
    Ok(summary)
}

/// Value of `name="..."` inside an element's opening tag.
fn xml_attr(block: &str, name: &str) -> Option<String> {
    let open_end = block.find('>').unwrap_or(block.len());
    let tag = &block[..open_end];
    let needle = format!("{}=\"", name);
    let start = tag.find(&needle)? + needle.len();
    let end = tag[start..].find('"')? + start;
    Some(unescape_xml(&tag[start..end]))
}

/// Text content of a simple child element, e.g. `<value>10k</value>`.
fn xml_tag_text(block: &str, tag: &str) -> Option<String> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    let start = block.find(&open)? + open.len();
    let end = block[start..].find(&close)? + start;
    Some(unescape_xml(&block[start..end]))
}

fn unescape_xml(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
