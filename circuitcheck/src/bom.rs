//! Bill-of-materials import.
//!
//! Reads the BOM exports that accompany a schematic: plain CSV (with a
//! header row) or the KiCad XML BOM. Grouped reference cells like
//! "R1, R2, R3" are split into one record per reference.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BomError {
    #[error("BOM file not found: {0}")]
    NotFound(std::path::PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unsupported BOM format: {0}")]
    UnsupportedFormat(String),
    #[error("Parse error: {0}")]
    Parse(String),
}

/// One BOM line, already split to a single reference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BomRecord {
    pub reference: String,
    pub value: String,
    /// Manufacturer part number, when the BOM carries one.
    pub mpn: Option<String>,
    pub footprint: Option<String>,
    pub datasheet: Option<String>,
    /// SPICE model link, filled in by part enrichment.
    pub spice_model_url: Option<String>,
    pub qty: u32,
}

impl BomRecord {
    /// The token to use for part search: the MPN when present, otherwise the
    /// schematic value.
    pub fn part_number(&self) -> &str {
        self.mpn.as_deref().unwrap_or(&self.value)
    }
}

/// Read a BOM file, dispatching on extension.
pub fn read_bom(path: &Path) -> Result<Vec<BomRecord>, BomError> {
    if !path.exists() {
        return Err(BomError::NotFound(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path)?;
    match path.extension().and_then(|s| s.to_str()) {
        Some("csv") => parse_csv_bom(&content),
        Some("xml") => parse_xml_bom(&content),
        other => Err(BomError::UnsupportedFormat(
            other.unwrap_or("<none>").to_string(),
        )),
    }
}

fn parse_csv_bom(content: &str) -> Result<Vec<BomRecord>, BomError> {
    let mut rows = content.lines().filter(|l| !l.trim().is_empty());
    let header = rows
        .next()
        .ok_or_else(|| BomError::Parse("empty file".to_string()))?;
    let columns: Vec<String> = split_csv_row(header)
        .into_iter()
        .map(|c| c.trim().to_lowercase())
        .collect();

    let find = |names: &[&str]| {
        columns
            .iter()
            .position(|c| names.iter().any(|n| c == n || c.starts_with(n)))
    };
    let ref_col = find(&["reference", "designator", "ref"])
        .ok_or_else(|| BomError::Parse("no reference column in header".to_string()))?;
    let value_col = find(&["value"]);
    let mpn_col = find(&["mpn", "manufacturer part number", "part number"]);
    let footprint_col = find(&["footprint", "package"]);
    let datasheet_col = find(&["datasheet"]);
    let qty_col = find(&["qty", "quantity"]);

    let mut records = Vec::new();
    for row in rows {
        let fields = split_csv_row(row);
        let Some(refs) = fields.get(ref_col) else {
            continue;
        };
        let cell = |col: Option<usize>| {
            col.and_then(|i| fields.get(i))
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };
        let value = cell(value_col).unwrap_or_default();
        let mpn = cell(mpn_col);
        let footprint = cell(footprint_col);
        let datasheet = cell(datasheet_col).filter(|s| s != "~");
        let qty = cell(qty_col).and_then(|s| s.parse().ok()).unwrap_or(1);

        for reference in refs.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            records.push(BomRecord {
                reference: reference.to_string(),
                value: value.clone(),
                mpn: mpn.clone(),
                footprint: footprint.clone(),
                datasheet: datasheet.clone(),
                spice_model_url: None,
                qty,
            });
        }
    }
    Ok(records)
}

/// Split one CSV row, honoring double-quoted fields and `""` escapes.
fn split_csv_row(row: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = row.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut field));
            }
            _ => field.push(c),
        }
    }
    fields.push(field);
    fields
}

/// KiCad XML BOM: the same `<comp>` blocks as the intermediate netlist.
fn parse_xml_bom(content: &str) -> Result<Vec<BomRecord>, BomError> {
    let summary = crate::spice::kicad::read_netlist_xml(content)
        .map_err(|e| BomError::Parse(e.to_string()))?;
    Ok(summary
        .components
        .into_iter()
        .map(|c| BomRecord {
            reference: c.reference,
            value: c.value,
            mpn: None,
            footprint: c.footprint,
            datasheet: c.datasheet,
            spice_model_url: None,
            qty: 1,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_bom_basic() {
        let csv = "Reference,Value,Footprint,Datasheet,Qty\n\
                   Q1,IRF540N,TO-220,https://example.com/irf540n.pdf,1\n\
                   R1,10k,,~,2\n";
        let records = parse_csv_bom(csv).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].reference, "Q1");
        assert_eq!(
            records[0].datasheet.as_deref(),
            Some("https://example.com/irf540n.pdf")
        );
        assert!(records[1].datasheet.is_none());
        assert_eq!(records[1].qty, 2);
    }

    #[test]
    fn test_csv_grouped_references_split() {
        let csv = "Reference,Value\n\"R1, R2, R3\",10k\n";
        let records = parse_csv_bom(csv).unwrap();
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.value == "10k"));
        assert_eq!(records[2].reference, "R3");
    }

    #[test]
    fn test_csv_quoted_field_with_comma_and_escape() {
        let fields = split_csv_row(r#"C1,"100n, 50V","he said ""hi""""#);
        assert_eq!(fields, vec!["C1", "100n, 50V", "he said \"hi\""]);
    }

    #[test]
    fn test_csv_missing_reference_column() {
        let err = parse_csv_bom("Part,Count\nfoo,1\n").unwrap_err();
        assert!(matches!(err, BomError::Parse(_)));
    }

    #[test]
    fn test_csv_mpn_column() {
        let csv = "Reference,Value,MPN\nQ1,NMOS,IRF540NPBF\nR1,10k,\n";
        let records = parse_csv_bom(csv).unwrap();
        assert_eq!(records[0].mpn.as_deref(), Some("IRF540NPBF"));
        assert_eq!(records[0].part_number(), "IRF540NPBF");
        assert!(records[1].mpn.is_none());
        assert_eq!(records[1].part_number(), "10k");
    }

    #[test]
    fn test_csv_qty_defaults_to_one() {
        let records = parse_csv_bom("Reference,Value\nD1,1N4148\n").unwrap();
        assert_eq!(records[0].qty, 1);
    }

    #[test]
    fn test_xml_bom() {
        let xml = r#"<export><components>
            <comp ref="D1"><value>1N4148</value><datasheet>~</datasheet></comp>
        </components></export>"#;
        let records = parse_xml_bom(xml).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].reference, "D1");
        assert!(records[0].datasheet.is_none());
    }

    #[test]
    fn test_missing_file() {
        let err = read_bom(Path::new("/nonexistent/bom.csv")).unwrap_err();
        assert!(matches!(err, BomError::NotFound(_)));
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bom.ods");
        std::fs::write(&path, "data").unwrap();
        let err = read_bom(&path).unwrap_err();
        assert!(matches!(err, BomError::UnsupportedFormat(_)));
    }
}
