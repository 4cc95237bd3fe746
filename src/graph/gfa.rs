//! GFA 1.x reading and writing
//!
//! Segments must have numeric names. Records are collected before the graph is
//! assembled since builders do not agree on record order (odgi writes paths
//! before links).

use super::{Graph, GraphPath, Handle, NodeId, Orientation};
use crate::bio::PanSnName;
use crate::MineGraphError;
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::Path;
use tracing::{debug, info};

/// How paths are written out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStyle {
    /// `P` lines (GFA 1.0)
    Paths,
    /// `W` lines (GFA 1.1)
    Walks,
}

#[derive(Default)]
struct Records {
    segments: Vec<(NodeId, Vec<u8>)>,
    links: Vec<(Handle, Handle)>,
    paths: Vec<(String, Vec<Handle>)>,
}

pub fn parse_gfa<P: AsRef<Path>>(path: P) -> Result<Graph, MineGraphError> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let reader: Box<dyn Read> = if path.extension().map_or(false, |ext| ext == "gz") {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };

    let graph = parse_gfa_from_reader(BufReader::new(reader))?;
    info!(
        "Parsed {}: {} segments, {} links, {} paths",
        path.display(),
        graph.node_count(),
        graph.edge_count(),
        graph.path_count()
    );
    Ok(graph)
}

pub fn parse_gfa_str(text: &str) -> Result<Graph, MineGraphError> {
    parse_gfa_from_reader(text.as_bytes())
}

pub fn parse_gfa_from_reader<R: BufRead>(reader: R) -> Result<Graph, MineGraphError> {
    let mut records = Records::default();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        let line_no = index + 1;
        match fields[0] {
            "S" => records.segments.push(parse_segment(&fields, line_no)?),
            "L" => records.links.push(parse_link(&fields, line_no)?),
            "P" => records.paths.push(parse_path(&fields, line_no)?),
            "W" => records.paths.push(parse_walk(&fields, line_no)?),
            other => debug!("Skipping GFA record type {} on line {}", other, line_no),
        }
    }

    assemble(records)
}

fn assemble(records: Records) -> Result<Graph, MineGraphError> {
    let mut graph = Graph::new();
    for (id, sequence) in records.segments {
        graph.add_node(id, sequence)?;
    }
    for (from, to) in records.links {
        graph.add_edge(from, to)?;
    }
    for (name, steps) in records.paths {
        graph.add_path(name, steps)?;
    }
    Ok(graph)
}

fn field<'a>(fields: &[&'a str], i: usize, line_no: usize) -> Result<&'a str, MineGraphError> {
    fields.get(i).copied().ok_or_else(|| {
        MineGraphError::Parse(format!(
            "GFA line {}: {} record has too few fields",
            line_no, fields[0]
        ))
    })
}

fn segment_id(name: &str, line_no: usize) -> Result<NodeId, MineGraphError> {
    name.parse().map_err(|_| {
        MineGraphError::Parse(format!(
            "GFA line {}: segment name '{}' is not numeric",
            line_no, name
        ))
    })
}

fn orientation(symbol: &str, line_no: usize) -> Result<Orientation, MineGraphError> {
    let mut chars = symbol.chars();
    match (chars.next().and_then(Orientation::from_symbol), chars.next()) {
        (Some(o), None) => Ok(o),
        _ => Err(MineGraphError::Parse(format!(
            "GFA line {}: invalid orientation '{}'",
            line_no, symbol
        ))),
    }
}

fn parse_segment(fields: &[&str], line_no: usize) -> Result<(NodeId, Vec<u8>), MineGraphError> {
    let id = segment_id(field(fields, 1, line_no)?, line_no)?;
    let sequence = match field(fields, 2, line_no)? {
        "*" => Vec::new(),
        s => s.as_bytes().to_ascii_uppercase(),
    };
    Ok((id, sequence))
}

fn parse_link(fields: &[&str], line_no: usize) -> Result<(Handle, Handle), MineGraphError> {
    let from = Handle::new(
        segment_id(field(fields, 1, line_no)?, line_no)?,
        orientation(field(fields, 2, line_no)?, line_no)?,
    );
    let to = Handle::new(
        segment_id(field(fields, 3, line_no)?, line_no)?,
        orientation(field(fields, 4, line_no)?, line_no)?,
    );
    Ok((from, to))
}

/// `P  name  1+,2-,3+  *`
fn parse_path(fields: &[&str], line_no: usize) -> Result<(String, Vec<Handle>), MineGraphError> {
    let name = field(fields, 1, line_no)?.to_string();
    let steps = field(fields, 2, line_no)?
        .split(',')
        .filter(|s| !s.is_empty())
        .map(|step| {
            if step.len() < 2 || !step.is_char_boundary(step.len() - 1) {
                return Err(MineGraphError::Parse(format!(
                    "GFA line {}: invalid path step '{}'",
                    line_no, step
                )));
            }
            let (id, symbol) = step.split_at(step.len() - 1);
            Ok(Handle::new(segment_id(id, line_no)?, orientation(symbol, line_no)?))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok((name, steps))
}

/// `W  sample  hap  contig  start  end  >1<2>3`
fn parse_walk(fields: &[&str], line_no: usize) -> Result<(String, Vec<Handle>), MineGraphError> {
    let sample = field(fields, 1, line_no)?;
    let haplotype: u32 = field(fields, 2, line_no)?.parse().map_err(|_| {
        MineGraphError::Parse(format!("GFA line {}: invalid haplotype", line_no))
    })?;
    let contig = field(fields, 3, line_no)?;
    let walk = field(fields, 6, line_no)?;

    let mut steps = Vec::new();
    let mut current: Option<(Orientation, String)> = None;
    for c in walk.chars() {
        if let Some(o) = Orientation::from_walk_symbol(c) {
            if let Some((orientation, digits)) = current.take() {
                steps.push(Handle::new(segment_id(&digits, line_no)?, orientation));
            }
            current = Some((o, String::new()));
        } else if let Some((_, digits)) = current.as_mut() {
            digits.push(c);
        } else {
            return Err(MineGraphError::Parse(format!(
                "GFA line {}: walk must start with '>' or '<'",
                line_no
            )));
        }
    }
    if let Some((orientation, digits)) = current {
        steps.push(Handle::new(segment_id(&digits, line_no)?, orientation));
    }

    let name = PanSnName {
        sample: sample.to_string(),
        haplotype,
        contig: contig.to_string(),
    };
    Ok((name.to_string(), steps))
}

pub fn write_gfa<W: Write>(graph: &Graph, style: PathStyle, output: &mut W) -> io::Result<()> {
    let version = match style {
        PathStyle::Paths => "1.0",
        PathStyle::Walks => "1.1",
    };
    writeln!(output, "H\tVN:Z:{}", version)?;

    for node in graph.nodes() {
        output.write_all(b"S\t")?;
        output.write_all(node.id.to_string().as_bytes())?;
        output.write_all(b"\t")?;
        if node.sequence.is_empty() {
            output.write_all(b"*")?;
        } else {
            output.write_all(&node.sequence)?;
        }
        output.write_all(b"\n")?;
    }

    for edge in graph.edges() {
        writeln!(
            output,
            "L\t{}\t{}\t{}\t{}\t0M",
            edge.from.node,
            edge.from.orientation.symbol(),
            edge.to.node,
            edge.to.orientation.symbol()
        )?;
    }

    for path in graph.paths() {
        match style {
            PathStyle::Paths => write_gfa_path(path, output)?,
            PathStyle::Walks => write_gfa_walk(path, graph.path_length(path), output)?,
        }
    }

    Ok(())
}

fn write_gfa_path<W: Write>(path: &GraphPath, output: &mut W) -> io::Result<()> {
    let steps: Vec<String> = path.steps.iter().map(Handle::to_string).collect();
    writeln!(output, "P\t{}\t{}\t*", path.name, steps.join(","))
}

/// Walk metadata comes from the PanSN name; other names become haplotype 0 of
/// a sample with the same name.
fn write_gfa_walk<W: Write>(path: &GraphPath, length: usize, output: &mut W) -> io::Result<()> {
    let (sample, haplotype, contig) = match PanSnName::parse(&path.name) {
        Ok(name) => (name.sample, name.haplotype, name.contig),
        Err(_) => (path.name.clone(), 0, path.name.clone()),
    };

    let mut buffer: Vec<u8> = Vec::new();
    buffer.extend_from_slice(format!("W\t{}\t{}\t{}\t0\t{}\t", sample, haplotype, contig, length).as_bytes());
    for step in &path.steps {
        buffer.push(step.orientation.walk_symbol() as u8);
        buffer.extend_from_slice(step.node.to_string().as_bytes());
    }
    buffer.push(b'\n');
    output.write_all(&buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const ODGI_ORDER: &str = "H\tVN:Z:1.0
S\t1\tACGT
S\t2\tA
S\t3\tG
S\t4\tTTCA
P\ta#1#chr\t1+,2+,4+\t*
P\tb#1#chr\t1+,3+,4+\t*
L\t1\t+\t2\t+\t0M
L\t1\t+\t3\t+\t0M
L\t2\t+\t4\t+\t0M
L\t3\t+\t4\t+\t0M
";

    #[test]
    fn test_parse_paths_before_links() {
        let graph = parse_gfa_str(ODGI_ORDER).unwrap();
        assert_eq!(graph.node_count(), 4);
        assert_eq!(graph.edge_count(), 4);
        assert_eq!(graph.path_count(), 2);
        assert_eq!(graph.edge_weight(Handle::forward(1), Handle::forward(2)), Some(1));
    }

    #[test]
    fn test_parse_walks() {
        let text = "H\tVN:Z:1.1
S\t1\tAC
S\t2\tGT
L\t1\t+\t2\t-\t0M
W\tZea_mays\t1\tchloroplast\t0\t4\t>1<2
";
        let graph = parse_gfa_str(text).unwrap();
        let path = graph.path("Zea_mays#1#chloroplast").unwrap();
        assert_eq!(path.steps, vec![Handle::forward(1), Handle::reverse(2)]);
        assert_eq!(graph.path_sequence(path), b"ACAC".to_vec());
    }

    #[test]
    fn test_dangling_link() {
        let text = "S\t1\tA\nL\t1\t+\t7\t+\t0M\n";
        assert!(matches!(
            parse_gfa_str(text),
            Err(MineGraphError::GraphIntegrity(_))
        ));
    }

    #[test]
    fn test_non_numeric_segment() {
        let text = "S\tchr1_1\tA\n";
        assert!(matches!(parse_gfa_str(text), Err(MineGraphError::Parse(_))));
    }

    #[test]
    fn test_write_then_read_walks() {
        let graph = parse_gfa_str(ODGI_ORDER).unwrap();
        let mut out = Vec::new();
        write_gfa(&graph, PathStyle::Walks, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("H\tVN:Z:1.1\n"));
        assert!(text.contains("W\ta\t1\tchr\t0\t9\t>1>2>4\n"));

        let reparsed = parse_gfa_str(&text).unwrap();
        assert_eq!(reparsed, graph);
    }

    #[test]
    fn test_write_paths() {
        let graph = parse_gfa_str(ODGI_ORDER).unwrap();
        let mut out = Vec::new();
        write_gfa(&graph, PathStyle::Paths, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("P\tb#1#chr\t1+,3+,4+\t*\n"));
        assert!(text.contains("L\t3\t+\t4\t+\t0M\n"));
    }
}
