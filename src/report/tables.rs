//! Tab-separated statistics tables
use crate::graph::stats::{GraphStatistics, HistogramBin};
use crate::MineGraphError;
use serde::Serialize;
use std::io::Write;

fn tsv_writer<W: Write>(writer: W) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(writer)
}

/// `node_id  length  path_count  traversals  degree`
pub fn write_node_table<W: Write>(stats: &GraphStatistics, writer: W) -> Result<(), MineGraphError> {
    let mut out = tsv_writer(writer);
    out.write_record(["node_id", "length", "path_count", "traversals", "degree"])?;
    for row in &stats.node_table {
        out.write_record([
            row.node.to_string(),
            row.length.to_string(),
            row.paths.to_string(),
            row.traversals.to_string(),
            row.degree.to_string(),
        ])?;
    }
    out.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct EdgeRow {
    from: u64,
    from_orient: char,
    to: u64,
    to_orient: char,
    weight: usize,
}

pub fn write_edge_table<W: Write>(stats: &GraphStatistics, writer: W) -> Result<(), MineGraphError> {
    let mut out = tsv_writer(writer);
    for edge in &stats.edges {
        out.serialize(EdgeRow {
            from: edge.from.node,
            from_orient: edge.from.orientation.symbol(),
            to: edge.to.node,
            to_orient: edge.to.orientation.symbol(),
            weight: edge.weight,
        })?;
    }
    if stats.edges.is_empty() {
        out.write_record(["from", "from_orient", "to", "to_orient", "weight"])?;
    }
    out.flush()?;
    Ok(())
}

/// Number of nodes per distinct-path count
pub fn write_frequency_histogram<W: Write>(
    stats: &GraphStatistics,
    writer: W,
) -> Result<(), MineGraphError> {
    let mut out = tsv_writer(writer);
    out.write_record(["path_count", "nodes"])?;
    for (paths, nodes) in &stats.frequency_histogram {
        out.write_record([paths.to_string(), nodes.to_string()])?;
    }
    out.flush()?;
    Ok(())
}

pub fn write_size_histogram<W: Write>(bins: &[HistogramBin], writer: W) -> Result<(), MineGraphError> {
    let mut out = tsv_writer(writer);
    out.write_record(["lower", "upper", "nodes"])?;
    for bin in bins {
        out.write_record([
            format!("{:.1}", bin.lower),
            format!("{:.1}", bin.upper),
            bin.count.to_string(),
        ])?;
    }
    out.flush()?;
    Ok(())
}

pub fn write_degree_distribution<W: Write>(
    stats: &GraphStatistics,
    writer: W,
) -> Result<(), MineGraphError> {
    let mut out = tsv_writer(writer);
    out.write_record(["degree", "nodes"])?;
    for (degree, nodes) in &stats.degree_distribution {
        out.write_record([degree.to_string(), nodes.to_string()])?;
    }
    out.flush()?;
    Ok(())
}
