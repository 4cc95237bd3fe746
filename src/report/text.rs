use crate::graph::variants::VariantKind;
use crate::report::AnalysisReport;
use crate::MineGraphError;
use std::fmt::Write;

pub fn generate_text_report(report: &AnalysisReport) -> Result<String, MineGraphError> {
    let mut output = String::new();
    let stats = &report.statistics;

    writeln!(&mut output, "MineGraph Analysis Report")?;
    writeln!(&mut output, "=========================")?;
    writeln!(&mut output)?;
    writeln!(&mut output, "Graph: {}", report.graph_path.display())?;
    writeln!(&mut output)?;

    if let Some(params) = &report.parameters {
        writeln!(&mut output, "Parameters")?;
        writeln!(&mut output, "----------")?;
        writeln!(&mut output, "- Mapping identity: {:.1}%", params.identity_percent())?;
        writeln!(&mut output, "- Segment length:   {} bp", params.segment_length)?;
        writeln!(&mut output)?;
    }

    writeln!(&mut output, "Graph Statistics")?;
    writeln!(&mut output, "----------------")?;
    writeln!(&mut output, "- Nodes:          {:8}", stats.node_count)?;
    writeln!(&mut output, "- Edges:          {:8}", stats.edge_count)?;
    writeln!(&mut output, "- Paths:          {:8}", stats.path_count)?;
    writeln!(&mut output, "- Total length:   {:8} bp", stats.total_length)?;
    writeln!(&mut output, "- Average degree: {:8.3}", stats.average_degree)?;
    writeln!(&mut output)?;

    writeln!(&mut output, "Node Frequency")?;
    writeln!(&mut output, "--------------")?;
    for (paths, nodes) in &stats.frequency_histogram {
        writeln!(&mut output, "  in {:4} paths: {:8} nodes", paths, nodes)?;
    }
    writeln!(&mut output)?;

    let calls = &report.variants;
    if calls.samples.is_empty() {
        writeln!(&mut output, "Polymorphisms (no paths)")?;
    } else {
        writeln!(&mut output, "Polymorphisms (reference {})", calls.reference)?;
    }
    writeln!(&mut output, "-------------")?;
    writeln!(&mut output, "- SNP:   {:6}", calls.count(VariantKind::Snp))?;
    writeln!(&mut output, "- MNP:   {:6}", calls.count(VariantKind::Mnp))?;
    writeln!(&mut output, "- INDEL: {:6}", calls.count(VariantKind::Indel))?;
    writeln!(&mut output)?;

    let consensus = &report.consensus;
    writeln!(&mut output, "Consensus")?;
    writeln!(&mut output, "---------")?;
    writeln!(
        &mut output,
        "- Quantile {}%: nodes on >= {} of {} paths",
        consensus.quantile, consensus.threshold, consensus.path_count
    )?;
    writeln!(
        &mut output,
        "- {} nodes, {} bp",
        consensus.steps.len(),
        consensus.sequence.len()
    )?;

    if !stats.top_nodes.is_empty() {
        writeln!(&mut output)?;
        writeln!(&mut output, "Largest Nodes (Top 10)")?;
        writeln!(&mut output, "----------------------")?;
        for id in stats.top_nodes.iter().take(10) {
            if let Some(row) = stats.node_table.iter().find(|r| r.node == *id) {
                writeln!(
                    &mut output,
                    "  node {} (length: {}, paths: {})",
                    row.node, row.length, row.paths
                )?;
            }
        }
        if stats.top_nodes.len() > 10 {
            writeln!(&mut output, "  ... and {} more", stats.top_nodes.len() - 10)?;
        }
    }

    Ok(output)
}
