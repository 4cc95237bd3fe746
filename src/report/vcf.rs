//! VCF 4.2 output with one haploid genotype column per path.

use crate::graph::variants::VariantCalls;
use crate::MineGraphError;
use chrono::Local;
use std::io::Write;

pub fn write_vcf<W: Write>(calls: &VariantCalls, writer: &mut W) -> Result<(), MineGraphError> {
    writeln!(writer, "##fileformat=VCFv4.2")?;
    writeln!(writer, "##fileDate={}", Local::now().format("%Y%m%d"))?;
    writeln!(writer, "##source=minegraph-{}", env!("CARGO_PKG_VERSION"))?;
    if !calls.reference.is_empty() {
        writeln!(
            writer,
            "##contig=<ID={},length={}>",
            calls.reference, calls.reference_length
        )?;
    }
    writeln!(
        writer,
        "##INFO=<ID=TYPE,Number=1,Type=String,Description=\"Variant class: SNP, MNP or INDEL\">"
    )?;
    writeln!(
        writer,
        "##INFO=<ID=AT,Number=2,Type=Integer,Description=\"Graph anchor nodes bounding the site (0 = path end)\">"
    )?;
    writeln!(
        writer,
        "##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Haploid genotype\">"
    )?;

    write!(writer, "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT")?;
    for sample in &calls.samples {
        write!(writer, "\t{}", sample)?;
    }
    writeln!(writer)?;

    for record in &calls.records {
        write!(
            writer,
            "{}\t{}\t.\t{}\t{}\t.\tPASS\tTYPE={};AT={},{}\tGT",
            record.chrom,
            record.position,
            record.reference,
            record.alternates.join(","),
            record.kind,
            record.left_anchor.unwrap_or(0),
            record.right_anchor.unwrap_or(0)
        )?;
        for gt in &record.genotypes {
            write!(writer, "\t{}", gt)?;
        }
        writeln!(writer)?;
    }

    Ok(())
}
