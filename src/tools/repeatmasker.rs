use super::{run_tool, RepeatAnnotator, Tool};
use crate::bio::fasta::write_fasta;
use crate::bio::{Sequence, SequenceRecord};
use crate::core::repeats::RepeatInterval;
use crate::MineGraphError;
use std::fs;
use std::path::{Path, PathBuf};

/// Repeat classes counted as tandem repeats
const TANDEM_CLASSES: &[&str] = &["Simple_repeat", "Low_complexity", "Satellite"];

/// Query name written to the scratch FASTA; RepeatMasker truncates long names
const QUERY_NAME: &str = "query";

pub struct RepeatMaskerAnnotator {
    binary_path: PathBuf,
    species: String,
}

impl RepeatMaskerAnnotator {
    pub fn new(binary_path: PathBuf, species: String) -> Self {
        Self {
            binary_path,
            species,
        }
    }
}

impl RepeatAnnotator for RepeatMaskerAnnotator {
    fn name(&self) -> &str {
        "repeatmasker"
    }

    fn annotate(&self, record: &SequenceRecord) -> Result<Vec<RepeatInterval>, MineGraphError> {
        let scratch = tempfile::Builder::new()
            .prefix("minegraph-repeatmasker")
            .tempdir()?;
        let input = scratch.path().join("query.fasta");
        write_fasta(
            &input,
            &[Sequence::new(QUERY_NAME.to_string(), record.sequence().to_vec())],
        )?;

        let dir = scratch.path().to_string_lossy().to_string();
        let query = input.to_string_lossy().to_string();
        run_tool(
            Tool::RepeatMasker,
            &self.binary_path,
            [
                "-species",
                self.species.as_str(),
                "-s",
                "-no_is",
                "-pa",
                "1",
                "-dir",
                dir.as_str(),
                query.as_str(),
            ],
            Some(scratch.path()),
        )?;

        let out_file = scratch.path().join("query.fasta.out");
        read_out_file(&out_file, record.id())
    }
}

fn read_out_file(path: &Path, sequence_id: &str) -> Result<Vec<RepeatInterval>, MineGraphError> {
    if !path.exists() {
        return Err(MineGraphError::Parse(format!(
            "RepeatMasker produced no output table at {}",
            path.display()
        )));
    }
    parse_out_table(&fs::read_to_string(path)?, sequence_id)
}

/// Parse a RepeatMasker `.out` table, keeping tandem-repeat classes only.
///
/// Coordinates in the table are 1-based inclusive.
pub fn parse_out_table(text: &str, sequence_id: &str) -> Result<Vec<RepeatInterval>, MineGraphError> {
    let mut intervals = Vec::new();

    for line in text.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 11 || fields[0].parse::<u32>().is_err() {
            continue;
        }

        let class = fields[10];
        if !TANDEM_CLASSES.iter().any(|c| class.starts_with(c)) {
            continue;
        }

        let begin: usize = fields[5]
            .parse()
            .map_err(|_| MineGraphError::Parse(format!("invalid begin in line '{}'", line)))?;
        let end: usize = fields[6]
            .parse()
            .map_err(|_| MineGraphError::Parse(format!("invalid end in line '{}'", line)))?;
        if begin == 0 {
            return Err(MineGraphError::Parse(format!(
                "RepeatMasker coordinate 0 in line '{}'",
                line
            )));
        }

        let unit_length = unit_length(fields[9]).unwrap_or(end + 1 - begin);
        intervals.push(RepeatInterval::new(sequence_id, begin - 1, end, unit_length)?);
    }

    Ok(intervals)
}

/// Unit length of a simple repeat name like `(TA)n`
fn unit_length(repeat: &str) -> Option<usize> {
    let inner = repeat.strip_prefix('(')?.strip_suffix(")n")?;
    Some(inner.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    const OUT: &str = "   SW   perc perc perc  query      position in query           matching       repeat              position in  repeat
score   div. del. ins.  sequence    begin     end    (left)    repeat         class/family         begin  end (left)   ID

  463   1.3  0.6  1.7  query        7536    7692 (148208) +  (TA)n          Simple_repeat            1  154    (0)      1
  212  20.1  0.0  0.0  query       10001   10040 (145860) +  AT_rich        Low_complexity           1   40    (0)      2
  980  12.0  1.0  2.0  query       20001   20500 (135400) C  Copia-1_ZM     LTR/Copia            (100) 4000   3500      3
";

    #[test]
    fn test_parse_out_table() {
        let intervals = parse_out_table(OUT, "Zea_mays#1#chloroplast").unwrap();
        assert_eq!(intervals.len(), 2);
        assert_eq!(intervals[0].start, 7535);
        assert_eq!(intervals[0].end, 7692);
        assert_eq!(intervals[0].len(), 157);
        assert_eq!(intervals[0].unit_length, 2);
        assert_eq!(intervals[1].unit_length, 40);
        assert_eq!(intervals[1].sequence_id, "Zea_mays#1#chloroplast");
    }

    #[test]
    fn test_no_repeats_message() {
        let text = "There were no repetitive sequences detected in query.fasta\n";
        assert!(parse_out_table(text, "x").unwrap().is_empty());
    }
}
