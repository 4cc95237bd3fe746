use crate::bio::sequence::Sequence;
use crate::MineGraphError;
use flate2::read::GzDecoder;
use memmap2::Mmap;
use nom::{
    bytes::complete::{tag, take_till, take_while1},
    character::complete::{line_ending, not_line_ending},
    combinator::{map, opt},
    sequence::preceded,
    IResult,
};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Bases per line in written FASTA files
pub const LINE_WIDTH: usize = 80;

/// Parse a FASTA header line
fn parse_header(input: &[u8]) -> IResult<&[u8], (&str, Option<&str>)> {
    let (input, _) = tag(b">")(input)?;
    let (input, id) = map(
        take_till(|c: u8| c == b' ' || c == b'\t' || c == b'\n' || c == b'\r'),
        |s| std::str::from_utf8(s).unwrap_or(""),
    )(input)?;
    let (input, description) = opt(preceded(
        take_while1(|c: u8| c == b' ' || c == b'\t'),
        map(not_line_ending, |s| std::str::from_utf8(s).unwrap_or("")),
    ))(input)?;
    let (input, _) = opt(line_ending)(input)?;
    Ok((input, (id, description.filter(|d| !d.is_empty()))))
}

/// Parse sequence lines until next header or EOF
fn parse_sequence(input: &[u8]) -> IResult<&[u8], Vec<u8>> {
    let mut sequence = Vec::new();
    let mut remaining = input;

    while !remaining.is_empty() && remaining[0] != b'>' {
        let (rest, line) =
            take_till::<_, _, nom::error::Error<_>>(|c: u8| c == b'\n' || c == b'\r')(remaining)?;
        let (rest, _) = opt(line_ending)(rest)?;

        for &c in line {
            if !c.is_ascii_whitespace() {
                sequence.push(c.to_ascii_uppercase());
            }
        }

        remaining = rest;
    }

    Ok((remaining, sequence))
}

/// Parse a single FASTA record
fn parse_record(input: &[u8]) -> IResult<&[u8], Sequence> {
    let (input, (id, description)) = parse_header(input)?;
    let (input, sequence) = parse_sequence(input)?;

    let mut seq = Sequence::new(id.to_string(), sequence);
    if let Some(desc) = description {
        seq = seq.with_description(desc.to_string());
    }
    Ok((input, seq))
}

/// Parse FASTA from bytes. Empty records are kept so callers can report them.
pub fn parse_fasta_from_bytes(data: &[u8]) -> Result<Vec<Sequence>, MineGraphError> {
    let mut input = data;
    let mut sequences = Vec::new();

    loop {
        while !input.is_empty() && input[0].is_ascii_whitespace() {
            input = &input[1..];
        }
        if input.is_empty() {
            break;
        }
        if input[0] != b'>' {
            return Err(MineGraphError::Parse(format!(
                "Expected '>' at start of FASTA record, found {:?}",
                input[0] as char
            )));
        }

        let (remaining, seq) = parse_record(input)
            .map_err(|e| MineGraphError::Parse(format!("Failed to parse FASTA: {:?}", e)))?;
        sequences.push(seq);
        input = remaining;
    }

    Ok(sequences)
}

/// Parse a FASTA file into sequences (supports .gz compression)
pub fn parse_fasta<P: AsRef<Path>>(path: P) -> Result<Vec<Sequence>, MineGraphError> {
    let path = path.as_ref();

    if path.extension().and_then(|s| s.to_str()) == Some("gz") {
        let file = File::open(path)?;
        let mut decoder = GzDecoder::new(BufReader::new(file));
        let mut buffer = Vec::new();
        decoder.read_to_end(&mut buffer)?;
        parse_fasta_from_bytes(&buffer)
    } else {
        let file = File::open(path)?;
        if file.metadata()?.len() == 0 {
            return Ok(Vec::new());
        }
        // SAFETY: the map is read-only and dropped before this function returns
        let mmap = unsafe { Mmap::map(&file)? };
        parse_fasta_from_bytes(&mmap[..])
    }
}

/// Write sequences to a FASTA file (gzip-compressed when the path ends in .gz)
pub fn write_fasta<P: AsRef<Path>>(path: P, sequences: &[Sequence]) -> Result<(), MineGraphError> {
    use flate2::write::GzEncoder;
    use flate2::Compression;

    let path = path.as_ref();
    let file = File::create(path)?;

    if path.extension().and_then(|s| s.to_str()) == Some("gz") {
        let encoder = GzEncoder::new(file, Compression::default());
        let mut writer = BufWriter::new(encoder);
        write_fasta_to_writer(&mut writer, sequences)?;
        writer
            .into_inner()
            .map_err(|e| MineGraphError::Io(e.into_error()))?
            .finish()?;
    } else {
        let mut writer = BufWriter::new(file);
        write_fasta_to_writer(&mut writer, sequences)?;
        writer.flush()?;
    }

    Ok(())
}

/// Write sequences to any writer, wrapped at [`LINE_WIDTH`]
pub fn write_fasta_to_writer<W: Write>(
    writer: &mut W,
    sequences: &[Sequence],
) -> Result<(), MineGraphError> {
    for seq in sequences {
        writeln!(writer, "{}", seq.header())?;
        for chunk in seq.sequence.chunks(LINE_WIDTH) {
            writer.write_all(chunk)?;
            writer.write_all(b"\n")?;
        }
    }
    Ok(())
}

/// One line of a samtools-style `.fai` index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaiEntry {
    pub name: String,
    pub length: usize,
    pub offset: u64,
    pub line_bases: usize,
    pub line_width: usize,
}

/// Compute the `.fai` entries for sequences as laid out by [`write_fasta_to_writer`]
pub fn fasta_index(sequences: &[Sequence]) -> Vec<FaiEntry> {
    let mut offset = 0u64;
    let mut entries = Vec::with_capacity(sequences.len());

    for seq in sequences {
        offset += seq.header().len() as u64 + 1;
        entries.push(FaiEntry {
            name: seq.id.clone(),
            length: seq.len(),
            offset,
            line_bases: LINE_WIDTH,
            line_width: LINE_WIDTH + 1,
        });
        let lines = seq.len().div_ceil(LINE_WIDTH) as u64;
        offset += seq.len() as u64 + lines;
    }

    entries
}

/// Write the `.fai` index next to an uncompressed FASTA file
pub fn write_fasta_index<P: AsRef<Path>>(
    path: P,
    sequences: &[Sequence],
) -> Result<(), MineGraphError> {
    let mut writer = BufWriter::new(File::create(path)?);
    for entry in fasta_index(sequences) {
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{}",
            entry.name, entry.length, entry.offset, entry.line_bases, entry.line_width
        )?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_header() {
        let input = b">NC_000932.1 Arabidopsis thaliana chloroplast\nACGT";
        let (remaining, (id, desc)) = parse_header(input).unwrap();
        assert_eq!(id, "NC_000932.1");
        assert_eq!(desc, Some("Arabidopsis thaliana chloroplast"));
        assert_eq!(remaining, b"ACGT");
    }

    #[test]
    fn test_parse_tab_separated_header() {
        let input = b">contig_1\tcircular=true\nac\ngt\n";
        let seqs = parse_fasta_from_bytes(input).unwrap();
        assert_eq!(seqs.len(), 1);
        assert_eq!(seqs[0].id, "contig_1");
        assert_eq!(seqs[0].description.as_deref(), Some("circular=true"));
        assert_eq!(seqs[0].sequence, b"ACGT");
    }

    #[test]
    fn test_parse_crlf_and_empty_record() {
        let input = b">a\r\nAC\r\nGT\r\n>b\r\n>c\r\nTT";
        let seqs = parse_fasta_from_bytes(input).unwrap();
        assert_eq!(seqs.len(), 3);
        assert_eq!(seqs[0].sequence, b"ACGT");
        assert!(seqs[1].is_empty());
        assert_eq!(seqs[2].sequence, b"TT");
    }

    #[test]
    fn test_garbage_before_header_is_rejected() {
        let err = parse_fasta_from_bytes(b"ACGT\n>a\nAC").unwrap_err();
        assert!(matches!(err, MineGraphError::Parse(_)));
    }

    #[test]
    fn test_gzip_write_and_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.fasta.gz");
        let seqs = vec![Sequence::new("x".into(), vec![b'A'; 200])];
        write_fasta(&path, &seqs).unwrap();
        let parsed = parse_fasta(&path).unwrap();
        assert_eq!(parsed, seqs);
    }

    #[test]
    fn test_fasta_index_offsets_match_layout() {
        let seqs = vec![
            Sequence::new("s1".into(), vec![b'A'; 81]),
            Sequence::new("s2".into(), vec![b'C'; 10]),
        ];
        let entries = fasta_index(&seqs);

        let mut buffer = Vec::new();
        write_fasta_to_writer(&mut buffer, &seqs).unwrap();

        assert_eq!(entries[0].offset, 4);
        assert_eq!(buffer[entries[0].offset as usize], b'A');
        // ">s1\n" + 80 + "\n" + 1 + "\n" + ">s2\n"
        assert_eq!(entries[1].offset, 4 + 81 + 2 + 4);
        assert_eq!(buffer[entries[1].offset as usize], b'C');
        assert_eq!(entries[1].length, 10);
    }
}
