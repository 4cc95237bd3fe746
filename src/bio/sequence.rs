use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A raw FASTA record as read from disk
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sequence {
    pub id: String,
    pub description: Option<String>,
    pub sequence: Vec<u8>,
}

impl Sequence {
    pub fn new(id: String, sequence: Vec<u8>) -> Self {
        Self {
            id,
            description: None,
            sequence,
        }
    }

    pub fn with_description(mut self, description: String) -> Self {
        self.description = Some(description);
        self
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    pub fn header(&self) -> String {
        match &self.description {
            Some(desc) => format!(">{} {}", self.id, desc),
            None => format!(">{}", self.id),
        }
    }
}

/// A prepared input sequence carrying its convention-compliant identifier.
///
/// Records are immutable after preparation; every downstream stage reads them
/// through shared references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceRecord {
    id: String,
    original_id: String,
    source: PathBuf,
    sequence: Vec<u8>,
}

impl SequenceRecord {
    pub fn new(id: String, original_id: String, source: PathBuf, sequence: Vec<u8>) -> Self {
        Self {
            id,
            original_id,
            source,
            sequence,
        }
    }

    /// Build a record directly from an identifier and symbols, mainly for fixtures
    pub fn from_parts(id: &str, sequence: &[u8]) -> Self {
        Self::new(
            id.to_string(),
            id.to_string(),
            PathBuf::new(),
            sequence.to_ascii_uppercase(),
        )
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Header token the record carried in its source file
    pub fn original_id(&self) -> &str {
        &self.original_id
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn sequence(&self) -> &[u8] {
        &self.sequence
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// Copy into a plain FASTA record for writing
    pub fn to_fasta(&self) -> Sequence {
        Sequence::new(self.id.clone(), self.sequence.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_with_description() {
        let seq = Sequence::new("NC_000932.1".into(), b"ACGT".to_vec())
            .with_description("Arabidopsis thaliana chloroplast".into());
        assert_eq!(seq.header(), ">NC_000932.1 Arabidopsis thaliana chloroplast");
    }

    #[test]
    fn test_from_parts_uppercases() {
        let record = SequenceRecord::from_parts("a#1#chr", b"acgtn");
        assert_eq!(record.sequence(), b"ACGTN");
        assert_eq!(record.len(), 5);
        assert_eq!(record.original_id(), "a#1#chr");
    }
}
