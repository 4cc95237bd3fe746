pub mod fasta;
pub mod naming;
pub mod sequence;

pub use naming::PanSnName;
pub use sequence::{Sequence, SequenceRecord};
