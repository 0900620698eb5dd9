// Audio module - format detection, container metadata, and tag writing

pub mod detection;
pub mod metadata;
pub mod metadata_writer;

pub use detection::{AudioFormat, is_ncm_file};
pub use metadata::{TrackMetadata, decode_metadata_block};
pub use metadata_writer::write_track_tags;
