//! Background jobs: recall notifications and the archival sweep

pub mod archive;
pub mod recall;

pub use archive::{ArchiveStats, ArchiveSweep, HttpProbe, ListingProbe, Liveness, StaticProbe};
pub use recall::{
    NotificationSink, RecallNotice, RecallScanner, RecallStats, RecordingSink, SinkError,
    TracingSink,
};
