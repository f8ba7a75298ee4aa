//! Frame analysis stages above the pixel level
//!
//! - Run-length encoding of the classified frame
//! - Union-find labeling of runs into components
//! - Blob aggregation and the enclosure tree
//! - Finder pattern scoring
//! - QR-region assembly and deduplication
//! - Section statistics

/// Blob aggregation from labeled runs
pub mod blobs;
/// Finder pattern scoring over nested blobs
pub mod finder;
/// QR-region assembly from finder triples
pub mod qr_region;
/// Run-length encoding of classified rows
pub mod runs;
/// Per-section mean, variegation and threshold
pub mod sections;
/// Disjoint sets over runs
pub mod union_find;
