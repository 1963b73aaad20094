//! Configuration for the sequence allocator and object-store bucket.

use embertide_core::DataFormat;

/// Configuration options for the sequence allocator.
///
/// This struct holds the tunable parameters for block-reservation sequence
/// allocation: the object-store bucket reservation markers are written to,
/// the on-disk SSTable format to build them with, and the block size that
/// trades durable-write frequency against crash-induced value skips.
///
/// # Example
///
/// ```
/// use embertide_storage::SequenceConfig;
///
/// let config = SequenceConfig {
///     bucket: "my-cluster-bucket".to_string(),
///     block_size: 1000,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct SequenceConfig {
    /// Object-store bucket that reservation marker tables are written to
    pub bucket: String,

    /// On-disk format used when building reservation marker tables
    pub format: DataFormat,

    /// Number of sequence values reserved per durable write.
    ///
    /// A crash loses at most `block_size - 1` values (skipped, never
    /// repeated); a larger block size amortises durable writes at the cost
    /// of a larger skip on crash.
    pub block_size: i64,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            bucket: "embertide-meta".to_string(),
            format: DataFormat::V1,
            block_size: 1000,
        }
    }
}
