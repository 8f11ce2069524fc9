//! Partition node configuration.

use std::time::Duration;

/// Configuration for one partition node instance.
#[derive(Debug, Clone)]
pub struct PartitionConfig {
    /// How long a proposal window stays open before the block is closed
    /// and emitted for certification.
    pub block_proposal_timeout: Duration,
    /// Bounded capacity for the lifecycle/transaction channels and the
    /// transaction buffer.
    pub channel_capacity: usize,
    /// Upper bound on a single get-blocks-in-range response.
    pub max_get_blocks_batch_size: u64,
}

impl Default for PartitionConfig {
    fn default() -> Self {
        PartitionConfig {
            block_proposal_timeout: Duration::from_millis(500),
            channel_capacity: 100,
            max_get_blocks_batch_size: 100,
        }
    }
}

impl PartitionConfig {
    /// Set the proposal timeout.
    pub fn with_block_proposal_timeout(mut self, timeout: Duration) -> Self {
        self.block_proposal_timeout = timeout;
        self
    }

    /// Set the channel capacity.
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Set the maximum get-blocks batch size.
    pub fn with_max_get_blocks_batch_size(mut self, size: u64) -> Self {
        self.max_get_blocks_batch_size = size;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_pattern() {
        let config = PartitionConfig::default()
            .with_block_proposal_timeout(Duration::from_millis(50))
            .with_channel_capacity(10)
            .with_max_get_blocks_batch_size(5);
        assert_eq!(config.block_proposal_timeout, Duration::from_millis(50));
        assert_eq!(config.channel_capacity, 10);
        assert_eq!(config.max_get_blocks_batch_size, 5);
    }
}
