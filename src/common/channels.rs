//! Channel type definitions for connection outbound queues

use tokio::sync::mpsc;

use crate::engine::messages::OutboundMessage;

/// Default outbound buffer per connection
pub const DEFAULT_CHANNEL_SIZE: usize = 256;

/// Create a connection outbound channel; a zero size is raised to one
pub fn create_outbound_channel_with_size(
    size: usize,
) -> (mpsc::Sender<OutboundMessage>, mpsc::Receiver<OutboundMessage>) {
    mpsc::channel(size.max(1))
}
