//! In-memory serial link for exercising boards without hardware.

use std::collections::VecDeque;

use crate::arduino::SerialLink;
use crate::error::BoardResult;

/// Keeps everything sent and replays canned replies.
#[derive(Debug, Default)]
pub struct RecordingLink {
    pub sent: Vec<String>,
    pub replies: VecDeque<String>,
}

impl RecordingLink {
    /// A link whose board answers the version query.
    pub fn answering(version: &str) -> Self {
        Self {
            replies: VecDeque::from(vec![version.to_string()]),
            ..Self::default()
        }
    }
}

impl SerialLink for RecordingLink {
    fn send(&mut self, bytes: &[u8]) -> BoardResult<()> {
        self.sent.push(String::from_utf8_lossy(bytes).into_owned());
        Ok(())
    }

    fn read_line(&mut self) -> BoardResult<Option<String>> {
        Ok(self.replies.pop_front())
    }
}
