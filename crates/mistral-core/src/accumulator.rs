use futures::{Stream, StreamExt};

use crate::error::DecodeError;
use crate::types::{FinishReason, StreamEvent, StreamMetadata, Usage};

/// Folds decoded stream events back into a complete result
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamAccumulator {
    text: String,
    metadata: StreamMetadata,
    usage: Option<Usage>,
    finish_reason: Option<FinishReason>,
    done: bool,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain a decoded stream, stopping at the first error
    pub async fn collect<S>(stream: S) -> Result<Self, DecodeError>
    where
        S: Stream<Item = Result<StreamEvent, DecodeError>>,
    {
        let mut acc = Self::new();
        let mut stream = std::pin::pin!(stream);
        while let Some(event) = stream.next().await {
            acc.push(event?);
        }
        Ok(acc)
    }

    pub fn push(&mut self, event: StreamEvent) {
        match event {
            StreamEvent::ContentDelta(delta) => self.text.push_str(&delta),
            StreamEvent::MetadataDelta(meta) => {
                // Later deltas only fill gaps
                self.metadata.id = self.metadata.id.take().or(meta.id);
                self.metadata.model = self.metadata.model.take().or(meta.model);
                self.metadata.role = self.metadata.role.or(meta.role);
                self.metadata.language = self.metadata.language.take().or(meta.language);
            }
            StreamEvent::Usage(usage) => self.usage = Some(usage),
            StreamEvent::Done { finish_reason } => {
                self.done = true;
                self.finish_reason = finish_reason;
            }
        }
    }

    /// Concatenated content deltas
    pub fn text(&self) -> &str {
        &self.text
    }

    pub const fn metadata(&self) -> &StreamMetadata {
        &self.metadata
    }

    pub const fn usage(&self) -> Option<&Usage> {
        self.usage.as_ref()
    }

    pub const fn finish_reason(&self) -> Option<&FinishReason> {
        self.finish_reason.as_ref()
    }

    /// Whether a `Done` event was seen
    pub const fn is_done(&self) -> bool {
        self.done
    }

    pub fn into_text(self) -> String {
        self.text
    }
}
