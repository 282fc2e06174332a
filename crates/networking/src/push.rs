//! Server-sent events push channel for live tournament updates

use crate::transport::PushChannel;
use async_trait::async_trait;
use eventsource_stream::{Event, EventStreamError, Eventsource};
use futures_util::stream::{BoxStream, StreamExt};
use reqwest::Response;
use tourney_core::{Error, Result, UpdateEvent};
use tracing::{debug, trace};

/// Event name of frames without an `event:` field
const MESSAGE_EVENT: &str = "message";

type FrameStream = BoxStream<'static, std::result::Result<Event, EventStreamError<reqwest::Error>>>;

/// An open `text/event-stream` response yielding [`UpdateEvent`]s
pub struct SsePushChannel {
    frames: FrameStream,
}

impl SsePushChannel {
    pub(crate) fn new(response: Response) -> Self {
        Self {
            frames: response.bytes_stream().eventsource().boxed(),
        }
    }

    /// Read the next update from the stream.
    ///
    /// Returns `None` once the server closes the body. A frame whose data is
    /// not a valid update yields `Err(Error::InvalidData)` and the stream stays
    /// usable.
    pub async fn next_update(&mut self) -> Option<Result<UpdateEvent>> {
        while let Some(frame) = self.frames.next().await {
            match frame {
                Ok(event) => {
                    if !event.event.is_empty() && event.event != MESSAGE_EVENT {
                        debug!("Ignoring '{}' frame on live stream", event.event);
                        continue;
                    }
                    trace!("Live frame: {}", event.data);
                    return Some(serde_json::from_str(&event.data).map_err(Into::into));
                }
                Err(EventStreamError::Transport(e)) => return Some(Err(e.into())),
                Err(e) => return Some(Err(Error::InvalidData(e.to_string()))),
            }
        }

        debug!("Live stream ended by server");
        None
    }
}

#[async_trait]
impl PushChannel for SsePushChannel {
    async fn next_event(&mut self) -> Option<Result<UpdateEvent>> {
        self.next_update().await
    }
}
