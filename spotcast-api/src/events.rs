//! Real-time notifications for admin clients and devices.
//!
//! Every event is fanned out to all current subscribers of the hub; the SSE
//! endpoint filters by device on the way out.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use ts_rs::TS;

/// `playback:status` payload, the shape admin clients already consume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PlaybackStatusEvent {
    pub device_id: i32,
    pub current_jingle: Option<i32>,
    #[ts(type = "number")]
    pub position: i64,
    pub is_playing: bool,
}

/// `playback:new` payload, sent once per counted play.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PlayRecordedEvent {
    pub device_id: i32,
    pub jingle_id: i32,
    pub campaign_id: i32,
}

/// `live:request` payload asking a device for an immediate report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LiveRequestEvent {
    pub device_id: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PlaybackEvent {
    Status(PlaybackStatusEvent),
    NewPlay(PlayRecordedEvent),
    LiveRequest(LiveRequestEvent),
}

impl PlaybackEvent {
    /// Event name on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            PlaybackEvent::Status(_) => "playback:status",
            PlaybackEvent::NewPlay(_) => "playback:new",
            PlaybackEvent::LiveRequest(_) => "live:request",
        }
    }

    pub fn device_id(&self) -> i32 {
        match self {
            PlaybackEvent::Status(e) => e.device_id,
            PlaybackEvent::NewPlay(e) => e.device_id,
            PlaybackEvent::LiveRequest(e) => e.device_id,
        }
    }
}

pub struct PlaybackHub {
    sender: broadcast::Sender<PlaybackEvent>,
}

impl PlaybackHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes to current subscribers and returns how many received it.
    pub fn publish(&self, event: PlaybackEvent) -> usize {
        match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(broadcast::error::SendError(event)) => {
                debug!("No subscribers for {} on device {}", event.name(), event.device_id());
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_receive_published_events() {
        let hub = PlaybackHub::new(8);
        let mut rx = hub.subscribe();

        let event = PlaybackEvent::LiveRequest(LiveRequestEvent { device_id: 4 });
        assert_eq!(hub.publish(event.clone()), 1);
        assert_eq!(rx.recv().await.unwrap(), event);
    }

    #[test]
    fn test_publish_without_subscribers_is_dropped() {
        let hub = PlaybackHub::new(8);
        let sent = hub.publish(PlaybackEvent::NewPlay(PlayRecordedEvent {
            device_id: 1,
            jingle_id: 2,
            campaign_id: 3,
        }));
        assert_eq!(sent, 0);
    }

    #[test]
    fn test_status_payload_uses_legacy_field_names() {
        let event = PlaybackEvent::Status(PlaybackStatusEvent {
            device_id: 2,
            current_jingle: Some(9),
            position: 1500,
            is_playing: true,
        });
        assert_eq!(event.name(), "playback:status");
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            serde_json::json!({"deviceId": 2, "currentJingle": 9, "position": 1500, "isPlaying": true})
        );
    }
}
