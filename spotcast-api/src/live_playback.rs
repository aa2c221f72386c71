//! Last known playback state per device.
//!
//! Each device owns a `watch` channel holding its latest report. Reports
//! overwrite unconditionally, and a live-stream request simply waits for the
//! next value on the device's channel.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{NaiveDateTime, TimeDelta};
use tokio::sync::watch;

use crate::config::SpotcastConfig;
use crate::events::{LiveRequestEvent, PlaybackEvent, PlaybackHub, PlaybackStatusEvent};
use crate::models::{LivePlaybackResponse, LivePlaybackState, PlaybackReport};

type StateSender = Arc<watch::Sender<Option<LivePlaybackState>>>;

#[derive(Debug, Clone, PartialEq)]
pub enum LiveStreamOutcome {
    /// The device reported within the wait.
    Fresh(LivePlaybackState),
    /// No report arrived in time; carries whatever was known before.
    TimedOut(Option<LivePlaybackState>),
}

pub struct LivePlaybackTracker {
    devices: RwLock<HashMap<i32, StateSender>>,
    hub: Arc<PlaybackHub>,
    stale_after: TimeDelta,
    live_stream_timeout: Duration,
}

impl LivePlaybackTracker {
    pub fn new(hub: Arc<PlaybackHub>, config: &SpotcastConfig) -> Self {
        Self {
            devices: RwLock::new(HashMap::new()),
            hub,
            stale_after: config.playback_stale_after(),
            live_stream_timeout: config.live_stream_timeout(),
        }
    }

    fn channel(&self, device_id: i32) -> StateSender {
        if let Some(sender) = self
            .devices
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&device_id)
        {
            return sender.clone();
        }
        let mut devices = self.devices.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        devices.entry(device_id).or_insert_with(|| Arc::new(watch::Sender::new(None))).clone()
    }

    /// Drops a decommissioned device's channel. A live-stream request still
    /// waiting on it returns as timed out.
    pub fn forget_device(&self, device_id: i32) {
        self.devices.write().unwrap_or_else(|poisoned| poisoned.into_inner()).remove(&device_id);
    }

    /// Stores a device heartbeat and notifies subscribers.
    pub fn report_playback(
        &self,
        device_id: i32,
        report: PlaybackReport,
        now: NaiveDateTime,
    ) -> LivePlaybackState {
        let state = LivePlaybackState {
            device_id,
            current_jingle_id: report.jingle_id,
            position_ms: report.position_ms,
            is_playing: report.is_playing,
            last_updated_at: now,
        };
        self.channel(device_id).send_replace(Some(state.clone()));

        self.hub.publish(PlaybackEvent::Status(PlaybackStatusEvent {
            device_id,
            current_jingle: state.current_jingle_id,
            position: state.position_ms,
            is_playing: state.is_playing,
        }));
        state
    }

    /// Last report, or `None` when the device never reported.
    pub fn last_report(&self, device_id: i32) -> Option<LivePlaybackState> {
        self.devices
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&device_id)
            .and_then(|sender| sender.borrow().clone())
    }

    pub fn is_stale(&self, state: &LivePlaybackState, now: NaiveDateTime) -> bool {
        now - state.last_updated_at > self.stale_after
    }

    pub fn get_state(&self, device_id: i32, now: NaiveDateTime) -> LivePlaybackResponse {
        match self.last_report(device_id) {
            Some(state) if !self.is_stale(&state, now) => LivePlaybackResponse {
                device_id,
                active: true,
                stale: false,
                state: Some(state),
                timeout: None,
            },
            Some(_) => LivePlaybackResponse {
                device_id,
                active: false,
                stale: true,
                state: None,
                timeout: None,
            },
            None => LivePlaybackResponse {
                device_id,
                active: false,
                stale: false,
                state: None,
                timeout: None,
            },
        }
    }

    /// Asks the device for a fresh report and waits a bounded time for it.
    pub async fn request_live_stream(&self, device_id: i32) -> LiveStreamOutcome {
        let mut rx = self.channel(device_id).subscribe();
        let previous = rx.borrow_and_update().clone();

        self.hub.publish(PlaybackEvent::LiveRequest(LiveRequestEvent { device_id }));

        match tokio::time::timeout(self.live_stream_timeout, rx.changed()).await {
            Ok(Ok(())) => match rx.borrow_and_update().clone() {
                Some(state) => LiveStreamOutcome::Fresh(state),
                None => LiveStreamOutcome::TimedOut(previous),
            },
            _ => {
                warn!(
                    "Device {} did not answer a live-stream request within {:?}",
                    device_id, self.live_stream_timeout
                );
                LiveStreamOutcome::TimedOut(previous)
            }
        }
    }

    pub fn to_response(
        &self,
        device_id: i32,
        outcome: LiveStreamOutcome,
        now: NaiveDateTime,
    ) -> LivePlaybackResponse {
        match outcome {
            LiveStreamOutcome::Fresh(state) => LivePlaybackResponse {
                device_id,
                active: true,
                stale: false,
                state: Some(state),
                timeout: None,
            },
            LiveStreamOutcome::TimedOut(state) => LivePlaybackResponse {
                device_id,
                active: state.as_ref().is_some_and(|s| !self.is_stale(s, now)),
                stale: true,
                state,
                timeout: Some(format!(
                    "Device did not report within {} ms",
                    self.live_stream_timeout.as_millis()
                )),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker(timeout_ms: u64) -> (Arc<PlaybackHub>, Arc<LivePlaybackTracker>) {
        let hub = Arc::new(PlaybackHub::new(16));
        let config = SpotcastConfig {
            live_stream_timeout_ms: timeout_ms,
            playback_stale_after_secs: 60,
            ..SpotcastConfig::default()
        };
        let tracker = Arc::new(LivePlaybackTracker::new(hub.clone(), &config));
        (hub, tracker)
    }

    fn report(jingle: i32, position_ms: i64) -> PlaybackReport {
        PlaybackReport { jingle_id: Some(jingle), position_ms, is_playing: true }
    }

    fn now() -> NaiveDateTime {
        chrono::Utc::now().naive_utc()
    }

    #[test]
    fn test_unknown_device_has_no_active_playback() {
        let (_, tracker) = tracker(50);
        let response = tracker.get_state(3, now());
        assert!(!response.active);
        assert!(response.state.is_none());
    }

    #[test]
    fn test_last_report_wins() {
        let (_, tracker) = tracker(50);
        let at = now();
        tracker.report_playback(1, report(5, 1000), at);
        tracker.report_playback(1, report(6, 200), at);

        let state = tracker.get_state(1, at).state.unwrap();
        assert_eq!(state.current_jingle_id, Some(6));
        assert_eq!(state.position_ms, 200);
    }

    #[test]
    fn test_old_report_is_stale() {
        let (_, tracker) = tracker(50);
        let at = now();
        tracker.report_playback(1, report(5, 0), at);

        let response = tracker.get_state(1, at + TimeDelta::seconds(61));
        assert!(!response.active);
        assert!(response.stale);
        assert!(response.state.is_none());
    }

    #[test]
    fn test_forgotten_device_has_no_state() {
        let (_, tracker) = tracker(50);
        let at = now();
        tracker.report_playback(1, report(5, 0), at);
        tracker.report_playback(2, report(6, 0), at);

        tracker.forget_device(1);
        assert!(tracker.last_report(1).is_none());
        assert!(tracker.last_report(2).is_some());
        assert!(tracker.devices.read().unwrap().get(&1).is_none());
    }

    #[tokio::test]
    async fn test_report_publishes_status_event() {
        let (hub, tracker) = tracker(50);
        let mut rx = hub.subscribe();
        tracker.report_playback(2, report(8, 40), now());

        let event = rx.recv().await.unwrap();
        assert_eq!(event.name(), "playback:status");
        assert_eq!(event.device_id(), 2);
    }

    #[tokio::test]
    async fn test_live_stream_returns_next_report() {
        let (hub, tracker) = tracker(2000);
        let mut rx = hub.subscribe();

        let device = {
            let tracker = tracker.clone();
            tokio::spawn(async move {
                loop {
                    let event = rx.recv().await.unwrap();
                    if event.name() == "live:request" {
                        tracker.report_playback(7, report(3, 900), now());
                        break;
                    }
                }
            })
        };

        let outcome = tracker.request_live_stream(7).await;
        device.await.unwrap();
        match outcome {
            LiveStreamOutcome::Fresh(state) => {
                assert_eq!(state.device_id, 7);
                assert_eq!(state.position_ms, 900);
            }
            other => panic!("expected fresh state, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_live_stream_times_out_with_last_state() {
        let (_, tracker) = tracker(30);
        let at = now();
        tracker.report_playback(4, report(1, 10), at);

        let outcome = tracker.request_live_stream(4).await;
        let response = tracker.to_response(4, outcome, at);
        assert!(response.stale);
        assert!(response.active);
        assert!(response.timeout.is_some());
        assert_eq!(response.state.unwrap().position_ms, 10);
    }

    #[tokio::test]
    async fn test_live_stream_for_silent_new_device() {
        let (_, tracker) = tracker(20);
        let outcome = tracker.request_live_stream(11).await;
        assert_eq!(outcome, LiveStreamOutcome::TimedOut(None));
        let response = tracker.to_response(11, outcome, now());
        assert!(!response.active);
        assert!(response.state.is_none());
    }
}
