//! TypeScript bindings for the wire types.
//!
//! Running the test writes one `.ts` file per exported type to
//! `SPOTCAST_TS_OUTPUT_DIR`, or `../ts-bindings` when unset.

#[cfg(test)]
mod tests {
    use std::{env, path::Path};

    use ts_rs::TS;

    #[test]
    fn generate_typescript_types() {
        let output_dir_str =
            env::var("SPOTCAST_TS_OUTPUT_DIR").unwrap_or_else(|_| "../ts-bindings".to_string());
        let output_dir = Path::new(&output_dir_str);

        std::fs::create_dir_all(output_dir).expect("Failed to create output directory");

        // Drop stale definitions of types that were removed or renamed.
        for entry in std::fs::read_dir(output_dir).expect("Failed to read output directory") {
            let path = entry.expect("Failed to read directory entry").path();
            if path.extension().and_then(|s| s.to_str()) == Some("ts") {
                std::fs::remove_file(&path).expect("Failed to remove stale binding");
            }
        }

        unsafe {
            env::set_var("TS_RS_EXPORT_DIR", output_dir);
        }

        use crate::api::status::HealthStatus;
        use crate::error::ErrorResponse;
        use crate::events::{LiveRequestEvent, PlayRecordedEvent, PlaybackStatusEvent};
        use crate::models::*;
        use crate::play_order::{PlayOrderEntry, PlayOrderResult};

        Device::export().expect("Failed to export Device type");
        DeviceInput::export().expect("Failed to export DeviceInput type");

        Campaign::export().expect("Failed to export Campaign type");
        CampaignInput::export().expect("Failed to export CampaignInput type");
        CampaignWithJingles::export().expect("Failed to export CampaignWithJingles type");
        Jingle::export().expect("Failed to export Jingle type");
        JingleInput::export().expect("Failed to export JingleInput type");

        DeviceSchedule::export().expect("Failed to export DeviceSchedule type");
        DeviceScheduleInput::export().expect("Failed to export DeviceScheduleInput type");
        DeviceScheduleWithJingles::export().expect("Failed to export DeviceScheduleWithJingles type");
        ScheduledJingle::export().expect("Failed to export ScheduledJingle type");
        ScheduledJingleStatus::export().expect("Failed to export ScheduledJingleStatus type");
        ScheduledJingleDetail::export().expect("Failed to export ScheduledJingleDetail type");
        ScheduledJingleUpdate::export().expect("Failed to export ScheduledJingleUpdate type");
        JingleAssignment::export().expect("Failed to export JingleAssignment type");
        AddScheduledJingleRequest::export().expect("Failed to export AddScheduledJingleRequest type");
        BulkAssignRequest::export().expect("Failed to export BulkAssignRequest type");
        BulkAssignResult::export().expect("Failed to export BulkAssignResult type");
        PlayOrderEntry::export().expect("Failed to export PlayOrderEntry type");
        PlayOrderResult::export().expect("Failed to export PlayOrderResult type");

        LivePlaybackState::export().expect("Failed to export LivePlaybackState type");
        LivePlaybackResponse::export().expect("Failed to export LivePlaybackResponse type");
        PlaybackReport::export().expect("Failed to export PlaybackReport type");
        PlaybackStatusEvent::export().expect("Failed to export PlaybackStatusEvent type");
        PlayRecordedEvent::export().expect("Failed to export PlayRecordedEvent type");
        LiveRequestEvent::export().expect("Failed to export LiveRequestEvent type");

        RecordPlayRequest::export().expect("Failed to export RecordPlayRequest type");
        RecordPlayResponse::export().expect("Failed to export RecordPlayResponse type");
        CampaignPlayCounts::export().expect("Failed to export CampaignPlayCounts type");
        JinglePlayCount::export().expect("Failed to export JinglePlayCount type");
        DevicePlayCount::export().expect("Failed to export DevicePlayCount type");

        ErrorResponse::export().expect("Failed to export ErrorResponse type");
        HealthStatus::export().expect("Failed to export HealthStatus type");

        println!("TypeScript types generated successfully in {:?}", output_dir);
    }
}
