//! Domain Events
//!
//! Pipeline-internal events broadcast for observation without coupling
//! downstream consumers to the processing loop itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{BoundingBox, Region};

/// A domain event that can be broadcast to subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    /// The Region Planner produced a set of regions for a frame.
    RegionsPlanned(RegionsPlannedEvent),
    /// An object was detected (post-NMS/consolidation) in a frame.
    ObjectDetected(ObjectDetectedEvent),
    /// A tracked object transitioned into the stationary state.
    TrackStationary(TrackStationaryEvent),
    /// A face attribute was resolved to a labeled identity.
    FaceRecognized(FaceRecognizedEvent),
    /// A bounded queue was full and an item was dropped.
    QueueDropped(QueueDroppedEvent),
    /// The Capture Watchdog restarted a camera's decoder.
    CameraRestarted(CameraRestartedEvent),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionsPlannedEvent {
    pub camera_name: String,
    pub frame_time: f64,
    pub region_count: usize,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectDetectedEvent {
    pub camera_name: String,
    pub frame_time: f64,
    pub label: String,
    pub score: f32,
    pub bounding_box: BoundingBox,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackStationaryEvent {
    pub camera_name: String,
    pub track_id: String,
    pub motionless_count: u32,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceRecognizedEvent {
    pub camera_name: String,
    pub track_id: String,
    pub sub_label: String,
    pub confidence: f32,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueDroppedEvent {
    pub queue_name: String,
    pub camera_name: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraRestartedEvent {
    pub camera_name: String,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
}

impl DomainEvent {
    /// Returns the event timestamp.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            DomainEvent::RegionsPlanned(e) => e.timestamp,
            DomainEvent::ObjectDetected(e) => e.timestamp,
            DomainEvent::TrackStationary(e) => e.timestamp,
            DomainEvent::FaceRecognized(e) => e.timestamp,
            DomainEvent::QueueDropped(e) => e.timestamp,
            DomainEvent::CameraRestarted(e) => e.timestamp,
        }
    }

    /// Returns the event type name.
    pub fn event_type(&self) -> &'static str {
        match self {
            DomainEvent::RegionsPlanned(_) => "regions_planned",
            DomainEvent::ObjectDetected(_) => "object_detected",
            DomainEvent::TrackStationary(_) => "track_stationary",
            DomainEvent::FaceRecognized(_) => "face_recognized",
            DomainEvent::QueueDropped(_) => "queue_dropped",
            DomainEvent::CameraRestarted(_) => "camera_restarted",
        }
    }
}

/// Builds a `RegionsPlanned` event without duplicating the `Region` ->
/// count conversion at every call site.
pub fn regions_planned(camera_name: impl Into<String>, frame_time: f64, regions: &[Region]) -> DomainEvent {
    DomainEvent::RegionsPlanned(RegionsPlannedEvent {
        camera_name: camera_name.into(),
        frame_time,
        region_count: regions.len(),
        timestamp: Utc::now(),
    })
}
