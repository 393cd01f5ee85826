//! Camera Entity
//!
//! Represents a camera whose decoded frames feed the detection pipeline.
//! Frame ingestion itself (RTSP, muxing) is an external decoder process;
//! this entity carries what the Capture Watchdog and Processing Loop need
//! to supervise and configure that process per spec.md §1/§4.2.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Camera status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "camera_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CameraStatus {
    /// Camera is online and the decoder is producing frames.
    Active,
    /// Camera is configured but its decoder has not been started.
    Inactive,
    /// Camera's decoder encountered an error and has not yet recovered.
    Error,
    /// Camera's decoder is disconnected / repeatedly failing.
    Disconnected,
}

/// A camera entity representing a video source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Camera {
    id: Uuid,
    name: String,
    /// Command line used to spawn the decoder child process (e.g. an
    /// ffmpeg invocation producing raw YUV4:2:0 on stdout).
    decoder_command: Vec<String>,
    status: CameraStatus,
    resolution_width: i32,
    resolution_height: i32,
    fps: i32,
    /// Object labels this camera's Processing Loop should track
    /// (spec.md §4.5.1 object filters).
    objects_to_track: Vec<String>,
    is_enabled: bool,
    last_frame_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Camera {
    /// Creates a new camera configuration.
    pub fn new(
        name: String,
        decoder_command: Vec<String>,
        resolution_width: i32,
        resolution_height: i32,
        fps: i32,
        objects_to_track: Vec<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            decoder_command,
            status: CameraStatus::Inactive,
            resolution_width,
            resolution_height,
            fps,
            objects_to_track,
            is_enabled: true,
            last_frame_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Reconstructs a camera from persisted fields.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: Uuid,
        name: String,
        decoder_command: Vec<String>,
        status: CameraStatus,
        resolution_width: i32,
        resolution_height: i32,
        fps: i32,
        objects_to_track: Vec<String>,
        is_enabled: bool,
        last_frame_at: Option<DateTime<Utc>>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            decoder_command,
            status,
            resolution_width,
            resolution_height,
            fps,
            objects_to_track,
            is_enabled,
            last_frame_at,
            created_at,
            updated_at,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn decoder_command(&self) -> &[String] {
        &self.decoder_command
    }

    pub fn status(&self) -> CameraStatus {
        self.status
    }

    pub fn resolution(&self) -> (i32, i32) {
        (self.resolution_width, self.resolution_height)
    }

    /// Raw YUV4:2:0 frame shape `(H*3/2, W)`, per spec.md §3.
    pub fn frame_shape(&self) -> (i32, i32) {
        (self.resolution_height * 3 / 2, self.resolution_width)
    }

    /// Size in bytes of one raw YUV4:2:0 frame.
    pub fn frame_size_bytes(&self) -> usize {
        let (h, w) = self.frame_shape();
        (h as usize) * (w as usize)
    }

    pub fn fps(&self) -> i32 {
        self.fps
    }

    pub fn objects_to_track(&self) -> &[String] {
        &self.objects_to_track
    }

    pub fn is_enabled(&self) -> bool {
        self.is_enabled
    }

    pub fn last_frame_at(&self) -> Option<DateTime<Utc>> {
        self.last_frame_at
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Updates camera status.
    pub fn set_status(&mut self, status: CameraStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    /// Updates the last frame timestamp.
    pub fn update_last_frame(&mut self) {
        self.last_frame_at = Some(Utc::now());
        if self.status != CameraStatus::Active {
            self.status = CameraStatus::Active;
        }
    }

    /// Enables or disables the camera.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.is_enabled = enabled;
        if !enabled {
            self.status = CameraStatus::Inactive;
        }
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_camera() -> Camera {
        Camera::new(
            "front-door".to_string(),
            vec!["ffmpeg".to_string(), "-i".to_string(), "rtsp://cam".to_string()],
            1920,
            1080,
            5,
            vec!["person".to_string()],
        )
    }

    #[test]
    fn new_camera_is_inactive() {
        let camera = test_camera();
        assert_eq!(camera.status(), CameraStatus::Inactive);
    }

    #[test]
    fn frame_shape_is_yuv420_packed() {
        let camera = test_camera();
        assert_eq!(camera.frame_shape(), (1620, 1920));
        assert_eq!(camera.frame_size_bytes(), 1620 * 1920);
    }

    #[test]
    fn update_last_frame_sets_active() {
        let mut camera = test_camera();
        camera.update_last_frame();
        assert_eq!(camera.status(), CameraStatus::Active);
        assert!(camera.last_frame_at().is_some());
    }

    #[test]
    fn disable_camera_sets_inactive() {
        let mut camera = test_camera();
        camera.update_last_frame();
        camera.set_enabled(false);
        assert_eq!(camera.status(), CameraStatus::Inactive);
        assert!(!camera.is_enabled());
    }
}
