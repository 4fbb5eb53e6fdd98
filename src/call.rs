//! Consultation video call: local call state over an opaque RTC session.
//!
//! The media SDK sits behind [`RtcSession`]; this module only tracks what the
//! call screen needs (joined, muted, video off, who is on the other end) and
//! applies the camera-swap rule.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::config::CallConfig;

#[derive(Error, Debug)]
pub enum CallError {
    #[error("Failed to join channel {channel}: {reason}")]
    Join { channel: String, reason: String },

    #[error("Failed to leave channel: {0}")]
    Leave(String),

    #[error("Media device error: {0}")]
    Device(String),
}

/// A local capture device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraDevice {
    pub device_id: String,
    pub label: String,
}

/// Real-time audio/video session provided by a media SDK.
#[async_trait]
pub trait RtcSession: Send + Sync {
    /// Join `channel` and publish local audio + video. Returns the local uid.
    async fn join(&self, app_id: &str, channel: &str, token: Option<&str>)
        -> Result<u32, CallError>;

    async fn leave(&self) -> Result<(), CallError>;

    async fn set_audio_enabled(&self, enabled: bool) -> Result<(), CallError>;

    async fn set_video_enabled(&self, enabled: bool) -> Result<(), CallError>;

    async fn cameras(&self) -> Result<Vec<CameraDevice>, CallError>;

    /// Label of the camera currently feeding the local video track.
    fn current_camera_label(&self) -> Option<String>;

    async fn set_camera(&self, device_id: &str) -> Result<(), CallError>;
}

/// What the call screen shows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallState {
    pub joined: bool,
    pub muted: bool,
    pub video_off: bool,
    pub local_uid: Option<u32>,
    pub remote_uid: Option<u32>,
}

pub struct CallController<S: RtcSession> {
    session: S,
    config: CallConfig,
    state: CallState,
}

impl<S: RtcSession> CallController<S> {
    pub fn new(session: S, config: CallConfig) -> Self {
        Self {
            session,
            config,
            state: CallState::default(),
        }
    }

    pub fn state(&self) -> &CallState {
        &self.state
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    /// Join the configured channel. No-op when already joined.
    pub async fn join(&mut self) -> Result<(), CallError> {
        if self.state.joined {
            return Ok(());
        }
        let uid = self
            .session
            .join(
                &self.config.app_id,
                &self.config.channel,
                self.config.token.as_deref(),
            )
            .await?;
        self.state.joined = true;
        self.state.local_uid = Some(uid);
        tracing::info!(channel = %self.config.channel, uid, "Joined consultation channel");
        Ok(())
    }

    /// Leave the channel and reset the call state. No-op when not joined.
    pub async fn leave(&mut self) -> Result<(), CallError> {
        if !self.state.joined {
            return Ok(());
        }
        self.session.leave().await?;
        self.state = CallState::default();
        tracing::info!(channel = %self.config.channel, "Left consultation channel");
        Ok(())
    }

    /// Flip the microphone. Returns the new muted flag.
    pub async fn toggle_mute(&mut self) -> Result<bool, CallError> {
        let muted = !self.state.muted;
        if self.state.joined {
            self.session.set_audio_enabled(!muted).await?;
        }
        self.state.muted = muted;
        Ok(muted)
    }

    /// Flip the local camera feed. Returns the new video-off flag.
    pub async fn toggle_video(&mut self) -> Result<bool, CallError> {
        let video_off = !self.state.video_off;
        if self.state.joined {
            self.session.set_video_enabled(!video_off).await?;
        }
        self.state.video_off = video_off;
        Ok(video_off)
    }

    /// Move the local video to the first camera whose label differs from the
    /// current one. Does nothing unless joined with more than one camera.
    pub async fn switch_camera(&mut self) -> Result<Option<CameraDevice>, CallError> {
        if !self.state.joined {
            return Ok(None);
        }
        let cameras = self.session.cameras().await?;
        if cameras.len() < 2 {
            return Ok(None);
        }
        let current = self.session.current_camera_label();
        let next = cameras
            .iter()
            .find(|cam| current.as_deref() != Some(cam.label.as_str()))
            .unwrap_or(&cameras[0])
            .clone();
        self.session.set_camera(&next.device_id).await?;
        tracing::info!(label = %next.label, "Switched camera");
        Ok(Some(next))
    }

    /// The other participant started publishing video.
    pub fn remote_published(&mut self, uid: u32) {
        self.state.remote_uid = Some(uid);
    }

    /// A participant stopped publishing; clears the remote only if it matches.
    pub fn remote_unpublished(&mut self, uid: u32) {
        if self.state.remote_uid == Some(uid) {
            self.state.remote_uid = None;
        }
    }
}
