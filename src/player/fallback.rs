//! Playback fallback controller
//!
//! Drives one playback session at a time. Every load the presentation layer
//! performs is identified by an [`AttemptToken`]; outcomes reported with any
//! other token (a previous attempt, a previous session, or after `close`) are
//! ignored, so late error events and timers can never trigger a switch.
//!
//! On failure the controller walks the channel's alternatives in order, then,
//! with auto-switch enabled, moves to the next channel in catalog order
//! (wrapping). It stops with `NoChannelsLeft` once the chain would return to
//! the channel where it started.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::alternatives::AlternativesProvider;
use crate::config::PlayerConfig;
use crate::errors::{AppError, AppResult};
use crate::models::{Channel, ChannelRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct AttemptToken(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerSettings {
    pub auto_switch: bool,
    pub load_timeout: Duration,
    pub alternative_delay: Duration,
    pub channel_delay: Duration,
}

impl From<&PlayerConfig> for PlayerSettings {
    fn from(config: &PlayerConfig) -> Self {
        Self {
            auto_switch: config.auto_switch,
            load_timeout: config.load_timeout,
            alternative_delay: config.alternative_delay,
            channel_delay: config.channel_delay,
        }
    }
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self::from(&PlayerConfig::default())
    }
}

/// Instruction to the presentation layer: wait `delay`, load `url`, and
/// report a `LoadTimeout` if nothing has played after `load_timeout`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackCommand {
    pub token: AttemptToken,
    pub channel_id: usize,
    pub url: String,
    pub label: String,
    pub source_name: String,
    /// `None` for the channel's primary stream
    pub alternative_index: Option<usize>,
    pub delay: Duration,
    pub load_timeout: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    Loaded,
    Failed,
    LoadTimeout,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Load the next stream
    Play(PlaybackCommand),
    /// The current attempt is playing
    Playing,
    /// Stale token or closed session; nothing to do
    Ignored,
    /// Alternatives exhausted and auto-switch is off
    NoAlternativesLeft { channel_id: usize },
    /// Every channel in the chain failed
    NoChannelsLeft,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Playing {
        channel_id: usize,
        /// Alternatives consumed so far; 0 while on the primary
        alt_index: usize,
    },
    NoAlternativesLeft {
        channel_id: usize,
    },
    NoChannelsLeft,
}

pub struct FallbackController {
    provider: Arc<dyn AlternativesProvider>,
    channels: Vec<Channel>,
    settings: PlayerSettings,
    state: SessionState,
    next_token: u64,
    active: Option<AttemptToken>,
    loaded: bool,
    position: usize,
    origin: usize,
    alternatives: Vec<ChannelRecord>,
    alt_index: usize,
}

impl FallbackController {
    /// `channels` is the list auto-switch walks, in catalog order
    pub fn new(
        provider: Arc<dyn AlternativesProvider>,
        channels: Vec<Channel>,
        settings: PlayerSettings,
    ) -> Self {
        Self {
            provider,
            channels,
            settings,
            state: SessionState::Idle,
            next_token: 0,
            active: None,
            loaded: false,
            position: 0,
            origin: 0,
            alternatives: Vec::new(),
            alt_index: 0,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn settings(&self) -> &PlayerSettings {
        &self.settings
    }

    /// "3 of 120" style position of the current channel
    pub fn channel_count(&self) -> Option<(usize, usize)> {
        match self.state {
            SessionState::Playing { .. } => Some((self.position + 1, self.channels.len())),
            _ => None,
        }
    }

    /// Start a new session on `channel_id`, abandoning any previous one
    pub async fn play(&mut self, channel_id: usize) -> AppResult<PlaybackCommand> {
        let position = self
            .channels
            .iter()
            .position(|c| c.id == channel_id)
            .ok_or_else(|| AppError::not_found("channel", channel_id.to_string()))?;

        self.active = None;
        self.origin = position;
        let command = self.switch_to(position, Duration::ZERO).await;
        info!("Playing channel {} ({})", command.label, channel_id);
        Ok(command)
    }

    /// Feed the outcome of the attempt identified by `token`
    pub async fn on_playback_outcome(
        &mut self,
        token: AttemptToken,
        outcome: PlaybackOutcome,
    ) -> Transition {
        if self.active != Some(token) {
            debug!("Ignoring {:?} for stale attempt {:?}", outcome, token);
            return Transition::Ignored;
        }

        match outcome {
            PlaybackOutcome::Loaded => {
                self.loaded = true;
                Transition::Playing
            }
            // Playback already started; the armed timer is moot.
            PlaybackOutcome::LoadTimeout if self.loaded => Transition::Ignored,
            PlaybackOutcome::Failed | PlaybackOutcome::LoadTimeout => self.advance().await,
        }
    }

    /// End the session; outstanding tokens become stale
    pub fn close(&mut self) {
        self.active = None;
        self.loaded = false;
        self.alternatives.clear();
        self.alt_index = 0;
        self.state = SessionState::Idle;
    }

    async fn advance(&mut self) -> Transition {
        let channel_id = self.channels[self.position].id;

        if let Some(alternative) = self.alternatives.get(self.alt_index).cloned() {
            let index = self.alt_index;
            self.alt_index += 1;
            self.state = SessionState::Playing {
                channel_id,
                alt_index: self.alt_index,
            };
            info!(
                "Trying alternative {}/{} for channel {}",
                self.alt_index,
                self.alternatives.len(),
                channel_id
            );
            let command = self.command(
                channel_id,
                &alternative,
                Some(index),
                self.settings.alternative_delay,
            );
            return Transition::Play(command);
        }

        if !self.settings.auto_switch {
            warn!("No alternatives left for channel {}", channel_id);
            self.active = None;
            self.state = SessionState::NoAlternativesLeft { channel_id };
            return Transition::NoAlternativesLeft { channel_id };
        }

        let next = (self.position + 1) % self.channels.len();
        if next == self.origin {
            warn!("No more channels available");
            self.active = None;
            self.state = SessionState::NoChannelsLeft;
            return Transition::NoChannelsLeft;
        }

        let command = self.switch_to(next, self.settings.channel_delay).await;
        info!("Switching to next channel {}", command.label);
        Transition::Play(command)
    }

    async fn switch_to(&mut self, position: usize, delay: Duration) -> PlaybackCommand {
        let channel = self.channels[position].clone();
        self.position = position;
        self.alt_index = 0;
        self.loaded = false;
        self.alternatives = match self.provider.alternatives(channel.id).await {
            Ok(alternatives) => alternatives,
            Err(e) => {
                warn!("Could not load alternatives for channel {}: {}", channel.id, e);
                Vec::new()
            }
        };
        self.state = SessionState::Playing {
            channel_id: channel.id,
            alt_index: 0,
        };
        self.command(channel.id, &channel.record, None, delay)
    }

    fn command(
        &mut self,
        channel_id: usize,
        record: &ChannelRecord,
        alternative_index: Option<usize>,
        delay: Duration,
    ) -> PlaybackCommand {
        self.next_token += 1;
        let token = AttemptToken(self.next_token);
        self.active = Some(token);
        self.loaded = false;

        PlaybackCommand {
            token,
            channel_id,
            url: record.stream_url.clone(),
            label: record.name.clone(),
            source_name: record.source_name.clone(),
            alternative_index,
            delay,
            load_timeout: self.settings.load_timeout,
        }
    }
}
