use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioChannel {
    Media,
    Call,
}

impl AudioChannel {
    pub const ALL: [AudioChannel; 2] = [AudioChannel::Media, AudioChannel::Call];
}

/// Per-channel stream volume as reported by the host's audio service.
pub trait AudioLevels: Send {
    fn level(&self, channel: AudioChannel) -> u32;
    fn max_level(&self, channel: AudioChannel) -> u32;
    fn set_level(&mut self, channel: AudioChannel, value: u32) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ChannelLevel {
    level: u32,
    max: u32,
}

/// In-memory levels, used by the headless binary and tests.
#[derive(Debug, Clone)]
pub struct MemoryAudioLevels {
    channels: HashMap<AudioChannel, ChannelLevel>,
}

impl MemoryAudioLevels {
    pub fn new() -> Self {
        let mut levels = Self {
            channels: HashMap::new(),
        };
        levels.configure(AudioChannel::Media, 7, 15);
        levels.configure(AudioChannel::Call, 3, 5);
        levels
    }

    /// Set both the maximum and the current level; the level is clamped.
    pub fn configure(&mut self, channel: AudioChannel, level: u32, max: u32) {
        self.channels.insert(
            channel,
            ChannelLevel {
                level: level.min(max),
                max,
            },
        );
    }
}

impl Default for MemoryAudioLevels {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioLevels for MemoryAudioLevels {
    fn level(&self, channel: AudioChannel) -> u32 {
        self.channels.get(&channel).map(|c| c.level).unwrap_or(0)
    }

    fn max_level(&self, channel: AudioChannel) -> u32 {
        self.channels.get(&channel).map(|c| c.max).unwrap_or(0)
    }

    fn set_level(&mut self, channel: AudioChannel, value: u32) -> Result<()> {
        let Some(entry) = self.channels.get_mut(&channel) else {
            bail!("unknown audio channel {channel:?}");
        };
        if value > entry.max {
            bail!("level {value} exceeds maximum {} for {channel:?}", entry.max);
        }
        entry.level = value;
        Ok(())
    }
}

pub fn percent_label(level: u32, max: u32) -> String {
    if max == 0 {
        return "0%".to_string();
    }
    format!("{}%", level * 100 / max)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeSlider {
    pub channel: AudioChannel,
    pub value: u32,
    pub max: u32,
    pub label: String,
}

impl VolumeSlider {
    fn from_levels(levels: &dyn AudioLevels, channel: AudioChannel) -> Self {
        let value = levels.level(channel);
        let max = levels.max_level(channel);
        Self {
            channel,
            value,
            max,
            label: percent_label(value, max),
        }
    }
}

/// Slider state behind the expanded panel.
pub struct VolumePanel {
    levels: Box<dyn AudioLevels>,
    sliders: Vec<VolumeSlider>,
}

impl VolumePanel {
    pub fn new(levels: Box<dyn AudioLevels>) -> Self {
        let sliders = AudioChannel::ALL
            .iter()
            .map(|&c| VolumeSlider::from_levels(levels.as_ref(), c))
            .collect();
        Self { levels, sliders }
    }

    pub fn sliders(&self) -> &[VolumeSlider] {
        &self.sliders
    }

    pub fn slider(&self, channel: AudioChannel) -> Option<&VolumeSlider> {
        self.sliders.iter().find(|s| s.channel == channel)
    }

    /// Re-read every slider from the audio model.
    pub fn refresh(&mut self) {
        for slider in &mut self.sliders {
            *slider = VolumeSlider::from_levels(self.levels.as_ref(), slider.channel);
        }
    }

    /// Write a slider move through to the audio model and update its label.
    pub fn slider_changed(&mut self, channel: AudioChannel, value: u32) -> Result<()> {
        self.levels.set_level(channel, value)?;
        if let Some(slider) = self.sliders.iter_mut().find(|s| s.channel == channel) {
            slider.value = value;
            slider.label = percent_label(value, slider.max);
        }
        tracing::debug!(?channel, value, "volume slider changed");
        Ok(())
    }
}
