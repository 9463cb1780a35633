use crate::audio::AudioChannel;
use crate::capture::GrantToken;
use crate::overlay::{PointerPhase, PointerSample};
use crate::service::ServiceCommand;
use anyhow::Context;
use serde::{Deserialize, Serialize};

/// One line of a replay script, e.g. `{"cmd":"down","x":40,"y":160}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum ScriptStep {
    Start,
    Stop,
    Down { x: f32, y: f32 },
    Move { x: f32, y: f32 },
    Up { x: f32, y: f32 },
    Cancel,
    TapOutside,
    RequestCapture,
    Permission {
        result_code: i32,
        #[serde(default)]
        token: Option<String>,
    },
    Volume { channel: AudioChannel, value: u32 },
    /// Let queued work (such as a capture) settle for `ms` milliseconds.
    Wait { ms: u64 },
}

impl ScriptStep {
    /// Command for this step, or `None` for `wait`.
    pub fn to_command(&self, at_ms: u64) -> Option<ServiceCommand> {
        let pointer = |phase, x, y| {
            Some(ServiceCommand::Pointer(PointerSample::new(phase, x, y, at_ms)))
        };
        match self {
            ScriptStep::Start => Some(ServiceCommand::Start),
            ScriptStep::Stop => Some(ServiceCommand::Stop),
            ScriptStep::Down { x, y } => pointer(PointerPhase::Down, *x, *y),
            ScriptStep::Move { x, y } => pointer(PointerPhase::Move, *x, *y),
            ScriptStep::Up { x, y } => pointer(PointerPhase::Up, *x, *y),
            ScriptStep::Cancel => pointer(PointerPhase::Cancel, 0.0, 0.0),
            ScriptStep::TapOutside => Some(ServiceCommand::TapOutsidePanel),
            ScriptStep::RequestCapture => Some(ServiceCommand::RequestCapture),
            ScriptStep::Permission { result_code, token } => {
                Some(ServiceCommand::PermissionResult {
                    result_code: *result_code,
                    token: token.clone().map(GrantToken::new),
                })
            }
            ScriptStep::Volume { channel, value } => Some(ServiceCommand::SetVolume {
                channel: *channel,
                value: *value,
            }),
            ScriptStep::Wait { .. } => None,
        }
    }
}

/// Parse a JSON-lines script. Blank lines and `#` comments are skipped.
pub fn parse_script(content: &str) -> anyhow::Result<Vec<ScriptStep>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(idx, line)| {
            serde_json::from_str(line.trim())
                .with_context(|| format!("invalid script step on line {}", idx + 1))
        })
        .collect()
}

pub fn load_script(path: &str) -> anyhow::Result<Vec<ScriptStep>> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("read script {path}"))?;
    parse_script(&content)
}
