use serde::{Deserialize, Serialize};

use crate::handle::*;
use crate::recorded::RecordedCommand;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandPoolObject {
    pub device: VkDevice,
    pub flags: u32,
    pub queue_family_index: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandBufferLevel {
    #[default]
    Primary,
    Secondary,
}

impl CommandBufferLevel {
    pub fn as_raw(self) -> u32 {
        match self {
            CommandBufferLevel::Primary => 0,
            CommandBufferLevel::Secondary => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordingState {
    #[default]
    NotStarted,
    Recording,
    Completed,
    ToBeReset,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InheritanceInfo {
    pub render_pass: VkRenderPass,
    pub subpass: u32,
    pub framebuffer: VkFramebuffer,
    pub occlusion_query_enable: bool,
    pub query_flags: u32,
    pub pipeline_statistics: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeginInfo {
    pub flags: u32,
    pub inheritance: Option<InheritanceInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandBufferObject {
    pub device: VkDevice,
    pub pool: VkCommandPool,
    pub level: CommandBufferLevel,
    pub recording: RecordingState,
    pub begin_info: Option<BeginInfo>,
    pub commands: Vec<RecordedCommand>,
}
