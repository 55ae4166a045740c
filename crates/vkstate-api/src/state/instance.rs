use serde::{Deserialize, Serialize};

use crate::handle::*;

// ── Instance ────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplicationInfo {
    pub application_name: Option<String>,
    pub application_version: u32,
    pub engine_name: Option<String>,
    pub engine_version: u32,
    pub api_version: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstanceObject {
    pub application_info: Option<ApplicationInfo>,
    pub enabled_layers: Vec<String>,
    pub enabled_extensions: Vec<String>,
}

// ── Physical device ─────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueFamilyProperties {
    pub queue_flags: u32,
    pub queue_count: u32,
    pub timestamp_valid_bits: u32,
    pub min_image_transfer_granularity: [u32; 3],
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryType {
    pub property_flags: u32,
    pub heap_index: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhysicalDeviceObject {
    pub instance: VkInstance,
    /// Position in the captured `vkEnumeratePhysicalDevices` result.
    pub index: u32,
    pub device_name: String,
    pub vendor_id: u32,
    pub device_id: u32,
    pub driver_version: u32,
    pub api_version: u32,
    pub queue_families: Vec<QueueFamilyProperties>,
    pub memory_types: Vec<MemoryType>,
}

// ── Surface ─────────────────────────────────────────────────

/// Platform a surface was created for, with its native handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SurfaceKind {
    Xlib { display: u64, window: u64 },
    Xcb { connection: u64, window: u64 },
    Wayland { display: u64, surface: u64 },
    Win32 { hinstance: u64, hwnd: u64 },
    Android { window: u64 },
    MacOs { view: u64 },
    Headless,
    /// Created through an entry point the capture did not classify.
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceObject {
    pub instance: VkInstance,
    pub kind: SurfaceKind,
    pub flags: u32,
}

// ── Device / queues ─────────────────────────────────────────

/// An extension feature struct from the device create-info `pNext` chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureStruct {
    pub s_type: i32,
    /// `VkBool32` members in declaration order.
    pub members: Vec<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceObject {
    pub physical_device: VkPhysicalDevice,
    pub flags: u32,
    pub enabled_layers: Vec<String>,
    pub enabled_extensions: Vec<String>,
    /// `VkPhysicalDeviceFeatures`, if the application passed one.
    pub enabled_features: Option<Vec<u32>>,
    pub feature_chain: Vec<FeatureStruct>,
}

/// A reference to one command recorded in a command buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRef {
    pub buffer: VkCommandBuffer,
    pub index: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueObject {
    pub device: VkDevice,
    pub family: u32,
    pub index: u32,
    pub priority: f32,
    pub flags: u32,
    /// Commands submitted to the queue that have not executed yet, e.g.
    /// because they wait on an unsignaled event.
    pub pending_commands: Vec<CommandRef>,
}

// ── Swapchain ───────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SwapchainObject {
    pub device: VkDevice,
    pub surface: VkSurface,
    pub flags: u32,
    pub min_image_count: u32,
    pub image_format: i32,
    pub image_color_space: i32,
    pub image_extent: [u32; 2],
    pub image_array_layers: u32,
    pub image_usage: u32,
    pub image_sharing_mode: i32,
    pub queue_family_indices: Vec<u32>,
    pub pre_transform: u32,
    pub composite_alpha: u32,
    pub present_mode: i32,
    pub clipped: bool,
    pub images: Vec<VkImage>,
}
