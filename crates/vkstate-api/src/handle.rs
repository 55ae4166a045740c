use std::fmt;

use serde::{Deserialize, Serialize};

/// Implemented by every typed Vulkan handle.
pub trait Handle: Copy + Ord + fmt::Debug {
    const KIND: HandleKind;

    fn raw(self) -> u64;
    fn from_raw(raw: u64) -> Self;

    fn is_null(self) -> bool {
        self.raw() == 0
    }

    fn any(self) -> AnyHandle {
        AnyHandle {
            kind: Self::KIND,
            raw: self.raw(),
        }
    }
}

/// A handle whose kind is only known at runtime. Used by the live set of the
/// rebuilt state and in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AnyHandle {
    pub kind: HandleKind,
    pub raw: u64,
}

impl fmt::Display for AnyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({:#x})", self.kind, self.raw)
    }
}

macro_rules! vk_handles {
    ($($name:ident => $kind:ident,)*) => {
        /// Type tag of a Vulkan handle.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum HandleKind {
            $($kind,)*
        }

        impl HandleKind {
            pub fn name(self) -> &'static str {
                match self {
                    $(HandleKind::$kind => stringify!($name),)*
                }
            }
        }

        $(
            #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash,
                     Serialize, Deserialize)]
            #[serde(transparent)]
            pub struct $name(pub u64);

            impl $name {
                pub const NULL: Self = Self(0);
            }

            impl Handle for $name {
                const KIND: HandleKind = HandleKind::$kind;

                fn raw(self) -> u64 {
                    self.0
                }

                fn from_raw(raw: u64) -> Self {
                    Self(raw)
                }
            }

            impl From<$name> for AnyHandle {
                fn from(h: $name) -> Self {
                    h.any()
                }
            }
        )*
    };
}

vk_handles! {
    VkInstance => Instance,
    VkPhysicalDevice => PhysicalDevice,
    VkSurface => Surface,
    VkDevice => Device,
    VkQueue => Queue,
    VkSwapchain => Swapchain,
    VkDeviceMemory => DeviceMemory,
    VkBuffer => Buffer,
    VkBufferView => BufferView,
    VkImage => Image,
    VkImageView => ImageView,
    VkSampler => Sampler,
    VkSamplerYcbcrConversion => SamplerYcbcrConversion,
    VkFence => Fence,
    VkSemaphore => Semaphore,
    VkEvent => Event,
    VkQueryPool => QueryPool,
    VkCommandPool => CommandPool,
    VkCommandBuffer => CommandBuffer,
    VkShaderModule => ShaderModule,
    VkPipelineCache => PipelineCache,
    VkDescriptorSetLayout => DescriptorSetLayout,
    VkDescriptorUpdateTemplate => DescriptorUpdateTemplate,
    VkPipelineLayout => PipelineLayout,
    VkRenderPass => RenderPass,
    VkFramebuffer => Framebuffer,
    VkPipeline => Pipeline,
    VkDescriptorPool => DescriptorPool,
    VkDescriptorSet => DescriptorSet,
}

impl fmt::Display for HandleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
