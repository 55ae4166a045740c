use std::collections::BTreeMap;

use ash::vk;
use tracing::debug;

use vkstate_api::handle::*;
use vkstate_api::packed::{self, feature_struct, physical_device_features, s_type};
use vkstate_api::state::SurfaceKind;
use vkstate_api::{ApiCommand, Ptr, SurfacePlatform};
use vkstate_core::RebuildError;

use super::StateRebuilder;

impl StateRebuilder<'_, '_> {
    // ── Instance ────────────────────────────────────────────

    pub(super) fn instances(&mut self) -> Result<(), RebuildError> {
        let state = self.state;
        for (&instance, obj) in &state.instances {
            let em = &mut self.em;
            let p_application_info = match &obj.application_info {
                Some(app) => {
                    let name = app.application_name.as_deref().map(|n| em.alloc_cstr(n).0);
                    let engine = app.engine_name.as_deref().map(|n| em.alloc_cstr(n).0);
                    let info = packed::ApplicationInfo {
                        s_type: s_type(vk::StructureType::APPLICATION_INFO),
                        p_application_name: name.unwrap_or(0),
                        application_version: app.application_version,
                        p_engine_name: engine.unwrap_or(0),
                        engine_version: app.engine_version,
                        api_version: app.api_version,
                        ..Default::default()
                    };
                    em.alloc_read(&info).0
                }
                None => 0,
            };
            let info = packed::InstanceCreateInfo {
                s_type: s_type(vk::StructureType::INSTANCE_CREATE_INFO),
                p_application_info,
                enabled_layer_count: obj.enabled_layers.len() as u32,
                pp_enabled_layer_names: em.alloc_cstr_array(&obj.enabled_layers).0,
                enabled_extension_count: obj.enabled_extensions.len() as u32,
                pp_enabled_extension_names: em.alloc_cstr_array(&obj.enabled_extensions).0,
                ..Default::default()
            };
            let create_info = em.alloc_read(&info);
            let instance_out = em.alloc_write(8);
            em.write(ApiCommand::CreateInstance {
                create_info,
                allocator: Ptr::NULL,
                instance_out,
                instance,
            });
        }
        Ok(())
    }

    /// Enumerate each instance's physical devices in captured order and
    /// query the properties the application queried.
    pub(super) fn physical_devices(&mut self) -> Result<(), RebuildError> {
        let state = self.state;
        let mut by_instance: BTreeMap<VkInstance, Vec<(u32, VkPhysicalDevice)>> = BTreeMap::new();
        for (&pd, obj) in &state.physical_devices {
            by_instance.entry(obj.instance).or_default().push((obj.index, pd));
        }
        for (instance, mut devices) in by_instance {
            if !self.requires(instance, instance) {
                continue;
            }
            devices.sort();
            let physical_devices: Vec<VkPhysicalDevice> = devices.iter().map(|(_, pd)| *pd).collect();
            let em = &mut self.em;
            let count = em.alloc_read(&(physical_devices.len() as u32));
            let physical_devices_out = em.alloc_write(8 * physical_devices.len() as u64);
            em.write(ApiCommand::EnumeratePhysicalDevices {
                instance,
                count,
                physical_devices_out,
                physical_devices: physical_devices.clone(),
            });

            for physical_device in physical_devices {
                let obj = state.physical_device(physical_device)?;
                let em = &mut self.em;
                let properties_out = em.alloc_write(packed::PHYSICAL_DEVICE_PROPERTIES_SIZE);
                em.write(ApiCommand::GetPhysicalDeviceProperties {
                    physical_device,
                    properties_out,
                });
                let properties_out = em.alloc_write(packed::PHYSICAL_DEVICE_MEMORY_PROPERTIES_SIZE);
                em.write(ApiCommand::GetPhysicalDeviceMemoryProperties {
                    physical_device,
                    properties_out,
                });
                let families = obj.queue_families.len() as u64;
                let count = em.alloc_read(&(families as u32));
                let properties_out =
                    em.alloc_write(packed::QUEUE_FAMILY_PROPERTIES_SIZE * families);
                em.write(ApiCommand::GetPhysicalDeviceQueueFamilyProperties {
                    physical_device,
                    count,
                    properties_out,
                });
            }
        }
        Ok(())
    }

    // ── Surface ─────────────────────────────────────────────

    pub(super) fn surfaces(&mut self) -> Result<(), RebuildError> {
        let state = self.state;
        for (&surface, obj) in &state.surfaces {
            if !self.requires(surface, obj.instance) {
                continue;
            }
            let em = &mut self.em;
            let two = |st: vk::StructureType, native0: u64, native1: u64| packed::NativeSurfaceCreateInfo2 {
                s_type: s_type(st),
                flags: obj.flags,
                native0,
                native1,
                ..Default::default()
            };
            let one = |st: vk::StructureType, native0: u64| packed::NativeSurfaceCreateInfo1 {
                s_type: s_type(st),
                flags: obj.flags,
                native0,
                ..Default::default()
            };
            let (platform, create_info) = match obj.kind {
                SurfaceKind::Xlib { display, window } => (
                    SurfacePlatform::Xlib,
                    em.alloc_read(&two(vk::StructureType::XLIB_SURFACE_CREATE_INFO_KHR, display, window)),
                ),
                SurfaceKind::Xcb { connection, window } => (
                    SurfacePlatform::Xcb,
                    em.alloc_read(&two(vk::StructureType::XCB_SURFACE_CREATE_INFO_KHR, connection, window)),
                ),
                SurfaceKind::Wayland { display, surface } => (
                    SurfacePlatform::Wayland,
                    em.alloc_read(&two(
                        vk::StructureType::WAYLAND_SURFACE_CREATE_INFO_KHR,
                        display,
                        surface,
                    )),
                ),
                SurfaceKind::Win32 { hinstance, hwnd } => (
                    SurfacePlatform::Win32,
                    em.alloc_read(&two(vk::StructureType::WIN32_SURFACE_CREATE_INFO_KHR, hinstance, hwnd)),
                ),
                SurfaceKind::Android { window } => (
                    SurfacePlatform::Android,
                    em.alloc_read(&one(vk::StructureType::ANDROID_SURFACE_CREATE_INFO_KHR, window)),
                ),
                SurfaceKind::MacOs { view } => (
                    SurfacePlatform::MacOs,
                    em.alloc_read(&one(vk::StructureType::MACOS_SURFACE_CREATE_INFO_MVK, view)),
                ),
                SurfaceKind::Headless => (
                    SurfacePlatform::Headless,
                    em.alloc_read(&packed::FlagsOnlyCreateInfo {
                        s_type: s_type(vk::StructureType::HEADLESS_SURFACE_CREATE_INFO_EXT),
                        flags: obj.flags,
                        ..Default::default()
                    }),
                ),
                SurfaceKind::Unknown => {
                    em.discard_pending();
                    return Err(RebuildError::UnsupportedVariant(format!(
                        "surface kind of {}",
                        surface.any()
                    )));
                }
            };
            let surface_out = em.alloc_write(8);
            em.write(ApiCommand::CreateSurface {
                platform,
                instance: obj.instance,
                create_info,
                allocator: Ptr::NULL,
                surface_out,
                surface,
            });
        }
        Ok(())
    }

    // ── Device ──────────────────────────────────────────────

    pub(super) fn devices(&mut self) -> Result<(), RebuildError> {
        let state = self.state;
        for (&device, obj) in &state.devices {
            if !self.requires(device, obj.physical_device) {
                continue;
            }

            // One create info per family, ascending; priorities indexed by
            // queue index.
            let mut families: BTreeMap<u32, Vec<f32>> = BTreeMap::new();
            for q in state.queues.values().filter(|q| q.device == device) {
                let priorities = families.entry(q.family).or_default();
                let idx = q.index as usize;
                if priorities.len() <= idx {
                    priorities.resize(idx + 1, 1.0);
                }
                priorities[idx] = q.priority;
            }

            let em = &mut self.em;
            let queue_infos: Vec<packed::DeviceQueueCreateInfo> = families
                .iter()
                .map(|(family, priorities)| packed::DeviceQueueCreateInfo {
                    s_type: s_type(vk::StructureType::DEVICE_QUEUE_CREATE_INFO),
                    queue_family_index: *family,
                    queue_count: priorities.len() as u32,
                    p_queue_priorities: em.alloc_read_slice(priorities).0,
                    ..Default::default()
                })
                .collect();

            let p_enabled_features = obj
                .enabled_features
                .as_deref()
                .map(|bits| em.alloc_bytes(physical_device_features(bits)).0)
                .unwrap_or(0);
            // Built back to front so each struct can point at the next.
            let mut p_next = 0;
            for f in obj.feature_chain.iter().rev() {
                p_next = em.alloc_bytes(feature_struct(f.s_type, p_next, &f.members)).0;
            }

            let info = packed::DeviceCreateInfo {
                s_type: s_type(vk::StructureType::DEVICE_CREATE_INFO),
                p_next,
                flags: obj.flags,
                queue_create_info_count: queue_infos.len() as u32,
                p_queue_create_infos: em.alloc_read_slice(&queue_infos).0,
                enabled_layer_count: obj.enabled_layers.len() as u32,
                pp_enabled_layer_names: em.alloc_cstr_array(&obj.enabled_layers).0,
                enabled_extension_count: obj.enabled_extensions.len() as u32,
                pp_enabled_extension_names: em.alloc_cstr_array(&obj.enabled_extensions).0,
                p_enabled_features,
                ..Default::default()
            };
            let create_info = em.alloc_read(&info);
            let device_out = em.alloc_write(8);
            em.write(ApiCommand::CreateDevice {
                physical_device: obj.physical_device,
                create_info,
                allocator: Ptr::NULL,
                device_out,
                device,
            });
            debug!(?device, families = families.len(), "created device");
        }
        Ok(())
    }

    pub(super) fn queues(&mut self) -> Result<(), RebuildError> {
        let state = self.state;
        for (&queue, obj) in &state.queues {
            if !self.requires(queue, obj.device) {
                continue;
            }
            let queue_out = self.em.alloc_write(8);
            self.em.write(ApiCommand::GetDeviceQueue {
                device: obj.device,
                queue_family_index: obj.family,
                queue_index: obj.index,
                queue_out,
                queue,
            });
        }
        Ok(())
    }

    // ── Swapchain ───────────────────────────────────────────

    /// Swapchains and their images. Image contents are left to the
    /// application's first present.
    pub(super) fn swapchains(&mut self) -> Result<(), RebuildError> {
        let state = self.state;
        for (&swapchain, obj) in &state.swapchains {
            if !self.requires(swapchain, obj.device) || !self.requires(swapchain, obj.surface) {
                continue;
            }
            let em = &mut self.em;
            let info = packed::SwapchainCreateInfo {
                s_type: s_type(vk::StructureType::SWAPCHAIN_CREATE_INFO_KHR),
                flags: obj.flags,
                surface: obj.surface.0,
                min_image_count: obj.min_image_count,
                image_format: obj.image_format as u32,
                image_color_space: obj.image_color_space as u32,
                image_extent: obj.image_extent,
                image_array_layers: obj.image_array_layers,
                image_usage: obj.image_usage,
                image_sharing_mode: obj.image_sharing_mode as u32,
                queue_family_index_count: obj.queue_family_indices.len() as u32,
                p_queue_family_indices: em.alloc_read_slice(&obj.queue_family_indices).0,
                pre_transform: obj.pre_transform,
                composite_alpha: obj.composite_alpha,
                present_mode: obj.present_mode as u32,
                clipped: u32::from(obj.clipped),
                ..Default::default()
            };
            let create_info = em.alloc_read(&info);
            let swapchain_out = em.alloc_write(8);
            em.write(ApiCommand::CreateSwapchain {
                device: obj.device,
                create_info,
                allocator: Ptr::NULL,
                swapchain_out,
                swapchain,
            });

            let count = em.alloc_read(&(obj.images.len() as u32));
            let images_out = em.alloc_write(8 * obj.images.len() as u64);
            em.write(ApiCommand::GetSwapchainImages {
                device: obj.device,
                swapchain,
                count,
                images_out,
                images: obj.images.clone(),
            });
        }
        Ok(())
    }
}
