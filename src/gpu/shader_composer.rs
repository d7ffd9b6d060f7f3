//! Shader composition over naga-oil.

use std::borrow::Cow;

use naga_oil::compose::{
    ComposableModuleDescriptor, Composer, NagaModuleDescriptor, ShaderLanguage,
    ShaderType,
};

use crate::error::ViewerError;

/// Shared module definition: WGSL source and the path used in diagnostics.
struct ModuleDef {
    source: &'static str,
    file_path: &'static str,
}

/// Shared modules in dependency order.
const SHARED_MODULES: &[ModuleDef] = &[
    ModuleDef {
        source: include_str!("../../assets/shaders/modules/fullscreen.wgsl"),
        file_path: "modules/fullscreen.wgsl",
    },
    ModuleDef {
        source: include_str!("../../assets/shaders/modules/camera.wgsl"),
        file_path: "modules/camera.wgsl",
    },
];

/// Wraps `naga_oil::compose::Composer` to provide shader composition with
/// `#import` support.
///
/// Pre-loads the shared WGSL modules at construction time. Consuming shaders
/// use `#import orbview::fullscreen` or `#import orbview::camera` to pull in
/// shared code. The composer produces `naga::Module` IR directly, skipping
/// WGSL re-parse at runtime.
pub struct ShaderComposer {
    composer: Composer,
}

impl ShaderComposer {
    /// Composer with the shared modules registered.
    ///
    /// # Errors
    ///
    /// [`ViewerError::Shader`] if a shared module fails to parse.
    pub fn new() -> Result<Self, ViewerError> {
        let mut composer = Composer::default();
        for module in SHARED_MODULES {
            let _ = composer
                .add_composable_module(ComposableModuleDescriptor {
                    source: module.source,
                    file_path: module.file_path,
                    language: ShaderLanguage::Wgsl,
                    ..Default::default()
                })
                .map_err(|e| {
                    ViewerError::Shader(format!(
                        "failed to register shader module '{}': {e:?}",
                        module.file_path
                    ))
                })?;
        }
        Ok(Self { composer })
    }

    /// Compose a shader source string (which may contain `#import`
    /// directives) into a `wgpu::ShaderModule` ready for pipeline creation.
    ///
    /// # Errors
    ///
    /// [`ViewerError::Shader`] if composition fails.
    pub fn compose(
        &mut self,
        device: &wgpu::Device,
        label: &str,
        source: &str,
        file_path: &str,
    ) -> Result<wgpu::ShaderModule, ViewerError> {
        let naga_module = self.compose_naga(source, file_path)?;
        Ok(device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Naga(Cow::Owned(naga_module)),
        }))
    }

    /// Compose a shader source into a `naga::Module` without creating a wgpu
    /// shader module.
    ///
    /// # Errors
    ///
    /// [`ViewerError::Shader`] if composition fails.
    pub fn compose_naga(
        &mut self,
        source: &str,
        file_path: &str,
    ) -> Result<naga::Module, ViewerError> {
        self.composer
            .make_naga_module(NagaModuleDescriptor {
                source,
                file_path,
                shader_type: ShaderType::Wgsl,
                ..Default::default()
            })
            .map_err(|e| {
                ViewerError::Shader(format!(
                    "failed to compose shader '{file_path}': {e}"
                ))
            })
    }
}
