use anyhow::{Context, Result};

use crate::device::{GpuDevice, GpuShaderModule};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStageKind {
    Vertex,
    Pixel,
}

impl ShaderStageKind {
    /// Short tag used in labels and diagnostics.
    pub fn tag(self) -> &'static str {
        match self {
            ShaderStageKind::Vertex => "vs",
            ShaderStageKind::Pixel => "ps",
        }
    }

    fn naga_stage(self) -> naga::ShaderStage {
        match self {
            ShaderStageKind::Vertex => naga::ShaderStage::Vertex,
            ShaderStageKind::Pixel => naga::ShaderStage::Fragment,
        }
    }
}

/// One compiled entry point.
#[derive(Debug, Clone)]
pub struct ShaderStage {
    kind: ShaderStageKind,
    entry: String,
    filename: String,
    module: GpuShaderModule,
}

impl ShaderStage {
    /// Parses and validates `source`, checks that `entry` exists for this
    /// stage, then creates the device module.
    pub fn compile(
        device: &dyn GpuDevice,
        source: &str,
        kind: ShaderStageKind,
        filename: &str,
        entry: &str,
    ) -> Result<Self> {
        let module = naga::front::wgsl::parse_str(source).map_err(|e| {
            anyhow::anyhow!("{filename}: {}", e.emit_to_string(source))
        })?;

        naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        )
        .validate(&module)
        .with_context(|| format!("{filename}: module failed validation"))?;

        let found = module
            .entry_points
            .iter()
            .any(|ep| ep.name == entry && ep.stage == kind.naga_stage());
        anyhow::ensure!(
            found,
            "{filename}: no {:?} entry point named '{entry}'",
            kind.naga_stage()
        );

        let label = format!("{filename}:{entry} ({})", kind.tag());
        log::debug!("compiled {label}");

        Ok(Self {
            kind,
            entry: entry.to_string(),
            filename: filename.to_string(),
            module: device.create_shader_module(&label, source),
        })
    }

    pub fn kind(&self) -> ShaderStageKind {
        self.kind
    }

    pub fn entry(&self) -> &str {
        &self.entry
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn module(&self) -> &GpuShaderModule {
        &self.module
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::HeadlessDevice;

    const SRC: &str = r#"
        @vertex
        fn Vert(@location(0) pos: vec3<f32>) -> @builtin(position) vec4<f32> {
            return vec4<f32>(pos, 1.0);
        }

        @fragment
        fn Pixel() -> @location(0) vec4<f32> {
            return vec4<f32>(1.0);
        }
    "#;

    #[test]
    fn compiles_existing_entry() {
        let device = HeadlessDevice::new();
        let vs = ShaderStage::compile(&device, SRC, ShaderStageKind::Vertex, "t.wgsl", "Vert")
            .unwrap();
        assert_eq!(vs.entry(), "Vert");
        assert_eq!(device.stats().shader_modules_created, 1);
    }

    #[test]
    fn entry_of_wrong_stage_is_rejected() {
        let device = HeadlessDevice::new();
        let err = ShaderStage::compile(&device, SRC, ShaderStageKind::Vertex, "t.wgsl", "Pixel")
            .unwrap_err();
        assert!(format!("{err:#}").contains("Pixel"));
        assert_eq!(device.stats().shader_modules_created, 0);
    }

    #[test]
    fn syntax_errors_are_reported() {
        let device = HeadlessDevice::new();
        let result = ShaderStage::compile(
            &device,
            "fn broken( {",
            ShaderStageKind::Pixel,
            "bad.wgsl",
            "Pixel",
        );
        assert!(result.is_err());
    }
}
