use std::mem::{offset_of, size_of};

/// Uniform buffer data for GPU
///
/// Mirrors `struct Uniforms` in the WGSL stages (group 0, binding 0).
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct UniformBlock {
    pub view: [[f32; 4]; 4],
    pub proj: [[f32; 4]; 4],
    pub color: [f32; 4],
    pub time: f32,
    pub speed: f32,
    pub height: f32,
    pub texture_unit: u32,
}

impl Default for UniformBlock {
    fn default() -> Self {
        Self {
            view: glam::Mat4::IDENTITY.to_cols_array_2d(),
            proj: glam::Mat4::IDENTITY.to_cols_array_2d(),
            color: [1.0; 4],
            time: 0.0,
            speed: 1.0,
            height: 1.0,
            texture_unit: 0,
        }
    }
}

/// Every uniform a viewer program may declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Uniform {
    View,
    Projection,
    Color,
    Time,
    Speed,
    Height,
    TextureUnit,
}

impl Uniform {
    pub const ALL: [Uniform; 7] = [
        Uniform::View,
        Uniform::Projection,
        Uniform::Color,
        Uniform::Time,
        Uniform::Speed,
        Uniform::Height,
        Uniform::TextureUnit,
    ];

    /// Field name inside the WGSL `Uniforms` struct
    pub const fn name(self) -> &'static str {
        match self {
            Uniform::View => "view",
            Uniform::Projection => "proj",
            Uniform::Color => "color",
            Uniform::Time => "time",
            Uniform::Speed => "speed",
            Uniform::Height => "height",
            Uniform::TextureUnit => "texture_unit",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|u| u.name() == name)
    }

    pub const fn location(self) -> UniformLocation {
        let (offset, size) = match self {
            Uniform::View => (offset_of!(UniformBlock, view), size_of::<[[f32; 4]; 4]>()),
            Uniform::Projection => (offset_of!(UniformBlock, proj), size_of::<[[f32; 4]; 4]>()),
            Uniform::Color => (offset_of!(UniformBlock, color), size_of::<[f32; 4]>()),
            Uniform::Time => (offset_of!(UniformBlock, time), size_of::<f32>()),
            Uniform::Speed => (offset_of!(UniformBlock, speed), size_of::<f32>()),
            Uniform::Height => (offset_of!(UniformBlock, height), size_of::<f32>()),
            Uniform::TextureUnit => (offset_of!(UniformBlock, texture_unit), size_of::<u32>()),
        };
        UniformLocation {
            offset: offset as u32,
            size: size as u32,
        }
    }
}

/// Byte range of one uniform inside a program's `UniformBlock`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation {
    pub offset: u32,
    pub size: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    UInt(u32),
    Vec4([f32; 4]),
    Mat4([[f32; 4]; 4]),
}

impl UniformValue {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            UniformValue::Float(v) => bytemuck::bytes_of(v),
            UniformValue::UInt(v) => bytemuck::bytes_of(v),
            UniformValue::Vec4(v) => bytemuck::bytes_of(v),
            UniformValue::Mat4(v) => bytemuck::bytes_of(v),
        }
    }

    /// Copy into `block` at `location`; a size mismatch writes nothing
    pub fn write_into(&self, block: &mut UniformBlock, location: UniformLocation) -> bool {
        let bytes = self.as_bytes();
        if bytes.len() != location.size as usize {
            return false;
        }
        let start = location.offset as usize;
        let target = bytemuck::bytes_of_mut(block);
        match target.get_mut(start..start + bytes.len()) {
            Some(slot) => {
                slot.copy_from_slice(bytes);
                true
            }
            None => false,
        }
    }
}

/// Name the WGSL stages give their `var<uniform>` binding
pub const UNIFORM_BINDING: &str = "uniforms";

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn reads_field(line: &str, field: &str) -> bool {
    let needle = format!("{UNIFORM_BINDING}.{field}");
    line.match_indices(&needle).any(|(at, _)| {
        let before = line[..at].chars().next_back();
        let after = line[at + needle.len()..].chars().next();
        !before.is_some_and(is_ident_char) && !after.is_some_and(is_ident_char)
    })
}

/// Uniforms a WGSL stage actually reads
///
/// A field declared in `struct Uniforms` but never read through the binding is
/// treated as absent, the way a GLSL linker drops unused uniforms.
pub fn referenced_uniforms(source: &str) -> Vec<Uniform> {
    let code: Vec<&str> = source
        .lines()
        .map(|line| line.split("//").next().unwrap_or(""))
        .collect();

    Uniform::ALL
        .into_iter()
        .filter(|u| code.iter().any(|line| reads_field(line, u.name())))
        .collect()
}
