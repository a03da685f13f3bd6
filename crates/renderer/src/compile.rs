//! GLSL sources for the two simulation programs and their compilation.
//!
//! Compilation happens on the host through naga so failures carry the
//! frontend's own diagnostic text and can be reported before any device
//! work is done. Linking checks that every fragment input location is fed
//! by a vertex output.

use std::borrow::Cow;

use wgpu::naga::front::glsl::{Frontend, Options};
use wgpu::naga::valid::{Capabilities, ValidationFlags, Validator};
use wgpu::naga::{Binding, Module, ShaderStage, TypeInner};

use crate::error::{ProgramKind, RendererError, ShaderStageKind};

/// Pass-through vertex stage for the full-screen quad.
pub const QUAD_VERTEX_GLSL: &str = r"#version 450
layout(location = 0) in vec2 position;
layout(location = 1) in vec2 in_tex_coord;
layout(location = 0) out vec2 tex_coord;

void main() {
    tex_coord = in_tex_coord;
    gl_Position = vec4(position, 0.0, 1.0);
}
";

/// Draws a generation to the screen. Live cells come out white, dead cells
/// black, and the result is always opaque.
pub const RENDER_FRAGMENT_GLSL: &str = r"#version 450
layout(location = 0) in vec2 tex_coord;
layout(location = 0) out vec4 out_color;

layout(set = 0, binding = 0) uniform texture2D cells;
layout(set = 0, binding = 1) uniform sampler cells_sampler;

void main() {
    vec4 cell = texture(sampler2D(cells, cells_sampler), tex_coord);
    out_color = vec4(cell.rgb + cell.aaa, 1.0);
}
";

/// One Life generation: count the eight neighbours one texel away and
/// write `(0, 0, 0, alive)`.
///
/// Must stay in lockstep with [`crate::grid::next_state`] and the
/// neighbour offsets in `grid.rs`; the headless backend and every
/// behavioural test run that copy of the rule.
pub const COMPUTE_FRAGMENT_GLSL: &str = r"#version 450
layout(location = 0) in vec2 tex_coord;
layout(location = 0) out vec4 out_color;

layout(set = 0, binding = 0) uniform texture2D cells;
layout(set = 0, binding = 1) uniform sampler cells_sampler;

layout(std140, set = 1, binding = 0) uniform StepParams {
    vec2 delta;
} params;

float alive_at(vec2 offset) {
    return texture(sampler2D(cells, cells_sampler), tex_coord + offset * params.delta).a;
}

void main() {
    float current = alive_at(vec2(0.0, 0.0));
    float neighbours = alive_at(vec2(1.0, 0.0))
        + alive_at(vec2(-1.0, 0.0))
        + alive_at(vec2(0.0, 1.0))
        + alive_at(vec2(0.0, -1.0))
        + alive_at(vec2(1.0, 1.0))
        + alive_at(vec2(-1.0, 1.0))
        + alive_at(vec2(1.0, -1.0))
        + alive_at(vec2(-1.0, -1.0));

    float alive = 0.0;
    if (current == 1.0) {
        if (neighbours == 2.0 || neighbours == 3.0) {
            alive = 1.0;
        }
    } else if (neighbours == 3.0) {
        alive = 1.0;
    }
    out_color = vec4(0.0, 0.0, 0.0, alive);
}
";

/// A vertex/fragment pair that parsed, validated and linked.
#[derive(Debug, Clone)]
pub struct CompiledProgram {
    kind: ProgramKind,
    vertex: Cow<'static, str>,
    fragment: Cow<'static, str>,
}

impl CompiledProgram {
    pub fn kind(&self) -> ProgramKind {
        self.kind
    }

    /// Builds the device modules from the already validated sources.
    pub(crate) fn create_modules(
        &self,
        device: &wgpu::Device,
    ) -> (wgpu::ShaderModule, wgpu::ShaderModule) {
        let vertex = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(match self.kind {
                ProgramKind::Render => "render vertex",
                ProgramKind::Compute => "compute vertex",
            }),
            source: wgpu::ShaderSource::Glsl {
                shader: self.vertex.clone(),
                stage: ShaderStage::Vertex,
                defines: &[],
            },
        });
        let fragment = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(match self.kind {
                ProgramKind::Render => "render fragment",
                ProgramKind::Compute => "compute fragment",
            }),
            source: wgpu::ShaderSource::Glsl {
                shader: self.fragment.clone(),
                stage: ShaderStage::Fragment,
                defines: &[],
            },
        });
        (vertex, fragment)
    }
}

/// Compiles both stages and links them into a program.
pub fn compile(
    kind: ProgramKind,
    vertex: impl Into<Cow<'static, str>>,
    fragment: impl Into<Cow<'static, str>>,
) -> Result<CompiledProgram, RendererError> {
    let vertex = vertex.into();
    let fragment = fragment.into();

    let vertex_module = compile_stage(kind, ShaderStageKind::Vertex, &vertex)?;
    let fragment_module = compile_stage(kind, ShaderStageKind::Fragment, &fragment)?;
    link(kind, &vertex_module, &fragment_module)?;

    tracing::debug!(program = %kind, "compiled program");
    Ok(CompiledProgram {
        kind,
        vertex,
        fragment,
    })
}

pub fn render_program() -> Result<CompiledProgram, RendererError> {
    compile(ProgramKind::Render, QUAD_VERTEX_GLSL, RENDER_FRAGMENT_GLSL)
}

pub fn compute_program() -> Result<CompiledProgram, RendererError> {
    compile(ProgramKind::Compute, QUAD_VERTEX_GLSL, COMPUTE_FRAGMENT_GLSL)
}

fn compile_stage(
    program: ProgramKind,
    stage: ShaderStageKind,
    source: &str,
) -> Result<Module, RendererError> {
    let naga_stage = match stage {
        ShaderStageKind::Vertex => ShaderStage::Vertex,
        ShaderStageKind::Fragment => ShaderStage::Fragment,
    };
    let mut frontend = Frontend::default();
    let module = frontend
        .parse(&Options::from(naga_stage), source)
        .map_err(|errors| RendererError::Compile {
            program,
            stage,
            diagnostic: errors.emit_to_string(source),
        })?;

    Validator::new(ValidationFlags::all(), Capabilities::all())
        .validate(&module)
        .map_err(|error| RendererError::Compile {
            program,
            stage,
            diagnostic: error.emit_to_string(source),
        })?;

    Ok(module)
}

fn link(program: ProgramKind, vertex: &Module, fragment: &Module) -> Result<(), RendererError> {
    let outputs = vertex_output_locations(vertex);
    let inputs = fragment_input_locations(fragment);

    let missing: Vec<u32> = inputs
        .iter()
        .copied()
        .filter(|location| !outputs.contains(location))
        .collect();
    if missing.is_empty() {
        return Ok(());
    }

    let diagnostic = missing
        .iter()
        .map(|location| format!("fragment input at location {location} has no matching vertex output"))
        .collect::<Vec<_>>()
        .join("\n");
    Err(RendererError::Link {
        program,
        diagnostic,
    })
}

fn vertex_output_locations(module: &Module) -> Vec<u32> {
    let mut locations = Vec::new();
    for entry in module
        .entry_points
        .iter()
        .filter(|entry| entry.stage == ShaderStage::Vertex)
    {
        if let Some(result) = &entry.function.result {
            collect_locations(module, result.ty, result.binding.as_ref(), &mut locations);
        }
    }
    locations
}

fn fragment_input_locations(module: &Module) -> Vec<u32> {
    let mut locations = Vec::new();
    for entry in module
        .entry_points
        .iter()
        .filter(|entry| entry.stage == ShaderStage::Fragment)
    {
        for argument in &entry.function.arguments {
            collect_locations(module, argument.ty, argument.binding.as_ref(), &mut locations);
        }
    }
    locations
}

/// User-defined locations carried by a value, looking through structs.
fn collect_locations(
    module: &Module,
    ty: wgpu::naga::Handle<wgpu::naga::Type>,
    binding: Option<&Binding>,
    out: &mut Vec<u32>,
) {
    match binding {
        Some(Binding::Location { location, .. }) => out.push(*location),
        Some(Binding::BuiltIn(_)) => {}
        None => {
            if let TypeInner::Struct { members, .. } = &module.types[ty].inner {
                for member in members {
                    collect_locations(module, member.ty, member.binding.as_ref(), out);
                }
            }
        }
    }
}
