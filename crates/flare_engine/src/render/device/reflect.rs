//! Minimal GLSL declaration scanner
//!
//! Pulls top-level `struct`, `uniform` and vertex `in`/`attribute`
//! declarations out of shader text so the headless device can report the
//! same active variables a driver would. Function bodies are skipped.

use super::{GlslType, ShaderStage};
use std::collections::HashMap;

/// A declared variable before struct expansion
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Declaration {
    pub ty: String,
    pub name: String,
    pub array_len: Option<usize>,
    pub location: Option<u32>,
}

/// Declarations found in one shader stage
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Reflection {
    pub structs: HashMap<String, Vec<Declaration>>,
    pub uniforms: Vec<Declaration>,
    pub inputs: Vec<Declaration>,
}

/// A flattened uniform as a driver would report it
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FlatUniform {
    pub name: String,
    pub ty: GlslType,
    pub size: i32,
}

const QUALIFIERS: &[&str] = &[
    "const", "flat", "smooth", "noperspective", "centroid", "highp", "mediump", "lowp",
    "invariant", "precise",
];

fn strip_comments_and_directives(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    let mut in_block = false;
    let mut in_line = false;
    while let Some(c) = chars.next() {
        if in_block {
            if c == '*' && chars.peek() == Some(&'/') {
                chars.next();
                in_block = false;
                out.push(' ');
            }
            continue;
        }
        if in_line {
            if c == '\n' {
                in_line = false;
                out.push('\n');
            }
            continue;
        }
        if c == '/' && chars.peek() == Some(&'/') {
            in_line = true;
            continue;
        }
        if c == '/' && chars.peek() == Some(&'*') {
            chars.next();
            in_block = true;
            continue;
        }
        out.push(c);
    }
    out.lines()
        .filter(|line| !line.trim_start().starts_with('#'))
        .collect::<Vec<_>>()
        .join("\n")
}

fn tokenize(source: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    for c in source.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            current.push(c);
            continue;
        }
        if !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
        if !c.is_whitespace() {
            tokens.push(c.to_string());
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Error directive text, if the source carries one
pub(crate) fn error_directive(source: &str) -> Option<String> {
    source
        .lines()
        .map(str::trim_start)
        .find_map(|line| line.strip_prefix("#error"))
        .map(|rest| rest.trim().to_string())
}

/// Whether the source defines an entry point
pub(crate) fn has_main(source: &str) -> bool {
    let tokens = tokenize(&strip_comments_and_directives(source));
    tokens.windows(2).any(|w| w[0] == "main" && w[1] == "(")
}

/// Scan one stage
pub(crate) fn reflect(source: &str, stage: ShaderStage) -> Reflection {
    let tokens = tokenize(&strip_comments_and_directives(source));
    let mut reflection = Reflection::default();
    let mut i = 0;

    while i < tokens.len() {
        if tokens[i] == "struct" && i + 2 < tokens.len() && tokens[i + 2] == "{" {
            let name = tokens[i + 1].clone();
            let (fields, next) = parse_struct_body(&tokens, i + 3);
            reflection.structs.insert(name, fields);
            i = skip_past(&tokens, next, ";");
            continue;
        }

        let start = i;
        while i < tokens.len() && tokens[i] != ";" && tokens[i] != "{" {
            i += 1;
        }
        if i < tokens.len() && tokens[i] == "{" {
            let head = &tokens[start..i];
            let is_block = !head.iter().any(|t| t == "(")
                && head.iter().any(|t| t == "uniform" || t == "in" || t == "out");
            i = skip_braces(&tokens, i);
            if is_block {
                i = skip_past(&tokens, i, ";");
            }
            continue;
        }

        let statement = &tokens[start..i];
        i += 1;
        if let Some((storage, decls)) = parse_statement(statement) {
            match storage {
                Storage::Uniform => reflection.uniforms.extend(decls),
                Storage::Input if stage == ShaderStage::Vertex => reflection.inputs.extend(decls),
                Storage::Input => {}
            }
        }
    }

    reflection
}

enum Storage {
    Uniform,
    Input,
}

fn parse_statement(tokens: &[String]) -> Option<(Storage, Vec<Declaration>)> {
    let mut location = None;
    let mut storage = None;
    let mut rest: Vec<&str> = Vec::new();
    let mut i = 0;

    while i < tokens.len() {
        match tokens[i].as_str() {
            "layout" => {
                let close = tokens[i..].iter().position(|t| t == ")").map_or(tokens.len(), |p| i + p);
                let inner = &tokens[i..close];
                if let Some(pos) = inner.iter().position(|t| t == "location") {
                    location = inner.get(pos + 2).and_then(|v| v.parse().ok());
                }
                i = close + 1;
                continue;
            }
            "uniform" => storage = Some(Storage::Uniform),
            "in" | "attribute" => storage = Some(Storage::Input),
            "out" | "varying" | "precision" => return None,
            t if QUALIFIERS.contains(&t) => {}
            t => rest.push(t),
        }
        i += 1;
    }

    let storage = storage?;
    let (ty, declarators) = rest.split_first()?;
    let mut decls = Vec::new();
    let mut j = 0;
    while j < declarators.len() {
        let name = declarators[j];
        j += 1;
        let mut array_len = None;
        if declarators.get(j) == Some(&"[") {
            array_len = declarators.get(j + 1).and_then(|n| n.parse().ok());
            j += 3;
        }
        decls.push(Declaration {
            ty: (*ty).to_string(),
            name: name.to_string(),
            array_len,
            location: location.map(|l: u32| l + decls.len() as u32),
        });
        if declarators.get(j) == Some(&",") {
            j += 1;
        }
    }
    Some((storage, decls))
}

fn parse_struct_body(tokens: &[String], mut i: usize) -> (Vec<Declaration>, usize) {
    let mut fields = Vec::new();
    while i < tokens.len() && tokens[i] != "}" {
        let start = i;
        while i < tokens.len() && tokens[i] != ";" && tokens[i] != "}" {
            i += 1;
        }
        let parts: Vec<&str> = tokens[start..i]
            .iter()
            .map(String::as_str)
            .filter(|t| !QUALIFIERS.contains(t))
            .collect();
        if let Some((ty, declarators)) = parts.split_first() {
            let mut j = 0;
            while j < declarators.len() {
                let name = declarators[j];
                j += 1;
                let mut array_len = None;
                if declarators.get(j) == Some(&"[") {
                    array_len = declarators.get(j + 1).and_then(|n| n.parse().ok());
                    j += 3;
                }
                fields.push(Declaration {
                    ty: (*ty).to_string(),
                    name: name.to_string(),
                    array_len,
                    location: None,
                });
                if declarators.get(j) == Some(&",") {
                    j += 1;
                }
            }
        }
        if i < tokens.len() && tokens[i] == ";" {
            i += 1;
        }
    }
    (fields, i + 1)
}

fn skip_braces(tokens: &[String], mut i: usize) -> usize {
    let mut depth = 0usize;
    while i < tokens.len() {
        match tokens[i].as_str() {
            "{" => depth += 1,
            "}" => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return i + 1;
                }
            }
            _ => {}
        }
        i += 1;
    }
    i
}

fn skip_past(tokens: &[String], mut i: usize, terminator: &str) -> usize {
    while i < tokens.len() && tokens[i] != terminator {
        i += 1;
    }
    i + 1
}

/// Expand struct and array uniforms into the leaf names a driver reports
pub(crate) fn flatten_uniforms(
    uniforms: &[Declaration],
    structs: &HashMap<String, Vec<Declaration>>,
) -> Vec<FlatUniform> {
    let mut out = Vec::new();
    for decl in uniforms {
        flatten_into(&decl.name, decl, structs, &mut out);
    }
    out
}

fn flatten_into(
    prefix: &str,
    decl: &Declaration,
    structs: &HashMap<String, Vec<Declaration>>,
    out: &mut Vec<FlatUniform>,
) {
    if let Some(fields) = structs.get(&decl.ty) {
        let elements: Vec<String> = match decl.array_len {
            Some(n) => (0..n).map(|k| format!("{prefix}[{k}]")).collect(),
            None => vec![prefix.to_string()],
        };
        for element in elements {
            for field in fields {
                flatten_into(&format!("{element}.{}", field.name), field, structs, out);
            }
        }
        return;
    }

    let Some(ty) = GlslType::from_glsl_name(&decl.ty) else {
        return;
    };
    match decl.array_len {
        Some(n) => out.push(FlatUniform {
            name: format!("{prefix}[0]"),
            ty,
            size: n as i32,
        }),
        None => out.push(FlatUniform {
            name: prefix.to_string(),
            ty,
            size: 1,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERTEX: &str = r"
#version 460 core
layout (location = 0) in vec3 aPos;
layout (location = 2) in vec2 aTexCoord;
in vec3 aNormal; // trailing comment
out vec2 TexCoord;
uniform mat4 model;
uniform mat4 view, projection;
/* uniform float hidden; */
void main() {
    vec4 p = projection * view * model * vec4(aPos, 1.0);
    if (p.x > 0.0) { TexCoord = aTexCoord; }
    gl_Position = p;
}
";

    const FRAGMENT: &str = r"
#version 460 core
struct Material {
    sampler2D diffuse;
    sampler2D specular;
    float shininess;
};
struct PointLight { vec3 position; float constant; };
in vec2 TexCoord;
out vec4 FragColor;
uniform Material material;
uniform PointLight point_lights[2];
uniform float weights[3];
void main() { FragColor = texture(material.diffuse, TexCoord); }
";

    #[test]
    fn test_vertex_inputs_and_uniforms() {
        let r = reflect(VERTEX, ShaderStage::Vertex);
        let inputs: Vec<_> = r.inputs.iter().map(|d| (d.name.as_str(), d.location)).collect();
        assert_eq!(inputs, vec![("aPos", Some(0)), ("aTexCoord", Some(2)), ("aNormal", None)]);
        let uniforms: Vec<_> = r.uniforms.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(uniforms, vec!["model", "view", "projection"]);
    }

    #[test]
    fn test_fragment_inputs_are_varyings() {
        let r = reflect(FRAGMENT, ShaderStage::Fragment);
        assert!(r.inputs.is_empty());
        assert_eq!(r.structs["Material"].len(), 3);
    }

    #[test]
    fn test_struct_and_array_flattening() {
        let r = reflect(FRAGMENT, ShaderStage::Fragment);
        let flat = flatten_uniforms(&r.uniforms, &r.structs);
        let names: Vec<_> = flat.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "material.diffuse",
                "material.specular",
                "material.shininess",
                "point_lights[0].position",
                "point_lights[0].constant",
                "point_lights[1].position",
                "point_lights[1].constant",
                "weights[0]",
            ]
        );
        assert_eq!(flat[0].ty, GlslType::Sampler2D);
        assert_eq!(flat.last().map(|u| u.size), Some(3));
    }

    #[test]
    fn test_main_and_error_directive_detection() {
        assert!(has_main(VERTEX));
        assert!(!has_main("uniform float x;"));
        assert_eq!(error_directive("#version 330\n#error broken stage\n"), Some("broken stage".into()));
        assert_eq!(error_directive(VERTEX), None);
    }
}
