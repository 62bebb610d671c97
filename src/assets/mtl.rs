//! Parser for `.mtl` material libraries.
//!
//! The parser is lenient: a line it does not understand is recorded as a
//! [`LineDiagnostic`], logged, and skipped. Only failing to read the source
//! aborts the parse.

use std::collections::HashMap;
use std::io::BufRead;

use crate::error::ParseError;

/// Surface properties of one named material.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    pub diffuse: [f32; 3],
    pub specular: [f32; 3],
    pub ambient: [f32; 3],
    /// 1.0 is opaque.
    pub alpha: f32,
    pub shininess: f32,
    pub diffuse_texture: Option<String>,
    pub specular_texture: Option<String>,
    pub normal_texture: Option<String>,
}

impl Material {
    pub fn new(name: impl Into<String>) -> Material {
        Material {
            name: name.into(),
            diffuse: [0.8, 0.8, 0.8],
            specular: [1.0, 1.0, 1.0],
            ambient: [0.2, 0.2, 0.2],
            alpha: 1.0,
            shininess: 32.0,
            diffuse_texture: None,
            specular_texture: None,
            normal_texture: None,
        }
    }
}

impl Default for Material {
    fn default() -> Material {
        Material::new("default")
    }
}

/// A line the parser skipped, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineDiagnostic {
    pub line: usize,
    pub message: String,
}

/// Materials keyed by name.
#[derive(Debug, Clone, Default)]
pub struct MaterialTable {
    materials: HashMap<String, Material>,
    diagnostics: Vec<LineDiagnostic>,
}

impl MaterialTable {
    /// Parses a material library. Fails only if `reader` fails.
    pub fn parse<R: BufRead>(reader: R) -> Result<MaterialTable, ParseError> {
        let mut table = MaterialTable::default();
        // Name of the record directives currently apply to.
        let mut current: Option<String> = None;

        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            let line_number = i + 1;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let tokens: Vec<&str> = line.split_whitespace().collect();
            let (directive, args) = (tokens[0], &tokens[1..]);

            if directive == "newmtl" {
                match args.first() {
                    Some(&name) => {
                        log::debug!("Material: {name}");
                        table.materials.insert(name.to_string(), Material::new(name));
                        current = Some(name.to_string());
                    }
                    None => table.skip(line_number, "newmtl without a name"),
                }
                continue;
            }

            let Some(material) = current
                .as_ref()
                .and_then(|name| table.materials.get_mut(name))
            else {
                if is_known_directive(directive) {
                    table.skip(line_number, format!("{directive} before any newmtl"));
                }
                continue;
            };

            let outcome = match directive {
                "Ka" => parse_color(args).map(|c| material.ambient = c),
                "Kd" => parse_color(args).map(|c| material.diffuse = c),
                "Ks" => parse_color(args).map(|c| material.specular = c),
                "Ns" => parse_scalar(args).map(|v| material.shininess = v),
                "d" => parse_scalar(args).map(|v| material.alpha = v),
                "Tr" => parse_scalar(args).map(|v| material.alpha = 1.0 - v),
                "map_Kd" => last_token(args).map(|p| material.diffuse_texture = Some(p)),
                "map_Ks" => last_token(args).map(|p| material.specular_texture = Some(p)),
                "map_bump" | "bump" => {
                    last_token(args).map(|p| material.normal_texture = Some(p))
                }
                // illum, Ni, Ke and friends carry nothing this renderer uses.
                _ => Ok(()),
            };
            if let Err(reason) = outcome {
                table.skip(line_number, format!("{directive}: {reason}"));
            }
        }

        log::debug!(
            "Loaded {} materials ({} lines skipped)",
            table.materials.len(),
            table.diagnostics.len()
        );
        Ok(table)
    }

    /// Parses a material library held in memory.
    pub fn parse_str(text: &str) -> MaterialTable {
        // Reading from a byte slice cannot fail.
        Self::parse(text.as_bytes()).unwrap_or_default()
    }

    pub fn get(&self, name: &str) -> Option<&Material> {
        self.materials.get(name)
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Material> {
        self.materials.values()
    }

    pub fn diagnostics(&self) -> &[LineDiagnostic] {
        &self.diagnostics
    }

    fn skip(&mut self, line: usize, message: impl Into<String>) {
        let message = message.into();
        log::warn!("Skipping material line {line}: {message}");
        self.diagnostics.push(LineDiagnostic { line, message });
    }
}

fn is_known_directive(directive: &str) -> bool {
    matches!(
        directive,
        "Ka" | "Kd" | "Ks" | "Ns" | "d" | "Tr" | "map_Kd" | "map_Ks" | "map_bump" | "bump"
    )
}

fn parse_float(token: &str) -> Result<f32, String> {
    token
        .parse::<f32>()
        .map_err(|_| format!("invalid number {token:?}"))
}

fn parse_color(args: &[&str]) -> Result<[f32; 3], String> {
    match args {
        [r, g, b, ..] => Ok([parse_float(r)?, parse_float(g)?, parse_float(b)?]),
        _ => Err(format!("expected 3 components, found {}", args.len())),
    }
}

fn parse_scalar(args: &[&str]) -> Result<f32, String> {
    args.first()
        .ok_or_else(|| "missing value".to_string())
        .and_then(|token| parse_float(token))
}

/// Texture statements may carry options (`-s 1 1 1`) before the path, so the
/// path is taken to be the final token.
fn last_token(args: &[&str]) -> Result<String, String> {
    args.last()
        .map(|token| token.to_string())
        .ok_or_else(|| "missing texture path".to_string())
}

/// Strips any directories from `path`, accepting both separators:
/// `textures/wood.png` and `textures\wood.png` both yield `wood.png`.
pub fn file_name(path: &str) -> &str {
    match path.rfind(&['/', '\\'][..]) {
        Some(index) => &path[index + 1..],
        None => path,
    }
}
