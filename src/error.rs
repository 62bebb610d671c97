use std::io;

/// Errors raised while reading geometry text. Any of these aborts the parse.
#[derive(thiserror::Error, Debug)]
pub enum ParseError {
    #[error("Failed to read source: {0}")]
    Io(#[from] io::Error),
    #[error("Line {line}: invalid number {token:?}")]
    InvalidNumber { line: usize, token: String },
    #[error("Line {line}: invalid index {token:?}")]
    InvalidIndex { line: usize, token: String },
    #[error("Line {line}: {directive} is missing components")]
    MissingComponent { line: usize, directive: &'static str },
    #[error("Line {line}: face has no vertices")]
    EmptyFace { line: usize },
    #[error("Line {line}: index {index} is out of range for {count} entries")]
    IndexOutOfRange {
        line: usize,
        index: usize,
        count: usize,
    },
}

/// A procedural generation parameter outside its valid range.
#[derive(thiserror::Error, Debug, PartialEq)]
#[error("Invalid argument {name} = {value}: must be {requirement}")]
pub struct InvalidArgument {
    pub name: &'static str,
    pub value: String,
    pub requirement: &'static str,
}

/// GPU resource creation failures.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ResourceError {
    #[error("Compiling {stage} shader failed: {log}")]
    ShaderCompile { stage: &'static str, log: String },
    #[error("Linking shader program failed: {0}")]
    ProgramLink(String),
    #[error("Framebuffer is incomplete (status {0:#x})")]
    IncompleteFramebuffer(u32),
    #[error("Texture {name:?} could not be created: {reason}")]
    Texture { name: String, reason: String },
}

/// A name that could not be resolved. Never fatal: the caller falls back to
/// a default and logs the reference.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Missing {kind} reference {name:?}")]
pub struct MissingReference {
    pub kind: &'static str,
    pub name: String,
}

#[derive(thiserror::Error, Debug)]
pub enum RendererError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    InvalidArgument(#[from] InvalidArgument),
    #[error(transparent)]
    Resource(#[from] ResourceError),
    #[error("Unknown scene {0:?}")]
    UnknownScene(String),
    #[error("Renderer has been disposed")]
    Disposed,
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] io::Error),
    #[error("Failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),
}
