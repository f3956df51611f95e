//! `--define` parsing and the deprecated options that inject macros.

use crate::Result;
use crate::diagnostics::DependError;

/// One caller-supplied macro definition, passed through to spec loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Define {
    pub name: String,
    pub value: String,
}

impl Define {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Parse every `--define 'NAME VALUE'` argument.
///
/// Each argument splits on its first space into exactly two parts. All
/// malformed arguments are reported together; one bad define fails the run.
pub fn parse_defines(raw: &[String]) -> Result<Vec<Define>> {
    let mut defines = Vec::with_capacity(raw.len());
    let mut malformed = Vec::new();

    for arg in raw {
        match arg.split_once(' ') {
            Some((name, value)) => defines.push(Define::new(name, value)),
            None => malformed.push(arg.clone()),
        }
    }

    if !malformed.is_empty() {
        return Err(DependError::MalformedDefine(malformed).into());
    }
    Ok(defines)
}

/// Put the macros implied by deprecated options ahead of the caller's own,
/// returning the warning comments to print for them.
pub fn with_deprecated(
    mut defines: Vec<Define>,
    topdir: Option<&str>,
    dist: Option<&str>,
) -> (Vec<Define>, Vec<String>) {
    let mut warnings = Vec::new();
    let mut front = Vec::new();

    if let Some(topdir) = topdir {
        tracing::warn!("--topdir is deprecated, use --define '_topdir {}'", topdir);
        warnings.push("# warning: --topdir is deprecated".to_string());
        front.push(Define::new("_topdir", topdir));
    }
    if let Some(dist) = dist {
        tracing::warn!("--dist is deprecated, use --define 'dist {}'", dist);
        warnings.push("# warning: --dist is deprecated".to_string());
        front.push(Define::new("dist", dist));
    }

    front.append(&mut defines);
    (front, warnings)
}
