//! Reader for RPM `.spec` files.
//!
//! This is not an rpm macro engine. It reads the preamble of the main package
//! and of each `%package`, expands plain macro references, and derives the
//! artifact paths rpmbuild would produce:
//!
//!   SRPM     %{_srcrpmdir}/N-V-R.src.rpm
//!   RPM      %{_rpmdir}/ARCH/PKG-V-R.ARCH.rpm   (main package first)
//!   source   %{_sourcedir}/BASENAME
//!
//! `%if` blocks are not evaluated: both branches are read.

use crate::Result;
use crate::diagnostics::DependError;
use crate::spec::{Define, Spec};

use anyhow::{Context, bail};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

const MAX_EXPANSION_DEPTH: usize = 16;
const MAX_EXPANSION_LEN: usize = 64 * 1024;

const SECTIONS: &[&str] = &[
    "description",
    "prep",
    "generate_buildrequires",
    "conf",
    "build",
    "install",
    "check",
    "clean",
    "files",
    "changelog",
    "pre",
    "post",
    "preun",
    "postun",
    "pretrans",
    "posttrans",
    "verifyscript",
    "triggerprein",
    "triggerin",
    "triggerun",
    "triggerpostun",
    "filetriggerin",
    "filetriggerun",
    "transfiletriggerin",
    "transfiletriggerun",
];

const CONDITIONALS: &[&str] = &[
    "if", "ifarch", "ifnarch", "ifos", "ifnos", "elif", "elifarch", "elifos", "else", "endif",
];

/// Settings shared by every spec loaded in one run.
#[derive(Debug, Clone)]
pub struct SpecOptions {
    pub check_package_name: bool,
    pub defines: Vec<Define>,
    pub repos_path: String,
}

/// A spec file read from disk.
#[derive(Debug, Clone)]
pub struct RpmSpec {
    name: String,
    spec_path: PathBuf,
    source_paths: Vec<String>,
    source_urls: Vec<String>,
    source_package_path: String,
    binary_package_paths: Vec<String>,
    provides: BTreeSet<String>,
    build_requires: BTreeSet<String>,
}

impl RpmSpec {
    pub fn load(path: &Path, opts: &SpecOptions) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("read spec file {}", path.display()))?;
        Self::parse(path, &text, opts)
    }

    /// Build a spec from file contents; `path` is only used for naming.
    pub fn parse(path: &Path, text: &str, opts: &SpecOptions) -> Result<Self> {
        let mut reader = Reader::new(opts)?;
        let preamble = reader
            .read(text)
            .with_context(|| format!("parse spec file {}", path.display()))?;

        let name = required(preamble.name, "Name", path)?;
        let version = required(preamble.version, "Version", path)?;
        let release = required(preamble.release, "Release", path)?;

        if opts.check_package_name {
            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
            if stem != name {
                return Err(DependError::NameMismatch {
                    file: file_name(path),
                    name,
                }
                .into());
            }
        }

        let default_arch = reader.expand("%{_arch}")?;
        let main_arch = preamble.arch.unwrap_or(default_arch);
        let srcrpmdir = reader.expand("%{_srcrpmdir}")?;
        let rpmdir = reader.expand("%{_rpmdir}")?;
        let sourcedir = reader.expand("%{_sourcedir}")?;

        let source_package_path = format!("{}/{}-{}-{}.src.rpm", srcrpmdir, name, version, release);

        let mut provides = preamble.provides;
        let mut binary_package_paths = Vec::new();
        let packages = std::iter::once((name.clone(), None)).chain(
            preamble
                .subpackages
                .into_iter()
                .map(|sub| (sub.name, sub.arch)),
        );
        for (pkg, arch) in packages {
            let arch = arch.unwrap_or_else(|| main_arch.clone());
            binary_package_paths.push(format!(
                "{}/{}/{}-{}-{}.{}.rpm",
                rpmdir, arch, pkg, version, release, arch
            ));
            provides.insert(pkg);
        }

        let source_paths = preamble
            .sources
            .iter()
            .map(|url| format!("{}/{}", sourcedir, source_basename(url)))
            .collect();

        Ok(Self {
            name,
            spec_path: path.to_path_buf(),
            source_paths,
            source_urls: preamble.sources,
            source_package_path,
            binary_package_paths,
            provides,
            build_requires: preamble.build_requires,
        })
    }
}

impl Spec for RpmSpec {
    fn name(&self) -> &str {
        &self.name
    }

    fn spec_path(&self) -> &Path {
        &self.spec_path
    }

    fn source_paths(&self) -> &[String] {
        &self.source_paths
    }

    fn source_urls(&self) -> &[String] {
        &self.source_urls
    }

    fn source_package_path(&self) -> &str {
        &self.source_package_path
    }

    fn binary_package_paths(&self) -> &[String] {
        &self.binary_package_paths
    }

    fn provides(&self) -> &BTreeSet<String> {
        &self.provides
    }

    fn build_requires(&self) -> &BTreeSet<String> {
        &self.build_requires
    }
}

#[derive(Debug, Default)]
struct Preamble {
    name: Option<String>,
    version: Option<String>,
    release: Option<String>,
    arch: Option<String>,
    sources: Vec<String>,
    provides: BTreeSet<String>,
    build_requires: BTreeSet<String>,
    subpackages: Vec<Subpackage>,
}

#[derive(Debug)]
struct Subpackage {
    name: String,
    arch: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Main,
    Sub(usize),
    Body,
}

struct Reader {
    tag_re: Regex,
    macro_re: Regex,
    macros: BTreeMap<String, String>,
}

impl Reader {
    fn new(opts: &SpecOptions) -> Result<Self> {
        let tag_re = Regex::new(r"^([A-Za-z][A-Za-z0-9]*)(?:\([^)]*\))?\s*:\s*(.*?)\s*$")?;
        let macro_re =
            Regex::new(r"%%|%\{(\??)([A-Za-z_][A-Za-z0-9_]*)\}|%([A-Za-z_][A-Za-z0-9_]*)")?;

        let mut macros = BTreeMap::new();
        macros.insert("_topdir".to_string(), "_build".to_string());
        macros.insert("_arch".to_string(), std::env::consts::ARCH.to_string());
        macros.insert("_sourcedir".to_string(), "%{_topdir}/SOURCES".to_string());
        macros.insert("_srcrpmdir".to_string(), "%{_topdir}/SRPMS".to_string());
        macros.insert("_rpmdir".to_string(), "%{_topdir}/RPMS".to_string());
        macros.insert("_repos_path".to_string(), opts.repos_path.clone());
        macros.insert("nil".to_string(), String::new());
        for define in &opts.defines {
            macros.insert(define.name.clone(), define.value.clone());
        }

        Ok(Self {
            tag_re,
            macro_re,
            macros,
        })
    }

    fn expand(&self, s: &str) -> Result<String> {
        self.expand_at(s, 0)
    }

    fn expand_at(&self, s: &str, depth: usize) -> Result<String> {
        if depth > MAX_EXPANSION_DEPTH {
            bail!("macro recursion too deep");
        }

        let mut out = String::with_capacity(s.len());
        let mut last = 0;
        for caps in self.macro_re.captures_iter(s) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            out.push_str(&s[last..whole.start()]);
            last = whole.end();

            if whole.as_str() == "%%" {
                out.push('%');
                continue;
            }
            let (optional, key) = match (caps.get(2), caps.get(3)) {
                (Some(key), _) => (
                    caps.get(1).is_some_and(|m| !m.as_str().is_empty()),
                    key.as_str(),
                ),
                (None, Some(key)) => (false, key.as_str()),
                (None, None) => {
                    out.push_str(whole.as_str());
                    continue;
                }
            };
            match self.macros.get(key) {
                Some(body) => out.push_str(&self.expand_at(body, depth + 1)?),
                None if optional => {}
                // rpm leaves unknown macros in place.
                None => out.push_str(whole.as_str()),
            }

            if out.len() > MAX_EXPANSION_LEN {
                bail!("macro expansion exceeds {} bytes", MAX_EXPANSION_LEN);
            }
        }
        out.push_str(&s[last..]);
        Ok(out)
    }

    fn read(&mut self, text: &str) -> Result<Preamble> {
        let mut out = Preamble::default();
        let mut section = Section::Main;

        for (lineno, raw) in text.lines().enumerate() {
            let lno = lineno + 1;
            let line = raw.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some(rest) = directive(line, "%global") {
                let (key, body) = split_definition(rest, lno)?;
                let body = self.expand(body).with_context(|| format!("line {}", lno))?;
                self.macros.insert(key.to_string(), body);
                continue;
            }
            if let Some(rest) = directive(line, "%define") {
                let (key, body) = split_definition(rest, lno)?;
                self.macros.insert(key.to_string(), body.to_string());
                continue;
            }
            if let Some(rest) = directive(line, "%undefine") {
                self.macros.remove(rest);
                continue;
            }
            if CONDITIONALS.iter().any(|c| directive(line, &format!("%{}", c)).is_some()) {
                continue;
            }

            if let Some(rest) = directive(line, "%package") {
                let Some(main) = out.name.as_deref() else {
                    bail!("line {}: %package before Name tag", lno);
                };
                let name = match rest.strip_prefix("-n") {
                    Some(explicit) => self.expand(explicit.trim()),
                    None => self.expand(rest).map(|sub| format!("{}-{}", main, sub)),
                }
                .with_context(|| format!("line {}", lno))?;
                out.subpackages.push(Subpackage { name, arch: None });
                section = Section::Sub(out.subpackages.len() - 1);
                continue;
            }
            if SECTIONS.iter().any(|s| directive(line, &format!("%{}", s)).is_some()) {
                section = Section::Body;
                continue;
            }
            if section == Section::Body {
                continue;
            }

            let Some(caps) = self.tag_re.captures(line) else {
                continue;
            };
            let tag = caps[1].to_ascii_lowercase();
            let value = self
                .expand(&caps[2])
                .with_context(|| format!("line {}", lno))?;

            match tag.as_str() {
                "name" if section == Section::Main => {
                    self.macros.insert("name".to_string(), value.clone());
                    out.name = Some(value);
                }
                "version" if section == Section::Main => {
                    self.macros.insert("version".to_string(), value.clone());
                    out.version = Some(value);
                }
                "url" if section == Section::Main => {
                    self.macros.insert("url".to_string(), value);
                }
                "release" if section == Section::Main => {
                    self.macros.insert("release".to_string(), value.clone());
                    out.release = Some(value);
                }
                "buildarch" | "buildarchitectures" => match section {
                    Section::Sub(idx) => out.subpackages[idx].arch = Some(value),
                    _ => out.arch = Some(value),
                },
                "buildrequires" => out.build_requires.extend(dependency_names(&value)),
                "provides" => out.provides.extend(dependency_names(&value)),
                t if is_numbered(t, "source") || is_numbered(t, "patch") => {
                    out.sources.push(value);
                }
                _ => {}
            }
        }

        Ok(out)
    }
}

/// Return the rest of `line` when it starts with the directive `keyword`.
fn directive<'a>(line: &'a str, keyword: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(keyword)?;
    match rest.chars().next() {
        None => Some(rest),
        Some(c) if c.is_whitespace() => Some(rest.trim()),
        Some(_) => None,
    }
}

fn split_definition(rest: &str, lno: usize) -> Result<(&str, &str)> {
    match rest.split_once(char::is_whitespace) {
        Some((key, body)) => Ok((key, body.trim())),
        None => bail!("line {}: macro definition without a body: {:?}", lno, rest),
    }
}

/// `source`, `source0`, `source12` and friends.
fn is_numbered(tag: &str, prefix: &str) -> bool {
    tag.strip_prefix(prefix)
        .is_some_and(|n| n.chars().all(|c| c.is_ascii_digit()))
}

/// Package names from a dependency list, without version constraints.
fn dependency_names(value: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut tokens = value
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty());
    while let Some(tok) = tokens.next() {
        if matches!(tok, "<" | ">" | "=" | "<=" | ">=" | "==") {
            tokens.next();
            continue;
        }
        names.push(tok.to_string());
    }
    names
}

/// The file name rpmbuild would look for in the sources directory.
///
/// A fragment of the form `#/name.tar.gz` overrides the URL path.
fn source_basename(value: &str) -> String {
    if let Ok(url) = Url::parse(value) {
        if let Some(name) = url.fragment().and_then(|f| f.strip_prefix('/')) {
            return last_segment(name).to_string();
        }
        if let Some(seg) = url
            .path_segments()
            .and_then(|mut segs| segs.next_back())
            .filter(|s| !s.is_empty())
        {
            return seg.to_string();
        }
    }
    last_segment(value).to_string()
}

fn last_segment(s: &str) -> &str {
    s.rsplit('/').next().unwrap_or(s)
}

fn required(value: Option<String>, tag: &str, path: &Path) -> Result<String> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => bail!("spec file {} has no {} tag", path.display(), tag),
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
