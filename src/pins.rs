//! Pin overlays: alternate spec files that replace requested ones by file name.
//!
//! A pin replaces the whole spec. Its sources, packages, provides and build
//! requirements are used; nothing of the pinned-over spec survives except the
//! package name shown in the `# Pinning` notice.

use crate::Result;
use crate::spec::Spec;

use anyhow::{Context, bail};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const SPEC_SUFFIX: &str = ".spec";

/// Overlay specs keyed by file name (never by package name).
#[derive(Debug, Clone)]
pub struct PinOverlay<S> {
    pins: BTreeMap<String, S>,
}

impl<S> Default for PinOverlay<S> {
    fn default() -> Self {
        Self {
            pins: BTreeMap::new(),
        }
    }
}

impl<S: Spec> PinOverlay<S> {
    /// Load every `*.spec` directly inside `dir`. No directory means no pins.
    pub fn load<L>(dir: Option<&Path>, load: &L) -> Result<Self>
    where
        L: Fn(&Path) -> Result<S>,
    {
        let Some(dir) = dir else {
            return Ok(Self::default());
        };
        if !dir.is_dir() {
            bail!("pins directory {} does not exist", dir.display());
        }

        let mut pins = BTreeMap::new();
        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry =
                entry.with_context(|| format!("list pins directory {}", dir.display()))?;
            let file_name = entry.file_name().to_string_lossy().into_owned();
            if !entry.path().is_file()
                || file_name.starts_with('.')
                || !file_name.ends_with(SPEC_SUFFIX)
            {
                continue;
            }
            let spec = load(entry.path())?;
            tracing::debug!("loaded pin {}", entry.path().display());
            pins.insert(file_name, spec);
        }

        Ok(Self { pins })
    }

    pub fn get(&self, file_name: &str) -> Option<&S> {
        self.pins.get(file_name)
    }

    pub fn len(&self) -> usize {
        self.pins.len()
    }
}

#[cfg(test)]
impl<S> PinOverlay<S> {
    pub fn from_pins(pins: impl IntoIterator<Item = (String, S)>) -> Self {
        Self {
            pins: pins.into_iter().collect(),
        }
    }
}

/// The specs the graph is built from, keyed by requested file name.
///
/// Iteration follows the order in which each file name was first requested.
/// Requesting the same file name again replaces the earlier spec in place.
#[derive(Debug, Clone)]
pub struct EffectiveSpecs<S> {
    entries: Vec<(String, S)>,
}

impl<S> Default for EffectiveSpecs<S> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<S> EffectiveSpecs<S> {
    pub fn insert(&mut self, file_name: String, spec: S) {
        match self.entries.iter_mut().find(|(k, _)| *k == file_name) {
            Some(slot) => slot.1 = spec,
            None => self.entries.push((file_name, spec)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &S> {
        self.entries.iter().map(|(_, spec)| spec)
    }

    pub fn file_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl<S> FromIterator<(String, S)> for EffectiveSpecs<S> {
    fn from_iter<I: IntoIterator<Item = (String, S)>>(iter: I) -> Self {
        let mut specs = Self::default();
        for (file_name, spec) in iter {
            specs.insert(file_name, spec);
        }
        specs
    }
}

/// Output of pin resolution: the effective specs and one comment per pin used.
#[derive(Debug, Clone)]
pub struct Resolution<S> {
    pub specs: EffectiveSpecs<S>,
    pub notices: Vec<String>,
}

/// Load each requested spec and apply the overlay.
///
/// Every requested file is loaded even when pinned, so a broken or misnamed
/// base spec still fails the run. The first failure aborts.
pub fn resolve<S, L>(requested: &[PathBuf], overlay: &PinOverlay<S>, load: &L) -> Result<Resolution<S>>
where
    S: Spec + Clone,
    L: Fn(&Path) -> Result<S>,
{
    let mut specs = EffectiveSpecs::default();
    let mut notices = Vec::new();

    for path in requested {
        let spec = load(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .with_context(|| format!("spec path {} has no file name", path.display()))?;

        match overlay.get(&file_name) {
            Some(pin) => {
                tracing::info!(
                    "pinning {} to {}",
                    spec.name(),
                    pin.spec_path().display()
                );
                notices.push(format!(
                    "# Pinning '{}' to '{}'",
                    spec.name(),
                    pin.spec_path().display()
                ));
                specs.insert(file_name, pin.clone());
            }
            None => specs.insert(file_name, spec),
        }
    }

    Ok(Resolution { specs, notices })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::testing::FakeSpec;

    fn catalogue(specs: Vec<FakeSpec>) -> BTreeMap<PathBuf, FakeSpec> {
        specs
            .into_iter()
            .map(|s| (s.spec_path.clone(), s))
            .collect()
    }

    fn loader(
        specs: &BTreeMap<PathBuf, FakeSpec>,
    ) -> impl Fn(&Path) -> Result<FakeSpec> + '_ {
        move |path: &Path| match specs.get(path) {
            Some(spec) => Ok(spec.clone()),
            None => bail!("no such spec {}", path.display()),
        }
    }

    #[test]
    fn pin_replaces_spec_with_same_file_name() {
        let base = FakeSpec::named("foo").at("SPECS/foo.spec").provides(&["foo"]);
        let pin = FakeSpec::named("foo")
            .at("PINS/foo.spec")
            .binaries(&["pinned-foo.rpm"])
            .provides(&["foo-pinned"]);
        let files = catalogue(vec![base]);
        let overlay = PinOverlay::from_pins([("foo.spec".to_string(), pin)]);

        let out = resolve(&[PathBuf::from("SPECS/foo.spec")], &overlay, &loader(&files)).unwrap();

        let specs: Vec<&FakeSpec> = out.specs.iter().collect();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].spec_path, PathBuf::from("PINS/foo.spec"));
        assert_eq!(specs[0].binary_package_paths, vec!["pinned-foo.rpm"]);
        assert!(specs[0].provides.contains("foo-pinned"));
        assert!(!specs[0].provides.contains("foo"));
        assert_eq!(out.notices, vec!["# Pinning 'foo' to 'PINS/foo.spec'"]);
    }

    #[test]
    fn pinned_spec_that_fails_to_load_still_fails_the_run() {
        let pin = FakeSpec::named("foo").at("PINS/foo.spec");
        let overlay = PinOverlay::from_pins([("foo.spec".to_string(), pin)]);
        let load = |path: &Path| -> Result<FakeSpec> {
            bail!(
                "spec file name '{}' does not match package name 'bar'",
                path.file_name().unwrap().to_string_lossy()
            )
        };

        let err = resolve(&[PathBuf::from("SPECS/foo.spec")], &overlay, &load).unwrap_err();

        assert!(err.to_string().contains("does not match package name 'bar'"));
    }

    #[test]
    fn pin_lookup_ignores_package_identity() {
        // Same package name, different file name: not pinned.
        let base = FakeSpec::named("foo").at("SPECS/foo-alt.spec");
        let pin = FakeSpec::named("foo").at("PINS/foo.spec");
        let files = catalogue(vec![base]);
        let overlay = PinOverlay::from_pins([("foo.spec".to_string(), pin)]);

        let out = resolve(
            &[PathBuf::from("SPECS/foo-alt.spec")],
            &overlay,
            &loader(&files),
        )
        .unwrap();

        let specs: Vec<&FakeSpec> = out.specs.iter().collect();
        assert_eq!(specs[0].spec_path, PathBuf::from("SPECS/foo-alt.spec"));
        assert!(out.notices.is_empty());
    }

    #[test]
    fn duplicate_file_names_keep_first_position_and_last_spec() {
        let files = catalogue(vec![
            FakeSpec::named("a").at("one/a.spec").binaries(&["a-one.rpm"]),
            FakeSpec::named("b").at("one/b.spec"),
            FakeSpec::named("a").at("two/a.spec").binaries(&["a-two.rpm"]),
        ]);
        let requested = [
            PathBuf::from("one/a.spec"),
            PathBuf::from("one/b.spec"),
            PathBuf::from("two/a.spec"),
        ];

        let out = resolve(&requested, &PinOverlay::default(), &loader(&files)).unwrap();

        let names: Vec<&str> = out.specs.file_names().collect();
        assert_eq!(names, vec!["a.spec", "b.spec"]);
        let first = out.specs.iter().next().unwrap();
        assert_eq!(first.binary_package_paths, vec!["a-two.rpm"]);
    }

    #[test]
    fn first_load_failure_aborts() {
        let files = catalogue(vec![FakeSpec::named("a").at("a.spec")]);
        let requested = [PathBuf::from("missing.spec"), PathBuf::from("a.spec")];

        let err = resolve(&requested, &PinOverlay::default(), &loader(&files)).unwrap_err();
        assert!(err.to_string().contains("missing.spec"));
    }

    #[test]
    fn overlay_loads_only_spec_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.spec"), "").unwrap();
        std::fs::write(dir.path().join("a.spec"), "").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "").unwrap();
        std::fs::write(dir.path().join(".hidden.spec"), "").unwrap();
        std::fs::create_dir(dir.path().join("nested.spec")).unwrap();

        let load = |path: &Path| -> Result<FakeSpec> {
            let stem = path.file_stem().unwrap().to_string_lossy().into_owned();
            Ok(FakeSpec::named(&stem).at(&path.display().to_string()))
        };
        let overlay = PinOverlay::load(Some(dir.path()), &load).unwrap();

        assert_eq!(overlay.len(), 2);
        assert_eq!(overlay.get("a.spec").unwrap().name, "a");
        assert_eq!(overlay.get("b.spec").unwrap().name, "b");
        assert!(overlay.get("notes.txt").is_none());
    }

    #[test]
    fn missing_overlay_directory_is_an_error() {
        let load = |_: &Path| -> Result<FakeSpec> { Ok(FakeSpec::named("x")) };
        let err = PinOverlay::load(Some(Path::new("/nonexistent/pins")), &load).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/pins"));
    }

    #[test]
    fn no_overlay_directory_means_no_pins() {
        let load = |_: &Path| -> Result<FakeSpec> { Ok(FakeSpec::named("x")) };
        let overlay = PinOverlay::load(None, &load).unwrap();
        assert_eq!(overlay.len(), 0);
    }
}
