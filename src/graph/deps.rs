//! Per-spec dependency rules.

use crate::Result;
use crate::graph::Rule;
use crate::graph::provides::{ProvidesIndex, primary_binary};
use crate::spec::Spec;

use url::Url;

/// URL schemes the fetch step can download. Sources with any other scheme
/// (or none) are expected to exist already and get no rule.
const FETCHABLE_SCHEMES: &[&str] = &["http", "https", "file", "ftp"];

/// Rules for one spec, in emission order:
/// 1) SRPM <- spec file and every source
/// 2) fetchable source <- spec file
/// 3) primary RPM <- SRPM
/// 4) primary RPM <- primary RPM of each spec providing a build requirement
pub fn spec_rules<S: Spec>(spec: &S, provides: &ProvidesIndex) -> Result<Vec<Rule>> {
    let spec_path = spec.spec_path().display().to_string();
    let srpm = spec.source_package_path().to_string();
    let rpm = primary_binary(spec)?.to_string();

    let mut rules = Vec::new();

    let mut srpm_inputs = vec![spec_path.clone()];
    srpm_inputs.extend(spec.source_paths().iter().cloned());
    rules.push(Rule::new(srpm.clone(), srpm_inputs));

    for (url, path) in spec.source_urls().iter().zip(spec.source_paths()) {
        if is_fetchable(url) {
            rules.push(Rule::new(path.clone(), vec![spec_path.clone()]));
        } else {
            tracing::debug!("{}: no fetch rule for {:?}", spec.name(), url);
        }
    }

    rules.push(Rule::new(rpm.clone(), vec![srpm]));

    for symbol in spec.build_requires() {
        match provides.get(symbol) {
            Some(provider) => rules.push(Rule::new(rpm.clone(), vec![provider.to_string()])),
            // Satisfied from outside the graph, e.g. the distribution repos.
            None => tracing::debug!("{}: build requirement {} is external", spec.name(), symbol),
        }
    }

    Ok(rules)
}

/// True when `url` has one of the fetchable schemes.
pub fn is_fetchable(url: &str) -> bool {
    url_scheme(url).is_some_and(|scheme| FETCHABLE_SCHEMES.contains(&scheme.as_str()))
}

/// The lowercased scheme of `url`, if it has one.
///
/// Only the scheme decides fetchability, so a source whose host or port does
/// not parse (e.g. an unexpanded macro) still reports its scheme.
fn url_scheme(url: &str) -> Option<String> {
    if let Ok(parsed) = Url::parse(url) {
        return Some(parsed.scheme().to_string());
    }
    let (scheme, _) = url.split_once(':')?;
    let mut chars = scheme.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then(|| scheme.to_ascii_lowercase())
}
