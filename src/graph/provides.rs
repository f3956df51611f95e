use crate::Result;
use crate::diagnostics::DependError;
use crate::pins::EffectiveSpecs;
use crate::spec::Spec;

use std::collections::BTreeMap;

/// Provided symbol -> primary binary package of the spec that provides it.
///
/// When several specs provide the same symbol, the one that comes last in
/// `EffectiveSpecs` order (caller order) wins.
#[derive(Debug, Clone, Default)]
pub struct ProvidesIndex {
    providers: BTreeMap<String, String>,
}

impl ProvidesIndex {
    pub fn build<S: Spec>(specs: &EffectiveSpecs<S>) -> Result<Self> {
        let mut providers = BTreeMap::new();
        for spec in specs.iter() {
            let rpm = primary_binary(spec)?;
            for symbol in spec.provides() {
                if let Some(prev) = providers.insert(symbol.clone(), rpm.to_string()) {
                    if prev != rpm {
                        tracing::debug!("{}: {} overrides provider {}", symbol, rpm, prev);
                    }
                }
            }
        }
        Ok(Self { providers })
    }

    pub fn get(&self, symbol: &str) -> Option<&str> {
        self.providers.get(symbol).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }
}

pub(crate) fn primary_binary<S: Spec>(spec: &S) -> Result<&str> {
    spec.primary_binary_path()
        .ok_or_else(|| DependError::NoBinaryPackages(spec.spec_path().to_path_buf()).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::testing::FakeSpec;

    fn specs(list: Vec<FakeSpec>) -> EffectiveSpecs<FakeSpec> {
        list.into_iter()
            .map(|s| (format!("{}.spec", s.name), s))
            .collect()
    }

    #[test]
    fn maps_every_symbol_to_the_last_binary() {
        let index = ProvidesIndex::build(&specs(vec![
            FakeSpec::named("ocaml")
                .binaries(&["ocaml-4.rpm", "ocaml-devel-4.rpm"])
                .provides(&["ocaml", "ocaml-devel", "ocaml(runtime)"]),
        ]))
        .unwrap();

        assert_eq!(index.len(), 3);
        assert_eq!(index.get("ocaml"), Some("ocaml-devel-4.rpm"));
        assert_eq!(index.get("ocaml(runtime)"), Some("ocaml-devel-4.rpm"));
        assert_eq!(index.get("python"), None);
    }

    #[test]
    fn later_spec_wins_a_collision() {
        let a = FakeSpec::named("a").provides(&["shared"]);
        let b = FakeSpec::named("b").provides(&["shared"]);

        let ab = ProvidesIndex::build(&specs(vec![a.clone(), b.clone()])).unwrap();
        let ba = ProvidesIndex::build(&specs(vec![b, a])).unwrap();

        assert_eq!(ab.get("shared"), Some("b-1.rpm"));
        assert_eq!(ba.get("shared"), Some("a-1.rpm"));
    }

    #[test]
    fn empty_provides_contribute_nothing() {
        let index = ProvidesIndex::build(&specs(vec![FakeSpec::named("a")])).unwrap();
        assert_eq!(index.len(), 0);
    }

    #[test]
    fn spec_without_binaries_is_rejected() {
        let err = ProvidesIndex::build(&specs(vec![FakeSpec::named("a").binaries(&[])]))
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DependError>(),
            Some(DependError::NoBinaryPackages(_))
        ));
    }
}
