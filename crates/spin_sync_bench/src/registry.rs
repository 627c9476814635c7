use crate::context::ScenarioContext;
use crate::scenario_config::ScenarioConfig;

#[derive(Debug, derive_more::Display)]
#[display(fmt = "{} (registered at {file}:{line}:{column})", "self.name()")]
pub struct ScenarioRegistryEntry {
    /// Builds the default configuration.  May be called more than once.
    pub config_fn: fn() -> ScenarioConfig,

    pub run_fn: fn(&mut ScenarioContext) -> anyhow::Result<()>,

    /// The name of the scenario before replacing `::`
    pub unsanitized_name: &'static str,

    /// The name with all `:` replaced and the module prefix removed.
    pub name: &'static once_cell::race::OnceBox<String>,
    pub file: &'static str,
    pub line: u32,
    pub column: u32,
}

inventory::collect!(ScenarioRegistryEntry);

const NAME_PREFIX: &str = "spin_sync_bench.scenarios.";

/// Return a list of scenarios in alphabetical order by name.
///
/// On the first call, the list of scenarios is gathered and cached.  Exits the process if any two scenarios have the
/// same name.
pub fn get_scenarios() -> impl Iterator<Item = &'static ScenarioRegistryEntry> {
    lazy_static::lazy_static! {
        static ref SCENARIO_CACHE: Vec<&'static ScenarioRegistryEntry> = build_scenario_cache();
    }

    SCENARIO_CACHE.iter().copied()
}

fn build_scenario_cache() -> Vec<&'static ScenarioRegistryEntry> {
    use itertools::Itertools;

    let mut ret = inventory::iter::<ScenarioRegistryEntry>
        .into_iter()
        .collect::<Vec<&'static ScenarioRegistryEntry>>();
    ret.sort_unstable_by_key(|x| (x.name(), x.file, x.line, x.column));

    let mut duplicates: Vec<&'static ScenarioRegistryEntry> = vec![];

    let groups = ret.iter().group_by(|x| x.name());
    for (_, items) in groups.into_iter() {
        let items_vec = items.copied().collect::<Vec<_>>();
        if items_vec.len() > 1 {
            duplicates.extend(items_vec);
        }
    }

    if !duplicates.is_empty() {
        eprintln!("Found duplicate scenario registrations. Cannot proceed.  The following scenarios are registered more than once:");
        for e in duplicates {
            eprintln!("  {e}");
        }

        std::process::exit(1);
    }

    ret
}

fn sanitize_name(unsanitized: &str) -> String {
    let dotted = unsanitized.replace("::", ".");
    match dotted.strip_prefix(NAME_PREFIX) {
        Some(s) => s.to_string(),
        None => dotted,
    }
}

impl ScenarioRegistryEntry {
    pub fn name(&self) -> &str {
        self.name
            .get_or_init(|| Box::new(sanitize_name(self.unsanitized_name)))
            .as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_drop_the_scenarios_prefix() {
        assert_eq!(
            sanitize_name("spin_sync_bench::scenarios::locks::mutual_exclusion"),
            "locks.mutual_exclusion"
        );
        assert_eq!(sanitize_name("elsewhere::thing"), "elsewhere.thing");
    }

    #[test]
    fn registry_is_sorted_and_populated() {
        let names = get_scenarios().map(|x| x.name()).collect::<Vec<_>>();
        assert!(names.contains(&"locks.mutual_exclusion"));
        assert!(names.contains(&"barrier.rendezvous"));
        assert!(names.windows(2).all(|w| w[0] < w[1]));
    }
}
