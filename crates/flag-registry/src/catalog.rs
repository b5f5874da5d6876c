//! Seed catalog and startup validation
//!
//! The catalog is closed: flags are never created or deleted at runtime.
//! [`validate_catalog`] runs once when a registry is built and reports
//! configuration errors (duplicate ids, dangling dependencies, out-of-range
//! rollouts, dependency cycles).

use crate::error::CatalogIssue;
use crate::flag::{AbGroup, Category, Flag, FlagId, Impact};
use chrono::{TimeZone, Utc};
use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;
use std::collections::{HashMap, HashSet};

/// Built-in seed catalog
#[must_use]
pub fn default_catalog() -> Vec<Flag> {
    vec![
        Flag::new(
            "lazy-loading",
            "Lazy Loading",
            Category::Performance,
            Impact::Medium,
            true,
        )
        .with_description("Defer loading of off-screen images and panels"),
        Flag::new(
            "image-optimization",
            "Image Optimization",
            Category::Performance,
            Impact::High,
            true,
        )
        .with_description("Serve resized, modern-format images"),
        Flag::new(
            "prefetch-routes",
            "Route Prefetching",
            Category::Performance,
            Impact::Low,
            false,
        )
        .with_description("Prefetch linked pages on hover")
        .with_rollout(50),
        Flag::new("dark-mode", "Dark Mode", Category::Ui, Impact::Medium, true)
            .with_description("Dark colour scheme toggle"),
        Flag::new(
            "animated-transitions",
            "Animated Transitions",
            Category::Ui,
            Impact::Low,
            true,
        )
        .with_description("Animate panel and route transitions"),
        Flag::new(
            "compact-layout",
            "Compact Layout",
            Category::Ui,
            Impact::Medium,
            false,
        )
        .with_description("Denser card grid for wide screens")
        .with_ab_group(AbGroup::B),
        Flag::new(
            "theme-studio",
            "Theme Studio",
            Category::Experimental,
            Impact::High,
            false,
        )
        .with_description("Live theme editing studio")
        .with_dependencies(["dark-mode"]),
        Flag::new(
            "ai-recommendations",
            "AI Recommendations",
            Category::Experimental,
            Impact::High,
            false,
        )
        .with_description("Suggest related projects")
        .with_rollout(25)
        .with_ab_group(AbGroup::A),
        Flag::new(
            "holiday-banner",
            "Holiday Banner",
            Category::Experimental,
            Impact::Low,
            true,
        )
        .with_description("Seasonal banner on the landing page")
        .with_expiry(Utc.with_ymd_and_hms(2025, 1, 6, 0, 0, 0).single().unwrap_or_default()),
        Flag::new(
            "form-analytics",
            "Form Analytics",
            Category::Analytics,
            Impact::Low,
            true,
        )
        .with_description("Aggregate form field interaction timings"),
        Flag::new(
            "scroll-depth-tracking",
            "Scroll Depth Tracking",
            Category::Analytics,
            Impact::Low,
            false,
        )
        .with_description("Record how far visitors scroll")
        .with_dependencies(["form-analytics"]),
        Flag::new(
            "reduced-motion",
            "Reduced Motion",
            Category::Accessibility,
            Impact::Medium,
            false,
        )
        .with_description("Disable non-essential animation"),
        Flag::new(
            "high-contrast",
            "High Contrast",
            Category::Accessibility,
            Impact::Medium,
            false,
        )
        .with_description("High-contrast colour palette")
        .with_dependencies(["dark-mode"]),
    ]
}

/// Validate a catalog
///
/// # Errors
/// Returns every issue found; an empty list is never returned as `Err`.
pub fn validate_catalog(flags: &[Flag]) -> Result<(), Vec<CatalogIssue>> {
    let mut issues = Vec::new();

    let mut seen = HashSet::new();
    for flag in flags {
        if !seen.insert(&flag.id) {
            issues.push(CatalogIssue::DuplicateId(flag.id.clone()));
        }
        if let Some(value) = flag.rollout_percentage.filter(|p| *p > 100) {
            issues.push(CatalogIssue::RolloutOutOfRange {
                flag: flag.id.clone(),
                value,
            });
        }
        for dep in &flag.dependencies {
            if !flags.iter().any(|f| &f.id == dep) {
                issues.push(CatalogIssue::UnknownDependency {
                    flag: flag.id.clone(),
                    dependency: dep.clone(),
                });
            }
        }
    }

    issues.extend(find_cycles(flags));

    if issues.is_empty() {
        Ok(())
    } else {
        Err(issues)
    }
}

/// Dependency cycles, one issue per strongly connected component
fn find_cycles(flags: &[Flag]) -> Vec<CatalogIssue> {
    let index: HashMap<&FlagId, usize> = flags
        .iter()
        .enumerate()
        .map(|(i, f)| (&f.id, i))
        .collect();

    let mut graph: DiGraphMap<usize, ()> = DiGraphMap::new();
    for (i, flag) in flags.iter().enumerate() {
        graph.add_node(i);
        for dep in &flag.dependencies {
            if let Some(&j) = index.get(dep) {
                graph.add_edge(i, j, ());
            }
        }
    }

    tarjan_scc(&graph)
        .into_iter()
        .filter(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
        .map(|mut scc| {
            scc.sort_unstable();
            CatalogIssue::DependencyCycle {
                members: scc.into_iter().map(|i| flags[i].id.clone()).collect(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flag(id: &str) -> Flag {
        Flag::new(id, id, Category::Ui, Impact::Low, true)
    }

    #[test]
    fn default_catalog_is_valid() {
        assert_eq!(validate_catalog(&default_catalog()), Ok(()));
    }

    #[test]
    fn default_catalog_has_ungated_lazy_loading() {
        let catalog = default_catalog();
        let lazy = catalog
            .iter()
            .find(|f| f.id.as_str() == "lazy-loading")
            .unwrap();
        assert!(lazy.is_ungated());
    }

    #[test]
    fn detects_duplicates() {
        let issues = validate_catalog(&[flag("a"), flag("a")]).unwrap_err();
        assert_eq!(issues, vec![CatalogIssue::DuplicateId(FlagId::from("a"))]);
    }

    #[test]
    fn detects_unknown_dependency() {
        let issues = validate_catalog(&[flag("a").with_dependencies(["ghost"])]).unwrap_err();
        assert!(matches!(
            &issues[0],
            CatalogIssue::UnknownDependency { dependency, .. } if dependency.as_str() == "ghost"
        ));
    }

    #[test]
    fn detects_rollout_out_of_range() {
        let issues = validate_catalog(&[flag("a").with_rollout(101)]).unwrap_err();
        assert_eq!(
            issues,
            vec![CatalogIssue::RolloutOutOfRange {
                flag: FlagId::from("a"),
                value: 101
            }]
        );
    }

    #[test]
    fn detects_cycle() {
        let catalog = [
            flag("a").with_dependencies(["b"]),
            flag("b").with_dependencies(["c"]),
            flag("c").with_dependencies(["a"]),
            flag("d").with_dependencies(["a"]),
        ];
        let issues = validate_catalog(&catalog).unwrap_err();
        assert_eq!(issues.len(), 1);
        assert_eq!(
            issues[0],
            CatalogIssue::DependencyCycle {
                members: vec!["a".into(), "b".into(), "c".into()]
            }
        );
    }

    #[test]
    fn detects_self_dependency() {
        let issues = validate_catalog(&[flag("a").with_dependencies(["a"])]).unwrap_err();
        assert!(matches!(&issues[0], CatalogIssue::DependencyCycle { members } if members.len() == 1));
    }
}
