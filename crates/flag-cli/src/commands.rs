//! Subcommand handlers
//!
//! Each handler writes human-readable output to `out` and returns whether
//! the command succeeded (drives the exit code).

use anyhow::{bail, Context};
use flag_registry::{simulate_rollout, Category, FlagRegistry};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::io::Write;
use std::path::Path;

pub(crate) fn list(
    registry: &FlagRegistry,
    category: Option<Category>,
    out: &mut dyn Write,
) -> anyhow::Result<bool> {
    let flags = match category {
        Some(category) => registry.flags_by_category(category),
        None => registry.get_all_flags(),
    };
    for flag in flags {
        writeln!(
            out,
            "{:<24} {:<14} {:<7} base={:<5} active={}",
            flag.id,
            flag.category,
            flag.impact,
            flag.enabled,
            registry.is_enabled(flag.id.as_str())
        )?;
    }
    Ok(true)
}

pub(crate) fn show(registry: &FlagRegistry, id: &str, out: &mut dyn Write) -> anyhow::Result<bool> {
    let Some(flag) = registry.get_flag(id) else {
        writeln!(out, "unknown flag '{id}'")?;
        return Ok(false);
    };
    writeln!(out, "{}", serde_json::to_string_pretty(flag)?)?;
    writeln!(out, "evaluation: {}", registry.evaluate(id))?;
    Ok(true)
}

pub(crate) fn eval(registry: &FlagRegistry, id: &str, out: &mut dyn Write) -> anyhow::Result<bool> {
    let evaluation = registry.evaluate(id);
    writeln!(out, "{id}: {evaluation}")?;
    Ok(evaluation.is_enabled())
}

pub(crate) fn set_state(
    registry: &mut FlagRegistry,
    id: &str,
    enabled: bool,
    out: &mut dyn Write,
) -> anyhow::Result<bool> {
    let found = if enabled {
        registry.enable(id)
    } else {
        registry.disable(id)
    };
    if found {
        writeln!(out, "{id}: base={enabled}")?;
    } else {
        writeln!(out, "unknown flag '{id}'")?;
    }
    Ok(found)
}

pub(crate) fn toggle(registry: &mut FlagRegistry, id: &str, out: &mut dyn Write) -> anyhow::Result<bool> {
    if !registry.contains(id) {
        writeln!(out, "unknown flag '{id}'")?;
        return Ok(false);
    }
    let state = registry.toggle(id);
    writeln!(out, "{id}: base={state}")?;
    Ok(true)
}

pub(crate) fn export(
    registry: &FlagRegistry,
    target: Option<&Path>,
    out: &mut dyn Write,
) -> anyhow::Result<bool> {
    let json = registry.export_flags()?;
    match target {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
            writeln!(out, "exported {} flags to {}", registry.len(), path.display())?;
        }
        None => writeln!(out, "{json}")?,
    }
    Ok(true)
}

pub(crate) fn import(registry: &mut FlagRegistry, source: &Path, out: &mut dyn Write) -> anyhow::Result<bool> {
    let raw = std::fs::read_to_string(source)
        .with_context(|| format!("reading {}", source.display()))?;
    match registry.try_import_flags(&raw) {
        Ok(count) => {
            writeln!(out, "imported {count} flags")?;
            Ok(true)
        }
        Err(e) => {
            writeln!(out, "import rejected: {e}")?;
            Ok(false)
        }
    }
}

pub(crate) fn reset(registry: &mut FlagRegistry, out: &mut dyn Write) -> anyhow::Result<bool> {
    registry.reset_to_defaults();
    writeln!(out, "reset {} flags to defaults", registry.len())?;
    Ok(true)
}

pub(crate) fn validate(registry: &FlagRegistry, out: &mut dyn Write) -> anyhow::Result<bool> {
    let issues = registry.catalog_issues();
    if issues.is_empty() {
        writeln!(out, "catalog OK ({} flags)", registry.len())?;
        return Ok(true);
    }
    for issue in issues {
        writeln!(out, "issue: {issue}")?;
    }
    Ok(false)
}

pub(crate) fn simulate(
    registry: &FlagRegistry,
    id: &str,
    sessions: usize,
    seed: u64,
    out: &mut dyn Write,
) -> anyhow::Result<bool> {
    let Some(flag) = registry.get_flag(id) else {
        bail!("unknown flag '{id}'");
    };

    let mut rng = StdRng::seed_from_u64(seed);
    let ids = (0..sessions).map(|_| format!("{:032x}", rng.random::<u128>()));
    let report = simulate_rollout(flag, ids);

    writeln!(out, "Rollout Simulation:")?;
    writeln!(out, "  Flag: {id}")?;
    match flag.rollout_percentage {
        Some(p) => writeln!(out, "  Rollout: {p}%")?,
        None => writeln!(out, "  Rollout: none")?,
    }
    writeln!(out, "  Sessions: {}", report.sessions)?;
    writeln!(out, "  Admitted: {}", report.admitted)?;
    writeln!(out, "  Fraction: {:.3}", report.fraction)?;
    Ok(true)
}

pub(crate) fn summary(registry: &FlagRegistry, out: &mut dyn Write) -> anyhow::Result<bool> {
    let summary = registry.summary();
    writeln!(out, "Session: {} (group {})", registry.session().id, registry.user_group())?;
    writeln!(
        out,
        "Flags: {} total, {} enabled, {} active",
        summary.total, summary.enabled, summary.active
    )?;
    for c in summary.by_category {
        writeln!(out, "  {:<14} {}/{} active", c.category, c.active, c.total)?;
    }
    Ok(true)
}
