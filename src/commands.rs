//! Command handlers behind the CLI.

use anyhow::{Result, bail};
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL};
use serde_json::json;

use crate::context::Context;
use crate::inventory::{Architecture, Target};
use crate::resolve::Resolution;
use crate::ui::prelude::*;

fn lookup<'a>(
    ctx: &'a Context,
    target: &str,
    cross_arch: Option<&str>,
) -> Result<(&'a Target, Option<&'a Architecture>)> {
    let target = ctx.target(target)?;
    let arch = cross_arch.map(|name| ctx.arch(name)).transpose()?;
    Ok((target, arch))
}

pub fn targets(ctx: &Context) -> Result<()> {
    let targets: Vec<&Target> = ctx.inventory.targets().collect();

    if matches!(get_output_format(), OutputFormat::Json) {
        emit(
            Level::Info,
            "targets.list",
            &format!("{} targets", targets.len()),
            Some(json!({ "targets": targets })),
        );
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Target", "OS", "Version", "Format", "Command", "Cross"]);
    for target in &targets {
        let cross = if ctx.cross.supports_cross(&target.os_name) {
            "yes"
        } else {
            "no"
        };
        table.add_row(vec![
            target.id.as_str(),
            target.os_name.as_str(),
            target.os_version.as_str(),
            target.packaging.as_str(),
            target.packaging_command.as_str(),
            cross,
        ]);
    }
    println!("{table}");
    Ok(())
}

pub fn resolve(ctx: &Context, generic: &str, target: &str, cross_arch: Option<&str>) -> Result<()> {
    let (target, arch) = lookup(ctx, target, cross_arch)?;
    match ctx.resolver().resolve(generic, target, arch)? {
        Resolution::Package(record) => emit(
            Level::Info,
            "resolve.package",
            &format!("{}: {}", record.channel, record.resolved_name),
            Some(json!({ "target": target.id, "package": record })),
        ),
        Resolution::Gap(gap) => emit(
            Level::Warn,
            "resolve.gap",
            &format!("{generic} is not installed on {target}: {}", gap.as_str()),
            Some(json!({ "target": target.id, "generic_name": generic, "gap": gap.as_str() })),
        ),
    }
    Ok(())
}

pub fn packages(ctx: &Context, projects: &[String], target: &str, cross_arch: Option<&str>) -> Result<()> {
    let (target, arch) = lookup(ctx, target, cross_arch)?;
    let names: Vec<&str> = projects.iter().map(String::as_str).collect();
    let groups = ctx.projects.get_packages(&ctx.resolver(), &names, target, arch)?;
    if groups.is_empty() {
        emit(
            Level::Warn,
            "packages.empty",
            &format!("No packages for {target}"),
            Some(json!({ "target": target.id, "cross_arch": arch })),
        );
        return Ok(());
    }

    match get_output_format() {
        OutputFormat::Json => emit(
            Level::Info,
            "packages.resolved",
            &format!("{} packages for {target}", groups.len()),
            Some(json!({ "target": target.id, "cross_arch": arch, "packages": groups })),
        ),
        OutputFormat::Text => {
            for (channel, names) in groups.iter() {
                let names: Vec<&str> = names.iter().map(String::as_str).collect();
                emit(
                    Level::Info,
                    "packages.group",
                    &format!("{channel}: {}", names.join(" ")),
                    None,
                );
            }
        }
    }
    Ok(())
}

pub fn check(ctx: &Context) -> Result<()> {
    // Cross matrix was already validated while loading
    if let Err(err) = ctx.check() {
        emit(
            Level::Error,
            "check.failed",
            &format!("Data check failed: {err}"),
            Some(json!({ "error": err.to_string() })),
        );
        bail!("data directory is inconsistent");
    }

    let packages = ctx.mappings.package_names().len();
    let projects = ctx.projects.all().count();
    emit(
        Level::Success,
        "check.ok",
        &format!(
            "{} targets, {} mapping keys, {packages} packages and {projects} projects are consistent",
            ctx.inventory.target_ids().count(),
            ctx.universe.len(),
        ),
        Some(json!({
            "targets": ctx.inventory.target_ids().count(),
            "keys": ctx.universe.len(),
            "packages": packages,
            "projects": projects,
        })),
    );
    Ok(())
}
