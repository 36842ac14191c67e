use colored::Colorize;
use efs_core::{DeclaredResource, ResourceState};
use efs_provisioner::{ProvisionedVolume, SyncReport};
use tabled::builder::Builder;
use tabled::settings::Style;
use time::format_description::well_known::Rfc3339;

use crate::cli::OutputFormat;

pub fn print_success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

pub fn print_volume(volume: &ProvisionedVolume, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(volume)?),
        OutputFormat::Table => {
            println!("{}: {}", "Filesystem".cyan(), volume.filesystem_id);
            println!("{}: {}", "Region".cyan(), volume.region);
            println!("{}: {}:{}", "NFS".cyan(), volume.nfs.server, volume.nfs.path);
            println!("{}: {}", "Capacity".cyan(), volume.capacity);
            println!("{}: {}", "Reclaim".cyan(), volume.reclaim_policy);

            let mut builder = Builder::default();
            builder.push_record(["SUBNET", "MOUNT TARGET", "STATE"]);
            for target in &volume.mount_targets {
                builder.push_record([
                    target.subnet_id.as_str(),
                    target.id.as_str(),
                    target.lifecycle_state.as_str(),
                ]);
            }
            println!("{}", builder.build().with(Style::rounded()));
        }
    }
    Ok(())
}

pub fn print_resources(resources: &[DeclaredResource], format: OutputFormat) -> anyhow::Result<()> {
    if matches!(format, OutputFormat::Json) {
        println!("{}", serde_json::to_string_pretty(resources)?);
        return Ok(());
    }
    if resources.is_empty() {
        println!("No filesystems declared.");
        return Ok(());
    }

    let mut builder = Builder::default();
    builder.push_record([
        "NAMESPACE",
        "NAME",
        "REGION",
        "SUBNETS",
        "SECURITY",
        "ID",
        "CYCLE",
        "LAST UPDATE",
    ]);
    for resource in resources {
        let (id, cycle, updated) = match &resource.status {
            Some(status) => (
                status.id.clone(),
                status.lifecycle_state.to_string(),
                status
                    .last_update
                    .format(&Rfc3339)
                    .unwrap_or_else(|_| "-".into()),
            ),
            None => ("-".into(), ResourceState::Unknown.to_string(), "-".into()),
        };
        builder.push_record([
            resource.metadata.namespace.clone(),
            resource.metadata.name.clone(),
            resource.spec.region.clone(),
            resource.spec.subnets.join(","),
            resource.spec.security_group.clone(),
            id,
            cycle,
            updated,
        ]);
    }
    println!("{}", builder.build().with(Style::rounded()));
    Ok(())
}

pub fn print_sync_report(report: &SyncReport) {
    for (object, state) in &report.updated {
        let state = match state {
            ResourceState::Ready => state.to_string().green(),
            ResourceState::NotReady => state.to_string().yellow(),
            ResourceState::Unknown => state.to_string().red(),
        };
        println!("{} {}", object.to_string().cyan(), state);
    }
    for object in &report.invalid {
        println!("{} {}", object.to_string().cyan(), "invalid".red());
    }
    for object in &report.failed {
        println!("{} {}", object.to_string().cyan(), "failed".red());
    }
}
