//! `agentvm init` — write the environment record for this project.

use anyhow::Result;
use clap::Args;

use crate::domain::environment::{DEFAULT_IMAGE, DEFAULT_REGION, DEFAULT_TYPE};
use crate::domain::{ConfigError, EnvironmentRecord};
use crate::infra::store::JsonRecordStore;
use crate::output::OutputContext;

/// Arguments for the `agentvm init` command.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Base image for new instances: stock slug or private image id
    #[arg(long, default_value = DEFAULT_IMAGE)]
    pub image: String,

    /// Linode instance type
    #[arg(long = "type", value_name = "TYPE", default_value = DEFAULT_TYPE)]
    pub instance_type: String,

    /// Linode region
    #[arg(long, default_value = DEFAULT_REGION)]
    pub region: String,
}

/// Run `agentvm init`.
///
/// Purely local: writes the record file and never contacts the provider.
///
/// # Errors
///
/// Returns an error if a record already exists, a field is empty, or the
/// file cannot be written.
pub fn run(ctx: &OutputContext, store: &JsonRecordStore, args: &InitArgs) -> Result<()> {
    if store.exists() {
        return Err(ConfigError::AlreadyInitialized {
            path: store.path().to_path_buf(),
        }
        .into());
    }

    let project = store.project_name()?;
    let record = EnvironmentRecord::new(
        project.clone(),
        args.image.clone(),
        args.instance_type.clone(),
        args.region.clone(),
    );
    record.validate()?;
    store.save(&record)?;

    ctx.success(&format!("initialized environment for {project}"));
    ctx.kv("record", &store.path().display().to_string());
    ctx.kv("base image", &record.base_image_id);
    ctx.kv("type", &record.instance_type);
    ctx.kv("region", &record.region);
    ctx.info("Run 'agentvm edit' to boot it and make changes.");
    Ok(())
}
