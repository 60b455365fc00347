use std::sync::Arc;

use idc_core::{AppContext, LifecycleCommand};
use idc_runtime::{AssumeYes, Lifecycle};

/// Run one engine-driven command against the real container runtime.
pub async fn lifecycle(
    ctx: AppContext,
    command: LifecycleCommand,
    assume_yes: bool,
) -> anyhow::Result<()> {
    let password = super::root_password(&ctx, crate::env_lookup);
    let name = command.name();

    let mut lifecycle = Lifecycle::new(ctx, password);
    if assume_yes {
        lifecycle = lifecycle.with_confirm(Arc::new(AssumeYes));
    }

    let decision = lifecycle.run(command).await?;
    if decision.actions.is_empty() {
        println!("idc {name}: nothing to do");
    } else {
        println!("idc {name}: done ({})", decision.action_names().join(", "));
    }
    Ok(())
}
