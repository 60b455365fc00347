use std::collections::BTreeMap;

use idc_core::AppContext;
use idc_runtime::Lifecycle;
use serde::Serialize;
use tracing::warn;

#[derive(Serialize)]
struct StatusReport<'a> {
    app: &'a str,
    dir: String,
    container_name: &'a str,
    kubernetes: bool,
    /// `None` when the runtime could not be queried
    image_present: Option<bool>,
    container_running: Option<bool>,
    state: BTreeMap<&'a str, &'a str>,
}

/// Print the application's stored state and what the runtime reports.
pub async fn status_tracker(ctx: AppContext, json: bool) -> anyhow::Result<()> {
    let password = super::root_password(&ctx, crate::env_lookup);
    let lifecycle = Lifecycle::new(ctx, password);
    let ctx = lifecycle.context();

    let image_present = match lifecycle.client().image_exists(ctx.app.image_name()).await {
        Ok(present) => Some(present),
        Err(e) => {
            warn!(error = %e, "could not query images");
            None
        }
    };
    let container_running = match lifecycle.container_running().await {
        Ok(running) => Some(running),
        Err(e) => {
            warn!(error = %e, "could not query containers");
            None
        }
    };

    let report = StatusReport {
        app: &ctx.app.name,
        dir: ctx.app.dir.display().to_string(),
        container_name: &ctx.app.container_name,
        kubernetes: ctx.config.runtime.kubernetes,
        image_present,
        container_running,
        state: lifecycle.store().entries().collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render(&report));
    }
    Ok(())
}

fn render(report: &StatusReport<'_>) -> String {
    let mut out = String::new();
    out.push_str(&format!("Application   {} ({})\n", report.app, report.dir));
    out.push_str(&format!("Container     {}\n", report.container_name));
    out.push_str(&format!(
        "Runtime       {}\n",
        if report.kubernetes { "kubernetes" } else { "docker" }
    ));
    out.push_str(&format!(
        "Image         {}\n",
        describe(report.image_present, "present", "missing")
    ));
    out.push_str(&format!(
        "Running       {}\n",
        describe(report.container_running, "yes", "no")
    ));

    if report.state.is_empty() {
        out.push_str("State         (none)\n");
    } else {
        out.push_str("State\n");
        for (key, value) in &report.state {
            out.push_str(&format!("  {key} = {value}\n"));
        }
    }
    out
}

fn describe(value: Option<bool>, yes: &'static str, no: &'static str) -> &'static str {
    match value {
        Some(true) => yes,
        Some(false) => no,
        None => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(state: BTreeMap<&'static str, &'static str>) -> StatusReport<'static> {
        StatusReport {
            app: "shop",
            dir: "/work/shop".to_owned(),
            container_name: "shop-idc-0123456789abcdef",
            kubernetes: false,
            image_present: Some(true),
            container_running: None,
            state,
        }
    }

    #[test]
    fn render_lists_state_entries() {
        let text = render(&report(BTreeMap::from([
            ("container-built", "true"),
            ("start-mode", "dev"),
        ])));

        assert!(text.contains("Image         present"));
        assert!(text.contains("Running       unknown"));
        assert!(text.contains("  container-built = true\n  start-mode = dev\n"));
    }

    #[test]
    fn render_marks_empty_state() {
        assert!(render(&report(BTreeMap::new())).contains("State         (none)"));
    }

    #[test]
    fn json_uses_null_for_unknown_status() {
        let json = serde_json::to_value(report(BTreeMap::new())).unwrap();
        assert_eq!(json["container_running"], serde_json::Value::Null);
        assert_eq!(json["image_present"], serde_json::Value::Bool(true));
    }
}
