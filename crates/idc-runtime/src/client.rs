use std::path::{Path, PathBuf};

use idc_core::{HostOs, RuntimeConfig};
use tracing::debug;

use crate::error::RuntimeError;
use crate::executor::{RuntimeExecutor, ShellExecutor};
use crate::process::ProcessResult;

/// Output fragments of a container start that fails only because a host
/// port is still held by a container being torn down.
const TRANSIENT_START_FAILURES: &[&str] = &["address already in use", "port is already allocated"];

/// Format string for `docker ps`; fields are separated by `|`.
const PS_FORMAT: &str = "{{.ID}}|{{.Image}}|{{.Names}}|{{.Status}}";

/// Container runtime operations (docker, or kubectl/helm/buildah in
/// Kubernetes mode), parameterized over the executor for testability.
pub struct RuntimeClient<E: RuntimeExecutor = ShellExecutor> {
    executor: E,
    runtime: RuntimeConfig,
}

impl RuntimeClient<ShellExecutor> {
    pub fn new(runtime: RuntimeConfig, elevation: Option<String>) -> Self {
        let executor = ShellExecutor::new(runtime.host_os).elevated(elevation);
        Self { executor, runtime }
    }
}

impl<E: RuntimeExecutor> RuntimeClient<E> {
    pub fn with_executor(executor: E, runtime: RuntimeConfig) -> Self {
        Self { executor, runtime }
    }

    pub fn is_kubernetes(&self) -> bool {
        self.runtime.kubernetes
    }

    // ── Containers (docker) ──

    pub async fn running_containers(&self) -> Result<Vec<ContainerInfo>, RuntimeError> {
        let out = self
            .check(self.line(&["docker", "ps", "--no-trunc", "--format", PS_FORMAT]))
            .await?;
        Ok(parse_ps(&out.output))
    }

    /// All containers, running or not, whose name contains `name`.
    pub async fn containers_named(&self, name: &str) -> Result<Vec<ContainerInfo>, RuntimeError> {
        let filter = format!("name={name}");
        let out = self
            .check(self.line(&[
                "docker",
                "ps",
                "-a",
                "--no-trunc",
                "--filter",
                &filter,
                "--format",
                PS_FORMAT,
            ]))
            .await?;
        Ok(parse_ps(&out.output))
    }

    /// Whether `id` (full or abbreviated) is in the running container list.
    pub async fn container_running(&self, id: &str) -> Result<bool, RuntimeError> {
        let running = self.running_containers().await?;
        Ok(running.iter().any(|c| c.matches_id(id)))
    }

    /// Force-remove a container by name or id.
    pub async fn remove_container(&self, name: &str) -> Result<(), RuntimeError> {
        self.check(self.line(&["docker", "rm", "-f", name]))
            .await
            .map(|_| ())
    }

    // ── Images ──

    pub async fn image_exists(&self, image: &str) -> Result<bool, RuntimeError> {
        let out = if self.runtime.kubernetes {
            self.check(self.line(&["buildah", "images", "-q", image]))
                .await
        } else {
            self.check(self.line(&["docker", "images", "-q", image]))
                .await
        };
        match out {
            Ok(out) => Ok(!out.output.trim().is_empty()),
            // buildah exits non-zero for an unknown image
            Err(RuntimeError::CommandFailed { .. }) if self.runtime.kubernetes => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Repository names of every local image.
    pub async fn image_names(&self) -> Result<Vec<String>, RuntimeError> {
        let tool = if self.runtime.kubernetes {
            "buildah"
        } else {
            "docker"
        };
        let out = self
            .check(self.line(&[tool, "images", "--format", "{{.Repository}}"]))
            .await?;
        Ok(out
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(|l| l.rsplit('/').next().unwrap_or(l).to_owned())
            .collect())
    }

    /// Build `image` from `dockerfile`, streaming the build output.
    pub async fn build_image(
        &self,
        image: &str,
        dockerfile: &Path,
        context: &Path,
    ) -> Result<ProcessResult, RuntimeError> {
        let dockerfile = dockerfile.to_string_lossy();
        let context = context.to_string_lossy();
        let line = if self.runtime.kubernetes {
            self.line(&["buildah", "bud", "-t", image, "-f", &dockerfile, &context])
        } else {
            self.line(&["docker", "build", "-t", image, "-f", &dockerfile, &context])
        };
        self.check_streaming(line).await
    }

    pub async fn remove_image(&self, image: &str) -> Result<(), RuntimeError> {
        let tool = if self.runtime.kubernetes {
            "buildah"
        } else {
            "docker"
        };
        self.check(self.line(&[tool, "rmi", "-f", image]))
            .await
            .map(|_| ())
    }

    // ── Kubernetes ──

    /// Whether `pod` is reported in the `Running` phase.
    pub async fn pod_running(&self, pod: &str) -> Result<bool, RuntimeError> {
        let line = self.with_namespace(self.line(&[
            "kubectl",
            "get",
            "pod",
            pod,
            "-o",
            "jsonpath={.status.phase}",
        ]));
        match self.check(line).await {
            Ok(out) => Ok(out.output.trim() == "Running"),
            Err(RuntimeError::CommandFailed { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Name of the first pod of a Helm release.
    pub async fn pod_for_release(&self, release: &str) -> Result<Option<String>, RuntimeError> {
        let selector = format!("--selector=release={release}");
        let line = self.with_namespace(self.line(&[
            "kubectl",
            "get",
            "pods",
            &selector,
            "-o",
            "jsonpath={.items[0].metadata.name}",
        ]));
        let out = self.check(line).await?;
        let pod = out.output.trim();
        Ok((!pod.is_empty()).then(|| pod.to_owned()))
    }

    pub async fn releases(&self) -> Result<Vec<String>, RuntimeError> {
        let out = self
            .check(self.with_namespace(self.line(&["helm", "list", "-q"])))
            .await?;
        Ok(out
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_owned)
            .collect())
    }

    pub async fn uninstall_release(&self, release: &str) -> Result<(), RuntimeError> {
        self.check(self.with_namespace(self.line(&["helm", "uninstall", release])))
            .await
            .map(|_| ())
    }

    // ── Start ──

    /// Start the application container (docker) or install its Helm
    /// release (Kubernetes). Returns the container id or the pod name.
    pub async fn start_container(&self, spec: &ContainerSpec) -> Result<String, RuntimeError> {
        if self.runtime.kubernetes {
            return self.install_release(spec).await;
        }

        let app_port = format!("{port}:{port}", port = spec.app_port);
        let debug_port = format!("{port}:{port}", port = spec.debug_port);
        let volume = format!("{}:/app", spec.host_dir);
        let line = self.line(&[
            "docker",
            "run",
            "-d",
            "--name",
            &spec.name,
            "-p",
            &app_port,
            "-p",
            &debug_port,
            "-v",
            &volume,
            &spec.image,
        ]);

        let out = self.check(line).await?;
        let id = out
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .last()
            .unwrap_or_default()
            .to_owned();
        debug!(container = %spec.name, id = %id, "container started");
        Ok(id)
    }

    async fn install_release(&self, spec: &ContainerSpec) -> Result<String, RuntimeError> {
        let chart = spec
            .chart_dir
            .as_deref()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_else(|| "chart".to_owned());
        let image = format!("image.repository={}", spec.image);
        let line = self.with_namespace(self.line(&[
            "helm",
            "upgrade",
            "--install",
            &spec.name,
            &chart,
            "--set",
            &image,
            "--set",
            "image.pullPolicy=Never",
            "--wait",
        ]));
        self.check_streaming(line).await?;

        let pod = self.pod_for_release(&spec.name).await?;
        pod.ok_or_else(|| RuntimeError::CommandFailed {
            command: format!("kubectl get pods --selector=release={}", spec.name),
            exit_code: Some(0),
            output: "no pod found for release".to_owned(),
        })
    }

    // ── In-container scripts ──

    /// Run `<scripts_dir>/<script> args..` inside the container or pod,
    /// streaming its output.
    pub async fn exec_script(
        &self,
        target: &str,
        script: &str,
        args: &[String],
    ) -> Result<ProcessResult, RuntimeError> {
        let script_path = format!("{}/{script}", self.runtime.scripts_dir.trim_end_matches('/'));
        let mut parts: Vec<&str> = if self.runtime.kubernetes {
            vec!["kubectl", "exec", target]
        } else {
            vec!["docker", "exec", target]
        };
        if self.runtime.kubernetes {
            if let Some(ns) = self.runtime.namespace.as_deref() {
                parts.extend(["-n", ns]);
            }
            parts.push("--");
        }
        parts.push(&script_path);
        parts.extend(args.iter().map(String::as_str));

        self.check_streaming(self.line(&parts)).await
    }

    // ── Helpers ──

    async fn check(&self, line: String) -> Result<ProcessResult, RuntimeError> {
        let out = self
            .executor
            .run(&line)
            .await
            .map_err(|e| RuntimeError::Process { source: e })?;
        into_checked(line, out)
    }

    async fn check_streaming(&self, line: String) -> Result<ProcessResult, RuntimeError> {
        let out = self
            .executor
            .run_streaming(&line)
            .await
            .map_err(|e| RuntimeError::Process { source: e })?;
        into_checked(line, out)
    }

    fn line(&self, parts: &[&str]) -> String {
        parts
            .iter()
            .map(|p| quote(self.runtime.host_os, p))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn with_namespace(&self, mut line: String) -> String {
        if let Some(ns) = self.runtime.namespace.as_deref() {
            line.push_str(" -n ");
            line.push_str(&quote(self.runtime.host_os, ns));
        }
        line
    }
}

/// Whether a failed start is the retryable "port still held" kind.
pub fn is_transient_start_failure(err: &RuntimeError) -> bool {
    err.output().is_some_and(|out| {
        let out = out.to_ascii_lowercase();
        TRANSIENT_START_FAILURES.iter().any(|needle| out.contains(needle))
    })
}

fn into_checked(command: String, out: ProcessResult) -> Result<ProcessResult, RuntimeError> {
    if out.success() {
        Ok(out)
    } else {
        Err(RuntimeError::CommandFailed {
            command,
            exit_code: out.exit_code,
            output: out.output,
        })
    }
}

fn quote(host_os: HostOs, arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=@%+,".contains(c));
    if plain {
        return arg.to_owned();
    }
    match host_os {
        HostOs::Linux => format!("'{}'", arg.replace('\'', r"'\''")),
        HostOs::Windows => format!("\"{}\"", arg.replace('"', "\\\"")),
    }
}

fn parse_ps(output: &str) -> Vec<ContainerInfo> {
    output
        .lines()
        .filter_map(|line| {
            let mut fields = line.trim().splitn(4, '|');
            let id = fields.next().filter(|s| !s.is_empty())?;
            Some(ContainerInfo {
                id: id.to_owned(),
                image: fields.next().unwrap_or_default().to_owned(),
                name: fields.next().unwrap_or_default().to_owned(),
                status: fields.next().unwrap_or_default().to_owned(),
            })
        })
        .collect()
}

// ── Types ──

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerInfo {
    pub id: String,
    pub image: String,
    pub name: String,
    pub status: String,
}

impl ContainerInfo {
    /// Full or abbreviated id match.
    pub fn matches_id(&self, id: &str) -> bool {
        !id.is_empty() && (self.id.starts_with(id) || id.starts_with(&self.id))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    /// Application directory as the runtime sees it, mounted at `/app`
    pub host_dir: String,
    pub app_port: u16,
    pub debug_port: u16,
    /// Helm chart (Kubernetes only)
    pub chart_dir: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_leaves_plain_args() {
        assert_eq!(quote(HostOs::Linux, "docker"), "docker");
        assert_eq!(quote(HostOs::Linux, "9080:9080"), "9080:9080");
        assert_eq!(quote(HostOs::Linux, "/work/app:/app"), "/work/app:/app");
    }

    #[test]
    fn quote_wraps_special_args() {
        assert_eq!(quote(HostOs::Linux, "my app"), "'my app'");
        assert_eq!(quote(HostOs::Linux, "it's"), r"'it'\''s'");
        assert_eq!(quote(HostOs::Linux, ""), "''");
        assert_eq!(quote(HostOs::Windows, "C:\\my app"), "\"C:\\my app\"");
    }

    #[test]
    fn parse_ps_reads_pipe_separated_rows() {
        let rows = parse_ps("abc|img|name|Up 2 minutes\n\ndef|img2|other|Exited (0)\n");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, "abc");
        assert_eq!(rows[1].status, "Exited (0)");
    }

    #[test]
    fn matches_id_accepts_prefixes() {
        let info = ContainerInfo {
            id: "abcdef123456".to_owned(),
            image: String::new(),
            name: String::new(),
            status: String::new(),
        };
        assert!(info.matches_id("abcdef"));
        assert!(info.matches_id("abcdef123456ffff"));
        assert!(!info.matches_id("123"));
        assert!(!info.matches_id(""));
    }
}
