//! Side effects selected by the decision engine.
//!
//! Each action runs its external commands through the [`RuntimeClient`] and,
//! once reality has changed, writes the new facts to the application store.
//! Nothing is rolled back when a later action fails.

use idc_build::DockerfileSet;
use idc_core::app::{NAME_MARKER, is_generated_name};
use idc_core::state;
use idc_core::{Action, AppContext, AppSignal, KeyValueStore};
use tracing::{debug, info, warn};

use crate::client::{ContainerSpec, RuntimeClient, is_transient_start_failure};
use crate::error::{LifecycleError, RuntimeError};
use crate::executor::RuntimeExecutor;
use crate::prompt::Confirm;
use crate::status::{BuildTarget, StatusEvent, StatusReporter};

/// Application build script, relative to the scripts directory.
pub const BUILD_SCRIPT: &str = "build.sh";
/// Application lifecycle script, relative to the scripts directory.
pub const LIFECYCLE_SCRIPT: &str = "lifecycle.sh";

pub struct ActionRunner<'a, E: RuntimeExecutor> {
    ctx: &'a AppContext,
    client: &'a RuntimeClient<E>,
    store: &'a mut KeyValueStore,
    reporter: &'a dyn StatusReporter,
    confirm: &'a dyn Confirm,
}

impl<'a, E: RuntimeExecutor> ActionRunner<'a, E> {
    pub fn new(
        ctx: &'a AppContext,
        client: &'a RuntimeClient<E>,
        store: &'a mut KeyValueStore,
        reporter: &'a dyn StatusReporter,
        confirm: &'a dyn Confirm,
    ) -> Self {
        Self {
            ctx,
            client,
            store,
            reporter,
            confirm,
        }
    }

    pub async fn execute(&mut self, action: &Action) -> Result<(), LifecycleError> {
        info!(app_id = %self.ctx.app.id, action = action.name(), "executing");
        match action {
            Action::RemoveStaleArtifacts => self.remove_stale_artifacts().await,
            Action::Refresh => self.refresh().await,
            Action::RecordFingerprint { key, value } => self.set(key, value.as_str()),
            Action::BuildImage => self.build_image().await,
            Action::StartContainer => self.start_container().await,
            Action::BuildApplication {
                clean,
                production,
                full,
                profile_args,
            } => {
                self.build_application(*clean, *production, *full, profile_args)
                    .await
            }
            Action::EnsureApplicationStarted { restart } => self.ensure_started(*restart).await,
            Action::SignalApplication(signal) => self.signal(*signal).await,
            Action::RemoveContainer => self.remove_container().await,
            Action::SystemCleanup => self.system_cleanup().await,
        }
    }

    // ── Teardown ──

    async fn remove_stale_artifacts(&mut self) -> Result<(), LifecycleError> {
        let name = self.ctx.app.container_name.as_str();

        let container = if self.client.is_kubernetes() {
            self.client
                .releases()
                .await
                .map(|releases| releases.iter().any(|r| r == name))
        } else {
            self.client
                .containers_named(name)
                .await
                .map(|found| found.iter().any(|c| c.name == name))
        };
        let image = self.client.image_exists(name).await;

        let (container, image) = match (container, image) {
            (Ok(c), Ok(i)) => (c, i),
            (Err(e), _) | (_, Err(e)) => {
                warn!(error = %e, "could not look for leftover containers, skipping cleanup");
                return Ok(());
            }
        };
        if !container && !image {
            debug!(name, "no leftover container or image");
            return Ok(());
        }

        let question = format!(
            "Found a container or image named {name} left over from an earlier setup. Stop and remove it?"
        );
        if !self.ask(&question)? {
            info!(name, "leaving the existing container and image in place");
            return Err(LifecycleError::CleanupDeclined {
                name: name.to_owned(),
            });
        }
        self.teardown().await
    }

    async fn refresh(&mut self) -> Result<(), LifecycleError> {
        self.teardown().await?;
        self.remove(state::CONTAINER_ID)?;
        self.remove(state::POD_ID)?;
        self.set_flag(state::CONTAINER_BUILT, false)?;
        self.reporter.report(&self.ctx.app, StatusEvent::AppStopped);
        Ok(())
    }

    /// Remove the container (or Helm release) and the image. Missing
    /// ones are not an error.
    async fn teardown(&self) -> Result<(), LifecycleError> {
        let name = self.ctx.app.container_name.as_str();
        let removed = if self.client.is_kubernetes() {
            self.client.uninstall_release(name).await
        } else {
            self.client.remove_container(name).await
        };
        tolerate_absent(name, removed)?;
        tolerate_absent(name, self.client.remove_image(name).await)
    }

    async fn remove_container(&mut self) -> Result<(), LifecycleError> {
        let name = self.ctx.app.container_name.as_str();
        let question = format!("Stop and remove container {name} and its image?");
        if !self.ask(&question)? {
            info!(name, "container removal cancelled");
            return Ok(());
        }

        self.teardown().await?;
        self.store
            .delete()
            .map_err(|e| LifecycleError::State { source: e })?;
        self.reporter.report(&self.ctx.app, StatusEvent::AppStopped);
        Ok(())
    }

    async fn system_cleanup(&mut self) -> Result<(), LifecycleError> {
        if !self.ask("Remove every idc container and image on this machine?")? {
            info!("system cleanup cancelled");
            return Ok(());
        }
        let prefix = self.ctx.config.runtime.name_prefix.as_str();

        if self.client.is_kubernetes() {
            let releases = self
                .client
                .releases()
                .await
                .map_err(|e| LifecycleError::Runtime { source: e })?;
            for release in releases.iter().filter(|r| is_generated_name(r, prefix)) {
                info!(release = %release, "uninstalling");
                tolerate_absent(release, self.client.uninstall_release(release).await)?;
            }
        } else {
            let containers = self
                .client
                .containers_named(NAME_MARKER)
                .await
                .map_err(|e| LifecycleError::Runtime { source: e })?;
            for container in containers
                .iter()
                .filter(|c| is_generated_name(&c.name, prefix))
            {
                info!(container = %container.name, "removing container");
                tolerate_absent(&container.name, self.client.remove_container(&container.id).await)?;
            }
        }

        let images = self
            .client
            .image_names()
            .await
            .map_err(|e| LifecycleError::Runtime { source: e })?;
        for image in images.iter().filter(|i| is_generated_name(i, prefix)) {
            info!(image = %image, "removing image");
            tolerate_absent(image, self.client.remove_image(image).await)?;
        }

        self.store
            .delete()
            .map_err(|e| LifecycleError::State { source: e })?;
        Ok(())
    }

    // ── Image and container ──

    async fn build_image(&mut self) -> Result<(), LifecycleError> {
        let ctx = self.ctx;
        let image = ctx.app.image_name();

        let set = DockerfileSet::resolve(&ctx.artifacts_dir, ctx.app_dir())
            .map_err(|e| LifecycleError::Dockerfile { source: e })?;
        let dockerfile = set
            .write_composed(&ctx.state_dir)
            .map_err(|e| LifecycleError::Dockerfile { source: e })?;

        self.reporter
            .report(&ctx.app, StatusEvent::BuildStarted(BuildTarget::Image));
        self.set_flag(state::CONTAINER_BUILT, false)?;

        match self
            .client
            .build_image(image, &dockerfile, ctx.app_dir())
            .await
        {
            Ok(_) => {
                self.set(state::IMAGE_NAME, image)?;
                self.set(state::CONTAINER_NAME, &ctx.app.container_name)?;
                self.set_flag(state::CONTAINER_BUILT, true)?;
                self.reporter
                    .report(&ctx.app, StatusEvent::BuildSucceeded(BuildTarget::Image));
                Ok(())
            }
            Err(e) => {
                self.reporter
                    .report(&ctx.app, StatusEvent::BuildFailed(BuildTarget::Image));
                Err(LifecycleError::ImageBuild {
                    image: image.to_owned(),
                    source: e,
                })
            }
        }
    }

    async fn start_container(&mut self) -> Result<(), LifecycleError> {
        let ctx = self.ctx;
        let name = ctx.app.container_name.as_str();
        let kubernetes = self.client.is_kubernetes();
        let spec = self.container_spec();

        self.reporter.report(&ctx.app, StatusEvent::AppStarting);

        if !kubernetes {
            self.discard_container(name).await;
        }

        let started = match self.client.start_container(&spec).await {
            Err(e) if !kubernetes && is_transient_start_failure(&e) => {
                warn!(container = name, error = %e, "container start failed transiently, retrying once");
                self.discard_container(name).await;
                self.client.start_container(&spec).await
            }
            other => other,
        };
        let id = started.map_err(|e| LifecycleError::ContainerStart {
            name: name.to_owned(),
            source: e,
        })?;

        if kubernetes {
            self.set(state::POD_ID, &id)?;
        } else {
            self.set(state::CONTAINER_ID, &id)?;
        }
        self.set(state::CONTAINER_NAME, name)
    }

    /// Best-effort removal of a same-named container that would block `docker run`.
    async fn discard_container(&self, name: &str) {
        if let Err(e) = self.client.remove_container(name).await {
            debug!(container = name, error = %e, "no previous container removed");
        }
    }

    fn container_spec(&self) -> ContainerSpec {
        let ctx = self.ctx;
        ContainerSpec {
            name: ctx.app.container_name.clone(),
            image: ctx.app.image_name().to_owned(),
            host_dir: ctx.host_dir(),
            app_port: ctx.config.runtime.app_port,
            debug_port: self.debug_port(),
            chart_dir: self.client.is_kubernetes().then(|| ctx.chart_dir()),
        }
    }

    // ── Application ──

    async fn build_application(
        &mut self,
        clean: bool,
        production: bool,
        full: bool,
        profile_args: &[String],
    ) -> Result<(), LifecycleError> {
        let mut args = vec![if full { "full" } else { "incremental" }.to_owned()];
        if clean {
            args.push("--clean".to_owned());
        }
        if production {
            args.push("--prod".to_owned());
        }
        args.extend(profile_args.iter().cloned());

        self.reporter
            .report(&self.ctx.app, StatusEvent::BuildStarted(BuildTarget::Application));

        let target = self.exec_target();
        match self.client.exec_script(&target, BUILD_SCRIPT, &args).await {
            Ok(_) => {
                self.set_flag(state::APP_BUILT, true)?;
                self.reporter.report(
                    &self.ctx.app,
                    StatusEvent::BuildSucceeded(BuildTarget::Application),
                );
                Ok(())
            }
            Err(e) => {
                self.set_flag(state::APP_BUILT, false)?;
                self.reporter.report(
                    &self.ctx.app,
                    StatusEvent::BuildFailed(BuildTarget::Application),
                );
                Err(LifecycleError::AppBuild { source: e })
            }
        }
    }

    async fn ensure_started(&mut self, restart: bool) -> Result<(), LifecycleError> {
        let verb = if restart { "restart" } else { "ensure-started" };
        self.reporter.report(&self.ctx.app, StatusEvent::AppStarting);
        let args = vec![verb.to_owned(), self.start_mode().to_owned()];
        self.lifecycle_script(&args)
            .await
            .map_err(|e| LifecycleError::AppSignal {
                signal: verb,
                source: e,
            })
    }

    async fn signal(&mut self, signal: AppSignal) -> Result<(), LifecycleError> {
        let mut args = vec![signal.as_str().to_owned(), self.start_mode().to_owned()];
        if signal == AppSignal::Debug {
            args.push(self.debug_port().to_string());
        }
        if matches!(signal, AppSignal::Start | AppSignal::Debug) {
            self.reporter.report(&self.ctx.app, StatusEvent::AppStarting);
        }

        self.lifecycle_script(&args)
            .await
            .map_err(|e| LifecycleError::AppSignal {
                signal: signal.as_str(),
                source: e,
            })?;

        if signal == AppSignal::Stop {
            self.reporter.report(&self.ctx.app, StatusEvent::AppStopped);
        }
        Ok(())
    }

    async fn lifecycle_script(&self, args: &[String]) -> Result<(), RuntimeError> {
        let target = self.exec_target();
        self.client
            .exec_script(&target, LIFECYCLE_SCRIPT, args)
            .await
            .map(|_| ())
    }

    // ── Helpers ──

    /// Pod name in Kubernetes mode, container name otherwise.
    fn exec_target(&self) -> String {
        let name = &self.ctx.app.container_name;
        if self.client.is_kubernetes() {
            self.store.get(state::POD_ID).unwrap_or(name.as_str()).to_owned()
        } else {
            name.clone()
        }
    }

    fn start_mode(&self) -> &str {
        self.store.get(state::START_MODE).unwrap_or("dev")
    }

    fn debug_port(&self) -> u16 {
        let configured = self.ctx.config.runtime.debug_port;
        match self.store.get(state::DEBUG_PORT).map(str::parse::<u16>) {
            Some(Ok(port)) => port,
            Some(Err(e)) => {
                warn!(error = %e, fallback = configured, "stored debug port is not a port number");
                configured
            }
            None => configured,
        }
    }

    fn ask(&self, question: &str) -> Result<bool, LifecycleError> {
        self.confirm
            .confirm(question)
            .map_err(|e| LifecycleError::Prompt { source: e })
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), LifecycleError> {
        self.store
            .set(key, value)
            .map_err(|e| LifecycleError::State { source: e })
    }

    fn set_flag(&mut self, key: &str, value: bool) -> Result<(), LifecycleError> {
        self.store
            .set_flag(key, value)
            .map_err(|e| LifecycleError::State { source: e })
    }

    fn remove(&mut self, key: &str) -> Result<(), LifecycleError> {
        self.store
            .remove(key)
            .map_err(|e| LifecycleError::State { source: e })
    }
}

/// Runtime output for a container, release or image that does not exist.
fn is_absent(err: &RuntimeError) -> bool {
    err.output().is_some_and(|out| {
        let out = out.to_ascii_lowercase();
        out.contains("no such") || out.contains("not found")
    })
}

fn tolerate_absent(name: &str, result: Result<(), RuntimeError>) -> Result<(), LifecycleError> {
    match result {
        Ok(()) => Ok(()),
        Err(e) if is_absent(&e) => {
            debug!(name, "nothing to remove");
            Ok(())
        }
        Err(e) => Err(LifecycleError::Cleanup {
            name: name.to_owned(),
            source: e,
        }),
    }
}
