use std::path::Path;
use std::sync::Arc;

use idc_build::{DockerfileSet, WatchedFiles};
use idc_core::state;
use idc_core::{
    Action, AppContext, Decision, DecisionInput, KeyValueStore, LifecycleCommand, Observation, decide,
    new_fingerprint_if_changed,
};
use tracing::{debug, info, warn};

use crate::actions::ActionRunner;
use crate::client::RuntimeClient;
use crate::error::LifecycleError;
use crate::executor::{RuntimeExecutor, ShellExecutor};
use crate::prompt::{Confirm, ConsolePrompt};
use crate::status::{LogReporter, StatusReporter};

/// One application's lifecycle: observe the world, decide, act.
pub struct Lifecycle<E: RuntimeExecutor = ShellExecutor> {
    ctx: AppContext,
    client: RuntimeClient<E>,
    store: KeyValueStore,
    reporter: Arc<dyn StatusReporter>,
    confirm: Arc<dyn Confirm>,
}

impl Lifecycle<ShellExecutor> {
    /// Drive the real container runtime, elevated with `root_password` when set.
    pub fn new(ctx: AppContext, root_password: Option<String>) -> Self {
        let client = RuntimeClient::new(ctx.config.runtime.clone(), root_password);
        Self::with_client(ctx, client)
    }
}

impl<E: RuntimeExecutor> Lifecycle<E> {
    pub fn with_executor(ctx: AppContext, executor: E) -> Self {
        let client = RuntimeClient::with_executor(executor, ctx.config.runtime.clone());
        Self::with_client(ctx, client)
    }

    fn with_client(ctx: AppContext, client: RuntimeClient<E>) -> Self {
        let store = KeyValueStore::open(&ctx.state_dir, &ctx.app.id);
        Self {
            ctx,
            client,
            store,
            reporter: Arc::new(LogReporter),
            confirm: Arc::new(ConsolePrompt),
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn StatusReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_confirm(mut self, confirm: Arc<dyn Confirm>) -> Self {
        self.confirm = confirm;
        self
    }

    pub fn context(&self) -> &AppContext {
        &self.ctx
    }

    pub fn store(&self) -> &KeyValueStore {
        &self.store
    }

    pub fn client(&self) -> &RuntimeClient<E> {
        &self.client
    }

    /// Gather the decision inputs for `command`.
    ///
    /// Commands outside the build/run pipeline need nothing from the world,
    /// so nothing is queried for them.
    pub async fn observe(&self, command: &LifecycleCommand) -> Result<DecisionInput, LifecycleError> {
        let kubernetes = self.client.is_kubernetes();
        let mut input = DecisionInput {
            command: command.clone(),
            kubernetes,
            dockerfile: Observation::unchanged(),
            chart: Observation::unchanged(),
            build_descriptor: Observation::unchanged(),
            config_dir: Observation::unchanged(),
            container_built: self.store.get_flag(state::CONTAINER_BUILT),
            app_built: self.store.get_flag(state::APP_BUILT),
            image_present: false,
            container_running: false,
        };
        if !command.uses_pipeline() {
            return Ok(input);
        }

        let ctx = &self.ctx;
        let dockerfiles = DockerfileSet::resolve(&ctx.artifacts_dir, ctx.app_dir())
            .map_err(|e| LifecycleError::Dockerfile { source: e })?;
        let watched =
            WatchedFiles::discover(ctx.app_dir(), &ctx.config).map_err(LifecycleError::from_core)?;

        if matches!(command, LifecycleCommand::Build(_)) && !watched.has_build_descriptor() {
            return Err(LifecycleError::MissingBuildDescriptor(
                watched.build_descriptor.clone(),
            ));
        }

        input.dockerfile = self.observe_files(state::DOCKERFILE_HASH, dockerfiles.files())?;
        if kubernetes {
            input.chart = self.observe_files(state::CHART_DIR_HASH, &watched.chart_files)?;
        }
        input.build_descriptor = self.observe_files(
            state::BUILD_DESCRIPTOR_HASH,
            std::slice::from_ref(&watched.build_descriptor),
        )?;
        input.config_dir = self.observe_files(state::CONFIG_DIR_HASH, &watched.config_files)?;

        input.image_present = self
            .client
            .image_exists(ctx.app.image_name())
            .await
            .map_err(|e| LifecycleError::Runtime { source: e })?;
        input.container_running = self.container_running().await?;

        debug!(input = ?input, "observed");
        Ok(input)
    }

    fn observe_files<P: AsRef<Path>>(
        &self,
        key: &str,
        files: &[P],
    ) -> Result<Observation, LifecycleError> {
        let changed = new_fingerprint_if_changed(&self.store, key, files)
            .map_err(LifecycleError::from_core)?;
        Ok(Observation {
            changed,
            had_prior: self.store.contains(key),
        })
    }

    /// Whether the stored container (or pod) is running right now.
    pub async fn container_running(&self) -> Result<bool, LifecycleError> {
        let running = if self.client.is_kubernetes() {
            match self.store.get(state::POD_ID) {
                Some(pod) => self.client.pod_running(pod).await,
                None => Ok(false),
            }
        } else {
            match self.store.get(state::CONTAINER_ID) {
                Some(id) => self.client.container_running(id).await,
                None => Ok(false),
            }
        };
        running.map_err(|e| LifecycleError::Runtime { source: e })
    }

    pub async fn plan(&self, command: &LifecycleCommand) -> Result<Decision, LifecycleError> {
        let input = self.observe(command).await?;
        Ok(decide(&input))
    }

    /// Decide and execute `command`. Actions run in order; the first failure
    /// stops the command and leaves earlier effects in place.
    pub async fn run(&mut self, command: LifecycleCommand) -> Result<Decision, LifecycleError> {
        let decision = self.plan(&command).await?;
        info!(
            command = %command,
            app = %self.ctx.app.container_name,
            image_rebuild_required = decision.image_rebuild_required,
            container_build_required = decision.container_build_required,
            container_start_required = decision.container_start_required,
            actions = ?decision.action_names(),
            "lifecycle decision"
        );
        if command.uses_pipeline()
            && decision.container_start_required
            && !decision.contains(&Action::StartContainer)
        {
            warn!(app = %self.ctx.app.container_name, "no image is ready; run `idc build` first");
        }

        let mut runner = ActionRunner::new(
            &self.ctx,
            &self.client,
            &mut self.store,
            self.reporter.as_ref(),
            self.confirm.as_ref(),
        );
        for action in &decision.actions {
            runner.execute(action).await?;
        }
        Ok(decision)
    }
}
