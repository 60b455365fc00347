//! Lifecycle decision engine.
//!
//! [`decide`] is a pure function from the stored state, fresh fingerprint
//! observations and runtime query results to an ordered list of
//! [`Action`]s. Nothing here touches the filesystem or the container
//! runtime; the caller executes the actions afterwards.
//!
//! # Rules, in evaluation order
//!
//! ```text
//! 1. no stored Dockerfile fingerprint   -> RemoveStaleArtifacts, record fingerprint
//! 2. Dockerfile fingerprint changed     -> Refresh, record fingerprint   (image rebuild required)
//! 3. chart fingerprint changed (k8s)    -> Refresh, record fingerprint   (only if 2 did not fire)
//! 4. build && (rebuild || !built || !image)  -> BuildImage
//! 5. container not running             -> StartContainer (when an image is ready)
//! 6. command terminal actions
//! ```
//!
//! A planned refresh or stale cleanup means the image is gone and the
//! container is not running for every later rule.

use std::fmt;

use crate::fingerprint::Fingerprint;
use crate::state;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOptions {
    /// Full clean build of the application
    pub clean: bool,
    /// Build with the production profile
    pub production: bool,
    /// Extra arguments handed to the build tool
    pub profile_args: Vec<String>,
}

/// Commands that go through the decision engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleCommand {
    Build(BuildOptions),
    Start,
    Debug,
    Stop,
    Clean,
    Tail,
    ContainerRefresh,
    ContainerRemove,
    SystemCleanup,
}

impl LifecycleCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Build(_) => "build",
            Self::Start => "start",
            Self::Debug => "debug",
            Self::Stop => "stop",
            Self::Clean => "clean",
            Self::Tail => "tail",
            Self::ContainerRefresh => "container-refresh",
            Self::ContainerRemove => "container-remove",
            Self::SystemCleanup => "system-cleanup",
        }
    }

    /// Commands that run the build/start pipeline.
    pub fn uses_pipeline(&self) -> bool {
        !matches!(
            self,
            Self::ContainerRefresh | Self::ContainerRemove | Self::SystemCleanup
        )
    }

    fn signal(&self) -> Option<AppSignal> {
        match self {
            Self::Start => Some(AppSignal::Start),
            Self::Debug => Some(AppSignal::Debug),
            Self::Stop => Some(AppSignal::Stop),
            Self::Clean => Some(AppSignal::Clean),
            Self::Tail => Some(AppSignal::Tail),
            _ => None,
        }
    }
}

impl fmt::Display for LifecycleCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Lifecycle signal sent to the application inside a running container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppSignal {
    Start,
    Debug,
    Stop,
    Clean,
    Tail,
}

impl AppSignal {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Debug => "debug",
            Self::Stop => "stop",
            Self::Clean => "clean",
            Self::Tail => "tail",
        }
    }
}

/// One watched file set compared against its stored fingerprint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Observation {
    /// The fresh fingerprint when it differs from the stored one; `None` means unchanged.
    pub changed: Option<Fingerprint>,
    /// Whether any fingerprint was stored before this run.
    pub had_prior: bool,
}

impl Observation {
    pub fn unchanged() -> Self {
        Self {
            changed: None,
            had_prior: true,
        }
    }

    pub fn changed_to(fp: Fingerprint) -> Self {
        Self {
            changed: Some(fp),
            had_prior: true,
        }
    }

    pub fn first_seen(fp: Fingerprint) -> Self {
        Self {
            changed: Some(fp),
            had_prior: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionInput {
    pub command: LifecycleCommand,
    pub kubernetes: bool,
    pub dockerfile: Observation,
    pub chart: Observation,
    pub build_descriptor: Observation,
    pub config_dir: Observation,
    /// State flag: the image was built successfully at some point
    pub container_built: bool,
    /// State flag: the application was built successfully at some point
    pub app_built: bool,
    /// The runtime reports the image
    pub image_present: bool,
    /// The stored container (or pod) is running
    pub container_running: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Remove containers/images left behind under this application's generated name
    RemoveStaleArtifacts,
    /// Tear down the container or pod and delete its image
    Refresh,
    /// Persist a fingerprint under a state key
    RecordFingerprint {
        key: &'static str,
        value: Fingerprint,
    },
    BuildImage,
    StartContainer,
    BuildApplication {
        clean: bool,
        production: bool,
        full: bool,
        profile_args: Vec<String>,
    },
    EnsureApplicationStarted {
        restart: bool,
    },
    SignalApplication(AppSignal),
    RemoveContainer,
    SystemCleanup,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Self::RemoveStaleArtifacts => "remove-stale-artifacts",
            Self::Refresh => "refresh",
            Self::RecordFingerprint { .. } => "record-fingerprint",
            Self::BuildImage => "build-image",
            Self::StartContainer => "start-container",
            Self::BuildApplication { .. } => "build-application",
            Self::EnsureApplicationStarted { .. } => "ensure-application-started",
            Self::SignalApplication(_) => "signal-application",
            Self::RemoveContainer => "remove-container",
            Self::SystemCleanup => "system-cleanup",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Decision {
    /// Watched Dockerfile or chart content changed since the last build
    pub image_rebuild_required: bool,
    /// The image will be built during this command
    pub container_build_required: bool,
    /// The container is not running. A start is only planned when an image is ready.
    pub container_start_required: bool,
    pub actions: Vec<Action>,
}

impl Decision {
    pub fn contains(&self, action: &Action) -> bool {
        self.actions.contains(action)
    }

    /// Names of the planned actions, in order.
    pub fn action_names(&self) -> Vec<&'static str> {
        self.actions.iter().map(Action::name).collect()
    }
}

pub fn decide(input: &DecisionInput) -> Decision {
    let mut decision = Decision::default();

    let terminal = match &input.command {
        LifecycleCommand::ContainerRefresh => Some(Action::Refresh),
        LifecycleCommand::ContainerRemove => Some(Action::RemoveContainer),
        LifecycleCommand::SystemCleanup => Some(Action::SystemCleanup),
        _ => None,
    };
    if let Some(action) = terminal {
        decision.actions.push(action);
        return decision;
    }

    let torn_down = detect_content_changes(input, &mut decision);

    let image_present = input.image_present && !torn_down;
    let container_running = input.container_running && !torn_down;
    let container_built = input.container_built && !torn_down;

    let build_options = match &input.command {
        LifecycleCommand::Build(opts) => Some(opts),
        _ => None,
    };

    if build_options.is_some()
        && (decision.image_rebuild_required || !container_built || !image_present)
    {
        decision.container_build_required = true;
        decision.actions.push(Action::BuildImage);
    }

    let image_ready = decision.container_build_required || (container_built && image_present);

    decision.container_start_required = !container_running;
    if decision.container_start_required && image_ready {
        decision.actions.push(Action::StartContainer);
    }

    match build_options {
        Some(opts) => plan_application_build(input, opts, &mut decision),
        None => {
            if image_ready {
                if let Some(signal) = input.command.signal() {
                    decision.actions.push(Action::SignalApplication(signal));
                }
            }
        }
    }

    decision
}

/// Rules 1–3. Returns `true` when a planned action removes the container and image.
fn detect_content_changes(input: &DecisionInput, decision: &mut Decision) -> bool {
    let mut torn_down = false;

    if !input.dockerfile.had_prior {
        decision.actions.push(Action::RemoveStaleArtifacts);
        torn_down = true;
        if let Some(fp) = &input.dockerfile.changed {
            decision.actions.push(record(state::DOCKERFILE_HASH, fp));
        }
    } else if let Some(fp) = &input.dockerfile.changed {
        decision.image_rebuild_required = true;
        decision.actions.push(Action::Refresh);
        decision.actions.push(record(state::DOCKERFILE_HASH, fp));
        torn_down = true;
    }

    if input.kubernetes {
        if let Some(fp) = &input.chart.changed {
            if input.chart.had_prior && !decision.image_rebuild_required {
                decision.image_rebuild_required = true;
                decision.actions.push(Action::Refresh);
                torn_down = true;
            }
            decision.actions.push(record(state::CHART_DIR_HASH, fp));
        }
    }

    torn_down
}

fn plan_application_build(input: &DecisionInput, opts: &BuildOptions, decision: &mut Decision) {
    let descriptor_changed = input.build_descriptor.changed.is_some();
    let full = opts.clean || descriptor_changed || !input.app_built || decision.container_build_required;

    decision.actions.push(Action::BuildApplication {
        clean: opts.clean,
        production: opts.production,
        full,
        profile_args: opts.profile_args.clone(),
    });

    if let Some(fp) = &input.build_descriptor.changed {
        decision
            .actions
            .push(record(state::BUILD_DESCRIPTOR_HASH, fp));
    }
    if let Some(fp) = &input.config_dir.changed {
        decision.actions.push(record(state::CONFIG_DIR_HASH, fp));
    }

    let restart = input.config_dir.changed.is_some()
        && input.config_dir.had_prior
        && !decision.container_start_required;
    decision
        .actions
        .push(Action::EnsureApplicationStarted { restart });
}

fn record(key: &'static str, fp: &Fingerprint) -> Action {
    Action::RecordFingerprint {
        key,
        value: fp.clone(),
    }
}
