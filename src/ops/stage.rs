//! The staging pipeline.
//!
//! Runs, strictly in order: strategy detection, layout configuration,
//! version resolution, toolchain fetch and install, GOPATH preparation,
//! dependency population, then the compile step wrapped in hooks. Every
//! failure ends the run with one [`StagingError`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;

use crate::builder::command::{compose, default_install_packages};
use crate::builder::deps::DependencyFetcher;
use crate::builder::gopath::{self, GoEnv};
use crate::builder::hooks::HookRunner;
use crate::builder::toolchain;
use crate::core::app_tree::AppTree;
use crate::core::error::{BuildError, DependencyFetchError, StagingError};
use crate::core::manifest::{ToolchainManifest, GO};
use crate::core::plan::{binary_name, start_command, BuildPlan, StagingResult};
use crate::core::strategy::Detection;
use crate::detect::{self, rules::DEFAULT_SINGLE_FILE_PACKAGE};
use crate::ops::environment::{self, EnvToggles};
use crate::resolver;
use crate::sources::{ArtifactCache, ArtifactRef, CacheMode, Transport};
use crate::util::config::{buildpack_config_path, load_config, project_config_path, Config};
use crate::util::context::StagingContext;
use crate::util::process::{find_executable, Executor, ProcessBuilder};
use crate::util::shell::Shell;

/// Options for a staging run that do not come from configuration files.
#[derive(Debug, Clone, Default)]
pub struct StageOptions {
    /// Serve artifacts only from the buildpack's packaged dependencies.
    pub cached: bool,
}

/// Load the layered configuration for a context.
pub fn load_staging_config(ctx: &StagingContext) -> anyhow::Result<Config> {
    load_config(
        &buildpack_config_path(ctx.buildpack_dir()),
        &project_config_path(ctx.build_dir()),
        ctx.env(),
    )
}

/// Create the artifact gateway for a run.
pub fn artifact_cache(
    ctx: &StagingContext,
    cached: bool,
    transport: Arc<dyn Transport>,
) -> ArtifactCache {
    let mode = if cached {
        CacheMode::Offline {
            packaged: ctx.packaged_dependencies_dir(),
        }
    } else {
        CacheMode::Online
    };
    ArtifactCache::new(ctx.cache_dir(), mode, transport)
}

/// One staging run.
pub struct Stager<'a> {
    ctx: &'a StagingContext,
    config: Config,
    toggles: EnvToggles,
    cache: &'a ArtifactCache,
    executor: &'a dyn Executor,
    shell: &'a Shell,
}

impl<'a> Stager<'a> {
    pub fn new(
        ctx: &'a StagingContext,
        config: Config,
        cache: &'a ArtifactCache,
        executor: &'a dyn Executor,
        shell: &'a Shell,
    ) -> Self {
        Stager {
            toggles: EnvToggles::from_env(ctx.env()),
            ctx,
            config,
            cache,
            executor,
            shell,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn load_manifest(&self) -> Result<ToolchainManifest, StagingError> {
        Ok(ToolchainManifest::load(&self.ctx.manifest_path())?)
    }

    /// Decide everything about the run without fetching or building.
    pub fn plan(&self) -> Result<BuildPlan, StagingError> {
        let (tree, detection) = self.detect()?;
        let manifest = self.load_manifest()?;
        self.plan_with(&tree, detection, &manifest)
    }

    /// Runs before anything reads the buildpack.
    fn detect(&self) -> Result<(AppTree, Detection), StagingError> {
        let tree = AppTree::from_config(self.ctx.build_dir(), &self.config);
        let detection = detect::detect(&tree)?;
        Ok((tree, detection))
    }

    fn plan_with(
        &self,
        tree: &AppTree,
        detection: Detection,
        manifest: &ToolchainManifest,
    ) -> Result<BuildPlan, StagingError> {
        let layout = environment::configure(&self.toggles, self.ctx);

        let constraint = version_constraint(&self.config, &detection);
        let go_version = resolver::resolve(constraint, &manifest.versions(GO))?;
        tracing::info!(version = %go_version, "resolved go version");

        let Detection { strategy, metadata } = detection;
        let import_path = metadata
            .import_path
            .clone()
            .unwrap_or_else(|| DEFAULT_SINGLE_FILE_PACKAGE.to_string());
        let install_packages = default_install_packages(strategy, &metadata, &import_path);
        let binary = binary_name(&install_packages, &import_path);

        Ok(BuildPlan {
            toolchain_dir: layout.toolchain_dir(&go_version),
            go_version,
            strategy,
            metadata,
            install_packages,
            tags: self.config.tags(),
            buildmode: self.config.buildmode(),
            ldflags: self.config.ldflags(),
            layout,
            before_compile: self.config.hooks.before_compile.clone().unwrap_or_default(),
            after_compile: self.config.hooks.after_compile.clone().unwrap_or_default(),
            start_command: start_command(tree.procfile_web(), &binary),
            binary_name: binary,
            import_path,
        })
    }

    /// Run the whole pipeline.
    pub fn stage(&self) -> Result<StagingResult, StagingError> {
        let (tree, detection) = self.detect()?;
        let manifest = self.load_manifest()?;
        let plan = self.plan_with(&tree, detection, &manifest)?;
        let build_dir = self.ctx.build_dir();
        self.ctx.ensure_dirs()?;

        self.install_go(&plan, &manifest)?;

        let workspace = gopath::prepare(&plan, build_dir).map_err(BuildError::Workspace)?;
        let tool_bin = self.ctx.deps_dir().join("bin");
        let go_env = GoEnv::new(
            &plan.toolchain_dir,
            &workspace,
            &tool_bin,
            self.ctx.env().get("PATH").map(String::as_str),
            &plan,
        );
        let timeout = self.config.timeout();
        let prepare =
            |process: ProcessBuilder| go_env.apply(process.cwd(&workspace.workdir).timeout(timeout));

        let detection = Detection::new(plan.strategy, plan.metadata.clone());
        DependencyFetcher::new(self.executor, self.shell).populate(
            &detection,
            &workspace.workdir,
            |tool| self.locate_tool(tool, &manifest, &tool_bin),
            &prepare,
        )?;

        let resolve_hooks = |hooks: &[PathBuf]| -> Vec<PathBuf> {
            hooks.iter().map(|h| workspace.workdir.join(h)).collect()
        };
        let mut hooks = HookRunner::new(
            resolve_hooks(&plan.before_compile),
            resolve_hooks(&plan.after_compile),
            self.executor,
            self.shell,
        )
        .with_debug(self.toggles.debug)
        .with_prepare(&prepare);

        hooks.run(|| {
            let install = compose(&plan);
            self.shell.info(format_args!("Running: {}", install.display()));
            let process = prepare(install.to_process(&go_env.go_binary()));
            self.executor
                .run(&process, self.shell)
                .map_err(BuildError::Compile)?;
            Ok(())
        })?;

        environment::write_profile_scripts(&plan, build_dir)?;

        let result = StagingResult {
            binary_path: workspace.gobin.join(&plan.binary_name),
            start_command: plan.start_command.clone(),
            go_version: plan.go_version.clone(),
            strategy: plan.strategy,
        };
        self.shell
            .info(format_args!("Start command: {}", result.start_command));
        Ok(result)
    }

    fn install_go(&self, plan: &BuildPlan, manifest: &ToolchainManifest) -> Result<(), StagingError> {
        self.shell
            .step(format_args!("Installing go {}", plan.go_version));

        if toolchain::is_installed(&plan.toolchain_dir) {
            tracing::debug!(
                "go {} already installed at {}",
                plan.go_version,
                plan.toolchain_dir.display()
            );
            return Ok(());
        }

        let entry = manifest
            .entry(GO, &plan.go_version)
            .with_context(|| format!("go {} is missing from the manifest", plan.go_version))?;
        let archive = self.cache.fetch(&ArtifactRef::from(entry), self.shell)?;
        toolchain::install_toolchain(&archive, &plan.toolchain_dir).map_err(BuildError::Toolchain)?;
        Ok(())
    }

    /// Install a vendor tool from the manifest, or fall back to `PATH`.
    fn locate_tool(
        &self,
        tool: &str,
        manifest: &ToolchainManifest,
        bin_dir: &Path,
    ) -> Result<PathBuf, DependencyFetchError> {
        let Some(entry) = manifest.latest(tool) else {
            return find_executable(tool).ok_or_else(|| DependencyFetchError::ToolNotFound {
                tool: tool.to_string(),
            });
        };

        self.shell
            .step(format_args!("Installing {} {}", tool, entry.version));
        let artifact = self
            .cache
            .fetch(&ArtifactRef::from(entry), self.shell)
            .map_err(|source| DependencyFetchError::ToolInstall {
                tool: tool.to_string(),
                source,
            })?;
        toolchain::install_tool(&artifact, entry.is_tarball(), bin_dir, tool).map_err(|source| {
            DependencyFetchError::ToolUnpack {
                tool: tool.to_string(),
                source,
            }
        })
    }
}

/// Pick the version constraint: configuration (including `GOVERSION`)
/// first, then whatever a marker file declares.
pub fn version_constraint<'c>(config: &'c Config, detection: &'c Detection) -> Option<&'c str> {
    config
        .go
        .version
        .as_deref()
        .or(detection.metadata.go_version.as_deref())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Print the canonical failure lines of a staging error.
pub fn report_failure(shell: &Shell, err: &StagingError) {
    if let Some(output) = err.process_output() {
        tracing::debug!("failed process output:\n{}", output);
    }
    shell.error(err.canonical_message());
    if let Some(help) = err.help() {
        shell.error(help);
    }
}

/// Convenience entry point: load configuration, build the gateway and run.
pub fn stage(
    ctx: &StagingContext,
    opts: &StageOptions,
    transport: Arc<dyn Transport>,
    executor: &dyn Executor,
    shell: &Shell,
) -> Result<StagingResult, StagingError> {
    let result = load_staging_config(ctx)
        .map_err(StagingError::from)
        .and_then(|config| {
            let cache = artifact_cache(ctx, opts.cached || config.cached(), transport);
            Stager::new(ctx, config, &cache, executor, shell).stage()
        });
    if let Err(err) = &result {
        report_failure(shell, err);
    }
    result
}
