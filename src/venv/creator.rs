use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::info;

use super::activate::render_activate;
use super::env::quote_path;
use super::paths::VenvPaths;
use crate::profile::{Profile, Project, Source};
use crate::runner::{Console, Runner, RunnerOptions};

const BOOTSTRAP_SCRIPTS: &[&str] = &["bootstrap", "bootstrap.sh", "autogen", "autogen.sh"];
const LOG4J_NAME: &str = "log4j-1.2.17";
const LOG4J_URL: &str = "http://archive.apache.org/dist/logging/log4j/1.2.17/log4j-1.2.17.tar.gz";
const TRACECOMPASS_RCP_PRODUCT: &str = "rcp/org.eclipse.tracecompass.rcp.product/target/products/org.eclipse.tracecompass.rcp/linux/gtk/x86_64/trace-compass";

#[derive(Debug, Clone)]
pub struct CreateOptions {
    pub force: bool,
    pub verbose: bool,
    pub hide_export: bool,
    pub jobs: usize,
    pub dry_run: bool,
}

/// Builds the projects of a profile into a virtual environment.
pub struct VenvCreator {
    paths: VenvPaths,
    runner: Runner,
    profile: Profile,
    force: bool,
    src_paths: BTreeMap<String, PathBuf>,
}

impl VenvCreator {
    pub fn new(path: &Path, profile: Profile, options: CreateOptions) -> Result<Self> {
        let venv = std::path::absolute(path)
            .with_context(|| format!("failed to make {:?} absolute", path))?;
        let paths = VenvPaths::new(venv);
        let runner = Runner::new(
            RunnerOptions {
                verbose: options.verbose,
                hide_export: options.hide_export,
                jobs: options.jobs.max(1),
                dry_run: options.dry_run,
            },
            paths.clone(),
            Console::new(),
        );
        Ok(Self {
            paths,
            runner,
            profile,
            force: options.force,
            src_paths: BTreeMap::new(),
        })
    }

    pub fn runner(&self) -> &Runner {
        &self.runner
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn create(&mut self) -> Result<()> {
        self.validate_profile();
        self.runner
            .console()
            .info("Create LTTng virtual environment");

        let venv = self.paths.venv().to_path_buf();
        if venv.exists() {
            if !self.force {
                anyhow::bail!("virtual environment path {:?} exists", venv);
            }
            self.warn(&format!(
                "Virtual environment path {:?} exists: removing directory",
                venv
            ));
            self.runner.rm_rf(&venv)?;
        }

        for dir in [
            venv.clone(),
            self.paths.home(),
            self.paths.bin(),
            self.paths.lib(),
            self.paths.include(),
            self.paths.opt(),
            self.paths.share_java(),
        ] {
            self.runner.mkdir_p(&dir)?;
        }

        self.runner.console().info("Fetch sources");
        self.fetch_sources()?;

        self.build_project("urcu", |c, p| c.configure_make_install(p, None))?;
        self.build_lttng_ust()?;
        self.build_project("libxml2", |c, p| c.configure_make_install(p, None))?;
        self.build_lttng_tools()?;
        self.build_lttng_modules()?;
        self.build_project("glib", |c, p| c.configure_make_install(p, None))?;
        self.build_project("elfutils", |c, p| c.configure_make_install(p, None))?;
        self.build_project("babeltrace", |c, p| c.configure_make_install(p, None))?;
        self.build_project("lttng-analyses", |c, _| c.runner.setuppy_install())?;
        self.build_tracecompass()?;

        self.create_activate()
    }

    fn warn(&mut self, msg: &str) {
        self.runner.console().warn(msg);
    }

    /// Warns about dependencies taken from the system and makes Babeltrace
    /// build its Python bindings when LTTng analyses need them.
    fn validate_profile(&mut self) {
        let has = |name: &str| self.profile.has_project(name);
        let mut warnings = Vec::new();

        if (has("lttng-tools") || has("lttng-ust")) && !has("urcu") {
            warnings.push(
                "The \"lttng-tools\"/\"lttng-ust\" project will use the system's Userspace RCU"
                    .to_string(),
            );
        }

        if has("lttng-analyses") {
            if !has("babeltrace") {
                warnings
                    .push("The \"lttng-analyses\" project will use the system's Babeltrace".into());
            } else if let Some(babeltrace) = self.profile.project("babeltrace")
                && !has_python_bindings(babeltrace.configure())
            {
                warnings.push("Configuring \"babeltrace\" project with \"--enable-python-bindings\" (caused by \"lttng-analyses\")".into());
            }
        }

        if let Some(babeltrace) = self.profile.project("babeltrace") {
            if !has("glib") {
                warnings.push("The \"babeltrace\" project will use the system's GLib".into());
            }
            let configure = babeltrace.configure();
            let debug_info = configure.contains("--enable-debug-info")
                || !configure.contains("--disable-debug-info");
            if debug_info && !has("elfutils") {
                warnings.push("The \"babeltrace\" project will use the system's elfutils".into());
            }
        }

        if has("lttng-tools") && !has("libxml2") {
            warnings.push("The \"lttng-tools\" project will use the system's libxml2".into());
        }

        for warning in warnings {
            self.warn(&warning);
        }

        if self.profile.has_project("lttng-analyses")
            && let Some(babeltrace) = self.profile.project_mut("babeltrace")
        {
            let configure = enable_python_bindings(babeltrace.configure());
            babeltrace.set_configure(configure);
        }
    }

    fn fetch_sources(&mut self) -> Result<()> {
        let src = self.paths.src();
        self.runner.mkdir_p(&src)?;
        self.runner.cd(&src);

        let projects: Vec<Project> = self.profile.projects.values().cloned().collect();
        for project in projects {
            let name = project.name();
            let project_src = self.paths.project_src(name);
            match project.source() {
                Source::Archive { url } => {
                    let file_name = project
                        .source()
                        .archive_file_name()
                        .with_context(|| format!("no file name in URL \"{}\"", url))?;
                    self.runner.wget(url, Path::new(file_name))?;
                    self.runner.mkdir_p(&project_src)?;
                    self.runner.tar_x(Path::new(file_name), Path::new(name))?;
                }
                Source::Git {
                    clone_url,
                    checkout,
                } => {
                    self.runner.git_clone(clone_url, Path::new(name))?;
                    self.runner.cd(&project_src);
                    self.runner.git_checkout(checkout)?;
                    self.runner.cd(&src);
                }
            }
            self.src_paths.insert(name.to_string(), project_src);
        }
        Ok(())
    }

    fn build_project<F>(&mut self, name: &str, build: F) -> Result<()>
    where
        F: FnOnce(&mut Self, &Project) -> Result<()>,
    {
        let Some(project) = self.profile.project(name).cloned() else {
            return Ok(());
        };
        self.runner
            .console()
            .info(&format!("Build and install {}", name));
        let src = self
            .src_paths
            .get(name)
            .cloned()
            .with_context(|| format!("no source directory for project \"{}\"", name))?;
        self.runner.cd(&src);
        self.runner.set_env(project.build_env());
        info!("building {} from {}", name, project.source());
        build(self, &project).with_context(|| format!("failed to build project \"{}\"", name))
    }

    fn configure_make_install(&mut self, project: &Project, extra_args: Option<&str>) -> Result<()> {
        let src = self.paths.project_src(project.name());
        if let Some(script) = BOOTSTRAP_SCRIPTS
            .iter()
            .find(|script| src.join(script).is_file())
        {
            self.runner.run(&format!("./{}", script))?;
        }

        if project.configure().contains("--prefix") {
            self.warn(&format!(
                "Project \"{}\": I would not pass the --prefix configure option if I were you: it is handled by vlttng",
                project.name()
            ));
        }

        let mut args = project.configure().to_string();
        if let Some(extra) = extra_args {
            if !args.is_empty() {
                args.push(' ');
            }
            args.push_str(extra);
        }
        self.runner.configure(&args)?;
        self.runner.make(None, None, false)?;
        self.runner.make(Some("install"), None, false)
    }

    fn build_lttng_tools(&mut self) -> Result<()> {
        let Some(project) = self.profile.project("lttng-tools") else {
            return Ok(());
        };
        let configure = project.configure();
        if configure.contains("--with-lttng-ust-prefix") || configure.contains("--without-lttng-ust")
        {
            self.warn("I would not pass the --with-lttng-ust-prefix/--without-lttng-ust configure option if I were you: they are handled by vlttng");
        }
        let extra = if self.profile.has_project("lttng-ust") {
            format!("--with-lttng-ust-prefix={}", quote_path(&self.paths.usr()))
        } else {
            "--without-lttng-ust".to_string()
        };
        self.build_project("lttng-tools", |c, p| c.configure_make_install(p, Some(&extra)))
    }

    fn build_lttng_ust(&mut self) -> Result<()> {
        self.build_project("lttng-ust", |c, project| {
            let configure = project.configure();
            if configure.contains("--enable-java-agent-all")
                || configure.contains("--enable-java-agent-log4j")
            {
                c.install_log4j()?;
            }
            c.configure_make_install(project, None)
        })
    }

    fn install_log4j(&mut self) -> Result<()> {
        let cwd = self.runner.cwd().map(Path::to_path_buf);
        let tarball = format!("{}.tar.gz", LOG4J_NAME);
        let installed_jar = self.paths.share_java().join("log4j.jar");

        self.runner.cd(&self.paths.src());
        self.runner.wget(LOG4J_URL, Path::new(&tarball))?;
        self.runner.mkdir_p(Path::new(LOG4J_NAME))?;
        self.runner
            .tar_x(Path::new(&tarball), Path::new(LOG4J_NAME))?;
        self.runner.cp_rv(
            &Path::new(LOG4J_NAME).join(format!("{}.jar", LOG4J_NAME)),
            &installed_jar,
        )?;

        let current = self
            .runner
            .env()
            .and_then(|env| env.get("CLASSPATH"))
            .cloned()
            .unwrap_or_default();
        let classpath = if current.is_empty() {
            installed_jar.to_string_lossy().into_owned()
        } else {
            format!("{}:{}", installed_jar.to_string_lossy(), current)
        };
        self.runner.set_var("CLASSPATH", &classpath);

        if let Some(cwd) = cwd {
            self.runner.cd(&cwd);
        }
        Ok(())
    }

    fn build_lttng_modules(&mut self) -> Result<()> {
        self.build_project("lttng-modules", |c, _| {
            let usr = quote_path(&c.paths.usr());
            c.runner.make(None, None, false)?;
            c.runner.make(
                Some("modules_install"),
                Some(&format!("INSTALL_MOD_PATH={}", usr)),
                false,
            )?;
            c.runner.run(&format!("depmod --all --basedir {}", usr))
        })
    }

    fn build_tracecompass(&mut self) -> Result<()> {
        let Some(project) = self.profile.project("tracecompass") else {
            return Ok(());
        };
        let from_archive = matches!(project.source(), Source::Archive { .. });
        self.build_project("tracecompass", move |c, project| {
            let src = if from_archive {
                c.paths.project_src(project.name())
            } else {
                c.runner.maven("clean install -Dmaven.test.skip=true")?;
                PathBuf::from(TRACECOMPASS_RCP_PRODUCT)
            };
            let dst = c.paths.opt().join("tracecompass");
            c.runner.cp_rv(&src, &dst)?;
            c.runner
                .ln_s(&dst.join("tracecompass"), &c.paths.bin().join("tracecompass"))
        })
    }

    fn create_activate(&mut self) -> Result<()> {
        let activate = render_activate(&self.profile, &self.paths)?;
        let path = self.paths.activate();
        self.runner
            .console()
            .info(&format!("Create activation script {:?}", path));
        if self.runner.is_dry_run() {
            return Ok(());
        }
        fs::write(&path, activate)
            .with_context(|| format!("failed to write activation script at {:?}", path))
    }
}

fn has_python_bindings(configure: &str) -> bool {
    configure.contains("--enable-python-bindings")
        && !configure.contains("--enable-python-bindings=no")
        && !configure.contains("--disable-python-bindings")
}

/// Forces `--enable-python-bindings` into a Babeltrace configure line.
fn enable_python_bindings(configure: &str) -> String {
    if has_python_bindings(configure) {
        return configure.to_string();
    }
    let mut args: Vec<&str> = configure
        .split_whitespace()
        .filter(|arg| {
            !matches!(
                *arg,
                "--disable-python-bindings"
                    | "--enable-python-bindings=no"
                    | "--enable-python-bindings"
            )
        })
        .collect();
    args.push("--enable-python-bindings");
    args.join(" ")
}
