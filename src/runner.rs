use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{Context, Result};
use colored::Colorize;

use crate::profile::Env;
use crate::venv::env::{patch_env, quote_path};
use crate::venv::paths::VenvPaths;

/// Console output of a build, one colored line per event.
#[derive(Debug, Default)]
pub struct Console {
    first_info_done: bool,
}

impl Console {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prints an info comment; info blocks after the first are separated
    /// by a blank line.
    pub fn info(&mut self, msg: &str) {
        if self.first_info_done {
            println!();
        } else {
            self.first_info_done = true;
        }
        println!("{}", comment(msg).blue().bold());
    }

    pub fn warn(&self, msg: &str) {
        log::warn!("{}", msg);
        println!("{}", comment(&format!("Warning: {}", msg)).yellow().bold());
    }

    fn command(&self, cmd: &str) {
        println!("{}", cmd.bold());
    }

    fn cd(&self, path: &Path) {
        println!("{}", format!("cd {}", quote_path(path)).cyan().bold());
    }

    fn export(&self, key: &str, value: &str) {
        let line = format!("export {}={}", key.trim(), shell_words::quote(value));
        println!("{}", line.bright_black().bold());
    }
}

fn comment(msg: &str) -> String {
    format!("# {}", msg)
}

#[derive(Debug, Clone)]
pub struct RunnerOptions {
    pub verbose: bool,
    pub hide_export: bool,
    pub jobs: usize,
    pub dry_run: bool,
}

/// Runs shell commands in a tracked working directory and environment.
pub struct Runner {
    options: RunnerOptions,
    paths: VenvPaths,
    console: Console,
    cwd: Option<PathBuf>,
    env: Option<Env>,
    history: Vec<String>,
}

impl Runner {
    pub fn new(options: RunnerOptions, paths: VenvPaths, console: Console) -> Self {
        Self {
            options,
            paths,
            console,
            cwd: None,
            env: None,
            history: Vec::new(),
        }
    }

    pub fn console(&mut self) -> &mut Console {
        &mut self.console
    }

    pub fn cwd(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    pub fn env(&self) -> Option<&Env> {
        self.env.as_ref()
    }

    pub fn is_dry_run(&self) -> bool {
        self.options.dry_run
    }

    /// Every command line run (or planned, in dry-run mode) so far.
    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn run(&mut self, cmd: &str) -> Result<()> {
        self.console.command(cmd);
        self.history.push(cmd.to_string());
        if self.options.dry_run {
            return Ok(());
        }

        let mut command = Command::new("sh");
        command.arg("-c").arg(cmd);
        if let Some(cwd) = &self.cwd {
            command.current_dir(cwd);
        }
        if let Some(env) = &self.env {
            command.env_clear().envs(env);
        }
        if !self.options.verbose {
            command.stdout(Stdio::null()).stderr(Stdio::null());
        }

        let status = command
            .status()
            .with_context(|| format!("failed to run {:?}", cmd))?;
        if !status.success() {
            match status.code() {
                Some(code) => anyhow::bail!("command exited with status {}", code),
                None => anyhow::bail!("command terminated by signal: {}", cmd),
            }
        }
        Ok(())
    }

    pub fn sudo_run(&mut self, cmd: &str) -> Result<()> {
        self.run(&format!("sudo {}", cmd))
    }

    pub fn cd(&mut self, cwd: &Path) {
        self.console.cd(cwd);
        self.cwd = Some(cwd.to_path_buf());
    }

    /// Replaces the command environment with the process environment,
    /// overlaid with `env` and patched for the virtual environment.
    pub fn set_env(&mut self, env: &Env) {
        let mut full = process_env();
        full.extend(env.clone());
        patch_env(&mut full, &self.paths);
        if !self.options.hide_export {
            for (key, value) in &full {
                self.console.export(key, value);
            }
        }
        self.env = Some(full);
    }

    /// Sets one variable of the current command environment.
    pub fn set_var(&mut self, key: &str, value: &str) {
        if !self.options.hide_export {
            self.console.export(key, value);
        }
        self.env
            .get_or_insert_with(process_env)
            .insert(key.to_string(), value.to_string());
    }

    pub fn wget(&mut self, url: &str, output: &Path) -> Result<()> {
        let cmd = format!("wget {} -O {}", shell_words::quote(url), quote_path(output));
        self.run(&cmd)
    }

    pub fn git_clone(&mut self, clone_url: &str, path: &Path) -> Result<()> {
        let cmd = format!("git clone {} {}", shell_words::quote(clone_url), quote_path(path));
        self.run(&cmd)
    }

    pub fn git_checkout(&mut self, treeish: &str) -> Result<()> {
        self.run(&format!("git checkout {}", shell_words::quote(treeish)))
    }

    pub fn mkdir_p(&mut self, path: &Path) -> Result<()> {
        self.run(&format!("mkdir --verbose -p {}", quote_path(path)))
    }

    pub fn cp_rv(&mut self, src: &Path, dst: &Path) -> Result<()> {
        self.run(&format!("cp -rv {} {}", quote_path(src), quote_path(dst)))
    }

    pub fn ln_s(&mut self, target: &Path, link: &Path) -> Result<()> {
        self.run(&format!("ln -s {} {}", quote_path(target), quote_path(link)))
    }

    pub fn tar_x(&mut self, archive: &Path, output: &Path) -> Result<()> {
        self.run(&format!(
            "tar -xvf {} -C {} --strip-components=1",
            quote_path(archive),
            quote_path(output)
        ))
    }

    pub fn rm_rf(&mut self, path: &Path) -> Result<()> {
        let normalized = normalize(path);
        if protected_dirs().contains(&normalized) {
            anyhow::bail!("not removing protected directory {:?}", normalized);
        }
        self.run(&format!("rm -rf {}", quote_path(path)))
    }

    pub fn configure(&mut self, args: &str) -> Result<()> {
        let cmd = format!("./configure --prefix={} {}", quote_path(&self.paths.usr()), args);
        self.run(cmd.trim_end())
    }

    pub fn make(&mut self, target: Option<&str>, args: Option<&str>, sudo: bool) -> Result<()> {
        let mut cmd = format!("make -j{} V=1", self.options.jobs);
        if let Some(target) = target {
            cmd.push(' ');
            cmd.push_str(&shell_words::quote(target));
        }
        if let Some(args) = args {
            cmd.push(' ');
            cmd.push_str(args);
        }
        if sudo {
            self.sudo_run(&cmd)
        } else {
            self.run(&cmd)
        }
    }

    pub fn setuppy_install(&mut self) -> Result<()> {
        let cmd = format!("./setup.py install --prefix={}", quote_path(&self.paths.usr()));
        self.run(&cmd)
    }

    pub fn maven(&mut self, args: &str) -> Result<()> {
        self.run(&format!("mvn {}", args))
    }
}

/// The process environment, minus variables that are not valid UTF-8.
fn process_env() -> Env {
    std::env::vars_os()
        .filter_map(|(key, value)| match (key.into_string(), value.into_string()) {
            (Ok(key), Ok(value)) => Some((key, value)),
            (Ok(key), Err(_)) => {
                log::warn!("skipping environment variable {} with a non UTF-8 value", key);
                None
            }
            (Err(key), _) => {
                log::warn!("skipping non UTF-8 environment variable {:?}", key);
                None
            }
        })
        .collect()
}

fn normalize(path: &Path) -> PathBuf {
    path.components().collect()
}

fn protected_dirs() -> Vec<PathBuf> {
    let mut protected: Vec<PathBuf> = [
        "/", "/bin", "/boot", "/dev", "/etc", "/home", "/lib", "/lib64", "/opt", "/root", "/run",
        "/sbin", "/usr", "/var",
    ]
    .into_iter()
    .map(PathBuf::from)
    .collect();
    if let Some(home) = dirs::home_dir() {
        protected.push(normalize(&home));
    }
    protected
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn runner(dry_run: bool) -> Runner {
        Runner::new(
            RunnerOptions {
                verbose: false,
                hide_export: true,
                jobs: 4,
                dry_run,
            },
            VenvPaths::new(PathBuf::from("/tmp/venv")),
            Console::new(),
        )
    }

    #[test]
    fn dry_run_records_quoted_commands() {
        let mut runner = runner(true);
        runner
            .wget(
                "http://lttng.org/files/urcu/userspace-rcu-0.9.2.tar.bz2",
                Path::new("userspace-rcu-0.9.2.tar.bz2"),
            )
            .unwrap();
        runner
            .git_clone("git://git.lttng.org/lttng-ust.git", Path::new("lttng ust"))
            .unwrap();
        runner.configure("--disable-man-pages").unwrap();
        runner.configure("").unwrap();
        runner.make(None, None, false).unwrap();
        runner.make(Some("install"), None, true).unwrap();
        runner
            .make(Some("modules_install"), Some("INSTALL_MOD_PATH=/tmp/venv/usr"), false)
            .unwrap();

        assert_eq!(
            runner.history(),
            [
                "wget http://lttng.org/files/urcu/userspace-rcu-0.9.2.tar.bz2 -O userspace-rcu-0.9.2.tar.bz2",
                "git clone git://git.lttng.org/lttng-ust.git 'lttng ust'",
                "./configure --prefix=/tmp/venv/usr --disable-man-pages",
                "./configure --prefix=/tmp/venv/usr",
                "make -j4 V=1",
                "sudo make -j4 V=1 install",
                "make -j4 V=1 modules_install INSTALL_MOD_PATH=/tmp/venv/usr",
            ]
        );
    }

    #[test]
    fn refuses_to_remove_protected_directories() {
        let mut runner = runner(true);
        for dir in ["/", "/usr/", "/etc", "//var"] {
            assert!(runner.rm_rf(Path::new(dir)).is_err(), "{dir}");
        }
        if let Some(home) = dirs::home_dir() {
            assert!(runner.rm_rf(&home).is_err());
        }
        runner.rm_rf(Path::new("/tmp/venv")).expect("allowed");
        assert_eq!(runner.history(), ["rm -rf /tmp/venv"]);
    }

    #[test]
    fn set_env_overlays_and_patches() {
        let mut runner = runner(true);
        let mut env = Env::new();
        env.insert("CC".into(), "clang".into());
        env.insert("PATH".into(), "/bin".into());
        runner.set_env(&env);
        let full = runner.env().expect("env");
        assert_eq!(full["CC"], "clang");
        assert_eq!(full["PATH"], "/tmp/venv/usr/bin:/bin");

        runner.set_var("CLASSPATH", "/tmp/venv/usr/share/java/log4j.jar");
        let full = runner.env().expect("env");
        assert_eq!(full["CLASSPATH"], "/tmp/venv/usr/share/java/log4j.jar");
        assert_eq!(full["CC"], "clang");
    }

    #[test]
    fn runs_commands_in_cwd_with_env() {
        let dir = TempDir::new().expect("tempdir");
        let mut runner = runner(false);
        runner.cd(dir.path());
        let mut env = Env::new();
        env.insert("VLTTNG_TEST_VALUE".into(), "hello".into());
        runner.set_env(&env);
        runner
            .run("printf %s \"$VLTTNG_TEST_VALUE\" > out.txt")
            .expect("run");
        let written = std::fs::read_to_string(dir.path().join("out.txt")).unwrap();
        assert_eq!(written, "hello");
        assert_eq!(runner.cwd(), Some(dir.path()));
    }

    #[test]
    fn failing_command_reports_status() {
        let mut runner = runner(false);
        let err = runner.run("exit 3").unwrap_err();
        assert_eq!(err.to_string(), "command exited with status 3");
    }

    #[test]
    fn info_lines_are_separated_after_the_first() {
        let mut console = Console::new();
        assert!(!console.first_info_done);
        console.info("Create LTTng virtual environment");
        assert!(console.first_info_done);
    }

    #[test]
    fn non_utf8_process_variables_are_skipped() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let key = "VLTTNG_TEST_NON_UTF8";
        // SAFETY: no other test reads or writes this variable.
        unsafe { std::env::set_var(key, OsStr::from_bytes(b"\xff\xfe")) };

        let mut runner = runner(true);
        runner.set_env(&Env::new());
        let full = runner.env().expect("env");
        assert!(!full.contains_key(key));
        assert!(full.contains_key("PATH"));

        // SAFETY: as above.
        unsafe { std::env::remove_var(key) };
    }
}
