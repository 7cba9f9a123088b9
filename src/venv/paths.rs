use std::path::{Path, PathBuf};

/// Layout of a virtual environment rooted at `venv`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VenvPaths {
    venv: PathBuf,
}

impl VenvPaths {
    pub fn new(venv: PathBuf) -> Self {
        Self { venv }
    }

    pub fn venv(&self) -> &Path {
        &self.venv
    }

    pub fn home(&self) -> PathBuf {
        self.venv.join("home")
    }

    pub fn usr(&self) -> PathBuf {
        self.venv.join("usr")
    }

    pub fn bin(&self) -> PathBuf {
        self.usr().join("bin")
    }

    pub fn lib(&self) -> PathBuf {
        self.usr().join("lib")
    }

    pub fn pkgconfig(&self) -> PathBuf {
        self.lib().join("pkgconfig")
    }

    pub fn include(&self) -> PathBuf {
        self.usr().join("include")
    }

    pub fn opt(&self) -> PathBuf {
        self.usr().join("opt")
    }

    pub fn share(&self) -> PathBuf {
        self.usr().join("share")
    }

    pub fn share_java(&self) -> PathBuf {
        self.share().join("java")
    }

    pub fn src(&self) -> PathBuf {
        self.venv.join("src")
    }

    pub fn project_src(&self, name: &str) -> PathBuf {
        self.src().join(name)
    }

    pub fn activate(&self) -> PathBuf {
        self.venv.join("activate")
    }
}
