use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::bundled::BUNDLED_PROFILES;

const PROFILE_EXTENSIONS: &[&str] = &["yml", "yaml"];

/// Where a profile document is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileLocation {
    File(PathBuf),
    Bundled {
        name: &'static str,
        contents: &'static str,
    },
}

impl ProfileLocation {
    pub fn read(&self) -> io::Result<Cow<'static, str>> {
        match self {
            ProfileLocation::File(path) => fs::read_to_string(path).map(Cow::Owned),
            ProfileLocation::Bundled { contents, .. } => Ok(Cow::Borrowed(contents)),
        }
    }
}

impl fmt::Display for ProfileLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileLocation::File(path) => write!(f, "{:?}", path),
            ProfileLocation::Bundled { name, .. } => write!(f, "bundled profile \"{}\"", name),
        }
    }
}

/// Looks up profile documents by name in a list of directories, then in
/// the bundled set when enabled.
pub struct ProfileManager {
    dirs: Vec<PathBuf>,
    bundled: &'static [(&'static str, &'static str)],
}

impl ProfileManager {
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self { dirs, bundled: &[] }
    }

    /// Also searches the profiles shipped with vlttng, after `dirs`.
    pub fn with_bundled(mut self) -> Self {
        self.bundled = BUNDLED_PROFILES;
        self
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// Names of all profiles found in the search directories.
    pub fn list(&self) -> Result<Vec<String>> {
        let mut profiles = BTreeSet::new();
        for dir in &self.dirs {
            if !dir.is_dir() {
                continue;
            }
            for ext in PROFILE_EXTENSIONS {
                let pattern = dir.join(format!("*.{}", ext));
                let pattern = pattern
                    .to_str()
                    .with_context(|| format!("non UTF-8 profile directory {:?}", dir))?;
                for entry in glob::glob(pattern)
                    .with_context(|| format!("invalid profile pattern {:?}", pattern))?
                {
                    let path = entry?;
                    if path.is_file()
                        && let Some(stem) = path.file_stem().and_then(|s| s.to_str())
                    {
                        profiles.insert(stem.to_string());
                    }
                }
            }
        }
        profiles.extend(self.bundled.iter().map(|(name, _)| name.to_string()));
        Ok(profiles.into_iter().collect())
    }

    /// Finds the document for a profile name, falling back to `name` as a path.
    pub fn find(&self, name: &str) -> Result<ProfileLocation> {
        for dir in &self.dirs {
            for ext in PROFILE_EXTENSIONS {
                let candidate = dir.join(format!("{}.{}", name, ext));
                if candidate.is_file() {
                    return Ok(ProfileLocation::File(candidate));
                }
            }
        }
        if let Some(&(name, contents)) = self.bundled.iter().find(|(bundled, _)| *bundled == name)
        {
            return Ok(ProfileLocation::Bundled { name, contents });
        }
        let path = Path::new(name);
        if path.is_file() {
            return Ok(ProfileLocation::File(path.to_path_buf()));
        }
        anyhow::bail!("cannot find profile \"{}\"", name)
    }

    pub fn find_all(&self, names: &[String]) -> Result<Vec<ProfileLocation>> {
        names.iter().map(|name| self.find(name)).collect()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn lists_and_finds_profiles() {
        let user = TempDir::new().expect("tempdir");
        let bundled = TempDir::new().expect("tempdir");
        fs::write(user.path().join("urcu-master.yml"), "projects: {}\n").unwrap();
        fs::write(user.path().join("notes.txt"), "").unwrap();
        fs::write(bundled.path().join("urcu-master.yml"), "projects: {}\n").unwrap();
        fs::write(bundled.path().join("lttng-stable-2.8.yaml"), "projects: {}\n").unwrap();

        let manager = ProfileManager::new(vec![
            user.path().to_path_buf(),
            bundled.path().to_path_buf(),
            PathBuf::from("/nonexistent/vlttng"),
        ]);
        assert_eq!(
            manager.list().expect("list"),
            vec!["lttng-stable-2.8".to_string(), "urcu-master".to_string()]
        );
        assert_eq!(
            manager.find("urcu-master").expect("find"),
            ProfileLocation::File(user.path().join("urcu-master.yml"))
        );
        assert_eq!(
            manager.find("lttng-stable-2.8").expect("find"),
            ProfileLocation::File(bundled.path().join("lttng-stable-2.8.yaml"))
        );
    }

    #[test]
    fn falls_back_to_paths() {
        let dir = TempDir::new().expect("tempdir");
        let custom = dir.path().join("custom.profile");
        fs::write(&custom, "projects: {}\n").unwrap();
        let manager = ProfileManager::new(Vec::new());
        assert_eq!(
            manager.find(custom.to_str().unwrap()).expect("find"),
            ProfileLocation::File(custom)
        );

        let err = manager.find("does-not-exist").unwrap_err();
        assert_eq!(err.to_string(), "cannot find profile \"does-not-exist\"");
    }

    #[test]
    fn bundled_profiles_come_after_directories() {
        let user = TempDir::new().expect("tempdir");
        fs::write(user.path().join("urcu-master.yml"), "projects: {}\n").unwrap();

        let plain = ProfileManager::new(vec![user.path().to_path_buf()]);
        assert_eq!(plain.list().expect("list"), vec!["urcu-master".to_string()]);
        assert!(plain.find("lttng-stable-2.8").is_err());

        let manager = ProfileManager::new(vec![user.path().to_path_buf()]).with_bundled();
        let names = manager.list().expect("list");
        assert!(names.contains(&"lttng-stable-2.8".to_string()));
        assert_eq!(names.iter().filter(|n| *n == "urcu-master").count(), 1);

        assert_eq!(
            manager.find("urcu-master").expect("find"),
            ProfileLocation::File(user.path().join("urcu-master.yml"))
        );
        let bundled = manager.find("lttng-stable-2.8").expect("find");
        assert!(matches!(bundled, ProfileLocation::Bundled { name: "lttng-stable-2.8", .. }));
        assert!(bundled.read().expect("read").contains("lttng-tools"));
        assert_eq!(bundled.to_string(), "bundled profile \"lttng-stable-2.8\"");
    }
}
