use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::paths::VenvPaths;
use crate::profile::Env;

/// Points the usual search-path variables of `env` at the virtual environment.
pub fn patch_env(env: &mut Env, paths: &VenvPaths) {
    prepend_path(env, "PATH", &paths.bin());
    append_flag(env, "CPPFLAGS", &format!("-I{}", quote_path(&paths.include())));
    append_flag(env, "LDFLAGS", &format!("-L{}", quote_path(&paths.lib())));
    prepend_path(env, "LD_LIBRARY_PATH", &paths.lib());
    prepend_path(env, "PKG_CONFIG_PATH", &paths.pkgconfig());

    let site_packages = site_packages(&paths.lib());
    if !site_packages.is_empty() {
        let joined = site_packages
            .iter()
            .map(|path| path.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(":");
        prepend(env, "PYTHONPATH", &joined);
    }
}

/// `lib/python*/…-packages` directories, sorted.
pub fn site_packages(lib: &Path) -> Vec<PathBuf> {
    if !lib.is_dir() {
        return Vec::new();
    }
    WalkDir::new(lib)
        .min_depth(2)
        .max_depth(2)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_dir())
        .filter(|entry| {
            let in_python_root = entry
                .path()
                .parent()
                .and_then(|parent| parent.file_name())
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with("python"));
            let is_packages = entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.ends_with("-packages"));
            in_python_root && is_packages
        })
        .map(|entry| entry.into_path())
        .collect()
}

pub fn quote_path(path: &Path) -> String {
    shell_words::quote(&path.to_string_lossy()).into_owned()
}

fn prepend_path(env: &mut Env, key: &str, path: &Path) {
    prepend(env, key, &path.to_string_lossy());
}

fn prepend(env: &mut Env, key: &str, value: &str) {
    let current = env.get(key).map(String::as_str).unwrap_or_default();
    let patched = if current.is_empty() {
        value.to_string()
    } else {
        format!("{}:{}", value, current)
    };
    env.insert(key.to_string(), patched);
}

fn append_flag(env: &mut Env, key: &str, flag: &str) {
    let current = env.get(key).map(|v| v.trim()).unwrap_or_default();
    let patched = if current.is_empty() {
        flag.to_string()
    } else {
        format!("{} {}", current, flag)
    };
    env.insert(key.to_string(), patched);
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn patches_search_paths() {
        let paths = VenvPaths::new(PathBuf::from("/tmp/my venv"));
        let mut env = Env::new();
        env.insert("PATH".into(), "/usr/bin:/bin".into());
        env.insert("LDFLAGS".into(), "-Wl,--as-needed".into());
        patch_env(&mut env, &paths);

        assert_eq!(env["PATH"], "/tmp/my venv/usr/bin:/usr/bin:/bin");
        assert_eq!(env["CPPFLAGS"], "-I'/tmp/my venv/usr/include'");
        assert_eq!(env["LDFLAGS"], "-Wl,--as-needed -L'/tmp/my venv/usr/lib'");
        assert_eq!(env["LD_LIBRARY_PATH"], "/tmp/my venv/usr/lib");
        assert_eq!(env["PKG_CONFIG_PATH"], "/tmp/my venv/usr/lib/pkgconfig");
        assert!(!env.contains_key("PYTHONPATH"));
    }

    #[test]
    fn finds_python_site_packages() {
        let dir = TempDir::new().expect("tempdir");
        let paths = VenvPaths::new(dir.path().to_path_buf());
        let lib = paths.lib();
        fs::create_dir_all(lib.join("python3.5/site-packages")).unwrap();
        fs::create_dir_all(lib.join("python2.7/dist-packages")).unwrap();
        fs::create_dir_all(lib.join("pkgconfig/site-packages")).unwrap();
        fs::create_dir_all(lib.join("python3.5/config")).unwrap();

        let found = site_packages(&lib);
        assert_eq!(
            found,
            vec![
                lib.join("python2.7/dist-packages"),
                lib.join("python3.5/site-packages")
            ]
        );

        let mut env = Env::new();
        env.insert("PYTHONPATH".into(), "/old".into());
        patch_env(&mut env, &paths);
        assert_eq!(
            env["PYTHONPATH"],
            format!(
                "{}:{}:/old",
                lib.join("python2.7/dist-packages").display(),
                lib.join("python3.5/site-packages").display()
            )
        );
    }
}
