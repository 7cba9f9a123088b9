use std::io::{self, Write};
use std::path::Path;

use log::debug;

use super::error::{ProfileError, ProfileResult};
use super::manager::ProfileLocation;
use super::merge::merge_trees;
use super::model::{Env, Profile};
use super::node::{Node, Tree, dump, parse_document};
use super::overrides::Override;
use super::project::{build_projects, env_from_tree};

/// Resolves the profile made of the YAML documents at `paths`.
///
/// Unknown source formats and invalid profiles are reported as such; any
/// other failure is reported as [`ProfileError::Parse`] wrapping its cause.
/// When `verbose`, the effective profile is printed to stdout.
pub fn resolve<P: AsRef<Path>>(
    paths: &[P],
    ignored: &[String],
    overrides: &[Override],
    verbose: bool,
) -> ProfileResult<Profile> {
    let locations: Vec<ProfileLocation> = paths
        .iter()
        .map(|path| ProfileLocation::File(path.as_ref().to_path_buf()))
        .collect();
    resolve_locations(&locations, ignored, overrides, verbose, &mut io::stdout())
}

/// Like [`resolve`], for documents from any location, writing the verbose
/// effective profile to `out`.
pub fn resolve_locations<W: Write>(
    locations: &[ProfileLocation],
    ignored: &[String],
    overrides: &[Override],
    verbose: bool,
    out: &mut W,
) -> ProfileResult<Profile> {
    resolve_inner(locations, ignored, overrides, verbose, out).map_err(ProfileError::into_parse)
}

fn resolve_inner<W: Write>(
    locations: &[ProfileLocation],
    ignored: &[String],
    overrides: &[Override],
    verbose: bool,
    out: &mut W,
) -> ProfileResult<Profile> {
    let mut root = Tree::new();
    for location in locations {
        debug!("merging profile document {}", location);
        merge_trees(&mut root, read_document(location)?)?;
    }

    for o in overrides {
        debug!("applying override {}", o);
        o.apply(&mut root)?;
    }

    if verbose {
        writeln!(out, "Effective profile:\n\n{}", dump(&root)?).map_err(ProfileError::parse)?;
    }

    let build_env = top_level_env(&root, "build-env")?;
    let virt_env = top_level_env(&root, "virt-env")?;
    let projects_node = match root.get("projects") {
        Some(Node::Mapping(projects)) => projects,
        Some(other) => {
            return Err(ProfileError::UnexpectedNode(format!(
                "projects must be a mapping, found {}",
                other.kind()
            )));
        }
        None => {
            return Err(ProfileError::UnexpectedNode(
                "missing \"projects\" property".into(),
            ));
        }
    };
    let projects = build_projects(projects_node, &build_env, ignored)?;

    let profile = Profile {
        virt_env,
        build_env,
        projects,
    };
    profile.validate()?;
    Ok(profile)
}

fn read_document(location: &ProfileLocation) -> ProfileResult<Tree> {
    let contents = location.read().map_err(|err| {
        ProfileError::parse(io::Error::new(
            err.kind(),
            format!("failed to read profile {}: {}", location, err),
        ))
    })?;
    parse_document(&contents)
}

fn top_level_env(root: &Tree, key: &str) -> ProfileResult<Env> {
    match root.get(key) {
        Some(Node::Mapping(env)) => env_from_tree(env, key),
        Some(Node::Null) | None => Ok(Env::new()),
        Some(Node::Scalar(_)) => Err(ProfileError::UnexpectedNode(format!(
            "{} must be a mapping",
            key
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;
    use std::fs;
    use std::path::PathBuf;

    use tempfile::TempDir;

    use super::*;
    use crate::profile::source::Source;

    fn write_docs(docs: &[&str]) -> (TempDir, Vec<PathBuf>) {
        let dir = TempDir::new().expect("tempdir");
        let paths = docs
            .iter()
            .enumerate()
            .map(|(index, doc)| {
                let path = dir.path().join(format!("doc{}.yml", index));
                fs::write(&path, doc).expect("write doc");
                path
            })
            .collect();
        (dir, paths)
    }

    fn overrides(exprs: &[&str]) -> Vec<Override> {
        exprs
            .iter()
            .map(|expr| expr.parse().expect("override"))
            .collect()
    }

    #[test]
    fn merges_source_and_configure_from_two_documents() {
        let (_dir, paths) = write_docs(&[
            "projects:\n  urcu:\n    source: https://example/urcu.tar.gz\n",
            "projects:\n  urcu:\n    configure: --disable-debug\n",
        ]);
        let profile = resolve(&paths, &[], &[], false).expect("resolve");
        assert_eq!(profile.projects.len(), 1);
        let urcu = profile.project("urcu").expect("urcu");
        assert_eq!(
            urcu.source(),
            &Source::Archive {
                url: "https://example/urcu.tar.gz".into()
            }
        );
        assert_eq!(urcu.configure(), "--disable-debug");
    }

    #[test]
    fn overrides_apply_after_merge_in_order() {
        let (_dir, paths) = write_docs(&[
            "build-env: {CFLAGS: -O2}\nvirt-env: {LTTNG_UST_DEBUG: 1}\nprojects:\n  lttng-ust:\n    source: git://git.lttng.org/lttng-ust.git\n    configure: --disable-man-pages\n",
        ]);
        let profile = resolve(
            &paths,
            &[],
            &overrides(&[
                "projects.lttng-ust.checkout=stable-2.8",
                "projects.lttng-ust.configure+=--enable-java-agent-jul",
                "build-env.CC=clang",
                "!virt-env.LTTNG_UST_DEBUG",
            ]),
            true,
        )
        .expect("resolve");
        let ust = profile.project("lttng-ust").unwrap();
        assert_eq!(
            ust.source(),
            &Source::Git {
                clone_url: "git://git.lttng.org/lttng-ust.git".into(),
                checkout: "stable-2.8".into()
            }
        );
        assert_eq!(ust.configure(), "--disable-man-pages --enable-java-agent-jul");
        assert_eq!(ust.build_env()["CC"], "clang");
        assert_eq!(profile.build_env["CFLAGS"], "-O2");
        assert!(profile.virt_env.is_empty());
    }

    #[test]
    fn null_project_does_not_trip_validation() {
        let (_dir, paths) = write_docs(&[
            "projects:\n  urcu: {source: 'git://x/urcu.git'}\n  not-a-project: {source: 'git://x/n.git'}\n",
            "projects:\n  not-a-project: ~\n",
        ]);
        let profile = resolve(&paths, &[], &[], false).expect("resolve");
        assert!(profile.has_project("urcu"));
        assert!(!profile.has_project("not-a-project"));
    }

    #[test]
    fn ignored_projects_are_dropped_before_validation() {
        let (_dir, paths) = write_docs(&[
            "projects:\n  urcu: {source: 'git://x/urcu.git'}\n  lttng-scope: {source: 'git://x/s.git'}\n",
        ]);
        let profile = resolve(&paths, &["lttng-scope".into()], &[], false).expect("resolve");
        assert_eq!(profile.projects.len(), 1);
    }

    #[test]
    fn unknown_project_name_is_invalid_profile() {
        let (_dir, paths) = write_docs(&["projects:\n  lttng-scope: {source: 'git://x/s.git'}\n"]);
        match resolve(&paths, &[], &[], false) {
            Err(ProfileError::InvalidProfile(msg)) => assert!(msg.contains("lttng-scope")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn unknown_source_format_propagates() {
        let (_dir, paths) = write_docs(&["projects:\n  urcu: {source: '/tmp/urcu'}\n"]);
        match resolve(&paths, &[], &[], false) {
            Err(ProfileError::UnknownSourceFormat(source)) => assert_eq!(source, "/tmp/urcu"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn other_failures_become_parse_errors() {
        let cases: &[(&[&str], &[&str])] = &[
            (&["projects: [\n"], &[]),
            (&["build-env: {CC: gcc}\n"], &[]),
            (&["projects: {urcu: {checkout: master}}\n"], &[]),
            (&["projects: {urcu: {source: 'git://x/u.git'}}\n"], &["!projects.popt"]),
            (
                &["projects: {urcu: {source: 'git://x/u.git'}}\n"],
                &["projects.urcu.source.deep=x"],
            ),
            (&["projects: {a: {b: c}}\n", "projects: {a: x}\n"], &[]),
        ];
        for (docs, exprs) in cases {
            let (_dir, paths) = write_docs(docs);
            let err = resolve(&paths, &[], &overrides(exprs), false).unwrap_err();
            assert!(
                matches!(err, ProfileError::Parse(_)),
                "{docs:?} {exprs:?} gave {err:?}"
            );
            assert!(err.source().is_some());
        }
    }

    #[test]
    fn missing_file_is_a_parse_error() {
        let err = resolve(&["/nonexistent/vlttng/profile.yml"], &[], &[], false).unwrap_err();
        assert!(matches!(err, ProfileError::Parse(_)));
    }

    #[test]
    fn resolution_is_repeatable() {
        let (_dir, paths) = write_docs(&[
            "build-env: {CC: gcc}\nprojects:\n  urcu: {source: 'git://x/urcu.git', configure: -a}\n  popt: {source: 'http://x/popt.tgz'}\n",
            "projects:\n  urcu: {configure: -b}\n",
        ]);
        let exprs = overrides(&["projects.urcu.configure+=-c"]);
        let first = resolve(&paths, &[], &exprs, false).expect("first");
        let second = resolve(&paths, &[], &exprs, false).expect("second");
        assert_eq!(first, second);
        assert_eq!(first.project("urcu").unwrap().configure(), "-a -b -c");
    }

    #[test]
    fn verbose_prints_the_effective_profile() {
        let (_dir, paths) = write_docs(&["projects: {urcu: {source: 'git://x/u.git'}}\n"]);
        let locations: Vec<ProfileLocation> =
            paths.into_iter().map(ProfileLocation::File).collect();
        let exprs = overrides(&["virt-env.FOO=bar"]);

        let mut out = Vec::new();
        resolve_locations(&locations, &[], &exprs, true, &mut out).expect("resolve");
        let printed = String::from_utf8(out).expect("utf-8");
        assert!(printed.starts_with("Effective profile:\n"));
        assert!(printed.contains("FOO: bar"));
        assert!(printed.contains("source: git://x/u.git"));

        let mut out = Vec::new();
        resolve_locations(&locations, &[], &exprs, false, &mut out).expect("resolve");
        assert!(out.is_empty());
    }

    #[test]
    fn bundled_documents_resolve() {
        let locations = [
            ProfileLocation::Bundled {
                name: "base",
                contents: "projects: {urcu: {source: 'git://x/u.git', configure: -a}}\n",
            },
            ProfileLocation::Bundled {
                name: "patch",
                contents: "projects: {urcu: {configure: -b}}\n",
            },
        ];
        let profile =
            resolve_locations(&locations, &[], &[], false, &mut io::sink()).expect("resolve");
        assert_eq!(profile.project("urcu").unwrap().configure(), "-a -b");
    }
}
