//! Running freshly downloaded binaries before anything is installed.
//!
//! Some tools only ship their completion scripts or man pages through the
//! binary itself (`starship completions zsh`, `dasel man`). The resolved
//! binaries are staged into a scratch directory with executable permissions,
//! the [`PostStep`]s of the tool are run there, and the scratch directory is
//! removed afterwards.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::artifact::{BIN_MODE, InstallArtifact, InstallationTarget, set_mode};
use crate::errors::{PullError, Result};
use crate::spec::{AppSpec, Install, PostStep, man_section};

/// Runs every post-processing step of `spec`, adding the generated files to `target`.
///
/// # Errors
///
/// Returns [`PullError::PostProcess`] if staging fails, a command cannot be
/// started, exits unsuccessfully or produces nothing.
pub fn run(spec: &AppSpec, target: &mut InstallationTarget) -> Result<()> {
    if spec.post.is_empty() {
        return Ok(());
    }

    let scratch = tempfile::Builder::new()
        .prefix("usr-local-pull-")
        .tempdir()
        .map_err(|e| PullError::post_process(format!("failed to create scratch directory: {e}")))?;
    let bin_dir = stage_binaries(scratch.path(), target)?;

    for step in spec.post {
        match *step {
            PostStep::Completion { binary, args, app } => {
                let output = run_staged(&bin_dir, binary, args.iter().copied())?;
                if output.iter().all(u8::is_ascii_whitespace) {
                    return Err(PullError::post_process(format!(
                        "`{binary} {}` printed no completion script",
                        args.join(" ")
                    )));
                }
                tracing::debug!(app = spec.name, binary, "generated completion script");
                target.push(Install::Completion(app).artifact(app, output), spec.binary);
            }
            PostStep::ManPages { binary, args } => {
                let out_dir = scratch.path().join("man");
                std::fs::create_dir_all(&out_dir).map_err(|e| {
                    PullError::post_process(format!("failed to create {}: {e}", out_dir.display()))
                })?;
                let out_dir_arg = out_dir.to_string_lossy().into_owned();
                let resolved = args.iter().map(|&arg| {
                    if arg == PostStep::DIR_PLACEHOLDER {
                        out_dir_arg.as_str()
                    } else {
                        arg
                    }
                });
                run_staged(&bin_dir, binary, resolved)?;

                let pages = collect_man_pages(&out_dir)?;
                if pages.is_empty() {
                    return Err(PullError::post_process(format!(
                        "`{binary} {}` wrote no man pages",
                        args.join(" ")
                    )));
                }
                tracing::debug!(app = spec.name, binary, count = pages.len(), "generated man pages");
                for page in pages {
                    target.push(page, spec.binary);
                }
            }
        }
    }

    Ok(())
}

/// Writes every binary of `target` into `<scratch>/bin` with mode 0755.
fn stage_binaries(scratch: &Path, target: &InstallationTarget) -> Result<PathBuf> {
    let bin_dir = scratch.join("bin");
    std::fs::create_dir_all(&bin_dir).map_err(|e| {
        PullError::post_process(format!("failed to create {}: {e}", bin_dir.display()))
    })?;

    for binary in target.binaries() {
        if let InstallArtifact::Binary { name, data } = binary {
            let path = bin_dir.join(name);
            std::fs::write(&path, data).map_err(|e| {
                PullError::post_process(format!("failed to stage {}: {e}", path.display()))
            })?;
            set_mode(&path, BIN_MODE)
                .map_err(|e| PullError::post_process(format!("failed to stage {name}: {e}")))?;
        }
    }
    Ok(bin_dir)
}

/// Runs a staged binary and returns its standard output.
fn run_staged<'a>(
    bin_dir: &Path,
    binary: &str,
    args: impl IntoIterator<Item = &'a str>,
) -> Result<Vec<u8>> {
    let path = bin_dir.join(binary);
    if !path.is_file() {
        return Err(PullError::post_process(format!(
            "{binary} is not among the downloaded binaries"
        )));
    }

    let output = Command::new(&path)
        .args(args)
        .output()
        .map_err(|e| PullError::post_process(format!("failed to run {binary}: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(PullError::post_process(format!(
            "{binary} exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }
    Ok(output.stdout)
}

/// Reads every man page file directly inside `dir`, in file name order.
fn collect_man_pages(dir: &Path) -> Result<Vec<InstallArtifact>> {
    let read_error =
        |e: std::io::Error| PullError::post_process(format!("failed to read {}: {e}", dir.display()));

    let mut found = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(read_error)? {
        let path = entry.map_err(read_error)?.path();
        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if let Some(section) = man_section(file_name) {
            found.push((file_name.to_string(), section, path.clone()));
        }
    }
    found.sort();

    found
        .into_iter()
        .map(|(file_name, section, path)| {
            let data = std::fs::read(&path).map_err(read_error)?;
            Ok(Install::ManPage(section).artifact(&file_name, data))
        })
        .collect()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::version::VersionProbe;

    fn target_with(name: &str, script: &str) -> InstallationTarget {
        let mut target = InstallationTarget::default();
        target.push(
            InstallArtifact::Binary {
                name: name.to_string(),
                data: format!("#!/bin/sh\n{script}\n").into_bytes(),
            },
            name,
        );
        target
    }

    fn spec(post: &'static [PostStep]) -> AppSpec {
        AppSpec {
            name: "tool",
            owner: "o",
            repo: "tool",
            binary: "tool",
            probe: VersionProbe::default(),
            assets: &[],
            post,
            notice: None,
        }
    }

    #[test]
    fn no_steps_is_noop() {
        let mut target = target_with("tool", "exit 1");
        run(&spec(&[]), &mut target).expect("Should succeed");
        assert!(target.completions.is_empty());
    }

    #[test]
    fn completion_is_captured_from_stdout() {
        const POST: &[PostStep] = &[PostStep::completion("tool", &["completions", "zsh"])];
        let mut target = target_with(
            "tool",
            "[ \"$1 $2\" = \"completions zsh\" ] && echo '#compdef tool' || exit 1",
        );
        run(&spec(POST), &mut target).expect("Should succeed");
        assert_eq!(
            target.completions,
            vec![InstallArtifact::Completion {
                app: "tool".to_string(),
                data: b"#compdef tool\n".to_vec()
            }]
        );
    }

    #[test]
    fn completion_from_auxiliary_binary() {
        const POST: &[PostStep] = &[PostStep::Completion {
            binary: "toolx",
            args: &["--generate-shell-completion", "zsh"],
            app: "toolx",
        }];
        let mut target = target_with("tool", "exit 0");
        target.push(
            InstallArtifact::Binary {
                name: "toolx".to_string(),
                data: b"#!/bin/sh\necho '#compdef toolx'\n".to_vec(),
            },
            "tool",
        );
        run(&spec(POST), &mut target).expect("Should succeed");
        assert_eq!(
            target.completions[0].install_path(Path::new("/p")),
            PathBuf::from("/p/share/zsh/site-functions/_toolx")
        );
    }

    #[test]
    fn man_pages_are_collected_from_output_directory() {
        const POST: &[PostStep] = &[PostStep::ManPages {
            binary: "tool",
            args: &["man", "--output-directory", "{dir}"],
        }];
        let mut target = target_with(
            "tool",
            "echo page > \"$3/tool.1\"; echo sub > \"$3/tool-put.1\"; echo x > \"$3/notes.txt\"",
        );
        run(&spec(POST), &mut target).expect("Should succeed");
        let names: Vec<PathBuf> = target
            .man_pages
            .iter()
            .map(|p| p.install_path(Path::new("/p")))
            .collect();
        assert_eq!(
            names,
            [
                PathBuf::from("/p/share/man/man1/tool-put.1"),
                PathBuf::from("/p/share/man/man1/tool.1"),
            ]
        );
    }

    #[test]
    fn failing_command_is_post_process_error() {
        const POST: &[PostStep] = &[PostStep::completion("tool", &["completion", "zsh"])];
        let mut target = target_with("tool", "echo boom >&2; exit 4");
        let err = run(&spec(POST), &mut target).expect_err("Should fail");
        assert!(matches!(err, PullError::PostProcess { .. }));
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn empty_completion_is_post_process_error() {
        const POST: &[PostStep] = &[PostStep::completion("tool", &["completion", "zsh"])];
        let mut target = target_with("tool", "exit 0");
        let err = run(&spec(POST), &mut target).expect_err("Should fail");
        assert!(matches!(err, PullError::PostProcess { .. }));
    }

    #[test]
    fn unknown_binary_is_post_process_error() {
        const POST: &[PostStep] = &[PostStep::completion("other", &["zsh"])];
        let mut target = target_with("tool", "exit 0");
        let err = run(&spec(POST), &mut target).expect_err("Should fail");
        assert!(err.to_string().contains("other"));
    }
}
