use super::*;

fn temp_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "memeforge_{name}_{}_{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ))
}

#[cfg(unix)]
fn write_script(root: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = root.join("model.sh");
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[cfg(unix)]
fn runner_at(root: &Path, binary: PathBuf) -> ModelRunner {
    let output_dir = root.join("out");
    std::fs::create_dir_all(&output_dir).unwrap();
    ModelRunner::new(RunnerConfig {
        binary,
        image_model: "img-model".to_string(),
        text_model: "txt-model".to_string(),
        output_dir,
        staging_root: root.join("staging"),
    })
}

#[cfg(unix)]
#[test]
fn image_artifact_is_relocated_into_output_dir() {
    let root = temp_dir("runner_relocate");
    std::fs::create_dir_all(&root).unwrap();

    // The stub writes its artifact into its working directory, like the real
    // model binary does, and reports it under a nested path.
    let script = write_script(
        &root,
        "echo 'pulling manifest'\n\
         : > out.png\n\
         echo 'Image saved to: /ignored/prefix/out.png'",
    );
    let runner = runner_at(&root, script);

    let filename = runner.generate_image("a cat", None).unwrap();
    assert_eq!(filename, "out.png");
    assert!(root.join("out").join("out.png").exists());

    std::fs::remove_dir_all(&root).unwrap();
}

#[cfg(unix)]
#[test]
fn staging_dir_is_cleaned_up_after_success() {
    let root = temp_dir("runner_cleanup");
    std::fs::create_dir_all(&root).unwrap();

    let script = write_script(
        &root,
        ": > litter.tmp\n\
         : > out.png\n\
         echo 'Image saved to: out.png'",
    );
    let runner = runner_at(&root, script);
    runner.generate_image("a cat", None).unwrap();

    let leftovers: Vec<_> = std::fs::read_dir(root.join("staging"))
        .unwrap()
        .collect();
    assert!(leftovers.is_empty());

    std::fs::remove_dir_all(&root).unwrap();
}

#[cfg(unix)]
#[test]
fn system_prompt_is_prepended_with_blank_line() {
    let root = temp_dir("runner_preamble");
    std::fs::create_dir_all(&root).unwrap();

    // $3 is the composed prompt; dump it somewhere the test can read after the
    // staging directory is gone.
    let capture = root.join("prompt.txt");
    let script = write_script(
        &root,
        &format!(
            "printf '%s' \"$3\" > '{}'\n\
             : > out.png\n\
             echo 'Image saved to: out.png'",
            capture.display()
        ),
    );
    let runner = runner_at(&root, script);

    runner.generate_image("a cat", Some("SYSTEM")).unwrap();
    assert_eq!(std::fs::read_to_string(&capture).unwrap(), "SYSTEM\n\na cat");

    runner.generate_image("a cat", Some("")).unwrap();
    assert_eq!(std::fs::read_to_string(&capture).unwrap(), "a cat");

    std::fs::remove_dir_all(&root).unwrap();
}

#[cfg(unix)]
#[test]
fn nonzero_exit_surfaces_stderr() {
    let root = temp_dir("runner_stderr");
    std::fs::create_dir_all(&root).unwrap();

    let script = write_script(&root, "echo 'model exploded' >&2\nexit 1");
    let runner = runner_at(&root, script);

    let err = runner.generate_image("a cat", None).unwrap_err();
    assert!(matches!(err, MemeError::Process(_)));
    assert!(err.to_string().contains("model exploded"));

    std::fs::remove_dir_all(&root).unwrap();
}

#[cfg(unix)]
#[test]
fn empty_stdout_is_distinct_from_failure() {
    let root = temp_dir("runner_empty");
    std::fs::create_dir_all(&root).unwrap();

    let script = write_script(&root, "exit 0");
    let runner = runner_at(&root, script);

    let err = runner.generate_image("a cat", None).unwrap_err();
    assert!(matches!(err, MemeError::EmptyOutput));

    std::fs::remove_dir_all(&root).unwrap();
}

#[cfg(unix)]
#[test]
fn reported_but_absent_artifact_is_missing() {
    let root = temp_dir("runner_missing");
    std::fs::create_dir_all(&root).unwrap();

    let script = write_script(&root, "echo 'Image saved to: out.png'");
    let runner = runner_at(&root, script);

    let err = runner.generate_image("a cat", None).unwrap_err();
    assert!(matches!(err, MemeError::ArtifactMissing(_)));

    std::fs::remove_dir_all(&root).unwrap();
}

#[cfg(unix)]
#[test]
fn missing_binary_is_process_error() {
    let root = temp_dir("runner_nobin");
    std::fs::create_dir_all(&root).unwrap();

    let runner = runner_at(&root, root.join("does-not-exist"));
    let err = runner.generate_image("a cat", None).unwrap_err();
    assert!(matches!(err, MemeError::Process(_)));

    std::fs::remove_dir_all(&root).unwrap();
}

#[cfg(unix)]
#[test]
fn captions_come_from_text_model_stdout() {
    let root = temp_dir("runner_captions");
    std::fs::create_dir_all(&root).unwrap();

    let script = write_script(
        &root,
        "echo 'Here you go:'\n\
         echo '{\"topText\":\"TOP\",\"bottomText\":\"BOTTOM\"}'",
    );
    let runner = runner_at(&root, script);

    let pair = runner.generate_captions("a cat").unwrap();
    assert_eq!(pair.top, "TOP");
    assert_eq!(pair.bottom, "BOTTOM");

    std::fs::remove_dir_all(&root).unwrap();
}

#[test]
fn sanitize_reduces_to_base_name() {
    assert_eq!(sanitize_filename("out.png").unwrap(), "out.png");
    assert_eq!(sanitize_filename("/a/b/out.png").unwrap(), "out.png");
    assert_eq!(sanitize_filename("../../etc/passwd").unwrap(), "passwd");
}

#[test]
fn sanitize_rejects_names_without_a_file_component() {
    assert!(sanitize_filename("").is_err());
    assert!(sanitize_filename("/").is_err());
    assert!(sanitize_filename("..").is_err());
    assert!(sanitize_filename("a/b/..").is_err());
}
