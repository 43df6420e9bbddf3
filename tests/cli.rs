//! Exit-code and output contract of the command line interface.

use std::{fs, path::Path, process::Command};

fn run(args: &[&str], cwd: &Path) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_declmerge"))
        .args(args)
        .current_dir(cwd)
        .output()
        .expect("failed to run declmerge")
}

fn write(dir: &Path, name: &str, contents: &str) -> String {
    let path = dir.join(name);
    fs::write(&path, contents).expect("failed to write test file");
    path.to_str().unwrap().to_string()
}

#[test]
fn clean_merge_exits_zero_and_prints_the_result() {
    let dir = tempfile::tempdir().unwrap();
    let base = write(dir.path(), "Base.java", "class C {\n    int x = 0;\n}\n");
    let left = write(dir.path(), "Left.java", "class C {\n    int x = 1;\n}\n");
    let right = write(dir.path(), "Right.java", "class C {\n    int x = 0;\n}\n");

    let output = run(&["merge", &left, &base, &right], dir.path());

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(String::from_utf8_lossy(&output.stdout), "class C {\n    int x = 1;\n}\n");
}

#[test]
fn conflicting_merge_exits_one() {
    let dir = tempfile::tempdir().unwrap();
    let base = write(dir.path(), "Base.java", "class C {\n    int x = 0;\n}\n");
    let left = write(dir.path(), "Left.java", "class C {\n    int x = 1;\n}\n");
    let right = write(dir.path(), "Right.java", "class C {\n    int x = 2;\n}\n");

    let output = run(&["merge", &left, &base, &right], dir.path());

    assert_eq!(output.status.code(), Some(1));
    let merged = String::from_utf8_lossy(&output.stdout);
    assert!(merged.contains("<<<<<<< MINE"), "markers missing:\n{merged}");
    assert!(merged.contains(">>>>>>> YOURS"), "markers missing:\n{merged}");
}

#[test]
fn missing_input_is_a_fatal_failure() {
    let dir = tempfile::tempdir().unwrap();
    let base = write(dir.path(), "Base.java", "class C {\n}\n");

    let output = run(&["merge", "NoSuch.java", &base, &base], dir.path());

    assert_eq!(output.status.code(), Some(255), "exit(-1) is reported as 255");
    assert!(String::from_utf8_lossy(&output.stderr).contains("declmerge:"));
}

#[test]
fn output_flag_writes_the_file_instead_of_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let base = write(dir.path(), "Base.java", "class C {\n    int x = 0;\n}\n");
    let left = write(dir.path(), "Left.java", "class C {\n    int x = 1;\n}\n");
    let right = write(dir.path(), "Right.java", "class C {\n    int x = 0;\n}\n");
    let merged_path = dir.path().join("Merged.java");

    let output = run(
        &["merge", &left, &base, &right, "--output", merged_path.to_str().unwrap()],
        dir.path(),
    );

    assert_eq!(output.status.code(), Some(0));
    assert!(output.stdout.is_empty());
    assert_eq!(
        fs::read_to_string(&merged_path).unwrap(),
        "class C {\n    int x = 1;\n}\n"
    );
}

#[test]
fn custom_marker_names_show_up_in_conflicts() {
    let dir = tempfile::tempdir().unwrap();
    let base = write(dir.path(), "Base.java", "class C {\n    int x = 0;\n}\n");
    let left = write(dir.path(), "Left.java", "class C {\n    int x = 1;\n}\n");
    let right = write(dir.path(), "Right.java", "class C {\n    int x = 2;\n}\n");

    let output = run(
        &["merge", &left, &base, &right, "--left-name=feature", "--right-name=main"],
        dir.path(),
    );

    let merged = String::from_utf8_lossy(&output.stdout);
    assert!(merged.contains("<<<<<<< feature"), "custom marker missing:\n{merged}");
    assert!(merged.contains(">>>>>>> main"), "custom marker missing:\n{merged}");
}

#[test]
fn merge_dirs_pairs_files_by_relative_path() {
    let dir = tempfile::tempdir().unwrap();
    let left_dir = dir.path().join("left");
    let base_dir = dir.path().join("base");
    let right_dir = dir.path().join("right");
    let out_dir = dir.path().join("out");
    for d in [&left_dir, &base_dir, &right_dir] {
        fs::create_dir_all(d.join("pkg")).unwrap();
    }

    let base = "class C {\n    int x = 0;\n}\n";
    write(&base_dir.join("pkg"), "C.java", base);
    write(&left_dir.join("pkg"), "C.java", "class C {\n    int x = 1;\n}\n");
    write(&right_dir.join("pkg"), "C.java", base);
    // a file added only on the left side
    write(&left_dir.join("pkg"), "New.java", "class New {\n}\n");

    let output = run(
        &[
            "merge-dirs",
            left_dir.to_str().unwrap(),
            base_dir.to_str().unwrap(),
            right_dir.to_str().unwrap(),
            "--output",
            out_dir.to_str().unwrap(),
        ],
        dir.path(),
    );

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(
        fs::read_to_string(out_dir.join("pkg/C.java")).unwrap(),
        "class C {\n    int x = 1;\n}\n"
    );
    assert_eq!(fs::read_to_string(out_dir.join("pkg/New.java")).unwrap(), "class New {\n}\n");
}

#[test]
fn revisions_file_drives_a_directory_merge() {
    let dir = tempfile::tempdir().unwrap();
    for d in ["left", "base", "right"] {
        fs::create_dir_all(dir.path().join(d)).unwrap();
    }
    let base = "class C {\n    int x = 0;\n}\n";
    write(&dir.path().join("base"), "C.java", base);
    write(&dir.path().join("left"), "C.java", "class C {\n    int x = 1;\n}\n");
    write(&dir.path().join("right"), "C.java", base);
    let revisions = write(dir.path(), "merge.revisions", "left\nbase\nright\n");
    let out_dir = dir.path().join("out");

    let output =
        run(&["revisions", &revisions, "--output", out_dir.to_str().unwrap()], dir.path());

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(
        fs::read_to_string(out_dir.join("C.java")).unwrap(),
        "class C {\n    int x = 1;\n}\n"
    );
}
