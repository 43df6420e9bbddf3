//! Orchestration of merges: the in-memory pipeline, the file-level entry
//! point and the directory-level drivers built on top of it.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Instant,
};

use log::{debug, warn};

use crate::{
    config::MergeConfig,
    context::MergeContext,
    error::MergeError,
    handlers::enabled_handlers,
    lang::LangProfile,
    line_based::{LINE_BASED_METHOD, line_based_merge_parsed},
    merge_result::MergeResult,
    newline::{LineEnding, normalize_to_lf},
    parser::parse_declarations,
    settings::DisplaySettings,
    superimposition::superimpose,
    util::{read_file_to_string, write_string_to_file},
};

pub const SEMISTRUCTURED_METHOD: &str = "semistructured";
pub const FAST_FORWARD_METHOD: &str = "fast_forward";

/// Merges three revisions held in memory (line endings already normalized).
///
/// `fname` is only used to detect the language; files outside the host
/// language are merged line by line. The unstructured merge always runs
/// first, even when the semistructured path succeeds: handlers consult it.
pub fn merge_contents(
    contents_base: &str,
    contents_left: &str,
    contents_right: &str,
    fname: Option<&Path>,
    settings: &DisplaySettings,
    config: &MergeConfig,
) -> Result<MergeResult, MergeError> {
    // fast-forward: when one side left the file as it was (or both sides
    // agree), the other side's revision is the merge
    if contents_left == contents_right || contents_base == contents_right {
        return Ok(fast_forward(contents_left));
    }
    if contents_base == contents_left {
        return Ok(fast_forward(contents_right));
    }

    let start = Instant::now();
    let unstructured = line_based_merge_parsed(contents_base, contents_left, contents_right)?;
    debug!("line-based merge took {:?}", start.elapsed());

    let Some(lang_profile) = fname.and_then(LangProfile::detect_from_filename) else {
        debug!("no language profile applies, keeping the line-based merge");
        return Ok(MergeResult::from_parsed_merge(&unstructured, LINE_BASED_METHOD, settings));
    };

    let start = Instant::now();
    let parsed = parse_declarations(contents_base, &lang_profile).and_then(|base_tree| {
        let left_tree = parse_declarations(contents_left, &lang_profile)?;
        let right_tree = parse_declarations(contents_right, &lang_profile)?;
        Ok((base_tree, left_tree, right_tree))
    });
    debug!("parsing all three revisions took {:?}", start.elapsed());
    let (base_tree, left_tree, right_tree) = match parsed {
        Ok(trees) => trees,
        Err(err) => {
            warn!("{err}, falling back to the line-based merge");
            return Ok(MergeResult::from_parsed_merge(&unstructured, LINE_BASED_METHOD, settings));
        }
    };

    let superimposition = superimpose(&base_tree, &left_tree, &right_tree, settings, config)?;
    let mut context = MergeContext {
        base_tree,
        left_tree,
        right_tree,
        superimposed: superimposition.tree,
        added_left: superimposition.added_left,
        added_right: superimposition.added_right,
        renamed_without_body_changes: Vec::new(),
        deleted_or_renamed_with_body_changes: Vec::new(),
        unstructured_output: unstructured.render(settings),
        unstructured,
        settings: settings.clone(),
        config: config.clone(),
        diagnostics: Default::default(),
    };

    for handler in enabled_handlers(config) {
        let start = Instant::now();
        handler.handle(&mut context)?;
        debug!("handler {} took {:?}", handler.name(), start.elapsed());
    }
    context.diagnostics.log_summary();

    let contents = context.superimposed.to_source();
    let mut result = MergeResult::from_contents(contents, SEMISTRUCTURED_METHOD, settings);
    result.diagnostics = context.diagnostics;
    Ok(result)
}

fn fast_forward(contents: &str) -> MergeResult {
    MergeResult {
        contents: contents.to_string(),
        conflict_count: 0,
        conflict_mass: 0,
        method: FAST_FORWARD_METHOD,
        diagnostics: Default::default(),
    }
}

/// Merges three files. Absent revisions are treated as empty files.
///
/// The merged text is written to `output` when given; it is also returned,
/// with line endings imitating the inputs' predominant style.
pub fn merge_files(
    left: Option<&Path>,
    base: Option<&Path>,
    right: Option<&Path>,
    output: Option<&Path>,
    settings: &DisplaySettings,
    config: &MergeConfig,
) -> Result<MergeResult, MergeError> {
    let original_left = read_revision(left)?;
    let original_base = read_revision(base)?;
    let original_right = read_revision(right)?;
    let contents_left = normalize_to_lf(original_left.as_str());
    let contents_base = normalize_to_lf(original_base.as_str());
    let contents_right = normalize_to_lf(original_right.as_str());

    let fname = base.or(left).or(right);
    let mut result =
        merge_contents(&contents_base, &contents_left, &contents_right, fname, settings, config)?;

    let style_reference = [&original_left, &original_base, &original_right]
        .into_iter()
        .find(|contents| !contents.is_empty());
    if let Some(reference) = style_reference {
        result.contents = LineEnding::infer(reference).apply(&result.contents);
    }

    if let Some(output) = output {
        write_string_to_file(output, &result.contents)?;
    }
    Ok(result)
}

fn read_revision(path: Option<&Path>) -> Result<String, MergeError> {
    path.map_or_else(|| Ok(String::new()), read_file_to_string)
}

/// The outcome of merging one file of a directory merge.
#[derive(Debug)]
pub struct FileOutcome {
    pub relative_path: PathBuf,
    pub result: Result<MergeResult, MergeError>,
}

/// Merges three directory trees, pairing files by relative path.
/// A path missing on one side counts as an empty file there. Per-file
/// failures do not abort the remaining files.
pub fn merge_directories(
    left_dir: &Path,
    base_dir: &Path,
    right_dir: &Path,
    output_dir: Option<&Path>,
    settings: &DisplaySettings,
    config: &MergeConfig,
) -> Result<Vec<FileOutcome>, MergeError> {
    for dir in [left_dir, base_dir, right_dir] {
        if !dir.is_dir() {
            return Err(MergeError::Input(format!("{} is not a directory", dir.display())));
        }
    }
    let mut relative_paths = Vec::new();
    for dir in [left_dir, base_dir, right_dir] {
        collect_files(dir, Path::new(""), &mut relative_paths)?;
    }
    relative_paths.sort();
    relative_paths.dedup();

    let outcomes = relative_paths
        .into_iter()
        .map(|relative_path| {
            let left = existing(left_dir, &relative_path);
            let base = existing(base_dir, &relative_path);
            let right = existing(right_dir, &relative_path);
            let output = output_dir.map(|dir| dir.join(&relative_path));
            let result = merge_files(
                left.as_deref(),
                base.as_deref(),
                right.as_deref(),
                output.as_deref(),
                settings,
                config,
            );
            if let Err(err) = &result {
                warn!("failed to merge {}: {err}", relative_path.display());
            }
            FileOutcome { relative_path, result }
        })
        .collect();
    Ok(outcomes)
}

fn existing(dir: &Path, relative_path: &Path) -> Option<PathBuf> {
    let path = dir.join(relative_path);
    path.is_file().then_some(path)
}

fn collect_files(
    root: &Path,
    relative: &Path,
    result: &mut Vec<PathBuf>,
) -> Result<(), MergeError> {
    let dir = root.join(relative);
    let entries = fs::read_dir(&dir)
        .map_err(|err| MergeError::Input(format!("could not list {}: {err}", dir.display())))?;
    for entry in entries {
        let entry = entry
            .map_err(|err| MergeError::Input(format!("could not list {}: {err}", dir.display())))?;
        let path = relative.join(entry.file_name());
        let file_type = entry.file_type().map_err(|err| {
            MergeError::Input(format!("could not inspect {}: {err}", entry.path().display()))
        })?;
        if file_type.is_dir() {
            collect_files(root, &path, result)?;
        } else if file_type.is_file() {
            result.push(path);
        }
    }
    Ok(())
}

/// Merges the revisions listed in a file containing three directory paths
/// (left, base, right in that order), resolved relative to the file itself.
pub fn merge_revisions(
    revisions_file: &Path,
    output_dir: Option<&Path>,
    settings: &DisplaySettings,
    config: &MergeConfig,
) -> Result<Vec<FileOutcome>, MergeError> {
    let contents = read_file_to_string(revisions_file)?;
    let mut lines = contents.lines().map(str::trim).filter(|line| !line.is_empty());
    let (Some(left), Some(base), Some(right)) = (lines.next(), lines.next(), lines.next()) else {
        return Err(MergeError::Input(format!(
            "{} must list the left, base and right directories on three lines",
            revisions_file.display()
        )));
    };
    let anchor = revisions_file.parent().unwrap_or_else(|| Path::new(""));
    merge_directories(
        &anchor.join(left),
        &anchor.join(base),
        &anchor.join(right),
        output_dir,
        settings,
        config,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn merge(base: &str, left: &str, right: &str) -> MergeResult {
        merge_contents(
            base,
            left,
            right,
            Some(Path::new("Example.java")),
            &DisplaySettings::default(),
            &MergeConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn identity_merge_is_a_fast_forward() {
        let contents = "class C {\n}\n";
        let result = merge(contents, contents, contents);
        assert_eq!(result.contents, contents);
        assert_eq!(result.conflict_count, 0);
        assert_eq!(result.method, FAST_FORWARD_METHOD);
    }

    #[test]
    fn fast_forward_left() {
        let base = "class C {\n}\n";
        let left = "class C {\n    void m() {}\n}\n";
        let result = merge(base, left, base);
        assert_eq!(result.contents, left);
        assert_eq!(result.method, FAST_FORWARD_METHOD);
    }

    #[test]
    fn fast_forward_right() {
        let base = "class C {\n}\n";
        let right = "class C {\n    void m() {}\n}\n";
        let result = merge(base, base, right);
        assert_eq!(result.contents, right);
        assert_eq!(result.method, FAST_FORWARD_METHOD);
    }

    #[test]
    fn non_java_files_are_merged_line_by_line() {
        let result = merge_contents(
            "a\nb\nc\n",
            "A\nb\nc\n",
            "a\nb\nC\n",
            Some(Path::new("notes.txt")),
            &DisplaySettings::default(),
            &MergeConfig::default(),
        )
        .unwrap();
        assert_eq!(result.contents, "A\nb\nC\n");
        assert_eq!(result.method, LINE_BASED_METHOD);
    }

    #[test]
    fn unparseable_revisions_fall_back_to_line_based() {
        let base = "class C {\n    int x = 0;\n}\n";
        let left = "class C {\n    int x = 1;\n}\n";
        // unbalanced braces: not parseable as Java
        let right = "class C {\n    int x = 0;\n";
        let result = merge(base, left, right);
        assert_eq!(result.method, LINE_BASED_METHOD);
    }

    #[test]
    fn semistructured_merge_of_disjoint_edits() {
        let base = "class C {\n    void a() {\n        x = 0;\n    }\n}\n";
        let left = base.replace("x = 0;", "x = 1;");
        let right = "class C {\n    void a() {\n        x = 0;\n    }\n\n    int y;\n}\n";
        let result = merge(base, &left, &right);
        assert_eq!(result.method, SEMISTRUCTURED_METHOD);
        assert_eq!(result.conflict_count, 0);
        assert_eq!(
            result.contents,
            "class C {\n    void a() {\n        x = 1;\n    }\n\n    int y;\n}\n"
        );
    }

    #[test]
    fn absent_revisions_count_as_empty_files() {
        let dir = tempfile::tempdir().unwrap();
        let left = dir.path().join("Left.java");
        fs::write(&left, "class C {\n}\n").unwrap();
        let result = merge_files(
            Some(&left),
            None,
            None,
            None,
            &DisplaySettings::default(),
            &MergeConfig::default(),
        )
        .unwrap();
        assert_eq!(result.contents, "class C {\n}\n");
        assert_eq!(result.conflict_count, 0);
    }

    #[test]
    fn crlf_style_is_imitated() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("Base.java");
        let left = dir.path().join("Left.java");
        let right = dir.path().join("Right.java");
        fs::write(&base, "class C {\r\n    int x = 0;\r\n}\r\n").unwrap();
        fs::write(&left, "class C {\r\n    int x = 1;\r\n}\r\n").unwrap();
        fs::write(&right, "class C {\r\n    int x = 0;\r\n}\r\n").unwrap();
        let result = merge_files(
            Some(&left),
            Some(&base),
            Some(&right),
            None,
            &DisplaySettings::default(),
            &MergeConfig::default(),
        )
        .unwrap();
        assert_eq!(result.contents, "class C {\r\n    int x = 1;\r\n}\r\n");
    }
}
