extern crate log;
extern crate pretty_env_logger;

use std::path::{Path, PathBuf};
use std::process::exit;

use bubble_grader::{grade_batch, load_grade_options, GradedSheet, ScoreResult};
use clap::{arg, command, value_parser, Command};
use serde::Serialize;

const IMAGE_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "bmp", "tif", "tiff"];

#[derive(Serialize)]
struct ReportLine<'a> {
    path: &'a Path,
    #[serde(skip_serializing_if = "Option::is_none")]
    ok: Option<&'a ScoreResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn main() {
    pretty_env_logger::init_custom_env("LOG");

    let matches = cli().get_matches();
    let debug = matches.get_flag("debug");
    let key_path = matches
        .get_one::<PathBuf>("key")
        .expect("answer key path is required");
    let output_dir = matches.get_one::<PathBuf>("output");

    let mut options = match load_grade_options(key_path) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("Error loading answer key: {}", e);
            exit(1);
        }
    };
    if let Some(choices) = matches.get_one::<usize>("choices") {
        options.choices_per_question = *choices;
    }
    if let Some(min_fill_ratio) = matches.get_one::<f32>("min-fill-ratio") {
        options.min_fill_ratio = *min_fill_ratio;
    }
    if let Err(e) = options.validate() {
        eprintln!("Error: {}", e);
        exit(1);
    }

    let inputs = matches
        .get_many::<PathBuf>("paths")
        .expect("at least one input path is required")
        .cloned()
        .collect::<Vec<_>>();
    let image_paths = collect_image_paths(&inputs);
    if image_paths.is_empty() {
        eprintln!("Error: no images found in {:?}", inputs);
        exit(1);
    }

    if let Some(output_dir) = output_dir {
        if let Err(e) = std::fs::create_dir_all(output_dir) {
            eprintln!("Error creating {}: {}", output_dir.display(), e);
            exit(1);
        }
    }

    for (path, result) in grade_batch(&image_paths, &options, debug) {
        let line = match &result {
            Ok(graded) => {
                if let Some(output_dir) = output_dir {
                    save_graded_images(output_dir, &path, graded);
                }
                ReportLine {
                    path: &path,
                    ok: Some(&graded.score),
                    error: None,
                }
            }
            Err(e) => ReportLine {
                path: &path,
                ok: None,
                error: Some(e.to_string()),
            },
        };

        match serde_json::to_string(&line) {
            Ok(json) => println!("{}", json),
            Err(e) => log::error!("unable to serialize result for {}: {}", path.display(), e),
        }
    }
}

/// Expands directories into the image files they directly contain, sorted by
/// name. Files are passed through as given.
fn collect_image_paths(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut paths = vec![];
    for input in inputs {
        if !input.is_dir() {
            paths.push(input.clone());
            continue;
        }

        let entries = match std::fs::read_dir(input) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("unable to read directory {}: {}", input.display(), e);
                continue;
            }
        };
        let mut images = entries
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| path.is_file() && is_image_path(path))
            .collect::<Vec<_>>();
        images.sort();
        paths.append(&mut images);
    }
    paths
}

fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .map_or(false, |extension| {
            IMAGE_EXTENSIONS.contains(&extension.to_ascii_lowercase().as_str())
        })
}

fn save_graded_images(output_dir: &Path, input_path: &Path, graded: &GradedSheet) {
    let stem = input_path
        .file_stem()
        .unwrap_or_default()
        .to_string_lossy()
        .into_owned();
    let outputs = [
        (format!("{}_original.png", stem), &graded.original),
        (format!("{}_graded.png", stem), &graded.score.annotated),
    ];
    for (file_name, image) in outputs {
        let path = output_dir.join(file_name);
        if let Err(e) = image.save(&path) {
            log::warn!("unable to save {}: {}", path.display(), e);
        }
    }
}

fn cli() -> Command {
    command!()
        .arg(
            arg!(-k --key <PATH> "Path to the answer key JSON file")
                .required(true)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            arg!(-c --choices <N> "Number of choices per question (overrides the key file)")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            arg!(--"min-fill-ratio" <RATIO> "Minimum fill ratio of a row's darkest bubble")
                .value_parser(value_parser!(f32)),
        )
        .arg(
            arg!(-o --output <DIR> "Directory to write original and graded images to")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(arg!(-d --debug "Write debug images next to each input"))
        .arg(
            arg!(paths: <PATHS> ... "Images, or directories of images, to grade")
                .required(true)
                .value_parser(value_parser!(PathBuf)),
        )
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        cli().debug_assert();
    }

    #[test]
    fn test_cli_parses_arguments() {
        let matches = cli().get_matches_from([
            "bubble-grader",
            "--key",
            "key.json",
            "--choices",
            "4",
            "--min-fill-ratio",
            "0.3",
            "a.png",
            "scans",
        ]);
        assert_eq!(matches.get_one::<usize>("choices"), Some(&4));
        assert_eq!(matches.get_one::<f32>("min-fill-ratio"), Some(&0.3));
        assert_eq!(
            matches
                .get_many::<PathBuf>("paths")
                .unwrap()
                .cloned()
                .collect::<Vec<_>>(),
            vec![PathBuf::from("a.png"), PathBuf::from("scans")]
        );
        assert!(!matches.get_flag("debug"));
    }

    #[test]
    fn test_collect_image_paths_expands_directories() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.JPG", "a.png", "notes.txt"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        let single = PathBuf::from("elsewhere/sheet.png");

        let paths = collect_image_paths(&[dir.path().to_path_buf(), single.clone()]);
        assert_eq!(
            paths,
            vec![dir.path().join("a.png"), dir.path().join("b.JPG"), single]
        );
    }
}
