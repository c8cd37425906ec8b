use super::*;
use crate::flow::{
    DEFAULT_INPUT_FILENAME, EDIT_CHOICE_MESSAGE, FAILURE_MESSAGE, RunSummary, Session,
    SessionOutcome, WatermarkChoice, run, success_message,
};
use crate::prompt::{PromptEngine, PromptError};
use image::{DynamicImage, GenericImageView, Rgb, RgbImage, Rgba, RgbaImage};
use std::collections::VecDeque;
use std::fs;
use std::io::Cursor;
use std::path::Path;
use tempfile::TempDir;
use wmark_image::EditOperation;

#[derive(Debug, Clone)]
enum Answer {
    Confirm(bool),
    /// `None` accepts the default.
    Input(Option<&'static str>),
    Select(usize),
}

#[derive(Debug, Default)]
struct ScriptedPrompt {
    answers: VecDeque<Answer>,
    asked: Vec<String>,
    notices: Vec<String>,
}

impl ScriptedPrompt {
    fn new(answers: impl IntoIterator<Item = Answer>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            ..Self::default()
        }
    }

    fn next(&mut self, message: &str) -> Result<Answer, PromptError> {
        self.asked.push(message.to_string());
        self.answers.pop_front().ok_or(PromptError::Closed)
    }
}

impl PromptEngine for ScriptedPrompt {
    fn confirm(&mut self, message: &str, default: bool) -> Result<bool, PromptError> {
        match self.next(message)? {
            Answer::Confirm(value) => Ok(value),
            Answer::Input(None) => Ok(default),
            other => panic!("expected confirm answer for {message:?}, got {other:?}"),
        }
    }

    fn input(&mut self, message: &str, default: Option<&str>) -> Result<String, PromptError> {
        match self.next(message)? {
            Answer::Input(Some(value)) => Ok(value.to_string()),
            Answer::Input(None) => Ok(default.unwrap_or_default().to_string()),
            other => panic!("expected input answer for {message:?}, got {other:?}"),
        }
    }

    fn select(&mut self, message: &str, _choices: &[&str]) -> Result<usize, PromptError> {
        match self.next(message)? {
            Answer::Select(index) => Ok(index),
            other => panic!("expected select answer for {message:?}, got {other:?}"),
        }
    }

    fn notify(&mut self, message: &str) -> Result<(), PromptError> {
        self.notices.push(message.to_string());
        Ok(())
    }
}

fn config_for(dir: &TempDir) -> Config {
    Config {
        image_dir: dir.path().to_string_lossy().into_owned(),
        restart: false,
        ..Config::default()
    }
}

fn editor() -> Editor {
    Editor::new(FsCodec, RasterOps)
}

fn write_image(dir: &Path, name: &str, image: DynamicImage) -> PathBuf {
    let path = dir.join(name);
    image.save(&path).expect("write test image");
    path
}

fn gradient(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 2) as u8, (y * 2) as u8, 180])
    }))
}

fn white(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([255, 255, 255])))
}

fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .expect("list image dir")
        .map(|entry| {
            entry
                .expect("dir entry")
                .file_name()
                .to_string_lossy()
                .into_owned()
        })
        .collect();
    names.sort();
    names
}

fn text_session(input: Option<&'static str>, text: &'static str) -> Vec<Answer> {
    vec![
        Answer::Confirm(true),
        Answer::Input(input),
        Answer::Confirm(false),
        Answer::Select(0),
        Answer::Input(Some(text)),
    ]
}

#[test]
fn declined_start_ends_session_without_files() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let config = config_for(&dir);
    let editor = editor();
    let mut prompt = ScriptedPrompt::new([Answer::Confirm(false)]);

    let outcome = Session::new(&config, &editor, &mut prompt)
        .run()
        .expect("session runs");

    assert!(matches!(outcome, SessionOutcome::Declined));
    assert_eq!(prompt.asked.len(), 1);
    assert!(prompt.notices.is_empty());
    assert!(file_names(dir.path()).is_empty());
}

#[test]
fn missing_source_reports_generic_failure_and_writes_nothing() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let config = config_for(&dir);
    let editor = editor();
    let mut prompt = ScriptedPrompt::new(text_session(Some("doesnotexist.jpg"), "HELLO"));

    let outcome = Session::new(&config, &editor, &mut prompt)
        .run()
        .expect("session runs");

    match outcome {
        SessionOutcome::MissingFile { missing } => {
            assert_eq!(missing, vec![dir.path().join("doesnotexist.jpg")]);
        }
        other => panic!("expected missing file, got {other:?}"),
    }
    assert_eq!(prompt.notices, vec![FAILURE_MESSAGE.to_string()]);
    assert!(file_names(dir.path()).is_empty());
}

#[test]
fn text_watermark_on_default_input_writes_derived_file() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let input = write_image(dir.path(), DEFAULT_INPUT_FILENAME, gradient(100, 100));
    let config = config_for(&dir);
    let editor = editor();
    let mut prompt = ScriptedPrompt::new(text_session(None, "HELLO"));

    let mut session = Session::new(&config, &editor, &mut prompt);
    let outcome = session.run().expect("session runs");
    assert_eq!(session.choices().input_filename, DEFAULT_INPUT_FILENAME);
    assert_eq!(
        session.choices().watermark,
        Some(WatermarkChoice::Text("HELLO".to_string()))
    );

    let expected = dir.path().join("test-with-watermark.jpg");
    match outcome {
        SessionOutcome::Completed { output } => assert_eq!(output, expected),
        other => panic!("expected completion, got {other:?}"),
    }

    let decoded = image::open(&expected).expect("decode output");
    assert_eq!(decoded.dimensions(), (100, 100));
    assert_ne!(
        fs::read(&expected).expect("read output"),
        fs::read(&input).expect("read input")
    );
    assert_eq!(prompt.notices, vec![success_message(dir.path())]);
}

#[test]
fn missing_watermark_image_reports_single_generic_failure() {
    let dir = tempfile::tempdir().expect("create temp dir");
    write_image(dir.path(), "photo.png", white(20, 20));
    let config = config_for(&dir);
    let editor = editor();
    let mut prompt = ScriptedPrompt::new([
        Answer::Confirm(true),
        Answer::Input(Some("photo.png")),
        Answer::Confirm(false),
        Answer::Select(1),
        Answer::Input(None),
    ]);

    let outcome = Session::new(&config, &editor, &mut prompt)
        .run()
        .expect("session runs");

    match outcome {
        SessionOutcome::MissingFile { missing } => {
            assert_eq!(missing, vec![dir.path().join("watermark.png")]);
        }
        other => panic!("expected missing file, got {other:?}"),
    }
    assert_eq!(prompt.notices, vec![FAILURE_MESSAGE.to_string()]);
    assert_eq!(file_names(dir.path()), vec!["photo.png"]);
}

#[test]
fn image_watermark_is_centered_on_source() {
    let dir = tempfile::tempdir().expect("create temp dir");
    write_image(dir.path(), "photo.png", white(30, 30));
    write_image(
        dir.path(),
        "logo.png",
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([0, 0, 0, 255]))),
    );
    let config = config_for(&dir);
    let editor = editor();
    let mut prompt = ScriptedPrompt::new([
        Answer::Confirm(true),
        Answer::Input(Some("photo.png")),
        Answer::Confirm(false),
        Answer::Select(1),
        Answer::Input(Some("logo.png")),
    ]);

    let outcome = Session::new(&config, &editor, &mut prompt)
        .run()
        .expect("session runs");
    assert!(matches!(outcome, SessionOutcome::Completed { .. }));

    let output = image::open(dir.path().join("photo-with-watermark.png"))
        .expect("decode output")
        .to_rgb8();
    assert_eq!(output.get_pixel(0, 0), &Rgb([255, 255, 255]));
    let centre = output.get_pixel(15, 15)[0];
    assert!(centre < 200, "mark blended at centre, got {centre}");
    assert_eq!(output.get_pixel(9, 15), &Rgb([255, 255, 255]));
    assert!(output.get_pixel(10, 15)[0] < 200);
}

fn edit_then_blank_text(source: &'static str) -> Vec<Answer> {
    vec![
        Answer::Confirm(true),
        Answer::Input(Some(source)),
        Answer::Confirm(true),
        Answer::Select(3),
        Answer::Select(0),
        Answer::Input(Some("")),
    ]
}

#[test]
fn watermark_applies_to_edited_output_by_default() {
    let dir = tempfile::tempdir().expect("create temp dir");
    write_image(dir.path(), "photo.png", white(8, 8));
    let config = config_for(&dir);
    let editor = editor();
    let mut prompt = ScriptedPrompt::new(edit_then_blank_text("photo.png"));

    let mut session = Session::new(&config, &editor, &mut prompt);
    let outcome = session.run().expect("session runs");
    assert!(matches!(outcome, SessionOutcome::Completed { .. }));
    assert_eq!(session.choices().edit, Some(EditOperation::Invert));
    assert!(prompt.asked.iter().any(|message| message == EDIT_CHOICE_MESSAGE));

    let output = image::open(dir.path().join("photo-with-watermark.png"))
        .expect("decode output")
        .to_rgb8();
    assert!(output.pixels().all(|pixel| pixel == &Rgb([0, 0, 0])));
}

#[test]
fn watermark_can_apply_to_original_input() {
    let dir = tempfile::tempdir().expect("create temp dir");
    write_image(dir.path(), "photo.png", white(8, 8));
    let config = Config {
        watermark_source: WatermarkSource::Original,
        ..config_for(&dir)
    };
    let editor = editor();
    let mut prompt = ScriptedPrompt::new(edit_then_blank_text("photo.png"));

    let outcome = Session::new(&config, &editor, &mut prompt)
        .run()
        .expect("session runs");
    assert!(matches!(outcome, SessionOutcome::Completed { .. }));

    let output = image::open(dir.path().join("photo-with-watermark.png"))
        .expect("decode output")
        .to_rgb8();
    assert!(output.pixels().all(|pixel| pixel == &Rgb([255, 255, 255])));
}

#[test]
fn failed_edit_ends_session_with_generic_message() {
    let dir = tempfile::tempdir().expect("create temp dir");
    fs::write(dir.path().join("broken.png"), b"not a png").expect("write corrupt file");
    let config = config_for(&dir);
    let editor = editor();
    let mut prompt = ScriptedPrompt::new([
        Answer::Confirm(true),
        Answer::Input(Some("broken.png")),
        Answer::Confirm(true),
        Answer::Select(0),
    ]);

    let outcome = Session::new(&config, &editor, &mut prompt)
        .run()
        .expect("session runs");

    assert!(matches!(outcome, SessionOutcome::Failed(_)));
    assert_eq!(prompt.notices, vec![FAILURE_MESSAGE.to_string()]);
    assert!(prompt.answers.is_empty());
}

#[test]
fn out_of_range_edit_choice_is_rejected() {
    let dir = tempfile::tempdir().expect("create temp dir");
    write_image(dir.path(), "photo.png", white(4, 4));
    let config = config_for(&dir);
    let editor = editor();
    let mut prompt = ScriptedPrompt::new([
        Answer::Confirm(true),
        Answer::Input(Some("photo.png")),
        Answer::Confirm(true),
        Answer::Select(9),
    ]);

    let error = Session::new(&config, &editor, &mut prompt)
        .run()
        .expect_err("edit index past the menu");

    assert!(matches!(error, PromptError::InvalidChoice(9)));
    assert!(prompt.notices.is_empty());
    assert_eq!(file_names(dir.path()), vec!["photo.png".to_string()]);
}

#[test]
fn out_of_range_watermark_kind_is_rejected() {
    let dir = tempfile::tempdir().expect("create temp dir");
    write_image(dir.path(), "photo.png", white(4, 4));
    let config = config_for(&dir);
    let editor = editor();
    let mut prompt = ScriptedPrompt::new([
        Answer::Confirm(true),
        Answer::Input(Some("photo.png")),
        Answer::Confirm(false),
        Answer::Select(2),
    ]);

    let error = Session::new(&config, &editor, &mut prompt)
        .run()
        .expect_err("watermark kind past the menu");

    assert!(matches!(error, PromptError::InvalidChoice(2)));
}

#[test]
fn unique_output_names_keep_previous_results() {
    let dir = tempfile::tempdir().expect("create temp dir");
    write_image(dir.path(), "photo.png", white(40, 40));
    let config = Config {
        unique_output_names: true,
        restart: true,
        ..config_for(&dir)
    };
    let editor = editor();
    let mut answers = text_session(Some("photo.png"), "A");
    answers.extend(text_session(Some("photo.png"), "B"));
    answers.push(Answer::Confirm(false));
    let mut prompt = ScriptedPrompt::new(answers);

    let summary = run(&config, &editor, &mut prompt).expect("run succeeds");
    assert_eq!(summary.completed, 2);

    let outputs: Vec<String> = file_names(dir.path())
        .into_iter()
        .filter(|name| name.starts_with("photo-with-watermark-"))
        .collect();
    assert_eq!(outputs.len(), 2);
    assert!(outputs.iter().all(|name| name.ends_with(".png")));
}

#[test]
fn run_restarts_until_declined() {
    let dir = tempfile::tempdir().expect("create temp dir");
    write_image(dir.path(), "test.jpg", gradient(50, 50));
    let config = Config {
        restart: true,
        ..config_for(&dir)
    };
    let editor = editor();
    let mut answers = text_session(None, "ONE");
    answers.extend(text_session(Some("missing.jpg"), "TWO"));
    answers.push(Answer::Confirm(false));
    let mut prompt = ScriptedPrompt::new(answers);

    let summary = run(&config, &editor, &mut prompt).expect("run succeeds");

    assert_eq!(
        summary,
        RunSummary {
            sessions: 3,
            completed: 1
        }
    );
    assert!(prompt.answers.is_empty());
}

#[test]
fn run_stops_after_one_session_without_restart() {
    let dir = tempfile::tempdir().expect("create temp dir");
    write_image(dir.path(), "test.jpg", gradient(50, 50));
    let config = config_for(&dir);
    let editor = editor();
    let mut answers = text_session(None, "ONCE");
    answers.push(Answer::Confirm(true));
    let mut prompt = ScriptedPrompt::new(answers);

    let summary = run(&config, &editor, &mut prompt).expect("run succeeds");

    assert_eq!(summary.sessions, 1);
    assert_eq!(prompt.answers.len(), 1);
}

#[test]
fn run_ends_quietly_when_input_closes() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let config = Config {
        restart: true,
        ..config_for(&dir)
    };
    let editor = editor();
    let mut prompt = ScriptedPrompt::new([Answer::Confirm(true)]);

    let summary = run(&config, &editor, &mut prompt).expect("closed input is not an error");
    assert_eq!(summary, RunSummary::default());
}

#[test]
fn terminal_confirm_uses_default_and_reasks_on_invalid_answer() {
    let input = Cursor::new("\nmaybe\nNo\n");
    let mut prompt = TerminalPrompt::new(input, Vec::new());

    assert!(prompt.confirm("Ready?", true).expect("first answer"));
    assert!(!prompt.confirm("Ready?", true).expect("second answer"));

    let output = String::from_utf8(prompt.into_writer()).expect("utf8 output");
    assert!(output.contains("? Ready? (Y/n) "));
    assert!(output.contains(">> Please answer y or n"));
}

#[test]
fn terminal_input_falls_back_to_default() {
    let input = Cursor::new("\n  logo.png  \n\n");
    let mut prompt = TerminalPrompt::new(input, Vec::new());

    assert_eq!(
        prompt.input("File?", Some("test.jpg")).expect("default"),
        "test.jpg"
    );
    assert_eq!(
        prompt.input("File?", Some("test.jpg")).expect("typed"),
        "logo.png"
    );
    assert_eq!(prompt.input("Text?", None).expect("empty"), "");

    let output = String::from_utf8(prompt.into_writer()).expect("utf8 output");
    assert!(output.contains("? File? (test.jpg) "));
}

#[test]
fn terminal_select_parses_one_based_numbers() {
    let input = Cursor::new("7\nabc\n2\n\n");
    let mut prompt = TerminalPrompt::new(input, Vec::new());
    let choices = ["Text watermark", "Image watermark"];

    assert_eq!(prompt.select("Kind?", &choices).expect("second"), 1);
    assert_eq!(prompt.select("Kind?", &choices).expect("default"), 0);

    let output = String::from_utf8(prompt.into_writer()).expect("utf8 output");
    assert!(output.contains("  1) Text watermark"));
    assert!(output.contains("  2) Image watermark"));
    assert_eq!(output.matches(">> Please enter a number between 1 and 2").count(), 2);
}

#[test]
fn terminal_prompt_reports_closed_input() {
    let mut prompt = TerminalPrompt::new(Cursor::new(""), Vec::new());
    assert!(matches!(
        prompt.confirm("Ready?", true),
        Err(PromptError::Closed)
    ));
    assert!(matches!(
        prompt.select("Kind?", &[]),
        Err(PromptError::NoChoices)
    ));
}

#[test]
fn cli_parses_overrides() {
    let cli = Cli::try_parse_from([
        "wmark",
        "--image-dir",
        "pictures",
        "--watermark-source",
        "original",
        "--once",
        "--unique-names",
        "-v",
    ])
    .expect("valid arguments");

    assert_eq!(cli.image_dir.as_deref(), Some(Path::new("pictures")));
    assert_eq!(cli.watermark_source, Some(WatermarkSource::Original));
    assert!(cli.once);
    assert!(cli.unique_names);
    assert!(cli.verbose);
}

#[test]
fn cli_rejects_unknown_watermark_source() {
    let result = Cli::try_parse_from(["wmark", "--watermark-source", "newest"]);
    assert!(result.is_err());
}

#[test]
fn resolve_config_applies_cli_overrides_over_file() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        "image_dir = \"from-file\"\nwatermark_source = \"original\"\n",
    )
    .expect("write config");

    let cli = Cli {
        config: Some(path.clone()),
        once: true,
        ..Cli::default()
    };
    let config = resolve_config(&cli).expect("config resolves");
    assert_eq!(config.image_dir, "from-file");
    assert_eq!(config.watermark_source, WatermarkSource::Original);
    assert!(!config.restart);

    let cli = Cli {
        config: Some(path),
        image_dir: Some(PathBuf::from("override")),
        watermark_source: Some(WatermarkSource::Edited),
        unique_names: true,
        ..Cli::default()
    };
    let config = resolve_config(&cli).expect("config resolves");
    assert_eq!(config.image_dir, "override");
    assert_eq!(config.watermark_source, WatermarkSource::Edited);
    assert!(config.restart);
    assert!(config.unique_output_names);
}

#[test]
fn resolve_config_uses_defaults_for_missing_file() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let cli = Cli {
        config: Some(dir.path().join("absent.toml")),
        ..Cli::default()
    };

    assert_eq!(resolve_config(&cli).expect("defaults"), Config::default());
    assert!(!dir.path().join("absent.toml").exists());
}

#[test]
fn resolve_config_rejects_malformed_file() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("config.toml");
    fs::write(&path, "restart = \"sometimes\"").expect("write config");

    let cli = Cli {
        config: Some(path),
        ..Cli::default()
    };
    assert!(matches!(
        resolve_config(&cli),
        Err(ConfigError::Deserialize(_))
    ));
}
