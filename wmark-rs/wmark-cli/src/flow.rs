use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};
use wmark_config::{Config, WatermarkSource};
use wmark_image::{EditOperation, Editor, ImageCodec, ImageError, ImageOps, Watermark};
use wmark_utils::{derive_output_name, derive_unique_output_name, trimmed_or_none};

use crate::prompt::{PromptEngine, PromptError};

pub const DEFAULT_INPUT_FILENAME: &str = "test.jpg";
pub const DEFAULT_WATERMARK_FILENAME: &str = "watermark.png";
pub const FAILURE_MESSAGE: &str = "Something went wrong... Try again";
pub const INPUT_MESSAGE: &str = "What file do you want to mark?";
pub const EDIT_MESSAGE: &str = "Do you want to edit the selected file?";
pub const EDIT_CHOICE_MESSAGE: &str = "How do you want to edit the file?";
pub const WATERMARK_KIND_MESSAGE: &str = "Which watermark do you want to add?";
pub const WATERMARK_TEXT_MESSAGE: &str = "Type your watermark text:";
pub const WATERMARK_FILE_MESSAGE: &str = "Type your watermark name:";
pub const TEXT_WATERMARK_LABEL: &str = "Text watermark";
pub const IMAGE_WATERMARK_LABEL: &str = "Image watermark";

pub fn welcome_message(image_dir: &Path) -> String {
    format!(
        "Hi! Welcome to \"Watermark manager\". Copy your image files to `{}` folder. \
         Then you'll be able to use them in the app. Are you ready?",
        image_dir.display()
    )
}

pub fn success_message(image_dir: &Path) -> String {
    format!(
        "File has been successfully generated! Check `{}` folder",
        image_dir.display()
    )
}

/// Watermark picked by the user; the image variant holds a filename inside
/// the image directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatermarkChoice {
    Text(String),
    Image(String),
}

/// Answers collected during one session, in the order they are asked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionChoices {
    pub proceed: bool,
    pub input_filename: String,
    pub wants_edit: bool,
    pub edit: Option<EditOperation>,
    pub watermark: Option<WatermarkChoice>,
}

#[derive(Debug)]
pub enum SessionOutcome {
    /// The user did not want to start.
    Declined,
    Completed { output: PathBuf },
    /// A file needed by the watermark stage does not exist.
    MissingFile { missing: Vec<PathBuf> },
    Failed(ImageError),
}

/// One pass through the prompt sequence.
pub struct Session<'a, P, C, O> {
    config: &'a Config,
    editor: &'a Editor<C, O>,
    prompt: &'a mut P,
    choices: SessionChoices,
}

impl<'a, P, C, O> Session<'a, P, C, O>
where
    P: PromptEngine,
    C: ImageCodec,
    O: ImageOps,
{
    pub fn new(config: &'a Config, editor: &'a Editor<C, O>, prompt: &'a mut P) -> Self {
        Self {
            config,
            editor,
            prompt,
            choices: SessionChoices::default(),
        }
    }

    pub fn choices(&self) -> &SessionChoices {
        &self.choices
    }

    pub fn run(&mut self) -> Result<SessionOutcome, PromptError> {
        let config = self.config;
        let image_dir = config.image_dir();

        self.choices.proceed = self.prompt.confirm(&welcome_message(image_dir), true)?;
        if !self.choices.proceed {
            return Ok(SessionOutcome::Declined);
        }

        let answer = self
            .prompt
            .input(INPUT_MESSAGE, Some(DEFAULT_INPUT_FILENAME))?;
        self.choices.input_filename = trimmed_or_none(Some(answer.as_str()))
            .unwrap_or(DEFAULT_INPUT_FILENAME)
            .to_string();
        self.choices.wants_edit = self.prompt.confirm(EDIT_MESSAGE, true)?;

        let source = image_dir.join(&self.choices.input_filename);
        let output = image_dir.join(self.output_name());
        debug!(source = %source.display(), output = %output.display(), "resolved session paths");

        let mut watermark_input = source.clone();
        if self.choices.wants_edit {
            let operation = self.select_edit()?;
            self.choices.edit = Some(operation);

            if let Err(error) = self.editor.apply_edit(operation, &source, &output) {
                return self.fail(error);
            }
            if config.watermark_source == WatermarkSource::Edited {
                watermark_input = output.clone();
            }
        }

        let choice = self.select_watermark()?;
        self.choices.watermark = Some(choice.clone());

        let mut required = vec![watermark_input.clone()];
        let watermark = match choice {
            WatermarkChoice::Text(text) => Watermark::Text(text),
            WatermarkChoice::Image(filename) => {
                let mark = image_dir.join(filename);
                required.push(mark.clone());
                Watermark::Image(mark)
            }
        };

        let missing: Vec<PathBuf> = required.into_iter().filter(|path| !path.exists()).collect();
        if !missing.is_empty() {
            warn!(?missing, "watermark input files are missing");
            self.prompt.notify(FAILURE_MESSAGE)?;
            return Ok(SessionOutcome::MissingFile { missing });
        }

        match self
            .editor
            .apply_watermark(&watermark, &watermark_input, &output)
        {
            Ok(output) => {
                info!(output = %output.display(), "watermarked image generated");
                self.prompt.notify(&success_message(image_dir))?;
                Ok(SessionOutcome::Completed { output })
            }
            Err(error) => self.fail(error),
        }
    }

    fn output_name(&self) -> String {
        if self.config.unique_output_names {
            derive_unique_output_name(&self.choices.input_filename)
        } else {
            derive_output_name(&self.choices.input_filename)
        }
    }

    fn select_edit(&mut self) -> Result<EditOperation, PromptError> {
        let labels: Vec<&str> = EditOperation::ALL.iter().map(|op| op.label()).collect();
        let index = self.prompt.select(EDIT_CHOICE_MESSAGE, &labels)?;
        EditOperation::ALL
            .get(index)
            .copied()
            .ok_or(PromptError::InvalidChoice(index))
    }

    fn select_watermark(&mut self) -> Result<WatermarkChoice, PromptError> {
        let kinds = [TEXT_WATERMARK_LABEL, IMAGE_WATERMARK_LABEL];
        let choice = match self.prompt.select(WATERMARK_KIND_MESSAGE, &kinds)? {
            0 => WatermarkChoice::Text(self.prompt.input(WATERMARK_TEXT_MESSAGE, None)?),
            1 => {
                let answer = self
                    .prompt
                    .input(WATERMARK_FILE_MESSAGE, Some(DEFAULT_WATERMARK_FILENAME))?;
                let filename =
                    trimmed_or_none(Some(answer.as_str())).unwrap_or(DEFAULT_WATERMARK_FILENAME);
                WatermarkChoice::Image(filename.to_string())
            }
            other => return Err(PromptError::InvalidChoice(other)),
        };
        Ok(choice)
    }

    fn fail(&mut self, error: ImageError) -> Result<SessionOutcome, PromptError> {
        let cause = std::error::Error::source(&error).map(ToString::to_string);
        error!(error = %error, ?cause, "image operation failed");
        self.prompt.notify(FAILURE_MESSAGE)?;
        Ok(SessionOutcome::Failed(error))
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub sessions: usize,
    pub completed: usize,
}

/// Run sessions until one is declined, the input closes, or restart is off.
pub fn run<P, C, O>(
    config: &Config,
    editor: &Editor<C, O>,
    prompt: &mut P,
) -> Result<RunSummary, PromptError>
where
    P: PromptEngine,
    C: ImageCodec,
    O: ImageOps,
{
    let mut summary = RunSummary::default();

    loop {
        let outcome = match Session::new(config, editor, prompt).run() {
            Ok(outcome) => outcome,
            Err(PromptError::Closed) => {
                debug!("prompt input closed");
                break;
            }
            Err(error) => return Err(error),
        };

        summary.sessions += 1;
        debug!(session = summary.sessions, ?outcome, "session finished");

        match outcome {
            SessionOutcome::Declined => break,
            SessionOutcome::Completed { .. } => summary.completed += 1,
            SessionOutcome::MissingFile { .. } | SessionOutcome::Failed(_) => {}
        }

        if !config.restart {
            break;
        }
    }

    Ok(summary)
}
