mod config;
mod error;
mod history;
mod input;
mod logging;
mod request;
mod submission;
mod transport;

use iced::{
    widget::{button, column, container, image, pick_list, row, scrollable, text, text_editor, text_input, Column, Image},
    Element, Length, Task, Theme, Subscription,
    time, clipboard,
    keyboard::{self, Key},
    event::{self, Event as IcedEvent},
    alignment,
    window,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use history::{ClipboardSink, EntryId, HistoryEntry, HistoryStore};
use input::{ImageAttachment, InputState, ModelCatalog, PromptPreset, PROMPT_MAX_CHARS};
use submission::{Phase, SubmissionController, SubmissionOutcome};
use transport::HttpTransport;

const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

fn main() -> iced::Result {
    let (config, load_warning) = config::Config::load();
    logging::init(&config.logging);
    if let Some(warning) = load_warning {
        warn!("{}", warning);
    }

    let size = iced::Size::new(config.window.width as f32, config.window.height as f32);

    iced::application("ProductVision", App::update, App::view)
        .theme(App::theme)
        .subscription(App::subscription)
        .window(window::Settings {
            size,
            position: window::Position::Centered,
            ..Default::default()
        })
        .run_with(move || App::new(config))
}

#[derive(Debug, Clone)]
enum Message {
    ImagePathChanged(String),
    AttachImage,
    ImageDropped(PathBuf),
    ImageLoaded(PathBuf, Result<ImageAttachment, String>),
    PromptEdited(text_editor::Action),
    Preset(PromptPreset),
    ModelSelected(String),
    Submit,
    Finished(SubmissionOutcome),
    Copy(EntryId),
    Tick,
    Exit,
}

/// Hands copied text to iced's clipboard as a task.
#[derive(Default)]
struct TaskClipboard {
    task: Option<Task<Message>>,
}

impl ClipboardSink for TaskClipboard {
    fn write_text(&mut self, text: String) {
        self.task = Some(clipboard::write(text));
    }
}

struct App {
    input: InputState,
    image_path: String,
    prompt_editor: text_editor::Content,
    preview: Option<image::Handle>,
    controller: SubmissionController,
    history: HistoryStore,
    error: Option<String>,
    loading_frame: usize,
}

impl App {
    fn new(config: config::Config) -> (Self, Task<Message>) {
        let catalog = ModelCatalog::from_config(&config.models);
        let transport = Arc::new(HttpTransport::from_config(&config.api));
        info!(endpoint = %transport.endpoint(), models = catalog.models().len(), "Starting ProductVision");

        let app = App {
            input: InputState::new(catalog),
            image_path: String::new(),
            prompt_editor: text_editor::Content::new(),
            preview: None,
            controller: SubmissionController::new(transport),
            history: HistoryStore::new(),
            error: None,
            loading_frame: 0,
        };

        (app, Task::none())
    }

    fn load_image(path: PathBuf) -> Task<Message> {
        Task::perform(
            async move {
                let result = ImageAttachment::from_path(&path)
                    .await
                    .map_err(|e| format!("{:#}", e));
                (path, result)
            },
            |(path, result)| Message::ImageLoaded(path, result),
        )
    }

    /// Pushes editor text into the input state and back, so the editor
    /// never shows more than the prompt limit.
    fn sync_prompt_from_editor(&mut self) {
        let text = self.prompt_editor.text();
        self.input.set_prompt(text.clone());
        if self.input.prompt() != text {
            self.prompt_editor = text_editor::Content::with_text(self.input.prompt());
        }
    }

    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::ImagePathChanged(value) => {
                self.image_path = value;
                Task::none()
            }
            Message::AttachImage => {
                Self::load_image(PathBuf::from(self.image_path.trim()))
            }
            Message::ImageDropped(path) => {
                Self::load_image(path)
            }
            Message::ImageLoaded(path, result) => {
                match result {
                    Ok(attachment) => {
                        self.preview = Some(image::Handle::from_bytes(attachment.bytes.clone()));
                        self.image_path = path.display().to_string();
                        self.input.set_image(attachment);
                        self.error = None;
                    }
                    Err(e) => {
                        warn!("Could not attach image: {}", e);
                        self.error = Some(e);
                    }
                }
                Task::none()
            }
            Message::PromptEdited(action) => {
                let is_edit = action.is_edit();
                self.prompt_editor.perform(action);
                if is_edit {
                    self.sync_prompt_from_editor();
                }
                Task::none()
            }
            Message::Preset(preset) => {
                self.input.apply_preset(preset);
                self.prompt_editor = text_editor::Content::with_text(self.input.prompt());
                Task::none()
            }
            Message::ModelSelected(model) => {
                if let Err(e) = self.input.set_model(&model) {
                    self.error = Some(e.to_string());
                }
                Task::none()
            }
            Message::Submit => {
                self.error = None;
                match self.controller.begin(&self.input) {
                    Ok(pending) => {
                        self.loading_frame = 0;
                        Task::perform(pending.send(), Message::Finished)
                    }
                    Err(e) => {
                        self.error = Some(e.to_string());
                        Task::none()
                    }
                }
            }
            Message::Finished(outcome) => {
                if let Err(e) = self.controller.finish(outcome, &mut self.history) {
                    self.error = Some(e.to_string());
                }
                Task::none()
            }
            Message::Copy(id) => {
                let mut sink = TaskClipboard::default();
                self.history.copy_text(id, &mut sink);
                sink.task.unwrap_or_else(Task::none)
            }
            Message::Tick => {
                if self.controller.is_pending() {
                    self.loading_frame = (self.loading_frame + 1) % SPINNER_FRAMES.len();
                }
                Task::none()
            }
            Message::Exit => {
                iced::exit()
            }
        }
    }

    fn subscription(&self) -> Subscription<Message> {
        let timer = if self.controller.is_pending() {
            time::every(Duration::from_millis(80)).map(|_| Message::Tick)
        } else {
            Subscription::none()
        };

        let events = event::listen_with(|event, _status, _id| match event {
            IcedEvent::Keyboard(keyboard::Event::KeyPressed {
                key: Key::Named(keyboard::key::Named::Escape),
                ..
            }) => Some(Message::Exit),
            IcedEvent::Window(window::Event::FileDropped(path)) => Some(Message::ImageDropped(path)),
            _ => None,
        });

        Subscription::batch([timer, events])
    }

    fn view(&self) -> Element<Message> {
        let pending = self.controller.is_pending();

        let status = match self.controller.phase() {
            Phase::Pending => format!("{} Generating", SPINNER_FRAMES[self.loading_frame]),
            Phase::Failed { .. } => "Online | Last request failed".to_string(),
            Phase::Idle | Phase::Succeeded => "Online | Ready".to_string(),
        };
        let header = row![
            text("ProductVision").size(22),
            container(text(status).size(14))
                .width(Length::Fill)
                .align_x(alignment::Horizontal::Right),
        ]
        .align_y(alignment::Vertical::Center);

        container(
            column![header, row![self.input_panel(pending), self.history_panel()].spacing(20)]
                .spacing(15)
                .padding(15),
        )
        .width(Length::Fill)
        .height(Length::Fill)
        .into()
    }

    fn input_panel(&self, pending: bool) -> Element<Message> {
        let upload: Element<Message> = match &self.preview {
            Some(handle) => Image::<image::Handle>::new(handle.clone()).height(240).into(),
            None => container(text("Drag & drop your image here, or enter a path below").size(14))
                .height(240)
                .width(Length::Fill)
                .align_x(alignment::Horizontal::Center)
                .align_y(alignment::Vertical::Center)
                .into(),
        };

        let attached = match self.input.image() {
            Some(image) => format!("{} · {} · {} bytes", image.file_name, image.content_type, image.bytes.len()),
            None => "No image attached".to_string(),
        };

        let path_row = row![
            text_input("/path/to/image.png", &self.image_path)
                .on_input(Message::ImagePathChanged)
                .on_submit(Message::AttachImage)
                .padding(8),
            button(text("Attach")).on_press(Message::AttachImage).padding(8),
        ]
        .spacing(8);

        let prompt = text_editor(&self.prompt_editor)
            .placeholder("Enter your prompt here...")
            .on_action(Message::PromptEdited)
            .height(120)
            .padding(12)
            .size(16);

        let presets = PromptPreset::ALL
            .iter()
            .fold(row![].spacing(8), |row, preset| {
                row.push(button(text(preset.label()).size(13)).on_press(Message::Preset(*preset)))
            });
        let counter = text(format!("{} / {}", self.input.prompt_len(), PROMPT_MAX_CHARS)).size(13);

        let models = row![
            text("Select Model").size(14),
            pick_list(
                self.input.catalog().models(),
                Some(self.input.model().to_string()),
                Message::ModelSelected,
            ),
        ]
        .spacing(10)
        .align_y(alignment::Vertical::Center);

        let submit_label = if pending { "Generating..." } else { "Generate Description" };
        let submit = button(text(submit_label))
            .on_press_maybe((!pending).then_some(Message::Submit))
            .padding(12);

        let mut panel = column![
            upload,
            text(attached).size(12),
            path_row,
            text("Prompt Input").size(14),
            prompt,
            row![presets, container(counter).width(Length::Fill).align_x(alignment::Horizontal::Right)],
            models,
        ]
        .spacing(12)
        .width(Length::FillPortion(1));

        if let Some(error) = &self.error {
            panel = panel.push(text(error.as_str()).size(14).style(text::danger));
        }

        panel.push(submit).into()
    }

    fn history_panel(&self) -> Element<Message> {
        let title = if self.history.is_empty() {
            text("AI Generated Descriptions").size(18)
        } else {
            text(format!("AI Generated Descriptions ({})", self.history.len())).size(18)
        };

        let body: Element<Message> = if self.history.is_empty() {
            text("No descriptions yet. Upload an image and submit a prompt to get started.")
                .size(14)
                .into()
        } else {
            scrollable(
                Column::with_children(self.history.all().map(history_card))
                    .spacing(12)
                    .padding(5),
            )
            .height(Length::Fill)
            .into()
        };

        column![title, body]
            .spacing(12)
            .width(Length::FillPortion(1))
            .into()
    }

    fn theme(&self) -> Theme {
        Theme::TokyoNight
    }
}

fn history_card(entry: &HistoryEntry) -> Element<'_, Message> {
    let model = if entry.model().is_empty() { "Model" } else { entry.model() };

    container(
        column![
            row![
                text(model).size(14),
                container(text(entry.timestamp()).size(12))
                    .width(Length::Fill)
                    .align_x(alignment::Horizontal::Right),
            ],
            text(entry.text()).size(15),
            container(button(text("Copy").size(13)).on_press(Message::Copy(entry.id())))
                .width(Length::Fill)
                .align_x(alignment::Horizontal::Right),
        ]
        .spacing(8),
    )
    .padding(12)
    .style(container::rounded_box)
    .width(Length::Fill)
    .into()
}
