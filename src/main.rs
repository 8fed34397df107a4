use iced::widget::{button, column, container, row, scrollable, text, text_input, Column};
use iced::{Alignment, Element, Length, Task, Theme};
use rfd::{FileDialog, MessageDialog, MessageLevel};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

mod batch;
mod config;
mod error;
mod gemini;
mod ledger;

use batch::{BatchEvent, BatchJob};
use gemini::CopyWriter;

const LOG_SCROLLABLE: &str = "batch-log";

/// Main application state
struct CopyStudio {
    /// Shared Gemini writer; one instance keeps a single key-rotation
    /// cursor for the lifetime of the process.
    writer: Arc<Mutex<CopyWriter>>,
    /// Folder picked by the user, if any
    folder: Option<PathBuf>,
    /// Raw contents of the image-count input
    count_input: String,
    /// Progress lines streamed from the batch worker
    log_lines: Vec<String>,
    /// True while a batch run is in flight; guards against overlapping runs
    running: bool,
}

/// Application messages (events)
#[derive(Debug, Clone)]
enum Message {
    /// User clicked the folder picker button
    PickFolder,
    /// User edited the image-count input
    CountChanged(String),
    /// User clicked the generate button
    Generate,
    /// Progress event from the background batch worker
    Batch(BatchEvent),
}

impl CopyStudio {
    /// Create a new instance of the application
    fn new() -> (Self, Task<Message>) {
        // No usable API key is a fatal configuration error: the app
        // cannot generate anything without one.
        let writer = CopyWriter::from_env()
            .expect("No Gemini API key found. Set GEMINI_KEY_1 through GEMINI_KEY_5.");

        println!("🔑 Loaded {} Gemini API key(s)", writer.key_count());

        (
            CopyStudio {
                writer: Arc::new(Mutex::new(writer)),
                folder: None,
                count_input: "1".to_string(),
                log_lines: Vec::new(),
                running: false,
            },
            Task::none(),
        )
    }

    /// Handle application messages and update state
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::PickFolder => {
                let folder = FileDialog::new()
                    .set_title("Select the image folder")
                    .pick_folder();

                if let Some(folder) = folder {
                    self.folder = Some(folder);
                }

                Task::none()
            }
            Message::CountChanged(value) => {
                self.count_input = value;
                Task::none()
            }
            Message::Generate => {
                if self.running {
                    return Task::none();
                }

                let Some(folder) = self.folder.clone().filter(|path| path.is_dir()) else {
                    show_error("Select a valid folder.");
                    return Task::none();
                };

                let limit = self.count_input.trim().parse::<usize>().unwrap_or(0);
                if limit == 0 {
                    show_error("The image count must be greater than 0.");
                    return Task::none();
                }

                self.running = true;

                // Launch the batch worker and stream its progress back here
                Task::run(
                    batch::run(BatchJob::new(folder, limit), self.writer.clone()),
                    Message::Batch,
                )
            }
            Message::Batch(BatchEvent::Log(line)) => {
                self.log_lines.push(line);

                // Keep the latest line visible
                scrollable::snap_to(
                    scrollable::Id::new(LOG_SCROLLABLE),
                    scrollable::RelativeOffset::END,
                )
            }
            Message::Batch(BatchEvent::Finished) => {
                self.running = false;
                Task::none()
            }
        }
    }

    /// Build the user interface
    fn view(&self) -> Element<Message> {
        let folder_display = self
            .folder
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_default();

        let log_view: Column<Message> = self
            .log_lines
            .iter()
            .fold(column![].spacing(2), |col, line| {
                col.push(text(line).size(14))
            });

        let content = column![
            text("Copy Studio").size(32),
            row![
                text_input("No folder selected", &folder_display).width(Length::Fill),
                button("Select folder").on_press(Message::PickFolder),
            ]
            .spacing(10)
            .align_y(Alignment::Center),
            row![
                text("Number of images:"),
                text_input("1", &self.count_input)
                    .on_input(Message::CountChanged)
                    .width(Length::Fixed(80.0)),
            ]
            .spacing(10)
            .align_y(Alignment::Center),
            button(if self.running {
                "Generating…"
            } else {
                "Generate copy"
            })
            .on_press_maybe((!self.running).then_some(Message::Generate))
            .padding(10),
            text("Log:"),
            scrollable(log_view)
                .id(scrollable::Id::new(LOG_SCROLLABLE))
                .width(Length::Fill)
                .height(Length::Fill),
        ]
        .spacing(15)
        .padding(20);

        container(content)
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    /// Set the application theme
    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

/// Blocking error dialog for pre-run validation failures
fn show_error(description: &str) {
    MessageDialog::new()
        .set_level(MessageLevel::Error)
        .set_title("Error")
        .set_description(description)
        .show();
}

fn main() -> iced::Result {
    iced::application("Copy Studio", CopyStudio::update, CopyStudio::view)
        .theme(CopyStudio::theme)
        .window_size((700.0, 500.0))
        .centered()
        .run_with(CopyStudio::new)
}
