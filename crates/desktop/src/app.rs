use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::Receiver;
use iced::widget::{button, column, container, image, text};
use iced::{Element, Length, Subscription, Task, Theme};

use facekey_core::capture::domain::frame_source::FrameSource;
use facekey_core::capture::feed::CameraFeed;
use facekey_core::pipeline::verify_use_case::{VerifyOutcome, VerifyUseCase};
use facekey_core::shared::frame::Frame;

use crate::workers::verify_worker;

/// Display refresh interval for the live preview.
const TICK_INTERVAL: Duration = Duration::from_millis(10);

/// Everything bootstrapped before the event loop starts. Cloning is
/// cheap; all the heavy parts sit behind `Arc`.
#[derive(Clone)]
pub struct AppContext {
    pub feed: Arc<CameraFeed>,
    pub verify: Arc<VerifyUseCase>,
    pub enrolled_count: usize,
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum Message {
    Tick,
    VerifyPressed,
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

pub struct App {
    ctx: AppContext,
    video: Option<image::Handle>,
    last_frame: Option<Frame>,
    status: String,
    pending: Option<Receiver<VerifyOutcome>>,
}

impl App {
    pub fn new(ctx: AppContext) -> (Self, Task<Message>) {
        let status = if ctx.enrolled_count == 0 {
            "No enrolled faces found".to_string()
        } else {
            String::new()
        };
        (
            Self {
                ctx,
                video: None,
                last_frame: None,
                status,
                pending: None,
            },
            Task::none(),
        )
    }

    pub fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::Tick => {
                if let Some(frame) = self.ctx.feed.current_frame() {
                    self.video = Some(image::Handle::from_rgba(
                        frame.width(),
                        frame.height(),
                        frame.to_rgba_bytes(),
                    ));
                    self.last_frame = Some(frame);
                }
                if let Some(rx) = &self.pending {
                    if let Ok(outcome) = rx.try_recv() {
                        self.status = outcome.to_string();
                        self.pending = None;
                    }
                }
            }
            Message::VerifyPressed => {
                // The button is only pressable while idle, but a stale
                // press can still arrive the same tick an outcome lands.
                if self.pending.is_none() {
                    if let Some(frame) = self.last_frame.clone() {
                        self.status = "Verifying...".to_string();
                        self.pending = Some(verify_worker::spawn(self.ctx.verify.clone(), frame));
                    }
                }
            }
        }
        Task::none()
    }

    pub fn view(&self) -> Element<'_, Message> {
        let title = text("Face Recognition System").size(24);

        let video: Element<'_, Message> = match &self.video {
            Some(handle) => image(handle.clone())
                .width(Length::Fixed(640.0))
                .height(Length::Fixed(480.0))
                .into(),
            None => container(text("Waiting for camera...").size(16))
                .center_x(Length::Fixed(640.0))
                .center_y(Length::Fixed(480.0))
                .into(),
        };

        let verify = {
            let btn = button(text("Verify Face").size(16)).padding([8, 24]);
            // Disabled while an attempt is in flight or no frame arrived yet.
            if self.pending.is_none() && self.last_frame.is_some() {
                btn.on_press(Message::VerifyPressed)
            } else {
                btn
            }
        };

        let status = text(&self.status).size(16);

        container(
            column![title, video, verify, status]
                .spacing(12)
                .align_x(iced::Alignment::Center),
        )
        .width(Length::Fill)
        .height(Length::Fill)
        .center_x(Length::Fill)
        .padding(16)
        .into()
    }

    pub fn theme(&self) -> Theme {
        Theme::Dark
    }

    pub fn subscription(&self) -> Subscription<Message> {
        iced::time::every(TICK_INTERVAL).map(|_| Message::Tick)
    }
}
