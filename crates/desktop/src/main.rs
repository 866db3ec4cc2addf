mod app;
mod settings;
mod workers;

use std::error::Error;
use std::process;
use std::sync::Arc;

use app::{App, AppContext};
use settings::Settings;

use facekey_core::capture::feed::CameraFeed;
use facekey_core::capture::infrastructure::v4l_camera::Camera;
use facekey_core::embedder::infrastructure::onnx_face_embedder::{
    OnnxFaceEmbedder, DEFAULT_CONFIDENCE,
};
use facekey_core::enrollment::Gallery;
use facekey_core::pipeline::verify_use_case::VerifyUseCase;
use facekey_core::shared::constants::{
    DETECTOR_MODEL_NAME, DETECTOR_MODEL_URL, EMBEDDING_MODEL_NAME, EMBEDDING_MODEL_URL,
};
use facekey_core::shared::model_resolver;
use facekey_core::unlock::{CommandUnlock, UnlockAction};

fn main() -> iced::Result {
    env_logger::init();

    let ctx = match bootstrap() {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    iced::application(move || App::new(ctx.clone()), App::update, App::view)
        .title("FaceKey")
        .theme(App::theme)
        .subscription(App::subscription)
        .window(iced::window::Settings {
            size: iced::Size::new(680.0, 620.0),
            resizable: false,
            ..Default::default()
        })
        .run()
}

/// Load settings, models and the gallery, and claim the camera.
///
/// Only a camera that cannot be opened is fatal here. A missing or
/// empty enrollment directory still brings the window up; every attempt
/// will simply be denied.
fn bootstrap() -> Result<AppContext, Box<dyn Error>> {
    let settings = Settings::load();

    let detector_path = model_resolver::resolve(
        DETECTOR_MODEL_NAME,
        DETECTOR_MODEL_URL,
        settings.model_dir.as_deref(),
    )?;
    let embedder_path = model_resolver::resolve(
        EMBEDDING_MODEL_NAME,
        EMBEDDING_MODEL_URL,
        settings.model_dir.as_deref(),
    )?;
    let embedder = Arc::new(OnnxFaceEmbedder::new(
        &detector_path,
        &embedder_path,
        DEFAULT_CONFIDENCE,
    )?);

    let gallery = Gallery::load(&settings.enroll_dir, embedder.as_ref());
    let enrolled_count = gallery.len();
    log::info!(
        "{} enrolled face(s) loaded from {}",
        enrolled_count,
        settings.enroll_dir.display()
    );

    let unlock: Arc<dyn UnlockAction> = Arc::new(match &settings.unlock_program {
        Some(program) => CommandUnlock::new(program.clone()),
        None => CommandUnlock::default_editor(),
    });

    let verify = Arc::new(VerifyUseCase::new(
        embedder,
        Arc::new(gallery),
        unlock,
        settings.threshold,
        settings.match_policy.to_match_policy(),
    ));

    let camera = Camera::open(&settings.camera_device)?;
    let feed = Arc::new(CameraFeed::start(camera));

    settings.save_if_absent();

    Ok(AppContext {
        feed,
        verify,
        enrolled_count,
    })
}
