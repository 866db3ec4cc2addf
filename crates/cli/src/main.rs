use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use facekey_core::capture::infrastructure::v4l_camera::Camera;
use facekey_core::embedder::infrastructure::onnx_face_embedder::{
    OnnxFaceEmbedder, DEFAULT_CONFIDENCE,
};
use facekey_core::enrollment::Gallery;
use facekey_core::matching::MatchPolicy;
use facekey_core::pipeline::verify_use_case::{VerifyOutcome, VerifyUseCase};
use facekey_core::shared::constants::{
    DEFAULT_CAMERA_DEVICE, DEFAULT_ENROLL_DIR, DEFAULT_THRESHOLD, DETECTOR_MODEL_NAME,
    DETECTOR_MODEL_URL, EMBEDDING_MODEL_NAME, EMBEDDING_MODEL_URL,
};
use facekey_core::shared::model_resolver;
use facekey_core::unlock::{CommandUnlock, NoopUnlock, UnlockAction};

/// Headless diagnostics for face-verified app launching.
#[derive(Parser)]
#[command(name = "facekey")]
struct Cli {
    /// Directory of enrolled reference photos.
    #[arg(long, default_value = DEFAULT_ENROLL_DIR)]
    auth_dir: PathBuf,

    /// Directory with pre-placed ONNX models (skips the download cache).
    #[arg(long)]
    model_dir: Option<PathBuf>,

    /// Maximum Euclidean distance for a positive match.
    #[arg(long, default_value_t = DEFAULT_THRESHOLD)]
    threshold: f32,

    /// Grant the closest enrolled face instead of the first one under
    /// the threshold.
    #[arg(long)]
    closest: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load the enrollment directory and list what embedded successfully.
    Gallery,
    /// Capture one frame and run a verification attempt.
    Verify {
        /// V4L2 camera device.
        #[arg(long, default_value = DEFAULT_CAMERA_DEVICE)]
        camera: String,

        /// Program to launch when access is granted.
        #[arg(long)]
        unlock_program: Option<String>,

        /// Report the outcome without launching anything.
        #[arg(long)]
        no_unlock: bool,
    },
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let embedder = build_embedder(cli.model_dir.as_deref())?;
    let gallery = Gallery::load(&cli.auth_dir, embedder.as_ref());

    match cli.command {
        Command::Gallery => {
            println!(
                "{} enrolled face(s) in {}",
                gallery.len(),
                cli.auth_dir.display()
            );
            for face in gallery.faces() {
                println!("  {} ({} dims)", face.label, face.embedding.len());
            }
            Ok(())
        }
        Command::Verify {
            camera,
            unlock_program,
            no_unlock,
        } => {
            let unlock: Arc<dyn UnlockAction> = if no_unlock {
                Arc::new(NoopUnlock)
            } else {
                Arc::new(match unlock_program {
                    Some(program) => CommandUnlock::new(program),
                    None => CommandUnlock::default_editor(),
                })
            };

            let policy = if cli.closest {
                MatchPolicy::Closest
            } else {
                MatchPolicy::FirstUnderThreshold
            };
            let use_case = VerifyUseCase::new(
                embedder,
                Arc::new(gallery),
                unlock,
                cli.threshold,
                policy,
            );

            let camera = Camera::open(&camera)?;
            let frame = camera.capture_frame()?;
            let outcome = use_case.execute(&frame);
            println!("{outcome}");

            if !matches!(outcome, VerifyOutcome::Granted { .. }) {
                process::exit(1);
            }
            Ok(())
        }
    }
}

fn build_embedder(
    model_dir: Option<&std::path::Path>,
) -> Result<Arc<OnnxFaceEmbedder>, Box<dyn std::error::Error>> {
    let detector_path =
        model_resolver::resolve(DETECTOR_MODEL_NAME, DETECTOR_MODEL_URL, model_dir)?;
    let embedder_path =
        model_resolver::resolve(EMBEDDING_MODEL_NAME, EMBEDDING_MODEL_URL, model_dir)?;
    Ok(Arc::new(OnnxFaceEmbedder::new(
        &detector_path,
        &embedder_path,
        DEFAULT_CONFIDENCE,
    )?))
}
