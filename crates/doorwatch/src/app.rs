//! The display/loop driver.
//!
//! Owns every device for the lifetime of the run: camera, ONNX sessions,
//! audio output, preview window. Startup is fail-fast; the loop itself only
//! ends on ESC or when the camera stops delivering frames.

use crate::config::Config;
use crate::overlay;
use anyhow::{Context, Result};
use doorwatch_audio::{AudioController, RodioPlayer, SoundBank};
use doorwatch_core::{classify, FaceDetector, FaceIdentifier, FaceRecognizer, ObjectDetector};
use doorwatch_hw::{Camera, Frame};
use opencv::core::{Mat, Scalar, CV_8UC3};
use opencv::highgui;
use opencv::prelude::*;
use std::time::Instant;

const WINDOW_NAME: &str = "doorwatch";
const ESC_KEY: i32 = 27;

pub fn run(config: &Config) -> Result<()> {
    let camera = Camera::open(&config.camera_device)
        .with_context(|| format!("opening camera {}", config.camera_device))?;

    let mut objects = ObjectDetector::load(&config.yolo_model_path())
        .context("loading object detection model")?;
    let detector = FaceDetector::load(&config.scrfd_model_path())
        .context("loading face detection model")?;
    let recognizer = FaceRecognizer::load(&config.arcface_model_path())
        .context("loading face recognition model")?;

    let mut identifier = FaceIdentifier::new(detector, recognizer, config.similarity_threshold);
    let enrolled = identifier
        .load_gallery(&config.gallery_dir)
        .context("loading reference gallery")?;
    tracing::info!(enrolled, dir = %config.gallery_dir.display(), "reference gallery loaded");

    let sounds = SoundBank::from_dir(&config.sound_dir).context("resolving sound files")?;
    let player = RodioPlayer::new().context("opening audio output")?;

    let started = Instant::now();
    let mut controller =
        AudioController::start(player, sounds, config.delays, started).context("starting background track")?;

    highgui::named_window(WINDOW_NAME, highgui::WINDOW_AUTOSIZE)
        .context("opening preview window")?;

    let mut stream = camera.stream().context("starting capture stream")?;
    tracing::info!("watching; press ESC in the preview window to quit");

    loop {
        // A read failure is end-of-stream, not a crash.
        let frame = match stream.next_frame() {
            Ok(frame) => frame,
            Err(e) => {
                tracing::info!(error = %e, "capture ended, shutting down");
                break;
            }
        };

        let detections = objects.detect(&frame.rgb, frame.width, frame.height)?;
        let luma = frame.luma();
        let category = classify(&detections, &luma, frame.width, frame.height, &mut identifier)?;
        tracing::trace!(%category, detections = detections.len(), seq = frame.sequence, "frame classified");

        let mut preview = bgr_preview(&frame)?;
        overlay::draw_label(&mut preview, category, started.elapsed())?;
        highgui::imshow(WINDOW_NAME, &preview)?;

        controller.tick(category, Instant::now())?;

        if highgui::wait_key(1)? == ESC_KEY {
            tracing::info!("ESC pressed, shutting down");
            break;
        }
    }

    controller.stop();
    let _ = highgui::destroy_all_windows();
    Ok(())
}

/// Copy a captured RGB frame into a BGR `Mat` for display.
fn bgr_preview(frame: &Frame) -> Result<Mat> {
    let mut mat = Mat::new_rows_cols_with_default(
        frame.height as i32,
        frame.width as i32,
        CV_8UC3,
        Scalar::all(0.0),
    )?;

    let data = mat.data_bytes_mut()?;
    for (dst, src) in data.chunks_exact_mut(3).zip(frame.rgb.chunks_exact(3)) {
        dst[0] = src[2];
        dst[1] = src[1];
        dst[2] = src[0];
    }

    Ok(mat)
}
