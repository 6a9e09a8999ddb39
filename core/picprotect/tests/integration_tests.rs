use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};

use approx::assert_relative_eq;
use image::{DynamicImage, RgbImage};
use picprotect::{
    BlockPixelator, Compositor, DetectionOutcome, Editor, FaceBounds, FaceDetector, FaceLocator,
    NormalizedRect, OutputFormat, PicProtectError, PixelBounds, Pixelator, Point, Size,
};

fn make_test_image(width: u32, height: u32) -> DynamicImage {
    let mut img = RgbImage::new(width, height);
    for (x, y, pixel) in img.enumerate_pixels_mut() {
        *pixel = image::Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            ((x * 31 + y * 17) % 256) as u8,
        ]);
    }
    DynamicImage::ImageRgb8(img)
}

/// Mock face detector returning a fixed list.
struct MockDetector {
    faces: Vec<FaceBounds>,
}

impl MockDetector {
    fn with_faces(rects: &[NormalizedRect]) -> Self {
        Self {
            faces: rects
                .iter()
                .map(|&rect| FaceBounds {
                    rect,
                    confidence: 10.0,
                })
                .collect(),
        }
    }
}

impl FaceDetector for MockDetector {
    fn detect(&self, _image: &DynamicImage) -> Result<Vec<FaceBounds>, PicProtectError> {
        Ok(self.faces.clone())
    }
}

struct FailingDetector;

impl FaceDetector for FailingDetector {
    fn detect(&self, _image: &DynamicImage) -> Result<Vec<FaceBounds>, PicProtectError> {
        Err(PicProtectError::DetectionFailed("service unavailable".into()))
    }
}

/// Reports one face per call, but only after the test lets it through.
struct GatedDetector {
    gate: Mutex<mpsc::Receiver<()>>,
    calls: AtomicUsize,
}

impl FaceDetector for GatedDetector {
    fn detect(&self, _image: &DynamicImage) -> Result<Vec<FaceBounds>, PicProtectError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let _ = self.gate.lock().unwrap().recv();
        // Each call reports a different number of faces so results are distinguishable
        Ok((0..=call)
            .map(|i| FaceBounds {
                rect: NormalizedRect::new(0.1 * i as f64, 0.1, 0.1, 0.1),
                confidence: 1.0,
            })
            .collect())
    }
}

struct BrokenPixelator;

impl Pixelator for BrokenPixelator {
    fn pixelate(&self, _image: &DynamicImage, _block_size: u32) -> Option<DynamicImage> {
        None
    }
}

/// Block pixelator that counts how often it runs.
struct CountingPixelator(Arc<AtomicUsize>);

impl Pixelator for CountingPixelator {
    fn pixelate(&self, image: &DynamicImage, block_size: u32) -> Option<DynamicImage> {
        self.0.fetch_add(1, Ordering::SeqCst);
        BlockPixelator.pixelate(image, block_size)
    }
}

/// Left face in the lower-left quarter, right face in the upper-right quarter.
fn two_disjoint_faces() -> Vec<NormalizedRect> {
    vec![
        NormalizedRect::new(0.0, 0.0, 0.25, 0.25),
        NormalizedRect::new(0.75, 0.75, 0.25, 0.25),
    ]
}

fn editor_with(detector: impl FaceDetector + 'static) -> Editor {
    Editor::new(
        FaceLocator::new(Arc::new(detector)),
        Compositor::new(Box::new(BlockPixelator), 12),
    )
}

fn detected_editor(image: DynamicImage, rects: &[NormalizedRect]) -> Editor {
    let mut editor = editor_with(MockDetector::with_faces(rects));
    let pending = editor.import(image);
    match editor.complete_detection(pending) {
        DetectionOutcome::Applied(n) => assert_eq!(n, rects.len()),
        other => panic!("unexpected outcome {other:?}"),
    }
    editor
}

#[test]
fn zero_faces_means_no_overlays_and_original_output() {
    let image = make_test_image(120, 80);
    let mut editor = detected_editor(image.clone(), &[]);
    editor.layout(Size::new(300.0, 300.0));

    assert!(editor.overlays().is_empty());
    assert!(editor.regions().is_empty());
    editor.set_all(true);
    assert_eq!(editor.displayed().unwrap().to_rgba8(), image.to_rgba8());
}

#[test]
fn zero_selection_is_pixel_identical() {
    let image = make_test_image(96, 96);
    let editor = detected_editor(image.clone(), &two_disjoint_faces());
    assert_eq!(editor.displayed().unwrap().to_rgba8(), image.to_rgba8());
}

#[test]
fn toggle_round_trip_restores_original() {
    let image = make_test_image(96, 96);
    let mut editor = detected_editor(image.clone(), &two_disjoint_faces());
    let id = editor.regions().iter().next().unwrap().id();

    for _ in 0..3 {
        assert_eq!(editor.toggle(id), Some(true));
        assert_ne!(editor.displayed().unwrap().to_rgba8(), image.to_rgba8());
        assert_eq!(editor.toggle(id), Some(false));
        assert_eq!(editor.displayed().unwrap().to_rgba8(), image.to_rgba8());
    }
}

#[test]
fn disjoint_selection_only_touches_first_face() {
    let image = make_test_image(96, 96);
    let mut editor = detected_editor(image.clone(), &two_disjoint_faces());
    let first = editor.regions().iter().next().unwrap().id();
    editor.toggle(first);

    // Lower-left quarter of a 96x96 image, in top-left pixel coordinates
    let clip = PixelBounds {
        x: 0,
        y: 72,
        width: 24,
        height: 24,
    };
    let out = editor.displayed().unwrap().to_rgba8();
    let orig = image.to_rgba8();
    let pixelated = BlockPixelator.pixelate(&image, 12).unwrap().to_rgba8();

    let mut changed = 0;
    for (x, y, pixel) in out.enumerate_pixels() {
        if clip.contains(x, y) {
            assert_eq!(pixel, pixelated.get_pixel(x, y));
            if pixel != orig.get_pixel(x, y) {
                changed += 1;
            }
        } else {
            assert_eq!(pixel, orig.get_pixel(x, y), "({x}, {y}) outside the face changed");
        }
    }
    assert!(changed > 0, "selected face should look different");
}

#[test]
fn overlays_follow_layout_and_flip() {
    // 200x100 image in a 400x400 container → displayed at 400x200, y offset 100
    let image = make_test_image(200, 100);
    let mut editor = detected_editor(image, &[NormalizedRect::new(0.5, 0.25, 0.25, 0.5)]);
    editor.layout(Size::new(400.0, 400.0));

    let display = editor.display_rect();
    assert_relative_eq!(display.y, 100.0);
    assert_relative_eq!(display.height, 200.0);

    let overlays = editor.overlays();
    assert_eq!(overlays.len(), 1);
    let rect = overlays[0].rect;
    assert_relative_eq!(rect.width, 100.0, epsilon = 1e-9);
    assert_relative_eq!(rect.height, 100.0, epsilon = 1e-9);
    assert_relative_eq!(rect.x, 200.0, epsilon = 1e-9);
    assert_relative_eq!(rect.y, (1.0 - 0.25) * 200.0 - 100.0 + 100.0, epsilon = 1e-9);
}

#[test]
fn relayout_after_rotation_recomputes_overlays() {
    let image = make_test_image(200, 100);
    let mut editor = detected_editor(image, &two_disjoint_faces());

    editor.layout(Size::new(400.0, 800.0));
    let portrait = editor.overlays().to_vec();
    editor.layout(Size::new(800.0, 400.0));
    let landscape = editor.overlays().to_vec();
    editor.layout(Size::new(400.0, 800.0));

    assert_eq!(portrait.len(), 2);
    assert_eq!(landscape.len(), 2);
    assert_ne!(portrait, landscape);
    assert_eq!(editor.overlays(), portrait.as_slice());
}

#[test]
fn layout_before_import_is_harmless() {
    let mut editor = editor_with(MockDetector::with_faces(&two_disjoint_faces()));
    editor.layout(Size::new(300.0, 300.0));
    assert!(editor.overlays().is_empty());
    assert!(editor.tap(Point::new(10.0, 10.0)).is_none());
}

#[test]
fn zero_container_yields_no_overlays() {
    let image = make_test_image(64, 64);
    let mut editor = detected_editor(image, &two_disjoint_faces());
    editor.layout(Size::new(0.0, 0.0));
    assert!(editor.overlays().is_empty());
}

#[test]
fn tap_toggles_the_face_under_the_point() {
    let image = make_test_image(100, 100);
    let mut editor = detected_editor(image.clone(), &two_disjoint_faces());
    editor.layout(Size::new(100.0, 100.0));

    // Lower-left face spans x 0..25, y 75..100 on screen
    let hit = editor.tap(Point::new(10.0, 90.0)).unwrap();
    assert_eq!(hit, editor.regions().iter().next().unwrap().id());
    assert!(editor.regions().get(hit).unwrap().is_selected());
    assert!(editor.overlays()[0].selected);

    assert!(editor.tap(Point::new(50.0, 50.0)).is_none());

    editor.tap(Point::new(10.0, 90.0));
    assert_eq!(editor.displayed().unwrap().to_rgba8(), image.to_rgba8());
}

#[test]
fn failed_detection_is_reported_and_absorbed() {
    let image = make_test_image(64, 64);
    let mut editor = editor_with(FailingDetector);
    let pending = editor.import(image.clone());

    match editor.complete_detection(pending) {
        DetectionOutcome::Failed(PicProtectError::DetectionFailed(_)) => {}
        other => panic!("unexpected outcome {other:?}"),
    }
    assert!(editor.regions().is_empty());
    assert_eq!(editor.displayed().unwrap().to_rgba8(), image.to_rgba8());
}

#[test]
fn stale_detection_is_discarded() {
    let (release, gate) = mpsc::channel();
    let mut editor = editor_with(GatedDetector {
        gate: Mutex::new(gate),
        calls: AtomicUsize::new(0),
    });

    let first = editor.import(make_test_image(64, 64));
    let second = editor.import(make_test_image(32, 32));

    release.send(()).unwrap();
    release.send(()).unwrap();

    assert!(matches!(
        editor.complete_detection(first),
        DetectionOutcome::Superseded
    ));
    assert!(editor.regions().is_empty());

    match editor.complete_detection(second) {
        DetectionOutcome::Applied(n) => assert_eq!(n, editor.regions().len()),
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(editor.original().unwrap().width(), 32);
}

#[test]
fn poll_detection_applies_once_ready() {
    let (release, gate) = mpsc::channel();
    let mut editor = editor_with(GatedDetector {
        gate: Mutex::new(gate),
        calls: AtomicUsize::new(0),
    });
    let pending = editor.import(make_test_image(64, 64));

    assert!(editor.poll_detection(&pending).is_none());
    release.send(()).unwrap();

    let outcome = loop {
        if let Some(outcome) = editor.poll_detection(&pending) {
            break outcome;
        }
        std::thread::yield_now();
    };
    assert!(matches!(outcome, DetectionOutcome::Applied(1)));
    assert_eq!(editor.regions().len(), 1);
}

#[test]
fn poll_after_completion_reports_nothing() {
    let mut editor = editor_with(MockDetector::with_faces(&two_disjoint_faces()));
    let pending = editor.import(make_test_image(64, 64));

    let outcome = loop {
        if let Some(outcome) = editor.poll_detection(&pending) {
            break outcome;
        }
        std::thread::yield_now();
    };
    assert!(matches!(outcome, DetectionOutcome::Applied(2)));
    let id = editor.regions().iter().next().unwrap().id();
    editor.toggle(id);

    // The worker has exited; polling again must not look like a failure
    for _ in 0..3 {
        assert!(editor.poll_detection(&pending).is_none());
    }
    assert_eq!(editor.regions().len(), 2);
    assert!(editor.regions().get(id).unwrap().is_selected());
}

#[test]
fn select_only_renders_once_and_ignores_repeats() {
    let calls = Arc::new(AtomicUsize::new(0));
    let image = make_test_image(96, 96);
    let mut editor = Editor::new(
        FaceLocator::new(Arc::new(MockDetector::with_faces(&two_disjoint_faces()))),
        Compositor::new(Box::new(CountingPixelator(calls.clone())), 12),
    );
    let pending = editor.import(image.clone());
    editor.complete_detection(pending);
    editor.layout(Size::new(96.0, 96.0));
    let ids: Vec<_> = editor.regions().iter().map(|r| r.id()).collect();

    assert_eq!(editor.select_only(&[ids[1], ids[1]]), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(editor.regions().get(ids[1]).unwrap().is_selected());
    assert!(!editor.regions().get(ids[0]).unwrap().is_selected());
    assert_ne!(editor.displayed().unwrap().to_rgba8(), image.to_rgba8());
    assert!(editor.overlays()[1].selected);
    assert!(!editor.overlays()[0].selected);

    assert_eq!(editor.select_only(&[]), 0);
    assert_eq!(editor.displayed().unwrap().to_rgba8(), image.to_rgba8());
}

#[test]
fn stale_region_id_is_ignored_after_reimport() {
    let image = make_test_image(64, 64);
    let mut editor = detected_editor(image.clone(), &two_disjoint_faces());
    let old = editor.regions().iter().next().unwrap().id();

    let pending = editor.import(image);
    editor.complete_detection(pending);

    assert_eq!(editor.toggle(old), None);
    assert!(!editor.regions().any_selected());
}

#[test]
fn broken_pixelator_leaves_display_unchanged() {
    let image = make_test_image(64, 64);
    let mut editor = Editor::new(
        FaceLocator::new(Arc::new(MockDetector::with_faces(&two_disjoint_faces()))),
        Compositor::new(Box::new(BrokenPixelator), 12),
    );
    let pending = editor.import(image.clone());
    editor.complete_detection(pending);

    let id = editor.regions().iter().next().unwrap().id();
    assert_eq!(editor.toggle(id), Some(true));
    // Selection sticks even though nothing could be drawn
    assert!(editor.regions().get(id).unwrap().is_selected());
    assert_eq!(editor.displayed().unwrap().to_rgba8(), image.to_rgba8());
}

#[test]
fn export_encodes_the_displayed_image() {
    let image = make_test_image(48, 48);
    let mut editor = detected_editor(image, &two_disjoint_faces());
    editor.set_all(true);

    let png = editor.export(OutputFormat::Png, 1.0).unwrap();
    let decoded = picprotect::decode_image(&png).unwrap();
    assert_eq!(decoded.to_rgba8(), editor.displayed().unwrap().to_rgba8());

    let jpeg = editor.export(OutputFormat::Jpeg, 0.8).unwrap();
    assert_eq!(jpeg[0], 0xFF);
    assert_eq!(jpeg[1], 0xD8);
}

#[test]
fn export_without_image_fails() {
    let editor = editor_with(FailingDetector);
    assert!(matches!(
        editor.export(OutputFormat::Png, 1.0),
        Err(PicProtectError::NothingToExport)
    ));
}

#[test]
fn import_bytes_rejects_garbage() {
    let mut editor = editor_with(FailingDetector);
    assert!(editor.import_bytes(b"not an image").is_err());
    assert!(editor.original().is_none());
}

#[cfg(not(feature = "rustface"))]
#[test]
fn from_settings_without_backend_reports_no_detector() {
    let result = Editor::from_settings(&picprotect::Settings::default());
    assert!(matches!(result, Err(PicProtectError::NoDetector)));
}

#[cfg(feature = "rustface")]
#[test]
fn from_settings_without_model_reports_no_detector() {
    let result = Editor::from_settings(&picprotect::Settings::default());
    assert!(matches!(result, Err(PicProtectError::NoDetector)));
}

#[cfg(feature = "rustface")]
#[test]
fn from_settings_with_missing_model_file_fails() {
    let mut settings = picprotect::Settings::default();
    settings.detector.model_path = Some("does/not/exist.bin".into());
    let result = Editor::from_settings(&settings);
    assert!(matches!(result, Err(PicProtectError::DetectorModel(_))));
}
