use std::path::{Path, PathBuf};

use crate::pipeline::face_selection::Selection;
use crate::pipeline::frame_batch_executor::{FrameBatchExecutor, FrameUpdate};
use crate::pipeline::status_reporter::StatusReporter;
use crate::pipeline::swap_session::SwapSession;
use crate::shared::constants::COMPONENT_NAME;
use crate::shared::error::SwapError;
use crate::shared::face::Face;
use crate::shared::frame::Frame;
use crate::shared::media_type::{is_image, is_video};
use crate::video::domain::frame_reader::FrameReader;
use crate::video::domain::image_writer::ImageWriter;

pub const MSG_SELECT_SOURCE_IMAGE: &str = "Select an image for source path.";
pub const MSG_NO_SOURCE_FACE: &str = "No face in source path detected.";
pub const MSG_SELECT_TARGET: &str = "Select an image or video for target path.";

/// Face swap orchestration: validate → resolve faces → swap → write.
///
/// Still images are processed in one step. Video targets arrive as a list
/// of already-extracted frame files that are rewritten in place, batch by
/// batch, through the frame batch executor.
pub struct FaceSwapUseCase {
    session: SwapSession,
    reader: Box<dyn FrameReader>,
    writer: Box<dyn ImageWriter>,
    status: Box<dyn StatusReporter>,
    executor: Box<dyn FrameBatchExecutor>,
}

impl FaceSwapUseCase {
    pub fn new(
        session: SwapSession,
        reader: Box<dyn FrameReader>,
        writer: Box<dyn ImageWriter>,
        status: Box<dyn StatusReporter>,
        executor: Box<dyn FrameBatchExecutor>,
    ) -> Self {
        Self {
            session,
            reader,
            writer,
            status,
            executor,
        }
    }

    pub fn session(&self) -> &SwapSession {
        &self.session
    }

    /// Makes sure the swap model artifact is available locally.
    pub fn pre_check(&self) -> Result<(), SwapError> {
        self.session.ensure_swapper_available()
    }

    /// Checks the run inputs, reporting the first problem through the
    /// status reporter. Never fails; `false` means the run must not start.
    pub fn validate_inputs(&self, source_path: &Path, target_path: &Path) -> bool {
        if !is_image(source_path) {
            self.report(MSG_SELECT_SOURCE_IMAGE);
            return false;
        }
        if !self.source_has_face(source_path) {
            self.report(MSG_NO_SOURCE_FACE);
            return false;
        }
        if !is_image(target_path) && !is_video(target_path) {
            self.report(MSG_SELECT_TARGET);
            return false;
        }
        true
    }

    pub fn swap_face(&self, source_face: &Face, target_face: &Face, frame: &Frame) -> Result<Frame, SwapError> {
        self.session.swapper()?.swap(source_face, target_face, frame)
    }

    /// Swaps every selected target in `frame`, left to right. Each swap sees
    /// the result of the previous one.
    pub fn process_frame(
        &self,
        source_face: &Face,
        reference_face: Option<&Face>,
        frame: Frame,
    ) -> Result<Frame, SwapError> {
        let config = self.session.config();
        let selection = Selection::new(config.many_faces, reference_face, config.similar_face_distance);
        let targets = selection.targets(self.session.analyser(), &frame)?;
        log::debug!("Swapping {} face(s)", targets.len());
        targets
            .iter()
            .try_fold(frame, |frame, target| self.swap_face(source_face, target, &frame))
    }

    /// Rewrites each frame file in place, calling `update` once per frame.
    pub fn process_frames(
        &self,
        source_path: &Path,
        frame_paths: &[PathBuf],
        update: &FrameUpdate<'_>,
    ) -> Result<(), SwapError> {
        let source_face = self.source_face(source_path)?;
        let reference = self.session.reference_face()?;
        if !self.session.config().many_faces && reference.is_none() {
            log::warn!("No reference face set; frames are written back unchanged");
        }

        for path in frame_paths {
            let frame = self.reader.read(path)?;
            let swapped = self.process_frame(&source_face, reference.as_ref(), frame)?;
            self.writer.write(path, &swapped)?;
            update();
        }
        Ok(())
    }

    /// Swaps faces in a single target image and writes the result to
    /// `output_path`, which must differ from both inputs.
    pub fn process_image(&self, source_path: &Path, target_path: &Path, output_path: &Path) -> Result<(), SwapError> {
        if same_file(output_path, source_path) || same_file(output_path, target_path) {
            return Err(SwapError::OutputOverwritesInput(output_path.to_path_buf()));
        }

        let source_face = self.source_face(source_path)?;
        let target_frame = self.reader.read(target_path)?;
        let config = self.session.config();
        let reference = if config.many_faces {
            None
        } else {
            self.session
                .analyser()
                .detect_one_at(&target_frame, config.reference_face_position)?
        };

        let swapped = self.process_frame(&source_face, reference.as_ref(), target_frame)?;
        self.writer.write(output_path, &swapped)?;
        log::info!("Swapped image written to {}", output_path.display());
        Ok(())
    }

    /// Swaps faces across extracted video frames, rewriting each in place.
    ///
    /// In single-face mode the reference face is taken once, before any
    /// batch runs, unless the session already holds one.
    pub fn process_video(&self, source_path: &Path, frame_paths: &[PathBuf]) -> Result<(), SwapError> {
        if frame_paths.is_empty() {
            log::info!("No frames to process");
            return Ok(());
        }
        if !self.session.config().many_faces && self.session.reference_face()?.is_none() {
            self.establish_reference(frame_paths)?;
        }

        self.executor.execute(frame_paths, &|batch, update| {
            self.process_frames(source_path, batch, update)
        })
    }

    /// Releases the swap model and forgets the reference face. Call after
    /// every run, whatever its outcome.
    pub fn post_process(&self) {
        self.session.clear_swapper();
        self.session.clear_reference_face();
    }

    pub fn close(self) {
        self.session.close();
    }

    fn report(&self, message: &str) {
        self.status.update_status(message, COMPONENT_NAME);
    }

    fn source_has_face(&self, source_path: &Path) -> bool {
        let detected = self
            .reader
            .read(source_path)
            .and_then(|frame| self.session.analyser().detect_one(&frame));
        match detected {
            Ok(face) => face.is_some(),
            Err(e) => {
                log::debug!("Source check failed for {}: {e}", source_path.display());
                false
            }
        }
    }

    fn source_face(&self, source_path: &Path) -> Result<Face, SwapError> {
        let frame = self.reader.read(source_path)?;
        self.session
            .analyser()
            .detect_one(&frame)?
            .ok_or_else(|| SwapError::NoSourceFace(source_path.to_path_buf()))
    }

    fn establish_reference(&self, frame_paths: &[PathBuf]) -> Result<(), SwapError> {
        let config = self.session.config();
        let index = config.reference_frame_number;
        let path = frame_paths
            .get(index)
            .ok_or(SwapError::ReferenceFrameOutOfRange {
                index,
                total: frame_paths.len(),
            })?;

        let frame = self.reader.read(path)?;
        match self
            .session
            .analyser()
            .detect_one_at(&frame, config.reference_face_position)?
        {
            Some(face) => {
                log::info!("Reference face taken from frame {index} ({})", path.display());
                self.session.set_reference_face(face)
            }
            None => {
                log::warn!("No face in reference frame {}", path.display());
                Ok(())
            }
        }
    }
}

/// Same path, or two paths resolving to the same existing file.
fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::face_analyser::{face_at_position, FaceAnalyser};
    use crate::pipeline::infrastructure::threaded_batch_executor::ThreadedBatchExecutor;
    use crate::pipeline::pipeline_logger::NullPipelineLogger;
    use crate::shared::config::SwapConfig;
    use crate::shared::model_cache::ModelCache;
    use crate::swapping::domain::face_swapper::FaceSwapper;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    const PAINT: [u8; 3] = [255, 0, 255];
    const SOURCE_TAG: u8 = 1;
    const THREE_FACES_TAG: u8 = 3;
    const EMPTY_TAG: u8 = 9;

    // --- Stubs ---

    /// In-memory frame files keyed by path, recording every access.
    #[derive(Default)]
    struct MemoryStore {
        frames: Mutex<HashMap<PathBuf, Frame>>,
        reads: Mutex<Vec<PathBuf>>,
        writes: Mutex<Vec<PathBuf>>,
    }

    impl MemoryStore {
        fn put(&self, path: impl Into<PathBuf>, frame: Frame) {
            self.frames.lock().unwrap().insert(path.into(), frame);
        }

        fn get(&self, path: impl AsRef<Path>) -> Frame {
            self.frames.lock().unwrap()[path.as_ref()].clone()
        }

        fn reads(&self) -> usize {
            self.reads.lock().unwrap().len()
        }

        fn writes(&self) -> Vec<PathBuf> {
            self.writes.lock().unwrap().clone()
        }
    }

    struct StoreReader(Arc<MemoryStore>);

    impl FrameReader for StoreReader {
        fn read(&self, path: &Path) -> Result<Frame, SwapError> {
            self.0.reads.lock().unwrap().push(path.to_path_buf());
            self.0
                .frames
                .lock()
                .unwrap()
                .get(path)
                .cloned()
                .ok_or_else(|| SwapError::ImageRead {
                    path: path.to_path_buf(),
                    source: image::ImageError::IoError(std::io::Error::from(
                        std::io::ErrorKind::NotFound,
                    )),
                })
        }
    }

    struct StoreWriter(Arc<MemoryStore>);

    impl ImageWriter for StoreWriter {
        fn write(&self, path: &Path, frame: &Frame) -> Result<(), SwapError> {
            self.0.writes.lock().unwrap().push(path.to_path_buf());
            self.0.put(path, frame.clone());
            Ok(())
        }
    }

    /// Returns faces by the frame's first byte and counts positional lookups
    /// on non-source frames.
    struct ScriptedAnalyser {
        faces: HashMap<u8, Vec<Face>>,
        reference_lookups: AtomicUsize,
    }

    impl FaceAnalyser for ScriptedAnalyser {
        fn detect_all(&self, frame: &Frame) -> Result<Vec<Face>, SwapError> {
            Ok(self.faces.get(&frame.data()[0]).cloned().unwrap_or_default())
        }

        fn detect_one_at(&self, frame: &Frame, position: usize) -> Result<Option<Face>, SwapError> {
            if frame.data()[0] != SOURCE_TAG {
                self.reference_lookups.fetch_add(1, Ordering::SeqCst);
            }
            Ok(face_at_position(self.detect_all(frame)?, position))
        }
    }

    /// Paints the target bounding box a solid color.
    struct PaintingSwapper {
        swaps: Arc<AtomicUsize>,
    }

    impl FaceSwapper for PaintingSwapper {
        fn swap(&self, _source: &Face, target: &Face, frame: &Frame) -> Result<Frame, SwapError> {
            self.swaps.fetch_add(1, Ordering::SeqCst);
            let mut out = frame.clone();
            let width = frame.width() as usize;
            let [x1, y1, x2, y2] = target.bbox.map(|v| v as usize);
            for y in y1..y2 {
                for x in x1..x2 {
                    let offset = (y * width + x) * 3;
                    out.data_mut()[offset..offset + 3].copy_from_slice(&PAINT);
                }
            }
            Ok(out)
        }
    }

    struct RecordingStatus(Arc<Mutex<Vec<(String, String)>>>);

    impl StatusReporter for RecordingStatus {
        fn update_status(&self, message: &str, scope: &str) {
            self.0
                .lock()
                .unwrap()
                .push((message.to_string(), scope.to_string()));
        }
    }

    // --- Fixtures ---

    fn face(left: f64, embedding: Vec<f32>) -> Face {
        Face {
            bbox: [left, 5.0, left + 10.0, 15.0],
            landmarks: [(left + 5.0, 10.0); 5],
            score: 0.9,
            embedding,
        }
    }

    fn frame(tag: u8) -> Frame {
        Frame::filled(100, 20, [tag, 0, 0])
    }

    fn region_painted(frame: &Frame, left: u32) -> bool {
        frame.pixel(left + 5, 10) == Some(PAINT)
    }

    struct Harness {
        use_case: FaceSwapUseCase,
        store: Arc<MemoryStore>,
        analyser: Arc<ScriptedAnalyser>,
        swaps: Arc<AtomicUsize>,
        loads: Arc<AtomicUsize>,
        statuses: Arc<Mutex<Vec<(String, String)>>>,
    }

    fn harness(config: SwapConfig) -> Harness {
        let mut faces = HashMap::new();
        faces.insert(SOURCE_TAG, vec![face(40.0, vec![1.0, 0.0, 0.0])]);
        faces.insert(
            THREE_FACES_TAG,
            vec![
                face(10.0, vec![0.0, 1.0, 0.0]),
                face(40.0, vec![0.0, 0.0, 1.0]),
                face(70.0, vec![0.0, 0.6, 0.8]),
            ],
        );
        let analyser = Arc::new(ScriptedAnalyser {
            faces,
            reference_lookups: AtomicUsize::new(0),
        });

        let swaps = Arc::new(AtomicUsize::new(0));
        let loads = Arc::new(AtomicUsize::new(0));
        let (swap_counter, load_counter) = (swaps.clone(), loads.clone());
        let swapper = ModelCache::new(Box::new(move || {
            load_counter.fetch_add(1, Ordering::SeqCst);
            let model: Arc<dyn FaceSwapper> = Arc::new(PaintingSwapper {
                swaps: swap_counter.clone(),
            });
            Ok(model)
        }));

        let store = Arc::new(MemoryStore::default());
        let statuses = Arc::new(Mutex::new(Vec::new()));
        let threads = config.execution_threads;
        let session = SwapSession::open(config, analyser.clone(), swapper);
        let use_case = FaceSwapUseCase::new(
            session,
            Box::new(StoreReader(store.clone())),
            Box::new(StoreWriter(store.clone())),
            Box::new(RecordingStatus(statuses.clone())),
            Box::new(ThreadedBatchExecutor::new(threads, Box::new(NullPipelineLogger))),
        );

        Harness {
            use_case,
            store,
            analyser,
            swaps,
            loads,
            statuses,
        }
    }

    fn config(many_faces: bool) -> SwapConfig {
        SwapConfig {
            many_faces,
            execution_threads: 2,
            ..SwapConfig::default()
        }
    }

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, b"").unwrap();
        path
    }

    fn video_frames(h: &Harness, count: usize) -> Vec<PathBuf> {
        (0..count)
            .map(|i| {
                let path = PathBuf::from(format!("frames/{i:04}.png"));
                h.store.put(&path, frame(THREE_FACES_TAG));
                path
            })
            .collect()
    }

    // --- validate_inputs ---

    #[test]
    fn test_validate_rejects_non_image_source_without_reading() {
        let dir = tempfile::tempdir().unwrap();
        let h = harness(config(false));
        let source = touch(dir.path(), "source.txt");
        let target = touch(dir.path(), "target.png");

        assert!(!h.use_case.validate_inputs(&source, &target));

        let statuses = h.statuses.lock().unwrap();
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].0, MSG_SELECT_SOURCE_IMAGE);
        assert_eq!(statuses[0].1, "FACE-SWAPPER");
        assert_eq!(h.store.reads(), 0);
    }

    #[test]
    fn test_validate_rejects_missing_source_file() {
        let dir = tempfile::tempdir().unwrap();
        let h = harness(config(false));
        let target = touch(dir.path(), "target.png");

        assert!(!h.use_case.validate_inputs(&dir.path().join("gone.png"), &target));
        assert_eq!(h.statuses.lock().unwrap()[0].0, MSG_SELECT_SOURCE_IMAGE);
    }

    #[test]
    fn test_validate_rejects_source_without_face() {
        let dir = tempfile::tempdir().unwrap();
        let h = harness(config(false));
        let source = touch(dir.path(), "source.jpg");
        let target = touch(dir.path(), "target.png");
        h.store.put(&source, frame(EMPTY_TAG));

        assert!(!h.use_case.validate_inputs(&source, &target));

        let statuses = h.statuses.lock().unwrap();
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].0, MSG_NO_SOURCE_FACE);
    }

    #[test]
    fn test_validate_reports_unreadable_source_as_no_face() {
        let dir = tempfile::tempdir().unwrap();
        let h = harness(config(false));
        let source = touch(dir.path(), "source.png");
        let target = touch(dir.path(), "target.png");

        assert!(!h.use_case.validate_inputs(&source, &target));
        assert_eq!(h.statuses.lock().unwrap()[0].0, MSG_NO_SOURCE_FACE);
    }

    #[test]
    fn test_validate_rejects_unsupported_target() {
        let dir = tempfile::tempdir().unwrap();
        let h = harness(config(false));
        let source = touch(dir.path(), "source.png");
        let target = touch(dir.path(), "notes.txt");
        h.store.put(&source, frame(SOURCE_TAG));

        assert!(!h.use_case.validate_inputs(&source, &target));

        let statuses = h.statuses.lock().unwrap();
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].0, MSG_SELECT_TARGET);
    }

    #[test]
    fn test_validate_accepts_image_and_video_targets() {
        let dir = tempfile::tempdir().unwrap();
        let h = harness(config(false));
        let source = touch(dir.path(), "source.PNG");
        h.store.put(&source, frame(SOURCE_TAG));

        assert!(h
            .use_case
            .validate_inputs(&source, &touch(dir.path(), "target.png")));
        assert!(h
            .use_case
            .validate_inputs(&source, &touch(dir.path(), "clip.mp4")));
        assert!(h.statuses.lock().unwrap().is_empty());
        assert_eq!(h.loads.load(Ordering::SeqCst), 0);
    }

    // --- process_frame ---

    #[test]
    fn test_many_faces_swaps_every_face() {
        let h = harness(config(true));
        let source = face(0.0, vec![1.0, 0.0, 0.0]);

        let out = h
            .use_case
            .process_frame(&source, None, frame(THREE_FACES_TAG))
            .unwrap();

        assert!(region_painted(&out, 10));
        assert!(region_painted(&out, 40));
        assert!(region_painted(&out, 70));
        assert_eq!(h.swaps.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_single_face_swaps_only_the_reference_match() {
        let h = harness(config(false));
        let source = face(0.0, vec![1.0, 0.0, 0.0]);
        let reference = face(40.0, vec![0.0, 0.0, 1.0]);
        let input = frame(THREE_FACES_TAG);

        let out = h
            .use_case
            .process_frame(&source, Some(&reference), input.clone())
            .unwrap();

        assert!(region_painted(&out, 40));
        assert_eq!(out.pixel(15, 10), input.pixel(15, 10));
        assert_eq!(out.pixel(75, 10), input.pixel(75, 10));
        let changed = out
            .data()
            .chunks(3)
            .zip(input.data().chunks(3))
            .filter(|(a, b)| a != b)
            .count();
        assert_eq!(changed, 100);
    }

    #[test]
    fn test_frame_without_faces_is_unchanged() {
        let h = harness(config(true));
        let source = face(0.0, vec![1.0, 0.0, 0.0]);

        let out = h
            .use_case
            .process_frame(&source, None, frame(EMPTY_TAG))
            .unwrap();

        assert_eq!(out, frame(EMPTY_TAG));
        assert_eq!(h.loads.load(Ordering::SeqCst), 0);
    }

    // --- process_frames ---

    #[test]
    fn test_process_frames_updates_once_per_frame_and_writes_in_place() {
        let h = harness(config(true));
        h.store.put("source.png", frame(SOURCE_TAG));
        let paths: Vec<PathBuf> = ["a.png", "b.png", "c.png", "d.png"]
            .iter()
            .map(PathBuf::from)
            .collect();
        h.store.put("a.png", frame(THREE_FACES_TAG));
        h.store.put("b.png", frame(EMPTY_TAG));
        h.store.put("c.png", frame(THREE_FACES_TAG));
        h.store.put("d.png", frame(EMPTY_TAG));
        let updates = AtomicUsize::new(0);

        h.use_case
            .process_frames(Path::new("source.png"), &paths, &|| {
                updates.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        assert_eq!(updates.load(Ordering::SeqCst), 4);
        assert_eq!(h.store.writes(), paths);
        assert!(region_painted(&h.store.get("c.png"), 70));
        assert_eq!(h.store.get("b.png"), frame(EMPTY_TAG));
    }

    #[test]
    fn test_process_frames_without_source_face_fails() {
        let h = harness(config(true));
        h.store.put("source.png", frame(EMPTY_TAG));
        h.store.put("a.png", frame(THREE_FACES_TAG));

        let result = h.use_case.process_frames(
            Path::new("source.png"),
            &[PathBuf::from("a.png")],
            &|| {},
        );

        assert!(matches!(result, Err(SwapError::NoSourceFace(_))));
        assert!(h.store.writes().is_empty());
    }

    #[test]
    fn test_process_frames_single_face_without_reference_passes_through() {
        let h = harness(config(false));
        h.store.put("source.png", frame(SOURCE_TAG));
        h.store.put("a.png", frame(THREE_FACES_TAG));

        h.use_case
            .process_frames(Path::new("source.png"), &[PathBuf::from("a.png")], &|| {})
            .unwrap();

        assert_eq!(h.store.get("a.png"), frame(THREE_FACES_TAG));
        assert_eq!(h.swaps.load(Ordering::SeqCst), 0);
    }

    // --- process_image ---

    #[test]
    fn test_process_image_writes_only_to_output() {
        let h = harness(config(false));
        h.store.put("source.png", frame(SOURCE_TAG));
        h.store.put("target.png", frame(THREE_FACES_TAG));

        h.use_case
            .process_image(
                Path::new("source.png"),
                Path::new("target.png"),
                Path::new("out.png"),
            )
            .unwrap();

        assert_eq!(h.store.writes(), vec![PathBuf::from("out.png")]);
        assert_eq!(h.store.get("target.png"), frame(THREE_FACES_TAG));
        // Reference position 0 is the left-most face.
        let out = h.store.get("out.png");
        assert!(region_painted(&out, 10));
        assert!(!region_painted(&out, 40));
        assert!(h.use_case.session().reference_face().unwrap().is_none());
    }

    #[test]
    fn test_process_image_uses_configured_reference_position() {
        let h = harness(SwapConfig {
            reference_face_position: 2,
            ..config(false)
        });
        h.store.put("source.png", frame(SOURCE_TAG));
        h.store.put("target.png", frame(THREE_FACES_TAG));

        h.use_case
            .process_image(
                Path::new("source.png"),
                Path::new("target.png"),
                Path::new("out.png"),
            )
            .unwrap();

        let out = h.store.get("out.png");
        assert!(region_painted(&out, 70));
        assert!(!region_painted(&out, 10));
    }

    #[test]
    fn test_process_image_rejects_output_equal_to_input() {
        let h = harness(config(true));
        h.store.put("source.png", frame(SOURCE_TAG));
        h.store.put("target.png", frame(THREE_FACES_TAG));

        for output in ["source.png", "target.png"] {
            let result = h.use_case.process_image(
                Path::new("source.png"),
                Path::new("target.png"),
                Path::new(output),
            );
            assert!(matches!(result, Err(SwapError::OutputOverwritesInput(_))));
        }
        assert!(h.store.writes().is_empty());
        assert_eq!(h.store.reads(), 0);
    }

    #[test]
    fn test_same_file_resolves_relative_segments() {
        let dir = tempfile::tempdir().unwrap();
        let file = touch(dir.path(), "target.png");
        let dotted = dir.path().join(".").join("target.png");
        assert!(same_file(&file, &dotted));
        assert!(!same_file(&file, &dir.path().join("other.png")));
    }

    // --- process_video ---

    #[test]
    fn test_process_video_detects_reference_once() {
        let h = harness(config(false));
        h.store.put("source.png", frame(SOURCE_TAG));
        let frames = video_frames(&h, 6);

        h.use_case
            .process_video(Path::new("source.png"), &frames)
            .unwrap();
        assert_eq!(h.analyser.reference_lookups.load(Ordering::SeqCst), 1);

        // A second run reuses the stored reference.
        h.use_case
            .process_video(Path::new("source.png"), &frames)
            .unwrap();
        assert_eq!(h.analyser.reference_lookups.load(Ordering::SeqCst), 1);

        for path in &frames {
            let out = h.store.get(path);
            assert!(region_painted(&out, 10));
            assert!(!region_painted(&out, 40));
        }
    }

    #[test]
    fn test_process_video_many_faces_skips_reference() {
        let h = harness(config(true));
        h.store.put("source.png", frame(SOURCE_TAG));
        let frames = video_frames(&h, 3);

        h.use_case
            .process_video(Path::new("source.png"), &frames)
            .unwrap();

        assert_eq!(h.analyser.reference_lookups.load(Ordering::SeqCst), 0);
        assert!(h.use_case.session().reference_face().unwrap().is_none());
        assert_eq!(h.swaps.load(Ordering::SeqCst), 9);
    }

    #[test]
    fn test_process_video_empty_is_noop() {
        let h = harness(config(false));
        h.use_case
            .process_video(Path::new("source.png"), &[])
            .unwrap();
        assert_eq!(h.store.reads(), 0);
    }

    #[test]
    fn test_process_video_reference_frame_out_of_range() {
        let h = harness(SwapConfig {
            reference_frame_number: 5,
            ..config(false)
        });
        h.store.put("source.png", frame(SOURCE_TAG));
        let frames = video_frames(&h, 2);

        let result = h.use_case.process_video(Path::new("source.png"), &frames);

        assert!(matches!(
            result,
            Err(SwapError::ReferenceFrameOutOfRange { index: 5, total: 2 })
        ));
        assert!(h.store.writes().is_empty());
    }

    // --- lifecycle ---

    #[test]
    fn test_post_process_releases_model_and_reference() {
        let h = harness(config(false));
        h.store.put("source.png", frame(SOURCE_TAG));
        let frames = video_frames(&h, 2);
        h.use_case
            .process_video(Path::new("source.png"), &frames)
            .unwrap();
        assert!(h.use_case.session().is_swapper_loaded());

        h.use_case.post_process();

        assert!(!h.use_case.session().is_swapper_loaded());
        assert!(h.use_case.session().reference_face().unwrap().is_none());
        // Idempotent
        h.use_case.post_process();
    }

    #[test]
    fn test_pre_check_propagates_artifact_failure() {
        let analyser = Arc::new(ScriptedAnalyser {
            faces: HashMap::new(),
            reference_lookups: AtomicUsize::new(0),
        });
        let swapper: ModelCache<dyn FaceSwapper> = ModelCache::with_artifact(
            Box::new(|| Err(SwapError::Inference("unused".into()))),
            Box::new(|| {
                Err(SwapError::ModelLoad {
                    path: "inswapper_128.onnx".into(),
                    message: "offline".into(),
                })
            }),
        );
        let store = Arc::new(MemoryStore::default());
        let use_case = FaceSwapUseCase::new(
            SwapSession::open(config(false), analyser, swapper),
            Box::new(StoreReader(store.clone())),
            Box::new(StoreWriter(store)),
            Box::new(RecordingStatus(Arc::new(Mutex::new(Vec::new())))),
            Box::new(ThreadedBatchExecutor::new(1, Box::new(NullPipelineLogger))),
        );

        assert!(matches!(use_case.pre_check(), Err(SwapError::ModelLoad { .. })));
        use_case.close();
    }
}
