use std::sync::Arc;

use nalgebra::Point2;
use target_detector_core::{
    BgrImage, FinderError, FrameError, FrameOutcome, FramePipeline, Header, MemoryTransport,
    RawFrame, TargetFeatures, TargetFinder, Timestamp, Transport,
};

/// Reports the image centre; frames whose first pixel is 13 are "target absent",
/// frames whose first pixel is 99 fail while rendering.
struct Scripted;

impl TargetFinder for Scripted {
    fn name(&self) -> &str {
        "Scripted"
    }

    fn find_target_features(&self, image: &BgrImage) -> Result<TargetFeatures, FinderError> {
        if image.pixel(0, 0)[0] == 13 {
            return Err(FinderError::TargetNotFound("scripted miss".into()));
        }
        let c = Point2::new(image.width as f32 / 2.0, image.height as f32 / 2.0);
        Ok([(0, c)].into_iter().collect())
    }

    fn draw_target_features(
        &self,
        image: &BgrImage,
        _: &TargetFeatures,
    ) -> Result<BgrImage, FinderError> {
        if image.pixel(0, 0)[0] == 99 {
            return Err(FinderError::Rendering("scripted failure".into()));
        }
        Ok(image.clone())
    }
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn frame(seq: u64, first: u8) -> RawFrame {
    let header = Header {
        seq,
        stamp: Timestamp {
            secs: 1_700_000_000 + seq as i64,
            nanos: 250,
        },
        frame_id: "left_camera".into(),
    };
    let mut data = vec![50u8; 8 * 6];
    data[0] = first;
    RawFrame::mono8(header, 8, 6, data)
}

fn pipeline(transport: &MemoryTransport) -> FramePipeline<target_detector_core::MemoryPublisher> {
    FramePipeline::new(
        Arc::new(Scripted),
        transport.advertise("image_detected", 1).expect("detected"),
        transport.advertise("image_annotated", 1).expect("annotated"),
    )
}

#[test]
fn one_failing_frame_does_not_affect_the_others() {
    init_logging();
    let transport = MemoryTransport::new();
    let pipeline = pipeline(&transport);

    let n = 10u64;
    let k = 4u64;
    for seq in 0..n {
        let first = if seq == k { 13 } else { 1 };
        let outcome = pipeline.on_frame(&frame(seq, first));
        assert_eq!(outcome.is_published(), seq != k, "frame {seq}");
    }

    let detected = transport.drain("image_detected");
    let annotated = transport.drain("image_annotated");
    assert_eq!(detected.len(), (n - 1) as usize);
    assert_eq!(annotated.len(), (n - 1) as usize);
    assert!(detected.iter().all(|f| f.header.seq != k));
    assert!(detected.iter().any(|f| f.header.seq == k + 1));

    let stats = pipeline.stats();
    assert_eq!(stats.received, n);
    assert_eq!(stats.published, n - 1);
    assert_eq!(stats.dropped, 1);
}

#[test]
fn every_recoverable_error_kind_is_isolated() {
    init_logging();
    let transport = MemoryTransport::new();
    let pipeline = pipeline(&transport);

    let mut corrupt = frame(0, 1);
    corrupt.encoding = "yuv422".into();
    assert!(matches!(
        pipeline.on_frame(&corrupt),
        FrameOutcome::Dropped(FrameError::Decode(_))
    ));
    assert!(matches!(
        pipeline.on_frame(&frame(1, 13)),
        FrameOutcome::Dropped(FrameError::Detection(_))
    ));
    assert!(matches!(
        pipeline.on_frame(&frame(2, 99)),
        FrameOutcome::Dropped(FrameError::Annotation(_))
    ));
    assert!(pipeline.on_frame(&frame(3, 1)).is_published());

    assert_eq!(transport.drain("image_detected").len(), 1);
    assert_eq!(transport.drain("image_annotated").len(), 1);
}

#[test]
fn annotated_frames_carry_the_raw_header() {
    init_logging();
    let transport = MemoryTransport::new();
    let pipeline = pipeline(&transport);

    for seq in 0..3 {
        pipeline.on_frame(&frame(seq, 1));
    }
    let detected = transport.drain("image_detected");
    let annotated = transport.drain("image_annotated");
    for (d, a) in detected.iter().zip(&annotated) {
        assert_eq!(d.header, a.header);
        assert_eq!(d.encoding, "mono8");
        assert_eq!(a.encoding, "bgr8");
        assert_eq!((a.width, a.height), (d.width, d.height));
    }
}

#[test]
fn concurrent_invocations_share_the_finder() {
    init_logging();
    let transport = MemoryTransport::new();
    let pipeline = pipeline(&transport);

    std::thread::scope(|s| {
        for t in 0..4u64 {
            let pipeline = &pipeline;
            s.spawn(move || {
                for i in 0..25u64 {
                    let seq = t * 100 + i;
                    let first = if i % 5 == 0 { 13 } else { 1 };
                    pipeline.on_frame(&frame(seq, first));
                }
            });
        }
    });

    let stats = pipeline.stats();
    assert_eq!(stats.received, 100);
    assert_eq!(stats.dropped, 20);
    assert_eq!(transport.drain("image_detected").len(), 80);
    assert_eq!(transport.drain("image_annotated").len(), 80);
}
