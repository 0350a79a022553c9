//! Directory-backed transport.
//!
//! Each advertised topic is a directory under the output root. A publication
//! writes `<seq:08>.png` (or `<seq:08>.bin` when PNG cannot represent the
//! encoding) plus a `<seq:08>.json` sidecar holding the header and layout.
//! Existing outputs are never overwritten: when a sequence number repeats
//! (e.g. an upstream source restarted) the stem gains a `-1`, `-2`, ... suffix.
//!
//! [`DirectorySource`] is the inbound side: it polls an input directory and
//! turns every new image file into a [`RawFrame`].

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam_channel::Sender;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use target_detector_core::{
    validate_topic, FramePublisher, Header, PublishError, RawFrame, Timestamp, Transport,
    TransportError,
};

use crate::io::{dynamic_from_raw, load_raw_frame};

/// Writes each topic into `<root>/<topic>/`.
#[derive(Clone, Debug)]
pub struct DirectoryTransport {
    root: PathBuf,
}

impl DirectoryTransport {
    /// The root is not touched until a topic is advertised.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Transport for DirectoryTransport {
    type Publisher = DirectoryPublisher;

    fn advertise(
        &self,
        topic: &str,
        _queue_size: usize,
    ) -> Result<DirectoryPublisher, TransportError> {
        validate_topic(topic)?;
        let dir = self.root.join(topic);
        fs::create_dir_all(&dir).map_err(|source| TransportError::Io {
            topic: topic.to_string(),
            source,
        })?;
        debug!("topic '{topic}' -> {}", dir.display());
        Ok(DirectoryPublisher {
            topic: topic.to_string(),
            dir,
        })
    }
}

/// Sidecar written next to every published payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameMetadata {
    pub header: Header,
    pub width: u32,
    pub height: u32,
    pub encoding: String,
    pub is_bigendian: bool,
    pub step: usize,
    /// Payload file name, relative to the sidecar.
    pub payload: String,
}

#[derive(Clone, Debug)]
pub struct DirectoryPublisher {
    topic: String,
    dir: PathBuf,
}

impl DirectoryPublisher {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn io_error(&self, source: std::io::Error) -> PublishError {
        PublishError::Io {
            topic: self.topic.clone(),
            source,
        }
    }

    fn encode_error(&self, reason: impl ToString) -> PublishError {
        PublishError::Encode {
            topic: self.topic.clone(),
            reason: reason.to_string(),
        }
    }

    /// First stem for `seq` with no payload or sidecar on disk yet.
    fn free_stem(&self, seq: u64) -> String {
        let taken = |stem: &str| {
            ["json", "png", "bin"]
                .iter()
                .any(|ext| self.dir.join(format!("{stem}.{ext}")).exists())
        };
        let base = format!("{seq:08}");
        if !taken(&base) {
            return base;
        }
        let mut n = 1u64;
        loop {
            let stem = format!("{base}-{n}");
            if !taken(&stem) {
                warn!("topic '{}': seq {seq} already written, using {stem}", self.topic);
                return stem;
            }
            n += 1;
        }
    }
}

impl FramePublisher for DirectoryPublisher {
    fn topic(&self) -> &str {
        &self.topic
    }

    fn publish(&self, frame: RawFrame) -> Result<(), PublishError> {
        let stem = self.free_stem(frame.header.seq);

        let payload = match dynamic_from_raw(&frame) {
            Some(img) => {
                let name = format!("{stem}.png");
                img.save(self.dir.join(&name))
                    .map_err(|e| self.encode_error(e))?;
                name
            }
            None => {
                let name = format!("{stem}.bin");
                fs::write(self.dir.join(&name), &frame.data).map_err(|e| self.io_error(e))?;
                name
            }
        };

        let meta = FrameMetadata {
            header: frame.header,
            width: frame.width,
            height: frame.height,
            encoding: frame.encoding,
            is_bigendian: frame.is_bigendian,
            step: frame.step,
            payload,
        };
        let json = serde_json::to_string_pretty(&meta).map_err(|e| self.encode_error(e))?;
        fs::write(self.dir.join(format!("{stem}.json")), json).map_err(|e| self.io_error(e))
    }
}

/// Polls a directory for image files and emits them as frames.
///
/// Files are visited in name order and each path is emitted at most once.
/// Sequence numbers start at 0 and count emitted frames.
#[derive(Debug)]
pub struct DirectorySource {
    dir: PathBuf,
    frame_id: String,
    seen: BTreeSet<PathBuf>,
    next_seq: u64,
}

impl DirectorySource {
    /// Fails when `dir` cannot be listed.
    pub fn open(dir: impl Into<PathBuf>, frame_id: impl Into<String>) -> std::io::Result<Self> {
        let dir = dir.into();
        fs::read_dir(&dir)?;
        Ok(Self {
            dir,
            frame_id: frame_id.into(),
            seen: BTreeSet::new(),
            next_seq: 0,
        })
    }

    /// Image files that have not been emitted yet, sorted by name.
    fn pending(&self) -> std::io::Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.is_file()
                && image::ImageFormat::from_path(&path).is_ok()
                && !self.seen.contains(&path)
            {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }

    /// Decode every new file. Unreadable files are logged and skipped.
    pub fn poll(&mut self) -> std::io::Result<Vec<RawFrame>> {
        let mut frames = Vec::new();
        for path in self.pending()? {
            let header = Header {
                seq: self.next_seq,
                stamp: Timestamp::now(),
                frame_id: self.frame_id.clone(),
            };
            match load_raw_frame(&path, header) {
                Ok(frame) => {
                    debug!(
                        "read {} as {}x{} {}",
                        path.display(),
                        frame.width,
                        frame.height,
                        frame.encoding
                    );
                    self.next_seq += 1;
                    frames.push(frame);
                }
                Err(e) => warn!("skipping {}: {e}", path.display()),
            }
            self.seen.insert(path);
        }
        Ok(frames)
    }

    /// Feed frames into `tx` until `shutdown` is set, the receiver goes
    /// away, or (with `once`) the directory has been read a single time.
    ///
    /// Returns the number of frames sent. Dropping `tx` on return closes the
    /// channel for the consumer.
    pub fn run(
        mut self,
        tx: Sender<RawFrame>,
        shutdown: &AtomicBool,
        poll_interval: Duration,
        once: bool,
    ) -> std::io::Result<u64> {
        let mut sent = 0u64;
        while !shutdown.load(Ordering::Relaxed) {
            for frame in self.poll()? {
                if tx.send(frame).is_err() {
                    debug!("frame consumer gone, stopping source");
                    return Ok(sent);
                }
                sent += 1;
            }
            if once {
                break;
            }
            std::thread::sleep(poll_interval);
        }
        info!("input {} exhausted after {sent} frame(s)", self.dir.display());
        Ok(sent)
    }
}
