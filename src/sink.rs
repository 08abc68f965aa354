// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Decision sinks for the command line: console, window and saved frames.

use crate::error::Result;
use crate::results::Decision;
use crate::stream::{DecisionSink, Flow};
use crate::verbose;

#[cfg(feature = "annotate")]
use crate::annotate::Annotator;
#[cfg(feature = "annotate")]
use crate::io::FrameSaver;
#[cfg(feature = "visualize")]
use crate::visualizer::Viewer;

/// Prints one line per frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleSink {
    labeled_only: bool,
}

impl ConsoleSink {
    /// Print every frame.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            labeled_only: false,
        }
    }

    /// Only print frames that carry a caption.
    #[must_use]
    pub const fn labeled_only(mut self) -> Self {
        self.labeled_only = true;
        self
    }
}

impl DecisionSink for ConsoleSink {
    fn handle(&mut self, decision: &Decision) -> Result<Flow> {
        if decision.is_labeled() || !self.labeled_only {
            verbose!("{}", decision.verbose());
        }
        Ok(Flow::Continue)
    }
}

/// Shows annotated frames in a window. `q`, `Esc` or closing the window stops.
#[cfg(feature = "visualize")]
pub struct ViewerSink {
    annotator: Annotator,
    viewer: Option<Viewer>,
    title: String,
}

#[cfg(feature = "visualize")]
impl ViewerSink {
    /// Create a sink; the window opens with the first frame's size.
    #[must_use]
    pub fn new(title: &str, annotator: Annotator) -> Self {
        Self {
            annotator,
            viewer: None,
            title: title.to_string(),
        }
    }
}

#[cfg(feature = "visualize")]
impl DecisionSink for ViewerSink {
    fn handle(&mut self, decision: &Decision) -> Result<Flow> {
        let annotated = self.annotator.annotate(decision);
        if self.viewer.is_none() {
            self.viewer = Some(Viewer::new(
                &self.title,
                annotated.width() as usize,
                annotated.height() as usize,
            )?);
        }
        let Some(viewer) = self.viewer.as_mut() else {
            return Ok(Flow::Stop);
        };
        Ok(if viewer.update(&annotated)? {
            Flow::Continue
        } else {
            Flow::Stop
        })
    }
}

/// Writes annotated frames to disk.
#[cfg(feature = "annotate")]
#[derive(Debug)]
pub struct SaveSink {
    annotator: Annotator,
    saver: FrameSaver,
}

#[cfg(feature = "annotate")]
impl SaveSink {
    /// Create a sink writing through `saver`.
    #[must_use]
    pub const fn new(annotator: Annotator, saver: FrameSaver) -> Self {
        Self { annotator, saver }
    }

    /// Frames written so far.
    #[must_use]
    pub const fn saved(&self) -> usize {
        self.saver.saved()
    }

    /// Finish writing and return the output directory.
    ///
    /// # Errors
    ///
    /// Returns an error if an open video cannot be finalized.
    pub fn finish(self) -> Result<std::path::PathBuf> {
        let dir = self.saver.dir().to_path_buf();
        self.saver.finish()?;
        Ok(dir)
    }
}

#[cfg(feature = "annotate")]
impl DecisionSink for SaveSink {
    fn handle(&mut self, decision: &Decision) -> Result<Flow> {
        let annotated = self.annotator.annotate(decision);
        self.saver.save(decision.frame_idx, &annotated)?;
        Ok(Flow::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::Speed;
    use image::DynamicImage;

    fn pass_through(frame_idx: usize) -> Decision {
        Decision {
            frame_idx,
            frame: DynamicImage::new_rgb8(16, 12),
            caption: None,
            stable: None,
            word: None,
            speed: Speed::default(),
        }
    }

    #[test]
    fn test_console_sink_never_stops() {
        let mut sink = ConsoleSink::new().labeled_only();
        assert_eq!(sink.handle(&pass_through(0)).unwrap(), Flow::Continue);
    }

    #[cfg(feature = "annotate")]
    #[test]
    fn test_save_sink_writes_frames() {
        let tmp = tempfile::tempdir().unwrap();
        let saver = FrameSaver::new(tmp.path().join("run"), false).unwrap();
        let mut sink = SaveSink::new(Annotator::new(), saver);

        sink.handle(&pass_through(0)).unwrap();
        sink.handle(&pass_through(1)).unwrap();
        assert_eq!(sink.saved(), 2);

        let dir = sink.finish().unwrap();
        assert!(dir.join("frame_000001.jpg").exists());
    }
}
