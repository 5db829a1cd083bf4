use super::{DisplaySink, Frame, PanelGeometry, RenderSinkError, TextMeasure};

/// Headless sink: reports what the panel would show through tracing.
///
/// Content changes are logged at `info`; per-tick offsets only at `trace`.
pub struct LogSink {
    geometry: PanelGeometry,
    last: Option<Frame>,
    released: bool,
}

impl LogSink {
    pub fn new(geometry: PanelGeometry) -> Self {
        Self {
            geometry,
            last: None,
            released: false,
        }
    }

    fn same_content(&self, frame: &Frame) -> bool {
        match (&self.last, frame) {
            (
                Some(Frame::Scroll { header, text, .. }),
                Frame::Scroll {
                    header: new_header,
                    text: new_text,
                    ..
                },
            ) => header == new_header && text == new_text,
            (Some(last), frame) => last == frame,
            (None, _) => false,
        }
    }
}

impl TextMeasure for LogSink {
    fn measure_text_width(&self, text: &str) -> u32 {
        self.geometry.text_width(text)
    }
}

impl DisplaySink for LogSink {
    fn draw(&mut self, frame: &Frame) -> Result<(), RenderSinkError> {
        if self.released {
            return Err(RenderSinkError::Released);
        }
        if !self.same_content(frame) {
            match frame {
                Frame::Scroll { header, text, .. } => {
                    tracing::info!(feed = %header, text = %text, "Now showing");
                }
                Frame::Status(message) => tracing::info!(status = %message, "Now showing"),
                Frame::Blank => tracing::info!("Display blanked"),
            }
        }
        if let Frame::Scroll {
            text, offset_px, ..
        } = frame
        {
            tracing::trace!(
                offset_px,
                window = %self.geometry.visible_window(text, *offset_px),
                "Frame"
            );
        }
        self.last = Some(frame.clone());
        Ok(())
    }

    fn release(&mut self) {
        self.released = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn sink() -> LogSink {
        LogSink::new(PanelGeometry {
            width_px: 128,
            glyph_width_px: 6,
        })
    }

    #[test]
    fn test_offset_changes_are_not_content_changes() {
        let mut sink = sink();
        let frame = |offset_px| Frame::Scroll {
            header: "Feed".into(),
            text: Arc::from("text"),
            offset_px,
        };
        sink.draw(&frame(0)).unwrap();
        assert!(sink.same_content(&frame(10)));
        assert!(!sink.same_content(&Frame::Status("Loading...".into())));
    }

    #[test]
    fn test_draw_after_release_fails() {
        let mut sink = sink();
        sink.release();
        sink.release();
        assert!(matches!(
            sink.draw(&Frame::Blank),
            Err(RenderSinkError::Released)
        ));
    }

    #[test]
    fn test_measures_fixed_pitch() {
        assert_eq!(sink().measure_text_width("abc"), 18);
    }
}
