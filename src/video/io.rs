use crate::error::Result;
use crate::video::types::{Frame, StreamDescriptor};

/// Sequential reader over a decoded video stream
///
/// Frames are delivered in presentation order. The sequence is finite and
/// cannot be restarted; once `read_frame` returns `Ok(None)` the stream is done.
pub trait FrameSource {
    /// Parameters of the stream, known as soon as the source is open
    fn descriptor(&self) -> StreamDescriptor;

    /// Pull the next frame, or `None` at end of stream
    fn read_frame(&mut self) -> Result<Option<Frame>>;
}

/// Sequential writer for an encoded video stream
pub trait FrameSink {
    /// Append one frame. Frames are written in the order they are received.
    fn write_frame(&mut self, frame: Frame) -> Result<()>;

    /// Flush and close the stream. Calling it more than once is a no-op.
    fn finish(&mut self) -> Result<()>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn descriptor(&self) -> StreamDescriptor {
        (**self).descriptor()
    }

    fn read_frame(&mut self) -> Result<Option<Frame>> {
        (**self).read_frame()
    }
}

impl<S: FrameSink + ?Sized> FrameSink for Box<S> {
    fn write_frame(&mut self, frame: Frame) -> Result<()> {
        (**self).write_frame(frame)
    }

    fn finish(&mut self) -> Result<()> {
        (**self).finish()
    }
}
