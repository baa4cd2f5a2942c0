use std::collections::VecDeque;

use crate::error::{Result, VideoError};
use crate::video::io::{FrameSink, FrameSource};
use crate::video::types::{Frame, StreamDescriptor};

/// Frame source backed by frames held in memory
#[derive(Debug, Clone)]
pub struct MemorySource {
    descriptor: StreamDescriptor,
    frames: VecDeque<Frame>,
    fail_at: Option<u64>,
    delivered: u64,
}

impl MemorySource {
    pub fn new(descriptor: StreamDescriptor, frames: Vec<Frame>) -> Self {
        Self {
            descriptor,
            frames: frames.into(),
            fail_at: None,
            delivered: 0,
        }
    }

    /// Make the read of frame `index` fail, simulating a corrupt stream
    pub fn failing_at(mut self, index: u64) -> Self {
        self.fail_at = Some(index);
        self
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl FrameSource for MemorySource {
    fn descriptor(&self) -> StreamDescriptor {
        self.descriptor
    }

    fn read_frame(&mut self) -> Result<Option<Frame>> {
        if self.fail_at == Some(self.delivered) {
            return Err(VideoError::MidStream {
                frame_index: self.delivered,
                reason: "simulated read failure".to_string(),
            }.into());
        }

        let frame = self.frames.pop_front();
        if frame.is_some() {
            self.delivered += 1;
        }
        Ok(frame)
    }
}

/// Frame sink that collects everything written to it
#[derive(Debug, Clone)]
pub struct MemorySink {
    descriptor: StreamDescriptor,
    frames: Vec<Frame>,
    fail_at: Option<u64>,
    finished: bool,
}

impl MemorySink {
    pub fn new(descriptor: StreamDescriptor) -> Self {
        Self {
            descriptor,
            frames: Vec::new(),
            fail_at: None,
            finished: false,
        }
    }

    /// Make the write of output frame `index` fail, simulating a full disk
    pub fn failing_at(mut self, index: u64) -> Self {
        self.fail_at = Some(index);
        self
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Output duration in seconds at the sink's frame rate
    pub fn duration(&self) -> f64 {
        self.descriptor.duration_of(self.frames.len() as u64)
    }
}

impl FrameSink for MemorySink {
    fn write_frame(&mut self, frame: Frame) -> Result<()> {
        if self.finished {
            return Err(VideoError::MidStream {
                frame_index: self.frames.len() as u64,
                reason: "write after finish".to_string(),
            }.into());
        }
        if self.fail_at == Some(self.frames.len() as u64) {
            return Err(VideoError::MidStream {
                frame_index: self.frames.len() as u64,
                reason: "simulated write failure".to_string(),
            }.into());
        }
        if !frame.matches(&self.descriptor) {
            return Err(VideoError::MidStream {
                frame_index: self.frames.len() as u64,
                reason: format!(
                    "frame is {}x{}, stream is {}x{}",
                    frame.width(), frame.height(),
                    self.descriptor.width, self.descriptor.height
                ),
            }.into());
        }
        self.frames.push(frame);
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        Ok(())
    }
}
