use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
};

use thiserror::Error;

use crate::Vec4;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to write frame {frame}: {source}")]
    Frame { frame: usize, source: io::Error },

    #[error("failed to finalize output: {0}")]
    Finalize(#[source] io::Error),
}

/// Consumer of body positions and masses, one frame at a time.
///
/// Render errors never abort a simulation; callers log them and carry on.
pub trait Renderer {
    /// `bodies` holds `(x, y, z, mass)` per body.
    fn render_frame(&mut self, bodies: &[Vec4], frame: usize) -> Result<(), RenderError>;

    fn finalize(&mut self) -> Result<(), RenderError>;
}

/// Discards every frame.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn render_frame(&mut self, _bodies: &[Vec4], _frame: usize) -> Result<(), RenderError> {
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), RenderError> {
        Ok(())
    }
}

/// Writes every frame as CSV rows `frame,body,x,y,z,mass`.
#[derive(Debug)]
pub struct CsvRecorder<W: Write> {
    writer: W,
    header_written: bool,
}

impl CsvRecorder<BufWriter<File>> {
    pub fn create(path: impl AsRef<Path>) -> Result<Self, io::Error> {
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write> CsvRecorder<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            header_written: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_frame(&mut self, bodies: &[Vec4], frame: usize) -> Result<(), io::Error> {
        if !self.header_written {
            writeln!(self.writer, "frame,body,x,y,z,mass")?;
            self.header_written = true;
        }

        for (i, body) in bodies.iter().enumerate() {
            write!(self.writer, "{frame},{i}")?;
            for elem in body.iter() {
                write!(self.writer, ",{elem}")?;
            }
            writeln!(self.writer)?;
        }

        Ok(())
    }
}

impl<W: Write> Renderer for CsvRecorder<W> {
    fn render_frame(&mut self, bodies: &[Vec4], frame: usize) -> Result<(), RenderError> {
        self.write_frame(bodies, frame)
            .map_err(|source| RenderError::Frame { frame, source })
    }

    fn finalize(&mut self) -> Result<(), RenderError> {
        self.writer.flush().map_err(RenderError::Finalize)
    }
}

impl<R: Renderer + ?Sized> Renderer for Box<R> {
    fn render_frame(&mut self, bodies: &[Vec4], frame: usize) -> Result<(), RenderError> {
        (**self).render_frame(bodies, frame)
    }

    fn finalize(&mut self) -> Result<(), RenderError> {
        (**self).finalize()
    }
}

/// Render a frame, logging instead of propagating failures.
pub(crate) fn render_or_warn(renderer: &mut dyn Renderer, bodies: &[Vec4], frame: usize) {
    if let Err(err) = renderer.render_frame(bodies, frame) {
        tracing::warn!(%err, frame, "rendering failed, continuing without this frame");
    }
}

pub(crate) fn finalize_or_warn(renderer: &mut dyn Renderer) {
    if let Err(err) = renderer.finalize() {
        tracing::warn!(%err, "finalizing renderer output failed");
    }
}
