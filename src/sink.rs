//! Document sinks: where finished records go. The host's handler is one; the CLI writes JSON.

use crate::model::Document;
use crate::scraper::ScraperError;
use std::io::Write;

/// Receives each completed document, in listing order.
pub trait DocumentSink {
    fn accept(&mut self, document: Document) -> Result<(), ScraperError>;
}

impl<F> DocumentSink for F
where
    F: FnMut(Document) -> Result<(), ScraperError>,
{
    fn accept(&mut self, document: Document) -> Result<(), ScraperError> {
        self(document)
    }
}

/// Writes one JSON object per line and flushes after each, so partial runs keep what they found.
#[derive(Debug)]
pub struct JsonLinesSink<W: Write> {
    writer: W,
    written: usize,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> DocumentSink for JsonLinesSink<W> {
    fn accept(&mut self, document: Document) -> Result<(), ScraperError> {
        let sink_err = |message: String| ScraperError::Sink {
            link: document.link.clone(),
            message,
        };
        serde_json::to_writer(&mut self.writer, &document).map_err(|e| sink_err(e.to_string()))?;
        self.writer
            .write_all(b"\n")
            .and_then(|_| self.writer.flush())
            .map_err(|e| sink_err(e.to_string()))?;
        self.written += 1;
        Ok(())
    }
}

/// Buffers documents and writes them as one pretty-printed JSON array on [`finish`](Self::finish).
#[derive(Debug)]
pub struct JsonArraySink<W: Write> {
    writer: W,
    documents: Vec<Document>,
}

impl<W: Write> JsonArraySink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            documents: Vec::new(),
        }
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// Write the array and hand back the writer.
    pub fn finish(mut self) -> Result<W, std::io::Error> {
        serde_json::to_writer_pretty(&mut self.writer, &self.documents)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(self.writer)
    }
}

impl<W: Write> DocumentSink for JsonArraySink<W> {
    fn accept(&mut self, document: Document) -> Result<(), ScraperError> {
        self.documents.push(document);
        Ok(())
    }
}
