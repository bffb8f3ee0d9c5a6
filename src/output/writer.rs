//! NDJSON event stream writer

use std::io::Write;

use serde::Serialize;
use tracing::debug;

use crate::domain::model::ProgressEvent;
use crate::engine::progress::JobStream;
use crate::error::SceneCutResult;

/// Writes one JSON record per line, flushing after each
pub struct EventWriter<W: Write> {
    out: W,
    records: usize,
}

impl<W: Write> EventWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out, records: 0 }
    }

    /// Write one event record
    pub fn write_event<T: Serialize>(&mut self, event: &ProgressEvent<T>) -> SceneCutResult<()> {
        serde_json::to_writer(&mut self.out, event).map_err(std::io::Error::from)?;
        self.out.write_all(b"\n")?;
        self.out.flush()?;
        self.records += 1;
        Ok(())
    }

    /// Write every progress event of `stream` and hand back its terminal event unwritten
    pub async fn relay_progress<T: Serialize>(
        &mut self,
        mut stream: JobStream<T>,
    ) -> SceneCutResult<ProgressEvent<T>> {
        while let Some(event) = stream.next_event().await {
            if event.is_terminal() {
                debug!("Relayed {} records before terminal event", self.records);
                return Ok(event);
            }
            self.write_event(&event)?;
        }
        // A stream always ends with a terminal event
        Ok(ProgressEvent::Error {
            message: "job ended without a result".to_string(),
        })
    }

    /// Records written so far
    pub fn records(&self) -> usize {
        self.records
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
