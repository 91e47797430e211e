use std::path::Path;

use crate::media::domain::image_reader::ImageReader;
use crate::media::domain::image_writer::ImageWriter;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::pipeline::redaction_pipeline::RedactionPipeline;
use crate::shared::options::RedactionOptions;

/// Single-image redaction: read, redact, write.
pub struct RedactImageUseCase {
    reader: Box<dyn ImageReader>,
    writer: Box<dyn ImageWriter>,
    pipeline: RedactionPipeline,
}

impl RedactImageUseCase {
    pub fn new(
        reader: Box<dyn ImageReader>,
        writer: Box<dyn ImageWriter>,
        pipeline: RedactionPipeline,
    ) -> Self {
        Self {
            reader,
            writer,
            pipeline,
        }
    }

    /// Only I/O can fail; detection problems degrade inside the pipeline.
    pub fn execute(
        &mut self,
        input_path: &Path,
        output_path: &Path,
        options: &RedactionOptions,
        logger: &mut dyn PipelineLogger,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let source = self.reader.read(input_path)?;
        logger.info(&format!(
            "Redacting {} ({}x{})",
            input_path.display(),
            source.width(),
            source.height()
        ));

        let redacted = self.pipeline.process(&source, options, logger);
        self.writer.write(output_path, &redacted, None)?;
        logger.info(&format!("Wrote {}", output_path.display()));
        Ok(())
    }
}
