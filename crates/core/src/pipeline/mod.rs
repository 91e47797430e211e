pub mod pipeline_logger;
pub mod redact_image_use_case;
pub mod redaction_pipeline;
