//! Conversion: parse ingested text as JSON
//!
//! A document that fails to parse is reported at the parser's position and
//! is simply absent from later phases.

use log::debug;

use super::Phase;
use crate::context::{ErrorKind, Payload, PhaseKind, PipelineContext, ValidationError};
use crate::error::Result;
use crate::locate::parse_error_span;

pub struct ConversionPhase;

impl Phase for ConversionPhase {
    fn kind(&self) -> PhaseKind {
        PhaseKind::Conversion
    }

    fn execute(&self, ctx: &mut PipelineContext<'_>) -> Result<()> {
        let raw: Vec<_> = ctx
            .data
            .phase_entries(PhaseKind::Ingest)
            .filter_map(|(category, id, payload)| {
                payload
                    .text()
                    .map(|text| (category, id.to_string(), text.to_string()))
            })
            .collect();

        for (category, id, text) in raw {
            match serde_json::from_str(&text) {
                Ok(value) => {
                    ctx.data
                        .insert(PhaseKind::Conversion, category, &id, Payload::Parsed(value));
                }
                Err(e) => {
                    debug!("{} is not valid JSON: {}", id, e);
                    let error = ValidationError::new(
                        ErrorKind::Parse,
                        ctx.source_path(&id),
                        format!("JSON parsing error: {}", e),
                    )
                    .at(parse_error_span(&text, &e));
                    ctx.push_error(error);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::CancellationToken;
    use crate::identifier::Category;
    use crate::phases::test_support::demo_set;
    use serde_json::json;

    #[test]
    fn test_parses_each_ingested_document() {
        let (_fs, sets) = demo_set(&[]);
        let set = sets.get_by_name("demo").unwrap();
        let mut ctx = PipelineContext::new("demo.models.m", set, &sets, CancellationToken::new());
        ctx.data.insert(
            PhaseKind::Ingest,
            Category::Models,
            "demo.models.m",
            Payload::Raw(r#"{ "$id": "demo.models.m" }"#.into()),
        );
        ctx.data.insert(
            PhaseKind::Ingest,
            Category::Schemas,
            "demo.schemas.s",
            Payload::Raw(r#"{ "type": "object" }"#.into()),
        );

        ConversionPhase.execute(&mut ctx).unwrap();

        assert!(ctx.errors.is_empty());
        assert_eq!(
            ctx.value(PhaseKind::Conversion, Category::Models, "demo.models.m"),
            Some(&json!({ "$id": "demo.models.m" }))
        );
        assert!(ctx
            .data
            .contains(PhaseKind::Conversion, Category::Schemas, "demo.schemas.s"));
    }

    #[test]
    fn test_parse_failure_is_located() {
        let text = "{\n  \"$id\": \"demo.models.m\",\n  \"a\": ,\n}";
        let (_fs, sets) = demo_set(&[("models/m.json", text)]);
        let set = sets.get_by_name("demo").unwrap();
        let mut ctx = PipelineContext::new("demo.models.m", set, &sets, CancellationToken::new());
        ctx.record_source("demo.models.m", std::path::Path::new("/ws/demo/models/m.json"));
        ctx.data.insert(
            PhaseKind::Ingest,
            Category::Models,
            "demo.models.m",
            Payload::Raw(text.into()),
        );

        ConversionPhase.execute(&mut ctx).unwrap();

        assert_eq!(ctx.errors.len(), 1);
        let error = &ctx.errors[0];
        assert_eq!(error.kind, ErrorKind::Parse);
        assert!(error.message.starts_with("JSON parsing error: "));
        assert_eq!(error.line, 3);
        assert_eq!(error.file_path, std::path::PathBuf::from("/ws/demo/models/m.json"));
        assert!(!ctx
            .data
            .contains(PhaseKind::Conversion, Category::Models, "demo.models.m"));
    }
}
