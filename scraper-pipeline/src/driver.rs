//! Pipeline driver
//!
//! Runs sources in declared order, threads every document through the
//! transformation chain and hands the result to every sink. A failing
//! document is reported and skipped unless the pipeline is configured
//! `fail_fast`.

use scraper_transforms::{Payload, Transform};

use crate::error::PipelineError;
use crate::sinks::{DocAttribs, OutputSink};
use crate::sources::Source;

pub struct Pipeline {
    sources: Vec<Box<dyn Source>>,
    transforms: Vec<Box<dyn Transform>>,
    sinks: Vec<Box<dyn OutputSink>>,
    fail_fast: bool,
}

/// Outcome of one pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub processed: usize,
    pub failed: usize,
}

impl Pipeline {
    pub fn new(
        sources: Vec<Box<dyn Source>>,
        transforms: Vec<Box<dyn Transform>>,
        sinks: Vec<Box<dyn OutputSink>>,
        fail_fast: bool,
    ) -> Self {
        Self {
            sources,
            transforms,
            sinks,
            fail_fast,
        }
    }

    pub fn run(&mut self) -> Result<RunSummary, PipelineError> {
        let mut summary = RunSummary::default();
        for source_index in 0..self.sources.len() {
            let documents = self.sources[source_index].load();
            for (doc_index, loaded) in documents.into_iter().enumerate() {
                let result = loaded.and_then(|doc| {
                    let attribs = doc.common.attribs.clone();
                    self.process(Payload::Tree(doc), &attribs)
                });
                match result {
                    Ok(()) => summary.processed += 1,
                    Err(err) => {
                        summary.failed += 1;
                        log::error!(
                            "document {} of source {} failed: {}",
                            doc_index,
                            source_index,
                            err
                        );
                        if self.fail_fast {
                            return Err(err);
                        }
                    }
                }
            }
        }
        Ok(summary)
    }

    fn process(&mut self, mut payload: Payload, attribs: &DocAttribs) -> Result<(), PipelineError> {
        for (index, transform) in self.transforms.iter().enumerate() {
            payload = transform.apply(payload)?;
            log::debug!("applied transform {} ({})", index, transform.kind());
        }
        for sink in &mut self.sinks {
            sink.emit(&payload, attribs)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper_transforms::TransformError;
    use scraper_tree::{BlockElement, DocContent, Document, Paragraph};
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::sources::StaticSource;

    struct CollectingSink {
        seen: Rc<RefCell<Vec<serde_json::Value>>>,
    }

    impl OutputSink for CollectingSink {
        fn kind(&self) -> &'static str {
            "collect"
        }

        fn emit(&mut self, payload: &Payload, _attribs: &DocAttribs) -> Result<(), PipelineError> {
            self.seen.borrow_mut().push(payload.to_output_json());
            Ok(())
        }
    }

    struct FailingTransform;

    impl Transform for FailingTransform {
        fn kind(&self) -> &'static str {
            "failing"
        }

        fn apply(&self, payload: Payload) -> Result<Payload, TransformError> {
            let doc = payload.expect_tree(self.kind())?;
            if scraper_tree::text::aggregated_text(scraper_tree::ElementRef::Document(&doc))
                .contains("bad")
            {
                return Err(TransformError::pass("failing", "poison document"));
            }
            Ok(Payload::Tree(doc))
        }
    }

    fn doc(text: &str) -> Document {
        Document::new(DocContent::new(vec![BlockElement::Paragraph(
            Paragraph::from_text(text),
        )]))
    }

    #[test]
    fn failing_documents_are_skipped_by_default() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut pipeline = Pipeline::new(
            vec![Box::new(StaticSource::new(vec![
                doc("good one"),
                doc("bad one"),
                doc("good two"),
            ]))],
            vec![Box::new(FailingTransform)],
            vec![Box::new(CollectingSink { seen: seen.clone() })],
            false,
        );
        let summary = pipeline.run().expect("run completes");
        assert_eq!(summary.processed, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(seen.borrow().len(), 2);
    }

    #[test]
    fn fail_fast_aborts_the_run() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut pipeline = Pipeline::new(
            vec![Box::new(StaticSource::new(vec![
                doc("bad one"),
                doc("good one"),
            ]))],
            vec![Box::new(FailingTransform)],
            vec![Box::new(CollectingSink { seen: seen.clone() })],
            true,
        );
        assert!(pipeline.run().is_err());
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn sources_run_in_declared_order() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut pipeline = Pipeline::new(
            vec![
                Box::new(StaticSource::new(vec![doc("first")])),
                Box::new(StaticSource::new(vec![doc("second")])),
            ],
            Vec::new(),
            vec![Box::new(CollectingSink { seen: seen.clone() })],
            false,
        );
        pipeline.run().expect("run completes");
        let seen = seen.borrow();
        let texts: Vec<String> = seen
            .iter()
            .map(|value| {
                value["content"]["elements"][0]["elements"][0]["text"]
                    .as_str()
                    .unwrap_or_default()
                    .to_string()
            })
            .collect();
        assert_eq!(texts, vec!["first", "second"]);
    }
}
