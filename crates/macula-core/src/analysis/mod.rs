//! Analysis orchestration and history.
//!
//! One analyze request runs intake, classification, heatmap rendering and
//! persistence in that order. The first failure ends the request and nothing
//! is stored, except a heatmap failure, which only leaves the heatmap empty.

pub mod model;

use macula_db::queries::analyses as queries;
use macula_db::{DbError, DbPool};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::classifier::Classifier;
use crate::error::{MaculaError, MaculaResult};
use crate::heatmap::HeatmapRenderer;
use crate::intake::{self, model::IntakeLimits};
use model::{Analysis, Stage};

/// Ties intake, the delegates and the store together.
pub struct Analyzer {
    pool: DbPool,
    classifier: Arc<dyn Classifier>,
    heatmap: Arc<dyn HeatmapRenderer>,
    limits: IntakeLimits,
}

impl Analyzer {
    pub fn new(
        pool: DbPool,
        classifier: Arc<dyn Classifier>,
        heatmap: Arc<dyn HeatmapRenderer>,
        limits: IntakeLimits,
    ) -> Self {
        Self {
            pool,
            classifier,
            heatmap,
            limits,
        }
    }

    pub fn limits(&self) -> &IntakeLimits {
        &self.limits
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Analyze one image and persist the result.
    pub async fn analyze(&self, owner: Option<u64>, image_data: &str) -> MaculaResult<Analysis> {
        let mut stage = Stage::Received;
        let result = self.run(owner, image_data, &mut stage).await;
        if let Err(e) = &result {
            warn!(
                state = Stage::Failed.as_str(),
                after = stage.as_str(),
                error = %e,
                "Analysis failed"
            );
        }
        result
    }

    async fn run(&self, owner: Option<u64>, image_data: &str, stage: &mut Stage) -> MaculaResult<Analysis> {
        debug!(length = image_data.len(), "Image data received");
        let image = intake::parse_data_url(image_data, &self.limits)?;
        *stage = Stage::Validated;

        let prediction = self.classifier.classify(&image).await?;
        *stage = Stage::Classified;
        debug!(
            classifier = self.classifier.name(),
            label = %prediction.label,
            confidence = prediction.confidence,
            "Image classified"
        );

        let heatmap = match self.heatmap.render(&image).await {
            Ok(data_url) => Some(data_url),
            Err(e) => {
                warn!(renderer = self.heatmap.name(), error = %e, "Heatmap unavailable, storing analysis without it");
                None
            }
        };

        let row = queries::create_analysis(
            &self.pool,
            queries::NewAnalysisRow {
                user_id: owner,
                image_data: image.to_data_url(),
                prediction: prediction.label.clone(),
                confidence: prediction.confidence_percent(),
                heatmap_data: heatmap,
            },
        )
        .await?;
        *stage = Stage::Persisted;

        info!(id = row.id, user_id = ?owner, prediction = %row.prediction, confidence = row.confidence, "Analysis saved");
        Ok(Analysis::from_row(row))
    }
}

/// Analyses in creation order, scoped to `owner` when given.
pub async fn list_analyses(pool: &DbPool, owner: Option<u64>) -> MaculaResult<Vec<Analysis>> {
    let rows = match owner {
        Some(user_id) => queries::list_analyses_by_user(pool, user_id).await?,
        None => queries::list_analyses(pool).await?,
    };
    Ok(rows.into_iter().map(Analysis::from_row).collect())
}

/// Get one analysis. Records owned by someone else look absent.
pub async fn get_analysis(pool: &DbPool, id: u64, owner: Option<u64>) -> MaculaResult<Analysis> {
    let not_found = || MaculaError::NotFound(format!("Analysis not found: {}", id));

    let row = queries::get_analysis(pool, id).await.map_err(|e| match e {
        DbError::NotFound(_) => not_found(),
        other => other.into(),
    })?;

    if owner.is_some() && row.user_id != owner {
        return Err(not_found());
    }
    Ok(Analysis::from_row(row))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Prediction;
    use crate::heatmap::NoHeatmap;
    use crate::intake::model::ImagePayload;
    use async_trait::async_trait;
    use base64::Engine;
    use macula_db::init_memory_pool;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedClassifier {
        reply: Result<Prediction, String>,
        calls: AtomicUsize,
    }

    impl FixedClassifier {
        fn ok(label: &str, confidence: f64) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(Prediction {
                    label: label.to_string(),
                    confidence,
                }),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(msg: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(msg.to_string()),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Classifier for FixedClassifier {
        async fn classify(&self, _image: &ImagePayload) -> MaculaResult<Prediction> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply.clone().map_err(MaculaError::classification)
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    struct StaticHeatmap;

    #[async_trait]
    impl HeatmapRenderer for StaticHeatmap {
        async fn render(&self, _image: &ImagePayload) -> MaculaResult<String> {
            Ok("data:image/png;base64,SEVBVE1BUA==".to_string())
        }

        fn name(&self) -> &str {
            "static"
        }
    }

    fn jpeg_data_url(len: usize) -> String {
        let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE0];
        bytes.resize(len, 0x11);
        format!(
            "data:image/jpeg;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(bytes)
        )
    }

    fn png_data_url(len: usize) -> String {
        let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        bytes.resize(len, 0x22);
        format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(bytes)
        )
    }

    fn analyzer(classifier: Arc<FixedClassifier>, heatmap: Arc<dyn HeatmapRenderer>) -> Analyzer {
        Analyzer::new(init_memory_pool(), classifier, heatmap, IntakeLimits::default())
    }

    #[tokio::test]
    async fn test_benign_jpeg_scenario() {
        let classifier = FixedClassifier::ok("benign", 0.91);
        let analyzer = analyzer(classifier.clone(), Arc::new(StaticHeatmap));

        let input = jpeg_data_url(500 * 1024);
        let analysis = analyzer.analyze(None, &input).await.unwrap();

        assert_eq!(analysis.id, 1);
        assert_eq!(analysis.prediction, "benign");
        assert_eq!(analysis.confidence, 91);
        assert_eq!(analysis.image_data, input);
        assert_eq!(analysis.heatmap_data.as_deref(), Some("data:image/png;base64,SEVBVE1BUA=="));
        assert_eq!(classifier.calls(), 1);
    }

    #[tokio::test]
    async fn test_oversized_png_never_reaches_classifier() {
        let classifier = FixedClassifier::ok("benign", 0.91);
        let analyzer = analyzer(classifier.clone(), Arc::new(StaticHeatmap));

        let err = analyzer.analyze(None, &png_data_url(2 * 1024 * 1024)).await.unwrap_err();
        match err {
            MaculaError::Validation(msg) => assert_eq!(msg, "Image size must be less than 1MB"),
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(classifier.calls(), 0);
        assert!(list_analyses(analyzer.pool(), None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_classification_failure_persists_nothing() {
        let classifier = FixedClassifier::failing("endpoint error (HTTP 503)");
        let analyzer = analyzer(classifier.clone(), Arc::new(StaticHeatmap));

        let err = analyzer.analyze(None, &jpeg_data_url(1024)).await.unwrap_err();
        assert!(matches!(err, MaculaError::Classification(_)));
        assert_eq!(classifier.calls(), 1);
        assert!(list_analyses(analyzer.pool(), None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_heatmap_failure_is_not_fatal() {
        let analyzer = analyzer(FixedClassifier::ok("malignant", 0.66), Arc::new(NoHeatmap));

        let analysis = analyzer.analyze(Some(3), &jpeg_data_url(1024)).await.unwrap();
        assert_eq!(analysis.heatmap_data, None);
        assert_eq!(analysis.user_id, Some(3));
        assert_eq!(analysis.confidence, 66);
    }

    #[tokio::test]
    async fn test_history_in_creation_order_and_scoped() {
        let analyzer = analyzer(FixedClassifier::ok("benign", 0.5), Arc::new(StaticHeatmap));
        for owner in [Some(1), Some(2), Some(1), None] {
            analyzer.analyze(owner, &jpeg_data_url(256)).await.unwrap();
        }

        let all = list_analyses(analyzer.pool(), None).await.unwrap();
        assert_eq!(all.iter().map(|a| a.id).collect::<Vec<_>>(), vec![1, 2, 3, 4]);

        let mine = list_analyses(analyzer.pool(), Some(1)).await.unwrap();
        assert_eq!(mine.iter().map(|a| a.id).collect::<Vec<_>>(), vec![1, 3]);
    }

    #[tokio::test]
    async fn test_get_analysis_respects_owner() {
        let analyzer = analyzer(FixedClassifier::ok("benign", 0.5), Arc::new(StaticHeatmap));
        analyzer.analyze(Some(1), &jpeg_data_url(256)).await.unwrap();

        assert_eq!(get_analysis(analyzer.pool(), 1, Some(1)).await.unwrap().id, 1);
        assert_eq!(get_analysis(analyzer.pool(), 1, None).await.unwrap().id, 1);
        assert!(matches!(
            get_analysis(analyzer.pool(), 1, Some(2)).await.unwrap_err(),
            MaculaError::NotFound(_)
        ));
        assert!(matches!(
            get_analysis(analyzer.pool(), 99, None).await.unwrap_err(),
            MaculaError::NotFound(_)
        ));
    }
}
