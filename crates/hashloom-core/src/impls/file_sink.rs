//! FileSink - テキストファイルへの永続化
//!
//! Writes one timestamped text file per run into a configured directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::domain::{HashloomError, ResultAggregate, RunId};
use crate::ports::{Clock, ResultSink};

/// Persists the rendered aggregate as `hashloom-<timestamp>.txt`.
///
/// The clock is injected so the file name is deterministic under test.
pub struct FileSink {
    dir: PathBuf,
    clock: Arc<dyn Clock>,
}

impl FileSink {
    pub fn new(dir: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self {
            dir: dir.into(),
            clock,
        }
    }

    fn file_path(&self) -> PathBuf {
        let stamp = self.clock.now().format("%Y%m%d%H%M%S");
        self.dir.join(format!("hashloom-{stamp}.txt"))
    }
}

fn sink_io_error(path: &Path, e: std::io::Error) -> HashloomError {
    HashloomError::SinkFailed {
        reason: format!("{}: {e}", path.display()),
    }
}

#[async_trait]
impl ResultSink for FileSink {
    async fn persist(
        &self,
        run_id: RunId,
        aggregate: &ResultAggregate,
    ) -> Result<(), HashloomError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| sink_io_error(&self.dir, e))?;

        let path = self.file_path();
        tokio::fs::write(&path, aggregate.render())
            .await
            .map_err(|e| sink_io_error(&path, e))?;

        info!(%run_id, path = %path.display(), lines = aggregate.len(), "wrote results");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ConversionResult;
    use crate::ports::FixedClock;
    use ulid::Ulid;

    fn aggregate() -> ResultAggregate {
        ResultAggregate::from_unordered(vec![
            ConversionResult::new(2, "C81E728D9D4C2F636F067F89CC14862C"),
            ConversionResult::new(1, "C4CA4238A0B923820DCC509A6F75849B"),
        ])
    }

    #[tokio::test]
    async fn writes_rendered_aggregate_to_timestamped_file() {
        let dir = tempfile::tempdir().unwrap();
        // 2023-11-14T22:13:20Z
        let clock = Arc::new(FixedClock::at_millis(1_700_000_000_000));
        let sink = FileSink::new(dir.path(), clock);

        sink.persist(RunId::from_ulid(Ulid::new()), &aggregate())
            .await
            .unwrap();

        let path = dir.path().join("hashloom-20231114221320.txt");
        let contents = std::fs::read_to_string(path).unwrap();
        assert_eq!(
            contents,
            "1: C4CA4238A0B923820DCC509A6F75849B\n2: C81E728D9D4C2F636F067F89CC14862C\n"
        );
    }

    #[tokio::test]
    async fn creates_the_output_directory_if_missing() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("out/results");
        let sink = FileSink::new(
            &nested,
            Arc::new(FixedClock::at_millis(1_700_000_000_000)),
        );

        sink.persist(RunId::from_ulid(Ulid::new()), &aggregate())
            .await
            .unwrap();

        assert!(nested.join("hashloom-20231114221320.txt").exists());
    }

    #[tokio::test]
    async fn unwritable_destination_surfaces_as_sink_failure() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where the directory should be makes create_dir_all fail.
        let blocked = dir.path().join("occupied");
        std::fs::write(&blocked, b"not a directory").unwrap();
        let sink = FileSink::new(
            &blocked,
            Arc::new(FixedClock::at_millis(1_700_000_000_000)),
        );

        let err = sink
            .persist(RunId::from_ulid(Ulid::new()), &aggregate())
            .await
            .unwrap_err();
        assert!(matches!(err, HashloomError::SinkFailed { .. }));
    }
}
