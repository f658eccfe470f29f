//! End-to-end batch archiving through the public API with a stubbed
//! metadata capability.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reddit_dl::{
    Config, ItemError, MediaDownloader, NoOpMediaDownloader, PostId, PostRecord, RedditArchiver,
    SubmissionApi, LEDGER_FILE_NAME,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Fixed-map stand-in for the Reddit API: known ids succeed, unknown fail.
struct StubApi {
    records: HashMap<String, PostRecord>,
}

#[async_trait]
impl SubmissionApi for StubApi {
    async fn fetch_submission(&self, id: &PostId) -> Result<PostRecord, ItemError> {
        self.records
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| ItemError::FetchFailed {
                id: id.clone(),
                reason: "not in fixture set".to_string(),
            })
    }

    fn fallback_permalink(&self, id: &PostId) -> String {
        format!("https://www.reddit.com/{id}")
    }
}

fn record(id: &str, subreddit: &str, selftext: &str) -> PostRecord {
    PostRecord {
        id: PostId::new(id),
        permalink: format!("https://www.reddit.com/r/{subreddit}/comments/{id}/"),
        author: "archivist".to_string(),
        subreddit: subreddit.to_string(),
        created: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        score: 7,
        ups: 8,
        downs: 1,
        over_18: false,
        removal_category: None,
        title: "fixture".to_string(),
        selftext: selftext.to_string(),
        thumbnail: "self".to_string(),
        domain: "i.imgur.com".to_string(),
        url: format!("https://i.imgur.com/{id}.png"),
    }
}

fn build_archiver(output_root: PathBuf, save_deleted: bool) -> RedditArchiver {
    let mut config = Config::default();
    config.archive.output_root = output_root;
    config.policy.save_deleted = save_deleted;
    config.tools.search_path = false;

    let api = Arc::new(StubApi {
        records: [
            record("a1", "pics", "a live post"),
            record("a2", "pics", "[removed]"),
        ]
        .into_iter()
        .map(|r| (r.id.as_str().to_string(), r))
        .collect(),
    });

    RedditArchiver::new(config)
        .unwrap()
        .with_api(api)
        .with_media_downloader(Arc::new(NoOpMediaDownloader) as Arc<dyn MediaDownloader>)
}

fn write_batch(dir: &Path) -> PathBuf {
    let path = dir.join("batch.csv");
    std::fs::write(&path, "id,permalink\n# fixture batch\na1\na2\na3\n").unwrap();
    path
}

#[tokio::test]
async fn three_item_batch_with_save_deleted_off() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("archive");
    let archiver = build_archiver(root.clone(), false);
    let input = write_batch(temp_dir.path());

    let summary = archiver.run(&input).await.unwrap();

    assert_eq!(summary.total, 3);
    assert_eq!(summary.downloaded, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.failed, 1);
    assert!(!summary.cancelled);

    // a1 archived normally with its metadata artifact.
    assert!(root.join("pics/a1/post.json").is_file());
    // a2 was skipped: no directory anywhere.
    assert!(!root.join("pics/a2").exists());
    assert!(!root.join("deleted/pics/a2").exists());

    // Exactly one ledger row, for the fetch failure, with the synthesized link.
    let ledger = std::fs::read_to_string(root.join(LEDGER_FILE_NAME)).unwrap();
    assert_eq!(ledger, "id,permalink\na3,https://www.reddit.com/a3\n");
}

#[tokio::test]
async fn three_item_batch_with_save_deleted_on() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("archive");
    let archiver = build_archiver(root.clone(), true);
    let input = write_batch(temp_dir.path());

    let summary = archiver.run(&input).await.unwrap();

    // The removed post is archived instead of skipped.
    assert_eq!(summary.downloaded, 2);
    assert_eq!(summary.skipped, 0);
    assert_eq!(summary.failed, 1);

    assert!(root.join("pics/a1/post.json").is_file());
    assert!(root.join("deleted/pics/a2/post.json").is_file());
    assert!(!root.join("pics/a2").exists());
}

#[tokio::test]
async fn rerun_against_unchanged_failures_leaves_ledger_byte_identical() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("archive");
    let input = write_batch(temp_dir.path());

    build_archiver(root.clone(), false)
        .run(&input)
        .await
        .unwrap();
    let first = std::fs::read(root.join(LEDGER_FILE_NAME)).unwrap();

    build_archiver(root.clone(), false)
        .run(&input)
        .await
        .unwrap();
    let second = std::fs::read(root.join(LEDGER_FILE_NAME)).unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn ledger_can_be_fed_back_as_input() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("archive");
    let input = write_batch(temp_dir.path());

    build_archiver(root.clone(), false)
        .run(&input)
        .await
        .unwrap();

    // Retry run driven by the failure ledger itself.
    let ledger_path = root.join(LEDGER_FILE_NAME);
    let summary = build_archiver(root.clone(), false)
        .run(&ledger_path)
        .await
        .unwrap();

    assert_eq!(summary.total, 1);
    assert_eq!(summary.failed, 1);
}
