use super::*;
use parking_lot::Mutex;
use std::sync::Arc;
use tempfile::TempDir;

fn fixture(lines: &[&str]) -> (TempDir, LogLayout, InstanceId, SessionId) {
    let dir = TempDir::new().unwrap();
    let layout = LogLayout::new(dir.path());
    let i = InstanceId::from("a1b2c3d4");
    let s = SessionId::from("0e9f8a7b");
    let path = layout.ensure_session_log(&i, &s).unwrap();
    let mut body = lines.join("\n");
    if !lines.is_empty() {
        body.push('\n');
    }
    std::fs::write(path, body).unwrap();
    (dir, layout, i, s)
}

#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).to_string()
    }
}

impl std::io::Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn read_all_returns_every_line() {
    let (_dir, layout, i, s) = fixture(&["one", "two", "three"]);
    let reader = LogReader::new(&layout, &i, &s);
    assert_eq!(reader.read_all().unwrap(), vec!["one", "two", "three"]);
}

#[test]
fn read_last_n_boundaries() {
    let (_dir, layout, i, s) = fixture(&["1", "2", "3", "4", "5"]);
    let reader = LogReader::new(&layout, &i, &s);

    // Fewer than n: everything
    assert_eq!(reader.read_last_n(10).unwrap(), vec!["1", "2", "3", "4", "5"]);
    // Exactly n: everything, in order
    assert_eq!(reader.read_last_n(5).unwrap(), vec!["1", "2", "3", "4", "5"]);
    // More than n: last n, in order
    assert_eq!(reader.read_last_n(2).unwrap(), vec!["4", "5"]);
    // Degenerate
    assert!(reader.read_last_n(0).unwrap().is_empty());
}

#[test]
fn read_missing_log_is_an_error() {
    let dir = TempDir::new().unwrap();
    let layout = LogLayout::new(dir.path());
    let reader = LogReader::new(&layout, &InstanceId::from("a1b2c3d4"), &SessionId::from("ffffffff"));
    assert!(reader.read_all().is_err());
}

#[tokio::test(start_paused = false)]
async fn follow_emits_appended_bytes_and_partial_lines() {
    let (_dir, layout, i, s) = fixture(&["old"]);
    let path = layout.session_log(&i, &s);
    let reader = LogReader::new(&layout, &i, &s);

    let cancel = CancellationToken::new();
    let out = SharedBuf::default();
    let mut sink = out.clone();
    let token = cancel.clone();

    let follower = tokio::spawn(async move {
        reader.follow(Duration::from_millis(10), &token, &mut sink).await
    });

    // Give the follower a moment to seek EOF, then append, including an
    // unterminated trailing line.
    tokio::time::sleep(Duration::from_millis(50)).await;
    {
        use std::io::Write;
        let mut f = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        f.write_all(b"new line\npartial").unwrap();
        f.flush().unwrap();
    }
    tokio::time::sleep(Duration::from_millis(100)).await;
    cancel.cancel();
    follower.await.unwrap().unwrap();

    let seen = out.contents();
    // Pre-existing content was skipped; the partial line was emitted.
    assert_eq!(seen, "new line\npartial");
}

#[tokio::test]
async fn follow_with_history_replays_tail_then_streams() {
    let (_dir, layout, i, s) = fixture(&["a", "b", "c"]);
    let path = layout.session_log(&i, &s);
    let reader = LogReader::new(&layout, &i, &s);

    let cancel = CancellationToken::new();
    let out = SharedBuf::default();
    let mut sink = out.clone();
    let token = cancel.clone();

    let follower = tokio::spawn(async move {
        reader.follow_with_history(2, Duration::from_millis(10), &token, &mut sink).await
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    {
        use std::io::Write;
        let mut f = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        f.write_all(b"d\n").unwrap();
    }
    tokio::time::sleep(Duration::from_millis(100)).await;
    cancel.cancel();
    follower.await.unwrap().unwrap();

    assert_eq!(out.contents(), "b\nc\nd\n");
}

#[tokio::test]
async fn follow_cancels_promptly() {
    let (_dir, layout, i, s) = fixture(&[]);
    let reader = LogReader::new(&layout, &i, &s);
    let cancel = CancellationToken::new();
    cancel.cancel();
    let mut sink = SharedBuf::default();
    // Already-cancelled token: returns after the first poll
    reader.follow(Duration::from_secs(60), &cancel, &mut sink).await.unwrap();
}
