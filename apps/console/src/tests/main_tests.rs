use super::spawn_line_reader;

use std::{
    io::{self, BufRead, Cursor, Read},
    time::Duration,
};

use tokio::time::timeout;

/// Never yields data, like an idle terminal or FIFO.
struct IdleInput;

impl Read for IdleInput {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        std::thread::sleep(Duration::from_secs(3600));
        Ok(0)
    }
}

impl BufRead for IdleInput {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        std::thread::sleep(Duration::from_secs(3600));
        Ok(&[])
    }

    fn consume(&mut self, _amt: usize) {}
}

#[tokio::test]
async fn forwards_lines_then_ends_at_eof() {
    let mut lines = spawn_line_reader(Cursor::new("hola\n/state\n\nadiós"));

    let mut received = Vec::new();
    while let Some(line) = timeout(Duration::from_secs(5), lines.recv())
        .await
        .expect("timed out waiting for line")
    {
        received.push(line.expect("line"));
    }

    assert_eq!(received, vec!["hola", "/state", "", "adiós"]);
}

#[test]
fn blocked_reader_does_not_hold_up_runtime_shutdown() {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("runtime");

    let pending = runtime.block_on(async {
        let mut lines = spawn_line_reader(IdleInput);
        timeout(Duration::from_millis(100), lines.recv()).await.is_err()
    });
    assert!(pending, "idle input should not produce a line");

    let started = std::time::Instant::now();
    drop(runtime);
    assert!(started.elapsed() < Duration::from_secs(5));
}
