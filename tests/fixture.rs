#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;

use md_tape::render::render_snapshot;
use md_tape::{BufferSink, MarkdownBackend, RenderBackend, StreamOptions, StreamRenderer, StyleProfile};

pub const MARKDOWN_FIXTURES: [&str; 4] = ["plain_basic.md", "mixed.md", "fences.md", "lists.md"];

fn fixture_path(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    path
}

pub fn read_fixture(name: &str) -> String {
    let path = fixture_path(name);
    fs::read_to_string(&path).unwrap_or_else(|err| panic!("failed to read fixture {name}: {err}"))
}

pub fn options(style: StyleProfile, width: Option<usize>) -> StreamOptions {
    StreamOptions {
        style,
        width,
        partial_preview: false,
    }
}

/// Renders `markdown` in one go, the way a finished stream must end up.
pub fn one_shot(markdown: &str, style: StyleProfile, width: Option<usize>) -> String {
    let mut renderer = MarkdownBackend::new(style)
        .build(width)
        .expect("build renderer");
    render_snapshot(&mut renderer, markdown, false).expect("render document")
}

/// Streams `chunks` into a buffer sink and closes the stream.
pub fn stream_chunks<'a>(
    chunks: impl IntoIterator<Item = &'a [u8]>,
    options: StreamOptions,
) -> BufferSink {
    let mut stream = StreamRenderer::markdown(BufferSink::new(), options).expect("stream");
    for chunk in chunks {
        let written = stream.write(chunk).expect("write chunk");
        assert_eq!(written, chunk.len());
    }
    stream.close().expect("close stream");
    stream.into_sink()
}

/// Splits `bytes` into consecutive pieces whose lengths cycle through `sizes`.
pub fn partition<'a>(bytes: &'a [u8], sizes: &[usize]) -> Vec<&'a [u8]> {
    let mut chunks = Vec::new();
    let mut offset = 0;
    let mut sizes = sizes.iter().copied().filter(|size| *size > 0).cycle();
    while offset < bytes.len() {
        let size = sizes.next().unwrap_or(bytes.len());
        let end = (offset + size).min(bytes.len());
        chunks.push(&bytes[offset..end]);
        offset = end;
    }
    chunks
}
