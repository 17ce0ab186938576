//! Matching must not depend on how the device output is chunked

use proptest::prelude::*;
use serialexpect::{ExpectBuffer, ExpectSession, MockTransport, Pattern};
use std::time::Duration;

const CONSOLE: &[u8] = b"\r\nU-Boot 2023.04\r\nHit any key to stop autoboot:  0\r\n=> ";
const COLORED: &[u8] = b"\x1b[0m\x1b[1;32mroot@box\x1b[0m:\x1b[1;34m~\x1b[0m# ";

/// Cut `data` at the given (unsorted, possibly repeated) offsets.
fn split(data: &[u8], cuts: &[usize]) -> Vec<Vec<u8>> {
    let mut cuts: Vec<usize> = cuts.iter().map(|c| c % (data.len() + 1)).collect();
    cuts.sort_unstable();
    cuts.dedup();

    let mut chunks = Vec::new();
    let mut from = 0;
    for cut in cuts.into_iter().chain(std::iter::once(data.len())) {
        if cut > from {
            chunks.push(data[from..cut].to_vec());
            from = cut;
        }
    }
    chunks
}

fn scripted(chunks: &[Vec<u8>]) -> MockTransport {
    chunks
        .iter()
        .fold(MockTransport::new(), |device, chunk| device.output(chunk))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn sequential_patterns_match_under_any_chunking(cuts in prop::collection::vec(0usize..64, 0..12)) {
        let mut device = scripted(&split(CONSOLE, &cuts));
        let mut session = ExpectSession::builder("reset")
            .respond(Pattern::exact("stop autoboot"), " ")
            .respond(Pattern::regex(r"=> $").unwrap(), "boot")
            .timeout(Duration::from_secs(1))
            .build()
            .unwrap();

        let summary = session.run(&mut device).unwrap();

        prop_assert_eq!(summary.matches.len(), 2);
        prop_assert_eq!(&summary.matches[0].before, "\r\nU-Boot 2023.04\r\nHit any key to ");
        prop_assert_eq!(device.written(), b"reset\n \nboot\n".to_vec());
    }

    #[test]
    fn ansi_stripping_ignores_chunk_boundaries(cuts in prop::collection::vec(0usize..64, 0..12)) {
        let mut buffer = ExpectBuffer::new(1024, true);
        for chunk in split(COLORED, &cuts) {
            buffer.append(&chunk);
        }
        prop_assert_eq!(buffer.text(), "root@box:~# ");
    }
}
