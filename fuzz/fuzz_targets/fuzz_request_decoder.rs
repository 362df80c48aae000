//! Fuzz target: `RequestDecoder::feed`
//!
//! Drives arbitrary bytes into the streaming HTTP decoder, first in one
//! piece and then split at a data-dependent point. Both must agree, and a
//! decoded body never exceeds the request size cap.
//!
//! cargo fuzz run fuzz_request_decoder

#![no_main]

use libfuzzer_sys::fuzz_target;
use rcdrive::rpc::codec::{MAX_REQUEST_SIZE, RequestDecoder};

fuzz_target!(|data: &[u8]| {
    let mut whole = RequestDecoder::new();
    let once = whole.feed(data);
    if let Ok(Some(request)) = &once {
        assert!(request.body.len() <= MAX_REQUEST_SIZE);
    }

    let split = data.first().map_or(0, |b| usize::from(*b)).min(data.len());
    let mut chunked = RequestDecoder::new();
    let twice = match chunked.feed(&data[..split]) {
        Ok(None) => chunked.feed(&data[split..]),
        other => other,
    };

    if let (Ok(Some(a)), Ok(Some(b))) = (&once, &twice) {
        assert_eq!(a.body, b.body);
        assert_eq!(a.path, b.path);
    }
});
