#![no_main]
use libfuzzer_sys::fuzz_target;

use ndns_types::Response;

fuzz_target!(|response: Response| {
    let serialised = response.to_octets();
    let deserialised = Response::from_octets(&serialised);
    assert_eq!(Ok(response), deserialised);
});
