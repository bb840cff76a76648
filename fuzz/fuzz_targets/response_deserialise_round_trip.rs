#![no_main]
use libfuzzer_sys::fuzz_target;

use ndns_types::Response;

fuzz_target!(|data: &[u8]| {
    if let Ok(response) = Response::from_octets(data) {
        let serialised = response.to_octets();
        let deserialised = Response::from_octets(&serialised);
        assert_eq!(Ok(response), deserialised);
    }
});
