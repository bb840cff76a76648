#![no_main]
use libfuzzer_sys::fuzz_target;

use ndns_types::Name;

fuzz_target!(|data: &[u8]| {
    if let Ok(name) = Name::from_octets(data) {
        let serialised = name.to_octets();
        let deserialised = Name::from_octets(&serialised);
        assert_eq!(Ok(name), deserialised);
    }
});
