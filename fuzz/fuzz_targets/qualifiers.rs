#![no_main]

use libfuzzer_sys::fuzz_target;
use shadowhost::config::{Configuration, QualifierResolver, Qualifiers};

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };

    // Anything that parses must print back to a string that parses to the same value.
    if let Ok(parsed) = Qualifiers::parse(input) {
        let printed = parsed.to_string();
        let reparsed = Qualifiers::parse(&printed).expect("canonical form must parse");
        assert_eq!(parsed, reparsed, "{input:?} printed as {printed:?}");
    }

    let _ = QualifierResolver::new(28).resolve(&Configuration::default(), input);
});
