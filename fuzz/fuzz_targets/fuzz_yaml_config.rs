#![no_main]

use figment::Figment;
use figment::providers::{Format, Yaml};
use libfuzzer_sys::fuzz_target;
use problemkit::{Catalog, GeneratorConfig};

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let figment = Figment::new().merge(Yaml::string(s));
        if let Ok(config) = GeneratorConfig::from_figment(&figment) {
            let _ = config.build();
        }
        let _ = Catalog::from_figment(&figment);
    }
});
